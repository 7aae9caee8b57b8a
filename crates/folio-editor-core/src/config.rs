//! Editor configuration.
//!
//! Everything a host configures with data lives in [`EditorConfig`], which
//! deserializes from JSON with every field optional. Callbacks live on
//! [`EditorHooks`](crate::hooks::EditorHooks).

use std::collections::BTreeMap;

use serde::Deserialize;
use smol_str::SmolStr;

use crate::commands::FormatCommand;
use crate::error::EditorError;
use crate::sanitize::{FilterRules, SanitizeConfig};
use crate::undo::DEFAULT_MAX_STEPS;

/// Glyphs substituted for typed quotes.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct QuoteGlyphs {
    pub single_open: char,
    pub single_close: char,
    pub double_open: char,
    pub double_close: char,
    pub single_prime: char,
    pub double_prime: char,
}

impl Default for QuoteGlyphs {
    fn default() -> Self {
        Self {
            single_open: '\u{2018}',
            single_close: '\u{2019}',
            double_open: '\u{201C}',
            double_close: '\u{201D}',
            single_prime: '\u{2032}',
            double_prime: '\u{2033}',
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SmartQuotes {
    pub enabled: bool,
    pub config: QuoteGlyphs,
}

/// Toolbar controls and keyboard bindings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FormattingControls {
    /// Command names in toolbar order.
    pub order: Vec<String>,
    /// Key combo (as the host spells it) to command name. `undo` and
    /// `redo` are accepted besides formatting commands.
    pub key_bindings: BTreeMap<String, String>,
}

impl Default for FormattingControls {
    fn default() -> Self {
        let order = [
            "bold",
            "italic",
            "underline",
            "strikethrough",
            "h2",
            "h3",
            "blockquote",
            "insertunorderedlist",
            "insertorderedlist",
            "createlink",
        ];
        let bindings = [
            ("ctrl+b", "bold"),
            ("ctrl+i", "italic"),
            ("ctrl+u", "underline"),
            ("ctrl+k", "createlink"),
            ("ctrl+z", "undo"),
            ("ctrl+shift+z", "redo"),
            ("ctrl+y", "redo"),
        ];
        Self {
            order: order.into_iter().map(String::from).collect(),
            key_bindings: bindings
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

impl FormattingControls {
    pub fn commands(&self) -> Vec<FormatCommand> {
        self.order
            .iter()
            .map(|name| FormatCommand::parse(name, None))
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Links with any of these classes are never opened for editing.
    pub bypass_classes: Vec<SmolStr>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub placeholder: Option<String>,
    /// Maximum number of characters `insert_text` lets through.
    pub character_limit: Option<usize>,
    pub filter_rules: FilterRules,
    pub filter_for_set_data: bool,
    pub filter_for_get_data: bool,
    pub flatten_blocks: bool,
    pub smart_quotes: SmartQuotes,
    pub run_iframe_sanitization: bool,
    pub media_holder_class: SmolStr,
    /// Attribute carrying the tracking key of async images.
    pub img_key_attr: SmolStr,
    /// Names of the width and height attributes written on loaded images.
    pub img_size_attrs: (SmolStr, SmolStr),
    /// Extra attributes set on every inserted image.
    pub add_img_attrs: BTreeMap<SmolStr, String>,
    pub formatting_controls: FormattingControls,
    pub link: LinkConfig,
    pub undo_depth: usize,
    /// Verbose logging in the browser host.
    pub debug: bool,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            placeholder: None,
            character_limit: None,
            filter_rules: FilterRules::rich(),
            filter_for_set_data: true,
            filter_for_get_data: true,
            flatten_blocks: true,
            smart_quotes: SmartQuotes::default(),
            run_iframe_sanitization: true,
            media_holder_class: SmolStr::new_static("folio-media"),
            img_key_attr: SmolStr::new_static("data-folio-key"),
            img_size_attrs: (SmolStr::new_static("width"), SmolStr::new_static("height")),
            add_img_attrs: BTreeMap::new(),
            formatting_controls: FormattingControls::default(),
            link: LinkConfig::default(),
            undo_depth: DEFAULT_MAX_STEPS,
            debug: false,
        }
    }
}

impl EditorConfig {
    /// Check the configuration and compile the sanitizer rules, with the
    /// image attributes the editor itself writes allowed through.
    pub fn validate(&self) -> Result<SanitizeConfig, EditorError> {
        if self.media_holder_class.trim().is_empty() {
            return Err(EditorError::InvalidConfig(
                "media_holder_class must not be empty".into(),
            ));
        }
        if self.img_key_attr.trim().is_empty() {
            return Err(EditorError::InvalidConfig("img_key_attr must not be empty".into()));
        }
        let mut rules = self.filter_rules.clone();
        rules.allow_attribute("img", &self.img_key_attr);
        rules.allow_attribute("img", &self.img_size_attrs.0);
        rules.allow_attribute("img", &self.img_size_attrs.1);
        for name in self.add_img_attrs.keys() {
            rules.allow_attribute("img", name);
        }
        rules.to_config()
    }
}
