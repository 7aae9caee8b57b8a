//! Host-facing filter rules and their conversion into a [`SanitizeConfig`].

use std::collections::{BTreeMap, HashMap};

use regex::Regex;
use serde::Deserialize;
use smol_str::SmolStr;

use super::{AttributeRule, SanitizeConfig};
use crate::error::EditorError;

/// One entry of an attribute allow-list: either a bare name, or a map of
/// names to value patterns.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum AttributeSpec {
    Name(SmolStr),
    Pattern(BTreeMap<SmolStr, String>),
}

/// Filter rules as a host supplies them (typically JSON).
///
/// ```json
/// {
///   "elements": ["p", "a"],
///   "attributes": { "a": ["href", { "data-kind": "^(note|aside)$" }] },
///   "protocols": { "a": { "href": ["http", "https"] } },
///   "classnames": { "p": ["lead"] },
///   "remove_contents": ["script"]
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FilterRules {
    pub elements: Vec<SmolStr>,
    pub attributes: HashMap<SmolStr, Vec<AttributeSpec>>,
    pub protocols: HashMap<SmolStr, HashMap<SmolStr, Vec<SmolStr>>>,
    #[serde(alias = "classnames")]
    pub class_names: HashMap<SmolStr, Vec<SmolStr>>,
    pub remove_contents: Vec<SmolStr>,
    pub add_attributes: HashMap<SmolStr, BTreeMap<SmolStr, String>>,
    pub allow_comments: bool,
    pub remove_all_contents: bool,
}

impl FilterRules {
    /// Rules for the block model: every block and inline mark the editor
    /// produces, links, and media.
    pub fn rich() -> Self {
        let names = |items: &[&str]| items.iter().map(SmolStr::new).collect::<Vec<_>>();
        let attrs = |items: &[&str]| {
            items
                .iter()
                .map(|name| AttributeSpec::Name(SmolStr::new(name)))
                .collect::<Vec<_>>()
        };
        let web = names(&["http", "https"]);

        Self {
            elements: names(&[
                "p", "br", "b", "i", "u", "strike", "sub", "sup", "a", "h1", "h2", "h3", "h4",
                "h5", "h6", "blockquote", "ol", "ul", "li", "pre", "img", "iframe", "figure",
                "figcaption", "video", "source", "hr",
            ]),
            attributes: HashMap::from([
                ("a".into(), attrs(&["href", "title", "target"])),
                ("img".into(), attrs(&["src", "alt", "title", "width", "height"])),
                (
                    "iframe".into(),
                    attrs(&["src", "width", "height", "frameborder", "allowfullscreen"]),
                ),
                ("video".into(), attrs(&["src", "width", "height", "controls", "poster"])),
                ("source".into(), attrs(&["src", "type"])),
            ]),
            protocols: HashMap::from([
                (
                    "a".into(),
                    HashMap::from([("href".into(), names(&["http", "https", "mailto", "tel"]))]),
                ),
                (
                    "img".into(),
                    HashMap::from([("src".into(), names(&["http", "https", "data", "blob"]))]),
                ),
                ("iframe".into(), HashMap::from([("src".into(), web.clone())])),
                (
                    "video".into(),
                    HashMap::from([("src".into(), names(&["http", "https", "blob"]))]),
                ),
                ("source".into(), HashMap::from([("src".into(), web)])),
            ]),
            remove_contents: names(&["script", "style", "title", "noscript", "template"]),
            ..Self::default()
        }
    }

    /// Add a plain allowed attribute for `tag`.
    pub fn allow_attribute(&mut self, tag: &str, name: &str) {
        let specs = self.attributes.entry(SmolStr::new(tag)).or_default();
        let spec = AttributeSpec::Name(SmolStr::new(name));
        if !specs.contains(&spec) {
            specs.push(spec);
        }
    }

    /// Compile into a sanitizer configuration, rejecting malformed patterns.
    pub fn to_config(&self) -> Result<SanitizeConfig, EditorError> {
        SanitizeConfig::try_from(self)
    }
}

impl TryFrom<&FilterRules> for SanitizeConfig {
    type Error = EditorError;

    fn try_from(rules: &FilterRules) -> Result<Self, Self::Error> {
        let lower = |s: &SmolStr| SmolStr::new(s.to_ascii_lowercase());

        let mut attributes: HashMap<SmolStr, Vec<AttributeRule>> = HashMap::new();
        for (tag, specs) in &rules.attributes {
            let entry = attributes.entry(lower(tag)).or_default();
            for spec in specs {
                match spec {
                    AttributeSpec::Name(name) => entry.push(AttributeRule::Any(lower(name))),
                    AttributeSpec::Pattern(patterns) => {
                        for (name, pattern) in patterns {
                            let pattern = Regex::new(pattern).map_err(|source| {
                                EditorError::InvalidPattern {
                                    element: tag.clone(),
                                    attribute: name.clone(),
                                    source,
                                }
                            })?;
                            entry.push(AttributeRule::Matching {
                                name: lower(name),
                                pattern,
                            });
                        }
                    }
                }
            }
        }

        Ok(SanitizeConfig {
            elements: rules.elements.iter().map(lower).collect(),
            attributes,
            protocols: rules
                .protocols
                .iter()
                .map(|(tag, attrs)| {
                    let attrs = attrs
                        .iter()
                        .map(|(attr, protos)| (lower(attr), protos.iter().map(lower).collect()))
                        .collect();
                    (lower(tag), attrs)
                })
                .collect(),
            class_names: rules
                .class_names
                .iter()
                .map(|(tag, classes)| (lower(tag), classes.iter().cloned().collect()))
                .collect(),
            remove_contents: rules.remove_contents.iter().map(lower).collect(),
            add_attributes: rules
                .add_attributes
                .iter()
                .map(|(tag, attrs)| {
                    let attrs = attrs
                        .iter()
                        .map(|(name, value)| (lower(name), value.clone()))
                        .collect();
                    (lower(tag), attrs)
                })
                .collect(),
            allow_comments: rules.allow_comments,
            remove_all_contents: rules.remove_all_contents,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rules_from_json() {
        let rules: FilterRules = serde_json::from_str(
            r#"{
                "elements": ["P", "a"],
                "attributes": { "a": ["href", { "data-kind": "^(note|aside)$" }] },
                "protocols": { "a": { "href": ["http", "https"] } },
                "classnames": { "p": ["lead"] },
                "remove_contents": ["script"],
                "add_attributes": { "a": { "rel": "nofollow" } }
            }"#,
        )
        .unwrap();
        assert_eq!(rules.class_names["p"], vec![SmolStr::new("lead")]);

        let config = rules.to_config().unwrap();
        assert!(config.elements.contains("p"));
        assert_eq!(config.attributes["a"].len(), 2);
        assert!(matches!(
            &config.attributes["a"][1],
            AttributeRule::Matching { name, .. } if name == "data-kind"
        ));
        assert_eq!(config.protocols["a"]["href"].len(), 2);
        assert_eq!(config.add_attributes["a"][0].0, "rel");
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        let rules: FilterRules =
            serde_json::from_str(r#"{ "attributes": { "img": [{ "src": "([" }] } }"#).unwrap();
        let err = rules.to_config().unwrap_err();
        assert!(matches!(err, EditorError::InvalidPattern { ref attribute, .. } if attribute == "src"));
    }

    #[test]
    fn test_rich_rules_compile() {
        let mut rules = FilterRules::rich();
        rules.allow_attribute("img", "data-key");
        rules.allow_attribute("img", "data-key");
        let config = rules.to_config().unwrap();
        let img_rules = config.attributes["img"]
            .iter()
            .filter(|r| r.name() == "data-key")
            .count();
        assert_eq!(img_rules, 1);
        assert!(config.remove_contents.contains("script"));
        assert!(!config.elements.contains("div"));
    }
}
