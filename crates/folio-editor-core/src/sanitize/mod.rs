//! Whitelist sanitizer.
//!
//! [`Sanitizer::clean`] copies a subtree into a new detached fragment,
//! keeping only whitelisted elements, attributes, protocols and class names.
//! The source tree is never modified. A rejected element does not take its
//! subtree with it: children are still visited and may survive on their own,
//! which effectively unwraps the rejected wrapper. Only tags listed in
//! `remove_contents` (or every rejected tag, with `remove_all_contents`)
//! lose their contents.

mod iframe;
mod rules;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use regex::Regex;
use smol_str::SmolStr;

use crate::dom::{Document, ElementData, NodeData, NodeId};

pub use iframe::{IFRAME_BLANK_SRC, IFRAME_SRC_ATTR, neutralize_iframes, restore_iframes};
pub use rules::{AttributeSpec, FilterRules};

/// Tag key whose rules apply to every element.
pub const ANY_ELEMENT: &str = "*";

/// One allowed attribute.
#[derive(Debug, Clone)]
pub enum AttributeRule {
    /// Any value is accepted.
    Any(SmolStr),
    /// The value must match the pattern.
    Matching { name: SmolStr, pattern: Regex },
}

impl AttributeRule {
    pub fn name(&self) -> &str {
        match self {
            AttributeRule::Any(name) => name,
            AttributeRule::Matching { name, .. } => name,
        }
    }
}

/// Immutable sanitizer configuration.
#[derive(Debug, Clone, Default)]
pub struct SanitizeConfig {
    pub elements: HashSet<SmolStr>,
    /// Per-tag attribute rules; [`ANY_ELEMENT`] applies to all tags.
    pub attributes: HashMap<SmolStr, Vec<AttributeRule>>,
    /// tag -> attribute -> allowed protocol names (without the colon).
    pub protocols: HashMap<SmolStr, HashMap<SmolStr, Vec<SmolStr>>>,
    /// Allowed class tokens per tag; [`ANY_ELEMENT`] applies to all tags.
    pub class_names: HashMap<SmolStr, HashSet<SmolStr>>,
    /// Tags dropped together with their contents.
    pub remove_contents: HashSet<SmolStr>,
    /// Attributes forced onto surviving elements.
    pub add_attributes: HashMap<SmolStr, Vec<(SmolStr, String)>>,
    pub allow_comments: bool,
    /// Drop the contents of every rejected element.
    pub remove_all_contents: bool,
}

impl SanitizeConfig {
    /// Whether `value` passes the attribute rules for `tag`.
    ///
    /// When both a plain and a pattern rule name the attribute, the pattern
    /// rule decides.
    fn attribute_allowed(&self, tag: &str, name: &str, value: &str) -> bool {
        let rules = [tag, ANY_ELEMENT]
            .into_iter()
            .filter_map(|key| self.attributes.get(key))
            .flatten()
            .filter(|rule| rule.name() == name);

        let mut plain = false;
        for rule in rules {
            match rule {
                AttributeRule::Matching { pattern, .. } => return pattern.is_match(value),
                AttributeRule::Any(_) => plain = true,
            }
        }
        plain
    }

    fn protocols_for(&self, tag: &str, attr: &str) -> Option<&[SmolStr]> {
        self.protocols
            .get(tag)
            .and_then(|attrs| attrs.get(attr))
            .map(Vec::as_slice)
    }

    fn filter_classes(&self, tag: &str, value: &str) -> Option<String> {
        let allowed: Vec<&HashSet<SmolStr>> = [tag, ANY_ELEMENT]
            .into_iter()
            .filter_map(|key| self.class_names.get(key))
            .collect();
        let kept: Vec<&str> = value
            .split_ascii_whitespace()
            .filter(|token| allowed.iter().any(|set| set.contains(*token)))
            .collect();
        if kept.is_empty() {
            None
        } else {
            Some(kept.join(" "))
        }
    }
}

/// Whether `value` is a relative reference or uses one of `protocols`.
pub fn protocol_allowed(value: &str, protocols: &[SmolStr]) -> bool {
    let normalized: String = value
        .trim()
        .chars()
        .filter(|c| !c.is_ascii_whitespace() && !c.is_control())
        .collect::<String>()
        .to_ascii_lowercase();
    let Some(colon) = normalized.find(':') else {
        return true;
    };
    if normalized[..colon].contains(['/', '?', '#']) {
        return true;
    }
    let scheme = &normalized[..colon];
    protocols.iter().any(|p| p.eq_ignore_ascii_case(scheme))
}

/// What a transformer sees.
#[derive(Debug)]
pub struct TransformInput<'a> {
    pub node: NodeId,
    pub node_name: &'a str,
    pub config: &'a SanitizeConfig,
    /// Nodes whitelisted by earlier transformer calls.
    pub whitelist_nodes: &'a [NodeId],
}

/// A transformer's verdict. Results of all transformers accumulate.
#[derive(Debug, Default)]
pub struct TransformOutput {
    /// Replacement tag and attributes for the node. Children always come
    /// from the source node.
    pub node: Option<ElementData>,
    /// Keep this element regardless of the element whitelist.
    pub whitelist: bool,
    /// Further nodes to keep regardless of the element whitelist.
    pub whitelist_nodes: Vec<NodeId>,
    /// Extra attribute names allowed on this element.
    pub attr_whitelist: Vec<SmolStr>,
}

/// Per-element hook run before the whitelist check.
pub trait Transformer: std::fmt::Debug {
    fn transform(&self, doc: &Document, input: &TransformInput<'_>) -> TransformOutput;
}

/// Renames tags to a canonical synonym (`strong` to `b` and so on).
#[derive(Debug, Clone)]
pub struct TagAliases {
    aliases: Vec<(SmolStr, SmolStr)>,
}

impl TagAliases {
    pub fn new(aliases: impl IntoIterator<Item = (&'static str, &'static str)>) -> Self {
        Self {
            aliases: aliases
                .into_iter()
                .map(|(from, to)| (SmolStr::new_static(from), SmolStr::new_static(to)))
                .collect(),
        }
    }
}

impl Default for TagAliases {
    fn default() -> Self {
        Self::new([("strong", "b"), ("em", "i"), ("s", "strike")])
    }
}

impl Transformer for TagAliases {
    fn transform(&self, doc: &Document, input: &TransformInput<'_>) -> TransformOutput {
        let Some((_, to)) = self.aliases.iter().find(|(from, _)| from == input.node_name) else {
            return TransformOutput::default();
        };
        TransformOutput {
            node: Some(ElementData {
                tag: to.clone(),
                attrs: doc.attrs(input.node).to_vec(),
            }),
            ..TransformOutput::default()
        }
    }
}

/// Configured sanitizer.
#[derive(Debug, Clone, Default)]
pub struct Sanitizer {
    config: SanitizeConfig,
    transformers: Vec<Arc<dyn Transformer + Send + Sync>>,
}

impl Sanitizer {
    pub fn new(config: SanitizeConfig) -> Self {
        Self {
            config,
            transformers: Vec::new(),
        }
    }

    pub fn with_transformer(mut self, transformer: impl Transformer + Send + Sync + 'static) -> Self {
        self.transformers.push(Arc::new(transformer));
        self
    }

    pub fn config(&self) -> &SanitizeConfig {
        &self.config
    }

    /// Copy the children of `source` into a new fragment, keeping only what
    /// the configuration allows.
    pub fn clean(&self, doc: &mut Document, source: NodeId) -> NodeId {
        let fragment = doc.create_fragment();
        let mut whitelist_nodes = Vec::new();
        for child in doc.children(source).to_vec() {
            self.clean_node(doc, child, fragment, &mut whitelist_nodes);
        }
        fragment
    }

    fn clean_node(
        &self,
        doc: &mut Document,
        node: NodeId,
        out: NodeId,
        whitelist_nodes: &mut Vec<NodeId>,
    ) {
        let data = match doc.data(node) {
            Some(data) => data.clone(),
            None => return,
        };
        match data {
            NodeData::Text(text) => {
                let copy = doc.create_text(text);
                doc.append_child(out, copy);
            }
            NodeData::Comment(text) => {
                if self.config.allow_comments {
                    let copy = doc.create_comment(text);
                    doc.append_child(out, copy);
                }
            }
            NodeData::Fragment => {
                for child in doc.children(node).to_vec() {
                    self.clean_node(doc, child, out, whitelist_nodes);
                }
            }
            NodeData::Element(source) => {
                let mut element = source.clone();
                let mut whitelisted = false;
                let mut attr_whitelist: Vec<SmolStr> = Vec::new();
                for transformer in &self.transformers {
                    let output = transformer.transform(
                        doc,
                        &TransformInput {
                            node,
                            node_name: &element.tag,
                            config: &self.config,
                            whitelist_nodes,
                        },
                    );
                    if let Some(replacement) = output.node {
                        element = replacement;
                    }
                    whitelisted |= output.whitelist;
                    whitelist_nodes.extend(output.whitelist_nodes);
                    attr_whitelist.extend(output.attr_whitelist);
                }

                let tag = element.tag.clone();
                let keep = self.config.elements.contains(&tag)
                    || whitelisted
                    || whitelist_nodes.contains(&node);

                let target = if keep {
                    let copy = self.copy_element(doc, &element, &attr_whitelist);
                    doc.append_child(out, copy);
                    copy
                } else {
                    tracing::trace!(target: "folio::sanitize", %tag, "unwrapping disallowed element");
                    out
                };

                let drop_contents = self.config.remove_contents.contains(&tag)
                    || (!keep && self.config.remove_all_contents);
                if drop_contents {
                    tracing::debug!(target: "folio::sanitize", %tag, "dropping element contents");
                    return;
                }
                for child in doc.children(node).to_vec() {
                    self.clean_node(doc, child, target, whitelist_nodes);
                }
            }
        }
    }

    fn copy_element(
        &self,
        doc: &mut Document,
        element: &ElementData,
        attr_whitelist: &[SmolStr],
    ) -> NodeId {
        let tag = element.tag.as_str();
        let copy = doc.create_element(tag);
        for (name, value) in &element.attrs {
            let name = name.as_str();
            if name == "class" {
                if let Some(classes) = self.config.filter_classes(tag, value) {
                    doc.set_attr(copy, name, &classes);
                }
                continue;
            }
            let allowed = attr_whitelist.iter().any(|a| a == name)
                || self.config.attribute_allowed(tag, name, value);
            if !allowed {
                continue;
            }
            if let Some(protocols) = self.config.protocols_for(tag, name) {
                if !protocol_allowed(value, protocols) {
                    tracing::debug!(target: "folio::sanitize", %tag, attr = name, "stripping attribute with disallowed protocol");
                    continue;
                }
            }
            doc.set_attr(copy, name, value);
        }
        if let Some(forced) = self.config.add_attributes.get(tag) {
            for (name, value) in forced {
                doc.set_attr(copy, name, value);
            }
        }
        copy
    }
}
