//! Tag tables for the block model.

/// Top-level block tags.
pub const BLOCK_TAGS: &[&str] = &[
    "p",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "blockquote",
    "ol",
    "ul",
    "pre",
];

/// List container tags.
pub const LIST_TAGS: &[&str] = &["ol", "ul"];

pub const LIST_ITEM_TAG: &str = "li";

/// Block tags that carry formatting of their own (everything but
/// paragraphs and lists).
pub const FORMATTED_TAGS: &[&str] = &["h1", "h2", "h3", "h4", "h5", "h6", "blockquote", "pre"];

pub const HEADING_TAGS: &[&str] = &["h1", "h2", "h3", "h4", "h5", "h6"];

/// Blocks that hold plain running text (valid blockquote content).
pub const TEXT_BLOCK_TAGS: &[&str] = &[
    "p",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "pre",
    "blockquote",
];

/// Opaque media elements.
pub const MEDIA_TAGS: &[&str] = &["img", "iframe", "figure", "video"];

/// The standalone separator.
pub const SEPARATOR_TAG: &str = "hr";

/// Container tag used for media holders.
pub const MEDIA_HOLDER_TAG: &str = "div";

pub const PARAGRAPH_TAG: &str = "p";
pub const LINE_BREAK_TAG: &str = "br";
pub const LINK_TAG: &str = "a";
pub const SPAN_TAG: &str = "span";

/// Inline formatting tags, including their synonyms.
pub const INLINE_MARK_TAGS: &[&str] = &[
    "b", "strong", "i", "em", "u", "strike", "s", "sub", "sup",
];

/// Attributes browsers inject while editing that never belong in the model.
pub const BAD_ATTRIBUTES: &[&str] = &["style", "dir"];

pub fn is_block(tag: &str) -> bool {
    BLOCK_TAGS.contains(&tag)
}

pub fn is_media(tag: &str) -> bool {
    MEDIA_TAGS.contains(&tag)
}

pub fn is_list(tag: &str) -> bool {
    LIST_TAGS.contains(&tag)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_formatted_tags_are_blocks() {
        for tag in FORMATTED_TAGS {
            assert!(is_block(tag), "{tag} should be a block");
        }
        assert!(!FORMATTED_TAGS.contains(&"p"));
        assert!(!is_block(MEDIA_HOLDER_TAG));
    }
}
