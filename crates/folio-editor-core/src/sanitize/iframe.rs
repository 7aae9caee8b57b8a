//! Iframe neutralization at the data boundary.
//!
//! Inside the editor an iframe never loads its real source: the source is
//! parked in a data attribute and `src` points at a blank page. Output
//! reverses the swap.

use crate::dom::{Document, NodeId};

pub const IFRAME_SRC_ATTR: &str = "data-src";
pub const IFRAME_BLANK_SRC: &str = "about:blank";

fn iframes(doc: &Document, root: NodeId) -> Vec<NodeId> {
    std::iter::once(root)
        .chain(doc.descendants(root))
        .filter(|&n| doc.has_tag(n, &["iframe"]))
        .collect()
}

/// Park every iframe source under `root`. Returns how many were changed.
pub fn neutralize_iframes(doc: &mut Document, root: NodeId) -> usize {
    let mut changed = 0;
    for iframe in iframes(doc, root) {
        let Some(src) = doc.attr(iframe, "src").map(str::to_string) else {
            continue;
        };
        if src == IFRAME_BLANK_SRC {
            continue;
        }
        doc.set_attr(iframe, IFRAME_SRC_ATTR, &src);
        doc.set_attr(iframe, "src", IFRAME_BLANK_SRC);
        changed += 1;
    }
    changed
}

/// Put parked iframe sources back. Returns how many were changed.
pub fn restore_iframes(doc: &mut Document, root: NodeId) -> usize {
    let mut changed = 0;
    for iframe in iframes(doc, root) {
        let Some(src) = doc.attr(iframe, IFRAME_SRC_ATTR).map(str::to_string) else {
            continue;
        };
        doc.set_attr(iframe, "src", &src);
        doc.remove_attr(iframe, IFRAME_SRC_ATTR);
        changed += 1;
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{inner_html, parse_fragment};

    #[test]
    fn test_neutralize_and_restore_are_symmetric() {
        let mut doc = Document::new();
        let root = parse_fragment(&mut doc, r#"<iframe src="https://video.example/1"></iframe>"#);
        assert_eq!(neutralize_iframes(&mut doc, root), 1);
        assert_eq!(
            inner_html(&doc, root),
            r#"<iframe src="about:blank" data-src="https://video.example/1"></iframe>"#
        );
        assert_eq!(neutralize_iframes(&mut doc, root), 0);

        assert_eq!(restore_iframes(&mut doc, root), 1);
        assert_eq!(
            inner_html(&doc, root),
            r#"<iframe src="https://video.example/1"></iframe>"#
        );
        assert_eq!(restore_iframes(&mut doc, root), 0);
    }
}
