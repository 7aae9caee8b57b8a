//! HTML fragment parsing via html5ever.
//!
//! Fragments are parsed in a `<body>` context, the same way a native
//! `innerHTML` assignment would parse them, then imported into the arena.

use html5ever::tendril::TendrilSink;
use html5ever::{LocalName, Namespace, ParseOpts, QualName};
use markup5ever_rcdom::{Handle, NodeData as RcNodeData, RcDom};

use super::{Document, NodeId};

const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

/// Parse `html` into a new detached fragment of `doc`.
///
/// Malformed markup never fails: the parser recovers the way browsers do.
pub fn parse_fragment(doc: &mut Document, html: &str) -> NodeId {
    let fragment = doc.create_fragment();
    if html.is_empty() {
        return fragment;
    }

    let context = QualName::new(
        None,
        Namespace::from(HTML_NAMESPACE),
        LocalName::from("body"),
    );
    let dom = html5ever::parse_fragment(RcDom::default(), ParseOpts::default(), context, Vec::new())
        .one(html);

    // The fragment algorithm hangs its output off a synthetic <html> element.
    for child in dom.document.children.borrow().iter() {
        match &child.data {
            RcNodeData::Element { name, .. } if &*name.local == "html" => {
                for grandchild in child.children.borrow().iter() {
                    import_node(doc, fragment, grandchild);
                }
            }
            _ => import_node(doc, fragment, child),
        }
    }
    fragment
}

fn import_node(doc: &mut Document, parent: NodeId, handle: &Handle) {
    match &handle.data {
        RcNodeData::Element { name, attrs, .. } => {
            let el = doc.create_element(&name.local);
            for attr in attrs.borrow().iter() {
                doc.set_attr(el, &attr.name.local, &attr.value);
            }
            doc.append_child(parent, el);
            for child in handle.children.borrow().iter() {
                import_node(doc, el, child);
            }
        }
        RcNodeData::Text { contents } => {
            let text = doc.create_text(contents.borrow().to_string());
            doc.append_child(parent, text);
        }
        RcNodeData::Comment { contents } => {
            let comment = doc.create_comment(contents.to_string());
            doc.append_child(parent, comment);
        }
        RcNodeData::Document => {
            for child in handle.children.borrow().iter() {
                import_node(doc, parent, child);
            }
        }
        _ => {
            tracing::trace!(target: "folio::dom", "skipping unsupported node while parsing");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::inner_html;

    #[test]
    fn test_parse_simple_fragment() {
        let mut doc = Document::new();
        let frag = parse_fragment(&mut doc, "<p>Hello <b>world</b></p>");
        assert_eq!(doc.children(frag).len(), 1);
        let p = doc.children(frag)[0];
        assert_eq!(doc.tag(p), Some("p"));
        assert_eq!(doc.text_content(p), "Hello world");
    }

    #[test]
    fn test_parse_recovers_from_unclosed_tags() {
        let mut doc = Document::new();
        let frag = parse_fragment(&mut doc, "<p>one<p>two");
        assert_eq!(inner_html(&doc, frag), "<p>one</p><p>two</p>");
    }

    #[test]
    fn test_parse_attributes_and_entities() {
        let mut doc = Document::new();
        let frag = parse_fragment(&mut doc, r#"<a HREF="/x?a=1&amp;b=2">a &lt; b</a>"#);
        let a = doc.children(frag)[0];
        assert_eq!(doc.attr(a, "href"), Some("/x?a=1&b=2"));
        assert_eq!(doc.text_content(a), "a < b");
    }

    #[test]
    fn test_parse_empty() {
        let mut doc = Document::new();
        let frag = parse_fragment(&mut doc, "");
        assert!(doc.children(frag).is_empty());
    }
}
