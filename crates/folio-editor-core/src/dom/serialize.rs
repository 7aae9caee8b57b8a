//! HTML serialization of arena subtrees.

use super::{Document, NodeData, NodeId};

/// Elements that never have closing tags.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

/// Elements whose text is emitted verbatim.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// Serialize the children of `id`.
pub fn inner_html(doc: &Document, id: NodeId) -> String {
    let mut out = String::new();
    let raw = doc.has_tag(id, RAW_TEXT_ELEMENTS);
    for &child in doc.children(id) {
        write_node(doc, child, raw, &mut out);
    }
    out
}

/// Serialize `id` including its own markup.
pub fn outer_html(doc: &Document, id: NodeId) -> String {
    let mut out = String::new();
    write_node(doc, id, false, &mut out);
    out
}

fn write_node(doc: &Document, id: NodeId, raw_text: bool, out: &mut String) {
    match doc.data(id) {
        Some(NodeData::Element(el)) => {
            out.push('<');
            out.push_str(&el.tag);
            for (name, value) in &el.attrs {
                out.push(' ');
                out.push_str(name);
                out.push_str("=\"");
                out.push_str(&escape_attr(value));
                out.push('"');
            }
            out.push('>');
            if VOID_ELEMENTS.contains(&el.tag.as_str()) {
                return;
            }
            let raw = RAW_TEXT_ELEMENTS.contains(&el.tag.as_str());
            for &child in doc.children(id) {
                write_node(doc, child, raw, out);
            }
            out.push_str("</");
            out.push_str(&el.tag);
            out.push('>');
        }
        Some(NodeData::Text(text)) => {
            if raw_text {
                out.push_str(text);
            } else {
                out.push_str(&escape_text(text));
            }
        }
        Some(NodeData::Comment(text)) => {
            out.push_str("<!--");
            out.push_str(text);
            out.push_str("-->");
        }
        Some(NodeData::Fragment) => {
            for &child in doc.children(id) {
                write_node(doc, child, raw_text, out);
            }
        }
        None => {}
    }
}

/// Escape text content.
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            c => out.push(c),
        }
    }
    out
}

/// Escape a double-quoted attribute value.
pub fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize_void_and_attrs() {
        let mut doc = Document::new();
        let p = doc.create_element("p");
        let img = doc.create_element_with_attrs("img", &[("src", "a.png"), ("alt", "\"x\"")]);
        let br = doc.create_element("br");
        let text = doc.create_text("1 < 2 & 3");
        doc.append_child(p, text);
        doc.append_child(p, br);
        doc.append_child(p, img);
        insta::assert_snapshot!(
            outer_html(&doc, p),
            @r#"<p>1 &lt; 2 &amp; 3<br><img src="a.png" alt="&quot;x&quot;"></p>"#
        );
    }

    #[test]
    fn test_serialize_comment_and_fragment() {
        let mut doc = Document::new();
        let frag = doc.create_fragment();
        let c = doc.create_comment(" note ");
        let t = doc.create_text("x");
        doc.append_child(frag, c);
        doc.append_child(frag, t);
        assert_eq!(inner_html(&doc, frag), "<!-- note -->x");
    }
}
