//! Link editing control state.

use smol_str::SmolStr;

use super::primitives::{EditContext, FormattingPrimitives};
use crate::dom::{DomSelection, NodeId, Position};
use crate::platform::PlatformError;
use crate::selection::persist::{self, SavedSelection};
use crate::selection::get_node_by_names;
use crate::tags::LINK_TAG;

/// An open link editor: where the link goes and what it currently says.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkDraft {
    pub saved: Option<SavedSelection>,
    pub href: String,
    /// The link being edited, when the selection was inside one.
    pub link: Option<NodeId>,
}

#[derive(Debug, Clone, Default)]
pub struct LinkEditor {
    draft: Option<LinkDraft>,
    bypass_classes: Vec<SmolStr>,
}

impl LinkEditor {
    /// Links carrying any of `bypass_classes` are never opened for editing.
    pub fn new(bypass_classes: impl IntoIterator<Item = SmolStr>) -> Self {
        Self {
            draft: None,
            bypass_classes: bypass_classes.into_iter().collect(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.draft.is_some()
    }

    pub fn draft(&self) -> Option<&LinkDraft> {
        self.draft.as_ref()
    }

    pub fn set_href(&mut self, href: impl Into<String>) {
        if let Some(draft) = &mut self.draft {
            draft.href = href.into();
        }
    }

    /// Open the editor at the selection. Returns `false` when the selection
    /// sits in a bypassed link.
    pub fn open(&mut self, cx: &EditContext<'_>) -> bool {
        let link = get_node_by_names(cx.doc, cx.root, &[LINK_TAG], false, cx.selection.as_ref());
        if let Some(link) = link {
            if self.bypass_classes.iter().any(|c| cx.doc.has_class(link, c)) {
                tracing::trace!(target: "folio::commands", "link editing bypassed");
                return false;
            }
        }
        let href = link
            .and_then(|l| cx.doc.attr(l, "href"))
            .unwrap_or_default()
            .to_string();
        self.draft = Some(LinkDraft {
            saved: cx.save_selection(),
            href,
            link,
        });
        true
    }

    /// Put the selection back where the editor was opened, widening a caret
    /// inside an existing link to the whole link.
    fn reselect(draft: &LinkDraft, cx: &mut EditContext<'_>) {
        cx.selection = persist::restore(cx.doc, draft.saved.as_ref());
        let caret = cx.selection.is_none_or(|s| s.is_collapsed());
        if let Some(link) = draft.link.filter(|&l| cx.doc.is_live(l)) {
            if caret {
                cx.selection = Some(DomSelection::new(
                    Position::new(link, 0),
                    Position::new(link, cx.doc.children(link).len()),
                ));
            }
        }
    }

    /// Create or update the link with `url`. An empty url removes the link.
    pub fn commit<P: FormattingPrimitives>(
        &mut self,
        primitives: &P,
        cx: &mut EditContext<'_>,
        url: Option<&str>,
    ) -> Result<(), PlatformError> {
        let Some(draft) = self.draft.take() else {
            return Ok(());
        };
        let href = normalize_href(url.unwrap_or(&draft.href));
        Self::reselect(&draft, cx);
        if href.is_empty() {
            primitives.unlink(cx)
        } else {
            primitives.create_link(cx, &href)
        }
    }

    /// Remove the link under the saved selection and close.
    pub fn remove<P: FormattingPrimitives>(
        &mut self,
        primitives: &P,
        cx: &mut EditContext<'_>,
    ) -> Result<(), PlatformError> {
        let Some(draft) = self.draft.take() else {
            return Ok(());
        };
        Self::reselect(&draft, cx);
        primitives.unlink(cx)
    }

    /// Close without changes, handing back the saved selection.
    pub fn cancel(&mut self) -> Option<SavedSelection> {
        self.draft.take().and_then(|d| d.saved)
    }
}

fn has_scheme(url: &str) -> bool {
    let Some((scheme, rest)) = url.split_once(':') else {
        return false;
    };
    let valid = scheme.starts_with(|c: char| c.is_ascii_alphabetic())
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    valid
        && (rest.starts_with("//")
            || ["mailto", "tel", "sms", "data", "blob"]
                .iter()
                .any(|s| scheme.eq_ignore_ascii_case(s)))
}

/// Trim `url` and prefix `http://` unless it already has a scheme or is a
/// relative or fragment reference.
pub fn normalize_href(url: &str) -> String {
    let url = url.trim();
    if url.is_empty()
        || has_scheme(url)
        || url.starts_with(['/', '#', '?'])
        || url.starts_with("./")
        || url.starts_with("../")
    {
        return url.to_string();
    }
    format!("http://{url}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::ModelPrimitives;
    use crate::dom::{Document, inner_html, parse_fragment};

    fn caret(doc: &Document, root: NodeId, offset: usize) -> Option<DomSelection> {
        persist::restore(
            doc,
            Some(&SavedSelection {
                container: root,
                start: offset,
                end: offset,
                end_container: None,
            }),
        )
    }

    #[test]
    fn test_normalize_href() {
        assert_eq!(normalize_href(" example.com "), "http://example.com");
        assert_eq!(normalize_href("https://a.b/c"), "https://a.b/c");
        assert_eq!(normalize_href("mailto:me@a.b"), "mailto:me@a.b");
        assert_eq!(normalize_href("/docs"), "/docs");
        assert_eq!(normalize_href("#top"), "#top");
        assert_eq!(normalize_href("localhost:8080/x"), "http://localhost:8080/x");
        assert_eq!(normalize_href(""), "");
    }

    #[test]
    fn test_commit_updates_existing_link() {
        let mut doc = Document::new();
        let root = parse_fragment(&mut doc, r#"<p>go <a href="http://old.example">here</a></p>"#);
        let selection = caret(&doc, root, 5);
        let mut cx = EditContext::new(&mut doc, root, selection);

        let mut editor = LinkEditor::default();
        assert!(editor.open(&cx));
        assert_eq!(editor.draft().unwrap().href, "http://old.example");
        editor.set_href("new.example");
        editor.commit(&ModelPrimitives, &mut cx, None).unwrap();
        assert!(!editor.is_open());
        assert_eq!(
            inner_html(cx.doc, root),
            r#"<p>go <a href="http://new.example">here</a></p>"#
        );
    }

    #[test]
    fn test_empty_commit_and_remove_unlink() {
        let mut doc = Document::new();
        let root = parse_fragment(&mut doc, r#"<p><a href="/x">one</a></p>"#);
        let selection = caret(&doc, root, 1);
        let mut cx = EditContext::new(&mut doc, root, selection);

        let mut editor = LinkEditor::default();
        assert!(editor.open(&cx));
        editor.commit(&ModelPrimitives, &mut cx, Some("  ")).unwrap();
        assert_eq!(inner_html(cx.doc, root), "<p>one</p>");

        assert!(editor.open(&cx));
        assert!(editor.cancel().is_some());
        editor.remove(&ModelPrimitives, &mut cx).unwrap();
        assert_eq!(inner_html(cx.doc, root), "<p>one</p>");
    }

    #[test]
    fn test_bypass_class_blocks_editing() {
        let mut doc = Document::new();
        let root = parse_fragment(&mut doc, r#"<p><a class="mention" href="/u/1">@ann</a></p>"#);
        let selection = caret(&doc, root, 2);
        let cx = EditContext::new(&mut doc, root, selection);

        let mut editor = LinkEditor::new([SmolStr::new("mention")]);
        assert!(!editor.open(&cx));
        assert!(!editor.is_open());
    }
}
