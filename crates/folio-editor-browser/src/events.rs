//! Browser event extraction.
//!
//! Turns keyboard, clipboard and drag events into the plain values the
//! editor takes: key combos, html strings and file references.

use folio_editor_core::FileRef;
use folio_editor_core::dom::escape_text;
use smol_str::SmolStr;
use wasm_bindgen::JsCast;

// === Keyboard ===

/// Spell a key combo the way bindings are configured: modifiers in the
/// order `ctrl`, `alt`, `shift`, then the lowercased key. `Meta` counts as
/// `ctrl`.
pub fn combo_from_parts(ctrl: bool, alt: bool, shift: bool, key: &str) -> SmolStr {
    let mut combo = String::new();
    if ctrl {
        combo.push_str("ctrl+");
    }
    if alt {
        combo.push_str("alt+");
    }
    if shift {
        combo.push_str("shift+");
    }
    combo.push_str(&key.to_lowercase());
    SmolStr::new(combo)
}

/// Key combo of a keydown event.
pub fn key_combo(event: &web_sys::KeyboardEvent) -> SmolStr {
    combo_from_parts(
        event.ctrl_key() || event.meta_key(),
        event.alt_key(),
        event.shift_key(),
        &event.key(),
    )
}

// === Clipboard and drop ===

/// Escape plain text and turn its newlines into line breaks.
pub fn plain_text_to_html(text: &str) -> String {
    text.replace("\r\n", "\n")
        .split('\n')
        .map(escape_text)
        .collect::<Vec<_>>()
        .join("<br>")
}

/// Pasted or dropped markup: `text/html` when present, plain text otherwise.
pub fn transfer_html(data: &web_sys::DataTransfer) -> Option<String> {
    if let Ok(html) = data.get_data("text/html") {
        if !html.is_empty() {
            return Some(html);
        }
    }
    data.get_data("text/plain")
        .ok()
        .filter(|s| !s.is_empty())
        .map(|text| plain_text_to_html(&text))
}

/// Files carried by a clipboard or drag payload. Each gets a blob url so
/// it can be shown before upload.
pub fn transfer_files(data: &web_sys::DataTransfer) -> Vec<FileRef> {
    let Some(list) = data.files() else {
        return Vec::new();
    };
    (0..list.length())
        .filter_map(|i| list.item(i))
        .map(|file| {
            let object_url = match web_sys::Url::create_object_url_with_blob(&file) {
                Ok(url) => Some(url),
                Err(e) => {
                    tracing::warn!("create_object_url failed: {:?}", e);
                    None
                }
            };
            FileRef {
                name: SmolStr::new(file.name()),
                mime: SmolStr::new(file.type_()),
                object_url,
            }
        })
        .collect()
}

/// Whether the event target sits inside `element`.
pub fn is_inside(element: &web_sys::Element, event: &web_sys::Event) -> bool {
    event
        .target()
        .and_then(|t| t.dyn_into::<web_sys::Node>().ok())
        .is_some_and(|node| element.contains(Some(&node)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combo_spelling() {
        assert_eq!(combo_from_parts(true, false, false, "B"), "ctrl+b");
        assert_eq!(combo_from_parts(true, false, true, "z"), "ctrl+shift+z");
        assert_eq!(combo_from_parts(false, true, false, "Enter"), "alt+enter");
    }

    #[test]
    fn test_plain_text_to_html() {
        assert_eq!(plain_text_to_html("a < b\r\nc"), "a &lt; b<br>c");
        assert_eq!(plain_text_to_html("one"), "one");
    }
}
