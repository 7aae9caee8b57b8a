//! Selection geometry from the live layout.

use folio_editor_core::{Rect, SelectionGeometry};

/// Reads rectangles from the browser selection and the editable element.
#[derive(Debug, Clone)]
pub struct BrowserGeometry {
    element: web_sys::Element,
}

impl BrowserGeometry {
    pub fn new(element: web_sys::Element) -> Self {
        Self { element }
    }

    /// Selection rectangle relative to the editable element.
    pub fn relative_selection_rect(&self) -> Option<Rect> {
        let rect = self.selection_rect()?;
        let root = self.root_rect()?;
        Some(Rect::new(rect.x - root.x, rect.y - root.y, rect.width, rect.height))
    }
}

fn to_rect(rect: &web_sys::DomRect) -> Rect {
    Rect::new(rect.x(), rect.y(), rect.width(), rect.height())
}

impl SelectionGeometry for BrowserGeometry {
    fn selection_rect(&self) -> Option<Rect> {
        let selection = web_sys::window()?.get_selection().ok()??;
        if selection.range_count() == 0 {
            return None;
        }
        let range = selection.get_range_at(0).ok()?;
        if !self.element.contains(Some(&range.common_ancestor_container().ok()?)) {
            return None;
        }

        let rect = to_rect(&range.get_bounding_client_rect());
        if !rect.is_empty() {
            return Some(rect);
        }
        // Collapsed ranges report an empty bounding box; the first client
        // rect still carries the caret line.
        let rects = range.get_client_rects()?;
        rects.get(0).map(|r| to_rect(&r))
    }

    fn root_rect(&self) -> Option<Rect> {
        Some(to_rect(&self.element.get_bounding_client_rect()))
    }
}
