//! What the editor needs from its host: selection geometry and primitive
//! errors.
//!
//! The model answers every other question itself. Hosts without a layout
//! (tests, headless use) plug in [`NoGeometry`].

/// A formatting primitive refused to run: no usable selection, or the
/// platform rejected the command. The router logs these and carries on.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct PlatformError(pub String);

impl From<&str> for PlatformError {
    fn from(reason: &str) -> Self {
        Self(reason.to_owned())
    }
}

impl From<String> for PlatformError {
    fn from(reason: String) -> Self {
        Self(reason)
    }
}

/// A screen rectangle, relative to the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0.0 && self.height == 0.0
    }
}

/// Screen geometry for the current selection.
///
/// Implementations return `None` when no rectangle is obtainable, e.g. a
/// collapsed range the platform has not laid out yet. Callers skip
/// positioning in that case.
pub trait SelectionGeometry {
    /// Bounding rectangle of the current selection.
    fn selection_rect(&self) -> Option<Rect>;

    /// Bounding rectangle of the editable root.
    fn root_rect(&self) -> Option<Rect> {
        None
    }
}

/// Geometry source for hosts without layout.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoGeometry;

impl SelectionGeometry for NoGeometry {
    fn selection_rect(&self) -> Option<Rect> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_error_display() {
        let err = PlatformError::from("queryCommandState threw");
        assert_eq!(err.to_string(), "queryCommandState threw");
    }

    #[test]
    fn test_no_geometry() {
        assert_eq!(NoGeometry.selection_rect(), None);
        assert_eq!(NoGeometry.root_rect(), None);
        assert!(Rect::default().is_empty());
    }
}
