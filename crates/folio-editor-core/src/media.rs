//! Media insertion and async image tracking.
//!
//! An async image is inserted before its final source is known. It gets a
//! generated key, written onto the element under the configured key
//! attribute, and an entry in the [`MediaTracker`]. Source updates made
//! later go to the tracker too, so an undo restore (which brings back the
//! markup as it was) can put the newest source back on the element.

use std::collections::HashMap;

use smol_str::{SmolStr, format_smolstr};

use crate::dom::{Document, NodeId};
use crate::error::MediaError;

/// A file handed over by the host (picked, dropped or pasted).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRef {
    pub name: SmolStr,
    pub mime: SmolStr,
    /// Blob url the host created for the file, if any.
    pub object_url: Option<String>,
}

impl FileRef {
    pub fn is_image(&self) -> bool {
        self.mime.starts_with("image/")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageDimensions {
    pub width: u32,
    pub height: u32,
}

/// What an async image is made from: a url, a file, or both.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageSource {
    pub url: Option<String>,
    pub file: Option<FileRef>,
    /// Known up front when the image is already loaded.
    pub dimensions: Option<ImageDimensions>,
}

impl ImageSource {
    pub fn url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::default()
        }
    }

    pub fn file(file: FileRef) -> Self {
        Self {
            file: Some(file),
            ..Self::default()
        }
    }

    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.dimensions = Some(ImageDimensions { width, height });
        self
    }

    /// The source to put on the element.
    pub fn resolve(&self) -> Result<String, MediaError> {
        if let Some(url) = self.url.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
            return Ok(url.to_string());
        }
        match &self.file {
            Some(file) if !file.is_image() => Err(MediaError::UnsupportedFile {
                name: file.name.clone(),
                mime: file.mime.clone(),
            }),
            Some(file) => Ok(file.object_url.clone().unwrap_or_default()),
            None => Err(MediaError::NoSource),
        }
    }
}

/// Outcome of loading an async image, as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageLoad {
    Loaded(ImageDimensions),
    Failed(String),
}

/// A finished async image, as reported to hooks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedImage {
    pub key: SmolStr,
    pub src: String,
    pub dimensions: Option<ImageDimensions>,
}

/// Where to put new media relative to a target node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Before,
    /// Into the target: appended when the target is the root, replacing
    /// it when it is an empty block, after it otherwise.
    Inside,
    After,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedImage {
    pub original_source: String,
    pub file: Option<FileRef>,
    pub updated_source: Option<String>,
    pub loaded: bool,
}

impl TrackedImage {
    /// The newest known source.
    pub fn current_source(&self) -> &str {
        self.updated_source.as_deref().unwrap_or(&self.original_source)
    }
}

#[derive(Debug, Clone, Default)]
pub struct MediaTracker {
    entries: HashMap<SmolStr, TrackedImage>,
    next_id: u64,
}

impl MediaTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an image and return its new key.
    pub fn track(&mut self, source: &ImageSource, resolved: String) -> SmolStr {
        self.next_id += 1;
        let key = format_smolstr!("img-{}", self.next_id);
        self.entries.insert(
            key.clone(),
            TrackedImage {
                original_source: resolved,
                file: source.file.clone(),
                updated_source: None,
                loaded: false,
            },
        );
        key
    }

    pub fn get(&self, key: &str) -> Option<&TrackedImage> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn set_updated_source(&mut self, key: &str, src: impl Into<String>) -> Result<(), MediaError> {
        let entry = self
            .entries
            .get_mut(key)
            .ok_or_else(|| MediaError::UnknownKey(SmolStr::new(key)))?;
        entry.updated_source = Some(src.into());
        Ok(())
    }

    /// Mark an entry loaded. Returns `false` when it already was, so
    /// completion is reported once.
    pub fn mark_loaded(&mut self, key: &str) -> Result<bool, MediaError> {
        let entry = self
            .entries
            .get_mut(key)
            .ok_or_else(|| MediaError::UnknownKey(SmolStr::new(key)))?;
        Ok(!std::mem::replace(&mut entry.loaded, true))
    }

    pub fn remove(&mut self, key: &str) -> Option<TrackedImage> {
        self.entries.remove(key)
    }

    /// Drop entries whose image is no longer in the document.
    pub fn prune(&mut self, doc: &Document, root: NodeId, key_attr: &str) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|key, _| find_tracked_image(doc, root, key_attr, key).is_some());
        before - self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Put the newest tracked source back on every tracked image whose
    /// `src` is stale. Returns how many elements were updated.
    pub fn reconcile(&self, doc: &mut Document, root: NodeId, key_attr: &str) -> usize {
        let mut updated = 0;
        for (key, entry) in &self.entries {
            let Some(src) = entry.updated_source.as_deref() else {
                continue;
            };
            let Some(img) = find_tracked_image(doc, root, key_attr, key) else {
                continue;
            };
            if doc.attr(img, "src") != Some(src) {
                doc.set_attr(img, "src", src);
                updated += 1;
            }
        }
        if updated > 0 {
            tracing::debug!(target: "folio::media", updated, "reconciled async image sources");
        }
        updated
    }
}

/// The element under `root` carrying tracking key `key`.
pub fn find_tracked_image(doc: &Document, root: NodeId, key_attr: &str, key: &str) -> Option<NodeId> {
    doc.descendants(root)
        .into_iter()
        .find(|&n| doc.attr(n, key_attr) == Some(key))
}

/// Remove tracking attributes from everything under `root`.
pub fn strip_tracking_attrs(doc: &mut Document, root: NodeId, key_attr: &str) {
    for node in doc.descendants(root) {
        doc.remove_attr(node, key_attr);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{inner_html, parse_fragment};

    #[test]
    fn test_resolve_source() {
        assert_eq!(ImageSource::url(" a.png ").resolve().unwrap(), "a.png");
        assert_eq!(ImageSource::default().resolve(), Err(MediaError::NoSource));
        let pdf = FileRef {
            name: "doc.pdf".into(),
            mime: "application/pdf".into(),
            object_url: None,
        };
        assert!(matches!(
            ImageSource::file(pdf).resolve(),
            Err(MediaError::UnsupportedFile { .. })
        ));
        let png = FileRef {
            name: "a.png".into(),
            mime: "image/png".into(),
            object_url: Some("blob:1".into()),
        };
        assert_eq!(ImageSource::file(png).resolve().unwrap(), "blob:1");
    }

    #[test]
    fn test_track_update_and_reconcile() {
        let mut doc = Document::new();
        let root = parse_fragment(&mut doc, r#"<img src="blob:1" data-k="img-1">"#);
        let mut tracker = MediaTracker::new();
        let key = tracker.track(&ImageSource::url("blob:1"), "blob:1".into());
        assert_eq!(key, "img-1");
        assert!(tracker.mark_loaded(&key).unwrap());
        assert!(!tracker.mark_loaded(&key).unwrap());

        tracker.set_updated_source(&key, "https://cdn.example/a.png").unwrap();
        assert_eq!(tracker.reconcile(&mut doc, root, "data-k"), 1);
        assert_eq!(
            inner_html(&doc, root),
            r#"<img src="https://cdn.example/a.png" data-k="img-1">"#
        );
        assert_eq!(tracker.reconcile(&mut doc, root, "data-k"), 0);

        assert_eq!(
            tracker.set_updated_source("img-9", "x"),
            Err(MediaError::UnknownKey("img-9".into()))
        );

        strip_tracking_attrs(&mut doc, root, "data-k");
        assert_eq!(tracker.prune(&doc, root, "data-k"), 1);
        assert!(tracker.is_empty());
    }
}
