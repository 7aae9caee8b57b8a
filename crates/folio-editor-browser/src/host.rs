//! A rich editor bound to a live `contenteditable` element.
//!
//! [`BrowserEditor`] owns the event listeners; the editor itself sits
//! behind `Rc<RefCell<..>>` so listeners and timers can reach it. Every
//! handler follows the same steps: pull the live selection into the model,
//! run the editor operation, then [`pump`] deferred work and render.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use folio_editor_core::{
    Editor, EditorConfig, EditorError, EditorHooks, ImageDimensions, ImageLoad, ImageSource,
    MediaError, Rect, RichEditor, SmolStr, selection,
};
use gloo_events::{EventListener, EventListenerOptions};
use gloo_timers::callback::Timeout;
use wasm_bindgen::JsCast;
use web_time::Instant;

use crate::geometry::BrowserGeometry;
use crate::{cursor, dom_sync, events};

/// An image loading off-document so its natural size can be reported.
struct PendingImage {
    _image: web_sys::HtmlImageElement,
    _load: EventListener,
    _error: EventListener,
}

struct Host {
    editor: RichEditor,
    element: web_sys::HtmlElement,
    /// Model revision the live element shows.
    rendered: Option<u64>,
    timer: Option<Timeout>,
    images: HashMap<SmolStr, PendingImage>,
    /// Loaders whose callback is still on the stack; dropped on the next
    /// pump.
    retired: Vec<PendingImage>,
}

impl Host {
    fn sync_selection(&mut self) {
        let state = self.editor.state();
        let sel = cursor::read_selection(&self.element, state.doc(), state.root());
        if sel.is_some() {
            self.editor.set_selection(sel);
        }
    }

    /// Native input changed the live element.
    fn import_live(&mut self) {
        dom_sync::import_live(&mut self.editor, &self.element);
        self.sync_selection();
        self.editor.input_received();
        // The live element already shows this revision.
        self.rendered = Some(self.editor.state().revision());
    }

    fn render(&mut self) {
        let state = self.editor.state();
        if self.rendered == Some(state.revision()) {
            return;
        }
        dom_sync::render(&self.editor, &self.element);
        self.rendered = Some(state.revision());

        if !self.editor.has_focus() {
            return;
        }
        if let Some(sel) = state.selection() {
            if let Err(e) = cursor::write_selection(&self.element, state.doc(), state.root(), &sel)
            {
                tracing::debug!(target: "folio::cursor", "selection not restored: {}", e);
            }
        }
    }
}

/// A [`RichEditor`] attached to a live element.
pub struct BrowserEditor {
    host: Rc<RefCell<Host>>,
    _listeners: Vec<EventListener>,
}

impl BrowserEditor {
    /// Take over `element`: its current markup becomes the initial content
    /// and the element is made editable.
    pub fn attach(
        element: web_sys::HtmlElement,
        config: EditorConfig,
        hooks: Box<dyn EditorHooks>,
    ) -> Result<Self, EditorError> {
        crate::init_logging(config.debug);

        let editor = RichEditor::from_html(&element.inner_html(), config, hooks)?;
        element
            .set_attribute("contenteditable", "true")
            .map_err(|e| EditorError::InvalidConfig(format!("element not editable: {:?}", e)))?;

        let host = Rc::new(RefCell::new(Host {
            editor,
            element: element.clone(),
            rendered: None,
            timer: None,
            images: HashMap::new(),
            retired: Vec::new(),
        }));

        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or(EditorError::MissingRoot)?;

        let listeners = vec![
            listen(&host, &element, "input", false, on_input),
            listen(&host, &element, "keydown", true, on_keydown),
            listen(&host, &element, "paste", true, on_paste),
            listen(&host, &element, "drop", true, on_drop),
            listen(&host, &element, "focus", false, on_focus),
            listen(&host, &element, "blur", false, on_blur),
            listen(&host, &document, "selectionchange", false, on_selection_change),
            listen(&host, &document, "mousedown", false, on_document_mousedown),
        ];

        pump(&host);
        tracing::debug!(target: "folio::host", "editor attached");

        Ok(Self {
            host,
            _listeners: listeners,
        })
    }

    /// Like [`attach`](Self::attach), with the configuration given as JSON.
    pub fn attach_with_json(
        element: web_sys::HtmlElement,
        config: &str,
        hooks: Box<dyn EditorHooks>,
    ) -> Result<Self, EditorError> {
        let config: EditorConfig =
            serde_json::from_str(config).map_err(|e| EditorError::InvalidConfig(e.to_string()))?;
        Self::attach(element, config, hooks)
    }

    /// Run `f` against the editor, with the live selection pulled in first
    /// and the result rendered afterwards. Returns `None` when the editor is
    /// busy, which only happens when called from inside a hook.
    pub fn with_editor<R>(&self, f: impl FnOnce(&mut RichEditor) -> R) -> Option<R> {
        let result = {
            let Ok(mut host) = self.host.try_borrow_mut() else {
                tracing::warn!("editor is busy, operation skipped");
                return None;
            };
            host.sync_selection();
            f(&mut host.editor)
        };
        pump(&self.host);
        Some(result)
    }

    pub fn get_data(&self, trim: bool, keep_media_tracking_attrs: bool) -> String {
        self.host
            .try_borrow()
            .map(|host| host.editor.get_data(trim, keep_media_tracking_attrs))
            .unwrap_or_default()
    }

    pub fn set_data(&self, data: &str) {
        self.with_editor(|editor| editor.set_data(data, true, true));
    }

    /// Insert an image at the selection and measure it in the background.
    pub fn insert_image(&self, source: ImageSource) -> Result<SmolStr, MediaError> {
        let key = self
            .with_editor(|editor| editor.insert_async_image(source, None, None, false))
            .ok_or(MediaError::TornDown)??;
        load_image(&self.host, key.clone());
        Ok(key)
    }

    /// Where floating controls should go, relative to the viewport.
    pub fn context_coordinates(&self) -> Option<Rect> {
        let host = self.host.try_borrow().ok()?;
        let geometry = BrowserGeometry::new(host.element.clone().into());
        selection::get_context_coordinates(&geometry, host.editor.state().selection().as_ref())
    }

    /// Force pending deferred work to run now.
    pub fn flush(&self) {
        self.with_editor(|editor| editor.flush());
    }

    pub fn teardown(&self) {
        if let Ok(mut host) = self.host.try_borrow_mut() {
            host.editor.teardown();
            host.timer = None;
            host.images.clear();
            host.retired.clear();
        }
    }
}

impl Drop for BrowserEditor {
    fn drop(&mut self) {
        self.teardown();
    }
}

type Handler = fn(&Rc<RefCell<Host>>, &web_sys::Event);

fn listen(
    host: &Rc<RefCell<Host>>,
    target: &web_sys::EventTarget,
    event_type: &'static str,
    prevent_default: bool,
    handler: Handler,
) -> EventListener {
    let weak = Rc::downgrade(host);
    let callback = move |event: &web_sys::Event| {
        if let Some(host) = weak.upgrade() {
            handler(&host, event);
        }
    };
    if prevent_default {
        EventListener::new_with_options(
            target,
            event_type,
            EventListenerOptions::enable_prevent_default(),
            callback,
        )
    } else {
        EventListener::new(target, event_type, callback)
    }
}

/// Run due deferred work, render, and arm a timer for the next task.
fn pump(host: &Rc<RefCell<Host>>) {
    let Ok(mut h) = host.try_borrow_mut() else {
        return;
    };
    h.retired.clear();
    h.editor.poll(Instant::now());
    h.render();

    let next = h.editor.state().timers().next_due();
    h.timer = next.map(|due| {
        let delay = due.saturating_duration_since(Instant::now());
        let millis = u32::try_from(delay.as_millis()).unwrap_or(u32::MAX);
        let weak = Rc::downgrade(host);
        Timeout::new(millis, move || {
            if let Some(host) = weak.upgrade() {
                pump(&host);
            }
        })
    });
}

/// Run `f` with the host borrowed, then pump. Skips when the host is
/// already borrowed further up the stack.
fn with_host(host: &Rc<RefCell<Host>>, f: impl FnOnce(&mut Host)) {
    match host.try_borrow_mut() {
        Ok(mut h) => f(&mut h),
        Err(_) => {
            tracing::trace!(target: "folio::host", "reentrant event skipped");
            return;
        }
    }
    pump(host);
}

// === Event handlers ===

fn on_input(host: &Rc<RefCell<Host>>, _event: &web_sys::Event) {
    with_host(host, Host::import_live);
}

fn on_keydown(host: &Rc<RefCell<Host>>, event: &web_sys::Event) {
    let Some(key_event) = event.dyn_ref::<web_sys::KeyboardEvent>() else {
        return;
    };
    if key_event.is_composing() {
        return;
    }
    let combo = events::key_combo(key_event);
    with_host(host, |h| {
        h.sync_selection();
        if h.editor.handle_key(&combo) {
            event.prevent_default();
        }
    });
}

fn on_paste(host: &Rc<RefCell<Host>>, event: &web_sys::Event) {
    let Some(data) = event
        .dyn_ref::<web_sys::ClipboardEvent>()
        .and_then(|e| e.clipboard_data())
    else {
        return;
    };
    let files = events::transfer_files(&data);
    let html = events::transfer_html(&data);
    if files.is_empty() && html.is_none() {
        return;
    }
    event.prevent_default();

    let mut keys = Vec::new();
    with_host(host, |h| {
        h.sync_selection();
        if !files.is_empty() {
            keys = h.editor.insert_files(files);
        } else if let Some(html) = html {
            h.editor.paste(&html);
        }
    });
    for key in keys {
        load_image(host, key);
    }
}

fn on_drop(host: &Rc<RefCell<Host>>, event: &web_sys::Event) {
    let Some(data) = event
        .dyn_ref::<web_sys::DragEvent>()
        .and_then(|e| e.data_transfer())
    else {
        return;
    };
    let files = events::transfer_files(&data);
    if files.is_empty() {
        // Dropped text goes through native editing and comes back as input.
        return;
    }
    event.prevent_default();

    let mut keys = Vec::new();
    with_host(host, |h| {
        h.sync_selection();
        keys = h.editor.insert_files(files);
    });
    for key in keys {
        load_image(host, key);
    }
}

fn on_focus(host: &Rc<RefCell<Host>>, _event: &web_sys::Event) {
    with_host(host, |h| {
        h.editor.focus(true);
        h.sync_selection();
    });
}

fn on_blur(host: &Rc<RefCell<Host>>, _event: &web_sys::Event) {
    with_host(host, |h| {
        h.editor.blur(false);
    });
}

fn on_selection_change(host: &Rc<RefCell<Host>>, _event: &web_sys::Event) {
    with_host(host, |h| {
        if h.editor.has_focus() {
            h.sync_selection();
        }
    });
}

fn on_document_mousedown(host: &Rc<RefCell<Host>>, event: &web_sys::Event) {
    with_host(host, |h| {
        let inside = events::is_inside(&h.element, event);
        h.editor.document_mousedown(inside);
    });
}

// === Async images ===

/// Load the image tracked under `key` off-document and report the result.
fn load_image(host: &Rc<RefCell<Host>>, key: SmolStr) {
    let src = {
        let Ok(h) = host.try_borrow() else {
            return;
        };
        match h.editor.state().tracker().get(&key) {
            Some(tracked) if !tracked.loaded => tracked.current_source().to_string(),
            _ => return,
        }
    };
    let image = match web_sys::HtmlImageElement::new() {
        Ok(image) => image,
        Err(e) => {
            tracing::warn!("image element creation failed: {:?}", e);
            return;
        }
    };

    let load = {
        let weak = Rc::downgrade(host);
        let key = key.clone();
        EventListener::once(&image, "load", move |event| {
            let dimensions = event
                .target()
                .and_then(|t| t.dyn_into::<web_sys::HtmlImageElement>().ok())
                .map(|img| ImageDimensions {
                    width: img.natural_width(),
                    height: img.natural_height(),
                });
            let outcome = match dimensions {
                Some(dimensions) => ImageLoad::Loaded(dimensions),
                None => ImageLoad::Failed("image element missing from load event".into()),
            };
            finish_image(&weak, &key, outcome);
        })
    };
    let error = {
        let weak = Rc::downgrade(host);
        let key = key.clone();
        EventListener::once(&image, "error", move |_| {
            finish_image(&weak, &key, ImageLoad::Failed(format!("could not load image {key}")));
        })
    };
    image.set_src(&src);

    if let Ok(mut h) = host.try_borrow_mut() {
        h.images.insert(
            key,
            PendingImage {
                _image: image,
                _load: load,
                _error: error,
            },
        );
    }
}

fn finish_image(host: &Weak<RefCell<Host>>, key: &SmolStr, outcome: ImageLoad) {
    let Some(host) = host.upgrade() else {
        return;
    };
    let pending = {
        let Ok(mut h) = host.try_borrow_mut() else {
            return;
        };
        if let Err(e) = h.editor.finish_async_image(key, outcome) {
            tracing::debug!(target: "folio::host", key = %key, "async image not finished: {}", e);
        }
        h.images.remove(key)
    };
    pump(&host);
    // This listener is still running; let a later pump drop it.
    if let (Some(pending), Ok(mut h)) = (pending, host.try_borrow_mut()) {
        h.retired.push(pending);
    }
}
