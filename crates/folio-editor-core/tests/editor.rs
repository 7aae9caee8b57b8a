//! End-to-end behavior of the rich editor through its public API.

use std::cell::RefCell;
use std::rc::Rc;

use folio_editor_core::dom::{inner_html, parse_fragment};
use folio_editor_core::filter::flatten_blocks_down;
use folio_editor_core::selection::{self, SavedSelection};
use folio_editor_core::{
    Direction, Document, DomSelection, Editor, EditorConfig, EditorHooks, FileRef, FilterRules,
    ImageDimensions, ImageLoad, ImageSource, MediaError, NoHooks, NodeId, Position, ResolvedImage,
    RichEditor, Sanitizer, UndoManager,
};

fn editor(html: &str) -> RichEditor {
    RichEditor::from_html(html, EditorConfig::default(), Box::new(NoHooks)).unwrap()
}

fn select_text(editor: &mut RichEditor, start: usize, end: usize) {
    let state = editor.state();
    let saved = SavedSelection {
        container: state.root(),
        start,
        end,
        end_container: None,
    };
    let sel = selection::restore(state.doc(), Some(&saved));
    editor.set_selection(sel);
}

#[derive(Debug, Default)]
struct Events {
    changes: usize,
    added: Vec<ResolvedImage>,
    failed: Vec<MediaError>,
    holders: usize,
}

#[derive(Clone, Default)]
struct Recorder(Rc<RefCell<Events>>);

impl EditorHooks for Recorder {
    fn on_change(&mut self) {
        self.0.borrow_mut().changes += 1;
    }

    fn on_async_image_added(&mut self, image: &ResolvedImage) {
        self.0.borrow_mut().added.push(image.clone());
    }

    fn on_async_image_failed(&mut self, error: &MediaError) {
        self.0.borrow_mut().failed.push(error.clone());
    }

    fn on_media_holder(&mut self, _doc: &Document, _holder: NodeId) {
        self.0.borrow_mut().holders += 1;
    }

    fn paste_hook(&mut self, html: String) -> String {
        html.replace("Lorem", "Ipsum")
    }
}

#[test]
fn test_set_data_round_trip() {
    let mut editor = editor("");
    let cases = [
        ("<p>Hello</p>", "<p>Hello</p>"),
        ("<div><div>Nested</div></div>", "<p>Nested</p>"),
        ("<section><b>bold</b> text</section>", "<p><b>bold</b> text</p>"),
        ("<div>Hello <script>bad()</script>World</div>", "<p>Hello World</p>"),
        ("<strong>a</strong><em>b</em>", "<p><b>a</b><i>b</i></p>"),
    ];
    for (input, expected) in cases {
        editor.set_data(input, true, true);
        assert_eq!(editor.get_data(false, false), expected, "input: {input}");
    }
}

#[test]
fn test_flatten_is_idempotent() {
    let inputs = [
        "<blockquote><p>a</p><p>b</p></blockquote>",
        "loose <b>text</b><h2>head</h2>tail",
        "<ul><li>one</li><li><p>two</p></li></ul>",
        "<div><p>x</p><div><h3>y</h3></div></div>",
        r#"<div class="m" contenteditable="false"><p>opaque</p></div><p>after</p>"#,
    ];
    for input in inputs {
        let mut doc = Document::new();
        let root = parse_fragment(&mut doc, input);
        flatten_blocks_down(&mut doc, root, false);
        let once = inner_html(&doc, root);
        flatten_blocks_down(&mut doc, root, false);
        assert_eq!(inner_html(&doc, root), once, "input: {input}");
    }
}

#[test]
fn test_sanitizer_unwraps_disallowed_elements() {
    let sanitizer = Sanitizer::new(FilterRules::rich().to_config().unwrap());
    let mut doc = Document::new();
    let source = parse_fragment(&mut doc, "<p>a<font><b>kept</b> and <i>this</i></font>b</p>");
    let out = sanitizer.clean(&mut doc, source);
    assert_eq!(inner_html(&doc, out), "<p>a<b>kept</b> and <i>this</i>b</p>");
}

#[test]
fn test_protocol_filtering() {
    let mut editor = editor("");
    editor.set_data(
        r#"<p><a href="javascript:alert(1)">x</a> <a href="/relative">y</a></p>"#,
        true,
        true,
    );
    assert_eq!(
        editor.get_data(false, false),
        r#"<p><a>x</a> <a href="/relative">y</a></p>"#
    );
}

#[test]
fn test_selection_survives_rewrap() {
    let text = "Hello world";
    let len = text.chars().count();
    for start in 0..=len {
        for end in start..=len {
            let mut doc = Document::new();
            let root = parse_fragment(&mut doc, "<p>Hello world</p>");
            let sel = selection::restore(
                &doc,
                Some(&SavedSelection {
                    container: root,
                    start,
                    end,
                    end_container: None,
                }),
            );
            let saved = selection::save(&doc, root, sel.as_ref()).unwrap();

            doc.remove_children(root);
            let fragment = parse_fragment(&mut doc, "<h2><b>He</b>llo <i>wor</i>ld</h2>");
            doc.move_children(fragment, root);

            let restored = selection::restore(&doc, Some(&saved)).unwrap();
            let expected: String = text.chars().skip(start).take(end - start).collect();
            assert_eq!(restored.to_range(&doc).to_string(&doc), expected);
        }
    }
}

#[test]
fn test_three_edits_undo_to_empty_and_redo() {
    let mut editor = editor("");
    editor.focus(false);
    for word in ["one", " two", " three"] {
        assert!(editor.insert_text(word));
        editor.flush();
    }
    assert_eq!(editor.get_html(), "<p>one two three</p>");

    let before = editor.get_html();
    assert!(editor.undo());
    assert!(editor.redo());
    assert_eq!(editor.get_html(), before);

    assert!(editor.undo());
    assert!(editor.undo());
    assert!(editor.undo());
    assert!(!editor.undo());
    assert!(editor.is_empty());
    assert_eq!(editor.get_html(), "<p><br></p>");

    assert!(editor.redo());
    assert_eq!(editor.get_html(), "<p>one</p>");
}

#[test]
fn test_empty_document_invariant() {
    let mut editor = editor("<p>text</p>");
    editor.set_data("", true, true);
    assert!(editor.is_empty());
    let state = editor.state();
    assert_eq!(state.doc().children(state.root()).len(), 1);
    assert_eq!(editor.get_html(), "<p><br></p>");
    assert_eq!(editor.get_data(true, false), "");
}

#[test]
fn test_placeholder_follows_emptiness() {
    let config = EditorConfig {
        placeholder: Some("Write here".into()),
        ..EditorConfig::default()
    };
    let mut editor = RichEditor::from_html("", config, Box::new(NoHooks)).unwrap();
    assert!(editor.placeholder_visible());
    editor.set_data("<p>x</p>", true, true);
    assert!(!editor.placeholder_visible());
    editor.set_placeholder(None);
    editor.set_data("", true, true);
    assert!(!editor.placeholder_visible());
}

#[test]
fn test_blockquote_splits_around_media() {
    let mut editor = editor("<p>one</p><p>two</p>");
    let Some(first) = editor.state().doc().first_child(editor.state().root()) else {
        panic!("first block");
    };
    editor.set_selection(Some(DomSelection::collapsed(Position::new(first, 1))));
    editor.insert_media(r#"<img src="https://img.example/a.png">"#, true, None, Some(Direction::After));

    select_text(&mut editor, 0, 6);
    editor.apply_command("formatblock", Some("blockquote"));
    insta::assert_snapshot!(
        editor.get_html(),
        @r#"<blockquote>one</blockquote><div class="folio-media" contenteditable="false"><img src="https://img.example/a.png"></div><blockquote>two</blockquote>"#
    );
}

#[test]
fn test_inline_media_splits_its_paragraph() {
    let mut editor = editor("");
    editor.set_data(r#"text<img src="/x.png">more"#, true, true);
    insta::assert_snapshot!(
        editor.get_html(),
        @r#"<p>text</p><div class="folio-media" contenteditable="false"><img src="/x.png"></div><p>more</p>"#
    );
    assert_eq!(
        editor.get_data(true, false),
        r#"<p>text</p><img src="/x.png"><p>more</p>"#
    );
}

#[test]
fn test_paste_runs_hook_and_filter() {
    let recorder = Recorder::default();
    let mut editor =
        RichEditor::from_html("<p><br></p>", EditorConfig::default(), Box::new(recorder.clone()))
            .unwrap();
    editor.focus(false);
    assert!(editor.paste(r#"<p style="color:red">Lorem <span>dolor</span></p><script>x()</script>"#));
    assert_eq!(editor.get_html(), "<p>Ipsum dolor</p>");
    assert!(recorder.0.borrow().changes > 0);
}

#[test]
fn test_async_image_lifecycle() {
    let recorder = Recorder::default();
    let mut editor =
        RichEditor::from_html("<p>intro</p>", EditorConfig::default(), Box::new(recorder.clone()))
            .unwrap();
    editor.focus(false);

    let key = editor
        .insert_async_image(ImageSource::url("blob:local-1"), None, None, false)
        .unwrap();
    assert_eq!(key, "img-1");
    assert_eq!(recorder.0.borrow().holders, 1);
    assert_eq!(
        editor.get_data(true, true),
        r#"<p>intro</p><img src="blob:local-1" data-folio-key="img-1">"#
    );

    let size = ImageDimensions {
        width: 640,
        height: 480,
    };
    editor
        .finish_async_image(&key, ImageLoad::Loaded(size))
        .unwrap();
    editor
        .finish_async_image(&key, ImageLoad::Loaded(size))
        .unwrap();
    assert_eq!(recorder.0.borrow().added.len(), 1);

    editor
        .update_async_image(&key, Some("https://cdn.example/final.png"), &[("alt", "photo")])
        .unwrap();
    assert_eq!(
        editor.get_data(true, false),
        r#"<p>intro</p><img src="https://cdn.example/final.png" width="640" height="480" alt="photo">"#
    );

    // Undo back past the insertion, then redo: the newest source comes back.
    editor.flush();
    assert!(editor.undo());
    assert_eq!(editor.get_data(true, false), "<p>intro</p>");
    assert!(editor.redo());
    assert!(editor.get_data(true, false).contains("https://cdn.example/final.png"));

    assert_eq!(
        editor.update_async_image("img-9", None, &[]),
        Err(MediaError::UnknownKey("img-9".into()))
    );
}

#[test]
fn test_async_image_updates_after_capture_are_not_undo_steps() {
    let mut editor = editor("<p>intro</p>");
    editor.focus(false);
    let key = editor
        .insert_async_image(ImageSource::url("blob:1"), None, None, false)
        .unwrap();
    editor.flush();

    let size = ImageDimensions {
        width: 640,
        height: 480,
    };
    editor.finish_async_image(&key, ImageLoad::Loaded(size)).unwrap();
    editor
        .update_async_image(&key, Some("https://cdn.example/final.png"), &[])
        .unwrap();

    assert!(editor.undo());
    assert_eq!(editor.get_data(true, false), "<p>intro</p>");
    assert!(!editor.can_undo());
    assert!(editor.redo());
    assert_eq!(
        editor.get_data(true, false),
        r#"<p>intro</p><img src="https://cdn.example/final.png" width="640" height="480">"#
    );
}

#[test]
fn test_image_file_insert_lifecycle() {
    let recorder = Recorder::default();
    let mut editor =
        RichEditor::from_html("<p>intro</p>", EditorConfig::default(), Box::new(recorder.clone()))
            .unwrap();
    editor.focus(false);

    let files = vec![FileRef {
        name: "photo.png".into(),
        mime: "image/png".into(),
        object_url: Some("blob:photo".into()),
    }];
    let keys = editor.insert_files(files);
    assert_eq!(keys.len(), 1);
    let key = &keys[0];

    let size = ImageDimensions {
        width: 32,
        height: 16,
    };
    editor.finish_async_image(key, ImageLoad::Loaded(size)).unwrap();
    editor.finish_async_image(key, ImageLoad::Loaded(size)).unwrap();

    let added = recorder.0.borrow().added.clone();
    assert_eq!(added.len(), 1);
    assert_eq!(added[0].src, "blob:photo");
    assert_eq!(added[0].dimensions, Some(size));

    let tracked = editor.get_data(false, true);
    assert!(tracked.contains("data-folio-key"));
    assert!(tracked.contains(r#"src="blob:photo""#));
    assert!(!editor.get_data(false, false).contains("data-folio-key"));
}

#[test]
fn test_async_image_failures_are_reported() {
    let recorder = Recorder::default();
    let mut editor =
        RichEditor::from_html("<p>x</p>", EditorConfig::default(), Box::new(recorder.clone()))
            .unwrap();
    assert_eq!(
        editor.insert_async_image(ImageSource::default(), None, None, true),
        Err(MediaError::NoSource)
    );
    let files = vec![FileRef {
        name: "notes.pdf".into(),
        mime: "application/pdf".into(),
        object_url: None,
    }];
    assert!(editor.insert_files(files).is_empty());
    assert_eq!(recorder.0.borrow().failed.len(), 2);
    assert_eq!(editor.get_html(), "<p>x</p>");
}

#[test]
fn test_iframes_are_neutralized_inside_and_restored_on_output() {
    let mut editor = editor("");
    editor.set_data(r#"<iframe src="https://video.example/embed/1"></iframe>"#, true, true);
    insta::assert_snapshot!(
        editor.get_html(),
        @r#"<div class="folio-media" contenteditable="false"><iframe src="about:blank" data-src="https://video.example/embed/1"></iframe></div>"#
    );
    assert_eq!(
        editor.get_data(false, false),
        r#"<iframe src="https://video.example/embed/1"></iframe>"#
    );
}
