//! Formatting commands.
//!
//! [`CommandRouter`] maps a named command onto [`FormattingPrimitives`]
//! calls and keeps the block invariants intact around them: conflicting
//! block formats are reversed first, blockquotes wrap whole runs of text
//! blocks, superfluous nesting is flattened afterwards, and injected spans
//! and attributes are scrubbed before anyone is told about the change.

pub mod link;
pub mod primitives;

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use crate::dom::{Document, NodeId};
use crate::filter::{
    is_empty_element, scrub_spans_and_bad_attrs, un_block, unwrap_parent_blocks,
};
use crate::platform::PlatformError;
use crate::selection::persist;
use crate::selection::{get_node_list, get_root_elements};
use crate::tags::{HEADING_TAGS, LINE_BREAK_TAG, PARAGRAPH_TAG, TEXT_BLOCK_TAGS};

pub use link::{LinkDraft, LinkEditor, normalize_href};
pub use primitives::{EditContext, FormattingPrimitives, ModelPrimitives};

/// Outdent passes attempted when removing list formatting.
const MAX_OUTDENT_PASSES: usize = 10;

/// Inline formatting marks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InlineMark {
    Bold,
    Italic,
    Underline,
    Strikethrough,
    Subscript,
    Superscript,
}

impl InlineMark {
    pub const ALL: [InlineMark; 6] = [
        InlineMark::Bold,
        InlineMark::Italic,
        InlineMark::Underline,
        InlineMark::Strikethrough,
        InlineMark::Subscript,
        InlineMark::Superscript,
    ];

    /// Tag the editor writes for this mark.
    pub fn tag(self) -> &'static str {
        self.tags()[0]
    }

    /// Every tag that counts as this mark.
    pub fn tags(self) -> &'static [&'static str] {
        match self {
            InlineMark::Bold => &["b", "strong"],
            InlineMark::Italic => &["i", "em"],
            InlineMark::Underline => &["u"],
            InlineMark::Strikethrough => &["strike", "s"],
            InlineMark::Subscript => &["sub"],
            InlineMark::Superscript => &["sup"],
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            InlineMark::Bold => "bold",
            InlineMark::Italic => "italic",
            InlineMark::Underline => "underline",
            InlineMark::Strikethrough => "strikethrough",
            InlineMark::Subscript => "subscript",
            InlineMark::Superscript => "superscript",
        }
    }
}

/// Block formats a command can apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKind {
    Paragraph,
    /// Level 1 to 6.
    Heading(u8),
    Blockquote,
    Preformatted,
}

impl BlockKind {
    pub fn tag(self) -> &'static str {
        match self {
            BlockKind::Paragraph => PARAGRAPH_TAG,
            BlockKind::Heading(level) => HEADING_TAGS[usize::from(level.clamp(1, 6) - 1)],
            BlockKind::Blockquote => "blockquote",
            BlockKind::Preformatted => "pre",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        let tag = tag.trim().to_ascii_lowercase();
        match tag.as_str() {
            "p" => Some(BlockKind::Paragraph),
            "blockquote" => Some(BlockKind::Blockquote),
            "pre" => Some(BlockKind::Preformatted),
            _ => HEADING_TAGS
                .iter()
                .position(|h| *h == tag)
                .map(|i| BlockKind::Heading(i as u8 + 1)),
        }
    }

    /// Blocks with formatting of their own, which a new block format
    /// replaces.
    pub fn is_formatted(self) -> bool {
        !matches!(self, BlockKind::Paragraph)
    }

    fn formatted() -> impl Iterator<Item = BlockKind> {
        (1..=6)
            .map(BlockKind::Heading)
            .chain([BlockKind::Blockquote, BlockKind::Preformatted])
    }
}

/// A formatting command.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FormatCommand {
    Bold,
    Italic,
    Underline,
    Strikethrough,
    Subscript,
    Superscript,
    Block(BlockKind),
    OrderedList,
    UnorderedList,
    Link,
    RemoveFormat,
    /// Anything else, handed to the platform untouched.
    Native(String),
}

impl FormatCommand {
    /// Parse a command name, optionally qualified by a target element
    /// (`("formatBlock", Some("h2"))`, `("bold", None)`, `("h2", None)`).
    pub fn parse(command: &str, element: Option<&str>) -> Self {
        let name = command.trim().to_ascii_lowercase();
        match name.as_str() {
            "bold" | "b" | "strong" => FormatCommand::Bold,
            "italic" | "i" | "em" => FormatCommand::Italic,
            "underline" | "u" => FormatCommand::Underline,
            "strikethrough" | "strike" | "s" => FormatCommand::Strikethrough,
            "subscript" | "sub" => FormatCommand::Subscript,
            "superscript" | "sup" => FormatCommand::Superscript,
            "insertorderedlist" | "ol" => FormatCommand::OrderedList,
            "insertunorderedlist" | "ul" => FormatCommand::UnorderedList,
            "createlink" | "link" | "a" => FormatCommand::Link,
            "removeformat" => FormatCommand::RemoveFormat,
            "formatblock" => match element.and_then(BlockKind::from_tag) {
                Some(kind) => FormatCommand::Block(kind),
                None => FormatCommand::Native(command.to_string()),
            },
            other => match BlockKind::from_tag(other) {
                Some(kind) => FormatCommand::Block(kind),
                None => FormatCommand::Native(command.to_string()),
            },
        }
    }

    pub fn inline_mark(&self) -> Option<InlineMark> {
        match self {
            FormatCommand::Bold => Some(InlineMark::Bold),
            FormatCommand::Italic => Some(InlineMark::Italic),
            FormatCommand::Underline => Some(InlineMark::Underline),
            FormatCommand::Strikethrough => Some(InlineMark::Strikethrough),
            FormatCommand::Subscript => Some(InlineMark::Subscript),
            FormatCommand::Superscript => Some(InlineMark::Superscript),
            _ => None,
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(self, FormatCommand::OrderedList | FormatCommand::UnorderedList)
    }

    /// Canonical name, as used in configuration.
    pub fn name(&self) -> &str {
        match self {
            FormatCommand::Block(kind) => kind.tag(),
            FormatCommand::OrderedList => "insertorderedlist",
            FormatCommand::UnorderedList => "insertunorderedlist",
            FormatCommand::Link => "createlink",
            FormatCommand::RemoveFormat => "removeformat",
            FormatCommand::Native(name) => name,
            inline => inline.inline_mark().map(InlineMark::name).unwrap_or_default(),
        }
    }
}

impl From<InlineMark> for FormatCommand {
    fn from(mark: InlineMark) -> Self {
        match mark {
            InlineMark::Bold => FormatCommand::Bold,
            InlineMark::Italic => FormatCommand::Italic,
            InlineMark::Underline => FormatCommand::Underline,
            InlineMark::Strikethrough => FormatCommand::Strikethrough,
            InlineMark::Subscript => FormatCommand::Subscript,
            InlineMark::Superscript => FormatCommand::Superscript,
        }
    }
}

impl FromStr for FormatCommand {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(FormatCommand::parse(s, None))
    }
}

impl fmt::Display for FormatCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What applying a command did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    Applied,
    /// The command needs input first; the link editor should open.
    OpenLinkEditor,
}

/// Dispatches formatting commands onto a primitive surface.
#[derive(Debug, Clone, Default)]
pub struct CommandRouter<P = ModelPrimitives> {
    primitives: P,
}

impl<P: FormattingPrimitives> CommandRouter<P> {
    pub fn new(primitives: P) -> Self {
        Self { primitives }
    }

    pub fn primitives(&self) -> &P {
        &self.primitives
    }

    /// Whether `command` is in effect. Platform failures count as "no".
    pub fn is_active(&self, cx: &EditContext<'_>, command: &FormatCommand) -> bool {
        match self.primitives.query_state(cx, command) {
            Ok(state) => state,
            Err(err) => {
                tracing::trace!(target: "folio::commands", %command, %err, "state query failed");
                false
            }
        }
    }

    /// The subset of `candidates` currently in effect (toolbar state).
    pub fn active_commands(
        &self,
        cx: &EditContext<'_>,
        candidates: &[FormatCommand],
    ) -> Vec<FormatCommand> {
        candidates
            .iter()
            .filter(|c| self.is_active(cx, c))
            .cloned()
            .collect()
    }

    fn run(
        &self,
        cx: &mut EditContext<'_>,
        what: &str,
        f: impl FnOnce(&P, &mut EditContext<'_>) -> Result<(), PlatformError>,
    ) {
        if let Err(err) = f(&self.primitives, cx) {
            tracing::warn!(target: "folio::commands", what, %err, "formatting primitive failed");
        }
    }

    /// Apply `command` at the selection.
    pub fn apply(&self, cx: &mut EditContext<'_>, command: &FormatCommand) -> CommandOutcome {
        tracing::trace!(target: "folio::commands", %command, "apply");
        let outcome = match command {
            FormatCommand::Link => CommandOutcome::OpenLinkEditor,
            FormatCommand::Block(kind) => {
                self.apply_block(cx, *kind);
                CommandOutcome::Applied
            }
            FormatCommand::OrderedList | FormatCommand::UnorderedList => {
                let ordered = matches!(command, FormatCommand::OrderedList);
                self.run(cx, "insert_list", |p, cx| p.insert_list(cx, ordered));
                let nodes = get_node_list(cx.doc, cx.root, cx.selection.as_ref(), false);
                cx.preserving_selection(|cx| unwrap_parent_blocks(cx.doc, cx.root, &nodes));
                CommandOutcome::Applied
            }
            FormatCommand::RemoveFormat => {
                for mark in InlineMark::ALL {
                    let mark = FormatCommand::from(mark);
                    if self.is_active(cx, &mark) {
                        self.inverse_inner(cx, &mark);
                    }
                }
                self.run(cx, "remove_format", |p, cx| p.remove_format(cx));
                CommandOutcome::Applied
            }
            FormatCommand::Native(name) => {
                self.run(cx, "exec_native", |p, cx| p.exec_native(cx, name, None));
                CommandOutcome::Applied
            }
            inline => {
                if let Some(mark) = inline.inline_mark() {
                    if !self.is_active(cx, inline) {
                        self.run(cx, "toggle_inline", |p, cx| p.toggle_inline(cx, mark));
                    }
                }
                CommandOutcome::Applied
            }
        };
        self.cleanup(cx);
        outcome
    }

    /// Undo the effect of `command` at the selection.
    pub fn inverse(&self, cx: &mut EditContext<'_>, command: &FormatCommand) {
        tracing::trace!(target: "folio::commands", %command, "inverse");
        self.inverse_inner(cx, command);
        self.cleanup(cx);
    }

    fn inverse_inner(&self, cx: &mut EditContext<'_>, command: &FormatCommand) {
        match command {
            FormatCommand::Block(BlockKind::Paragraph) | FormatCommand::RemoveFormat => {}
            FormatCommand::Block(kind) => self.inverse_block(cx, *kind),
            FormatCommand::OrderedList | FormatCommand::UnorderedList => self.inverse_list(cx),
            FormatCommand::Link => self.run(cx, "unlink", |p, cx| p.unlink(cx)),
            FormatCommand::Native(name) => {
                self.run(cx, "exec_native", |p, cx| p.exec_native(cx, name, None));
            }
            inline => {
                if let Some(mark) = inline.inline_mark() {
                    if self.is_active(cx, inline) {
                        self.run(cx, "toggle_inline", |p, cx| p.toggle_inline(cx, mark));
                    }
                }
            }
        }
    }

    /// Apply when inactive, reverse when active.
    pub fn toggle(&self, cx: &mut EditContext<'_>, command: &FormatCommand) -> CommandOutcome {
        if self.is_active(cx, command) && !matches!(command, FormatCommand::Link) {
            self.inverse(cx, command);
            CommandOutcome::Applied
        } else {
            self.apply(cx, command)
        }
    }

    fn apply_block(&self, cx: &mut EditContext<'_>, kind: BlockKind) {
        for other in BlockKind::formatted().filter(|k| *k != kind) {
            if self.is_active(cx, &FormatCommand::Block(other)) {
                self.inverse_block(cx, other);
            }
        }
        if self.is_active(cx, &FormatCommand::OrderedList)
            || self.is_active(cx, &FormatCommand::UnorderedList)
        {
            self.inverse_list(cx);
        }
        match kind {
            BlockKind::Blockquote => self.wrap_blockquote_runs(cx),
            BlockKind::Preformatted => {
                self.run(cx, "format_block", |p, cx| p.format_block(cx, kind.tag()));
                cx.preserving_selection(|cx| {
                    for block in selected_blocks_with_tag(cx, kind.tag()) {
                        breaks_to_newlines(cx.doc, block);
                    }
                });
            }
            _ => self.run(cx, "format_block", |p, cx| p.format_block(cx, kind.tag())),
        }
    }

    fn inverse_block(&self, cx: &mut EditContext<'_>, kind: BlockKind) {
        cx.preserving_selection(|cx| {
            for block in selected_blocks_with_tag(cx, kind.tag()) {
                un_block(cx.doc, block);
                match kind {
                    BlockKind::Blockquote => split_lines_into_paragraphs(cx.doc, block),
                    BlockKind::Preformatted => {
                        newlines_to_breaks(cx.doc, block);
                        cx.doc.rename(block, PARAGRAPH_TAG);
                    }
                    _ => cx.doc.rename(block, PARAGRAPH_TAG),
                }
            }
        });
    }

    fn inverse_list(&self, cx: &mut EditContext<'_>) {
        for _ in 0..MAX_OUTDENT_PASSES {
            let in_list = self.is_active(cx, &FormatCommand::OrderedList)
                || self.is_active(cx, &FormatCommand::UnorderedList);
            if !in_list {
                return;
            }
            if let Err(err) = self.primitives.outdent(cx) {
                tracing::warn!(target: "folio::commands", %err, "outdent failed");
                return;
            }
        }
        tracing::warn!(target: "folio::commands", "list still active after outdenting");
    }

    /// Wrap each run of consecutive text blocks in its own blockquote.
    /// Media, lists and separators split the runs and stay outside.
    fn wrap_blockquote_runs(&self, cx: &mut EditContext<'_>) {
        cx.preserving_selection(|cx| {
            let blocks = get_root_elements(cx.doc, cx.root, cx.selection.as_ref());
            let mut runs: Vec<Vec<NodeId>> = vec![Vec::new()];
            for block in blocks {
                if cx.doc.has_tag(block, TEXT_BLOCK_TAGS) && !cx.doc.is_non_editable(block) {
                    if let Some(run) = runs.last_mut() {
                        run.push(block);
                    }
                } else {
                    runs.push(Vec::new());
                }
            }
            for run in runs.into_iter().filter(|r| !r.is_empty()) {
                let doc = &mut *cx.doc;
                let quote = doc.create_element("blockquote");
                doc.insert_before(run[0], quote);
                let mut first = true;
                for block in run {
                    un_block(doc, block);
                    strip_trailing_breaks(doc, block);
                    if !is_empty_element(doc, block, true) {
                        if !first {
                            let br = doc.create_element(LINE_BREAK_TAG);
                            doc.append_child(quote, br);
                        }
                        doc.move_children(block, quote);
                        first = false;
                    }
                    doc.remove(block);
                }
                if doc.children(quote).is_empty() {
                    let br = doc.create_element(LINE_BREAK_TAG);
                    doc.append_child(quote, br);
                }
            }
        });
    }

    /// Scrub spans and injected attributes from the whole document.
    fn cleanup(&self, cx: &mut EditContext<'_>) {
        let saved = cx.save_selection();
        let blocks = cx.doc.children(cx.root).to_vec();
        let removed = scrub_spans_and_bad_attrs(cx.doc, &blocks);
        if !removed {
            return;
        }
        let caret_lost = cx
            .selection
            .is_some_and(|s| !cx.doc.is_live(s.anchor.node) || !cx.doc.is_live(s.focus.node));
        if saved.is_some_and(|s| !s.is_collapsed()) || caret_lost {
            cx.selection = persist::restore(cx.doc, saved.as_ref());
        }
    }
}

fn selected_blocks_with_tag(cx: &EditContext<'_>, tag: &str) -> Vec<NodeId> {
    get_root_elements(cx.doc, cx.root, cx.selection.as_ref())
        .into_iter()
        .filter(|&b| cx.doc.has_tag(b, &[tag]))
        .collect()
}

fn strip_trailing_breaks(doc: &mut Document, block: NodeId) {
    while let Some(last) = doc.last_child(block) {
        if doc.has_tag(last, &[LINE_BREAK_TAG]) && doc.children(block).len() > 1 {
            doc.remove(last);
        } else {
            break;
        }
    }
}

/// Replace every `<br>` in `block` with a literal newline.
fn breaks_to_newlines(doc: &mut Document, block: NodeId) {
    let breaks: Vec<NodeId> = doc
        .descendants(block)
        .into_iter()
        .filter(|&n| doc.has_tag(n, &[LINE_BREAK_TAG]))
        .collect();
    let only_child = breaks.len() == 1 && doc.children(block).len() == 1;
    if only_child {
        return;
    }
    for br in breaks {
        let newline = doc.create_text("\n");
        doc.replace_with(br, newline);
        doc.remove(br);
    }
    doc.normalize(block);
}

/// Replace literal newlines in `block` with `<br>` elements.
fn newlines_to_breaks(doc: &mut Document, block: NodeId) {
    for text in doc.text_nodes(block) {
        let Some(content) = doc.text(text).map(str::to_string) else {
            continue;
        };
        if !content.contains('\n') {
            continue;
        }
        let content = content.strip_suffix('\n').unwrap_or(&content);
        let mut reference = text;
        for (i, line) in content.split('\n').enumerate() {
            if i > 0 {
                let br = doc.create_element(LINE_BREAK_TAG);
                doc.insert_after(reference, br);
                reference = br;
            }
            if !line.is_empty() {
                let node = doc.create_text(line);
                doc.insert_after(reference, node);
                reference = node;
            }
        }
        doc.remove(text);
    }
}

/// Turn a blockquote's `<br>`-separated lines into paragraphs placed where
/// the blockquote was.
fn split_lines_into_paragraphs(doc: &mut Document, block: NodeId) {
    let mut lines: Vec<Vec<NodeId>> = vec![Vec::new()];
    for child in doc.children(block).to_vec() {
        if doc.has_tag(child, &[LINE_BREAK_TAG]) {
            lines.push(Vec::new());
        } else if let Some(line) = lines.last_mut() {
            line.push(child);
        }
    }
    if lines.len() > 1 && lines.last().is_some_and(Vec::is_empty) {
        lines.pop();
    }
    for line in lines {
        let p = doc.create_element(PARAGRAPH_TAG);
        doc.insert_before(block, p);
        for node in line {
            doc.append_child(p, node);
        }
        if doc.children(p).is_empty() {
            let br = doc.create_element(LINE_BREAK_TAG);
            doc.append_child(p, br);
        }
    }
    doc.remove(block);
}
