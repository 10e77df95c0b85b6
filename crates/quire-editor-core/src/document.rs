//! Core editor document trait and implementations.
//!
//! Defines the `EditorDocument` trait for abstracting editor state storage
//! (plain fields, reactive signals, a collaborative replica) while sharing
//! the commit, history and cursor-placement logic.

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::EditError;
use crate::node::Node;
use crate::placement;
use crate::position::{ResolvedPos, first_text_pos};
use crate::transaction::Transaction;
use crate::types::Selection;
use crate::undo::{History, Snapshot};

/// Which toggle flavour markdown shortcuts and slash commands create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToggleStyle {
    /// Title stored as an attribute, body holds the blocks.
    #[default]
    Titled,
    /// First child paragraph is the title.
    Notion,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorConfig {
    pub toggle_style: ToggleStyle,
    /// Columns created by the `/grid` command.
    pub default_grid_columns: usize,
    /// Data rows shown in a resolved placeholder table.
    pub placeholder_rows: usize,
    /// Upper bound for paragraph/heading indent. `None` means unbounded.
    pub max_indent: Option<i64>,
    pub history_depth: usize,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            toggle_style: ToggleStyle::Titled,
            default_grid_columns: 2,
            placeholder_rows: 10,
            max_indent: None,
            history_depth: 100,
        }
    }
}

/// Core trait for editor documents.
///
/// Implementors only provide storage. All mutation goes through
/// [`EditorDocument::apply`], which validates the finished document, records
/// history and normalizes the cursor, so a rejected transaction never leaves
/// partial changes behind.
pub trait EditorDocument {
    // === Required: state access ===

    fn doc(&self) -> &Node;

    /// Replace the stored document. No validation.
    fn set_doc(&mut self, doc: Node);

    fn selection(&self) -> Selection;

    /// Replace the stored selection. No validation.
    fn set_selection(&mut self, selection: Selection);

    fn config(&self) -> &EditorConfig;

    fn history(&self) -> &History;

    fn history_mut(&mut self) -> &mut History;

    // === Provided: queries ===

    /// Start a transaction against the current state.
    fn transaction(&self) -> Transaction {
        Transaction::new(self.doc(), self.selection())
    }

    fn resolve(&self, pos: usize) -> Result<ResolvedPos<'_>, EditError> {
        ResolvedPos::resolve(self.doc(), pos)
    }

    /// The cursor head, resolved.
    fn resolve_head(&self) -> Result<ResolvedPos<'_>, EditError> {
        self.resolve(self.selection().head)
    }

    fn to_json(&self) -> Value {
        self.doc().to_json()
    }

    fn text_content(&self) -> String {
        self.doc().text_content()
    }

    // === Provided: commits ===

    /// Commit `tr` atomically.
    fn apply(&mut self, tr: Transaction) -> Result<(), EditError> {
        tr.doc().check()?;
        let changed = tr.doc_changed();
        let (doc, selection) = tr.into_parts();
        let selection = placement::settle(&doc, selection);
        if changed {
            let before = Snapshot {
                doc: self.doc().clone(),
                selection: self.selection(),
            };
            self.history_mut().record(before);
            self.set_doc(doc);
        }
        self.set_selection(selection);
        Ok(())
    }

    /// Commit `tr`, logging and dropping it on failure.
    fn dispatch(&mut self, tr: Transaction) -> bool {
        match self.apply(tr) {
            Ok(()) => true,
            Err(err) => {
                warn!(%err, "transaction rejected");
                false
            }
        }
    }

    /// Move the cursor, settling it into a textblock.
    fn move_cursor(&mut self, pos: usize) {
        let selection = placement::settle(self.doc(), Selection::collapsed(pos));
        self.set_selection(selection);
    }

    /// Replace the whole document, e.g. after loading. Clears history.
    fn load(&mut self, doc: Node) -> Result<(), EditError> {
        doc.check()?;
        let cursor = first_text_pos(&doc, 0).map_or(0, |p| p - 1);
        self.set_selection(placement::settle(&doc, Selection::collapsed(cursor)));
        self.set_doc(doc);
        self.history_mut().clear();
        Ok(())
    }

    // === Provided: history ===

    fn undo(&mut self) -> bool {
        let current = Snapshot {
            doc: self.doc().clone(),
            selection: self.selection(),
        };
        let Some(previous) = self.history_mut().undo(current) else {
            debug!("nothing to undo");
            return false;
        };
        self.set_doc(previous.doc);
        self.set_selection(previous.selection);
        true
    }

    fn redo(&mut self) -> bool {
        let current = Snapshot {
            doc: self.doc().clone(),
            selection: self.selection(),
        };
        let Some(next) = self.history_mut().redo(current) else {
            debug!("nothing to redo");
            return false;
        };
        self.set_doc(next.doc);
        self.set_selection(next.selection);
        true
    }

    fn can_undo(&self) -> bool {
        self.history().can_undo()
    }

    fn can_redo(&self) -> bool {
        self.history().can_redo()
    }
}

/// Simple field-based implementation of EditorDocument.
///
/// Use this for non-reactive contexts or as a base for testing.
#[derive(Debug, Clone)]
pub struct PlainEditor {
    doc: Node,
    selection: Selection,
    history: History,
    config: EditorConfig,
}

impl Default for PlainEditor {
    fn default() -> Self {
        Self::new(Node::empty_doc())
    }
}

impl PlainEditor {
    /// Editor over `doc` with the cursor in its first textblock.
    pub fn new(doc: Node) -> Self {
        Self::with_config(doc, EditorConfig::default())
    }

    pub fn with_config(doc: Node, config: EditorConfig) -> Self {
        let cursor = first_text_pos(&doc, 0).map_or(0, |p| p - 1);
        let selection = placement::settle(&doc, Selection::collapsed(cursor));
        Self {
            doc,
            selection,
            history: History::new(config.history_depth),
            config,
        }
    }

    pub fn from_json(value: Value) -> Result<Self, EditError> {
        Ok(Self::new(Node::from_json(value)?))
    }

    /// Builder-style selection override, clamped into the document.
    pub fn with_selection(mut self, selection: Selection) -> Self {
        let size = self.doc.content_size();
        self.selection = selection.clamp(size);
        self
    }

    pub fn config_mut(&mut self) -> &mut EditorConfig {
        &mut self.config
    }
}

impl EditorDocument for PlainEditor {
    fn doc(&self) -> &Node {
        &self.doc
    }

    fn set_doc(&mut self, doc: Node) {
        self.doc = doc;
    }

    fn selection(&self) -> Selection {
        self.selection
    }

    fn set_selection(&mut self, selection: Selection) {
        self.selection = selection;
    }

    fn config(&self) -> &EditorConfig {
        &self.config
    }

    fn history(&self) -> &History {
        &self.history
    }

    fn history_mut(&mut self) -> &mut History {
        &mut self.history
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::NodeKind;
    use pretty_assertions::assert_eq;

    fn doc(blocks: Vec<Node>) -> Node {
        Node::with_defaults(NodeKind::Doc, blocks).unwrap()
    }

    #[test]
    fn new_editor_starts_in_first_textblock() {
        let editor = PlainEditor::default();
        assert_eq!(editor.selection(), Selection::collapsed(1));
        assert_eq!(editor.text_content(), "");
    }

    #[test]
    fn apply_commits_and_records_history() {
        let mut editor = PlainEditor::new(doc(vec![Node::paragraph("ab")]));
        let mut tr = editor.transaction();
        tr.insert_text(3, "c").unwrap();
        tr.set_cursor(4);
        assert!(editor.dispatch(tr));
        assert_eq!(editor.text_content(), "abc");
        assert_eq!(editor.selection(), Selection::collapsed(4));
        assert!(editor.can_undo());

        assert!(editor.undo());
        assert_eq!(editor.text_content(), "ab");
        assert!(editor.redo());
        assert_eq!(editor.text_content(), "abc");
        assert!(!editor.redo());
    }

    #[test]
    fn selection_only_transaction_skips_history() {
        let mut editor = PlainEditor::new(doc(vec![Node::paragraph("ab")]));
        let mut tr = editor.transaction();
        tr.set_cursor(2);
        assert!(editor.dispatch(tr));
        assert_eq!(editor.selection(), Selection::collapsed(2));
        assert!(!editor.can_undo());
    }

    #[test]
    fn commit_settles_cursor() {
        let mut editor = PlainEditor::new(doc(vec![Node::paragraph("ab"), Node::paragraph("cd")]));
        let mut tr = editor.transaction();
        tr.insert_text(1, "x").unwrap();
        // Boundary between the two paragraphs.
        tr.set_cursor(5);
        assert!(editor.dispatch(tr));
        assert_eq!(editor.selection(), Selection::collapsed(6));
    }

    #[test]
    fn load_replaces_document_and_clears_history() {
        let mut editor = PlainEditor::default();
        let mut tr = editor.transaction();
        tr.insert_text(1, "x").unwrap();
        editor.dispatch(tr);
        editor
            .load(doc(vec![Node::paragraph("fresh")]))
            .unwrap();
        assert_eq!(editor.text_content(), "fresh");
        assert!(!editor.can_undo());
    }
}
