//! Undo/redo history.
//!
//! Every committed transaction records the document and selection it
//! replaced. Undo swaps the current state with the last snapshot; any new
//! commit clears the redo stack.

use crate::node::Node;
use crate::types::Selection;

/// Document state captured around a commit.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub doc: Node,
    pub selection: Selection,
}

#[derive(Debug, Clone)]
pub struct History {
    undo_stack: Vec<Snapshot>,
    redo_stack: Vec<Snapshot>,
    max_steps: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new(100)
    }
}

impl History {
    pub fn new(max_steps: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_steps,
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Record the state a commit is about to replace.
    pub fn record(&mut self, before: Snapshot) {
        self.redo_stack.clear();
        self.undo_stack.push(before);
        if self.undo_stack.len() > self.max_steps {
            let excess = self.undo_stack.len() - self.max_steps;
            self.undo_stack.drain(..excess);
        }
    }

    /// Pop the previous state, stashing `current` for redo.
    pub fn undo(&mut self, current: Snapshot) -> Option<Snapshot> {
        let previous = self.undo_stack.pop()?;
        self.redo_stack.push(current);
        Some(previous)
    }

    pub fn redo(&mut self, current: Snapshot) -> Option<Snapshot> {
        let next = self.redo_stack.pop()?;
        self.undo_stack.push(current);
        Some(next)
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::NodeKind;

    fn snap(text: &str) -> Snapshot {
        Snapshot {
            doc: Node::with_defaults(NodeKind::Doc, vec![Node::paragraph(text)]).unwrap(),
            selection: Selection::collapsed(1),
        }
    }

    #[test]
    fn undo_then_redo() {
        let mut history = History::default();
        history.record(snap("a"));
        let restored = history.undo(snap("ab")).unwrap();
        assert_eq!(restored, snap("a"));
        assert!(history.can_redo());
        assert_eq!(history.redo(snap("a")).unwrap(), snap("ab"));
        assert!(!history.can_redo());
    }

    #[test]
    fn new_record_clears_redo() {
        let mut history = History::default();
        history.record(snap("a"));
        history.undo(snap("ab"));
        history.record(snap("a"));
        assert!(!history.can_redo());
    }

    #[test]
    fn max_steps_evicts_oldest() {
        let mut history = History::new(2);
        history.record(snap("1"));
        history.record(snap("2"));
        history.record(snap("3"));
        assert_eq!(history.undo(snap("4")).unwrap(), snap("3"));
        assert_eq!(history.undo(snap("3")).unwrap(), snap("2"));
        assert!(history.undo(snap("2")).is_none());
    }
}
