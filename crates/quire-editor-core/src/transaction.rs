//! Atomic document edits.
//!
//! A [`Transaction`] accumulates [`Step`]s against a private copy of the
//! document. Every step is validated as it is added; the caller's document
//! is untouched until the finished transaction is committed, so a failed
//! step simply means the transaction is dropped.

use tracing::trace;

use crate::attrs::{AttrValue, Attrs};
use crate::error::EditError;
use crate::node::Node;
use crate::position::ResolvedPos;
use crate::schema::NodeKind;
use crate::types::{Affinity, Selection};

#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Replace `from..to` (which must share a parent) with `content`.
    Replace {
        from: usize,
        to: usize,
        content: Vec<Node>,
    },
    /// Replace the full attribute map of the node starting at `pos`.
    SetAttrs { pos: usize, attrs: Attrs },
    /// Change the type of the node at `pos`, keeping its content.
    SetKind {
        pos: usize,
        kind: NodeKind,
        attrs: Attrs,
    },
}

impl Step {
    pub fn apply(&self, doc: &Node) -> Result<Node, EditError> {
        match self {
            Self::Replace { from, to, content } => replace(doc, *from, *to, content),
            Self::SetAttrs { pos, attrs } => {
                update_node_at(doc, *pos, |node| node.with_attrs(attrs.clone()))
            }
            Self::SetKind { pos, kind, attrs } => update_node_at(doc, *pos, |node| {
                Node::new(*kind, attrs.clone(), node.content().to_vec())
            }),
        }
    }

    /// Map a position from before this step to after it.
    pub fn map(&self, pos: usize, affinity: Affinity) -> usize {
        let Self::Replace { from, to, content } = self else {
            return pos;
        };
        let inserted: usize = content.iter().map(Node::node_size).sum();
        if pos < *from {
            return pos;
        }
        if pos > *to {
            return pos - (to - from) + inserted;
        }
        let side = if from == to {
            affinity
        } else if pos == *from {
            Affinity::Before
        } else if pos == *to {
            Affinity::After
        } else {
            affinity
        };
        match side {
            Affinity::Before => *from,
            Affinity::After => from + inserted,
        }
    }
}

fn replace(doc: &Node, from: usize, to: usize, content: &[Node]) -> Result<Node, EditError> {
    if from > to {
        return Err(EditError::InvalidRange { from, to });
    }
    let rf = ResolvedPos::resolve(doc, from)?;
    let rt = ResolvedPos::resolve(doc, to)?;
    let depth = rf.depth();
    if rt.depth() != depth || rf.start(depth) != rt.start(depth) {
        return Err(EditError::InvalidRange { from, to });
    }
    let path: Vec<usize> = (0..depth).map(|d| rf.index(d)).collect();
    let start = rf.start(depth);

    rebuild(doc, &path, |parent| {
        let mut children = parent.slice_content(0, from - start)?;
        children.extend(content.iter().cloned());
        children.extend(parent.slice_content(to - start, parent.content_size())?);
        parent.copy_with(children)
    })
}

fn update_node_at(
    doc: &Node,
    pos: usize,
    f: impl FnOnce(&Node) -> Result<Node, EditError>,
) -> Result<Node, EditError> {
    let rp = ResolvedPos::resolve(doc, pos)?;
    let node = rp
        .node_after()
        .filter(|n| rp.text_offset() == 0 && !n.is_text())
        .ok_or(EditError::InvalidPosition {
            pos,
            size: doc.content_size(),
        })?;
    let updated = f(node)?;
    let path: Vec<usize> = (0..=rp.depth()).map(|d| rp.index(d)).collect();
    let (last, parents) = path.split_last().ok_or(EditError::InvalidPosition {
        pos,
        size: doc.content_size(),
    })?;
    rebuild(doc, parents, |parent| parent.replace_child(*last, updated))
}

/// Rebuild the spine from `node` down the child `path`, replacing the node
/// at the end of the path with `f(node)`.
fn rebuild(
    node: &Node,
    path: &[usize],
    f: impl FnOnce(&Node) -> Result<Node, EditError>,
) -> Result<Node, EditError> {
    match path.split_first() {
        None => f(node),
        Some((&index, rest)) => {
            let child = node.child(index).ok_or(EditError::InvalidPosition {
                pos: index,
                size: node.child_count(),
            })?;
            let updated = rebuild(child, rest, f)?;
            node.replace_child(index, updated)
        }
    }
}

#[derive(Debug, Clone)]
#[must_use = "a transaction does nothing until it is committed"]
pub struct Transaction {
    before: Node,
    doc: Node,
    steps: Vec<Step>,
    selection: Selection,
}

impl Transaction {
    pub fn new(doc: &Node, selection: Selection) -> Self {
        Self {
            before: doc.clone(),
            doc: doc.clone(),
            steps: Vec::new(),
            selection,
        }
    }

    /// The document as it stands after the steps so far.
    pub fn doc(&self) -> &Node {
        &self.doc
    }

    /// The document the transaction started from.
    pub fn doc_before(&self) -> &Node {
        &self.before
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn doc_changed(&self) -> bool {
        !self.steps.is_empty()
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn set_selection(&mut self, selection: Selection) -> &mut Self {
        self.selection = selection;
        self
    }

    pub fn set_cursor(&mut self, pos: usize) -> &mut Self {
        self.set_selection(Selection::collapsed(pos))
    }

    /// Apply a step. On error the transaction is left as it was.
    pub fn step(&mut self, step: Step) -> Result<&mut Self, EditError> {
        let doc = step.apply(&self.doc)?;
        trace!(?step, "step applied");
        self.selection = self
            .selection
            .map(|pos| step.map(pos, Affinity::After));
        self.doc = doc;
        self.steps.push(step);
        Ok(self)
    }

    pub fn replace(
        &mut self,
        from: usize,
        to: usize,
        content: Vec<Node>,
    ) -> Result<&mut Self, EditError> {
        self.step(Step::Replace { from, to, content })
    }

    pub fn replace_with(&mut self, from: usize, to: usize, node: Node) -> Result<&mut Self, EditError> {
        self.replace(from, to, vec![node])
    }

    pub fn insert(&mut self, pos: usize, content: Vec<Node>) -> Result<&mut Self, EditError> {
        self.replace(pos, pos, content)
    }

    pub fn delete(&mut self, from: usize, to: usize) -> Result<&mut Self, EditError> {
        self.replace(from, to, Vec::new())
    }

    /// Insert `text` at `pos`, taking the marks of the text just before it.
    pub fn insert_text(&mut self, pos: usize, text: &str) -> Result<&mut Self, EditError> {
        if text.is_empty() {
            return Ok(self);
        }
        let marks = ResolvedPos::resolve(&self.doc, pos)?
            .node_before()
            .filter(|n| n.is_text())
            .map(|n| n.marks().to_vec())
            .unwrap_or_default();
        self.replace(pos, pos, vec![Node::text_with_marks(text, marks)])
    }

    pub fn set_node_attrs(&mut self, pos: usize, attrs: Attrs) -> Result<&mut Self, EditError> {
        self.step(Step::SetAttrs { pos, attrs })
    }

    /// Read-modify-write of a single attribute.
    pub fn set_node_attr(
        &mut self,
        pos: usize,
        name: &str,
        value: impl Into<AttrValue>,
    ) -> Result<&mut Self, EditError> {
        let attrs = self
            .node_at(pos)?
            .attrs()
            .clone()
            .with(name, value);
        self.set_node_attrs(pos, attrs)
    }

    pub fn set_node_kind(
        &mut self,
        pos: usize,
        kind: NodeKind,
        attrs: Attrs,
    ) -> Result<&mut Self, EditError> {
        self.step(Step::SetKind { pos, kind, attrs })
    }

    /// The node starting at `pos` in the current document.
    pub fn node_at(&self, pos: usize) -> Result<&Node, EditError> {
        let rp = ResolvedPos::resolve(&self.doc, pos)?;
        rp.node_after()
            .filter(|_| rp.text_offset() == 0)
            .ok_or(EditError::InvalidPosition {
                pos,
                size: self.doc.content_size(),
            })
    }

    /// Map a position in the starting document through every step.
    pub fn map(&self, pos: usize, affinity: Affinity) -> usize {
        self.steps
            .iter()
            .fold(pos, |pos, step| step.map(pos, affinity))
    }

    pub fn into_parts(self) -> (Node, Selection) {
        (self.doc, self.selection)
    }
}
