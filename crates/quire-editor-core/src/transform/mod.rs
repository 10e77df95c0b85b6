//! Structural transforms.
//!
//! Every transform reads the selection from a [`Transaction`], works out the
//! complete edit up front and only then applies it. `Ok(false)` means the
//! context the transform needs is absent and nothing was changed; an error
//! leaves the transaction as it was before the failing step.

pub mod blocks;
pub mod indent;
pub mod insert;
pub mod lists;
pub mod table;
pub mod toggle;

use crate::error::EditError;
use crate::node::Node;
use crate::position::ResolvedPos;
use crate::schema::NodeKind;
use crate::transaction::Transaction;

/// Outcome of a transform: whether it applied.
pub type Applied = Result<bool, EditError>;

/// A fully built single-range edit and where the cursor ends up.
#[derive(Debug)]
pub(crate) struct Replacement {
    pub from: usize,
    pub to: usize,
    pub nodes: Vec<Node>,
    pub cursor: usize,
}

impl Replacement {
    pub fn apply(self, tr: &mut Transaction) -> Applied {
        tr.replace(self.from, self.to, self.nodes)?;
        tr.set_cursor(self.cursor);
        Ok(true)
    }
}

/// The collapsed cursor, if it sits inside a textblock.
pub(crate) fn text_cursor(tr: &Transaction) -> Result<Option<ResolvedPos<'_>>, EditError> {
    let selection = tr.selection();
    if !selection.is_collapsed() {
        return Ok(None);
    }
    let rp = ResolvedPos::resolve(tr.doc(), selection.head)?;
    Ok(rp.parent().is_textblock().then_some(rp))
}

/// Split `list` around item `index`, putting `middle` between the halves.
///
/// Returns the replacement nodes and the offset at which `middle` starts.
/// The tail of an ordered list keeps its numbering.
pub(crate) fn split_list(
    list: &Node,
    index: usize,
    middle: Vec<Node>,
) -> Result<(Vec<Node>, usize), EditError> {
    let items = list.content();
    let mut out = Vec::with_capacity(middle.len() + 2);
    let mut offset = 0;
    if index > 0 {
        let head = list.copy_with(items[..index].to_vec())?;
        offset = head.node_size();
        out.push(head);
    }
    out.extend(middle);
    if index + 1 < items.len() {
        let mut tail = list.copy_with(items[index + 1..].to_vec())?;
        if list.kind() == NodeKind::OrderedList {
            let start = list.attrs().get_int("start").unwrap_or(1);
            let attrs = list.attrs().clone().with("start", start + index as i64 + 1);
            tail = tail.with_attrs(attrs)?;
        }
        out.push(tail);
    }
    Ok((out, offset))
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::attrs::Attrs;
    use crate::node::Node;
    use crate::schema::NodeKind;

    pub fn doc(blocks: Vec<Node>) -> Node {
        Node::with_defaults(NodeKind::Doc, blocks).unwrap()
    }

    pub fn node(kind: NodeKind, content: Vec<Node>) -> Node {
        Node::with_defaults(kind, content).unwrap()
    }

    pub fn with_attrs(kind: NodeKind, attrs: Attrs, content: Vec<Node>) -> Node {
        Node::new(kind, attrs, content).unwrap()
    }

    pub fn p(text: &str) -> Node {
        Node::paragraph(text)
    }

    pub fn list(kind: NodeKind, items: &[&str]) -> Node {
        let item_kind = kind.list_item_kind().unwrap();
        let items = items.iter().map(|t| node(item_kind, vec![p(t)])).collect();
        node(kind, items)
    }
}
