//! Cursor placement after document changes.
//!
//! A collapsed cursor must always sit inside a textblock. When an edit leaves
//! it on a container boundary, it is moved to the start of that container's
//! first textblock (for item-like containers) or to the nearest textblock.

use tracing::trace;

use crate::node::Node;
use crate::position::{ResolvedPos, first_text_pos, text_position_near};
use crate::schema::NodeKind;
use crate::types::Selection;

/// Containers whose cursor lands on the start of their first textblock.
pub const SNAP_TO_START: [NodeKind; 6] = [
    NodeKind::ListItem,
    NodeKind::TaskItem,
    NodeKind::Toggle,
    NodeKind::NotionToggle,
    NodeKind::TableCell,
    NodeKind::TableHeader,
];

/// Normalize `selection` against `doc`.
pub fn settle(doc: &Node, selection: Selection) -> Selection {
    let size = doc.content_size();
    let selection = selection.clamp(size);
    if !selection.is_collapsed() {
        return selection;
    }
    let Ok(rp) = ResolvedPos::resolve(doc, selection.head) else {
        return selection;
    };
    if rp.parent().is_textblock() {
        return selection;
    }

    let depth = rp.depth();
    let snapped = if depth > 0 && SNAP_TO_START.contains(&rp.parent().kind()) {
        first_text_pos(rp.parent(), rp.before(depth))
    } else {
        None
    };
    match snapped.or_else(|| text_position_near(doc, selection.head)) {
        Some(pos) => {
            trace!(from = selection.head, to = pos, "cursor settled");
            Selection::collapsed(pos)
        }
        None => selection,
    }
}

/// Cursor position inside a freshly placed node at `pos`: its first
/// textblock, or the nearest textblock after it for atoms.
pub fn cursor_into(doc: &Node, pos: usize, node: &Node) -> Option<usize> {
    first_text_pos(node, pos).or_else(|| text_position_near(doc, pos + node.node_size()))
}
