//! Position resolution.
//!
//! [`ResolvedPos`] turns a flat document position into its ancestor chain,
//! so transforms can ask "which toggle am I in, and where does it start"
//! without walking the tree by hand.

use crate::error::EditError;
use crate::node::Node;
use crate::schema::NodeKind;

#[derive(Debug, Clone, Copy)]
struct Level<'a> {
    node: &'a Node,
    /// Index of the child the position points into (or before).
    index: usize,
    /// Absolute position of that child's start.
    offset: usize,
}

/// A position with its ancestor chain. Depth 0 is the document itself.
#[derive(Debug, Clone)]
pub struct ResolvedPos<'a> {
    pos: usize,
    path: Vec<Level<'a>>,
    parent_offset: usize,
}

impl<'a> ResolvedPos<'a> {
    pub fn resolve(doc: &'a Node, pos: usize) -> Result<Self, EditError> {
        let size = doc.content_size();
        if pos > size {
            return Err(EditError::InvalidPosition { pos, size });
        }

        let mut path = Vec::new();
        let mut node = doc;
        let mut start = 0;
        let mut parent_offset = pos;
        loop {
            let (index, offset) = node.find_index(parent_offset);
            let rem = parent_offset - offset;
            path.push(Level {
                node,
                index,
                offset: start + offset,
            });
            if rem == 0 {
                break;
            }
            // rem > 0 means the position falls strictly inside child `index`.
            let Some(child) = node.child(index) else {
                break;
            };
            if child.is_text() {
                break;
            }
            node = child;
            parent_offset = rem - 1;
            start += offset + 1;
        }

        Ok(Self {
            pos,
            path,
            parent_offset,
        })
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn depth(&self) -> usize {
        self.path.len() - 1
    }

    pub fn node(&self, depth: usize) -> &'a Node {
        self.path[depth].node
    }

    /// The innermost node containing the position.
    pub fn parent(&self) -> &'a Node {
        self.node(self.depth())
    }

    pub fn doc(&self) -> &'a Node {
        self.node(0)
    }

    /// Offset of the position within its parent's content.
    pub fn parent_offset(&self) -> usize {
        self.parent_offset
    }

    /// Index into the ancestor at `depth`.
    pub fn index(&self, depth: usize) -> usize {
        self.path[depth].index
    }

    /// Index just after the position at `depth`.
    pub fn index_after(&self, depth: usize) -> usize {
        let bump = depth != self.depth() || self.text_offset() > 0;
        self.index(depth) + usize::from(bump)
    }

    /// Start of the ancestor's content.
    pub fn start(&self, depth: usize) -> usize {
        if depth == 0 {
            0
        } else {
            self.path[depth - 1].offset + 1
        }
    }

    pub fn end(&self, depth: usize) -> usize {
        self.start(depth) + self.node(depth).content_size()
    }

    /// Position directly before the ancestor at `depth`. Depth must be > 0.
    pub fn before(&self, depth: usize) -> usize {
        self.start(depth).saturating_sub(1)
    }

    /// Position directly after the ancestor at `depth`. Depth must be > 0.
    pub fn after(&self, depth: usize) -> usize {
        self.end(depth) + 1
    }

    /// Offset into the text node the position points into, if any.
    pub fn text_offset(&self) -> usize {
        self.pos - self.path[self.depth()].offset
    }

    pub fn node_after(&self) -> Option<&'a Node> {
        self.parent().child(self.index(self.depth()))
    }

    pub fn node_before(&self) -> Option<&'a Node> {
        let index = self.index(self.depth());
        if self.text_offset() > 0 {
            return self.parent().child(index);
        }
        index.checked_sub(1).and_then(|i| self.parent().child(i))
    }

    /// Depth of the innermost ancestor satisfying `pred`.
    pub fn find_ancestor(&self, pred: impl Fn(&Node) -> bool) -> Option<usize> {
        (0..=self.depth()).rev().find(|&d| pred(self.node(d)))
    }

    /// Depth of the innermost ancestor of one of `kinds`.
    pub fn find_ancestor_kind(&self, kinds: &[NodeKind]) -> Option<usize> {
        self.find_ancestor(|n| kinds.contains(&n.kind()))
    }

    /// True when the position sits at the very start of its textblock.
    pub fn at_block_start(&self) -> bool {
        self.parent().is_textblock() && self.parent_offset == 0
    }

    pub fn at_block_end(&self) -> bool {
        self.parent().is_textblock() && self.parent_offset == self.parent().content_size()
    }

    /// Deepest depth whose content range contains `pos`.
    pub fn shared_depth(&self, pos: usize) -> usize {
        (1..=self.depth())
            .rev()
            .find(|&d| self.start(d) <= pos && self.end(d) >= pos)
            .unwrap_or(0)
    }
}

/// Start of the first textblock in `node`, which sits at `before`.
pub fn first_text_pos(node: &Node, before: usize) -> Option<usize> {
    if node.is_textblock() {
        return Some(before + 1);
    }
    if node.is_leaf() {
        return None;
    }
    let mut pos = before + 1;
    for child in node.content() {
        if let Some(found) = first_text_pos(child, pos) {
            return Some(found);
        }
        pos += child.node_size();
    }
    None
}

/// End of the last textblock in `node`, which sits at `before`.
pub fn last_text_pos(node: &Node, before: usize) -> Option<usize> {
    if node.is_textblock() {
        return Some(before + 1 + node.content_size());
    }
    if node.is_leaf() {
        return None;
    }
    let mut end = before + node.node_size() - 1;
    for child in node.content().iter().rev() {
        end -= child.node_size();
        if let Some(found) = last_text_pos(child, end) {
            return Some(found);
        }
    }
    None
}

/// Nearest position inside a textblock: `pos` itself when it already is one,
/// otherwise the next textblock start, otherwise the previous textblock end.
pub fn text_position_near(doc: &Node, pos: usize) -> Option<usize> {
    let mut before = None;
    let mut found = None;
    doc.descendants(&mut |node, at| {
        if found.is_some() {
            return false;
        }
        if node.is_textblock() {
            let start = at + 1;
            let end = start + node.content_size();
            if (start..=end).contains(&pos) {
                found = Some(pos);
            } else if start > pos {
                found = Some(start);
            } else {
                before = Some(end);
            }
            return false;
        }
        true
    });
    found.or(before)
}

/// End of the last textblock that closes at or before `pos`, or `pos` itself
/// when it already sits inside a textblock.
pub fn text_position_before(doc: &Node, pos: usize) -> Option<usize> {
    let mut found = None;
    doc.descendants(&mut |node, at| {
        if at > pos {
            return false;
        }
        if node.is_textblock() {
            let start = at + 1;
            let end = start + node.content_size();
            if (start..=end).contains(&pos) {
                found = Some(pos);
            } else if end < pos {
                found = Some(end);
            }
            return false;
        }
        true
    });
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attrs::Attrs;

    fn sample() -> Node {
        // doc(toggle(p("ab")), p("cd"))
        let toggle = Node::new(
            NodeKind::Toggle,
            Attrs::new().with("title", "T"),
            vec![Node::paragraph("ab")],
        )
        .unwrap();
        Node::with_defaults(NodeKind::Doc, vec![toggle, Node::paragraph("cd")]).unwrap()
    }

    #[test]
    fn resolves_into_nested_textblock() {
        let doc = sample();
        let rp = ResolvedPos::resolve(&doc, 3).unwrap();
        assert_eq!(rp.depth(), 2);
        assert_eq!(rp.parent().kind(), NodeKind::Paragraph);
        assert_eq!(rp.parent_offset(), 1);
        assert_eq!(rp.start(1), 1);
        assert_eq!(rp.before(1), 0);
        assert_eq!(rp.end(1), 5);
        assert_eq!(rp.after(1), 6);
        assert_eq!(rp.text_offset(), 1);
        assert_eq!(rp.find_ancestor_kind(&[NodeKind::Toggle]), Some(1));
    }

    #[test]
    fn block_boundaries_stay_shallow() {
        let doc = sample();
        let rp = ResolvedPos::resolve(&doc, 6).unwrap();
        assert_eq!(rp.depth(), 0);
        assert_eq!(rp.index(0), 1);
        assert_eq!(rp.node_after().map(Node::kind), Some(NodeKind::Paragraph));
        assert_eq!(rp.node_before().map(Node::kind), Some(NodeKind::Toggle));
    }

    #[test]
    fn out_of_range_is_an_error() {
        let doc = sample();
        assert_eq!(
            ResolvedPos::resolve(&doc, 11).unwrap_err(),
            EditError::InvalidPosition { pos: 11, size: 10 }
        );
    }

    #[test]
    fn text_positions() {
        let doc = sample();
        assert_eq!(first_text_pos(doc.child(0).unwrap(), 0), Some(2));
        assert_eq!(last_text_pos(doc.child(1).unwrap(), 6), Some(9));
        assert_eq!(text_position_near(&doc, 0), Some(2));
        assert_eq!(text_position_near(&doc, 6), Some(7));
        assert_eq!(text_position_near(&doc, 10), Some(9));
        assert_eq!(text_position_before(&doc, 6), Some(4));
        assert_eq!(text_position_before(&doc, 8), Some(8));
        assert_eq!(text_position_before(&doc, 0), None);
    }
}
