//! Bullet, ordered and task lists.
//!
//! Converting between list kinds only ever touches the item under the
//! cursor: it is split out of its list into a new single-item list of the
//! target kind, and the siblings stay where they were.

use tracing::debug;

use super::{Applied, Replacement, split_list, text_cursor};
use crate::attrs::Attrs;
use crate::error::EditError;
use crate::node::Node;
use crate::position::ResolvedPos;
use crate::schema::NodeKind;
use crate::transaction::Transaction;

/// Item of kind `item_kind` holding `content`. Attributes survive only when
/// the kind is unchanged.
fn retype_item(item: &Node, item_kind: NodeKind, content: Vec<Node>) -> Result<Node, EditError> {
    let attrs = if item.kind() == item_kind {
        item.attrs().clone()
    } else {
        Attrs::new()
    };
    Node::new(item_kind, attrs, content)
}

/// Put the cursor's block into a list of `kind`.
///
/// Outside a list the block is wrapped (headings become paragraphs). In the
/// first block of an item of the same kind the item is lifted out; in an
/// item of another kind that single item moves to a new list of `kind`.
pub fn toggle_list(tr: &mut Transaction, kind: NodeKind) -> Applied {
    let Some(item_kind) = kind.list_item_kind() else {
        return Err(EditError::InvalidArgument(format!("{kind} is not a list")));
    };
    let plan = {
        let Some(rp) = text_cursor(tr)? else {
            return Ok(false);
        };
        let depth = rp.depth();
        let in_item =
            depth >= 3 && rp.node(depth - 1).kind().is_list_item() && rp.index(depth - 1) == 0;

        if in_item {
            let item_depth = depth - 1;
            let list_depth = depth - 2;
            let list = rp.node(list_depth);
            if list.kind() == kind {
                None
            } else {
                let item = rp.node(item_depth);
                let moved = retype_item(item, item_kind, item.content().to_vec())?;
                let single = Node::with_defaults(kind, vec![moved])?;
                let (nodes, offset) = split_list(list, rp.index(list_depth), vec![single])?;
                let from = rp.before(list_depth);
                let within_item = rp.pos() - rp.before(item_depth);
                Some(Replacement {
                    from,
                    to: rp.after(list_depth),
                    nodes,
                    cursor: from + offset + 1 + within_item,
                })
            }
        } else {
            let block = rp.parent();
            let paragraph = Node::with_defaults(NodeKind::Paragraph, block.content().to_vec())?;
            let item = Node::with_defaults(item_kind, vec![paragraph])?;
            let list = Node::with_defaults(kind, vec![item])?;
            let from = rp.before(depth);
            Some(Replacement {
                from,
                to: rp.after(depth),
                nodes: vec![list],
                cursor: from + 3 + rp.parent_offset(),
            })
        }
    };
    match plan {
        Some(plan) => {
            debug!(%kind, pos = plan.from, "list toggled");
            plan.apply(tr)
        }
        None => lift_list_item(tr),
    }
}

/// Innermost list item around the cursor and the depth of its list.
fn item_context(rp: &ResolvedPos<'_>) -> Option<(usize, usize)> {
    let item_depth = rp.find_ancestor(|n| n.kind().is_list_item())?;
    (item_depth >= 2).then_some((item_depth, item_depth - 1))
}

/// Move the cursor's list item one level out.
///
/// A nested item becomes the sibling following its parent item and adopts
/// the items that came after it. A top-level item leaves the list entirely:
/// its children become plain blocks and the list is split around them.
pub fn lift_list_item(tr: &mut Transaction) -> Applied {
    let head = tr.selection().head;
    let plan = {
        let rp = ResolvedPos::resolve(tr.doc(), head)?;
        let Some((item_depth, list_depth)) = item_context(&rp) else {
            return Ok(false);
        };
        let list = rp.node(list_depth);
        let item = rp.node(item_depth);
        let index = rp.index(list_depth);
        let within = head - rp.start(item_depth);
        let items = list.content();

        let nested = list_depth >= 3 && rp.node(list_depth - 1).kind().is_list_item();
        if nested {
            let parent_depth = list_depth - 1;
            let parent_item = rp.node(parent_depth);
            let outer = rp.node(parent_depth - 1);

            let mut moved_children = item.content().to_vec();
            if index + 1 < items.len() {
                moved_children.push(list.copy_with(items[index + 1..].to_vec())?);
            }
            let target_kind = outer.kind().list_item_kind().unwrap_or(item.kind());
            let moved = retype_item(item, target_kind, moved_children)?;

            let mut siblings = parent_item.content().to_vec();
            let slot = rp.index(parent_depth);
            if index > 0 {
                siblings[slot] = list.copy_with(items[..index].to_vec())?;
            } else {
                siblings.remove(slot);
            }
            let new_parent = parent_item.copy_with(siblings)?;
            let from = rp.before(parent_depth);
            Replacement {
                from,
                to: rp.after(parent_depth),
                cursor: from + new_parent.node_size() + 1 + within,
                nodes: vec![new_parent, moved],
            }
        } else {
            let (nodes, offset) = split_list(list, index, item.content().to_vec())?;
            let from = rp.before(list_depth);
            Replacement {
                from,
                to: rp.after(list_depth),
                nodes,
                cursor: from + offset + within,
            }
        }
    };
    debug!(pos = plan.from, "list item lifted");
    plan.apply(tr)
}

/// Nest the cursor's list item under its previous sibling. The first item
/// of a list cannot be sunk.
pub fn sink_list_item(tr: &mut Transaction) -> Applied {
    let head = tr.selection().head;
    let plan = {
        let rp = ResolvedPos::resolve(tr.doc(), head)?;
        let Some((item_depth, list_depth)) = item_context(&rp) else {
            return Ok(false);
        };
        let index = rp.index(list_depth);
        if index == 0 {
            return Ok(false);
        }
        let list = rp.node(list_depth);
        let item = rp.node(item_depth);
        let Some(prev) = list.child(index - 1) else {
            return Ok(false);
        };
        let within = head - rp.start(item_depth);

        let mut children = prev.content().to_vec();
        // Position of the moved item relative to the previous item's start.
        let item_offset = match prev.last_child() {
            Some(last) if last.kind() == list.kind() => {
                let offset = 1 + prev.content_size() - last.node_size() + 1 + last.content_size();
                let mut nested = last.content().to_vec();
                nested.push(item.clone());
                let merged = last.copy_with(nested)?;
                if let Some(slot) = children.last_mut() {
                    *slot = merged;
                }
                offset
            }
            _ => {
                let offset = 1 + prev.content_size() + 1;
                children.push(Node::with_defaults(list.kind(), vec![item.clone()])?);
                offset
            }
        };
        let new_prev = prev.copy_with(children)?;
        let from = rp.before(item_depth) - prev.node_size();
        Replacement {
            from,
            to: rp.after(item_depth),
            nodes: vec![new_prev],
            cursor: from + item_offset + 1 + within,
        }
    };
    debug!(pos = plan.from, "list item sunk");
    plan.apply(tr)
}

/// Enter inside the first paragraph of a list item: split the item at the
/// cursor. An item with nothing but an empty paragraph is lifted instead.
pub fn split_list_item(tr: &mut Transaction) -> Applied {
    let plan = {
        let Some(rp) = text_cursor(tr)? else {
            return Ok(false);
        };
        let depth = rp.depth();
        if depth < 3 || !rp.node(depth - 1).kind().is_list_item() || rp.index(depth - 1) != 0 {
            return Ok(false);
        }
        let block = rp.parent();
        let item = rp.node(depth - 1);
        if block.is_content_empty() && item.child_count() == 1 {
            None
        } else {
            let offset = rp.parent_offset();
            let left = block.copy_with(block.slice_content(0, offset)?)?;
            let right = block.copy_with(block.slice_content(offset, block.content_size())?)?;
            let left_item = item.copy_with(vec![left])?;
            let mut right_children = vec![right];
            right_children.extend(item.content()[1..].iter().cloned());
            let right_item = Node::new(item.kind(), Attrs::new(), right_children)?;
            let from = rp.before(depth - 1);
            Some(Replacement {
                from,
                to: rp.after(depth - 1),
                cursor: from + left_item.node_size() + 2,
                nodes: vec![left_item, right_item],
            })
        }
    };
    match plan {
        Some(plan) => plan.apply(tr),
        None => lift_list_item(tr),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::test_support::*;
    use crate::types::Selection;
    use pretty_assertions::assert_eq;

    fn at(doc: &Node, pos: usize) -> Transaction {
        Transaction::new(doc, Selection::collapsed(pos))
    }

    #[test]
    fn wraps_plain_paragraph() {
        let d = doc(vec![p("abc")]);
        let mut tr = at(&d, 3);
        assert!(toggle_list(&mut tr, NodeKind::BulletList).unwrap());
        assert_eq!(tr.doc(), &doc(vec![list(NodeKind::BulletList, &["abc"])]));
        assert_eq!(tr.selection(), Selection::collapsed(5));
    }

    #[test]
    fn converting_one_item_leaves_siblings() {
        let d = doc(vec![list(NodeKind::OrderedList, &["a", "b", "c"])]);
        // Inside "b": ol(0) li(1..6) li(6) p(7) text 8.
        let mut tr = at(&d, 9);
        assert!(toggle_list(&mut tr, NodeKind::BulletList).unwrap());
        let tail = with_attrs(
            NodeKind::OrderedList,
            Attrs::new().with("start", 3_i64),
            vec![node(NodeKind::ListItem, vec![p("c")])],
        );
        assert_eq!(
            tr.doc(),
            &doc(vec![
                list(NodeKind::OrderedList, &["a"]),
                list(NodeKind::BulletList, &["b"]),
                tail,
            ])
        );
        // End of "b": ol(a) is 7 wide, then ul, li and p open.
        assert_eq!(tr.selection(), Selection::collapsed(11));
    }

    #[test]
    fn same_kind_lifts_out() {
        let d = doc(vec![list(NodeKind::BulletList, &["a"])]);
        let mut tr = at(&d, 3);
        assert!(toggle_list(&mut tr, NodeKind::BulletList).unwrap());
        assert_eq!(tr.doc(), &doc(vec![p("a")]));
        assert_eq!(tr.selection(), Selection::collapsed(1));
    }

    #[test]
    fn task_items_become_list_items() {
        let d = doc(vec![list(NodeKind::TaskList, &["todo"])]);
        let mut tr = at(&d, 3);
        assert!(toggle_list(&mut tr, NodeKind::BulletList).unwrap());
        assert_eq!(tr.doc(), &doc(vec![list(NodeKind::BulletList, &["todo"])]));
    }

    #[test]
    fn sink_then_lift_round_trips() {
        let d = doc(vec![list(NodeKind::BulletList, &["a", "b"])]);
        let mut tr = at(&d, 9);
        assert!(sink_list_item(&mut tr).unwrap());
        let nested = node(
            NodeKind::ListItem,
            vec![p("a"), list(NodeKind::BulletList, &["b"])],
        );
        assert_eq!(tr.doc(), &doc(vec![node(NodeKind::BulletList, vec![nested])]));
        // ul(0) li(1) p(2..5) ul(5) li(6) p(7), "b" at 8.
        assert_eq!(tr.selection(), Selection::collapsed(9));

        assert!(lift_list_item(&mut tr).unwrap());
        assert_eq!(tr.doc(), &d);
        assert_eq!(tr.selection(), Selection::collapsed(9));
    }

    #[test]
    fn first_item_cannot_sink() {
        let d = doc(vec![list(NodeKind::BulletList, &["a", "b"])]);
        let mut tr = at(&d, 3);
        assert!(!sink_list_item(&mut tr).unwrap());
        assert!(!tr.doc_changed());
    }

    #[test]
    fn enter_splits_item_and_empty_item_exits() {
        let d = doc(vec![list(NodeKind::BulletList, &["abcd"])]);
        let mut tr = at(&d, 5);
        assert!(split_list_item(&mut tr).unwrap());
        assert_eq!(tr.doc(), &doc(vec![list(NodeKind::BulletList, &["ab", "cd"])]));
        assert_eq!(tr.selection(), Selection::collapsed(9));

        let d = doc(vec![list(NodeKind::BulletList, &["a", ""])]);
        let mut tr = at(&d, 8);
        assert!(split_list_item(&mut tr).unwrap());
        assert_eq!(tr.doc(), &doc(vec![list(NodeKind::BulletList, &["a"]), p("")]));
    }
}
