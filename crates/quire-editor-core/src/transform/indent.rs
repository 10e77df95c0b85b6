//! Indentation. Paragraphs and headings carry an `indent` level; inside a
//! list item, Tab and Shift-Tab re-nest the item instead.

use tracing::debug;

use super::{Applied, lists};
use crate::error::EditError;
use crate::position::ResolvedPos;
use crate::schema::NodeKind;
use crate::transaction::Transaction;

/// Shift the indent of every paragraph and heading touched by the selection
/// by `delta`, floored at 0 and capped at `max`. All changes land in the
/// same transaction.
fn adjust(tr: &mut Transaction, delta: i64, max: Option<i64>) -> Applied {
    let selection = tr.selection();
    let mut targets = Vec::new();
    tr.doc()
        .nodes_between(selection.from(), selection.to(), &mut |node, pos| {
            if matches!(node.kind(), NodeKind::Paragraph | NodeKind::Heading) {
                targets.push((pos, node.attrs().get_int("indent").unwrap_or(0)));
                return false;
            }
            true
        });
    if targets.is_empty() {
        return Ok(false);
    }
    for (pos, current) in targets {
        let mut next = (current + delta).max(0);
        if let Some(max) = max {
            next = next.min(max);
        }
        if next != current {
            tr.set_node_attr(pos, "indent", next)?;
        }
    }
    Ok(true)
}

pub fn indent(tr: &mut Transaction, max: Option<i64>) -> Applied {
    adjust(tr, 1, max)
}

pub fn outdent(tr: &mut Transaction) -> Applied {
    adjust(tr, -1, None)
}

/// True when the cursor's textblock sits directly in a list item.
fn in_list_item(tr: &Transaction) -> Result<bool, EditError> {
    let rp = ResolvedPos::resolve(tr.doc(), tr.selection().head)?;
    let depth = rp.depth();
    Ok(depth >= 2 && rp.parent().is_textblock() && rp.node(depth - 1).kind().is_list_item())
}

/// Tab: sink the list item, or indent.
pub fn tab(tr: &mut Transaction, max: Option<i64>) -> Applied {
    if in_list_item(tr)? {
        return lists::sink_list_item(tr);
    }
    indent(tr, max)
}

/// Shift-Tab: lift the list item, or outdent.
pub fn shift_tab(tr: &mut Transaction) -> Applied {
    if in_list_item(tr)? {
        return lists::lift_list_item(tr);
    }
    outdent(tr)
}

/// Backspace at the start of an indented block removes one level.
pub fn backspace_outdent(tr: &mut Transaction) -> Applied {
    let target = {
        let selection = tr.selection();
        if !selection.is_collapsed() {
            return Ok(false);
        }
        let rp = ResolvedPos::resolve(tr.doc(), selection.head)?;
        let indent = rp.parent().attrs().get_int("indent").unwrap_or(0);
        (rp.at_block_start() && indent > 0).then(|| (rp.before(rp.depth()), indent))
    };
    let Some((pos, indent)) = target else {
        return Ok(false);
    };
    debug!(pos, indent, "outdent on backspace");
    tr.set_node_attr(pos, "indent", indent - 1)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attrs::Attrs;
    use crate::node::Node;
    use crate::transform::test_support::*;
    use crate::types::Selection;

    fn indents(doc: &Node) -> Vec<i64> {
        doc.content()
            .iter()
            .map(|n| n.attrs().get_int("indent").unwrap_or(-1))
            .collect()
    }

    #[test]
    fn indent_covers_every_block_in_range() {
        let d = doc(vec![p("a"), p("b"), p("c")]);
        // From inside "a" to inside "b".
        let mut tr = Transaction::new(&d, Selection::new(2, 5));
        assert!(indent(&mut tr, None).unwrap());
        assert_eq!(indents(tr.doc()), vec![1, 1, 0]);
        assert_eq!(tr.steps().len(), 2);
    }

    #[test]
    fn outdent_floors_at_zero() {
        let d = doc(vec![p("a")]);
        let mut tr = Transaction::new(&d, Selection::collapsed(1));
        assert!(outdent(&mut tr).unwrap());
        assert_eq!(indents(tr.doc()), vec![0]);
        assert!(!tr.doc_changed());
    }

    #[test]
    fn max_indent_caps() {
        let d = doc(vec![with_attrs(
            NodeKind::Paragraph,
            Attrs::new().with("indent", 3_i64),
            vec![],
        )]);
        let mut tr = Transaction::new(&d, Selection::collapsed(1));
        assert!(indent(&mut tr, Some(3)).unwrap());
        assert_eq!(indents(tr.doc()), vec![3]);
    }

    #[test]
    fn tab_in_list_nests_instead_of_indenting() {
        let d = doc(vec![list(NodeKind::BulletList, &["a", "b"])]);
        let mut tr = Transaction::new(&d, Selection::collapsed(8));
        assert!(tab(&mut tr, None).unwrap());
        let outer = tr.doc().child(0).unwrap();
        assert_eq!(outer.child_count(), 1);
        assert_eq!(outer.child(0).unwrap().child_count(), 2);
        assert!(shift_tab(&mut tr).unwrap());
        assert_eq!(tr.doc(), &d);
    }

    #[test]
    fn backspace_removes_one_level() {
        let d = doc(vec![with_attrs(
            NodeKind::Heading,
            Attrs::new().with("indent", 2_i64),
            vec![Node::text("h")],
        )]);
        let mut tr = Transaction::new(&d, Selection::collapsed(1));
        assert!(backspace_outdent(&mut tr).unwrap());
        assert_eq!(indents(tr.doc()), vec![1]);
        let mut tr = Transaction::new(&d, Selection::collapsed(2));
        assert!(!backspace_outdent(&mut tr).unwrap());
    }
}
