//! Textblock-level transforms: headings, paragraphs, blockquotes, splitting,
//! deleting and block selection.

use tracing::debug;

use super::{Applied, Replacement, lists, text_cursor};
use crate::attrs::Attrs;
use crate::error::EditError;
use crate::node::Node;
use crate::position::ResolvedPos;
use crate::schema::NodeKind;
use crate::transaction::Transaction;
use crate::types::Selection;

/// The textblock holding the selection start: its position and attributes.
fn textblock_at(tr: &Transaction) -> Result<Option<(usize, NodeKind, Attrs)>, EditError> {
    let rp = ResolvedPos::resolve(tr.doc(), tr.selection().from())?;
    let block = rp.parent();
    if !block.is_textblock() {
        return Ok(None);
    }
    Ok(Some((rp.before(rp.depth()), block.kind(), block.attrs().clone())))
}

/// Turn the textblock into a heading of `level` (1-6), keeping its indent.
pub fn set_heading(tr: &mut Transaction, level: u8) -> Applied {
    if !(1..=6).contains(&level) {
        return Err(EditError::InvalidArgument(format!("heading level {level}")));
    }
    let Some((pos, kind, attrs)) = textblock_at(tr)? else {
        return Ok(false);
    };
    let indent = attrs.get_int("indent").unwrap_or(0);
    if kind == NodeKind::Heading && attrs.get_int("level") == Some(i64::from(level)) {
        return Ok(false);
    }
    let attrs = Attrs::new()
        .with("level", i64::from(level))
        .with("indent", indent);
    tr.set_node_kind(pos, NodeKind::Heading, attrs)?;
    Ok(true)
}

/// Turn a heading back into a paragraph. Paragraphs are left alone.
pub fn set_paragraph(tr: &mut Transaction) -> Applied {
    let Some((pos, kind, attrs)) = textblock_at(tr)? else {
        return Ok(false);
    };
    if kind == NodeKind::Paragraph {
        return Ok(false);
    }
    let indent = attrs.get_int("indent").unwrap_or(0);
    tr.set_node_kind(pos, NodeKind::Paragraph, Attrs::new().with("indent", indent))?;
    Ok(true)
}

/// Wrap the cursor's textblock in a blockquote.
pub fn wrap_in_blockquote(tr: &mut Transaction) -> Applied {
    let plan = {
        let Some(rp) = text_cursor(tr)? else {
            return Ok(false);
        };
        let depth = rp.depth();
        let quote = Node::with_defaults(NodeKind::Blockquote, vec![rp.parent().clone()])?;
        let from = rp.before(depth);
        Replacement {
            from,
            to: rp.after(depth),
            nodes: vec![quote],
            cursor: rp.pos() + 1,
        }
    };
    plan.apply(tr)
}

/// Move the cursor's textblock out of its enclosing blockquote, splitting
/// the quote around it.
pub fn lift_from_blockquote(tr: &mut Transaction) -> Applied {
    let plan = {
        let Some(rp) = text_cursor(tr)? else {
            return Ok(false);
        };
        let depth = rp.depth();
        if depth < 2 || rp.node(depth - 1).kind() != NodeKind::Blockquote {
            return Ok(false);
        }
        let quote = rp.node(depth - 1);
        let index = rp.index(depth - 1);
        let children = quote.content();
        let mut nodes = Vec::new();
        let mut offset = 0;
        if index > 0 {
            let head = quote.copy_with(children[..index].to_vec())?;
            offset = head.node_size();
            nodes.push(head);
        }
        nodes.push(rp.parent().clone());
        if index + 1 < children.len() {
            nodes.push(quote.copy_with(children[index + 1..].to_vec())?);
        }
        let from = rp.before(depth - 1);
        Replacement {
            from,
            to: rp.after(depth - 1),
            nodes,
            cursor: from + offset + 1 + rp.parent_offset(),
        }
    };
    debug!(pos = plan.from, "lifted out of blockquote");
    plan.apply(tr)
}

/// Enter: split the textblock at the cursor. The text after the cursor moves
/// to a new block (a paragraph when splitting at the end of a heading).
/// Inside a list item's first paragraph the item itself is split.
pub fn split_block(tr: &mut Transaction) -> Applied {
    let selection = tr.selection();
    if !selection.is_collapsed() {
        match tr.delete(selection.from(), selection.to()) {
            Ok(_) => {}
            Err(EditError::InvalidRange { .. }) => return Ok(false),
            Err(err) => return Err(err),
        }
    }
    if lists::split_list_item(tr)? {
        return Ok(true);
    }
    let plan = {
        let Some(rp) = text_cursor(tr)? else {
            return Ok(false);
        };
        let depth = rp.depth();
        let block = rp.parent();
        let offset = rp.parent_offset();
        let size = block.content_size();
        let left = block.copy_with(block.slice_content(0, offset)?)?;
        let right = if offset == size && block.kind() == NodeKind::Heading {
            let indent = block.attrs().get_int("indent").unwrap_or(0);
            Node::new(NodeKind::Paragraph, Attrs::new().with("indent", indent), Vec::new())?
        } else {
            block.copy_with(block.slice_content(offset, size)?)?
        };
        let from = rp.before(depth);
        Replacement {
            from,
            to: rp.after(depth),
            cursor: from + left.node_size() + 1,
            nodes: vec![left, right],
        }
    };
    plan.apply(tr)
}

/// Escape: select the whole content of the cursor's textblock.
pub fn select_block(tr: &mut Transaction) -> Applied {
    let range = {
        let rp = ResolvedPos::resolve(tr.doc(), tr.selection().head)?;
        let depth = rp.depth();
        (depth > 0).then(|| (rp.start(depth), rp.end(depth)))
    };
    let Some((start, end)) = range else {
        return Ok(false);
    };
    tr.set_selection(Selection::new(start, end));
    Ok(true)
}

/// Backspace inside text: delete the selection, or the character before the
/// cursor. Nothing happens at the start of a block.
pub fn delete_backward(tr: &mut Transaction) -> Applied {
    let selection = tr.selection();
    if !selection.is_collapsed() {
        return match tr.delete(selection.from(), selection.to()) {
            Ok(_) => Ok(true),
            Err(EditError::InvalidRange { .. }) => Ok(false),
            Err(err) => Err(err),
        };
    }
    let deletable = text_cursor(tr)?.is_some_and(|rp| rp.parent_offset() > 0);
    if !deletable {
        return Ok(false);
    }
    tr.delete(selection.head - 1, selection.head)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::test_support::*;
    use pretty_assertions::assert_eq;

    fn at(doc: &Node, pos: usize) -> Transaction {
        Transaction::new(doc, Selection::collapsed(pos))
    }

    fn heading(level: i64, text: &str) -> Node {
        with_attrs(
            NodeKind::Heading,
            Attrs::new().with("level", level),
            vec![Node::text(text)],
        )
    }

    #[test]
    fn heading_and_back() {
        let d = doc(vec![with_attrs(
            NodeKind::Paragraph,
            Attrs::new().with("indent", 2_i64),
            vec![Node::text("t")],
        )]);
        let mut tr = at(&d, 1);
        assert!(set_heading(&mut tr, 2).unwrap());
        let h = tr.doc().child(0).unwrap();
        assert_eq!(h.kind(), NodeKind::Heading);
        assert_eq!(h.attrs().get_int("indent"), Some(2));
        assert!(!set_heading(&mut tr, 2).unwrap());

        assert!(set_paragraph(&mut tr).unwrap());
        assert_eq!(tr.doc(), &d);
        assert!(!set_paragraph(&mut tr).unwrap());
    }

    #[test]
    fn blockquote_wrap_and_lift() {
        let d = doc(vec![p("q")]);
        let mut tr = at(&d, 2);
        assert!(wrap_in_blockquote(&mut tr).unwrap());
        assert_eq!(tr.doc(), &doc(vec![node(NodeKind::Blockquote, vec![p("q")])]));
        assert_eq!(tr.selection(), Selection::collapsed(3));

        assert!(lift_from_blockquote(&mut tr).unwrap());
        assert_eq!(tr.doc(), &d);
        assert_eq!(tr.selection(), Selection::collapsed(2));
    }

    #[test]
    fn lift_splits_the_quote() {
        let d = doc(vec![node(NodeKind::Blockquote, vec![p("a"), p("b"), p("c")])]);
        // Start of "b": quote(0) p(1..4) p(4), text at 5.
        let mut tr = at(&d, 5);
        assert!(lift_from_blockquote(&mut tr).unwrap());
        assert_eq!(
            tr.doc(),
            &doc(vec![
                node(NodeKind::Blockquote, vec![p("a")]),
                p("b"),
                node(NodeKind::Blockquote, vec![p("c")]),
            ])
        );
        assert_eq!(tr.selection(), Selection::collapsed(6));
    }

    #[test]
    fn split_heading_at_end_gives_paragraph() {
        let d = doc(vec![heading(1, "Title")]);
        let mut tr = at(&d, 6);
        assert!(split_block(&mut tr).unwrap());
        assert_eq!(tr.doc(), &doc(vec![heading(1, "Title"), p("")]));
        assert_eq!(tr.selection(), Selection::collapsed(8));
    }

    #[test]
    fn split_paragraph_mid_text() {
        let d = doc(vec![p("abcd")]);
        let mut tr = at(&d, 3);
        assert!(split_block(&mut tr).unwrap());
        assert_eq!(tr.doc(), &doc(vec![p("ab"), p("cd")]));
        assert_eq!(tr.selection(), Selection::collapsed(5));
    }

    #[test]
    fn escape_selects_block_content() {
        let d = doc(vec![p("ab"), p("cde")]);
        let mut tr = at(&d, 6);
        assert!(select_block(&mut tr).unwrap());
        assert_eq!(tr.selection(), Selection::new(5, 8));
    }

    #[test]
    fn backspace_deletes_previous_char_only_mid_block() {
        let d = doc(vec![p("ab"), p("cd")]);
        let mut tr = at(&d, 6);
        assert!(delete_backward(&mut tr).unwrap());
        assert_eq!(tr.doc(), &doc(vec![p("ab"), p("d")]));
        assert_eq!(tr.selection(), Selection::collapsed(5));
        assert!(!delete_backward(&mut tr).unwrap());
    }
}
