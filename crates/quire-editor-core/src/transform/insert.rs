//! Block insertion commands and the attribute edits of inserted blocks
//! (callout kind/title, image size).

use tracing::debug;

use super::Applied;
use crate::attrs::{Attrs, CalloutKind};
use crate::document::ToggleStyle;
use crate::error::EditError;
use crate::node::Node;
use crate::placement::cursor_into;
use crate::position::ResolvedPos;
use crate::schema::NodeKind;
use crate::transaction::Transaction;

/// Smallest width or height an image can be resized to, in pixels.
pub const MIN_IMAGE_SIZE: u32 = 50;

/// Insert `node` as a block at the selection and put the cursor inside it.
///
/// An empty textblock under the cursor is replaced. Otherwise the node goes
/// after the cursor's textblock, or after the nearest ancestor that accepts
/// it. Returns the inserted node's position, or `None` when nothing accepts
/// it.
pub fn insert_block(tr: &mut Transaction, node: Node) -> Result<Option<usize>, EditError> {
    let selection = tr.selection();
    if !selection.is_collapsed() {
        match tr.delete(selection.from(), selection.to()) {
            Ok(_) | Err(EditError::InvalidRange { .. }) => {}
            Err(err) => return Err(err),
        }
    }

    let candidates = {
        let head = tr.selection().head;
        let rp = ResolvedPos::resolve(tr.doc(), head)?;
        let depth = rp.depth();
        let mut candidates = Vec::new();
        if rp.parent().is_textblock() {
            if rp.parent().is_content_empty() {
                candidates.push((rp.before(depth), rp.after(depth)));
            }
        } else {
            candidates.push((head, head));
        }
        candidates.extend((1..=depth).rev().map(|d| (rp.after(d), rp.after(d))));
        candidates
    };

    for (from, to) in candidates {
        match tr.replace(from, to, vec![node.clone()]) {
            Ok(_) => {
                let cursor = cursor_into(tr.doc(), from, &node).unwrap_or(from);
                tr.set_cursor(cursor);
                debug!(kind = %node.kind(), pos = from, "block inserted");
                return Ok(Some(from));
            }
            Err(EditError::ContentModelViolation { .. }) => continue,
            Err(err) => return Err(err),
        }
    }
    debug!(kind = %node.kind(), "no place accepts the block");
    Ok(None)
}

fn inserted(tr: &mut Transaction, node: Node) -> Applied {
    Ok(insert_block(tr, node)?.is_some())
}

/// `gridColumns` with `columns` columns, each seeded with a labelled
/// paragraph.
pub fn grid_columns(columns: usize) -> Result<Node, EditError> {
    if columns == 0 {
        return Err(EditError::InvalidArgument(
            "a grid needs at least one column".to_owned(),
        ));
    }
    let columns = (1..=columns)
        .map(|i| {
            Node::with_defaults(
                NodeKind::GridColumn,
                vec![Node::paragraph(&format!("Column {i}"))],
            )
        })
        .collect::<Result<Vec<_>, EditError>>()?;
    Node::with_defaults(NodeKind::GridColumns, columns)
}

pub fn insert_grid_columns(tr: &mut Transaction, columns: usize) -> Applied {
    let grid = grid_columns(columns)?;
    inserted(tr, grid)
}

pub fn callout(kind: CalloutKind, title: Option<&str>, content: Vec<Node>) -> Result<Node, EditError> {
    let title = title.filter(|t| !t.is_empty()).unwrap_or(kind.default_title());
    let attrs = Attrs::new().with("type", kind.as_str()).with("title", title);
    Node::new(NodeKind::Callout, attrs, content)
}

pub fn insert_callout(tr: &mut Transaction, kind: CalloutKind, title: Option<&str>) -> Applied {
    let node = callout(kind, title, vec![Node::empty_paragraph()])?;
    inserted(tr, node)
}

pub fn insert_toggle(tr: &mut Transaction, style: ToggleStyle, title: &str) -> Applied {
    let node = match style {
        ToggleStyle::Titled => Node::new(
            NodeKind::Toggle,
            Attrs::new().with("title", title),
            vec![Node::empty_paragraph()],
        )?,
        ToggleStyle::Notion => Node::with_defaults(
            NodeKind::NotionToggle,
            vec![Node::paragraph(title), Node::empty_paragraph()],
        )?,
    };
    inserted(tr, node)
}

pub fn insert_readonly_text(tr: &mut Transaction, text: &str) -> Applied {
    let node = Node::new(NodeKind::ReadonlyText, Attrs::new().with("text", text), Vec::new())?;
    inserted(tr, node)
}

pub fn insert_image(tr: &mut Transaction, src: &str, alt: Option<&str>) -> Applied {
    let attrs = Attrs::new().with("src", src).with("alt", alt);
    let node = Node::new(NodeKind::Image, attrs, Vec::new())?;
    inserted(tr, node)
}

/// Table of `rows` x `cols` empty cells. With `header_row` the first row is
/// made of header cells.
pub fn table(rows: usize, cols: usize, header_row: bool) -> Result<Node, EditError> {
    if rows == 0 || cols == 0 {
        return Err(EditError::InvalidArgument(format!(
            "table must be at least 1x1 (got {rows}x{cols})"
        )));
    }
    let rows = (0..rows)
        .map(|r| {
            let kind = if header_row && r == 0 {
                NodeKind::TableHeader
            } else {
                NodeKind::TableCell
            };
            let cells = (0..cols)
                .map(|_| Node::with_defaults(kind, vec![Node::empty_paragraph()]))
                .collect::<Result<Vec<_>, EditError>>()?;
            Node::with_defaults(NodeKind::TableRow, cells)
        })
        .collect::<Result<Vec<_>, EditError>>()?;
    Node::with_defaults(NodeKind::Table, rows)
}

pub fn insert_table(tr: &mut Transaction, rows: usize, cols: usize, header_row: bool) -> Applied {
    let node = table(rows, cols, header_row)?;
    inserted(tr, node)
}

/// Resize the image at `pos`. `None` resets a dimension to `auto`.
pub fn resize_image(
    tr: &mut Transaction,
    pos: usize,
    width: Option<u32>,
    height: Option<u32>,
) -> Applied {
    let attrs = match tr.node_at(pos) {
        Ok(node) if node.kind() == NodeKind::Image => node.attrs().clone(),
        _ => return Ok(false),
    };
    let size = |v: Option<u32>| v.map_or_else(|| "auto".to_owned(), |v| format!("{}px", v.max(MIN_IMAGE_SIZE)));
    let attrs = attrs.with("width", size(width)).with("height", size(height));
    tr.set_node_attrs(pos, attrs)?;
    Ok(true)
}

/// Position and attributes of the callout around the selection.
fn enclosing_callout(tr: &Transaction) -> Result<Option<(usize, Attrs)>, EditError> {
    let rp = ResolvedPos::resolve(tr.doc(), tr.selection().head)?;
    Ok(rp
        .find_ancestor_kind(&[NodeKind::Callout])
        .filter(|&d| d > 0)
        .map(|d| (rp.before(d), rp.node(d).attrs().clone())))
}

/// Change the kind of the enclosing callout. An empty title takes the new
/// kind's default.
pub fn set_callout_kind(tr: &mut Transaction, kind: CalloutKind) -> Applied {
    let Some((pos, attrs)) = enclosing_callout(tr)? else {
        return Ok(false);
    };
    let title = match attrs.get_str("title") {
        Some(t) if !t.is_empty() => t.to_owned(),
        _ => kind.default_title().to_owned(),
    };
    let attrs = attrs.with("type", kind.as_str()).with("title", title);
    tr.set_node_attrs(pos, attrs)?;
    Ok(true)
}

pub fn set_callout_title(tr: &mut Transaction, title: &str) -> Applied {
    let Some((pos, attrs)) = enclosing_callout(tr)? else {
        return Ok(false);
    };
    tr.set_node_attrs(pos, attrs.with("title", title))?;
    Ok(true)
}
