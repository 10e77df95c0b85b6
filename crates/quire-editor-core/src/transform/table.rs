//! Table queries, cell colouring and pasting tab-separated text as a table.

use tracing::debug;

use super::{Applied, insert};
use crate::error::EditError;
use crate::node::Node;
use crate::position::ResolvedPos;
use crate::schema::NodeKind;
use crate::style::{Background, StylePatch};
use crate::transaction::Transaction;

/// A named background/foreground pair offered by the table colour menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableColor {
    pub name: &'static str,
    pub background: &'static str,
    pub color: &'static str,
}

impl TableColor {
    pub fn patch(&self) -> StylePatch {
        let background = if self.background == "transparent" {
            Background::Transparent
        } else {
            Background::Color(self.background.into())
        };
        StylePatch {
            background: Some(background),
            color: Some(self.color.into()),
        }
    }
}

pub const PALETTE: [TableColor; 6] = [
    TableColor { name: "기본", background: "transparent", color: "#374151" },
    TableColor { name: "회색", background: "#f3f4f6", color: "#374151" },
    TableColor { name: "빨강", background: "#fecaca", color: "#7f1d1d" },
    TableColor { name: "파랑", background: "#dbeafe", color: "#1e3a8a" },
    TableColor { name: "초록", background: "#d1fae5", color: "#14532d" },
    TableColor { name: "노랑", background: "#fef3c7", color: "#92400e" },
];

/// Which cells a colour change applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorTarget {
    Cell,
    Row,
    Column,
}

/// Where a cell sits in its table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellCoords {
    pub table_pos: usize,
    pub cell_pos: usize,
    pub row: usize,
    pub col: usize,
    pub row_count: usize,
    /// Cell count of every row; rows may be ragged.
    pub row_widths: Vec<usize>,
}

/// Coordinates of the innermost table cell containing `pos`.
pub fn cell_coords(doc: &Node, pos: usize) -> Result<Option<CellCoords>, EditError> {
    let rp = ResolvedPos::resolve(doc, pos)?;
    let Some(depth) = rp.find_ancestor(|n| n.kind().is_table_cell()) else {
        return Ok(None);
    };
    if depth < 2 {
        return Ok(None);
    }
    let table = rp.node(depth - 2);
    Ok(Some(CellCoords {
        table_pos: rp.before(depth - 2),
        cell_pos: rp.before(depth),
        row: rp.index(depth - 2),
        col: rp.index(depth - 1),
        row_count: table.child_count(),
        row_widths: table.content().iter().map(Node::child_count).collect(),
    }))
}

/// Absolute positions of every cell in the table at `table_pos`, by row.
fn cell_positions(table: &Node, table_pos: usize) -> Vec<Vec<usize>> {
    let mut row_pos = table_pos + 1;
    table
        .content()
        .iter()
        .map(|row| {
            let mut cell_pos = row_pos + 1;
            let cells = row
                .content()
                .iter()
                .map(|cell| {
                    let at = cell_pos;
                    cell_pos += cell.node_size();
                    at
                })
                .collect();
            row_pos += row.node_size();
            cells
        })
        .collect()
}

/// Patch the style of the cell at `pos`, its row or its column. Rows too
/// short to have the column are skipped.
pub fn apply_cell_colors(
    tr: &mut Transaction,
    pos: usize,
    target: ColorTarget,
    patch: &StylePatch,
) -> Applied {
    let Some(coords) = cell_coords(tr.doc(), pos)? else {
        return Ok(false);
    };
    let rows = cell_positions(tr.node_at(coords.table_pos)?, coords.table_pos);
    let targets: Vec<usize> = match target {
        ColorTarget::Cell => vec![coords.cell_pos],
        ColorTarget::Row => rows.get(coords.row).cloned().unwrap_or_default(),
        ColorTarget::Column => rows
            .iter()
            .filter_map(|row| row.get(coords.col).copied())
            .collect(),
    };
    debug!(?target, cells = targets.len(), "recolouring table cells");
    for cell_pos in targets {
        let current = tr.node_at(cell_pos)?.attrs().get_str("style").map(str::to_owned);
        let next = patch.apply(current.as_deref());
        if next != current {
            tr.set_node_attr(cell_pos, "style", next)?;
        }
    }
    Ok(true)
}

/// Split clipboard text into a rectangular grid of fields. Only text with a
/// tab in it is treated as tabular; blank lines are dropped and short rows
/// padded with empty fields.
pub fn parse_tsv(text: &str) -> Option<Vec<Vec<String>>> {
    if !text.contains('\t') {
        return None;
    }
    let mut rows: Vec<Vec<String>> = text
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.split('\t').map(str::to_owned).collect())
        .collect();
    let width = rows.iter().map(Vec::len).max()?;
    for row in &mut rows {
        row.resize(width, String::new());
    }
    Some(rows)
}

/// A header-less table with one paragraph cell per field.
pub fn table_from_rows(rows: &[Vec<String>]) -> Result<Node, EditError> {
    let rows = rows
        .iter()
        .map(|fields| {
            let cells = fields
                .iter()
                .map(|f| Node::with_defaults(NodeKind::TableCell, vec![Node::paragraph(f)]))
                .collect::<Result<Vec<_>, EditError>>()?;
            Node::with_defaults(NodeKind::TableRow, cells)
        })
        .collect::<Result<Vec<_>, EditError>>()?;
    Node::with_defaults(NodeKind::Table, rows)
}

/// Paste tab-separated text as a table in place of the selection.
pub fn paste_table(tr: &mut Transaction, text: &str) -> Applied {
    let Some(rows) = parse_tsv(text) else {
        return Ok(false);
    };
    let table = table_from_rows(&rows)?;
    debug!(rows = rows.len(), cols = rows[0].len(), "pasting table");
    Ok(insert::insert_block(tr, table)?.is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attrs::Attrs;
    use crate::transform::test_support::*;
    use crate::types::Selection;
    use pretty_assertions::assert_eq;

    fn cell(text: &str, style: Option<&str>) -> Node {
        with_attrs(NodeKind::TableCell, Attrs::new().with("style", style), vec![p(text)])
    }

    fn styles(table: &Node) -> Vec<Vec<Option<String>>> {
        table
            .content()
            .iter()
            .map(|row| {
                row.content()
                    .iter()
                    .map(|c| c.attrs().get_str("style").map(str::to_owned))
                    .collect()
            })
            .collect()
    }

    #[test]
    fn tsv_is_padded_and_blank_lines_dropped() {
        let rows = parse_tsv("a\tb\tc\r\nd\n\n  \n").unwrap();
        assert_eq!(rows, vec![vec!["a", "b", "c"], vec!["d", "", ""]]);
        assert_eq!(parse_tsv("no tabs\nhere"), None);
        assert_eq!(parse_tsv("\t\n"), None);
    }

    #[test]
    fn paste_builds_headerless_table() {
        let d = doc(vec![p("")]);
        let mut tr = Transaction::new(&d, Selection::collapsed(1));
        assert!(paste_table(&mut tr, "A\tB\nC\tD").unwrap());
        let expected = doc(vec![node(
            NodeKind::Table,
            vec![
                node(NodeKind::TableRow, vec![cell("A", None), cell("B", None)]),
                node(NodeKind::TableRow, vec![cell("C", None), cell("D", None)]),
            ],
        )]);
        assert_eq!(tr.doc(), &expected);
        // table(0) row(1) cell(2) paragraph(3)
        assert_eq!(tr.selection(), Selection::collapsed(4));
    }

    #[test]
    fn paste_without_tabs_is_declined() {
        let d = doc(vec![p("")]);
        let mut tr = Transaction::new(&d, Selection::collapsed(1));
        assert!(!paste_table(&mut tr, "plain").unwrap());
        assert!(!tr.doc_changed());
    }

    fn ragged() -> Node {
        let bg = Some("background-color: #fecaca");
        doc(vec![node(
            NodeKind::Table,
            vec![
                node(NodeKind::TableRow, vec![cell("a", bg), cell("b", bg)]),
                node(NodeKind::TableRow, vec![cell("c", bg)]),
                node(NodeKind::TableRow, vec![cell("d", bg), cell("e", bg)]),
            ],
        )])
    }

    #[test]
    fn coords_of_second_column() {
        let d = ragged();
        // table(0) row(1) cell a(2..7) cell b(7), text at 9.
        let coords = cell_coords(&d, 9).unwrap().unwrap();
        assert_eq!(coords.cell_pos, 7);
        assert_eq!((coords.row, coords.col), (0, 1));
        assert_eq!(coords.row_widths, vec![2, 1, 2]);
        assert_eq!(cell_coords(&doc(vec![p("x")]), 1).unwrap(), None);
    }

    #[test]
    fn transparent_column_skips_short_rows() {
        let d = ragged();
        let mut tr = Transaction::new(&d, Selection::collapsed(9));
        let patch = StylePatch::background(Background::Transparent);
        assert!(apply_cell_colors(&mut tr, 9, ColorTarget::Column, &patch).unwrap());
        let bg = Some("background-color: #fecaca".to_owned());
        assert_eq!(
            styles(tr.doc().child(0).unwrap()),
            vec![vec![bg.clone(), None], vec![bg.clone()], vec![bg, None]]
        );
    }

    #[test]
    fn palette_row_colour() {
        let d = ragged();
        let mut tr = Transaction::new(&d, Selection::collapsed(4));
        assert!(apply_cell_colors(&mut tr, 4, ColorTarget::Row, &PALETTE[3].patch()).unwrap());
        let blue = Some("background-color: #dbeafe; color: #1e3a8a".to_owned());
        let red = Some("background-color: #fecaca".to_owned());
        assert_eq!(
            styles(tr.doc().child(0).unwrap()),
            vec![vec![blue.clone(), blue], vec![red.clone()], vec![red.clone(), red]]
        );
    }
}
