//! Blocks that stand in for warehouse data while a query is in flight.
//!
//! A placeholder is a loading callout tagged with a `placeholderId`. When the
//! query settles the callout is found again by that id, so edits made in the
//! meantime do not matter, and replaced by the rendered result.

use std::fmt;

use quire_common::{QueryError, QueryResult, Summary, TableData};
use tracing::debug;
use uuid::Uuid;

use crate::attrs::{Attrs, CalloutKind};
use crate::document::EditorDocument;
use crate::error::EditError;
use crate::node::Node;
use crate::schema::NodeKind;
use crate::transaction::Transaction;
use crate::transform::insert::{callout, insert_block};

pub const LOADING_TITLE: &str = "데이터 로딩 중...";
pub const LOADING_TEXT: &str = "데이터를 가져오는 중입니다...";
pub const FAILURE_TITLE: &str = "데이터 로딩 실패";
pub const EMPTY_TEXT: &str = "조회된 데이터가 없습니다.";

/// Stable identity of a pending placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlaceholderId(Uuid);

impl PlaceholderId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn parse(s: &str) -> Option<Self> {
        Uuid::parse_str(s).ok().map(Self)
    }
}

impl Default for PlaceholderId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PlaceholderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

fn loading_callout(id: PlaceholderId, label: &str) -> Result<Node, EditError> {
    let text = if label.is_empty() {
        LOADING_TEXT.to_owned()
    } else {
        format!("{label}: {LOADING_TEXT}")
    };
    let attrs = Attrs::new()
        .with("type", CalloutKind::Info.as_str())
        .with("title", LOADING_TITLE)
        .with("placeholderId", id.to_string());
    Node::new(NodeKind::Callout, attrs, vec![Node::paragraph(&text)])
}

/// Insert a loading callout at the selection. Returns `None` when no place
/// accepts it.
pub fn begin_placeholder(
    tr: &mut Transaction,
    label: &str,
) -> Result<Option<PlaceholderId>, EditError> {
    let id = PlaceholderId::new();
    let inserted = insert_block(tr, loading_callout(id, label)?)?;
    if inserted.is_some() {
        debug!(%id, label, "placeholder inserted");
    }
    Ok(inserted.map(|_| id))
}

/// Position of the placeholder callout tagged `id`.
pub fn find_placeholder(doc: &Node, id: PlaceholderId) -> Option<usize> {
    let needle = id.to_string();
    let mut found = None;
    doc.descendants(&mut |node, pos| {
        if found.is_some() {
            return false;
        }
        if node.kind() == NodeKind::Callout
            && node.attrs().get_str("placeholderId") == Some(needle.as_str())
        {
            found = Some(pos);
            return false;
        }
        true
    });
    found
}

fn paragraphs(lines: &[String]) -> Vec<Node> {
    if lines.is_empty() {
        return vec![Node::empty_paragraph()];
    }
    lines.iter().map(|l| Node::paragraph(l)).collect()
}

fn summary_callout(summary: &Summary) -> Result<Node, EditError> {
    callout(CalloutKind::Success, Some(summary.title.as_str()), paragraphs(&summary.lines))
}

/// Table with a header row and at most `max_rows` body rows.
fn data_table(data: &TableData, max_rows: usize) -> Result<Node, EditError> {
    let row = |kind: NodeKind, fields: &[String]| {
        let cells = fields
            .iter()
            .map(|f| Node::with_defaults(kind, vec![Node::paragraph(f)]))
            .collect::<Result<Vec<_>, EditError>>()?;
        Node::with_defaults(NodeKind::TableRow, cells)
    };
    let mut rows = vec![row(NodeKind::TableHeader, &data.headers)?];
    for fields in data.rows.iter().take(max_rows) {
        rows.push(row(NodeKind::TableCell, fields)?);
    }
    Node::with_defaults(NodeKind::Table, rows)
}

/// The block a settled query renders to.
pub fn render_outcome(
    outcome: &Result<QueryResult, QueryError>,
    max_rows: usize,
) -> Result<Node, EditError> {
    match outcome {
        Ok(result) => {
            let data = match result.as_table() {
                Some(data) => data_table(&data, max_rows)?,
                None => Node::paragraph(EMPTY_TEXT),
            };
            let columns = [summary_callout(&result.summarize())?, data]
                .into_iter()
                .map(|block| Node::with_defaults(NodeKind::GridColumn, vec![block]))
                .collect::<Result<Vec<_>, EditError>>()?;
            Node::with_defaults(NodeKind::GridColumns, columns)
        }
        Err(err) => callout(
            CalloutKind::Error,
            Some(FAILURE_TITLE),
            vec![Node::paragraph(&format!("오류: {err}"))],
        ),
    }
}

/// Replace placeholder `id` with the rendered query outcome. A placeholder
/// that no longer exists is left alone.
pub fn resolve_placeholder(
    tr: &mut Transaction,
    id: PlaceholderId,
    outcome: &Result<QueryResult, QueryError>,
    max_rows: usize,
) -> Result<bool, EditError> {
    let Some(pos) = find_placeholder(tr.doc(), id) else {
        debug!(%id, "placeholder gone, dropping result");
        return Ok(false);
    };
    let size = tr.node_at(pos)?.node_size();
    let block = render_outcome(outcome, max_rows)?;
    tr.replace(pos, pos + size, vec![block])?;
    debug!(%id, pos, ok = outcome.is_ok(), "placeholder resolved");
    Ok(true)
}

/// Insert a placeholder into `editor` and commit it.
pub fn begin(editor: &mut impl EditorDocument, label: &str) -> Result<Option<PlaceholderId>, EditError> {
    let mut tr = editor.transaction();
    let id = begin_placeholder(&mut tr, label)?;
    if id.is_some() {
        editor.apply(tr)?;
    }
    Ok(id)
}

/// Resolve placeholder `id` in `editor` and commit the result.
pub fn resolve(
    editor: &mut impl EditorDocument,
    id: PlaceholderId,
    outcome: &Result<QueryResult, QueryError>,
) -> Result<bool, EditError> {
    let mut tr = editor.transaction();
    let max_rows = editor.config().placeholder_rows;
    if !resolve_placeholder(&mut tr, id, outcome, max_rows)? {
        return Ok(false);
    }
    editor.apply(tr)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::PlainEditor;
    use crate::types::Selection;
    use pretty_assertions::assert_eq;
    use serde_json::{Map, Value, json};

    fn result(rows: usize) -> QueryResult {
        let rows: Vec<Map<String, Value>> = (0..rows)
            .map(|i| {
                let Value::Object(row) = json!({"region": format!("r{i}"), "total_sales": 1000 * i})
                else {
                    unreachable!()
                };
                row
            })
            .collect();
        QueryResult {
            columns: vec!["region".into(), "total_sales".into()],
            row_count: rows.len(),
            rows,
        }
    }

    #[test]
    fn loading_callout_is_tagged() {
        let mut editor = PlainEditor::default();
        let id = begin(&mut editor, "").unwrap().unwrap();
        let pos = find_placeholder(editor.doc(), id).unwrap();
        let node = editor.doc().child(0).unwrap();
        assert_eq!(pos, 0);
        assert_eq!(node.attrs().get_str("title"), Some(LOADING_TITLE));
        assert_eq!(node.text_content(), LOADING_TEXT);
    }

    #[test]
    fn success_renders_summary_and_capped_table() {
        let mut editor = PlainEditor::default();
        let id = begin(&mut editor, "매출").unwrap().unwrap();
        assert!(resolve(&mut editor, id, &Ok(result(12))).unwrap());

        let grid = editor.doc().child(0).unwrap();
        assert_eq!(grid.kind(), NodeKind::GridColumns);
        let summary = grid.child(0).unwrap().child(0).unwrap();
        assert_eq!(summary.attrs().get_str("type"), Some("success"));
        assert_eq!(summary.attrs().get_str("title"), Some("📊 매출 요약"));
        let table = grid.child(1).unwrap().child(0).unwrap();
        // Header plus ten body rows.
        assert_eq!(table.child_count(), 11);
        assert_eq!(
            table.child(0).unwrap().child(0).unwrap().kind(),
            NodeKind::TableHeader
        );
        assert_eq!(find_placeholder(editor.doc(), id), None);
    }

    #[test]
    fn failure_renders_error_callout() {
        let mut editor = PlainEditor::default();
        let id = begin(&mut editor, "").unwrap().unwrap();
        let err = QueryError::Envelope("warehouse offline".into());
        assert!(resolve(&mut editor, id, &Err(err)).unwrap());
        let block = editor.doc().child(0).unwrap();
        assert_eq!(block.attrs().get_str("type"), Some("error"));
        assert_eq!(block.attrs().get_str("title"), Some(FAILURE_TITLE));
        assert_eq!(
            block.text_content(),
            "오류: query service reported failure: warehouse offline"
        );
    }

    #[test]
    fn placeholder_found_after_edits_before_it() {
        let mut editor = PlainEditor::default();
        let id = begin(&mut editor, "").unwrap().unwrap();
        let mut tr = editor.transaction();
        tr.insert(0, vec![Node::paragraph("typed meanwhile")]).unwrap();
        editor.apply(tr).unwrap();
        assert_eq!(find_placeholder(editor.doc(), id), Some(17));
        assert!(resolve(&mut editor, id, &Ok(result(1))).unwrap());
        assert_eq!(editor.doc().child(1).unwrap().kind(), NodeKind::GridColumns);
    }

    #[test]
    fn deleted_placeholder_is_a_no_op() {
        let mut editor = PlainEditor::default().with_selection(Selection::collapsed(1));
        let id = begin(&mut editor, "").unwrap().unwrap();
        let mut tr = editor.transaction();
        let size = tr.doc().child(0).unwrap().node_size();
        tr.replace(0, size, vec![Node::empty_paragraph()]).unwrap();
        editor.apply(tr).unwrap();
        let before = editor.doc().clone();
        assert!(!resolve(&mut editor, id, &Ok(result(1))).unwrap());
        assert_eq!(editor.doc(), &before);
    }

    #[test]
    fn empty_result_renders_no_data() {
        let node = render_outcome(&Ok(QueryResult::default()), 10).unwrap();
        assert_eq!(node.child(1).unwrap().text_content(), EMPTY_TEXT);
        assert_eq!(
            node.child(0).unwrap().child(0).unwrap().attrs().get_str("title"),
            Some("데이터 없음")
        );
    }
}
