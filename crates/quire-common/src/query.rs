//! Wire types for the warehouse query service and helpers for turning query
//! results into document-friendly shapes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single result row, keyed by lower-cased column name in column order.
pub type Row = Map<String, Value>;

/// Result of executing a statement against the warehouse.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
    pub row_count: usize,
}

/// Bind parameters for a statement.
///
/// Objects are bound positionally in value order, arrays as given.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Parameters {
    Positional(Vec<Value>),
    Named(Map<String, Value>),
}

impl Default for Parameters {
    fn default() -> Self {
        Self::Named(Map::new())
    }
}

impl Parameters {
    /// Values to bind, in binding order.
    pub fn binds(&self) -> Vec<Value> {
        match self {
            Self::Positional(values) => values.clone(),
            Self::Named(map) => map.values().cloned().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Positional(values) => values.is_empty(),
            Self::Named(map) => map.is_empty(),
        }
    }
}

/// Body of `POST /query`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryRequest {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub parameters: Parameters,
}

/// Body of `POST /template/{name}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemplateRequest {
    #[serde(default)]
    pub parameters: Parameters,
}

/// Entry of `GET /templates`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateInfo {
    pub name: String,
    pub description: String,
}

/// Response envelope shared by every endpoint.
///
/// Successful responses flatten their payload next to `success`; failures
/// carry an [`ErrorPayload`] instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(flatten)]
    pub payload: T,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl<T> Envelope<T> {
    pub fn ok(payload: T) -> Self {
        Self {
            success: true,
            payload,
            timestamp: Some(Utc::now()),
        }
    }
}

impl Envelope<ErrorPayload> {
    pub fn error(error: impl Into<String>) -> Self {
        Self {
            success: false,
            payload: ErrorPayload {
                error: error.into(),
                ..Default::default()
            },
            timestamp: Some(Utc::now()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available_templates: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusPayload {
    pub connected: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryPayload {
    pub data: QueryResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplatePayload {
    pub template_name: String,
    pub description: String,
    pub data: QueryResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplatesPayload {
    pub templates: Vec<TemplateInfo>,
    pub count: usize,
}

/// Tabular projection of a query result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableData {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Short human-readable digest of a query result, rendered into a callout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub title: String,
    pub lines: Vec<String>,
}

impl QueryResult {
    /// Project the result into headers + stringified cells.
    ///
    /// Returns `None` when there are no rows.
    pub fn as_table(&self) -> Option<TableData> {
        let first = self.rows.first()?;
        let headers = if self.columns.is_empty() {
            first.keys().cloned().collect()
        } else {
            self.columns.clone()
        };

        let rows = self
            .rows
            .iter()
            .map(|row| {
                headers
                    .iter()
                    .map(|h| row.get(h).map(display_value).unwrap_or_default())
                    .collect()
            })
            .collect();

        Some(TableData { headers, rows })
    }

    /// Summarize the first row, recognizing sales and customer shaped results.
    pub fn summarize(&self) -> Summary {
        let Some(first) = self.rows.first() else {
            return Summary {
                title: "데이터 없음".into(),
                lines: vec!["조회된 데이터가 없습니다.".into()],
            };
        };

        let sales = first.get("total_sales").or_else(|| first.get("revenue"));
        if let Some(sales) = sales {
            let mut lines = vec![format!("총 매출: {}", format_krw(sales))];
            if let Some(orders) = first.get("order_count") {
                lines.push(format!("주문 수: {}", format_count(orders)));
            }
            if let Some(avg) = first.get("avg_order_value") {
                lines.push(format!("평균 주문액: {}", format_krw(avg)));
            }
            return Summary {
                title: "📊 매출 요약".into(),
                lines,
            };
        }

        if let Some(customers) = first.get("customer_count") {
            let mut lines = vec![format!("총 고객 수: {}", format_count(customers))];
            if let Some(ltv) = first.get("total_ltv") {
                lines.push(format!("총 생애가치: {}", format_krw(ltv)));
            }
            return Summary {
                title: "👥 고객 분석".into(),
                lines,
            };
        }

        Summary {
            title: "데이터 요약".into(),
            lines: first
                .iter()
                .take(3)
                .map(|(k, v)| format!("{k}: {}", display_value(v)))
                .collect(),
        }
    }
}

/// Render a JSON cell value the way it should appear in a table cell.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Format an amount as whole Korean won, e.g. `₩1,234,567`.
pub fn format_krw(value: &Value) -> String {
    match as_number(value) {
        Some(amount) => {
            let rounded = amount.round();
            let sign = if rounded < 0.0 { "-" } else { "" };
            format!("{sign}₩{}", group_digits(rounded.abs() as u64))
        }
        None => display_value(value),
    }
}

fn format_count(value: &Value) -> String {
    match as_number(value) {
        Some(n) if n.fract() == 0.0 && n >= 0.0 => group_digits(n as u64),
        _ => display_value(value),
    }
}

fn group_digits(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn result(rows: Vec<Value>) -> QueryResult {
        let rows: Vec<Row> = rows
            .into_iter()
            .map(|v| v.as_object().cloned().unwrap())
            .collect();
        QueryResult {
            columns: rows
                .first()
                .map(|r| r.keys().cloned().collect())
                .unwrap_or_default(),
            row_count: rows.len(),
            rows,
        }
    }

    #[test]
    fn named_parameters_bind_in_value_order() {
        let params: Parameters = serde_json::from_value(json!({"b": 2, "a": "x"})).unwrap();
        assert_eq!(params.binds(), vec![json!(2), json!("x")]);

        let params: Parameters = serde_json::from_value(json!([1, 2])).unwrap();
        assert_eq!(params.binds(), vec![json!(1), json!(2)]);
    }

    #[test]
    fn empty_result_summary() {
        let summary = QueryResult::default().summarize();
        assert_eq!(summary.title, "데이터 없음");
        assert!(QueryResult::default().as_table().is_none());
    }

    #[test]
    fn sales_summary_formats_currency() {
        let data = result(vec![json!({
            "month": "2024-05",
            "total_sales": 12345678,
            "order_count": 1500,
            "avg_order_value": "82304.5"
        })]);
        let summary = data.summarize();
        assert_eq!(summary.title, "📊 매출 요약");
        assert_eq!(
            summary.lines,
            vec![
                "총 매출: ₩12,345,678".to_string(),
                "주문 수: 1,500".to_string(),
                "평균 주문액: ₩82,305".to_string(),
            ]
        );
    }

    #[test]
    fn generic_summary_takes_first_three_columns() {
        let data = result(vec![json!({"a": 1, "b": "two", "c": null, "d": 4})]);
        let summary = data.summarize();
        assert_eq!(summary.title, "데이터 요약");
        assert_eq!(summary.lines, vec!["a: 1", "b: two", "c: "]);
    }

    #[test]
    fn table_projection_stringifies_cells() {
        let data = result(vec![
            json!({"region": "서울", "total_sales": 10}),
            json!({"region": "부산", "total_sales": null}),
        ]);
        let table = data.as_table().unwrap();
        assert_eq!(table.headers, vec!["region", "total_sales"]);
        assert_eq!(table.rows[0], vec!["서울", "10"]);
        assert_eq!(table.rows[1], vec!["부산", ""]);
    }

    #[test]
    fn error_envelope_shape() {
        let value = serde_json::to_value(Envelope::error("boom")).unwrap();
        assert_eq!(value["success"], json!(false));
        assert_eq!(value["error"], json!("boom"));
        assert!(value.get("templateName").is_none());
    }
}
