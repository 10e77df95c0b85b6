//! HTML representation.
//!
//! Each node maps to one element whose `data-*` attributes carry the node's
//! attributes. This is the portable form of a document: [`ElementAttrs`]
//! encodes a node's attributes onto an element and decodes them back, and
//! [`to_html`] renders a whole tree.

use std::fmt::Write as _;

use html_escape::{encode_double_quoted_attribute, encode_text};
use indexmap::IndexMap;
use smol_str::SmolStr;

use crate::attrs::{AttrValue, Attrs, CalloutKind};
use crate::error::EditError;
use crate::node::Node;
use crate::schema::NodeKind;
use crate::style::StyleMap;

/// Tag, attributes and (for `readonly-text`) inner text of one element.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ElementAttrs {
    pub tag: SmolStr,
    pub attrs: IndexMap<SmolStr, String>,
    pub text: Option<String>,
}

impl ElementAttrs {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: SmolStr::new(tag),
            ..Self::default()
        }
    }

    pub fn with(mut self, name: &str, value: impl Into<String>) -> Self {
        self.attrs.insert(SmolStr::new(name), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    fn data_type(&self) -> Option<&str> {
        self.get("data-type")
    }

    /// Element for `node`. `None` for the document root and text.
    pub fn encode(node: &Node) -> Option<Self> {
        let attrs = node.attrs();
        let el = match node.kind() {
            NodeKind::Doc | NodeKind::Text => return None,
            NodeKind::Paragraph => with_indent(Self::new("p"), attrs),
            NodeKind::Heading => {
                let level = attrs.get_int("level").unwrap_or(1).clamp(1, 6);
                with_indent(Self::new(&format!("h{level}")), attrs)
            }
            NodeKind::BulletList => Self::new("ul"),
            NodeKind::OrderedList => match attrs.get_int("start") {
                Some(start) if start != 1 => Self::new("ol").with("start", start.to_string()),
                _ => Self::new("ol"),
            },
            NodeKind::ListItem => Self::new("li"),
            NodeKind::TaskList => Self::new("ul").with("data-type", "taskList"),
            NodeKind::TaskItem => Self::new("li")
                .with("data-type", "taskItem")
                .with("data-checked", bool_str(attrs.get_bool("checked").unwrap_or(false))),
            NodeKind::Table => Self::new("table"),
            NodeKind::TableRow => Self::new("tr"),
            NodeKind::TableCell => cell(Self::new("td"), attrs),
            NodeKind::TableHeader => cell(Self::new("th"), attrs),
            NodeKind::Blockquote => Self::new("blockquote"),
            NodeKind::Callout => {
                let mut el = Self::new("div")
                    .with("data-type", "callout")
                    .with("data-callout-type", attrs.get_str("type").unwrap_or("info"))
                    .with("data-callout-title", attrs.get_str("title").unwrap_or_default());
                if let Some(id) = attrs.get_str("placeholderId") {
                    el = el.with("data-placeholder-id", id);
                }
                el
            }
            NodeKind::GridColumns => Self::new("div").with("data-type", "grid-columns"),
            NodeKind::GridColumn => Self::new("div").with("data-type", "grid-column"),
            NodeKind::Toggle => Self::new("div")
                .with("data-type", "toggle")
                .with("data-is-open", bool_str(attrs.get_bool("isOpen").unwrap_or(true)))
                .with("data-title", attrs.get_str("title").unwrap_or_default()),
            NodeKind::NotionToggle => Self::new("div")
                .with("data-type", "notion-toggle")
                .with("data-is-open", bool_str(attrs.get_bool("isOpen").unwrap_or(true))),
            NodeKind::ReadonlyText => Self {
                text: Some(attrs.get_str("text").unwrap_or_default().to_owned()),
                ..Self::new("readonly-text")
            },
            NodeKind::Image => {
                let mut el = Self::new("img");
                for name in ["src", "alt", "title"] {
                    if let Some(value) = attrs.get_str(name) {
                        el = el.with(name, value);
                    }
                }
                for name in ["width", "height"] {
                    match attrs.get_str(name) {
                        Some(value) if value != "auto" => el = el.with(name, value),
                        _ => {}
                    }
                }
                el
            }
        };
        Some(el)
    }

    /// Node type and attributes described by this element.
    pub fn decode(&self) -> Result<(NodeKind, Attrs), EditError> {
        let kind = self.kind()?;
        let mut attrs = Attrs::new();
        match kind {
            NodeKind::Paragraph => attrs.set("indent", self.indent()),
            NodeKind::Heading => {
                let level = self.tag.get(1..).and_then(|l| l.parse::<i64>().ok()).unwrap_or(1);
                attrs.set("level", level);
                attrs.set("indent", self.indent());
            }
            NodeKind::OrderedList => {
                if let Some(start) = self.get("start").and_then(|s| s.parse::<i64>().ok()) {
                    attrs.set("start", start);
                }
            }
            NodeKind::TaskItem => attrs.set("checked", self.get("data-checked") == Some("true")),
            NodeKind::TableCell | NodeKind::TableHeader => {
                attrs.set("style", self.get("style").map(str::to_owned));
                for name in ["colspan", "rowspan"] {
                    if let Some(span) = self.get(name).and_then(|s| s.parse::<i64>().ok()) {
                        attrs.set(name, span);
                    }
                }
            }
            NodeKind::Callout => {
                // Unknown flavours from foreign markup read as the default.
                if let Some(kind) = self.get("data-callout-type").and_then(CalloutKind::parse) {
                    attrs.set("type", kind.as_str());
                }
                if let Some(title) = self.get("data-callout-title") {
                    attrs.set("title", title);
                }
                attrs.set("placeholderId", self.get("data-placeholder-id"));
            }
            NodeKind::Toggle => {
                attrs.set("isOpen", self.get("data-is-open") != Some("false"));
                attrs.set("title", self.get("data-title").unwrap_or_default());
            }
            NodeKind::NotionToggle => {
                attrs.set("isOpen", self.get("data-is-open") != Some("false"));
            }
            NodeKind::ReadonlyText => attrs.set("text", self.text.as_deref().unwrap_or_default()),
            NodeKind::Image => {
                for name in ["src", "alt", "title", "width", "height"] {
                    if let Some(value) = self.get(name) {
                        attrs.set(name, value);
                    }
                }
            }
            _ => {}
        }
        Ok((kind, attrs.normalize(kind)?))
    }

    fn kind(&self) -> Result<NodeKind, EditError> {
        let kind = match (self.tag.as_str(), self.data_type()) {
            ("p", _) => NodeKind::Paragraph,
            ("h1" | "h2" | "h3" | "h4" | "h5" | "h6", _) => NodeKind::Heading,
            ("ul", Some("taskList")) => NodeKind::TaskList,
            ("ul", _) => NodeKind::BulletList,
            ("ol", _) => NodeKind::OrderedList,
            ("li", Some("taskItem")) => NodeKind::TaskItem,
            ("li", _) => NodeKind::ListItem,
            ("table", _) => NodeKind::Table,
            ("tr", _) => NodeKind::TableRow,
            ("td", _) => NodeKind::TableCell,
            ("th", _) => NodeKind::TableHeader,
            ("blockquote", _) => NodeKind::Blockquote,
            ("div", Some("callout")) => NodeKind::Callout,
            ("div", Some("grid-columns")) => NodeKind::GridColumns,
            ("div", Some("grid-column")) => NodeKind::GridColumn,
            ("div", Some("toggle")) => NodeKind::Toggle,
            ("div", Some("notion-toggle")) => NodeKind::NotionToggle,
            ("readonly-text", _) => NodeKind::ReadonlyText,
            ("img", _) => NodeKind::Image,
            (tag, data_type) => {
                return Err(EditError::UnknownNodeType(match data_type {
                    Some(dt) => format!("{tag}[data-type={dt}]"),
                    None => tag.to_owned(),
                }));
            }
        };
        Ok(kind)
    }

    /// Indent level from `margin-left: {2n}em`.
    fn indent(&self) -> i64 {
        self.get("style")
            .map(StyleMap::parse)
            .and_then(|style| {
                style
                    .get("margin-left")
                    .and_then(|m| m.strip_suffix("em"))
                    .and_then(|m| m.trim().parse::<f64>().ok())
            })
            .map_or(0, |em| (em / 2.0).floor().max(0.0) as i64)
    }
}

fn bool_str(b: bool) -> &'static str {
    if b { "true" } else { "false" }
}

fn with_indent(el: ElementAttrs, attrs: &Attrs) -> ElementAttrs {
    match attrs.get_int("indent") {
        Some(n) if n > 0 => el.with("style", format!("margin-left: {}em", n * 2)),
        _ => el,
    }
}

fn cell(mut el: ElementAttrs, attrs: &Attrs) -> ElementAttrs {
    for name in ["colspan", "rowspan"] {
        match attrs.get_int(name) {
            Some(span) if span != 1 => el = el.with(name, span.to_string()),
            _ => {}
        }
    }
    if let Some(style) = attrs.get("style").and_then(AttrValue::as_str) {
        el = el.with("style", style);
    }
    el
}

/// Render `node` and its subtree.
pub fn to_html(node: &Node) -> String {
    let mut out = String::new();
    write_node(&mut out, node);
    out
}

fn write_node(out: &mut String, node: &Node) {
    if let Some(text) = node.text_str() {
        out.push_str(&encode_text(text));
        return;
    }
    let Some(el) = ElementAttrs::encode(node) else {
        node.content().iter().for_each(|child| write_node(out, child));
        return;
    };

    let _ = write!(out, "<{}", el.tag);
    for (name, value) in &el.attrs {
        let _ = write!(out, " {name}=\"{}\"", encode_double_quoted_attribute(value));
    }
    out.push('>');
    if node.kind() == NodeKind::Image {
        return;
    }
    if let Some(text) = &el.text {
        out.push_str(&encode_text(text));
    }
    node.content().iter().for_each(|child| write_node(out, child));
    let _ = write!(out, "</{}>", el.tag);
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn round_trip(kind: NodeKind, attrs: Attrs, content: Vec<Node>) -> Attrs {
        let node = Node::new(kind, attrs, content).unwrap();
        let el = ElementAttrs::encode(&node).unwrap();
        let (decoded_kind, decoded) = el.decode().unwrap();
        assert_eq!(decoded_kind, kind);
        assert_eq!(&decoded, node.attrs());
        decoded
    }

    #[test]
    fn toggle_attrs_round_trip() {
        let attrs = round_trip(
            NodeKind::Toggle,
            Attrs::new().with("isOpen", false).with("title", "X"),
            vec![Node::empty_paragraph()],
        );
        assert_eq!(attrs.get_bool("isOpen"), Some(false));
        assert_eq!(attrs.get_str("title"), Some("X"));
    }

    #[test]
    fn custom_blocks_round_trip() {
        round_trip(
            NodeKind::Callout,
            Attrs::new().with("type", "warning").with("title", "조심"),
            vec![Node::empty_paragraph()],
        );
        round_trip(NodeKind::NotionToggle, Attrs::new().with("isOpen", false), vec![Node::empty_paragraph()]);
        round_trip(NodeKind::ReadonlyText, Attrs::new().with("text", "a < b"), vec![]);
        round_trip(
            NodeKind::Image,
            Attrs::new().with("src", "x.png").with("width", "120px"),
            vec![],
        );
        round_trip(
            NodeKind::TableCell,
            Attrs::new().with("style", "background-color: #fecaca").with("colspan", 2_i64),
            vec![Node::empty_paragraph()],
        );
    }

    #[test]
    fn indent_maps_to_margin() {
        let p = Node::new(NodeKind::Paragraph, Attrs::new().with("indent", 3_i64), vec![]).unwrap();
        let el = ElementAttrs::encode(&p).unwrap();
        assert_eq!(el.get("style"), Some("margin-left: 6em"));
        round_trip(NodeKind::Heading, Attrs::new().with("level", 2_i64).with("indent", 1_i64), vec![]);
    }

    #[test]
    fn negative_indent_never_reaches_the_encoder() {
        let err = Node::new(NodeKind::Paragraph, Attrs::new().with("indent", -3_i64), vec![]);
        assert!(matches!(err, Err(EditError::AttributeType { .. })));
    }

    #[test]
    fn foreign_callout_type_reads_as_info() {
        let el = ElementAttrs::new("div")
            .with("data-type", "callout")
            .with("data-callout-type", "fatal");
        let (kind, attrs) = el.decode().unwrap();
        assert_eq!(kind, NodeKind::Callout);
        assert_eq!(attrs.get_str("type"), Some("info"));
    }

    #[test]
    fn unknown_elements_are_rejected() {
        let el = ElementAttrs::new("div").with("data-type", "kanban");
        assert_eq!(
            el.decode().unwrap_err(),
            EditError::UnknownNodeType("div[data-type=kanban]".to_owned())
        );
    }

    #[test]
    fn renders_escaped_html() {
        let toggle = Node::new(
            NodeKind::Toggle,
            Attrs::new().with("title", "\"Q&A\""),
            vec![Node::paragraph("1 < 2")],
        )
        .unwrap();
        let ro = Node::new(NodeKind::ReadonlyText, Attrs::new().with("text", "fixed"), vec![]).unwrap();
        let doc = Node::with_defaults(NodeKind::Doc, vec![toggle, ro]).unwrap();
        assert_eq!(
            to_html(&doc),
            "<div data-type=\"toggle\" data-is-open=\"true\" data-title=\"&quot;Q&amp;A&quot;\">\
             <p>1 &lt; 2</p></div><readonly-text>fixed</readonly-text>"
        );
    }
}
