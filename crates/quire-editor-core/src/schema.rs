//! Node type registry.
//!
//! Every node kind the editor knows about is a variant of [`NodeKind`]. The
//! [`Schema`] maps each kind to its [`NodeSpec`]: group membership, content
//! expression, attribute declarations and boundary flags. The standard schema
//! is built once on first use and shared through [`schema()`].

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use crate::attrs::{AttrValue, CalloutKind};
use crate::content_expr::ContentExpr;
use crate::error::{EditError, SchemaError};

/// Closed set of node types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeKind {
    Doc,
    Paragraph,
    Heading,
    BulletList,
    OrderedList,
    ListItem,
    TaskList,
    TaskItem,
    Table,
    TableRow,
    TableCell,
    TableHeader,
    Blockquote,
    Callout,
    GridColumns,
    GridColumn,
    Toggle,
    NotionToggle,
    ReadonlyText,
    Image,
    Text,
}

impl NodeKind {
    pub const ALL: [NodeKind; 21] = [
        Self::Doc,
        Self::Paragraph,
        Self::Heading,
        Self::BulletList,
        Self::OrderedList,
        Self::ListItem,
        Self::TaskList,
        Self::TaskItem,
        Self::Table,
        Self::TableRow,
        Self::TableCell,
        Self::TableHeader,
        Self::Blockquote,
        Self::Callout,
        Self::GridColumns,
        Self::GridColumn,
        Self::Toggle,
        Self::NotionToggle,
        Self::ReadonlyText,
        Self::Image,
        Self::Text,
    ];

    /// Name used in the JSON document format and content expressions.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Doc => "doc",
            Self::Paragraph => "paragraph",
            Self::Heading => "heading",
            Self::BulletList => "bulletList",
            Self::OrderedList => "orderedList",
            Self::ListItem => "listItem",
            Self::TaskList => "taskList",
            Self::TaskItem => "taskItem",
            Self::Table => "table",
            Self::TableRow => "tableRow",
            Self::TableCell => "tableCell",
            Self::TableHeader => "tableHeader",
            Self::Blockquote => "blockquote",
            Self::Callout => "callout",
            Self::GridColumns => "gridColumns",
            Self::GridColumn => "gridColumn",
            Self::Toggle => "toggle",
            Self::NotionToggle => "notionToggle",
            Self::ReadonlyText => "readonlyText",
            Self::Image => "image",
            Self::Text => "text",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }

    pub fn node_type(self) -> &'static NodeType {
        schema().node_type(self)
    }

    pub fn is_text(self) -> bool {
        self == Self::Text
    }

    /// Blocks whose content is inline text.
    pub fn is_textblock(self) -> bool {
        matches!(self, Self::Paragraph | Self::Heading)
    }

    /// Atomic nodes: no children, occupy a single position.
    pub fn is_atom(self) -> bool {
        self.node_type().spec.atom
    }

    pub fn is_list(self) -> bool {
        matches!(self, Self::BulletList | Self::OrderedList | Self::TaskList)
    }

    pub fn is_list_item(self) -> bool {
        matches!(self, Self::ListItem | Self::TaskItem)
    }

    pub fn is_table_cell(self) -> bool {
        matches!(self, Self::TableCell | Self::TableHeader)
    }

    pub fn is_toggle(self) -> bool {
        matches!(self, Self::Toggle | Self::NotionToggle)
    }

    /// Item type held by a list kind.
    pub fn list_item_kind(self) -> Option<Self> {
        match self {
            Self::BulletList | Self::OrderedList => Some(Self::ListItem),
            Self::TaskList => Some(Self::TaskItem),
            _ => None,
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Group {
    Block,
    Inline,
}

impl Group {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Block => "block",
            Self::Inline => "inline",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrType {
    Bool,
    Int,
    Str,
    /// String or null.
    OptStr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrDefault {
    Null,
    Bool(bool),
    Int(i64),
    Str(&'static str),
}

/// Extra constraint on an attribute's value beyond its type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AttrCheck {
    #[default]
    Any,
    /// Integer within `min..=max`.
    Range(i64, i64),
    /// String from a closed set.
    OneOf(&'static [&'static str]),
}

impl AttrCheck {
    fn allows(self, value: &AttrValue) -> bool {
        match (self, value) {
            (Self::Any, _) => true,
            (Self::Range(min, max), AttrValue::Int(i)) => (min..=max).contains(i),
            (Self::OneOf(names), AttrValue::Str(s)) => names.contains(&s.as_str()),
            _ => false,
        }
    }
}

/// Declaration of one attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttrSpec {
    pub name: &'static str,
    pub ty: AttrType,
    pub default: AttrDefault,
    pub check: AttrCheck,
}

impl AttrSpec {
    pub const fn bool(name: &'static str, default: bool) -> Self {
        Self {
            name,
            ty: AttrType::Bool,
            default: AttrDefault::Bool(default),
            check: AttrCheck::Any,
        }
    }

    pub const fn int(name: &'static str, default: i64) -> Self {
        Self {
            name,
            ty: AttrType::Int,
            default: AttrDefault::Int(default),
            check: AttrCheck::Any,
        }
    }

    pub const fn str(name: &'static str, default: &'static str) -> Self {
        Self {
            name,
            ty: AttrType::Str,
            default: AttrDefault::Str(default),
            check: AttrCheck::Any,
        }
    }

    pub const fn opt_str(name: &'static str) -> Self {
        Self {
            name,
            ty: AttrType::OptStr,
            default: AttrDefault::Null,
            check: AttrCheck::Any,
        }
    }

    /// Only accept integers in `min..=max`.
    pub const fn range(mut self, min: i64, max: i64) -> Self {
        self.check = AttrCheck::Range(min, max);
        self
    }

    /// Only accept one of `names`.
    pub const fn one_of(mut self, names: &'static [&'static str]) -> Self {
        self.check = AttrCheck::OneOf(names);
        self
    }

    pub fn default_value(&self) -> AttrValue {
        match self.default {
            AttrDefault::Null => AttrValue::Null,
            AttrDefault::Bool(b) => AttrValue::Bool(b),
            AttrDefault::Int(i) => AttrValue::Int(i),
            AttrDefault::Str(s) => AttrValue::Str(s.into()),
        }
    }

    pub fn accepts(&self, value: &AttrValue) -> bool {
        matches!(
            (self.ty, value),
            (AttrType::Bool, AttrValue::Bool(_))
                | (AttrType::Int, AttrValue::Int(_))
                | (AttrType::Str | AttrType::OptStr, AttrValue::Str(_))
                | (AttrType::OptStr, AttrValue::Null)
        ) && (value.is_null() || self.check.allows(value))
    }
}

/// Declarative description of a node type, as passed to
/// [`SchemaBuilder::register`].
#[derive(Debug, Clone)]
pub struct NodeSpec {
    pub group: Option<Group>,
    /// Content expression; empty for leaves.
    pub content: &'static str,
    pub attrs: Vec<AttrSpec>,
    /// Structural edits (lift, join) may not cross this node's boundary.
    pub isolating: bool,
    /// The node keeps its identity when its content is replaced wholesale.
    pub defining: bool,
    /// Atomic leaf with no editable content.
    pub atom: bool,
}

impl NodeSpec {
    pub fn new(group: Option<Group>, content: &'static str) -> Self {
        Self {
            group,
            content,
            attrs: Vec::new(),
            isolating: false,
            defining: false,
            atom: false,
        }
    }

    pub fn block(content: &'static str) -> Self {
        Self::new(Some(Group::Block), content)
    }

    pub fn attr(mut self, attr: AttrSpec) -> Self {
        self.attrs.push(attr);
        self
    }

    pub fn isolating(mut self) -> Self {
        self.isolating = true;
        self
    }

    pub fn defining(mut self) -> Self {
        self.defining = true;
        self
    }

    pub fn atom(mut self) -> Self {
        self.atom = true;
        self
    }
}

/// A registered node type with its compiled content expression.
#[derive(Debug, Clone)]
pub struct NodeType {
    pub kind: NodeKind,
    pub spec: NodeSpec,
    pub content: ContentExpr,
}

impl NodeType {
    pub fn attr_spec(&self, name: &str) -> Option<&AttrSpec> {
        self.spec.attrs.iter().find(|a| a.name == name)
    }

    /// Validate a child sequence against the content expression.
    pub fn check_content(&self, children: &[NodeKind]) -> Result<(), EditError> {
        if self.content.matches(children) {
            return Ok(());
        }
        Err(EditError::ContentModelViolation {
            node: self.kind.name(),
            expected: self.content.source().to_owned(),
            found: children
                .iter()
                .map(|k| k.name())
                .collect::<Vec<_>>()
                .join(" "),
        })
    }
}

#[derive(Debug, Default)]
pub struct SchemaBuilder {
    specs: BTreeMap<NodeKind, NodeSpec>,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, kind: NodeKind, spec: NodeSpec) -> Result<&mut Self, SchemaError> {
        if self.specs.contains_key(&kind) {
            return Err(SchemaError::DuplicateType(kind.name()));
        }
        self.specs.insert(kind, spec);
        Ok(self)
    }

    /// Compile every content expression. All kinds must be registered.
    pub fn build(&self) -> Result<Schema, SchemaError> {
        if let Some(missing) = NodeKind::ALL.iter().find(|k| !self.specs.contains_key(k)) {
            return Err(SchemaError::MissingType(missing.name()));
        }

        let members = |group: Group| -> Vec<NodeKind> {
            self.specs
                .iter()
                .filter(|(_, spec)| spec.group == Some(group))
                .map(|(kind, _)| *kind)
                .collect()
        };
        let block = members(Group::Block);
        let inline = members(Group::Inline);
        let resolve = |name: &str| -> Option<Vec<NodeKind>> {
            if name == Group::Block.name() {
                Some(block.clone())
            } else if name == Group::Inline.name() {
                Some(inline.clone())
            } else {
                NodeKind::from_name(name).map(|k| vec![k])
            }
        };

        let mut types = Vec::with_capacity(NodeKind::ALL.len());
        for kind in NodeKind::ALL {
            let spec = self.specs[&kind].clone();
            let content = ContentExpr::parse(spec.content, resolve).map_err(|reason| {
                SchemaError::InvalidContentExpression {
                    node: kind.name(),
                    expr: spec.content.to_owned(),
                    reason,
                }
            })?;
            if spec.atom && !content.is_leaf() {
                return Err(SchemaError::InvalidContentExpression {
                    node: kind.name(),
                    expr: spec.content.to_owned(),
                    reason: "atomic nodes cannot have content".to_owned(),
                });
            }
            types.push(NodeType {
                kind,
                spec,
                content,
            });
        }
        Ok(Schema { types })
    }
}

#[derive(Debug)]
pub struct Schema {
    // Indexed by `NodeKind as usize`; `build` guarantees every kind is present.
    types: Vec<NodeType>,
}

impl Schema {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::new()
    }

    pub fn node_type(&self, kind: NodeKind) -> &NodeType {
        &self.types[kind as usize]
    }

    /// The editor's node types.
    pub fn standard() -> Result<Self, SchemaError> {
        use NodeKind::*;

        let table_cell = || {
            NodeSpec::new(None, "block+")
                .attr(AttrSpec::opt_str("style"))
                .attr(AttrSpec::int("colspan", 1))
                .attr(AttrSpec::int("rowspan", 1))
                .isolating()
        };

        let mut builder = Self::builder();
        builder
            .register(Doc, NodeSpec::new(None, "block+"))?
            .register(
                Paragraph,
                NodeSpec::block("inline*").attr(AttrSpec::int("indent", 0).range(0, i64::MAX)),
            )?
            .register(
                Heading,
                NodeSpec::block("inline*")
                    .attr(AttrSpec::int("level", 1).range(1, 6))
                    .attr(AttrSpec::int("indent", 0).range(0, i64::MAX))
                    .defining(),
            )?
            .register(BulletList, NodeSpec::block("listItem+"))?
            .register(
                OrderedList,
                NodeSpec::block("listItem+").attr(AttrSpec::int("start", 1)),
            )?
            .register(ListItem, NodeSpec::new(None, "paragraph block*").defining())?
            .register(TaskList, NodeSpec::block("taskItem+"))?
            .register(
                TaskItem,
                NodeSpec::new(None, "paragraph block*")
                    .attr(AttrSpec::bool("checked", false))
                    .defining(),
            )?
            .register(Table, NodeSpec::block("tableRow+").isolating())?
            .register(TableRow, NodeSpec::new(None, "(tableCell | tableHeader)*"))?
            .register(TableCell, table_cell())?
            .register(TableHeader, table_cell())?
            .register(Blockquote, NodeSpec::block("block+").defining())?
            .register(
                Callout,
                NodeSpec::block("block+")
                    .attr(AttrSpec::str("type", "info").one_of(&CalloutKind::NAMES))
                    .attr(AttrSpec::str("title", "정보"))
                    .attr(AttrSpec::opt_str("placeholderId"))
                    .isolating(),
            )?
            .register(GridColumns, NodeSpec::block("gridColumn+").isolating())?
            .register(GridColumn, NodeSpec::new(None, "block+").isolating())?
            .register(
                Toggle,
                NodeSpec::block("block+")
                    .attr(AttrSpec::bool("isOpen", true))
                    .attr(AttrSpec::str("title", ""))
                    .defining()
                    .isolating(),
            )?
            .register(
                NotionToggle,
                NodeSpec::block("block+")
                    .attr(AttrSpec::bool("isOpen", true))
                    .defining()
                    .isolating(),
            )?
            .register(
                ReadonlyText,
                NodeSpec::block("").attr(AttrSpec::str("text", "")).atom(),
            )?
            .register(
                Image,
                NodeSpec::block("")
                    .attr(AttrSpec::opt_str("src"))
                    .attr(AttrSpec::opt_str("alt"))
                    .attr(AttrSpec::opt_str("title"))
                    .attr(AttrSpec::str("width", "auto"))
                    .attr(AttrSpec::str("height", "auto"))
                    .atom(),
            )?
            .register(Text, NodeSpec::new(Some(Group::Inline), ""))?;
        builder.build()
    }
}

static SCHEMA: LazyLock<Schema> =
    LazyLock::new(|| Schema::standard().expect("standard schema is well-formed"));

/// The shared standard schema.
pub fn schema() -> &'static Schema {
    &SCHEMA
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_schema_builds() {
        assert!(Schema::standard().is_ok());
        assert_eq!(schema().node_type(NodeKind::Toggle).kind, NodeKind::Toggle);
    }

    #[test]
    fn duplicate_registration_fails() {
        let mut builder = Schema::builder();
        builder
            .register(NodeKind::Doc, NodeSpec::new(None, "block+"))
            .unwrap();
        let err = builder
            .register(NodeKind::Doc, NodeSpec::new(None, "block*"))
            .unwrap_err();
        assert_eq!(err, SchemaError::DuplicateType("doc"));
    }

    #[test]
    fn incomplete_registry_fails() {
        let mut builder = Schema::builder();
        builder
            .register(NodeKind::Doc, NodeSpec::new(None, "block+"))
            .unwrap();
        assert!(matches!(builder.build(), Err(SchemaError::MissingType(_))));
    }

    #[test]
    fn names_round_trip() {
        for kind in NodeKind::ALL {
            assert_eq!(NodeKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(NodeKind::from_name("codeBlock"), None);
    }

    #[test]
    fn toggle_is_defining_and_isolating() {
        let spec = &NodeKind::Toggle.node_type().spec;
        assert!(spec.defining && spec.isolating);
        assert!(NodeKind::ReadonlyText.is_atom());
        assert!(!NodeKind::Paragraph.is_atom());
    }

    #[test]
    fn content_violation_names_the_node() {
        let err = NodeKind::GridColumns
            .node_type()
            .check_content(&[NodeKind::Paragraph])
            .unwrap_err();
        assert!(matches!(
            err,
            EditError::ContentModelViolation { node: "gridColumns", .. }
        ));
    }
}
