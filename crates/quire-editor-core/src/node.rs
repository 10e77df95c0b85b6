//! The document tree.
//!
//! A [`Node`] is immutable once built: every constructor validates attributes
//! and the content expression, so a tree made only of `Node`s always satisfies
//! the schema. Edits produce new nodes through [`crate::Transaction`].
//!
//! Positions count one token per node boundary, one per character of text and
//! one per atomic leaf. A node's size is `2 + content size`, a text node's size
//! is its length in chars, and an atom's size is 1.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use smol_str::SmolStr;

use crate::attrs::Attrs;
use crate::error::EditError;
use crate::schema::NodeKind;

/// Placeholder text used for atomic leaves when extracting text.
pub const LEAF_TEXT: char = '\u{fffc}';

/// Inline mark (bold, colour, highlight...). Carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Mark(pub Value);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "NodeJson", into = "NodeJson")]
pub struct Node {
    kind: NodeKind,
    attrs: Attrs,
    content: Vec<Node>,
    text: SmolStr,
    marks: Vec<Mark>,
}

impl Node {
    /// Build a non-text node, normalizing attributes and checking content.
    pub fn new(kind: NodeKind, attrs: Attrs, content: Vec<Node>) -> Result<Self, EditError> {
        if kind.is_text() {
            return Err(EditError::InvalidArgument(
                "text nodes are built with Node::text".to_owned(),
            ));
        }
        let attrs = attrs.normalize(kind)?;
        let content = normalize_inline(content);
        let kinds: Vec<NodeKind> = content.iter().map(Node::kind).collect();
        kind.node_type().check_content(&kinds)?;
        Ok(Self {
            kind,
            attrs,
            content,
            text: SmolStr::default(),
            marks: Vec::new(),
        })
    }

    /// Node with default attributes.
    pub fn with_defaults(kind: NodeKind, content: Vec<Node>) -> Result<Self, EditError> {
        Self::new(kind, Attrs::new(), content)
    }

    pub fn text(text: impl Into<SmolStr>) -> Self {
        Self::text_with_marks(text, Vec::new())
    }

    pub fn text_with_marks(text: impl Into<SmolStr>, marks: Vec<Mark>) -> Self {
        Self {
            kind: NodeKind::Text,
            attrs: Attrs::new(),
            content: Vec::new(),
            text: text.into(),
            marks,
        }
    }

    /// A default paragraph holding `text` (empty text gives an empty paragraph).
    pub fn paragraph(text: &str) -> Self {
        let content = if text.is_empty() {
            Vec::new()
        } else {
            vec![Self::text(text)]
        };
        Self {
            kind: NodeKind::Paragraph,
            attrs: Attrs::defaults(NodeKind::Paragraph),
            content,
            text: SmolStr::default(),
            marks: Vec::new(),
        }
    }

    pub fn empty_paragraph() -> Self {
        Self::paragraph("")
    }

    /// A document holding a single empty paragraph.
    pub fn empty_doc() -> Self {
        Self {
            kind: NodeKind::Doc,
            attrs: Attrs::new(),
            content: vec![Self::empty_paragraph()],
            text: SmolStr::default(),
            marks: Vec::new(),
        }
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn attrs(&self) -> &Attrs {
        &self.attrs
    }

    pub fn content(&self) -> &[Node] {
        &self.content
    }

    pub fn child(&self, index: usize) -> Option<&Node> {
        self.content.get(index)
    }

    pub fn child_count(&self) -> usize {
        self.content.len()
    }

    pub fn first_child(&self) -> Option<&Node> {
        self.content.first()
    }

    pub fn last_child(&self) -> Option<&Node> {
        self.content.last()
    }

    pub fn marks(&self) -> &[Mark] {
        &self.marks
    }

    /// Payload of a text node.
    pub fn text_str(&self) -> Option<&str> {
        self.is_text().then_some(self.text.as_str())
    }

    pub fn is_text(&self) -> bool {
        self.kind.is_text()
    }

    pub fn is_textblock(&self) -> bool {
        self.kind.is_textblock()
    }

    pub fn is_atom(&self) -> bool {
        self.kind.is_atom()
    }

    /// Atoms and text nodes: positions never resolve inside them.
    pub fn is_leaf(&self) -> bool {
        self.is_text() || self.is_atom()
    }

    pub fn node_size(&self) -> usize {
        if self.is_text() {
            self.text.chars().count()
        } else if self.is_atom() {
            1
        } else {
            2 + self.content_size()
        }
    }

    pub fn content_size(&self) -> usize {
        self.content.iter().map(Node::node_size).sum()
    }

    /// No content at all (an empty textblock, or a leaf).
    pub fn is_content_empty(&self) -> bool {
        self.content.is_empty()
    }

    pub fn text_content(&self) -> String {
        if self.is_text() {
            return self.text.to_string();
        }
        self.content.iter().map(Node::text_content).collect()
    }

    /// Text between two content offsets, with atoms rendered as U+FFFC.
    pub fn text_between(&self, from: usize, to: usize) -> String {
        let mut out = String::new();
        self.nodes_between(from, to, &mut |node, pos| {
            if let Some(text) = node.text_str() {
                let start = from.saturating_sub(pos);
                let end = (to - pos).min(node.node_size());
                out.extend(text.chars().skip(start).take(end.saturating_sub(start)));
                false
            } else if node.is_atom() {
                out.push(LEAF_TEXT);
                false
            } else {
                true
            }
        });
        out
    }

    /// Visit every descendant overlapping `from..to` (content offsets),
    /// passing its position relative to this node's content start. Returning
    /// `false` skips the node's children.
    pub fn nodes_between<F>(&self, from: usize, to: usize, f: &mut F)
    where
        F: FnMut(&Node, usize) -> bool,
    {
        self.nodes_between_at(from, to, 0, f);
    }

    fn nodes_between_at<F>(&self, from: usize, to: usize, base: usize, f: &mut F)
    where
        F: FnMut(&Node, usize) -> bool,
    {
        let mut pos = 0;
        for child in &self.content {
            if pos >= to {
                break;
            }
            let end = pos + child.node_size();
            if end > from && f(child, base + pos) && !child.content.is_empty() {
                let start = pos + 1;
                child.nodes_between_at(
                    from.saturating_sub(start),
                    child.content_size().min(to.saturating_sub(start)),
                    base + start,
                    f,
                );
            }
            pos = end;
        }
    }

    /// Visit every descendant with its position.
    pub fn descendants<F>(&self, f: &mut F)
    where
        F: FnMut(&Node, usize) -> bool,
    {
        self.nodes_between(0, self.content_size(), f);
    }

    /// Index of the child containing content offset `offset`, and that child's
    /// start offset. At a boundary the child *after* it is returned.
    pub fn find_index(&self, offset: usize) -> (usize, usize) {
        let mut pos = 0;
        for (i, child) in self.content.iter().enumerate() {
            let end = pos + child.node_size();
            if end > offset {
                return (i, pos);
            }
            if end == offset {
                return (i + 1, end);
            }
            pos = end;
        }
        (self.content.len(), pos)
    }

    /// Copy of the children covering `from..to`. Text children are split;
    /// any other child must lie entirely inside or outside the range.
    pub fn slice_content(&self, from: usize, to: usize) -> Result<Vec<Node>, EditError> {
        let mut out = Vec::new();
        let mut pos = 0;
        for child in &self.content {
            let size = child.node_size();
            let end = pos + size;
            if end <= from || pos >= to {
                pos = end;
                continue;
            }
            if pos >= from && end <= to {
                out.push(child.clone());
            } else if let Some(text) = child.text_str() {
                let start = from.saturating_sub(pos);
                let stop = (to - pos).min(size);
                let piece: String = text.chars().skip(start).take(stop - start).collect();
                out.push(Self::text_with_marks(piece, child.marks.clone()));
            } else {
                return Err(EditError::InvalidRange { from, to });
            }
            pos = end;
        }
        Ok(out)
    }

    /// Same node with new children, checked against the content expression.
    pub fn copy_with(&self, content: Vec<Node>) -> Result<Self, EditError> {
        Self::new(self.kind, self.attrs.clone(), content)
    }

    /// Same node with a replacement attribute map.
    pub fn with_attrs(&self, attrs: Attrs) -> Result<Self, EditError> {
        if self.is_text() {
            return Err(EditError::InvalidArgument(
                "text nodes carry no attributes".to_owned(),
            ));
        }
        Ok(Self {
            attrs: attrs.normalize(self.kind)?,
            ..self.clone()
        })
    }

    /// Child at `index` replaced by `child`. Content is re-checked.
    pub fn replace_child(&self, index: usize, child: Node) -> Result<Self, EditError> {
        let mut content = self.content.clone();
        let slot = content.get_mut(index).ok_or(EditError::InvalidPosition {
            pos: index,
            size: self.content.len(),
        })?;
        *slot = child;
        self.copy_with(content)
    }

    /// Deep validation of the whole subtree.
    pub fn check(&self) -> Result<(), EditError> {
        if self.is_text() {
            if self.text.is_empty() {
                return Err(EditError::InvalidArgument("empty text node".to_owned()));
            }
            return Ok(());
        }
        let kinds: Vec<NodeKind> = self.content.iter().map(Node::kind).collect();
        self.kind.node_type().check_content(&kinds)?;
        self.content.iter().try_for_each(Node::check)
    }

    /// Parse the editor's JSON document shape.
    pub fn from_json(value: Value) -> Result<Self, EditError> {
        let raw: NodeJson = serde_json::from_value(value)
            .map_err(|e| EditError::InvalidArgument(format!("malformed document JSON: {e}")))?;
        Self::try_from(raw)
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(NodeJson::from(self.clone())).unwrap_or(Value::Null)
    }
}

/// Drop empty text nodes and merge neighbours with identical marks.
fn normalize_inline(content: Vec<Node>) -> Vec<Node> {
    let mut out: Vec<Node> = Vec::with_capacity(content.len());
    for node in content {
        if node.is_text() && node.text.is_empty() {
            continue;
        }
        if let Some(prev) = out.last_mut() {
            if prev.is_text() && node.is_text() && prev.marks == node.marks {
                let mut merged = prev.text.to_string();
                merged.push_str(&node.text);
                prev.text = merged.into();
                continue;
            }
        }
        out.push(node);
    }
    out
}

#[derive(Debug, Serialize, Deserialize)]
struct NodeJson {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    attrs: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    content: Vec<NodeJson>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    marks: Vec<Mark>,
}

impl TryFrom<NodeJson> for Node {
    type Error = EditError;

    fn try_from(raw: NodeJson) -> Result<Self, Self::Error> {
        let kind = NodeKind::from_name(&raw.kind).ok_or(EditError::UnknownNodeType(raw.kind))?;
        if kind.is_text() {
            let text = raw.text.unwrap_or_default();
            if text.is_empty() {
                return Err(EditError::InvalidArgument("empty text node".to_owned()));
            }
            return Ok(Self::text_with_marks(text, raw.marks));
        }
        let attrs = Attrs::from_json(kind, &raw.attrs)?;
        let content = raw
            .content
            .into_iter()
            .map(Node::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(kind, attrs, content)
    }
}

impl From<Node> for NodeJson {
    fn from(node: Node) -> Self {
        let is_text = node.is_text();
        Self {
            kind: node.kind.name().to_owned(),
            attrs: node.attrs.to_json(),
            content: node.content.into_iter().map(NodeJson::from).collect(),
            text: is_text.then(|| node.text.to_string()),
            marks: node.marks,
        }
    }
}
