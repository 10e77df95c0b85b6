//! Typed node attributes.
//!
//! Attribute maps are always complete: [`Attrs::normalize`] drops names the
//! node type does not declare, fills in declared defaults, and rejects values
//! of the wrong shape. Nodes only ever hold normalized maps.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use smol_str::SmolStr;

use crate::error::EditError;
use crate::schema::NodeKind;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Null,
    Bool(bool),
    Int(i64),
    Str(SmolStr),
}

impl AttrValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Convert from JSON. Whole-valued floats are accepted as integers since
    /// browsers serialize numbers loosely.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(Self::Null),
            Value::Bool(b) => Some(Self::Bool(*b)),
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
                .map(Self::Int),
            Value::String(s) => Some(Self::Str(s.into())),
            Value::Array(_) | Value::Object(_) => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Bool(b) => Value::Bool(*b),
            Self::Int(i) => Value::from(*i),
            Self::Str(s) => Value::String(s.to_string()),
        }
    }
}

impl From<bool> for AttrValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for AttrValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        Self::Str(s.into())
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        Self::Str(s.into())
    }
}

impl From<SmolStr> for AttrValue {
    fn from(s: SmolStr) -> Self {
        Self::Str(s)
    }
}

impl<T: Into<AttrValue>> From<Option<T>> for AttrValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attrs(BTreeMap<SmolStr, AttrValue>);

impl Attrs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declared defaults for `kind`.
    pub fn defaults(kind: NodeKind) -> Self {
        Self(
            kind.node_type()
                .spec
                .attrs
                .iter()
                .map(|a| (SmolStr::new_static(a.name), a.default_value()))
                .collect(),
        )
    }

    pub fn get(&self, name: &str) -> Option<&AttrValue> {
        self.0.get(name)
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(AttrValue::as_bool)
    }

    pub fn get_int(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(AttrValue::as_int)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(AttrValue::as_str)
    }

    pub fn set(&mut self, name: &str, value: impl Into<AttrValue>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn with(mut self, name: &str, value: impl Into<AttrValue>) -> Self {
        self.set(name, value);
        self
    }

    pub fn remove(&mut self, name: &str) -> Option<AttrValue> {
        self.0.remove(name)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttrValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Complete and validate against `kind`'s declarations. A `null` for a
    /// non-nullable attribute falls back to the default.
    pub fn normalize(mut self, kind: NodeKind) -> Result<Self, EditError> {
        let node_type = kind.node_type();
        let mut out = BTreeMap::new();
        for spec in &node_type.spec.attrs {
            let value = match self.0.remove(spec.name) {
                None | Some(AttrValue::Null) => spec.default_value(),
                Some(v) if spec.accepts(&v) => v,
                Some(_) => {
                    return Err(EditError::AttributeType {
                        node: kind.name(),
                        attr: spec.name.to_owned(),
                    });
                }
            };
            out.insert(SmolStr::new_static(spec.name), value);
        }
        Ok(Self(out))
    }

    pub fn from_json(kind: NodeKind, map: &Map<String, Value>) -> Result<Self, EditError> {
        let mut attrs = Self::new();
        for (name, value) in map {
            // Undeclared attributes are dropped by `normalize` anyway.
            if kind.node_type().attr_spec(name).is_none() {
                continue;
            }
            let value = AttrValue::from_json(value).ok_or_else(|| EditError::AttributeType {
                node: kind.name(),
                attr: name.clone(),
            })?;
            attrs.set(name, value);
        }
        attrs.normalize(kind)
    }

    pub fn to_json(&self) -> Map<String, Value> {
        self.0
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_json()))
            .collect()
    }
}

/// The five callout flavours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CalloutKind {
    #[default]
    Info,
    Warning,
    Error,
    Success,
    Note,
}

impl CalloutKind {
    pub const ALL: [CalloutKind; 5] = [
        Self::Info,
        Self::Warning,
        Self::Error,
        Self::Success,
        Self::Note,
    ];

    /// Wire names, in the order of [`CalloutKind::ALL`].
    pub const NAMES: [&'static str; 5] = ["info", "warning", "error", "success", "note"];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Success => "success",
            Self::Note => "note",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == s)
    }

    /// Title shown when the callout has none of its own.
    pub const fn default_title(self) -> &'static str {
        match self {
            Self::Info => "정보",
            Self::Warning => "경고",
            Self::Error => "오류",
            Self::Success => "성공",
            Self::Note => "메모",
        }
    }

    pub const fn icon(self) -> &'static str {
        match self {
            Self::Info => "ℹ️",
            Self::Warning => "⚠️",
            Self::Error => "❌",
            Self::Success => "✅",
            Self::Note => "📝",
        }
    }
}

impl fmt::Display for CalloutKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
