//! Error types for document construction and editing.

use miette::Diagnostic;
use thiserror::Error;

/// Errors raised while building or mutating the document tree.
///
/// Transforms that merely fail to find the context they need report `false`
/// (or `Ok(None)`) rather than `StructuralContextNotFound`; the variant exists
/// for the lower-level helpers that require a context to be present.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum EditError {
    #[error("{node} content does not match `{expected}` (found [{found}])")]
    #[diagnostic(code(editor::content_model))]
    ContentModelViolation {
        node: &'static str,
        expected: String,
        found: String,
    },

    #[error("no enclosing {required} at the selection")]
    #[diagnostic(code(editor::context_not_found))]
    StructuralContextNotFound { required: &'static str },

    #[error("position {pos} is outside the document (content size {size})")]
    #[diagnostic(code(editor::invalid_position))]
    InvalidPosition { pos: usize, size: usize },

    #[error("range {from}..{to} does not lie within a single parent")]
    #[diagnostic(code(editor::invalid_range))]
    InvalidRange { from: usize, to: usize },

    #[error("unknown node type `{0}`")]
    #[diagnostic(code(editor::unknown_node_type))]
    UnknownNodeType(String),

    #[error("attribute `{attr}` on {node} has the wrong type")]
    #[diagnostic(code(editor::attribute_type))]
    AttributeType { node: &'static str, attr: String },

    #[error("{0}")]
    #[diagnostic(code(editor::invalid_argument))]
    InvalidArgument(String),
}

/// Schema registry configuration errors. These are startup failures.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum SchemaError {
    #[error("node type `{0}` registered twice")]
    #[diagnostic(code(schema::duplicate_type))]
    DuplicateType(&'static str),

    #[error("node type `{0}` was never registered")]
    #[diagnostic(code(schema::missing_type))]
    MissingType(&'static str),

    #[error("invalid content expression `{expr}` for {node}: {reason}")]
    #[diagnostic(code(schema::content_expression))]
    InvalidContentExpression {
        node: &'static str,
        expr: String,
        reason: String,
    },
}
