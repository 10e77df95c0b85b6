//! quire-editor-core: the block schema and structural editing engine of the
//! quire editor, with no UI or framework dependencies.
//!
//! This crate provides:
//! - `Node`, `Schema` and `ContentExpr`: the document tree and the content
//!   model every node is checked against
//! - `Transaction` and `ResolvedPos`: position-addressed atomic edits
//! - `transform`: the structural transforms (toggles, lists, indent, grids,
//!   callouts, tables)
//! - `EditorDocument`: editor state with cursor placement and undo
//! - `execute`, `slash`, `placeholder`: the command and keyboard surface

pub mod actions;
pub mod attrs;
pub mod content_expr;
pub mod document;
pub mod error;
pub mod execute;
pub mod html;
pub mod node;
pub mod placeholder;
pub mod placement;
pub mod position;
pub mod schema;
pub mod slash;
pub mod style;
pub mod transaction;
pub mod transform;
pub mod types;
pub mod undo;

pub use actions::{EditorCommand, Key, KeyCombo, KeydownResult, Modifiers};
pub use attrs::{AttrValue, Attrs, CalloutKind};
pub use document::{EditorConfig, EditorDocument, PlainEditor, ToggleStyle};
pub use error::{EditError, SchemaError};
pub use execute::{execute_command, handle_keydown, handle_title_key, insert_text, paste_text};
pub use html::{ElementAttrs, to_html};
pub use node::{Mark, Node};
pub use placeholder::PlaceholderId;
pub use position::ResolvedPos;
pub use schema::{NodeKind, Schema, schema};
pub use slash::{SlashItem, filter_items, run_slash_item, slash_items};
pub use smol_str::SmolStr;
pub use style::{Background, StyleMap, StylePatch};
pub use transaction::{Step, Transaction};
pub use transform::Applied;
pub use transform::table::{ColorTarget, PALETTE, TableColor};
pub use types::{Affinity, Selection};
pub use undo::{History, Snapshot};
