//! Editor commands and keyboard input types.
//!
//! `EditorCommand` is what buttons and the slash menu invoke; `Key`,
//! `Modifiers` and `KeyCombo` describe keyboard input independently of the
//! platform it came from.

use smol_str::SmolStr;

use crate::attrs::CalloutKind;
use crate::transform::table::{ColorTarget, TableColor};

/// Named structural commands. Each one runs as a single commit.
#[derive(Debug, Clone, PartialEq)]
pub enum EditorCommand {
    // === Block types ===
    SetHeading(u8),
    SetParagraph,
    ToggleBulletList,
    ToggleOrderedList,
    ToggleTaskList,
    WrapInBlockquote,

    // === Insertion ===
    /// `None` uses the configured default column count.
    InsertGridColumns(Option<usize>),
    InsertCallout {
        kind: CalloutKind,
        title: Option<String>,
    },
    /// Toggle in the configured style.
    InsertToggle {
        title: String,
    },
    InsertReadonlyText(String),
    InsertImage {
        src: String,
        alt: Option<String>,
    },
    InsertTable {
        rows: usize,
        cols: usize,
        header_row: bool,
    },

    // === Block edits ===
    ToggleOpen,
    Indent,
    Outdent,
    SetCalloutKind(CalloutKind),
    SetCalloutTitle(String),
    SetToggleTitle {
        pos: usize,
        title: String,
    },
    ResizeImage {
        pos: usize,
        width: Option<u32>,
        height: Option<u32>,
    },
    ColorCells {
        pos: usize,
        target: ColorTarget,
        color: TableColor,
    },

    // === Selection and history ===
    SelectBlock,
    Undo,
    Redo,
}

/// The keys the editor binds. Platform code maps native key events onto
/// this; anything else should go to the platform's default handling.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    /// A character key.
    Character(SmolStr),

    // === Whitespace / editing ===
    Backspace,
    Enter,
    Tab,
    Escape,
    Space,

    // === Navigation ===
    ArrowLeft,
    ArrowRight,
    ArrowUp,
    ArrowDown,
}

impl Key {
    pub fn character(s: impl Into<SmolStr>) -> Self {
        Self::Character(s.into())
    }

    /// True for the character key `c`, ignoring case.
    pub fn is_char(&self, c: &str) -> bool {
        matches!(self, Self::Character(s) if s.eq_ignore_ascii_case(c))
    }
}

/// Modifier key state for a key combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Self = Self {
        ctrl: false,
        alt: false,
        shift: false,
        meta: false,
    };

    pub const CTRL: Self = Self {
        ctrl: true,
        alt: false,
        shift: false,
        meta: false,
    };

    pub const META: Self = Self {
        ctrl: false,
        alt: false,
        shift: false,
        meta: true,
    };

    pub const CTRL_SHIFT: Self = Self {
        ctrl: true,
        alt: false,
        shift: true,
        meta: false,
    };

    /// Cmd on Mac, Ctrl elsewhere: either counts as the primary modifier.
    pub fn is_primary(&self) -> bool {
        self.ctrl || self.meta
    }
}

/// A key combination.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyCombo {
    pub key: Key,
    pub modifiers: Modifiers,
}

impl KeyCombo {
    pub fn new(key: Key) -> Self {
        Self {
            key,
            modifiers: Modifiers::NONE,
        }
    }

    pub fn with_modifiers(key: Key, modifiers: Modifiers) -> Self {
        Self { key, modifiers }
    }

    pub fn ctrl(key: Key) -> Self {
        Self::with_modifiers(key, Modifiers::CTRL)
    }

    pub fn ctrl_shift(key: Key) -> Self {
        Self::with_modifiers(key, Modifiers::CTRL_SHIFT)
    }
}

/// Result of handling a keydown event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeydownResult {
    /// Event was handled, prevent default.
    Handled,
    /// Not a binding here; let the platform handle it.
    NotHandled,
    /// Focus should move into the title input of the toggle at `pos`.
    FocusToggleTitle { pos: usize },
}

impl KeydownResult {
    pub fn handled(applied: bool) -> Self {
        if applied {
            Self::Handled
        } else {
            Self::NotHandled
        }
    }
}
