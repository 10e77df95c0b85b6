//! Command and key execution for editor documents.
//!
//! Everything here is generic over [`EditorDocument`]: a command or key runs
//! its transforms in one transaction and commits it through
//! [`EditorDocument::apply`], so every entry point is one undo step.

use tracing::{debug, warn};

use crate::actions::{EditorCommand, Key, KeyCombo, KeydownResult};
use crate::document::{EditorConfig, EditorDocument, ToggleStyle};
use crate::error::EditError;
use crate::schema::NodeKind;
use crate::transaction::Transaction;
use crate::transform::{Applied, blocks, indent, insert, lists, table, text_cursor, toggle};

/// Commit `tr` if `applied` says the transform did something.
fn commit<D: EditorDocument>(editor: &mut D, tr: Transaction, applied: Applied) -> bool {
    match applied {
        Ok(true) => editor.dispatch(tr),
        Ok(false) => false,
        Err(err) => {
            warn!(%err, "edit failed");
            false
        }
    }
}

/// Run a command. Returns true if the document or selection changed.
pub fn execute_command<D: EditorDocument>(editor: &mut D, command: &EditorCommand) -> bool {
    match command {
        EditorCommand::Undo => return editor.undo(),
        EditorCommand::Redo => return editor.redo(),
        _ => {}
    }
    let config = editor.config().clone();
    let mut tr = editor.transaction();
    let applied = apply_command(&mut tr, &config, command);
    debug!(?command, ok = matches!(applied, Ok(true)), "command executed");
    commit(editor, tr, applied)
}

/// The transforms behind `command`, run inside `tr`. History commands have
/// none and report `false`.
pub(crate) fn apply_command(
    tr: &mut Transaction,
    config: &EditorConfig,
    command: &EditorCommand,
) -> Applied {
    match command {
        EditorCommand::SetHeading(level) => blocks::set_heading(tr, *level),
        EditorCommand::SetParagraph => blocks::set_paragraph(tr),
        EditorCommand::ToggleBulletList => lists::toggle_list(tr, NodeKind::BulletList),
        EditorCommand::ToggleOrderedList => lists::toggle_list(tr, NodeKind::OrderedList),
        EditorCommand::ToggleTaskList => lists::toggle_list(tr, NodeKind::TaskList),
        EditorCommand::WrapInBlockquote => blocks::wrap_in_blockquote(tr),
        EditorCommand::InsertGridColumns(columns) => {
            insert::insert_grid_columns(tr, columns.unwrap_or(config.default_grid_columns))
        }
        EditorCommand::InsertCallout { kind, title } => {
            insert::insert_callout(tr, *kind, title.as_deref())
        }
        EditorCommand::InsertToggle { title } => {
            insert::insert_toggle(tr, config.toggle_style, title)
        }
        EditorCommand::InsertReadonlyText(text) => insert::insert_readonly_text(tr, text),
        EditorCommand::InsertImage { src, alt } => {
            insert::insert_image(tr, src, alt.as_deref())
        }
        EditorCommand::InsertTable {
            rows,
            cols,
            header_row,
        } => insert::insert_table(tr, *rows, *cols, *header_row),
        EditorCommand::ToggleOpen => toggle::toggle_open(tr),
        EditorCommand::Indent => indent::indent(tr, config.max_indent),
        EditorCommand::Outdent => indent::outdent(tr),
        EditorCommand::SetCalloutKind(kind) => insert::set_callout_kind(tr, *kind),
        EditorCommand::SetCalloutTitle(title) => insert::set_callout_title(tr, title),
        EditorCommand::SetToggleTitle { pos, title } => {
            toggle::set_toggle_title(tr, *pos, title)
        }
        EditorCommand::ResizeImage { pos, width, height } => {
            insert::resize_image(tr, *pos, *width, *height)
        }
        EditorCommand::ColorCells { pos, target, color } => {
            table::apply_cell_colors(tr, *pos, *target, &color.patch())
        }
        EditorCommand::SelectBlock => blocks::select_block(tr),
        EditorCommand::Undo | EditorCommand::Redo => Ok(false),
    }
}

/// Handle a key press in the document.
pub fn handle_keydown<D: EditorDocument>(editor: &mut D, combo: &KeyCombo) -> KeydownResult {
    let mods = combo.modifiers;
    if mods.is_primary() {
        let handled = match &combo.key {
            k if k.is_char("z") && mods.shift => editor.redo(),
            k if k.is_char("z") => editor.undo(),
            k if k.is_char("y") => editor.redo(),
            Key::Enter => run(editor, toggle::toggle_open),
            _ => return KeydownResult::NotHandled,
        };
        return KeydownResult::handled(handled);
    }
    if mods.alt {
        return KeydownResult::NotHandled;
    }

    let style = editor.config().toggle_style;
    let max_indent = editor.config().max_indent;
    match &combo.key {
        Key::Space if !mods.shift => KeydownResult::handled(insert_text(editor, " ")),
        Key::Enter if !mods.shift => KeydownResult::handled(run(editor, |tr| {
            if toggle::toggle_from_line(tr, style)? {
                return Ok(true);
            }
            blocks::split_block(tr)
        })),
        Key::Backspace => {
            run(editor, backspace);
            KeydownResult::Handled
        }
        Key::Tab if mods.shift => KeydownResult::handled(run(editor, indent::shift_tab)),
        Key::Tab => KeydownResult::handled(run(editor, |tr| indent::tab(tr, max_indent))),
        Key::ArrowDown if style == ToggleStyle::Notion => {
            KeydownResult::handled(run(editor, toggle::notion_title_down))
        }
        Key::ArrowUp => {
            if style == ToggleStyle::Notion && run(editor, toggle::notion_body_up) {
                return KeydownResult::Handled;
            }
            match toggle::title_focus_target(editor.doc(), editor.selection()) {
                Some(pos) => KeydownResult::FocusToggleTitle { pos },
                None => KeydownResult::NotHandled,
            }
        }
        Key::Escape => KeydownResult::handled(run(editor, blocks::select_block)),
        _ => KeydownResult::NotHandled,
    }
}

/// Run `f` in a fresh transaction and commit it if it applied.
fn run<D, F>(editor: &mut D, f: F) -> bool
where
    D: EditorDocument,
    F: FnOnce(&mut Transaction) -> Applied,
{
    let mut tr = editor.transaction();
    let applied = f(&mut tr);
    commit(editor, tr, applied)
}

/// The Backspace chain. At the start of a block the block is unwrapped or
/// demoted rather than merged into the previous one.
fn backspace(tr: &mut Transaction) -> Applied {
    if toggle::collapse_empty_toggle(tr)? {
        return Ok(true);
    }
    let at_start = text_cursor(tr)?.map(|rp| {
        let depth = rp.depth();
        let in_item = depth >= 2 && rp.node(depth - 1).kind().is_list_item();
        (rp.at_block_start(), in_item, rp.parent().kind())
    });
    let Some((true, in_item, kind)) = at_start else {
        return blocks::delete_backward(tr);
    };
    if in_item && lists::lift_list_item(tr)? {
        return Ok(true);
    }
    if indent::backspace_outdent(tr)? {
        return Ok(true);
    }
    if kind == NodeKind::Heading {
        return blocks::set_paragraph(tr);
    }
    if blocks::lift_from_blockquote(tr)? {
        return Ok(true);
    }
    // Nothing merges into the previous block.
    Ok(false)
}

/// Block shortcuts typed at the start of a textblock, completed by a space.
const SHORTCUTS: [(&str, Shortcut); 8] = [
    ("-", Shortcut::List(NodeKind::BulletList)),
    ("*", Shortcut::List(NodeKind::BulletList)),
    ("1.", Shortcut::List(NodeKind::OrderedList)),
    ("[]", Shortcut::List(NodeKind::TaskList)),
    ("|", Shortcut::Blockquote),
    ("#", Shortcut::Heading(1)),
    ("##", Shortcut::Heading(2)),
    ("###", Shortcut::Heading(3)),
];

#[derive(Debug, Clone, Copy)]
enum Shortcut {
    List(NodeKind),
    Blockquote,
    Heading(u8),
}

fn apply_shortcut(tr: &mut Transaction) -> Applied {
    let found = {
        let Some(rp) = text_cursor(tr)? else {
            return Ok(false);
        };
        let typed = rp.parent().text_between(0, rp.parent_offset());
        let Some(trigger) = typed.strip_suffix(' ') else {
            return Ok(false);
        };
        SHORTCUTS
            .iter()
            .find(|(t, _)| *t == trigger)
            .map(|&(_, shortcut)| (rp.start(rp.depth()), rp.pos(), shortcut))
    };
    let Some((start, end, shortcut)) = found else {
        return Ok(false);
    };
    tr.delete(start, end)?;
    debug!(?shortcut, "block shortcut");
    match shortcut {
        Shortcut::List(kind) => lists::toggle_list(tr, kind),
        Shortcut::Blockquote => blocks::wrap_in_blockquote(tr),
        Shortcut::Heading(level) => blocks::set_heading(tr, level),
    }
}

/// Type `text` at the selection and run the input rules on the result.
pub fn insert_text<D: EditorDocument>(editor: &mut D, text: &str) -> bool {
    let style = editor.config().toggle_style;
    run(editor, |tr| {
        let selection = tr.selection();
        if !selection.is_collapsed() {
            match tr.delete(selection.from(), selection.to()) {
                Ok(_) => {}
                Err(EditError::InvalidRange { .. }) => return Ok(false),
                Err(err) => return Err(err),
            }
        }
        let Some(head) = text_cursor(tr)?.map(|rp| rp.pos()) else {
            return Ok(false);
        };
        tr.insert_text(head, text)?;
        tr.set_cursor(head + text.chars().count());
        if text.ends_with(' ') {
            if apply_shortcut(tr)? {
                return Ok(true);
            }
            toggle::toggle_from_marker(tr, style)?;
        }
        Ok(true)
    })
}

/// Paste plain text. Tab-separated text becomes a table; anything else is
/// left to the platform.
pub fn paste_text<D: EditorDocument>(editor: &mut D, text: &str) -> bool {
    run(editor, |tr| table::paste_table(tr, text))
}

/// Handle a key pressed inside the title input of the titled toggle at
/// `toggle_pos`. `caret` and `title_len` are measured in characters of the
/// title.
pub fn handle_title_key<D: EditorDocument>(
    editor: &mut D,
    toggle_pos: usize,
    key: &Key,
    caret: usize,
    title_len: usize,
) -> KeydownResult {
    let forward = match key {
        Key::Enter | Key::ArrowDown => true,
        Key::ArrowRight if caret >= title_len => true,
        Key::ArrowUp => false,
        Key::ArrowLeft if caret == 0 => false,
        _ => return KeydownResult::NotHandled,
    };
    match toggle::title_exit(editor.doc(), toggle_pos, forward) {
        Some(pos) => {
            editor.move_cursor(pos);
            KeydownResult::Handled
        }
        None => KeydownResult::NotHandled,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::Modifiers;
    use crate::attrs::{Attrs, CalloutKind};
    use crate::document::PlainEditor;
    use crate::node::Node;
    use crate::types::Selection;
    use pretty_assertions::assert_eq;

    fn doc(blocks: Vec<Node>) -> Node {
        Node::with_defaults(NodeKind::Doc, blocks).unwrap()
    }

    fn node(kind: NodeKind, content: Vec<Node>) -> Node {
        Node::with_defaults(kind, content).unwrap()
    }

    fn p(text: &str) -> Node {
        Node::paragraph(text)
    }

    fn editor(blocks: Vec<Node>, pos: usize) -> PlainEditor {
        PlainEditor::new(doc(blocks)).with_selection(Selection::collapsed(pos))
    }

    fn type_str(ed: &mut PlainEditor, text: &str) {
        for c in text.chars() {
            assert!(insert_text(ed, &c.to_string()));
        }
    }

    fn key(ed: &mut PlainEditor, key: Key) -> KeydownResult {
        handle_keydown(ed, &KeyCombo::new(key))
    }

    #[test]
    fn typing_shortcuts_change_block_type() {
        let mut ed = editor(vec![p("")], 1);
        type_str(&mut ed, "## Title");
        let h = ed.doc().child(0).unwrap();
        assert_eq!(h.kind(), NodeKind::Heading);
        assert_eq!(h.attrs().get_int("level"), Some(2));
        assert_eq!(h.text_content(), "Title");

        let mut ed = editor(vec![p("")], 1);
        type_str(&mut ed, "- a");
        assert_eq!(
            ed.doc(),
            &doc(vec![node(NodeKind::BulletList, vec![node(NodeKind::ListItem, vec![p("a")])])])
        );
        assert_eq!(ed.selection(), Selection::collapsed(4));
    }

    #[test]
    fn shortcut_only_fires_at_block_start() {
        let mut ed = editor(vec![p("x")], 2);
        type_str(&mut ed, " # ");
        assert_eq!(ed.doc(), &doc(vec![p("x # ")]));
    }

    #[test]
    fn typed_marker_makes_titled_toggle() {
        let mut ed = editor(vec![p("")], 1);
        type_str(&mut ed, "Q> ");
        let t = ed.doc().child(0).unwrap();
        assert_eq!(t.kind(), NodeKind::Toggle);
        assert_eq!(t.attrs().get_str("title"), Some("Q"));
        assert_eq!(ed.selection(), Selection::collapsed(2));
        // One undo step per keystroke.
        assert!(ed.undo());
        assert_eq!(ed.doc(), &doc(vec![p("Q>")]));
    }

    #[test]
    fn enter_splits_and_undoes_as_one_step() {
        let mut ed = editor(vec![p("ab")], 2);
        assert_eq!(key(&mut ed, Key::Enter), KeydownResult::Handled);
        assert_eq!(ed.doc(), &doc(vec![p("a"), p("b")]));
        assert!(ed.undo());
        assert_eq!(ed.doc(), &doc(vec![p("ab")]));
    }

    #[test]
    fn backspace_at_paragraph_start_does_not_merge() {
        let mut ed = editor(vec![p("a"), p("b")], 4);
        assert_eq!(key(&mut ed, Key::Backspace), KeydownResult::Handled);
        assert_eq!(ed.doc(), &doc(vec![p("a"), p("b")]));
        let mut ed = editor(vec![p("a"), p("b")], 5);
        assert_eq!(key(&mut ed, Key::Backspace), KeydownResult::Handled);
        assert_eq!(ed.doc(), &doc(vec![p("a"), p("")]));
    }

    #[test]
    fn backspace_demotes_heading() {
        let h = Node::new(NodeKind::Heading, Attrs::new().with("level", 2_i64), vec![Node::text("h")])
            .unwrap();
        let mut ed = editor(vec![h], 1);
        assert_eq!(key(&mut ed, Key::Backspace), KeydownResult::Handled);
        assert_eq!(ed.doc(), &doc(vec![p("h")]));
    }

    #[test]
    fn backspace_lifts_list_item() {
        let list = node(NodeKind::BulletList, vec![node(NodeKind::ListItem, vec![p("a")])]);
        let mut ed = editor(vec![list], 3);
        assert_eq!(key(&mut ed, Key::Backspace), KeydownResult::Handled);
        assert_eq!(ed.doc(), &doc(vec![p("a")]));
    }

    #[test]
    fn mod_enter_toggles_open() {
        let t = Node::new(NodeKind::Toggle, Attrs::new().with("title", "T"), vec![p("x")]).unwrap();
        let mut ed = editor(vec![t], 2);
        let combo = KeyCombo::with_modifiers(Key::Enter, Modifiers::META);
        assert_eq!(handle_keydown(&mut ed, &combo), KeydownResult::Handled);
        assert_eq!(ed.doc().child(0).unwrap().attrs().get_bool("isOpen"), Some(false));
        assert_eq!(handle_keydown(&mut ed, &KeyCombo::ctrl(Key::character("z"))), KeydownResult::Handled);
        assert_eq!(ed.doc().child(0).unwrap().attrs().get_bool("isOpen"), Some(true));
        assert_eq!(
            handle_keydown(&mut ed, &KeyCombo::ctrl_shift(Key::character("Z"))),
            KeydownResult::Handled
        );
        assert_eq!(ed.doc().child(0).unwrap().attrs().get_bool("isOpen"), Some(false));
    }

    #[test]
    fn arrow_up_hands_focus_to_toggle_title() {
        let t = Node::new(NodeKind::Toggle, Attrs::new().with("title", "T"), vec![p("x")]).unwrap();
        let mut ed = editor(vec![p("a"), t], 5);
        assert_eq!(key(&mut ed, Key::ArrowUp), KeydownResult::FocusToggleTitle { pos: 3 });
        // Leaving the title forward lands in the content, backward before it.
        assert_eq!(handle_title_key(&mut ed, 3, &Key::Enter, 0, 1), KeydownResult::Handled);
        assert_eq!(ed.selection(), Selection::collapsed(5));
        assert_eq!(handle_title_key(&mut ed, 3, &Key::ArrowLeft, 0, 1), KeydownResult::Handled);
        assert_eq!(ed.selection(), Selection::collapsed(2));
        assert_eq!(
            handle_title_key(&mut ed, 3, &Key::ArrowRight, 0, 1),
            KeydownResult::NotHandled
        );
    }

    #[test]
    fn commands_commit_once() {
        let mut ed = editor(vec![p("")], 1);
        assert!(execute_command(
            &mut ed,
            &EditorCommand::InsertCallout {
                kind: CalloutKind::Note,
                title: None
            }
        ));
        assert!(execute_command(&mut ed, &EditorCommand::SetCalloutKind(CalloutKind::Warning)));
        assert!(!execute_command(&mut ed, &EditorCommand::ToggleOpen));
        assert!(!execute_command(&mut ed, &EditorCommand::InsertGridColumns(Some(0))));
        assert!(execute_command(&mut ed, &EditorCommand::Undo));
        assert_eq!(ed.doc().child(0).unwrap().attrs().get_str("type"), Some("note"));
    }

    #[test]
    fn grid_uses_configured_default() {
        let mut ed = editor(vec![p("")], 1);
        assert!(execute_command(&mut ed, &EditorCommand::InsertGridColumns(None)));
        assert_eq!(ed.doc().child(0).unwrap().child_count(), 2);
    }

    #[test]
    fn paste_needs_tabs() {
        let mut ed = editor(vec![p("")], 1);
        assert!(!paste_text(&mut ed, "just text"));
        assert!(paste_text(&mut ed, "a\tb"));
        assert_eq!(ed.doc().child(0).unwrap().kind(), NodeKind::Table);
    }
}
