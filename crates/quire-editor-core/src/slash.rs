//! The `/` command menu: its items, filtering, and running a chosen item in
//! place of the typed query.

use tracing::debug;

use crate::actions::EditorCommand;
use crate::attrs::CalloutKind;
use crate::document::EditorDocument;
use crate::execute::apply_command;
use crate::node::Node;
use crate::position::ResolvedPos;
use crate::types::Selection;

#[derive(Debug, Clone, PartialEq)]
pub struct SlashItem {
    pub title: &'static str,
    /// Extra words the filter matches.
    pub aliases: &'static [&'static str],
    pub command: EditorCommand,
}

impl SlashItem {
    fn new(title: &'static str, aliases: &'static [&'static str], command: EditorCommand) -> Self {
        Self {
            title,
            aliases,
            command,
        }
    }

    pub fn matches(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        query.is_empty()
            || self.title.to_lowercase().contains(&query)
            || self.aliases.iter().any(|a| a.contains(query.as_str()))
    }
}

/// Every menu entry, in display order.
pub fn slash_items() -> Vec<SlashItem> {
    vec![
        SlashItem::new("Heading 1", &["h1", "title"], EditorCommand::SetHeading(1)),
        SlashItem::new("Paragraph", &["text", "p"], EditorCommand::SetParagraph),
        SlashItem::new("Todo", &["task", "checkbox"], EditorCommand::ToggleTaskList),
        SlashItem::new(
            "2열 레이아웃",
            &["grid", "columns", "2"],
            EditorCommand::InsertGridColumns(Some(2)),
        ),
        SlashItem::new(
            "3열 레이아웃",
            &["grid", "columns", "3"],
            EditorCommand::InsertGridColumns(Some(3)),
        ),
        SlashItem::new(
            "💡 Callout",
            &["info", "callout"],
            EditorCommand::InsertCallout {
                kind: CalloutKind::Info,
                title: None,
            },
        ),
        SlashItem::new(
            "⚠️ 경고 Callout",
            &["warning", "callout"],
            EditorCommand::InsertCallout {
                kind: CalloutKind::Warning,
                title: None,
            },
        ),
        SlashItem::new(
            "Toggle",
            &["collapse", "details"],
            EditorCommand::InsertToggle {
                title: String::new(),
            },
        ),
    ]
}

pub fn filter_items(query: &str) -> Vec<SlashItem> {
    slash_items()
        .into_iter()
        .filter(|item| item.matches(query))
        .collect()
}

/// An open `/query` at the start of the cursor's textblock: the position of
/// the slash and the query typed after it.
pub fn slash_query(doc: &Node, selection: Selection) -> Option<(usize, String)> {
    if !selection.is_collapsed() {
        return None;
    }
    let rp = ResolvedPos::resolve(doc, selection.head).ok()?;
    if !rp.parent().is_textblock() {
        return None;
    }
    let typed = rp.parent().text_between(0, rp.parent_offset());
    let query = typed.strip_prefix('/')?;
    if query.chars().any(char::is_whitespace) {
        return None;
    }
    Some((rp.start(rp.depth()), query.to_owned()))
}

/// Remove the typed `/query` and run `item` in the same commit.
pub fn run_slash_item<D: EditorDocument>(editor: &mut D, item: &SlashItem) -> bool {
    let Some((from, _)) = slash_query(editor.doc(), editor.selection()) else {
        return false;
    };
    let config = editor.config().clone();
    let mut tr = editor.transaction();
    let to = tr.selection().head;
    if let Err(err) = tr.delete(from, to) {
        debug!(%err, "could not remove slash query");
        return false;
    }
    match apply_command(&mut tr, &config, &item.command) {
        // The query is gone even when the command finds nothing to do.
        Ok(_) => editor.dispatch(tr),
        Err(err) => {
            debug!(%err, title = item.title, "slash command failed");
            false
        }
    }
}
