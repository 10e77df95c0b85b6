//! Toggle blocks: creation from typed markers, open/close, collapse, and
//! cursor movement between a toggle's title and its content.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use super::{Applied, Replacement, split_list, text_cursor};
use crate::attrs::Attrs;
use crate::document::ToggleStyle;
use crate::error::EditError;
use crate::node::Node;
use crate::position::{ResolvedPos, first_text_pos, last_text_pos, text_position_before};
use crate::schema::NodeKind;
use crate::transaction::Transaction;
use crate::types::Selection;

/// `>` plus one whitespace character just before the cursor.
static TYPED_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r">\s$").expect("typed marker pattern is valid"));

/// The marker alone at the start of the block.
static LEADING_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^>\s$").expect("leading marker pattern is valid"));

/// A whole line of the form `> title`.
static MARKER_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^>\s+(.*)$").expect("marker line pattern is valid"));

static BULLET_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-*+]?\s*").expect("bullet prefix pattern is valid"));

static NUMBER_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\.\s*").expect("number prefix pattern is valid"));

fn strip_list_markers(title: &str) -> String {
    let title = BULLET_PREFIX.replace(title.trim(), "");
    NUMBER_PREFIX.replace(&title, "").trim().to_owned()
}

/// Titled toggle whose first content paragraph holds `first`.
fn titled(title: &str, first: Vec<Node>, rest: Vec<Node>) -> Result<(Node, usize), EditError> {
    let mut content = vec![Node::with_defaults(NodeKind::Paragraph, first)?];
    content.extend(rest);
    let toggle = Node::new(NodeKind::Toggle, Attrs::new().with("title", title), content)?;
    Ok((toggle, 2))
}

/// Notion toggle with `title` as its first paragraph and an empty body
/// paragraph. The cursor goes to the body when there is a title.
fn notion(title: Vec<Node>, rest: Vec<Node>) -> Result<(Node, usize), EditError> {
    let title = Node::with_defaults(NodeKind::Paragraph, title)?;
    let cursor = if title.is_content_empty() {
        2
    } else {
        1 + title.node_size() + 1
    };
    let mut content = vec![title, Node::empty_paragraph()];
    content.extend(rest);
    Ok((Node::with_defaults(NodeKind::NotionToggle, content)?, cursor))
}

/// Replace the cursor's block with the toggle `build` returns. When the block
/// opens a list item the whole item is replaced and the list is split around
/// it; the item's remaining children are handed to `build` so they end up
/// inside the toggle.
fn replace_block_with(
    rp: &ResolvedPos<'_>,
    build: impl FnOnce(Vec<Node>) -> Result<(Node, usize), EditError>,
) -> Result<Replacement, EditError> {
    let depth = rp.depth();
    let in_item =
        depth >= 3 && rp.node(depth - 1).kind().is_list_item() && rp.index(depth - 1) == 0;
    if in_item {
        let item = rp.node(depth - 1);
        let list_depth = depth - 2;
        let (toggle, cursor) = build(item.content()[1..].to_vec())?;
        let (nodes, offset) = split_list(rp.node(list_depth), rp.index(list_depth), vec![toggle])?;
        let from = rp.before(list_depth);
        Ok(Replacement {
            from,
            to: rp.after(list_depth),
            nodes,
            cursor: from + offset + cursor,
        })
    } else {
        let (toggle, cursor) = build(Vec::new())?;
        let from = rp.before(depth);
        Ok(Replacement {
            from,
            to: rp.after(depth),
            nodes: vec![toggle],
            cursor: from + cursor,
        })
    }
}

/// Input rule run after text is typed: `>` and a space turn the block into a
/// toggle.
///
/// Titled toggles take the text before the marker (minus any list marker) as
/// the title, and the text after the cursor becomes the first content
/// paragraph. Notion toggles only fire when the marker opens the block; the
/// rest of the block becomes the title paragraph.
pub fn toggle_from_marker(tr: &mut Transaction, style: ToggleStyle) -> Applied {
    let plan = {
        let Some(rp) = text_cursor(tr)? else {
            return Ok(false);
        };
        let block = rp.parent();
        let offset = rp.parent_offset();
        let before = block.text_between(0, offset);
        let rest = block.slice_content(offset, block.content_size())?;
        match style {
            ToggleStyle::Titled if TYPED_MARKER.is_match(&before) => {
                let trimmed = before.trim_end();
                let title = strip_list_markers(trimmed.strip_suffix('>').unwrap_or(trimmed));
                replace_block_with(&rp, |tail| titled(&title, rest, tail))?
            }
            ToggleStyle::Notion if LEADING_MARKER.is_match(&before) => {
                replace_block_with(&rp, |tail| notion(rest, tail))?
            }
            _ => return Ok(false),
        }
    };
    debug!(?style, pos = plan.from, "toggle created from typed marker");
    plan.apply(tr)
}

/// Enter on a `> title` line turns it into a toggle with an empty body.
pub fn toggle_from_line(tr: &mut Transaction, style: ToggleStyle) -> Applied {
    let plan = {
        let Some(rp) = text_cursor(tr)? else {
            return Ok(false);
        };
        let block = rp.parent();
        let text = block.text_content();
        let Some(captured) = MARKER_LINE.captures(&text).and_then(|c| c.get(1)) else {
            return Ok(false);
        };
        match style {
            ToggleStyle::Titled => {
                let title = captured.as_str().trim().to_owned();
                replace_block_with(&rp, |tail| titled(&title, Vec::new(), tail))?
            }
            ToggleStyle::Notion => {
                let marker = text[..captured.start()].chars().count();
                let title = block.slice_content(marker, block.content_size())?;
                replace_block_with(&rp, |tail| notion(title, tail))?
            }
        }
    };
    debug!(?style, pos = plan.from, "toggle created from marker line");
    plan.apply(tr)
}

/// Flip `isOpen` on the innermost toggle around the selection.
pub fn toggle_open(tr: &mut Transaction) -> Applied {
    let found = {
        let rp = ResolvedPos::resolve(tr.doc(), tr.selection().from())?;
        rp.find_ancestor(|n| n.kind().is_toggle())
            .filter(|&d| d > 0)
            .map(|d| (rp.before(d), rp.node(d).attrs().get_bool("isOpen").unwrap_or(true)))
    };
    let Some((pos, open)) = found else {
        debug!("no toggle around the selection");
        return Ok(false);
    };
    tr.set_node_attr(pos, "isOpen", !open)?;
    Ok(true)
}

/// Backspace at the start of a toggle's empty first child replaces the toggle
/// with a paragraph (carrying a titled toggle's title) followed by the
/// toggle's other children.
pub fn collapse_empty_toggle(tr: &mut Transaction) -> Applied {
    let plan = {
        let Some(rp) = text_cursor(tr)? else {
            return Ok(false);
        };
        let depth = rp.depth();
        if depth < 2 || !rp.parent().is_content_empty() || rp.index(depth - 1) != 0 {
            return Ok(false);
        }
        let toggle = rp.node(depth - 1);
        if !toggle.kind().is_toggle() {
            return Ok(false);
        }
        let title = match toggle.kind() {
            NodeKind::Toggle => toggle.attrs().get_str("title").unwrap_or_default(),
            _ => "",
        };
        let mut nodes = vec![Node::paragraph(title)];
        nodes.extend(toggle.content()[1..].iter().cloned());
        let from = rp.before(depth - 1);
        Replacement {
            from,
            to: rp.after(depth - 1),
            nodes,
            cursor: from + 1,
        }
    };
    debug!(pos = plan.from, "collapsing empty toggle");
    plan.apply(tr)
}

/// ArrowDown at the end of a notion toggle's title moves into its body.
pub fn notion_title_down(tr: &mut Transaction) -> Applied {
    let target = {
        let Some(rp) = text_cursor(tr)? else {
            return Ok(false);
        };
        let depth = rp.depth();
        if depth < 2 || !rp.at_block_end() || rp.index(depth - 1) != 0 {
            return Ok(false);
        }
        let toggle = rp.node(depth - 1);
        if toggle.kind() != NodeKind::NotionToggle {
            return Ok(false);
        }
        let (Some(title), Some(body)) = (toggle.child(0), toggle.child(1)) else {
            return Ok(false);
        };
        first_text_pos(body, rp.start(depth - 1) + title.node_size())
    };
    let Some(pos) = target else {
        return Ok(false);
    };
    tr.set_cursor(pos);
    Ok(true)
}

/// ArrowUp at the start of a notion toggle's second child returns to the end
/// of the title.
pub fn notion_body_up(tr: &mut Transaction) -> Applied {
    let target = {
        let Some(rp) = text_cursor(tr)? else {
            return Ok(false);
        };
        let depth = rp.depth();
        if depth < 2 || !rp.at_block_start() || rp.index(depth - 1) != 1 {
            return Ok(false);
        }
        let toggle = rp.node(depth - 1);
        if toggle.kind() != NodeKind::NotionToggle {
            return Ok(false);
        }
        toggle
            .child(0)
            .and_then(|title| last_text_pos(title, rp.start(depth - 1)))
    };
    let Some(pos) = target else {
        return Ok(false);
    };
    tr.set_cursor(pos);
    Ok(true)
}

/// Position of the titled toggle whose title should take focus when the
/// cursor leaves the start of its first content block upward.
pub fn title_focus_target(doc: &Node, selection: Selection) -> Option<usize> {
    if !selection.is_collapsed() {
        return None;
    }
    let rp = ResolvedPos::resolve(doc, selection.head).ok()?;
    let depth = rp.depth();
    let inside_first = depth >= 2 && rp.at_block_start() && rp.index(depth - 1) == 0;
    (inside_first && rp.node(depth - 1).kind() == NodeKind::Toggle).then(|| rp.before(depth - 1))
}

/// Where the cursor goes when it leaves the title input of the toggle at
/// `toggle_pos`: into its first content block going forward, or to the
/// last text position before the toggle going back.
pub fn title_exit(doc: &Node, toggle_pos: usize, forward: bool) -> Option<usize> {
    if forward {
        let rp = ResolvedPos::resolve(doc, toggle_pos).ok()?;
        let toggle = rp.node_after().filter(|n| n.kind() == NodeKind::Toggle)?;
        first_text_pos(toggle, toggle_pos)
    } else {
        toggle_pos
            .checked_sub(1)
            .and_then(|pos| text_position_before(doc, pos))
    }
}

/// Replace the title of the titled toggle at `pos`.
pub fn set_toggle_title(tr: &mut Transaction, pos: usize, title: &str) -> Applied {
    let is_toggle = tr
        .node_at(pos)
        .is_ok_and(|n| n.kind() == NodeKind::Toggle);
    if !is_toggle {
        return Ok(false);
    }
    tr.set_node_attr(pos, "title", title)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::test_support::*;
    use pretty_assertions::assert_eq;

    fn toggle(title: &str, content: Vec<Node>) -> Node {
        with_attrs(NodeKind::Toggle, Attrs::new().with("title", title), content)
    }

    fn at(doc: &Node, pos: usize) -> Transaction {
        Transaction::new(doc, Selection::collapsed(pos))
    }

    #[test]
    fn strips_list_markers_from_titles() {
        assert_eq!(strip_list_markers(" - Notes "), "Notes");
        assert_eq!(strip_list_markers("12. Plan"), "Plan");
        assert_eq!(strip_list_markers("Plain"), "Plain");
    }

    #[test]
    fn typed_marker_uses_preceding_text_as_title() {
        // "Notes > " with the cursor at the end, "tail" after it.
        let d = doc(vec![p("Notes > tail")]);
        let mut tr = at(&d, 9);
        assert!(toggle_from_marker(&mut tr, ToggleStyle::Titled).unwrap());
        assert_eq!(tr.doc(), &doc(vec![toggle("Notes", vec![p("tail")])]));
        assert_eq!(tr.selection(), Selection::collapsed(2));
    }

    #[test]
    fn typed_marker_in_list_item_replaces_the_item() {
        let d = doc(vec![list(NodeKind::BulletList, &["a", "> ", "c"])]);
        // Second item's paragraph content ends at 10.
        let mut tr = at(&d, 10);
        assert!(toggle_from_marker(&mut tr, ToggleStyle::Titled).unwrap());
        assert_eq!(
            tr.doc(),
            &doc(vec![
                list(NodeKind::BulletList, &["a"]),
                toggle("", vec![p("")]),
                list(NodeKind::BulletList, &["c"]),
            ])
        );
        // ul(li(p(a))) is 7 wide; the toggle's paragraph opens at 8.
        assert_eq!(tr.selection(), Selection::collapsed(9));
    }

    #[test]
    fn notion_marker_must_open_the_block() {
        let d = doc(vec![p("x> ")]);
        let mut tr = at(&d, 4);
        assert!(!toggle_from_marker(&mut tr, ToggleStyle::Notion).unwrap());
        assert!(!tr.doc_changed());

        let d = doc(vec![p("> Title")]);
        let mut tr = at(&d, 3);
        assert!(toggle_from_marker(&mut tr, ToggleStyle::Notion).unwrap());
        let expected = node(NodeKind::NotionToggle, vec![p("Title"), p("")]);
        assert_eq!(tr.doc(), &doc(vec![expected]));
        // toggle(1) + title(7) + body open(1)
        assert_eq!(tr.selection(), Selection::collapsed(9));
    }

    #[test]
    fn marker_line_on_enter() {
        let d = doc(vec![p("> Notes")]);
        let mut tr = at(&d, 8);
        assert!(toggle_from_line(&mut tr, ToggleStyle::Titled).unwrap());
        assert_eq!(tr.doc(), &doc(vec![toggle("Notes", vec![p("")])]));
        assert_eq!(tr.selection(), Selection::collapsed(2));
    }

    #[test]
    fn open_flag_flips_on_innermost_toggle() {
        let inner = toggle("in", vec![p("x")]);
        let d = doc(vec![toggle("out", vec![inner])]);
        let mut tr = at(&d, 3);
        assert!(toggle_open(&mut tr).unwrap());
        let outer = tr.doc().child(0).unwrap();
        assert_eq!(outer.attrs().get_bool("isOpen"), Some(true));
        assert_eq!(outer.child(0).unwrap().attrs().get_bool("isOpen"), Some(false));

        let d = doc(vec![p("none")]);
        let mut tr = at(&d, 2);
        assert!(!toggle_open(&mut tr).unwrap());
    }

    #[test]
    fn collapse_only_when_first_child_is_empty() {
        let d = doc(vec![p("before"), toggle("", vec![p("")])]);
        let mut tr = at(&d, 10);
        assert!(collapse_empty_toggle(&mut tr).unwrap());
        assert_eq!(tr.doc(), &doc(vec![p("before"), p("")]));
        assert_eq!(tr.selection(), Selection::collapsed(9));

        let d = doc(vec![toggle("", vec![p("text")])]);
        let mut tr = at(&d, 2);
        assert!(!collapse_empty_toggle(&mut tr).unwrap());
        assert!(!tr.doc_changed());
    }

    #[test]
    fn notion_arrows_cross_title_boundary() {
        let d = doc(vec![node(NodeKind::NotionToggle, vec![p("Title"), p("body")])]);
        let mut tr = at(&d, 7);
        assert!(notion_title_down(&mut tr).unwrap());
        assert_eq!(tr.selection(), Selection::collapsed(9));
        assert!(notion_body_up(&mut tr).unwrap());
        assert_eq!(tr.selection(), Selection::collapsed(7));
    }

    #[test]
    fn title_focus_and_exit_positions() {
        let d = doc(vec![p("ab"), toggle("T", vec![p("x")])]);
        assert_eq!(title_focus_target(&d, Selection::collapsed(6)), Some(4));
        assert_eq!(title_focus_target(&d, Selection::collapsed(7)), None);
        assert_eq!(title_exit(&d, 4, true), Some(6));
        assert_eq!(title_exit(&d, 4, false), Some(3));
        assert_eq!(title_exit(&d, 0, false), None);
    }

    #[test]
    fn title_is_set_by_position() {
        let d = doc(vec![toggle("old", vec![p("x")])]);
        let mut tr = at(&d, 2);
        assert!(set_toggle_title(&mut tr, 0, "new").unwrap());
        assert_eq!(tr.doc().child(0).unwrap().attrs().get_str("title"), Some("new"));
        assert!(!set_toggle_title(&mut tr, 1, "p").unwrap());
    }
}
