//! Inline CSS declarations stored in the `style` attribute of table cells.
//!
//! Parsing is best-effort: fragments without a `:` or with an empty property
//! name are dropped. Updating a property keeps every other declaration and
//! its original order.

use indexmap::IndexMap;
use smol_str::SmolStr;
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyleMap(IndexMap<SmolStr, SmolStr>);

impl StyleMap {
    pub fn parse(raw: &str) -> Self {
        let mut map = IndexMap::new();
        for decl in raw.split(';') {
            let decl = decl.trim();
            if decl.is_empty() {
                continue;
            }
            match decl.split_once(':') {
                Some((prop, value)) if !prop.trim().is_empty() && !value.trim().is_empty() => {
                    // Last write wins but keeps the first position.
                    map.insert(
                        SmolStr::new(prop.trim().to_ascii_lowercase()),
                        SmolStr::new(value.trim()),
                    );
                }
                _ => debug!(declaration = decl, "dropping malformed style declaration"),
            }
        }
        Self(map)
    }

    pub fn get(&self, prop: &str) -> Option<&str> {
        self.0.get(prop).map(SmolStr::as_str)
    }

    pub fn set(&mut self, prop: &str, value: &str) {
        self.0.insert(SmolStr::new(prop), SmolStr::new(value));
    }

    pub fn remove(&mut self, prop: &str) -> Option<SmolStr> {
        self.0.shift_remove(prop)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// `prop: value` pairs joined with `"; "`.
    pub fn serialize(&self) -> String {
        self.0
            .iter()
            .map(|(k, v)| format!("{k}: {v}"))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Background {
    /// Remove `background-color` entirely.
    Transparent,
    Color(SmolStr),
}

/// A colour change applied to a cell's style.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StylePatch {
    pub background: Option<Background>,
    pub color: Option<SmolStr>,
}

impl StylePatch {
    pub fn background(background: Background) -> Self {
        Self {
            background: Some(background),
            color: None,
        }
    }

    pub fn color(color: impl Into<SmolStr>) -> Self {
        Self {
            background: None,
            color: Some(color.into()),
        }
    }

    /// Apply to a raw style string. `None` in or out means no style at all.
    pub fn apply(&self, raw: Option<&str>) -> Option<String> {
        let mut style = raw.map(StyleMap::parse).unwrap_or_default();
        match &self.background {
            Some(Background::Transparent) => {
                style.remove("background-color");
            }
            Some(Background::Color(c)) => style.set("background-color", c),
            None => {}
        }
        if let Some(color) = &self.color {
            style.set("color", color);
        }
        (!style.is_empty()).then(|| style.serialize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_trims_and_drops_malformed() {
        let style = StyleMap::parse(" color : red;;nonsense; : x ;width: 10px ");
        assert_eq!(style.len(), 2);
        assert_eq!(style.get("color"), Some("red"));
        assert_eq!(style.serialize(), "color: red; width: 10px");
    }

    #[test]
    fn duplicate_keys_last_write_wins() {
        let style = StyleMap::parse("color: red; color: blue");
        assert_eq!(style.serialize(), "color: blue");
    }

    #[test]
    fn patches_compose_on_unrelated_properties() {
        let bg = StylePatch::background(Background::Color("#fecaca".into()));
        let fg = StylePatch::color("#7f1d1d");
        let style = fg.apply(bg.apply(Some("width: 10px")).as_deref());
        assert_eq!(
            style.as_deref(),
            Some("width: 10px; background-color: #fecaca; color: #7f1d1d")
        );
    }

    #[test]
    fn transparent_removes_only_background() {
        let patch = StylePatch::background(Background::Transparent);
        let style = patch.apply(Some("background-color: #fecaca; color: #7f1d1d"));
        assert_eq!(style.as_deref(), Some("color: #7f1d1d"));
        assert_eq!(patch.apply(Some("background-color: red")), None);
    }
}
