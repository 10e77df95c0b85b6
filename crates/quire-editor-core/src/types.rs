//! Selection types.

/// Which side of an edit a mapped position sticks to.
///
/// A position exactly at an insertion point stays in front of the inserted
/// content with `Before` and moves past it with `After`.
#[derive(Clone, Debug, Copy, PartialEq, Eq, Default)]
pub enum Affinity {
    Before,
    #[default]
    After,
}

/// A selection between two document positions.
///
/// `anchor` is the fixed end, `head` the end that moves with the cursor; use
/// [`Selection::from`] / [`Selection::to`] for ordered bounds.
#[derive(Clone, Debug, Copy, PartialEq, Eq, Default)]
pub struct Selection {
    pub anchor: usize,
    pub head: usize,
}

impl Selection {
    pub fn new(anchor: usize, head: usize) -> Self {
        Self { anchor, head }
    }

    pub fn collapsed(pos: usize) -> Self {
        Self::new(pos, pos)
    }

    pub fn from(&self) -> usize {
        self.anchor.min(self.head)
    }

    pub fn to(&self) -> usize {
        self.anchor.max(self.head)
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.head
    }

    /// Map both ends through a position mapping.
    pub fn map(&self, f: impl Fn(usize) -> usize) -> Self {
        Self::new(f(self.anchor), f(self.head))
    }

    /// Pull both ends into `0..=size`.
    pub fn clamp(&self, size: usize) -> Self {
        self.map(|pos| pos.min(size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_are_ordered() {
        let sel = Selection::new(10, 5);
        assert_eq!((sel.from(), sel.to()), (5, 10));
        assert!(!sel.is_collapsed());
    }

    #[test]
    fn clamp_keeps_direction() {
        let sel = Selection::new(12, 3).clamp(8);
        assert_eq!(sel, Selection::new(8, 3));
        assert!(Selection::collapsed(20).clamp(4).is_collapsed());
    }
}
