use std::collections::BTreeSet;
use std::fmt;

use crate::escape;

/// An ordered set of characters.
///
/// Used for first-character analysis, `Among` terminals and dispatch guards.
/// Ordering keeps emitted module sources deterministic.
#[derive(Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CharSet(BTreeSet<char>);

impl CharSet {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn contains(&self, c: char) -> bool {
        self.0.contains(&c)
    }

    pub fn insert(&mut self, c: char) -> bool {
        self.0.insert(c)
    }

    pub fn extend_from(&mut self, other: &CharSet) {
        self.0.extend(other.0.iter().copied());
    }

    pub fn union(&self, other: &CharSet) -> CharSet {
        CharSet(self.0.union(&other.0).copied().collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = char> + '_ {
        self.0.iter().copied()
    }

    /// The members concatenated in order.
    pub fn to_text(&self) -> String {
        self.0.iter().collect()
    }
}

impl From<&str> for CharSet {
    fn from(chars: &str) -> Self {
        CharSet(chars.chars().collect())
    }
}

impl FromIterator<char> for CharSet {
    fn from_iter<I: IntoIterator<Item = char>>(iter: I) -> Self {
        CharSet(iter.into_iter().collect())
    }
}

impl fmt::Debug for CharSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", escape::escape_body(&self.to_text(), ']'))
    }
}

impl fmt::Display for CharSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
