//! Deduplicating table builder.
//!
//! The compiler interns every string, pattern and expression source it emits
//! so a module carries each one once. Symbols are dense indices in insertion
//! order, which is also the order of the emitted table.

use indexmap::IndexSet;

/// Index of an interned entry.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct Symbol(u32);

impl Symbol {
    #[inline]
    pub fn as_u32(self) -> u32 {
        self.0
    }

    #[inline]
    pub fn from_raw(index: u32) -> Self {
        Self(index)
    }
}

/// Insertion-ordered set of values handing out [`Symbol`]s.
#[derive(Debug, Clone)]
pub struct Interner<T = String> {
    entries: IndexSet<T>,
}

impl<T> Default for Interner<T> {
    fn default() -> Self {
        Self {
            entries: IndexSet::new(),
        }
    }
}

impl<T: std::hash::Hash + Eq> Interner<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern `value`, returning the existing symbol when already present.
    pub fn intern(&mut self, value: T) -> Symbol {
        let (index, _) = self.entries.insert_full(value);
        Symbol(index as u32)
    }

    pub fn resolve(&self, sym: Symbol) -> Option<&T> {
        self.entries.get_index(sym.0 as usize)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Consume the interner, yielding the table in symbol order.
    pub fn into_vec(self) -> Vec<T> {
        self.entries.into_iter().collect()
    }
}

impl Interner<String> {
    /// Intern a borrowed string, allocating only on first sight.
    pub fn intern_str(&mut self, s: &str) -> Symbol {
        match self.entries.get_index_of(s) {
            Some(index) => Symbol(index as u32),
            None => self.intern(s.to_owned()),
        }
    }
}
