//! First-character dispatch tables, built once per node on first use.
//!
//! Both execution backends consult the same tables: the interpreter reads
//! them at run time, the compiler bakes them into guard instructions.

use std::collections::HashMap;

use scrivener_core::CharSet;

use super::{NodeId, Op, RuleGraph};

/// Ordered-choice dispatch: which children may match at a character.
#[derive(Debug, Clone, Default)]
pub struct OrTable {
    buckets: HashMap<char, Vec<usize>>,
    /// Children with no first-character bound.
    fallback: Vec<usize>,
    all: Vec<usize>,
}

impl OrTable {
    fn new(firsts: &[Option<CharSet>]) -> Self {
        let mut table = OrTable {
            all: (0..firsts.len()).collect(),
            ..OrTable::default()
        };
        for (index, set) in firsts.iter().enumerate() {
            match set {
                None => table.fallback.push(index),
                Some(set) => {
                    for c in set.iter() {
                        table.buckets.entry(c).or_default().push(index);
                    }
                }
            }
        }
        // Unbounded children join every bucket, keeping declaration order.
        for bucket in table.buckets.values_mut() {
            bucket.extend(&table.fallback);
            bucket.sort_unstable();
        }
        table
    }

    /// Child indices to try, in order, for the character at the current
    /// position (`None` past the end of the stream).
    pub fn candidates(&self, c: Option<char>) -> &[usize] {
        match c {
            None => &self.all,
            Some(c) => self.buckets.get(&c).unwrap_or(&self.fallback),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Dispatch {
    Or(OrTable),
    /// Per-child guard: when set, the child misses unless the current
    /// character is in the set (or the position is past the end).
    Seq(Vec<Option<CharSet>>),
    Mixed {
        until: Option<CharSet>,
        content: Option<CharSet>,
    },
    None,
}

impl RuleGraph {
    pub fn dispatch(&self, id: NodeId) -> &Dispatch {
        self.node(id).dispatch.get_or_init(|| self.build_dispatch(id))
    }

    /// The Or table of node `id`; empty for other node kinds.
    pub fn or_table(&self, id: NodeId) -> &OrTable {
        static EMPTY: std::sync::OnceLock<OrTable> = std::sync::OnceLock::new();
        match self.dispatch(id) {
            Dispatch::Or(table) => table,
            _ => EMPTY.get_or_init(OrTable::default),
        }
    }

    /// Guards for the children of Seq node `id`, one per child.
    pub fn seq_guards(&self, id: NodeId) -> &[Option<CharSet>] {
        match self.dispatch(id) {
            Dispatch::Seq(guards) => guards,
            _ => &[],
        }
    }

    /// Guards for the until and content rules of Mixed node `id`.
    pub fn mixed_guards(&self, id: NodeId) -> (Option<&CharSet>, Option<&CharSet>) {
        match self.dispatch(id) {
            Dispatch::Mixed { until, content } => (until.as_ref(), content.as_ref()),
            _ => (None, None),
        }
    }

    fn build_dispatch(&self, id: NodeId) -> Dispatch {
        match self.op(id) {
            Op::Or(ids) => {
                let firsts: Vec<_> = ids.iter().map(|&child| self.first_chars(child)).collect();
                Dispatch::Or(OrTable::new(&firsts))
            }
            Op::Seq(ids) => Dispatch::Seq(
                ids.iter()
                    .map(|&child| match self.op(child) {
                        Op::Wall(_) | Op::FirstChars(_) => None,
                        _ => self.guard(child),
                    })
                    .collect(),
            ),
            Op::Mixed { until, content } => Dispatch::Mixed {
                until: self.guard(*until),
                content: content.and_then(|content| self.guard(content)),
            },
            _ => Dispatch::None,
        }
    }

    /// A non-empty first-character set worth testing before evaluation.
    fn guard(&self, id: NodeId) -> Option<CharSet> {
        self.first_chars(id).filter(|set| !set.is_empty())
    }
}

/// Whether a guard lets evaluation proceed at `c` (`None` past the end).
#[inline]
pub fn guard_admits(guard: Option<&CharSet>, c: Option<char>) -> bool {
    match (guard, c) {
        (Some(set), Some(c)) => set.contains(c),
        _ => true,
    }
}
