//! Static facts about nodes: fixed length, first characters, optionality.
//!
//! All three walk the graph without memoization and treat re-entering a
//! node that is already on the walk as "unknown", so recursive rules
//! terminate.

use std::collections::HashSet;

use scrivener_core::{CharSet, END_OF_TEXT};

use super::{NodeId, Op, RuleGraph};

impl RuleGraph {
    /// Number of characters a match always consumes, if that is static.
    pub fn fixed_length(&self, id: NodeId) -> Option<usize> {
        self.fixed_length_in(id, &mut HashSet::new())
    }

    fn fixed_length_in(&self, id: NodeId, visiting: &mut HashSet<NodeId>) -> Option<usize> {
        if !visiting.insert(id) {
            return None;
        }
        let len = match self.op(id) {
            Op::Any | Op::AlphaNum | Op::Among(_) => Some(1),
            Op::StreamStart
            | Op::LineStart
            | Op::LineEnd
            | Op::StreamEnd
            | Op::Put { .. }
            | Op::Get { .. }
            | Op::Value(_)
            | Op::Do(_)
            | Op::DoCode(_)
            | Op::If(_)
            | Op::IfCode(_)
            | Op::Wall(_)
            | Op::FirstChars(_)
            | Op::Not(_)
            | Op::FailIf(_)
            | Op::Peek(_)
            | Op::LookBehind { .. } => Some(0),
            Op::Literal(text) => Some(text.chars().count()),
            Op::BlockBreak
            | Op::Regex(_)
            | Op::Repeat { .. }
            | Op::Opt(_)
            | Op::Mixed { .. }
            | Op::Code(_)
            | Op::Args => None,
            Op::Or(ids) => {
                let mut common = None;
                for &child in ids {
                    match (common, self.fixed_length_in(child, visiting)) {
                        (None, Some(len)) => common = Some(len),
                        (Some(c), Some(len)) if c == len => {}
                        _ => {
                            common = None;
                            break;
                        }
                    }
                }
                common
            }
            Op::Seq(ids) => {
                let mut total = 0;
                let mut known = true;
                for &child in ids {
                    match self.fixed_length_in(child, visiting) {
                        Some(len) => total += len,
                        None => {
                            known = false;
                            break;
                        }
                    }
                }
                known.then_some(total)
            }
            Op::Take(child)
            | Op::Extent(child)
            | Op::Replace { rule: child, .. }
            | Op::Bind { rule: child, .. }
            | Op::Params { rule: child, .. }
            | Op::Call { target: child, .. } => self.fixed_length_in(*child, visiting),
        };
        visiting.remove(&id);
        len
    }

    /// Characters a match can start with; `None` when no bound is known.
    pub fn first_chars(&self, id: NodeId) -> Option<CharSet> {
        self.first_chars_in(id, &mut HashSet::new())
    }

    fn first_chars_in(&self, id: NodeId, visiting: &mut HashSet<NodeId>) -> Option<CharSet> {
        if !visiting.insert(id) {
            return None;
        }
        let firsts = match self.op(id) {
            Op::Literal(text) => text.chars().next().map(|c| CharSet::from_iter([c])),
            Op::Among(set) | Op::FirstChars(set) => Some(set.clone()),
            Op::LineEnd | Op::BlockBreak => Some(CharSet::from_iter([END_OF_TEXT, '\n'])),
            Op::StreamEnd => Some(CharSet::from_iter([END_OF_TEXT])),
            Op::Or(ids) => {
                let mut union = CharSet::new();
                let mut known = true;
                for &child in ids {
                    match self.first_chars_in(child, visiting) {
                        Some(set) => union.extend_from(&set),
                        None => {
                            known = false;
                            break;
                        }
                    }
                }
                known.then_some(union)
            }
            Op::Seq(ids) => self.seq_first_chars(ids, visiting),
            Op::Repeat { rule, min, .. } if *min >= 1 => self.first_chars_in(*rule, visiting),
            Op::Peek(child)
            | Op::Take(child)
            | Op::Extent(child)
            | Op::Replace { rule: child, .. }
            | Op::Bind { rule: child, .. }
            | Op::Params { rule: child, .. }
            | Op::Call { target: child, .. } => self.first_chars_in(*child, visiting),
            _ => None,
        };
        visiting.remove(&id);
        firsts
    }

    fn seq_first_chars(&self, ids: &[NodeId], visiting: &mut HashSet<NodeId>) -> Option<CharSet> {
        if let Some(&head) = ids.first()
            && let Op::FirstChars(set) = self.op(head)
        {
            return Some(set.clone());
        }

        let mut firsts = CharSet::new();
        for &child in ids {
            if matches!(
                self.op(child),
                Op::Wall(_) | Op::LookBehind { .. } | Op::LineStart
            ) {
                continue;
            }

            let child_firsts = self.first_chars_in(child, visiting);
            if child_firsts.is_none() && self.fixed_length(child) == Some(0) {
                continue;
            }

            if self.is_optional(child)
                && let Some(set) = &child_firsts
                && !set.is_empty()
            {
                firsts.extend_from(set);
                continue;
            }

            return match child_firsts {
                Some(set) if !set.is_empty() => {
                    firsts.extend_from(&set);
                    Some(firsts)
                }
                _ => None,
            };
        }
        None
    }

    /// Whether the node can match without consuming anything.
    pub fn is_optional(&self, id: NodeId) -> bool {
        self.is_optional_in(id, &mut HashSet::new())
    }

    fn is_optional_in(&self, id: NodeId, visiting: &mut HashSet<NodeId>) -> bool {
        if !visiting.insert(id) {
            return false;
        }
        let optional = match self.op(id) {
            Op::Opt(_) => true,
            Op::Repeat { min, .. } => *min == 0,
            Op::Or(ids) | Op::Seq(ids) => ids.iter().all(|&child| self.is_optional_in(child, visiting)),
            Op::Take(child)
            | Op::Extent(child)
            | Op::Replace { rule: child, .. }
            | Op::Bind { rule: child, .. }
            | Op::Params { rule: child, .. }
            | Op::Call { target: child, .. } => self.is_optional_in(*child, visiting),
            _ => false,
        };
        visiting.remove(&id);
        optional
    }
}
