//! Label resolution.
//!
//! The emitter produces a flat stream of instructions over symbolic
//! [`Label`]s interleaved with label marks. Layout drops jumps to the
//! immediately following mark, then assigns addresses and rewrites every
//! target.

use std::collections::HashMap;

use scrivener_bytecode::{Addr, Instruction};

use crate::error::{CompileError, CompileResult};

/// Symbolic jump target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Label(pub u32);

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "L{}", self.0)
    }
}

/// One element of an emitted routine body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Item {
    Instr(Instruction<Label>),
    /// The next instruction's address is the label's address.
    Mark(Label),
}

/// Resolve `items` into addressed code.
pub fn layout(items: Vec<Item>) -> CompileResult<Vec<Instruction>> {
    let items = elide_jumps(items);

    let mut addrs = HashMap::new();
    let mut next = 0u32;
    for item in &items {
        match item {
            Item::Mark(label) => {
                addrs.insert(*label, Addr(next));
            }
            Item::Instr(_) => next += 1,
        }
    }

    items
        .into_iter()
        .filter_map(|item| match item {
            Item::Instr(instr) => Some(instr),
            Item::Mark(_) => None,
        })
        .map(|instr| {
            let mut missing = None;
            let resolved = instr.map_target(|label| match addrs.get(&label) {
                Some(addr) => *addr,
                None => {
                    missing = Some(label);
                    Addr(0)
                }
            });
            match missing {
                Some(label) => Err(CompileError::UnplacedLabel(label.0)),
                None => Ok(resolved),
            }
        })
        .collect()
}

/// Remove unconditional jumps whose target mark follows directly, possibly
/// after other marks.
fn elide_jumps(items: Vec<Item>) -> Vec<Item> {
    let mut out: Vec<Item> = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        if let Item::Instr(Instruction::Jump(target)) = item {
            let lands_next = items[index + 1..]
                .iter()
                .take_while(|next| matches!(next, Item::Mark(_)))
                .any(|next| next == &Item::Mark(*target));
            if lands_next {
                continue;
            }
        }
        out.push(item.clone());
    }
    out
}
