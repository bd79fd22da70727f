//! Static verification of module code.
//!
//! Every table reference and jump target must be in range, and the three
//! VM stacks (saved positions, scopes, collectors) must have the same depth
//! on every path into an instruction, never underflow, and be back at zero
//! at each `ret`. The VM relies on this and does not re-check at run time.

use super::ids::{Addr, ConstId, ExprId, StrId};
use super::instructions::Instruction;
use super::module::Module;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerifyError {
    #[error("routine `{routine}`: {table} index {index} out of range at {addr}")]
    BadReference {
        routine: String,
        addr: Addr,
        table: &'static str,
        index: u32,
    },

    #[error("routine `{routine}`: jump to {target} out of range at {addr}")]
    BadJump {
        routine: String,
        addr: Addr,
        target: Addr,
    },

    #[error("routine `{routine}`: {stack} stack underflow at {addr}")]
    Underflow {
        routine: String,
        addr: Addr,
        stack: &'static str,
    },

    #[error("routine `{routine}`: paths into {addr} disagree on stack depth")]
    Inconsistent { routine: String, addr: Addr },

    #[error("routine `{routine}`: returns with unbalanced stacks at {addr}")]
    Unbalanced { routine: String, addr: Addr },

    #[error("routine `{routine}`: execution runs past the last instruction")]
    FallsOffEnd { routine: String },

    #[error("entry `{name}` refers to missing routine {index}")]
    BadEntry { name: String, index: u32 },

    #[error("main rule `{0}` has no entry")]
    MissingMain(String),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct Depths {
    marks: u32,
    scopes: u32,
    collectors: u32,
}

/// Stack effect of an instruction along its fall-through edge.
#[derive(Clone, Copy, Default)]
struct Effect {
    pop: Depths,
    push: Depths,
}

impl Effect {
    const NONE: Effect = Effect {
        pop: Depths {
            marks: 0,
            scopes: 0,
            collectors: 0,
        },
        push: Depths {
            marks: 0,
            scopes: 0,
            collectors: 0,
        },
    };

    fn pop_marks(mut self, n: u32) -> Self {
        self.pop.marks += n;
        self
    }

    fn push_marks(mut self, n: u32) -> Self {
        self.push.marks += n;
        self
    }

    fn pop_scope(mut self) -> Self {
        self.pop.scopes += 1;
        self
    }

    fn push_scope(mut self) -> Self {
        self.push.scopes += 1;
        self
    }

    fn pop_collector(mut self) -> Self {
        self.pop.collectors += 1;
        self
    }

    fn push_collector(mut self) -> Self {
        self.push.collectors += 1;
        self
    }

    /// Needs a collector on the stack but leaves it there.
    fn use_collector(self) -> Self {
        self.pop_collector().push_collector()
    }
}

fn effect(instr: &Instruction) -> Effect {
    use Instruction as I;
    let e = Effect::NONE;
    match instr {
        I::PushPos | I::Behind { .. } => e.push_marks(1),
        I::PopPos | I::DropPos | I::Take | I::Extent(_) | I::BehindEnd | I::RepeatStep { .. } => {
            e.pop_marks(1)
        }
        I::ScopePush | I::BindParams(_) => e.push_scope(),
        I::ScopeMerge | I::ScopeDiscard => e.pop_scope(),
        I::Collect => e.push_collector(),
        I::RepeatEnd { .. } | I::CollectDrop | I::MixedEnd => e.pop_collector(),
        I::RepeatMax { .. } | I::MixedCheck { .. } => e.use_collector(),
        I::MixedItem(_) => e.pop_marks(1).use_collector(),
        _ => e,
    }
}

/// Stack effect along the jump edge, where it differs from fall-through.
fn jump_effect(instr: &Instruction) -> Effect {
    match instr {
        // The position is only saved when the look-behind proceeds.
        Instruction::Behind { .. } => Effect::NONE,
        other => effect(other),
    }
}

fn apply(depths: Depths, effect: Effect) -> Result<Depths, &'static str> {
    let sub = |have: u32, take: u32, stack| have.checked_sub(take).ok_or(stack);
    Ok(Depths {
        marks: sub(depths.marks, effect.pop.marks, "position")? + effect.push.marks,
        scopes: sub(depths.scopes, effect.pop.scopes, "scope")? + effect.push.scopes,
        collectors: sub(depths.collectors, effect.pop.collectors, "collector")?
            + effect.push.collectors,
    })
}

/// Verify `module`, returning the slot count of each routine.
pub fn verify(module: &Module) -> Result<Vec<u32>, VerifyError> {
    let routine_count = module.routines().len();
    for (name, id) in module.entries() {
        if id.index() >= routine_count {
            return Err(VerifyError::BadEntry {
                name: name.clone(),
                index: id.0,
            });
        }
    }
    if module.entry(module.main_name()).is_none() {
        return Err(VerifyError::MissingMain(module.main_name().to_string()));
    }

    module
        .routines()
        .iter()
        .map(|routine| verify_routine(module, routine.name(), routine.code()))
        .collect()
}

fn verify_routine(module: &Module, name: &str, code: &[Instruction]) -> Result<u32, VerifyError> {
    for (index, instr) in code.iter().enumerate() {
        check_operands(module, name, code.len(), Addr(index as u32), instr)?;
    }

    let mut seen: Vec<Option<Depths>> = vec![None; code.len()];
    let mut work = vec![(0usize, Depths::default())];
    let mut slots = 0;

    while let Some((index, depths)) = work.pop() {
        let addr = Addr(index as u32);
        let Some(instr) = code.get(index) else {
            return Err(VerifyError::FallsOffEnd {
                routine: name.to_string(),
            });
        };
        match seen[index] {
            Some(known) if known == depths => continue,
            Some(_) => {
                return Err(VerifyError::Inconsistent {
                    routine: name.to_string(),
                    addr,
                });
            }
            None => seen[index] = Some(depths),
        }
        slots = slots.max(depths.marks);

        let underflow = |stack| VerifyError::Underflow {
            routine: name.to_string(),
            addr,
            stack,
        };
        if matches!(instr, Instruction::Ret) && depths != Depths::default() {
            return Err(VerifyError::Unbalanced {
                routine: name.to_string(),
                addr,
            });
        }
        if instr.falls_through() {
            let next = apply(depths, effect(instr)).map_err(underflow)?;
            slots = slots.max(next.marks);
            work.push((index + 1, next));
        }
        if let Some(target) = instr.target() {
            let next = apply(depths, jump_effect(instr)).map_err(underflow)?;
            work.push((target.index(), next));
        }
    }
    Ok(slots)
}

fn check_operands(
    module: &Module,
    routine: &str,
    code_len: usize,
    addr: Addr,
    instr: &Instruction,
) -> Result<(), VerifyError> {
    use Instruction as I;
    let tables = module.tables();
    let check = |table: &'static str, index: u32, len: usize| {
        if (index as usize) < len {
            Ok(())
        } else {
            Err(VerifyError::BadReference {
                routine: routine.to_string(),
                addr,
                table,
                index,
            })
        }
    };
    let string = |id: StrId| check("string", id.0, tables.strings.len());
    let constant = |id: ConstId| check("constant", id.0, tables.consts.len());
    let expr = |id: ExprId| check("expression", id.0, tables.exprs.len());

    if let Some(target) = instr.target() {
        if target.index() >= code_len {
            return Err(VerifyError::BadJump {
                routine: routine.to_string(),
                addr,
                target: *target,
            });
        }
    }

    match instr {
        I::Literal(s) | I::Code(s) | I::Bind(s) | I::Extent(s) | I::MixedItem(s) => string(*s),
        I::RepeatStep { rule, .. } => string(*rule),
        I::WallError { wall, rule } => string(*wall).and_then(|()| string(*rule)),
        I::Among(c) | I::Guard { set: c, .. } => check("charset", c.0, tables.charsets.len()),
        I::Regex(x) => check("regex", x.0, tables.regexes.len()),
        I::Const(k) | I::Replace(k) => constant(*k),
        I::Put { name, value: k } | I::Get { name, default: k } => {
            string(*name).and_then(|()| constant(*k))
        }
        I::Do(e) | I::DoCode(e) | I::If(e) | I::IfCode(e) => expr(*e),
        I::BindParams(pairs) => pairs
            .iter()
            .try_for_each(|(name, e)| string(*name).and_then(|()| expr(*e))),
        I::Call(p) => check("routine", p.0, module.routines().len()),
        _ => Ok(()),
    }
}
