//! The instruction set.
//!
//! The VM keeps three result registers (status, value, position) and three
//! stacks: saved positions, context scopes and collectors. Every rule lowers
//! to a code fragment that leaves its outcome in the registers; on a miss or
//! a failure the position register is back at the fragment's start.
//!
//! Instructions are generic over their jump target so the compiler can emit
//! symbolic labels and resolve them to [`Addr`]s in one pass.

use std::fmt;

use super::ids::{Addr, CharSetId, ConstId, ExprId, RegexId, RoutineId, StrId};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Instruction<T = Addr> {
    // Terminals: evaluate at the current position.
    Any,
    AlphaNum,
    StreamStart,
    LineStart,
    LineEnd,
    StreamEnd,
    BlockBreak,
    /// Zero-width match producing `Empty` (walls and first-char hints).
    Empty,
    Literal(StrId),
    Among(CharSetId),
    Regex(RegexId),
    Const(ConstId),
    Put { name: StrId, value: ConstId },
    Get { name: StrId, default: ConstId },
    Do(ExprId),
    DoCode(ExprId),
    If(ExprId),
    IfCode(ExprId),
    Code(StrId),
    Args,
    /// Set the status to miss.
    Miss,

    // Control flow.
    Jump(T),
    JumpIfMiss(T),
    JumpIfMatch(T),
    JumpIfFailure(T),
    /// Miss and jump to `skip` unless the current character is in `set`.
    /// Past the end of the stream the guard always admits.
    Guard { set: CharSetId, skip: T },
    Call(RoutineId),
    Ret,

    // Saved positions.
    PushPos,
    PopPos,
    DropPos,

    // Context scopes.
    ScopePush,
    ScopeMerge,
    ScopeDiscard,
    /// Evaluate each expression in the current scope, then push a scope
    /// binding the results to the paired names.
    BindParams(Vec<(StrId, ExprId)>),

    // Result transforms, applied after a child fragment.
    Not,
    Peek,
    FailIf,
    Opt,
    Replace(ConstId),
    /// Pops the start position; a match becomes the consumed text.
    Take,
    Bind(StrId),
    /// Pops the start position; a map match gains its extent. The operand
    /// names the rule for errors.
    Extent(StrId),
    /// Miss and jump to `miss` when fewer than `len` characters precede the
    /// position; otherwise save the position and step back `len`.
    Behind { len: u32, miss: T },
    /// Pops the saved position; match only if the child ended exactly there.
    BehindEnd,

    // Collectors for repetitions and interleaved text.
    /// Push a collector whose text mark is the current position.
    Collect,
    /// Pops the iteration start. A zero-width iteration jumps to `exit` at
    /// the end of the stream and is an error elsewhere; otherwise the value
    /// is collected and counted.
    RepeatStep { rule: StrId, exit: T },
    /// Jump to `exit` once the collector holds `max` iterations.
    RepeatMax { max: u32, exit: T },
    /// Pops the collector: a list match with at least `min` iterations, else a miss.
    RepeatEnd { min: u32 },
    CollectDrop,
    /// Jump to `exit` once the position reaches the end of the stream.
    MixedCheck { exit: T },
    /// Pops the content start; flushes pending text and collects the match.
    MixedItem(StrId),
    /// Advance the position by one character.
    Advance,
    /// Pops the collector, flushing pending text, as a list match.
    MixedEnd,
    /// Abort the parse: `rule` did not match after `wall`.
    WallError { wall: StrId, rule: StrId },
}

impl<T> Instruction<T> {
    /// Name used in module sources and traces.
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Instruction::Any => "any",
            Instruction::AlphaNum => "alphanum",
            Instruction::StreamStart => "stream_start",
            Instruction::LineStart => "line_start",
            Instruction::LineEnd => "line_end",
            Instruction::StreamEnd => "stream_end",
            Instruction::BlockBreak => "block_break",
            Instruction::Empty => "empty",
            Instruction::Literal(_) => "literal",
            Instruction::Among(_) => "among",
            Instruction::Regex(_) => "regex",
            Instruction::Const(_) => "const",
            Instruction::Put { .. } => "put",
            Instruction::Get { .. } => "get",
            Instruction::Do(_) => "do",
            Instruction::DoCode(_) => "do_code",
            Instruction::If(_) => "if",
            Instruction::IfCode(_) => "if_code",
            Instruction::Code(_) => "code",
            Instruction::Args => "args",
            Instruction::Miss => "miss",
            Instruction::Jump(_) => "jump",
            Instruction::JumpIfMiss(_) => "jump_miss",
            Instruction::JumpIfMatch(_) => "jump_match",
            Instruction::JumpIfFailure(_) => "jump_failure",
            Instruction::Guard { .. } => "guard",
            Instruction::Call(_) => "call",
            Instruction::Ret => "ret",
            Instruction::PushPos => "push_pos",
            Instruction::PopPos => "pop_pos",
            Instruction::DropPos => "drop_pos",
            Instruction::ScopePush => "scope_push",
            Instruction::ScopeMerge => "scope_merge",
            Instruction::ScopeDiscard => "scope_discard",
            Instruction::BindParams(_) => "bind_params",
            Instruction::Not => "not",
            Instruction::Peek => "peek",
            Instruction::FailIf => "fail_if",
            Instruction::Opt => "opt",
            Instruction::Replace(_) => "replace",
            Instruction::Take => "take",
            Instruction::Bind(_) => "bind",
            Instruction::Extent(_) => "extent",
            Instruction::Behind { .. } => "behind",
            Instruction::BehindEnd => "behind_end",
            Instruction::Collect => "collect",
            Instruction::RepeatStep { .. } => "repeat_step",
            Instruction::RepeatMax { .. } => "repeat_max",
            Instruction::RepeatEnd { .. } => "repeat_end",
            Instruction::CollectDrop => "collect_drop",
            Instruction::MixedCheck { .. } => "mixed_check",
            Instruction::MixedItem(_) => "mixed_item",
            Instruction::Advance => "advance",
            Instruction::MixedEnd => "mixed_end",
            Instruction::WallError { .. } => "wall_error",
        }
    }

    /// The jump target, for instructions that have one.
    pub fn target(&self) -> Option<&T> {
        match self {
            Instruction::Jump(t)
            | Instruction::JumpIfMiss(t)
            | Instruction::JumpIfMatch(t)
            | Instruction::JumpIfFailure(t)
            | Instruction::Guard { skip: t, .. }
            | Instruction::Behind { miss: t, .. }
            | Instruction::RepeatStep { exit: t, .. }
            | Instruction::RepeatMax { exit: t, .. }
            | Instruction::MixedCheck { exit: t } => Some(t),
            _ => None,
        }
    }

    /// Whether execution may continue with the next instruction.
    pub fn falls_through(&self) -> bool {
        !matches!(
            self,
            Instruction::Jump(_) | Instruction::Ret | Instruction::WallError { .. }
        )
    }

    /// Rewrite the jump target, keeping every other operand.
    pub fn map_target<U>(self, f: impl FnOnce(T) -> U) -> Instruction<U> {
        use Instruction as I;
        match self {
            I::Jump(t) => I::Jump(f(t)),
            I::JumpIfMiss(t) => I::JumpIfMiss(f(t)),
            I::JumpIfMatch(t) => I::JumpIfMatch(f(t)),
            I::JumpIfFailure(t) => I::JumpIfFailure(f(t)),
            I::Guard { set, skip } => I::Guard { set, skip: f(skip) },
            I::Behind { len, miss } => I::Behind { len, miss: f(miss) },
            I::RepeatStep { rule, exit } => I::RepeatStep { rule, exit: f(exit) },
            I::RepeatMax { max, exit } => I::RepeatMax { max, exit: f(exit) },
            I::MixedCheck { exit } => I::MixedCheck { exit: f(exit) },

            I::Any => I::Any,
            I::AlphaNum => I::AlphaNum,
            I::StreamStart => I::StreamStart,
            I::LineStart => I::LineStart,
            I::LineEnd => I::LineEnd,
            I::StreamEnd => I::StreamEnd,
            I::BlockBreak => I::BlockBreak,
            I::Empty => I::Empty,
            I::Literal(s) => I::Literal(s),
            I::Among(c) => I::Among(c),
            I::Regex(x) => I::Regex(x),
            I::Const(k) => I::Const(k),
            I::Put { name, value } => I::Put { name, value },
            I::Get { name, default } => I::Get { name, default },
            I::Do(e) => I::Do(e),
            I::DoCode(e) => I::DoCode(e),
            I::If(e) => I::If(e),
            I::IfCode(e) => I::IfCode(e),
            I::Code(s) => I::Code(s),
            I::Args => I::Args,
            I::Miss => I::Miss,
            I::Call(p) => I::Call(p),
            I::Ret => I::Ret,
            I::PushPos => I::PushPos,
            I::PopPos => I::PopPos,
            I::DropPos => I::DropPos,
            I::ScopePush => I::ScopePush,
            I::ScopeMerge => I::ScopeMerge,
            I::ScopeDiscard => I::ScopeDiscard,
            I::BindParams(pairs) => I::BindParams(pairs),
            I::Not => I::Not,
            I::Peek => I::Peek,
            I::FailIf => I::FailIf,
            I::Opt => I::Opt,
            I::Replace(k) => I::Replace(k),
            I::Take => I::Take,
            I::Bind(s) => I::Bind(s),
            I::Extent(s) => I::Extent(s),
            I::BehindEnd => I::BehindEnd,
            I::Collect => I::Collect,
            I::RepeatEnd { min } => I::RepeatEnd { min },
            I::CollectDrop => I::CollectDrop,
            I::MixedItem(s) => I::MixedItem(s),
            I::Advance => I::Advance,
            I::MixedEnd => I::MixedEnd,
            I::WallError { wall, rule } => I::WallError { wall, rule },
        }
    }
}

impl<T: fmt::Display> fmt::Display for Instruction<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Instruction as I;
        f.write_str(self.mnemonic())?;
        match self {
            I::Literal(s) | I::Code(s) | I::Bind(s) | I::Extent(s) | I::MixedItem(s) => {
                write!(f, " {s}")
            }
            I::Among(c) => write!(f, " {c}"),
            I::Regex(x) => write!(f, " {x}"),
            I::Const(k) | I::Replace(k) => write!(f, " {k}"),
            I::Put { name, value } => write!(f, " {name} {value}"),
            I::Get { name, default } => write!(f, " {name} {default}"),
            I::Do(e) | I::DoCode(e) | I::If(e) | I::IfCode(e) => write!(f, " {e}"),
            I::Jump(t) | I::JumpIfMiss(t) | I::JumpIfMatch(t) | I::JumpIfFailure(t) => {
                write!(f, " {t}")
            }
            I::Guard { set, skip } => write!(f, " {set} {skip}"),
            I::Call(p) => write!(f, " {p}"),
            I::BindParams(pairs) => {
                write!(f, " {}", pairs.len())?;
                for (name, expr) in pairs {
                    write!(f, " {name} {expr}")?;
                }
                Ok(())
            }
            I::Behind { len, miss } => write!(f, " {len} {miss}"),
            I::RepeatStep { rule, exit } => write!(f, " {rule} {exit}"),
            I::RepeatMax { max, exit } => write!(f, " {max} {exit}"),
            I::RepeatEnd { min } => write!(f, " {min}"),
            I::MixedCheck { exit } => write!(f, " {exit}"),
            I::WallError { wall, rule } => write!(f, " {wall} {rule}"),
            _ => Ok(()),
        }
    }
}
