//! Lowering of snapped rule graphs to module code.
//!
//! Each rule kind lowers to a fragment that leaves its outcome in the VM's
//! registers. Fragments nest: composite rules wrap their children's code
//! with the stack operations that give backtracking and scoping the same
//! shape as the interpreter's recursion.

use indexmap::IndexMap;

use scrivener_bytecode::{Instruction, Module, Routine, RoutineId, StrId};
use scrivener_grammar::{NodeId, Op, Parser, RuleGraph, Value};

use super::plan::{Plan, routine_name};
use crate::emit::{Item, Label, TableBuilder, layout};
use crate::error::{CompileError, CompileResult};

type Instr = Instruction<Label>;

/// Emitter state for one grammar.
pub struct Compiler<'a> {
    graph: &'a RuleGraph,
    plan: &'a Plan,
    tables: &'a mut TableBuilder,
    items: Vec<Item>,
    next_label: u32,
}

impl<'a> Compiler<'a> {
    pub fn new(graph: &'a RuleGraph, plan: &'a Plan, tables: &'a mut TableBuilder) -> Self {
        Self {
            graph,
            plan,
            tables,
            items: Vec::new(),
            next_label: 0,
        }
    }

    /// Compile a snapped grammar into a verified module.
    pub fn compile(parser: &Parser) -> CompileResult<Module> {
        let graph = parser.graph();
        let plan = Plan::new(graph, parser.main());
        let mut tables = TableBuilder::new();

        let mut routines = Vec::with_capacity(plan.routines().len());
        for &root in plan.routines() {
            let code = Compiler::new(graph, &plan, &mut tables).compile_routine(root)?;
            routines.push(Routine::new(routine_name(graph, root), code).rule(graph.is_rule(root)));
        }

        let entries: IndexMap<String, RoutineId> = plan.entries().clone();
        let module = Module::new(tables.finish(), routines, entries, parser.main_name())?;
        Ok(module)
    }

    fn compile_routine(mut self, root: NodeId) -> CompileResult<Vec<Instruction>> {
        self.emit_node(root)?;
        self.emit(Instruction::Ret);
        layout(self.items)
    }

    fn fresh_label(&mut self) -> Label {
        let label = Label(self.next_label);
        self.next_label += 1;
        label
    }

    fn emit(&mut self, instr: Instr) {
        self.items.push(Item::Instr(instr));
    }

    fn mark(&mut self, label: Label) {
        self.items.push(Item::Mark(label));
    }

    fn string(&mut self, s: &str) -> StrId {
        self.tables.string(s)
    }

    fn constant(&mut self, id: NodeId, value: &Value) -> CompileResult<scrivener_bytecode::ConstId> {
        self.tables
            .constant(value)
            .map_err(|found| CompileError::UnsupportedConstant {
                rule: self.graph.describe(id),
                found,
            })
    }

    /// Emit a reference to `id`: a call when it has its own routine,
    /// otherwise its code inline.
    fn emit_ref(&mut self, id: NodeId) -> CompileResult<()> {
        if !self.graph.op(id).is_terminal()
            && let Some(routine) = self.plan.routine(id)
        {
            self.emit(Instruction::Call(routine));
            return Ok(());
        }
        self.emit_node(id)
    }

    fn emit_node(&mut self, id: NodeId) -> CompileResult<()> {
        use Instruction as I;
        let graph = self.graph;
        match graph.op(id) {
            Op::Any => self.emit(I::Any),
            Op::AlphaNum => self.emit(I::AlphaNum),
            Op::StreamStart => self.emit(I::StreamStart),
            Op::LineStart => self.emit(I::LineStart),
            Op::LineEnd => self.emit(I::LineEnd),
            Op::StreamEnd => self.emit(I::StreamEnd),
            Op::BlockBreak => self.emit(I::BlockBreak),
            Op::Put { name, value } => {
                let name = self.string(name);
                let value = self.constant(id, value)?;
                self.emit(I::Put { name, value });
            }
            Op::Get { name, default } => {
                let name = self.string(name);
                let default = self.constant(id, default)?;
                self.emit(I::Get { name, default });
            }
            Op::Literal(text) => {
                let s = self.string(text);
                self.emit(I::Literal(s));
            }
            Op::Among(set) => {
                let c = self.tables.charset(set);
                self.emit(I::Among(c));
            }
            Op::Regex(pattern) => {
                let x = self.tables.regex(pattern.as_str());
                self.emit(I::Regex(x));
            }
            Op::Value(value) => {
                let k = self.constant(id, value)?;
                self.emit(I::Const(k));
            }
            Op::FirstChars(_) | Op::Wall(_) => self.emit(I::Empty),
            Op::Do(action) => {
                let e = self.tables.expr(action.source());
                self.emit(I::Do(e));
            }
            Op::DoCode(action) => {
                let e = self.tables.expr(action.source());
                self.emit(I::DoCode(e));
            }
            Op::If(action) => {
                let e = self.tables.expr(action.source());
                self.emit(I::If(e));
            }
            Op::IfCode(action) => {
                let e = self.tables.expr(action.source());
                self.emit(I::IfCode(e));
            }
            Op::Code(ends) => {
                let s = self.string(ends);
                self.emit(I::Code(s));
            }
            Op::Args => self.emit(I::Args),

            Op::Or(children) => self.emit_or(children)?,
            Op::Seq(children) => self.emit_seq(id, children)?,
            Op::Repeat { rule, min, max } => self.emit_repeat(id, *rule, *min, *max)?,
            Op::Mixed { until, content } => self.emit_mixed(id, *until, *content)?,

            Op::Not(child) | Op::Peek(child) => {
                self.emit(I::PushPos);
                self.emit(I::ScopePush);
                self.emit_ref(*child)?;
                self.emit(I::ScopeDiscard);
                self.emit(I::PopPos);
                self.emit(match graph.op(id) {
                    Op::Not(_) => I::Not,
                    _ => I::Peek,
                });
            }
            Op::LookBehind { rule, len } => {
                let miss = self.fresh_label();
                let discard = self.fresh_label();
                let done = self.fresh_label();
                self.emit(I::Behind {
                    len: *len as u32,
                    miss,
                });
                self.emit(I::ScopePush);
                self.emit_ref(*rule)?;
                self.emit(I::BehindEnd);
                self.emit(I::JumpIfMiss(discard));
                self.emit(I::ScopeMerge);
                self.emit(I::Jump(done));
                self.mark(discard);
                self.emit(I::ScopeDiscard);
                self.mark(miss);
                self.mark(done);
            }
            Op::FailIf(child) => {
                self.emit(I::PushPos);
                self.emit_ref(*child)?;
                self.emit(I::PopPos);
                self.emit(I::FailIf);
            }
            Op::Opt(child) => {
                self.emit_ref(*child)?;
                self.emit(I::Opt);
            }
            Op::Replace { rule, value } => {
                let k = self.constant(id, value)?;
                self.emit_ref(*rule)?;
                self.emit(I::Replace(k));
            }
            Op::Take(child) => {
                self.emit(I::PushPos);
                self.emit_ref(*child)?;
                self.emit(I::Take);
            }
            Op::Bind { rule, name } => {
                let s = self.string(name);
                self.emit_ref(*rule)?;
                self.emit(I::Bind(s));
            }
            Op::Extent(child) => {
                let s = self.string(&graph.describe(id));
                self.emit(I::PushPos);
                self.emit_ref(*child)?;
                self.emit(I::Extent(s));
            }
            Op::Params { rule, .. } => self.emit_ref(*rule)?,
            Op::Call { target, args } => {
                let names = match graph.op(*target) {
                    Op::Params { names, .. } => names.as_slice(),
                    _ => &[][..],
                };
                let pairs = names
                    .iter()
                    .zip(args)
                    .map(|(name, arg)| (self.tables.string(name), self.tables.expr(arg.source())))
                    .collect();
                self.emit(I::BindParams(pairs));
                self.emit_ref(*target)?;
                self.emit(I::ScopeDiscard);
            }
        }
        Ok(())
    }

    /// Ordered choice. Each alternative runs in its own scope, kept on
    /// anything but a miss; alternatives whose first characters exclude the
    /// current one are skipped.
    fn emit_or(&mut self, children: &[NodeId]) -> CompileResult<()> {
        use Instruction as I;
        let done = self.fresh_label();
        for &child in children {
            let next = self.fresh_label();
            let miss = self.fresh_label();
            if let Some(set) = self.graph.first_chars(child) {
                let set = self.tables.charset(&set);
                self.emit(I::Guard { set, skip: next });
            }
            self.emit(I::ScopePush);
            self.emit_ref(child)?;
            self.emit(I::JumpIfMiss(miss));
            self.emit(I::ScopeMerge);
            self.emit(I::Jump(done));
            self.mark(miss);
            self.emit(I::ScopeDiscard);
            self.mark(next);
        }
        self.emit(I::Miss);
        self.mark(done);
        Ok(())
    }

    /// Sequence. Bindings made by the children are local to it. After a
    /// wall, a child miss aborts the parse instead of backtracking.
    fn emit_seq(&mut self, id: NodeId, children: &[NodeId]) -> CompileResult<()> {
        use Instruction as I;
        let graph = self.graph;
        let guards = graph.seq_guards(id);
        let bail = self.fresh_label();
        let done = self.fresh_label();
        let mut wall: Option<&str> = None;
        let mut wall_errors = Vec::new();
        let mut ran = false;

        self.emit(I::PushPos);
        self.emit(I::ScopePush);
        for (index, &child) in children.iter().enumerate() {
            if let Op::Wall(name) = graph.op(child) {
                wall = Some(name);
                continue;
            }
            let on_miss = match wall {
                Some(wall) => {
                    let label = self.fresh_label();
                    wall_errors.push((label, wall, child));
                    label
                }
                None => bail,
            };
            if let Some(Some(set)) = guards.get(index) {
                let set = self.tables.charset(set);
                self.emit(I::Guard { set, skip: on_miss });
            }
            self.emit_ref(child)?;
            self.emit(I::JumpIfMiss(on_miss));
            self.emit(I::JumpIfFailure(bail));
            ran = true;
        }
        if !ran {
            let none = self.constant(id, &Value::None)?;
            self.emit(I::Const(none));
        }
        self.emit(I::ScopeDiscard);
        self.emit(I::DropPos);
        self.emit(I::Jump(done));

        self.mark(bail);
        self.emit(I::ScopeDiscard);
        self.emit(I::PopPos);
        self.emit(I::Jump(done));

        for (label, wall, child) in wall_errors {
            self.mark(label);
            let wall = self.string(wall);
            let rule = self.string(&graph.describe(child));
            self.emit(I::WallError { wall, rule });
        }
        self.mark(done);
        Ok(())
    }

    /// Greedy repetition collecting non-empty values into a list.
    fn emit_repeat(
        &mut self,
        id: NodeId,
        rule: NodeId,
        min: usize,
        max: Option<usize>,
    ) -> CompileResult<()> {
        use Instruction as I;
        let top = self.fresh_label();
        let stop = self.fresh_label();
        let exit = self.fresh_label();
        let short = self.fresh_label();
        let fail = self.fresh_label();
        let done = self.fresh_label();
        let description = self.graph.describe(id);
        let name = self.string(&description);

        self.emit(I::PushPos);
        self.emit(I::ScopePush);
        self.emit(I::Collect);
        self.mark(top);
        self.emit(I::PushPos);
        self.emit_ref(rule)?;
        self.emit(I::JumpIfMiss(stop));
        self.emit(I::JumpIfFailure(fail));
        self.emit(I::RepeatStep { rule: name, exit });
        if let Some(max) = max {
            self.emit(I::RepeatMax {
                max: max as u32,
                exit,
            });
        }
        self.emit(I::Jump(top));

        self.mark(stop);
        self.emit(I::DropPos);
        self.mark(exit);
        self.emit(I::RepeatEnd { min: min as u32 });
        self.emit(I::JumpIfMiss(short));
        self.emit(I::ScopeMerge);
        self.emit(I::DropPos);
        self.emit(I::Jump(done));

        self.mark(short);
        self.emit(I::ScopeDiscard);
        self.emit(I::PopPos);
        self.emit(I::Jump(done));

        self.mark(fail);
        self.emit(I::DropPos);
        self.emit(I::CollectDrop);
        self.emit(I::ScopeDiscard);
        self.emit(I::PopPos);
        self.mark(done);
        Ok(())
    }

    /// Interleaved text: scan forward until `until` matches, collecting
    /// `content` matches and the plain text between them.
    fn emit_mixed(&mut self, id: NodeId, until: NodeId, content: Option<NodeId>) -> CompileResult<()> {
        use Instruction as I;
        let graph = self.graph;
        let (until_guard, content_guard) = graph.mixed_guards(id);
        let top = self.fresh_label();
        let content_label = self.fresh_label();
        let fail = self.fresh_label();
        let exit = self.fresh_label();
        let done = self.fresh_label();

        self.emit(I::PushPos);
        self.emit(I::ScopePush);
        self.emit(I::Collect);
        self.mark(top);
        self.emit(I::MixedCheck { exit });
        if let Some(set) = until_guard {
            let set = self.tables.charset(set);
            self.emit(I::Guard {
                set,
                skip: content_label,
            });
        }
        self.emit(I::PushPos);
        self.emit_ref(until)?;
        self.emit(I::PopPos);
        self.emit(I::JumpIfMatch(exit));
        self.emit(I::JumpIfFailure(fail));

        self.mark(content_label);
        match content {
            None => {
                self.emit(I::Advance);
                self.emit(I::Jump(top));
            }
            Some(content) => {
                let missed = self.fresh_label();
                let advance = self.fresh_label();
                let failed = self.fresh_label();
                if let Some(set) = content_guard {
                    let set = self.tables.charset(set);
                    self.emit(I::Guard { set, skip: advance });
                }
                let name = self.string(&graph.describe(content));
                self.emit(I::PushPos);
                self.emit_ref(content)?;
                self.emit(I::JumpIfMiss(missed));
                self.emit(I::JumpIfFailure(failed));
                self.emit(I::MixedItem(name));
                self.emit(I::Jump(top));

                self.mark(missed);
                self.emit(I::DropPos);
                self.mark(advance);
                self.emit(I::Advance);
                self.emit(I::Jump(top));

                self.mark(failed);
                self.emit(I::DropPos);
            }
        }

        self.mark(fail);
        self.emit(I::CollectDrop);
        self.emit(I::ScopeDiscard);
        self.emit(I::PopPos);
        self.emit(I::Miss);
        self.emit(I::Jump(done));

        self.mark(exit);
        self.emit(I::MixedEnd);
        self.emit(I::ScopeDiscard);
        self.emit(I::DropPos);
        self.mark(done);
        Ok(())
    }
}
