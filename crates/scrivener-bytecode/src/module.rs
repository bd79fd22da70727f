//! In-memory compiled module.

use indexmap::IndexMap;

use scrivener_core::CharSet;

use super::ids::{CharSetId, ConstId, ExprId, RegexId, RoutineId, StrId};
use super::instructions::Instruction;
use super::verify::{self, VerifyError};

/// A constant carried by the module.
///
/// Literals hold expression-language source evaluated once at load time.
/// `Empty` has no literal form and is stored as itself.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Constant {
    Empty,
    Literal(String),
}

/// Deduplicated operand tables, indexed by the typed ids.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Tables {
    pub strings: Vec<String>,
    pub charsets: Vec<CharSet>,
    pub regexes: Vec<String>,
    pub exprs: Vec<String>,
    pub consts: Vec<Constant>,
}

impl Tables {
    pub fn string(&self, id: StrId) -> &str {
        &self.strings[id.index()]
    }

    pub fn charset(&self, id: CharSetId) -> &CharSet {
        &self.charsets[id.index()]
    }

    pub fn regex(&self, id: RegexId) -> &str {
        &self.regexes[id.index()]
    }

    pub fn expr(&self, id: ExprId) -> &str {
        &self.exprs[id.index()]
    }

    pub fn constant(&self, id: ConstId) -> &Constant {
        &self.consts[id.index()]
    }
}

/// A callable block of code.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Routine {
    name: String,
    /// Deepest saved-position stack the routine builds.
    slots: u32,
    /// Body of a named rule; activations count against the recursion limit.
    rule: bool,
    code: Vec<Instruction>,
}

impl Routine {
    pub fn new(name: impl Into<String>, code: Vec<Instruction>) -> Self {
        Self {
            name: name.into(),
            slots: 0,
            rule: false,
            code,
        }
    }

    /// Mark the routine as the body of a named rule.
    pub fn rule(mut self, rule: bool) -> Self {
        self.rule = rule;
        self
    }

    pub fn is_rule(&self) -> bool {
        self.rule
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn slots(&self) -> u32 {
        self.slots
    }

    pub fn code(&self) -> &[Instruction] {
        &self.code
    }
}

/// A verified compiled module.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Module {
    tables: Tables,
    routines: Vec<Routine>,
    entries: IndexMap<String, RoutineId>,
    /// Entry name of the main rule.
    main: String,
}

impl Module {
    /// Assemble and verify a module. Slot counts are computed here.
    pub fn new(
        tables: Tables,
        routines: Vec<Routine>,
        entries: IndexMap<String, RoutineId>,
        main: impl Into<String>,
    ) -> Result<Self, VerifyError> {
        let mut module = Module {
            tables,
            routines,
            entries,
            main: main.into(),
        };
        let slots = verify::verify(&module)?;
        for (routine, slots) in module.routines.iter_mut().zip(slots) {
            routine.slots = slots;
        }
        Ok(module)
    }

    pub fn tables(&self) -> &Tables {
        &self.tables
    }

    pub fn routines(&self) -> &[Routine] {
        &self.routines
    }

    pub fn routine(&self, id: RoutineId) -> &Routine {
        &self.routines[id.index()]
    }

    /// Rule name to routine, in grammar order.
    pub fn entries(&self) -> &IndexMap<String, RoutineId> {
        &self.entries
    }

    pub fn entry(&self, name: &str) -> Option<RoutineId> {
        self.entries.get(name).copied()
    }

    /// The main rule's routine. Verification guarantees the entry exists.
    pub fn main(&self) -> RoutineId {
        self.entries[self.main.as_str()]
    }

    pub fn main_name(&self) -> &str {
        &self.main
    }

    /// Total instruction count over all routines.
    pub fn code_len(&self) -> usize {
        self.routines.iter().map(|r| r.code.len()).sum()
    }
}
