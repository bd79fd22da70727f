//! Deduplicating operand-table builder.

use scrivener_bytecode::{CharSetId, ConstId, Constant, ExprId, RegexId, StrId, Tables};
use scrivener_core::{CharSet, Interner};
use scrivener_grammar::Value;

/// Interns every operand the emitter references, handing out typed ids.
#[derive(Default)]
pub struct TableBuilder {
    strings: Interner<String>,
    charsets: Interner<CharSet>,
    regexes: Interner<String>,
    exprs: Interner<String>,
    consts: Interner<Constant>,
}

impl TableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn string(&mut self, s: &str) -> StrId {
        StrId(self.strings.intern_str(s).as_u32())
    }

    pub fn charset(&mut self, set: &CharSet) -> CharSetId {
        CharSetId(self.charsets.intern(set.clone()).as_u32())
    }

    pub fn regex(&mut self, pattern: &str) -> RegexId {
        RegexId(self.regexes.intern_str(pattern).as_u32())
    }

    pub fn expr(&mut self, source: &str) -> ExprId {
        ExprId(self.exprs.intern_str(source).as_u32())
    }

    /// Intern a value as a constant. Returns the value's type name when it
    /// has no literal form.
    pub fn constant(&mut self, value: &Value) -> Result<ConstId, &'static str> {
        let constant = match value {
            Value::Empty => Constant::Empty,
            other => Constant::Literal(other.to_literal().ok_or(other.type_name())?),
        };
        Ok(ConstId(self.consts.intern(constant).as_u32()))
    }

    pub fn finish(self) -> Tables {
        Tables {
            strings: self.strings.into_vec(),
            charsets: self.charsets.into_vec(),
            regexes: self.regexes.into_vec(),
            exprs: self.exprs.into_vec(),
            consts: self.consts.into_vec(),
        }
    }
}
