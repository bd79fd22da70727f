//! Typed indices into module tables.

use std::fmt;

macro_rules! table_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u32);

        impl $name {
            /// Sigil used for this id in module sources.
            pub const PREFIX: char = $prefix;

            #[inline]
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}{}", $prefix, self.0)
            }
        }
    };
}

table_id!(
    /// Index into the string table.
    StrId,
    's'
);
table_id!(
    /// Index into the char-set table.
    CharSetId,
    'c'
);
table_id!(
    /// Index into the regex-source table.
    RegexId,
    'x'
);
table_id!(
    /// Index into the expression-source table.
    ExprId,
    'e'
);
table_id!(
    /// Index into the constant table.
    ConstId,
    'k'
);
table_id!(
    /// Index into the routine list.
    RoutineId,
    'p'
);

/// Instruction address within a routine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Addr(pub u32);

impl Addr {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Addr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}
