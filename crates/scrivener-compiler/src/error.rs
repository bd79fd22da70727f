//! Compilation errors.

use scrivener_bytecode::VerifyError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompileError {
    /// A constant with no literal form, such as a rule value.
    #[error("rule `{rule}` carries a {found} constant that cannot be compiled")]
    UnsupportedConstant { rule: String, found: &'static str },

    #[error("label {0} was referenced but never placed")]
    UnplacedLabel(u32),

    #[error("emitted code failed verification: {0}")]
    Verify(#[from] VerifyError),
}

pub type CompileResult<T> = Result<T, CompileError>;
