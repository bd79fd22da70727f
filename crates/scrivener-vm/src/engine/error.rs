//! Errors raised while loading a module into a program.

use scrivener_grammar::RuleError;
use scrivener_grammar::expr::EvalStrError;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LoadError {
    #[error("regex x{index}: {error}")]
    Regex { index: usize, error: RuleError },

    #[error("expression e{index}: {error}")]
    Expr { index: usize, error: RuleError },

    #[error("constant k{index} `{source_text}`: {error}")]
    Constant {
        index: usize,
        source_text: String,
        error: EvalStrError,
    },
}
