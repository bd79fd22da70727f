//! Tokens of the action expression language.

use logos::Logos;

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n]+")]
pub enum Token<'src> {
    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[token("[")]
    LBracket,

    #[token("]")]
    RBracket,

    #[token("{")]
    LBrace,

    #[token("}")]
    RBrace,

    #[token(",")]
    Comma,

    #[token(":")]
    Colon,

    #[token(".")]
    Dot,

    #[token("=")]
    Assign,

    #[token("+")]
    Plus,

    #[token("-")]
    Minus,

    #[token("*")]
    Star,

    #[token("/")]
    Slash,

    #[token("//")]
    SlashSlash,

    #[token("%")]
    Percent,

    #[token("==")]
    EqEq,

    #[token("!=")]
    NotEq,

    #[token("<")]
    Lt,

    #[token("<=")]
    Le,

    #[token(">")]
    Gt,

    #[token(">=")]
    Ge,

    #[token("None")]
    None,

    #[token("True")]
    True,

    #[token("False")]
    False,

    #[token("and")]
    And,

    #[token("or")]
    Or,

    #[token("not")]
    Not,

    #[token("if")]
    If,

    #[token("else")]
    Else,

    #[token("in")]
    In,

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice())]
    Ident(&'src str),

    #[regex(r"0[xX][0-9a-fA-F]+", |lex| lex.slice())]
    HexInt(&'src str),

    #[regex(r"[0-9]+", |lex| lex.slice())]
    Int(&'src str),

    #[regex(r#""([^"\\]|\\.)*""#, |lex| lex.slice())]
    #[regex(r#"'([^'\\]|\\.)*'"#, |lex| lex.slice())]
    Str(&'src str),
}

impl Token<'_> {
    /// Human-readable form for error messages.
    pub fn describe(&self) -> String {
        match self {
            Token::Ident(s) | Token::HexInt(s) | Token::Int(s) | Token::Str(s) => {
                format!("`{s}`")
            }
            other => format!("{other:?}"),
        }
    }
}
