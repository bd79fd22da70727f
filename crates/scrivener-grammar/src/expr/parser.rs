//! Recursive-descent parser for action expressions.
//!
//! Precedence, loosest first: conditional (`a if c else b`), `or`, `and`,
//! `not`, comparisons and `in`, `+ -`, `* / // %`, unary `-`, postfix
//! (calls, method calls, indexing, slicing), atoms.

use std::ops::Range;

use logos::Logos;

use scrivener_core::escape;

use super::lexer::Token;
use crate::value::Value;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message} at {}..{}", span.start, span.end)]
pub struct ExprError {
    pub message: String,
    pub span: Range<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Var(String),
    List(Vec<Expr>),
    Dict(Vec<(Expr, Expr)>),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Cond {
        then: Box<Expr>,
        cond: Box<Expr>,
        otherwise: Box<Expr>,
    },
    Call {
        func: String,
        args: Vec<Arg>,
    },
    Method {
        recv: Box<Expr>,
        name: String,
        args: Vec<Arg>,
    },
    Index(Box<Expr>, Box<Expr>),
    Slice(Box<Expr>, Option<Box<Expr>>, Option<Box<Expr>>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Pos(Expr),
    Splat(Expr),
    Named(String, Expr),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    NotIn,
}

/// Parse a complete expression.
pub fn parse(source: &str) -> Result<Expr, ExprError> {
    let mut parser = Parser::new(source)?;
    let expr = parser.expr()?;
    if let Some((token, span)) = parser.peek_spanned() {
        return Err(ExprError {
            message: format!("unexpected {} after expression", token.describe()),
            span,
        });
    }
    Ok(expr)
}

struct Parser<'src> {
    tokens: Vec<(Token<'src>, Range<usize>)>,
    pos: usize,
    input: &'src str,
}

impl<'src> Parser<'src> {
    fn new(input: &'src str) -> Result<Self, ExprError> {
        let mut tokens = Vec::new();
        for (result, span) in Token::lexer(input).spanned() {
            match result {
                Ok(token) => tokens.push((token, span)),
                Err(_) => {
                    return Err(ExprError {
                        message: format!("unexpected character {:?}", &input[span.clone()]),
                        span,
                    });
                }
            }
        }
        Ok(Self {
            tokens,
            pos: 0,
            input,
        })
    }

    fn peek(&self) -> Option<Token<'src>> {
        self.tokens.get(self.pos).map(|(t, _)| *t)
    }

    fn peek_at(&self, offset: usize) -> Option<Token<'src>> {
        self.tokens.get(self.pos + offset).map(|(t, _)| *t)
    }

    fn peek_spanned(&self) -> Option<(Token<'src>, Range<usize>)> {
        self.tokens.get(self.pos).cloned()
    }

    fn advance(&mut self) -> Option<Token<'src>> {
        let token = self.peek();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, expected: Token<'src>) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: Token<'src>) -> Result<(), ExprError> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(self.error(format!("expected {}", expected.describe())))
        }
    }

    fn error(&self, message: String) -> ExprError {
        let span = match self.tokens.get(self.pos) {
            Some((token, span)) => {
                return ExprError {
                    message: format!("{message}, found {}", token.describe()),
                    span: span.clone(),
                };
            }
            None => self.input.len()..self.input.len(),
        };
        ExprError {
            message: format!("{message}, found end of expression"),
            span,
        }
    }

    fn expr(&mut self) -> Result<Expr, ExprError> {
        let then = self.or_expr()?;
        if !self.eat(Token::If) {
            return Ok(then);
        }
        let cond = self.or_expr()?;
        self.expect(Token::Else)?;
        let otherwise = self.expr()?;
        Ok(Expr::Cond {
            then: Box::new(then),
            cond: Box::new(cond),
            otherwise: Box::new(otherwise),
        })
    }

    fn or_expr(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.and_expr()?;
        while self.eat(Token::Or) {
            let rhs = self.and_expr()?;
            lhs = Expr::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn and_expr(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.not_expr()?;
        while self.eat(Token::And) {
            let rhs = self.not_expr()?;
            lhs = Expr::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn not_expr(&mut self) -> Result<Expr, ExprError> {
        if self.eat(Token::Not) {
            let operand = self.not_expr()?;
            return Ok(Expr::Unary(UnaryOp::Not, Box::new(operand)));
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.additive()?;
        loop {
            let op = match self.peek() {
                Some(Token::EqEq) => BinaryOp::Eq,
                Some(Token::NotEq) => BinaryOp::Ne,
                Some(Token::Lt) => BinaryOp::Lt,
                Some(Token::Le) => BinaryOp::Le,
                Some(Token::Gt) => BinaryOp::Gt,
                Some(Token::Ge) => BinaryOp::Ge,
                Some(Token::In) => BinaryOp::In,
                Some(Token::Not) if self.peek_at(1) == Some(Token::In) => {
                    self.pos += 1;
                    BinaryOp::NotIn
                }
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.additive()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn additive(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.multiplicative()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn multiplicative(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash | Token::SlashSlash) => BinaryOp::Div,
                Some(Token::Percent) => BinaryOp::Mod,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.unary()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn unary(&mut self) -> Result<Expr, ExprError> {
        if self.eat(Token::Minus) {
            let operand = self.unary()?;
            // Fold so that `-5` round-trips as a literal.
            if let Expr::Literal(Value::Int(n)) = operand {
                return Ok(Expr::Literal(Value::Int(-n)));
            }
            return Ok(Expr::Unary(UnaryOp::Neg, Box::new(operand)));
        }
        if self.eat(Token::Plus) {
            return self.unary();
        }
        self.postfix()
    }

    fn postfix(&mut self) -> Result<Expr, ExprError> {
        let mut expr = self.atom()?;
        loop {
            match self.peek() {
                Some(Token::LParen) => {
                    let Expr::Var(func) = expr else {
                        return Err(self.error("only named functions can be called".into()));
                    };
                    self.pos += 1;
                    let args = self.call_args()?;
                    expr = Expr::Call { func, args };
                }
                Some(Token::Dot) => {
                    self.pos += 1;
                    let Some(Token::Ident(name)) = self.advance() else {
                        self.pos -= 1;
                        return Err(self.error("expected method name".into()));
                    };
                    self.expect(Token::LParen)?;
                    let args = self.call_args()?;
                    expr = Expr::Method {
                        recv: Box::new(expr),
                        name: name.to_string(),
                        args,
                    };
                }
                Some(Token::LBracket) => {
                    self.pos += 1;
                    expr = self.subscript(expr)?;
                }
                _ => return Ok(expr),
            }
        }
    }

    /// After `[`: an index or a slice, through the closing `]`.
    fn subscript(&mut self, base: Expr) -> Result<Expr, ExprError> {
        let start = if self.peek() == Some(Token::Colon) {
            None
        } else {
            Some(Box::new(self.expr()?))
        };
        if !self.eat(Token::Colon) {
            self.expect(Token::RBracket)?;
            let index = start.ok_or_else(|| self.error("expected index".into()))?;
            return Ok(Expr::Index(Box::new(base), index));
        }
        let end = if self.peek() == Some(Token::RBracket) {
            None
        } else {
            Some(Box::new(self.expr()?))
        };
        self.expect(Token::RBracket)?;
        Ok(Expr::Slice(Box::new(base), start, end))
    }

    /// After `(`: arguments through the closing `)`.
    fn call_args(&mut self) -> Result<Vec<Arg>, ExprError> {
        let mut args = Vec::new();
        while !self.eat(Token::RParen) {
            if self.eat(Token::Star) {
                args.push(Arg::Splat(self.expr()?));
            } else if let (Some(Token::Ident(name)), Some(Token::Assign)) =
                (self.peek(), self.peek_at(1))
            {
                self.pos += 2;
                args.push(Arg::Named(name.to_string(), self.expr()?));
            } else {
                args.push(Arg::Pos(self.expr()?));
            }
            if !self.eat(Token::Comma) {
                self.expect(Token::RParen)?;
                break;
            }
        }
        Ok(args)
    }

    fn atom(&mut self) -> Result<Expr, ExprError> {
        let Some((token, span)) = self.peek_spanned() else {
            return Err(self.error("expected expression".into()));
        };
        self.pos += 1;
        match token {
            Token::None => Ok(Expr::Literal(Value::None)),
            Token::True => Ok(Expr::Literal(Value::Bool(true))),
            Token::False => Ok(Expr::Literal(Value::Bool(false))),
            Token::Int(text) => text
                .parse::<i64>()
                .map(|n| Expr::Literal(Value::Int(n)))
                .map_err(|_| ExprError {
                    message: format!("integer literal `{text}` out of range"),
                    span,
                }),
            Token::HexInt(text) => i64::from_str_radix(&text[2..], 16)
                .map(|n| Expr::Literal(Value::Int(n)))
                .map_err(|_| ExprError {
                    message: format!("integer literal `{text}` out of range"),
                    span,
                }),
            Token::Str(text) => {
                let mut value = unquote(text, span)?;
                // Adjacent literals concatenate.
                while let Some((Token::Str(next), next_span)) = self.peek_spanned() {
                    self.pos += 1;
                    value.push_str(&unquote(next, next_span)?);
                }
                Ok(Expr::Literal(Value::Str(value)))
            }
            Token::Ident(name) => Ok(Expr::Var(name.to_string())),
            Token::LParen => self.paren(),
            Token::LBracket => {
                let items = self.items(Token::RBracket)?;
                Ok(Expr::List(items))
            }
            Token::LBrace => self.dict(),
            other => {
                self.pos -= 1;
                Err(self.error(format!("unexpected {}", other.describe())))
            }
        }
    }

    /// After `(`: a parenthesized expression or a tuple (evaluated as a list).
    fn paren(&mut self) -> Result<Expr, ExprError> {
        if self.eat(Token::RParen) {
            return Ok(Expr::List(Vec::new()));
        }
        let first = self.expr()?;
        if self.eat(Token::RParen) {
            return Ok(first);
        }
        self.expect(Token::Comma)?;
        let mut items = vec![first];
        items.extend(self.items(Token::RParen)?);
        Ok(Expr::List(items))
    }

    /// Comma-separated expressions through `close`, trailing comma allowed.
    fn items(&mut self, close: Token<'src>) -> Result<Vec<Expr>, ExprError> {
        let mut items = Vec::new();
        while !self.eat(close) {
            items.push(self.expr()?);
            if !self.eat(Token::Comma) {
                self.expect(close)?;
                break;
            }
        }
        Ok(items)
    }

    fn dict(&mut self) -> Result<Expr, ExprError> {
        let mut entries = Vec::new();
        while !self.eat(Token::RBrace) {
            let key = self.expr()?;
            self.expect(Token::Colon)?;
            let value = self.expr()?;
            entries.push((key, value));
            if !self.eat(Token::Comma) {
                self.expect(Token::RBrace)?;
                break;
            }
        }
        Ok(Expr::Dict(entries))
    }
}

fn unquote(text: &str, span: Range<usize>) -> Result<String, ExprError> {
    let body = &text[1..text.len() - 1];
    escape::unescape(body).map_err(|e| ExprError {
        message: e.to_string(),
        span,
    })
}
