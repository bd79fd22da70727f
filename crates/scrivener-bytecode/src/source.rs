//! Textual module sources.
//!
//! ```text
//! .module v1 crc32 0x<checksum>
//! .strings 1
//!   s0 "ab"
//! .charsets 0
//! .regexes 0
//! .exprs 0
//! .consts 0
//! .routines 1
//! .routine p0 "main" slots 0 rule
//!   @0 literal s0
//!   @1 ret
//! .entries 1
//!   "main" p0
//! .main "main"
//! ```
//!
//! The checksum covers every byte after the header line. `;` starts a
//! comment that runs to the end of the line.

use std::fmt::Write as _;

use indexmap::IndexMap;
use logos::Logos;

use scrivener_core::escape::{self, EscapeError};
use scrivener_core::CharSet;

use super::ids::{Addr, CharSetId, ConstId, ExprId, RegexId, RoutineId, StrId};
use super::instructions::Instruction;
use super::module::{Constant, Module, Routine, Tables};
use super::verify::VerifyError;

/// Format version written to and accepted from module headers.
pub const VERSION: u32 = 1;

const HEADER_TAG: &str = ".module";

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModuleError {
    #[error("missing `.module` header")]
    MissingHeader,

    #[error("malformed header: {0}")]
    BadHeader(String),

    #[error("unsupported module version {0}, expected {VERSION}")]
    UnsupportedVersion(String),

    #[error("checksum mismatch: header says {expected:#010x}, body is {actual:#010x}")]
    ChecksumMismatch { expected: u32, actual: u32 },

    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("line {line}: unknown instruction `{name}`")]
    UnknownInstruction { line: usize, name: String },

    #[error("line {line}: {error}")]
    Escape { line: usize, error: EscapeError },

    #[error("routine `{routine}` declares {declared} slots but needs {needed}")]
    SlotMismatch {
        routine: String,
        declared: u32,
        needed: u32,
    },

    #[error(transparent)]
    Verify(#[from] VerifyError),
}

impl Module {
    /// Render the module as source text with a checksummed header.
    pub fn to_source(&self) -> String {
        let body = self.render_body();
        let checksum = crc32fast::hash(body.as_bytes());
        format!("{HEADER_TAG} v{VERSION} crc32 {checksum:#010x}\n{body}")
    }

    /// Load a module from source text, verifying checksum and code.
    pub fn from_source(source: &str) -> Result<Module, ModuleError> {
        let (header, body) = source.split_once('\n').unwrap_or((source, ""));
        let expected = parse_header(header)?;
        let actual = crc32fast::hash(body.as_bytes());
        if expected != actual {
            return Err(ModuleError::ChecksumMismatch { expected, actual });
        }
        // Line numbers count the header.
        Reader::new(body, 2).module()
    }

    fn render_body(&self) -> String {
        let tables = self.tables();
        let mut out = String::new();

        let _ = writeln!(out, ".strings {}", tables.strings.len());
        for (i, s) in tables.strings.iter().enumerate() {
            let _ = writeln!(out, "  {} {}", StrId(i as u32), escape::quote(s));
        }
        let _ = writeln!(out, ".charsets {}", tables.charsets.len());
        for (i, set) in tables.charsets.iter().enumerate() {
            let _ = writeln!(out, "  {} {}", CharSetId(i as u32), escape::quote(&set.to_text()));
        }
        let _ = writeln!(out, ".regexes {}", tables.regexes.len());
        for (i, source) in tables.regexes.iter().enumerate() {
            let _ = writeln!(out, "  {} {}", RegexId(i as u32), escape::quote(source));
        }
        let _ = writeln!(out, ".exprs {}", tables.exprs.len());
        for (i, source) in tables.exprs.iter().enumerate() {
            let _ = writeln!(out, "  {} {}", ExprId(i as u32), escape::quote(source));
        }
        let _ = writeln!(out, ".consts {}", tables.consts.len());
        for (i, constant) in tables.consts.iter().enumerate() {
            let text = match constant {
                Constant::Empty => "empty".to_string(),
                Constant::Literal(source) => escape::quote(source),
            };
            let _ = writeln!(out, "  {} {text}", ConstId(i as u32));
        }

        let _ = writeln!(out, ".routines {}", self.routines().len());
        for (i, routine) in self.routines().iter().enumerate() {
            let _ = writeln!(
                out,
                ".routine {} {} slots {}{}",
                RoutineId(i as u32),
                escape::quote(routine.name()),
                routine.slots(),
                if routine.is_rule() { " rule" } else { "" }
            );
            for (addr, instr) in routine.code().iter().enumerate() {
                let _ = writeln!(out, "  {} {instr}", Addr(addr as u32));
            }
        }

        let _ = writeln!(out, ".entries {}", self.entries().len());
        for (name, id) in self.entries() {
            let _ = writeln!(out, "  {} {id}", escape::quote(name));
        }
        let _ = writeln!(out, ".main {}", escape::quote(self.main_name()));
        out
    }
}

fn parse_header(line: &str) -> Result<u32, ModuleError> {
    let mut words = line.split_whitespace();
    if words.next() != Some(HEADER_TAG) {
        return Err(ModuleError::MissingHeader);
    }
    let version = words
        .next()
        .ok_or_else(|| ModuleError::BadHeader("missing version".into()))?;
    if version != format!("v{VERSION}") {
        return Err(ModuleError::UnsupportedVersion(version.to_string()));
    }
    if words.next() != Some("crc32") {
        return Err(ModuleError::BadHeader("expected `crc32`".into()));
    }
    let checksum = words
        .next()
        .and_then(|word| word.strip_prefix("0x"))
        .and_then(|hex| u32::from_str_radix(hex, 16).ok())
        .ok_or_else(|| ModuleError::BadHeader("expected a hex checksum".into()))?;
    if let Some(extra) = words.next() {
        return Err(ModuleError::BadHeader(format!("unexpected `{extra}`")));
    }
    Ok(checksum)
}

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip(r"([ \t\r\n]+|;[^\n]*)", allow_greedy = true))]
enum Token<'src> {
    #[regex(r"\.[a-z]+", |lex| &lex.slice()[1..])]
    Directive(&'src str),

    #[regex(r"[a-z_]+", |lex| lex.slice())]
    Word(&'src str),

    /// A table or routine reference: sigil letter and index.
    #[regex(r"[a-z][0-9]+", |lex| parse_ref(lex.slice()))]
    Ref((char, u32)),

    #[regex(r"@[0-9]+", |lex| lex.slice()[1..].parse::<u32>().ok())]
    Addr(u32),

    #[regex(r"[0-9]+", |lex| lex.slice().parse::<u32>().ok())]
    Int(u32),

    #[regex(r#""([^"\\]|\\.)*""#, |lex| lex.slice())]
    Str(&'src str),
}

fn parse_ref(text: &str) -> Option<(char, u32)> {
    let mut chars = text.chars();
    let sigil = chars.next()?;
    Some((sigil, chars.as_str().parse().ok()?))
}

impl Token<'_> {
    fn describe(&self) -> String {
        match self {
            Token::Directive(d) => format!("`.{d}`"),
            Token::Word(w) => format!("`{w}`"),
            Token::Ref((sigil, index)) => format!("`{sigil}{index}`"),
            Token::Addr(a) => format!("`@{a}`"),
            Token::Int(n) => format!("`{n}`"),
            Token::Str(s) => s.to_string(),
        }
    }
}

/// Recursive-descent reader over the body tokens.
struct Reader<'src> {
    source: &'src str,
    tokens: Vec<(Result<Token<'src>, ()>, usize)>,
    next: usize,
    first_line: usize,
}

impl<'src> Reader<'src> {
    fn new(source: &'src str, first_line: usize) -> Self {
        let tokens = Token::lexer(source)
            .spanned()
            .map(|(token, span)| (token, span.start))
            .collect();
        Self {
            source,
            tokens,
            next: 0,
            first_line,
        }
    }

    /// Line of the most recently consumed token.
    fn line(&self) -> usize {
        let offset = self
            .tokens
            .get(self.next.saturating_sub(1))
            .map_or(0, |(_, offset)| *offset);
        self.first_line + self.source[..offset].matches('\n').count()
    }

    fn error(&self, message: impl Into<String>) -> ModuleError {
        ModuleError::Syntax {
            line: self.line(),
            message: message.into(),
        }
    }

    fn bump(&mut self) -> Result<Token<'src>, ModuleError> {
        match self.tokens.get(self.next) {
            Some((Ok(token), _)) => {
                self.next += 1;
                Ok(*token)
            }
            Some((Err(()), offset)) => {
                let rest: String = self.source[*offset..].chars().take(12).collect();
                Err(self.error(format!("unexpected input {rest:?}")))
            }
            None => Err(self.error("unexpected end of module")),
        }
    }

    fn peek(&self) -> Option<Token<'src>> {
        match self.tokens.get(self.next) {
            Some((Ok(token), _)) => Some(*token),
            _ => None,
        }
    }

    fn unexpected(&self, token: Token<'_>, wanted: &str) -> ModuleError {
        self.error(format!("expected {wanted}, found {}", token.describe()))
    }

    fn directive(&mut self, name: &str) -> Result<(), ModuleError> {
        match self.bump()? {
            Token::Directive(d) if d == name => Ok(()),
            other => Err(self.unexpected(other, &format!("`.{name}`"))),
        }
    }

    fn word(&mut self, word: &str) -> Result<(), ModuleError> {
        match self.bump()? {
            Token::Word(w) if w == word => Ok(()),
            other => Err(self.unexpected(other, &format!("`{word}`"))),
        }
    }

    fn int(&mut self) -> Result<u32, ModuleError> {
        match self.bump()? {
            Token::Int(n) => Ok(n),
            other => Err(self.unexpected(other, "a number")),
        }
    }

    fn addr(&mut self) -> Result<Addr, ModuleError> {
        match self.bump()? {
            Token::Addr(a) => Ok(Addr(a)),
            other => Err(self.unexpected(other, "an address")),
        }
    }

    fn string(&mut self) -> Result<String, ModuleError> {
        match self.bump()? {
            Token::Str(quoted) => {
                let body = &quoted[1..quoted.len() - 1];
                escape::unescape(body).map_err(|error| ModuleError::Escape {
                    line: self.line(),
                    error,
                })
            }
            other => Err(self.unexpected(other, "a string")),
        }
    }

    fn reference(&mut self, sigil: char) -> Result<u32, ModuleError> {
        match self.bump()? {
            Token::Ref((s, index)) if s == sigil => Ok(index),
            other => Err(self.unexpected(other, &format!("a `{sigil}` reference"))),
        }
    }

    /// A table declaration: `.name N` then N entries labelled in order.
    fn table<T>(
        &mut self,
        name: &str,
        sigil: char,
        mut entry: impl FnMut(&mut Self) -> Result<T, ModuleError>,
    ) -> Result<Vec<T>, ModuleError> {
        self.directive(name)?;
        let count = self.int()?;
        let mut items = Vec::with_capacity(count as usize);
        for expected in 0..count {
            let index = self.reference(sigil)?;
            if index != expected {
                return Err(self.error(format!("expected {sigil}{expected}, found {sigil}{index}")));
            }
            items.push(entry(self)?);
        }
        Ok(items)
    }

    fn module(mut self) -> Result<Module, ModuleError> {
        let strings = self.table("strings", StrId::PREFIX, Self::string)?;
        let charsets = self.table("charsets", CharSetId::PREFIX, |r| {
            Ok(CharSet::from(r.string()?.as_str()))
        })?;
        let regexes = self.table("regexes", RegexId::PREFIX, Self::string)?;
        let exprs = self.table("exprs", ExprId::PREFIX, Self::string)?;
        let consts = self.table("consts", ConstId::PREFIX, Self::constant)?;

        self.directive("routines")?;
        let count = self.int()?;
        let mut routines = Vec::with_capacity(count as usize);
        let mut declared_slots = Vec::with_capacity(count as usize);
        for expected in 0..count {
            self.directive("routine")?;
            let index = self.reference(RoutineId::PREFIX)?;
            if index != expected {
                return Err(self.error(format!("expected p{expected}, found p{index}")));
            }
            let name = self.string()?;
            self.word("slots")?;
            declared_slots.push(self.int()?);
            let rule = self.peek() == Some(Token::Word("rule"));
            if rule {
                self.next += 1;
            }
            routines.push(Routine::new(name, self.code()?).rule(rule));
        }

        self.directive("entries")?;
        let count = self.int()?;
        let mut entries = IndexMap::with_capacity(count as usize);
        for _ in 0..count {
            let name = self.string()?;
            let id = RoutineId(self.reference(RoutineId::PREFIX)?);
            entries.insert(name, id);
        }
        self.directive("main")?;
        let main = self.string()?;
        if let Some(token) = self.peek() {
            return Err(self.unexpected(token, "end of module"));
        }
        if self.next < self.tokens.len() {
            self.bump()?;
        }

        let tables = Tables {
            strings,
            charsets,
            regexes,
            exprs,
            consts,
        };
        let module = Module::new(tables, routines, entries, main)?;
        for (routine, declared) in module.routines().iter().zip(declared_slots) {
            if routine.slots() != declared {
                return Err(ModuleError::SlotMismatch {
                    routine: routine.name().to_string(),
                    declared,
                    needed: routine.slots(),
                });
            }
        }
        Ok(module)
    }

    fn constant(&mut self) -> Result<Constant, ModuleError> {
        match self.peek() {
            Some(Token::Word("empty")) => {
                self.next += 1;
                Ok(Constant::Empty)
            }
            _ => Ok(Constant::Literal(self.string()?)),
        }
    }

    /// Instructions up to the next directive, each labelled with its address.
    fn code(&mut self) -> Result<Vec<Instruction>, ModuleError> {
        let mut code = Vec::new();
        while let Some(Token::Addr(addr)) = self.peek() {
            if addr as usize != code.len() {
                return Err(self.error(format!("expected @{}, found @{addr}", code.len())));
            }
            self.next += 1;
            code.push(self.instruction()?);
        }
        Ok(code)
    }

    fn instruction(&mut self) -> Result<Instruction, ModuleError> {
        use Instruction as I;
        let line = self.line();
        let name = match self.bump()? {
            Token::Word(name) => name,
            other => return Err(self.unexpected(other, "an instruction")),
        };
        let s = |r: &mut Self| r.reference(StrId::PREFIX).map(StrId);
        let k = |r: &mut Self| r.reference(ConstId::PREFIX).map(ConstId);
        let e = |r: &mut Self| r.reference(ExprId::PREFIX).map(ExprId);

        let instr = match name {
            "any" => I::Any,
            "alphanum" => I::AlphaNum,
            "stream_start" => I::StreamStart,
            "line_start" => I::LineStart,
            "line_end" => I::LineEnd,
            "stream_end" => I::StreamEnd,
            "block_break" => I::BlockBreak,
            "empty" => I::Empty,
            "literal" => I::Literal(s(self)?),
            "among" => I::Among(CharSetId(self.reference(CharSetId::PREFIX)?)),
            "regex" => I::Regex(RegexId(self.reference(RegexId::PREFIX)?)),
            "const" => I::Const(k(self)?),
            "put" => I::Put {
                name: s(self)?,
                value: k(self)?,
            },
            "get" => I::Get {
                name: s(self)?,
                default: k(self)?,
            },
            "do" => I::Do(e(self)?),
            "do_code" => I::DoCode(e(self)?),
            "if" => I::If(e(self)?),
            "if_code" => I::IfCode(e(self)?),
            "code" => I::Code(s(self)?),
            "args" => I::Args,
            "miss" => I::Miss,
            "jump" => I::Jump(self.addr()?),
            "jump_miss" => I::JumpIfMiss(self.addr()?),
            "jump_match" => I::JumpIfMatch(self.addr()?),
            "jump_failure" => I::JumpIfFailure(self.addr()?),
            "guard" => I::Guard {
                set: CharSetId(self.reference(CharSetId::PREFIX)?),
                skip: self.addr()?,
            },
            "call" => I::Call(RoutineId(self.reference(RoutineId::PREFIX)?)),
            "ret" => I::Ret,
            "push_pos" => I::PushPos,
            "pop_pos" => I::PopPos,
            "drop_pos" => I::DropPos,
            "scope_push" => I::ScopePush,
            "scope_merge" => I::ScopeMerge,
            "scope_discard" => I::ScopeDiscard,
            "bind_params" => {
                let count = self.int()?;
                let pairs = (0..count)
                    .map(|_| Ok((s(self)?, e(self)?)))
                    .collect::<Result<_, ModuleError>>()?;
                I::BindParams(pairs)
            }
            "not" => I::Not,
            "peek" => I::Peek,
            "fail_if" => I::FailIf,
            "opt" => I::Opt,
            "replace" => I::Replace(k(self)?),
            "take" => I::Take,
            "bind" => I::Bind(s(self)?),
            "extent" => I::Extent(s(self)?),
            "behind" => I::Behind {
                len: self.int()?,
                miss: self.addr()?,
            },
            "behind_end" => I::BehindEnd,
            "collect" => I::Collect,
            "repeat_step" => I::RepeatStep {
                rule: s(self)?,
                exit: self.addr()?,
            },
            "repeat_max" => I::RepeatMax {
                max: self.int()?,
                exit: self.addr()?,
            },
            "repeat_end" => I::RepeatEnd { min: self.int()? },
            "collect_drop" => I::CollectDrop,
            "mixed_check" => I::MixedCheck { exit: self.addr()? },
            "mixed_item" => I::MixedItem(s(self)?),
            "advance" => I::Advance,
            "mixed_end" => I::MixedEnd,
            "wall_error" => I::WallError {
                wall: s(self)?,
                rule: s(self)?,
            },
            other => {
                return Err(ModuleError::UnknownInstruction {
                    line,
                    name: other.to_string(),
                });
            }
        };
        Ok(instr)
    }
}
