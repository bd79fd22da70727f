//! The grammar-definition language, assembled directly from rule primitives.
//!
//! Parsing a grammar file with [`parser`] yields `[imports, rules]`, which
//! [`Grammar::from_value`] turns into a grammar ready to be snapped.
//!
//! ```text
//! import common.text as t
//!
//! # comments run to the end of the line
//! greeting = "hello" hspace+ <alphanum+>:who -> {"who": who}
//! list(sep) = item (?(sep == ",") "," item)*
//! ```

use std::sync::OnceLock;

use crate::engine::ParseError;
use crate::grammar::{Grammar, GrammarError, Library};
use crate::parser::Parser;
use crate::rule::{Rule, RuleError};
use crate::value::Value;

/// Name of the bootstrap grammar's entry rule.
pub const MAIN: &str = "grammar";

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LoadError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Grammar(#[from] GrammarError),

    #[error(transparent)]
    Snap(#[from] crate::graph::SnapError),
}

/// The shared bootstrap parser.
pub fn parser() -> &'static Parser {
    static PARSER: OnceLock<Parser> = OnceLock::new();
    PARSER.get_or_init(|| {
        let grammar = grammar().expect("bootstrap rules are well formed");
        Parser::new(grammar, MAIN).expect("bootstrap grammar snaps")
    })
}

/// Parse grammar-definition text into a [`Grammar`].
pub fn parse_grammar(text: &str) -> Result<Grammar, LoadError> {
    let value = parser().parse(text)?;
    Ok(Grammar::from_value(value)?)
}

/// Parse grammar-definition text and snap it with `main` as entry rule.
pub fn load(text: &str, main: &str) -> Result<Parser, LoadError> {
    load_with_library(text, main, &Library::new())
}

pub fn load_with_library(text: &str, main: &str, library: &Library) -> Result<Parser, LoadError> {
    let grammar = parse_grammar(text)?;
    Ok(Parser::with_library(grammar, main, library)?)
}

fn c(name: &str) -> Rule {
    Rule::call(name)
}

fn act(source: &str) -> Result<Rule, RuleError> {
    Rule::do_expr(source)
}

/// `open`, a wall, a bound action body, `)`, then `ctor(code)`.
fn action(open: &str, ctor: &str) -> Result<Rule, RuleError> {
    Ok(open
        + Rule::wall(open)
        + Rule::bind("code", Rule::code(")"))
        + ")"
        + act(&format!("{ctor}(code)"))?)
}

/// The bootstrap grammar's rules.
pub fn grammar() -> Result<Grammar, RuleError> {
    let none = || Rule::value(Value::None);

    let grammar = Grammar::new()
        // Layout
        .with("comment", Rule::regex("#[^\n]*")?)
        .with("hspace", Rule::regex("[ \t]|#[^\n]*")?)
        .with("hspaces", Rule::star(c("hspace")))
        .with("vspace", Rule::regex("\r\n|[\r\n]")?)
        .with("vspaces", Rule::star(c("vspace")))
        .with("ws", Rule::star(c("hspace") | c("vspace") | c("comment")))
        .with("emptyline", c("hspaces") + (c("vspace") | Rule::stream_end()))
        .with("emptylines", Rule::star(c("emptyline")))
        .with("indent", c("emptylines") + Rule::regex("[ \t]+")?)
        .with(
            "noindent",
            c("emptylines") + Rule::not(Rule::peek(Rule::regex("[ \t]+")?)),
        )
        // Numbers
        .with("digit", Rule::among("0123456789"))
        .with("hexdigit", Rule::among("0123456789ABCDEFabcdef"))
        .with(
            "decnum",
            Rule::bind("ds", Rule::take(Rule::plus(c("digit")))) + act("int(ds)")?,
        )
        .with(
            "hexnum",
            "0x" + Rule::bind("xs", Rule::take(Rule::plus(c("hexdigit")))) + act("int(xs, 16)")?,
        )
        .with("barenum", c("hexnum") | c("decnum"))
        .with(
            "number",
            ("-" + Rule::bind("x", c("barenum")) + act("-x")?) | c("barenum"),
        )
        // Strings
        .with(
            "escchar",
            "\\"
                + (("n" + Rule::value("\n"))
                    | ("r" + Rule::value("\r"))
                    | ("t" + Rule::value("\t"))
                    | ("b" + Rule::value("\u{8}"))
                    | ("f" + Rule::value("\u{c}"))
                    | ("x"
                        + Rule::bind("x", Rule::take(Rule::repeat(c("hexdigit"), 2, Some(4))?))
                        + act("chr(int(x, 16))")?)
                    | Rule::any()),
        )
        .with("identifier", Rule::regex("[A-Za-z_][A-Za-z_0-9]*")?)
        .with(
            "dqstring",
            "\""
                + Rule::wall("dq")
                + Rule::bind("s", Rule::mixed("\"", Some(c("escchar"))))
                + "\""
                + act("''.join(s)")?,
        )
        .with(
            "sqstring",
            "'" + Rule::wall("sq")
                + Rule::bind("s", Rule::mixed("'", Some(c("escchar"))))
                + "'"
                + act("''.join(s)")?,
        )
        // Atoms
        .with(
            "string",
            Rule::bind("s", c("dqstring") | c("sqstring")) + act("String(s)")?,
        )
        .with(
            "among",
            "[" + Rule::wall("[")
                + Rule::bind("items", Rule::mixed("]", Some(c("escchar"))))
                + "]"
                + act("Among(''.join(items))")?,
        )
        .with(
            "firsts",
            ">[" + Rule::wall(">[")
                + Rule::bind("items", Rule::mixed("]", Some(c("escchar"))))
                + "]"
                + act("FirstChars(''.join(items))")?,
        )
        .with(
            "value",
            "->" + Rule::wall("->")
                + c("ws")
                + Rule::bind("v", Rule::code("\r\n)]"))
                + act("Do(v)")?,
        )
        .with("action1", action("!(", "Do")?)
        .with("action2", action("!!(", "DoCode")?)
        .with("predicate1", action("?(", "If")?)
        .with("predicate2", action("??(", "IfCode")?)
        .with(
            "wall",
            "!!" + Rule::bind("n", c("identifier")) + act("Wall(n)")?,
        )
        .with(
            "mixed",
            "@(" + Rule::wall("@")
                + c("ws")
                + Rule::bind("until", c("expr1"))
                + Rule::bind(
                    "target",
                    (c("ws") + "," + Rule::wall("@,") + c("ws") + c("expr1")) | none(),
                )
                + c("ws")
                + ")"
                + act("Mixed(until, target)")?,
        )
        .with(
            "fail",
            ".(" + Rule::wall(".(")
                + c("ws")
                + Rule::bind("frule", c("expr"))
                + c("ws")
                + ")"
                + act("FailIf(frule)")?,
        )
        .with(
            "extent",
            "x(" + c("ws")
                + Rule::wall("x(")
                + Rule::bind("erule", c("expr"))
                + c("ws")
                + ")"
                + act("Extent(erule)")?,
        )
        .with(
            "brackets",
            "(" + Rule::wall("(")
                + c("ws")
                + Rule::bind("inside", c("expr"))
                + c("ws")
                + ")"
                + Rule::get("inside", Value::None),
        )
        .with(
            "take",
            "<" + Rule::wall("<")
                + c("ws")
                + Rule::bind("trule", c("expr"))
                + c("ws")
                + ">"
                + act("Take(trule)")?,
        )
        .with(
            "regex",
            "/" + Rule::wall("/")
                + Rule::bind("chars", Rule::mixed("/", None))
                + "/"
                + act("Regex(''.join(chars))")?,
        )
        .with(
            "arguments",
            ("(" + Rule::bind("args", Rule::args()) + ")" + Rule::get("args", Value::None))
                | Rule::value(Value::List(Vec::new())),
        )
        .with(
            "call",
            Rule::bind("name", c("identifier"))
                + Rule::bind("args", c("arguments"))
                + act("Call(name, args)")?,
        )
        .with(
            "call2",
            Rule::bind("mod", c("identifier"))
                + "."
                + Rule::bind("name", c("identifier"))
                + Rule::bind("args", c("arguments"))
                + act("Call2(mod, name, args)")?,
        )
        // Expressions
        .with(
            "atom",
            Rule::or([
                "string", "take", "regex", "wall", "value", "predicate2", "predicate1",
                "action2", "action1", "mixed", "among", "firsts", "brackets", "fail", "extent",
                "call2", "call",
            ]
            .map(c)),
        )
        .with(
            "expr1",
            ("^" + Rule::wall("^") + Rule::bind("a", c("atom")) + act("LookBehind(a)")?)
                | c("atom"),
        )
        .with(
            "tildable",
            ("~~~" + Rule::bind("e1", c("expr1")) + act("Not(Peek(e1))")?)
                | ("~~" + Rule::bind("e1", c("expr1")) + act("Peek(e1)")?)
                | ("~" + Rule::bind("e1", c("expr1")) + act("Not(e1)")?)
                | c("expr1"),
        )
        .with(
            "repeattimes",
            "{" + Rule::bind("mn", c("barenum"))
                + Rule::bind(
                    "mx",
                    (Rule::regex(" *, *")? + (c("barenum") | none()))
                        | Rule::get("mn", Value::None),
                )
                + "}"
                + act("[mn, mx]")?,
        )
        .with(
            "repeatable",
            Rule::bind("e2", c("tildable"))
                + (("*" + act("Star(e2)")?)
                    | ("+" + act("Plus(e2)")?)
                    | ("?" + act("Opt(e2)")?)
                    | (Rule::bind("ts", c("repeattimes")) + act("Repeat(e2, *ts)")?)
                    | Rule::get("e2", Value::None)),
        )
        .with(
            "bindable",
            Rule::bind("e3a", c("repeatable"))
                + ((":" + Rule::wall(":") + Rule::bind("n", c("identifier")) + act("Bind(n, e3a)")?)
                    | Rule::get("e3a", Value::None)),
        )
        .with(
            "seqsep",
            (c("hspaces") + c("indent")) | Rule::plus(c("hspace")),
        )
        .with(
            "seqable",
            Rule::bind("e3", c("bindable"))
                + Rule::bind("e3s", Rule::star(c("seqsep") + c("bindable")))
                + act("Seq(e3, *e3s) if e3s else e3")?,
        )
        .with(
            "expr",
            Rule::bind("e4", c("seqable"))
                + Rule::bind("e4s", Rule::star(c("ws") + "|" + c("ws") + c("seqable")))
                + act("Or(e4, *e4s) if e4s else e4")?,
        )
        // Grammar files
        .with(
            "dottedname",
            Rule::take(c("identifier") + Rule::star("." + c("identifier"))),
        )
        .with(
            "import",
            c("noindent")
                + "import "
                + Rule::bind("qid", c("dottedname"))
                + " as "
                + Rule::bind("n", c("identifier"))
                + act("[n, qid]")?,
        )
        .with(
            "ruleend",
            c("hspaces") + (c("vspaces") | Rule::stream_end()),
        )
        .with(
            "assignment",
            c("noindent")
                + Rule::not(Rule::stream_end())
                + Rule::wall("rule")
                + Rule::bind("n", c("identifier"))
                + Rule::bind("args", c("arguments"))
                + Rule::regex(" *= *")?
                + Rule::bind("e", c("expr"))
                + c("ruleend")
                + act("[n, Params(e, args) if args else e]")?,
        )
        .with(
            MAIN,
            Rule::bind("imps", Rule::star(c("import")))
                + Rule::bind("rs", Rule::plus(c("assignment")))
                + c("ws")
                + Rule::stream_end()
                + act("[dict(imps), dict(rs)]")?,
        );
    Ok(grammar)
}
