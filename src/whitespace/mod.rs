//! Whitespace: a stack machine written in spaces, tabs and newlines.
//!
//! Everything else in the source is a comment. Chat clients turn tabs into
//! spaces, so U+3164 HANGUL FILLER is accepted as a tab. Internally the
//! three symbols are written `s`, `t` and `l`.
//!
//! Commands are decoded greedily through a prefix trie and run as soon as
//! they are complete. Tokens that cannot begin any command are a dead end.

use std::collections::HashMap;
use std::fmt;

use logos::Logos;
use tracing::{debug, instrument, trace};

use crate::budget::Budget;
use crate::diagnostic::{Diagnostic, ErrorKind, Fault, Reporter};
use crate::options::Options;
use crate::source::Span;
use crate::stack::{Stack, StackError, floor_div, floor_mod};

pub const VIRTUAL_NAME: &str = "<whitespace>";
pub const TAB_SUBSTITUTE: char = '\u{3164}';

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[^ \t\n\x{3164}]+")]
pub enum Symbol {
    #[token(" ")]
    Space,
    #[token("\t")]
    #[token("\u{3164}")]
    Tab,
    #[token("\n")]
    Line,
}

impl Symbol {
    fn index(self) -> usize {
        match self {
            Symbol::Space => 0,
            Symbol::Tab => 1,
            Symbol::Line => 2,
        }
    }

    pub fn letter(self) -> char {
        match self {
            Symbol::Space => 's',
            Symbol::Tab => 't',
            Symbol::Line => 'l',
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Push(i64),
    Duplicate,
    Copy(i64),
    Swap,
    Discard,
    Slide(i64),
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Store,
    Retrieve,
    PrintChar,
    PrintInt,
    End,
}

/// What a complete trie path means: a command, or a command that still
/// needs a number terminated by `l`.
#[derive(Clone, Copy)]
enum Shape {
    Bare(Command),
    Numbered(fn(i64) -> Command),
}

const COMMANDS: &[(&str, Shape)] = &[
    ("ss", Shape::Numbered(Command::Push)),
    ("sls", Shape::Bare(Command::Duplicate)),
    ("sts", Shape::Numbered(Command::Copy)),
    ("slt", Shape::Bare(Command::Swap)),
    ("sll", Shape::Bare(Command::Discard)),
    ("stl", Shape::Numbered(Command::Slide)),
    ("tsss", Shape::Bare(Command::Add)),
    ("tsst", Shape::Bare(Command::Subtract)),
    ("tssl", Shape::Bare(Command::Multiply)),
    ("tsts", Shape::Bare(Command::Divide)),
    ("tstt", Shape::Bare(Command::Modulo)),
    ("tts", Shape::Bare(Command::Store)),
    ("ttt", Shape::Bare(Command::Retrieve)),
    ("tlss", Shape::Bare(Command::PrintChar)),
    ("tlst", Shape::Bare(Command::PrintInt)),
    ("lll", Shape::Bare(Command::End)),
];

#[derive(Default)]
struct Node {
    children: [Option<usize>; 3],
    shape: Option<Shape>,
}

/// Prefix tree over `s`/`t`/`l` built from [`COMMANDS`]. Node 0 is the root.
struct Trie {
    nodes: Vec<Node>,
}

impl Trie {
    const ROOT: usize = 0;

    fn new() -> Self {
        let mut trie = Trie { nodes: vec![Node::default()] };
        for (path, shape) in COMMANDS {
            let mut node = Self::ROOT;
            for letter in path.chars() {
                let slot = match letter {
                    's' => 0,
                    't' => 1,
                    _ => 2,
                };
                node = match trie.nodes[node].children[slot] {
                    Some(next) => next,
                    None => {
                        trie.nodes.push(Node::default());
                        let next = trie.nodes.len() - 1;
                        trie.nodes[node].children[slot] = Some(next);
                        next
                    }
                };
            }
            trie.nodes[node].shape = Some(*shape);
        }
        trie
    }

    fn child(&self, node: usize, symbol: Symbol) -> Option<usize> {
        self.nodes[node].children[symbol.index()]
    }

    fn shape(&self, node: usize) -> Option<Shape> {
        self.nodes[node].shape
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NumberError {
    #[error("number '{0}' has a sign but no digits")]
    SignOnly(String),
    #[error("number '{0}' contains '{1}'; only 's' and 't' are digits")]
    BadDigit(String, char),
    #[error("number '{0}' does not fit in 64 bits")]
    Overflow(String),
}

impl Fault for NumberError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::InvalidNumber
    }
}

/// Parses a number token written with `s`/`t`: the first letter is the sign
/// (`s` positive, `t` negative), the rest is binary with `s` = 0, `t` = 1.
pub fn parse_to_number(token: &str) -> Result<i64, NumberError> {
    let mut letters = token.chars();
    let negative = match letters.next() {
        Some('s') => false,
        Some('t') => true,
        Some(other) => return Err(NumberError::BadDigit(token.to_string(), other)),
        None => return Err(NumberError::SignOnly(token.to_string())),
    };
    let digits = letters.as_str();
    if digits.is_empty() {
        return Err(NumberError::SignOnly(token.to_string()));
    }
    let mut magnitude: i64 = 0;
    for letter in digits.chars() {
        let bit = match letter {
            's' => 0,
            't' => 1,
            other => return Err(NumberError::BadDigit(token.to_string(), other)),
        };
        magnitude = magnitude
            .checked_mul(2)
            .and_then(|m| m.checked_add(bit))
            .ok_or_else(|| NumberError::Overflow(token.to_string()))?;
    }
    Ok(if negative { -magnitude } else { magnitude })
}

enum State {
    Prefix(usize),
    Number { make: fn(i64) -> Command, letters: String },
}

/// Turns the symbol stream into commands one at a time.
pub struct Decoder<'r, 's> {
    symbols: std::vec::IntoIter<(Symbol, Span)>,
    trie: Trie,
    reporter: &'r Reporter<'s>,
}

impl<'r, 's> Decoder<'r, 's> {
    pub fn new(source: &str, reporter: &'r Reporter<'s>) -> Self {
        let symbols: Vec<(Symbol, Span)> = Symbol::lexer(source)
            .spanned()
            .filter_map(|(tok, span)| tok.ok().map(|s| (s, Span::from(span))))
            .collect();
        Decoder { symbols: symbols.into_iter(), trie: Trie::new(), reporter }
    }
}

impl Iterator for Decoder<'_, '_> {
    type Item = Result<(Command, Span), Diagnostic>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut state = State::Prefix(Trie::ROOT);
        let mut seen = String::new();
        let mut span: Option<Span> = None;

        for (symbol, sym_span) in self.symbols.by_ref() {
            seen.push(symbol.letter());
            let here = span.map_or(sym_span, |s| s.merge(sym_span));
            span = Some(here);

            state = match state {
                State::Prefix(node) => match self.trie.child(node, symbol) {
                    None => {
                        return Some(Err(self
                            .reporter
                            .at_span(ErrorKind::UnknownSymbol, format!("unknown command '{seen}'"), here)
                            .with_note("no command starts with these tokens")));
                    }
                    Some(next) => match self.trie.shape(next) {
                        Some(Shape::Bare(cmd)) => return Some(Ok((cmd, here))),
                        Some(Shape::Numbered(make)) => State::Number { make, letters: String::new() },
                        None => State::Prefix(next),
                    },
                },
                State::Number { make, mut letters } => {
                    if symbol == Symbol::Line {
                        return Some(
                            parse_to_number(&letters)
                                .map(|n| (make(n), here))
                                .map_err(|e| self.reporter.fault(&e, here)),
                        );
                    }
                    letters.push(symbol.letter());
                    State::Number { make, letters }
                }
            };
        }

        let here = span?;
        Some(Err(self
            .reporter
            .at_span(ErrorKind::TrailingCommand, format!("incomplete command '{seen}' at end of program"), here)))
    }
}

pub fn evaluate(source: &str) -> Result<String, Diagnostic> {
    evaluate_with(source, &Options::default())
}

#[instrument(skip_all, fields(len = source.len()))]
pub fn evaluate_with(source: &str, options: &Options) -> Result<String, Diagnostic> {
    let reporter = Reporter::new(options.filename_or(VIRTUAL_NAME), source);
    let mut machine = Machine { stack: Stack::new(), heap: HashMap::new(), output: String::new() };
    let mut budget = Budget::new(options, None);

    for item in Decoder::new(source, &reporter) {
        let (cmd, span) = item?;
        budget.tick().map_err(|e| reporter.fault(&e, span))?;
        trace!(?cmd, depth = machine.stack.len());
        if cmd == Command::End {
            break;
        }
        machine.execute(cmd).map_err(|e| match e {
            Failure::Stack(e) => reporter.fault(&e, span),
            Failure::Character(value) => {
                reporter.at_span(ErrorKind::InvalidCharacter, format!("{value} is not a character code"), span)
            }
        })?;
    }

    debug!(steps = budget.steps(), output_len = machine.output.len(), "whitespace halted");
    Ok(machine.output)
}

enum Failure {
    Stack(StackError),
    Character(i64),
}

impl From<StackError> for Failure {
    fn from(e: StackError) -> Self {
        Failure::Stack(e)
    }
}

struct Machine {
    stack: Stack,
    heap: HashMap<i64, i64>,
    output: String,
}

impl Machine {
    fn execute(&mut self, cmd: Command) -> Result<(), Failure> {
        match cmd {
            Command::Push(n) => self.stack.push(n),
            Command::Duplicate => self.stack.duplicate(),
            Command::Copy(n) => {
                let n = usize::try_from(n).map_err(|_| StackError::Empty)?;
                let value = self.stack.nth_from_top(n)?;
                self.stack.push(value);
            }
            Command::Swap => self.stack.swap(),
            Command::Discard => {
                self.stack.pop()?;
            }
            Command::Slide(n) => self.stack.slide(usize::try_from(n).unwrap_or(0))?,
            Command::Add => self.stack.binary(|b, a| Ok(b.wrapping_add(a)))?,
            Command::Subtract => self.stack.binary(|b, a| Ok(b.wrapping_sub(a)))?,
            Command::Multiply => self.stack.binary(|b, a| Ok(b.wrapping_mul(a)))?,
            Command::Divide => self.stack.binary(floor_div)?,
            Command::Modulo => self.stack.binary(floor_mod)?,
            Command::Store => {
                let value = self.stack.pop()?;
                let address = self.stack.pop()?;
                self.heap.insert(address, value);
            }
            Command::Retrieve => {
                let address = self.stack.pop()?;
                self.stack.push(self.heap.get(&address).copied().unwrap_or(0));
            }
            Command::PrintChar => {
                let value = self.stack.pop()?;
                let ch = u32::try_from(value)
                    .ok()
                    .and_then(char::from_u32)
                    .ok_or(Failure::Character(value))?;
                self.output.push(ch);
            }
            Command::PrintInt => {
                let value = self.stack.pop()?;
                self.output.push_str(&value.to_string());
            }
            Command::End => {}
        }
        Ok(())
    }
}
