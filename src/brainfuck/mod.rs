//! Brainfuck on a growable byte tape.
//!
//! Every character outside `.,[]<>+-` is a comment. Loops are resolved up
//! front into a [`JumpMap`]; at run time each `]` remembers the cell value it
//! last jumped back with, and a repeat of that value is reported as an
//! infinite loop.

use std::collections::HashMap;

use logos::Logos;
use tracing::{debug, instrument, trace};

use crate::TapeOutcome;
use crate::budget::Budget;
use crate::diagnostic::{Diagnostic, ErrorKind, Reporter};
use crate::jump::{Bracket, BracketError, JumpMap};
use crate::options::{Input, Options};
use crate::source::Span;
use crate::tape::Tape;

pub const VIRTUAL_NAME: &str = "<brainfuck>";

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[^.,\[\]<>+\-]+")]
pub enum Instr {
    #[token(">")]
    Right,
    #[token("<")]
    Left,
    #[token("+")]
    Increment,
    #[token("-")]
    Decrement,
    #[token(".")]
    Output,
    #[token(",")]
    Input,
    #[token("[")]
    LoopOpen,
    #[token("]")]
    LoopClose,
}

impl Instr {
    fn bracket(self) -> Option<Bracket> {
        match self {
            Instr::LoopOpen => Some(Bracket::Open),
            Instr::LoopClose => Some(Bracket::Close),
            _ => None,
        }
    }
}

/// Filtered instruction stream with the source span of each instruction.
pub struct Program {
    pub instrs: Vec<Instr>,
    pub spans: Vec<Span>,
    pub jumps: JumpMap,
}

/// Drops every non-instruction character. Never fails.
pub fn lex(source: &str) -> Vec<(Instr, Span)> {
    Instr::lexer(source)
        .spanned()
        .filter_map(|(tok, span)| tok.ok().map(|t| (t, Span::from(span))))
        .collect()
}

pub fn parse(source: &str) -> Result<Program, BracketError> {
    let (instrs, spans): (Vec<Instr>, Vec<Span>) = lex(source).into_iter().unzip();
    let jumps = JumpMap::build(
        instrs.iter().enumerate().filter_map(|(i, op)| op.bracket().map(|b| (i, b))),
    )?;
    Ok(Program { instrs, spans, jumps })
}

pub fn evaluate(source: &str) -> Result<TapeOutcome, Diagnostic> {
    evaluate_with(source, &Options::default())
}

#[instrument(skip_all, fields(len = source.len()))]
pub fn evaluate_with(source: &str, options: &Options) -> Result<TapeOutcome, Diagnostic> {
    let reporter = Reporter::new(options.filename_or(VIRTUAL_NAME), source);
    let program = parse(source).map_err(|e| bracket_diagnostic(&reporter, &e, source))?;
    debug!(instructions = program.instrs.len(), loops = program.jumps.pairs(), "parsed brainfuck");

    let mut machine = Machine {
        program: &program,
        tape: Tape::new(),
        input: Input::new(&options.input),
        output: String::new(),
        last_pass: HashMap::new(),
    };
    let mut budget = Budget::new(options, None);
    let mut ip = 0;
    while ip < program.instrs.len() {
        budget.tick().map_err(|e| reporter.fault(&e, program.spans[ip]))?;
        ip = machine.step(ip, &reporter)?;
    }

    debug!(steps = budget.steps(), cells = machine.tape.cells().len(), output_len = machine.output.len(), "brainfuck halted");
    Ok(TapeOutcome { output: machine.output, tape: machine.tape.into_cells() })
}

fn bracket_diagnostic(reporter: &Reporter, err: &BracketError, source: &str) -> Diagnostic {
    let span = lex(source).get(err.index()).map(|(_, s)| *s).unwrap_or(Span::UNKNOWN);
    match err {
        BracketError::UnmatchedClose { .. } => reporter
            .at_span(ErrorKind::MismatchedBracket, "unmatched ']'", span)
            .with_suggestion("add a '[' before it or remove it"),
        BracketError::UnclosedOpen { .. } => reporter
            .at_span(ErrorKind::TrailingBracket, "'[' is never closed", span)
            .with_suggestion("add the missing ']'"),
    }
}

struct Machine<'p, 'i> {
    program: &'p Program,
    tape: Tape,
    input: Input<'i>,
    output: String,
    /// Cell value each `]` last jumped back with, keyed by instruction index.
    last_pass: HashMap<usize, u8>,
}

impl Machine<'_, '_> {
    /// Executes the instruction at `ip` and returns the next `ip`.
    fn step(&mut self, ip: usize, reporter: &Reporter) -> Result<usize, Diagnostic> {
        let instr = self.program.instrs[ip];
        trace!(ip, ?instr, cursor = self.tape.cursor(), cell = self.tape.get());
        match instr {
            Instr::Right => self.tape.right(),
            Instr::Left => self.tape.left(),
            Instr::Increment => self.tape.increment(),
            Instr::Decrement => self.tape.decrement(),
            Instr::Output => self.output.push(char::from(self.tape.get())),
            Instr::Input => {
                let byte = self.input.read_byte().unwrap_or(0);
                self.tape.set(byte);
            }
            Instr::LoopOpen => {
                if self.tape.get() == 0 {
                    return Ok(self.partner(ip) + 1);
                }
            }
            Instr::LoopClose => {
                let cell = self.tape.get();
                if cell == 0 {
                    self.last_pass.remove(&ip);
                } else {
                    if self.last_pass.insert(ip, cell) == Some(cell) {
                        return Err(reporter
                            .at_span(
                                ErrorKind::InfiniteLoop,
                                format!("loop makes no progress: cell {} is still {cell}", self.tape.cursor()),
                                self.program.spans[ip],
                            )
                            .with_note("the cell under the pointer held the same value on the previous pass")
                            .with_suggestion("change the cell inside the loop so it eventually reaches 0"));
                    }
                    return Ok(self.partner(ip) + 1);
                }
            }
        }
        Ok(ip + 1)
    }

    fn partner(&self, ip: usize) -> usize {
        // parse() pairs every bracket; an index without a partner cannot occur.
        self.program.jumps.partner(ip).unwrap_or(ip)
    }
}
