//! COW: Brainfuck's tape machine spelled with twelve three-letter moos.
//!
//! Only `m`, `o`, `M` and `O` are significant. What remains must split into
//! whole triplets, each of which names a command. `mOO` is self-modifying:
//! it replaces itself with the command numbered by the current cell and runs
//! it in place.

use std::collections::HashMap;

use tracing::{debug, instrument, trace};

use crate::TapeOutcome;
use crate::budget::Budget;
use crate::diagnostic::{Diagnostic, ErrorKind, Reporter};
use crate::jump::{Bracket, BracketError, JumpMap};
use crate::options::{Input, Options};
use crate::source::Span;
use crate::tape::Tape;

pub const VIRTUAL_NAME: &str = "<cow>";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    /// `moo`: jump back to the matching `MOO` unless the cell is 0.
    LoopClose,
    /// `mOo`
    Left,
    /// `moO`
    Right,
    /// `mOO`
    Execute,
    /// `Moo`: read a byte into a zero cell, otherwise print the cell.
    CharIo,
    /// `MOo`
    Decrement,
    /// `MoO`
    Increment,
    /// `MOO`: skip past the matching `moo` if the cell is 0.
    LoopOpen,
    /// `OOO`
    Zero,
    /// `MMM`: store the cell in the register, or write the register back.
    Register,
    /// `OOM`
    PrintInt,
    /// `oom`
    ReadInt,
}

/// Commands `mOO` may select, numbered 0 to 10.
pub const EXECUTE_TABLE: [Opcode; 11] = [
    Opcode::LoopClose,
    Opcode::Left,
    Opcode::Right,
    Opcode::Execute,
    Opcode::CharIo,
    Opcode::Decrement,
    Opcode::Increment,
    Opcode::LoopOpen,
    Opcode::Zero,
    Opcode::Register,
    Opcode::PrintInt,
];

impl Opcode {
    pub fn from_triplet(s: &str) -> Option<Opcode> {
        Some(match s {
            "moo" => Opcode::LoopClose,
            "mOo" => Opcode::Left,
            "moO" => Opcode::Right,
            "mOO" => Opcode::Execute,
            "Moo" => Opcode::CharIo,
            "MOo" => Opcode::Decrement,
            "MoO" => Opcode::Increment,
            "MOO" => Opcode::LoopOpen,
            "OOO" => Opcode::Zero,
            "MMM" => Opcode::Register,
            "OOM" => Opcode::PrintInt,
            "oom" => Opcode::ReadInt,
            _ => return None,
        })
    }

    pub fn triplet(self) -> &'static str {
        match self {
            Opcode::LoopClose => "moo",
            Opcode::Left => "mOo",
            Opcode::Right => "moO",
            Opcode::Execute => "mOO",
            Opcode::CharIo => "Moo",
            Opcode::Decrement => "MOo",
            Opcode::Increment => "MoO",
            Opcode::LoopOpen => "MOO",
            Opcode::Zero => "OOO",
            Opcode::Register => "MMM",
            Opcode::PrintInt => "OOM",
            Opcode::ReadInt => "oom",
        }
    }

    /// Looks up the command `mOO` runs for a cell value. Selecting `mOO`
    /// itself is rejected: it would rewrite itself forever.
    pub fn select(cell: u8) -> Option<Opcode> {
        match EXECUTE_TABLE.get(cell as usize) {
            Some(Opcode::Execute) | None => None,
            Some(op) => Some(*op),
        }
    }

    fn bracket(self) -> Option<Bracket> {
        match self {
            Opcode::LoopOpen => Some(Bracket::Open),
            Opcode::LoopClose => Some(Bracket::Close),
            _ => None,
        }
    }
}

pub struct Program {
    pub opcodes: Vec<Opcode>,
    pub spans: Vec<Span>,
    pub jumps: JumpMap,
}

pub fn parse(source: &str, reporter: &Reporter) -> Result<Program, Diagnostic> {
    let letters: Vec<(usize, char)> = source
        .char_indices()
        .filter(|(_, c)| matches!(c, 'm' | 'o' | 'M' | 'O'))
        .collect();

    let leftover = letters.len() % 3;
    if leftover != 0 {
        let tail = &letters[letters.len() - leftover..];
        let span = Span::new(tail[0].0, tail[tail.len() - 1].0 + 1);
        let text: String = tail.iter().map(|(_, c)| c).collect();
        return Err(reporter
            .at_span(ErrorKind::TrailingCommand, format!("incomplete command '{text}' at end of program"), span)
            .with_note(format!("{} command letters do not split into triplets", letters.len())));
    }

    let mut opcodes = Vec::with_capacity(letters.len() / 3);
    let mut spans = Vec::with_capacity(letters.len() / 3);
    for chunk in letters.chunks(3) {
        let text: String = chunk.iter().map(|(_, c)| c).collect();
        let span = Span::new(chunk[0].0, chunk[2].0 + 1);
        let op = Opcode::from_triplet(&text).ok_or_else(|| {
            reporter.at_span(ErrorKind::UnknownSymbol, format!("unknown command '{text}'"), span)
        })?;
        opcodes.push(op);
        spans.push(span);
    }

    let jumps = JumpMap::build(
        opcodes.iter().enumerate().filter_map(|(i, op)| op.bracket().map(|b| (i, b))),
    )
    .map_err(|e| {
        let span = spans[e.index()];
        match e {
            BracketError::UnmatchedClose { .. } => {
                reporter.at_span(ErrorKind::MismatchedBracket, "'moo' has no matching 'MOO'", span)
            }
            BracketError::UnclosedOpen { .. } => {
                reporter.at_span(ErrorKind::TrailingBracket, "'MOO' is never closed by 'moo'", span)
            }
        }
    })?;

    Ok(Program { opcodes, spans, jumps })
}

pub fn evaluate(source: &str) -> Result<TapeOutcome, Diagnostic> {
    evaluate_with(source, &Options::default())
}

#[instrument(skip_all, fields(len = source.len()))]
pub fn evaluate_with(source: &str, options: &Options) -> Result<TapeOutcome, Diagnostic> {
    let reporter = Reporter::new(options.filename_or(VIRTUAL_NAME), source);
    let program = parse(source, &reporter)?;
    debug!(commands = program.opcodes.len(), loops = program.jumps.pairs(), "parsed cow");

    let mut machine = Machine {
        opcodes: program.opcodes.clone(),
        spans: &program.spans,
        jumps: &program.jumps,
        tape: Tape::new(),
        register: None,
        input: Input::new(&options.input),
        output: String::new(),
        last_pass: HashMap::new(),
    };
    let mut budget = Budget::new(options, None);
    let mut ip = 0;
    while ip < machine.opcodes.len() {
        budget.tick().map_err(|e| reporter.fault(&e, program.spans[ip]))?;
        ip = machine.step(ip, &reporter)?;
    }

    debug!(steps = budget.steps(), cells = machine.tape.cells().len(), output_len = machine.output.len(), "cow halted");
    Ok(TapeOutcome { output: machine.output, tape: machine.tape.into_cells() })
}

struct Machine<'p, 'i> {
    /// Working copy; `mOO` rewrites entries.
    opcodes: Vec<Opcode>,
    spans: &'p [Span],
    jumps: &'p JumpMap,
    tape: Tape,
    register: Option<u8>,
    input: Input<'i>,
    output: String,
    last_pass: HashMap<usize, u8>,
}

impl Machine<'_, '_> {
    fn step(&mut self, ip: usize, reporter: &Reporter) -> Result<usize, Diagnostic> {
        let op = self.opcodes[ip];
        trace!(ip, op = op.triplet(), cursor = self.tape.cursor(), cell = self.tape.get());
        match op {
            Opcode::LoopClose => {
                let cell = self.tape.get();
                if cell == 0 {
                    self.last_pass.remove(&ip);
                } else {
                    if self.last_pass.insert(ip, cell) == Some(cell) {
                        return Err(reporter
                            .at_span(
                                ErrorKind::InfiniteLoop,
                                format!("loop makes no progress: cell {} is still {cell}", self.tape.cursor()),
                                self.spans[ip],
                            )
                            .with_note("the cell under the pointer held the same value on the previous pass"));
                    }
                    return Ok(self.partner(ip, reporter)? + 1);
                }
            }
            Opcode::LoopOpen => {
                if self.tape.get() == 0 {
                    return Ok(self.partner(ip, reporter)? + 1);
                }
            }
            Opcode::Left => self.tape.left(),
            Opcode::Right => self.tape.right(),
            Opcode::Execute => {
                let cell = self.tape.get();
                let selected = Opcode::select(cell).ok_or_else(|| {
                    reporter
                        .at_span(
                            ErrorKind::InvalidOpcodeSelection,
                            format!("'mOO' cannot select command {cell}"),
                            self.spans[ip],
                        )
                        .with_note("valid selections are 0 to 10, excluding 3 ('mOO' itself)")
                })?;
                trace!(ip, selected = selected.triplet(), "mOO rewrote command");
                self.opcodes[ip] = selected;
                // Run the replacement on the next cycle without advancing.
                return Ok(ip);
            }
            Opcode::CharIo => {
                let cell = self.tape.get();
                if cell == 0 {
                    let byte = self.input.read_byte().unwrap_or(0);
                    self.tape.set(byte);
                } else {
                    self.output.push(char::from(cell));
                }
            }
            Opcode::Decrement => self.tape.decrement(),
            Opcode::Increment => self.tape.increment(),
            Opcode::Zero => self.tape.set(0),
            Opcode::Register => match self.register.take() {
                Some(value) => self.tape.set(value),
                None => self.register = Some(self.tape.get()),
            },
            Opcode::PrintInt => {
                self.output.push_str(&self.tape.get().to_string());
                self.output.push('\n');
            }
            Opcode::ReadInt => {
                let value = self.input.read_integer().unwrap_or(0);
                self.tape.set(value.rem_euclid(256) as u8);
            }
        }
        Ok(ip + 1)
    }

    /// Loop commands placed by `mOO` have no partner in the jump map.
    fn partner(&self, ip: usize, reporter: &Reporter) -> Result<usize, Diagnostic> {
        self.jumps.partner(ip).ok_or_else(|| {
            let op = self.opcodes[ip].triplet();
            reporter.at_span(
                ErrorKind::MismatchedBracket,
                format!("'{op}' written by 'mOO' has no matching loop command"),
                self.spans[ip],
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(source: &str) -> TapeOutcome {
        evaluate(source).unwrap()
    }

    fn increments(n: usize) -> String {
        "MoO".repeat(n)
    }

    #[test]
    fn prints_integer_with_newline() {
        assert_eq!(run("MoOMoOMoOOOM").output, "3\n");
    }

    #[test]
    fn prints_character() {
        assert_eq!(run(&(increments(65) + "Moo")).output, "A");
    }

    #[test]
    fn non_command_letters_are_dropped() {
        assert_eq!(run("MoO, MoO; OOM!").output, "2\n");
    }

    #[test]
    fn loop_moves_value() {
        // cell0 = 3; while cell0 { cell1 += 2; cell0 -= 1 }
        let out = run("MoOMoOMoOMOOmoOMoOMoOmOoMOomoo");
        assert_eq!(out.tape, vec![0, 6]);
    }

    #[test]
    fn register_stores_then_recalls() {
        let out = run("MoOMoOMMMmoOMMM");
        assert_eq!(out.tape, vec![2, 2]);
    }

    #[test]
    fn zero_clears_cell() {
        assert_eq!(run("MoOMoOOOO").tape, vec![0]);
    }

    #[test]
    fn moo_without_moo_open_is_mismatched() {
        let err = evaluate("moomoo").unwrap_err();
        assert_eq!(err.kind, ErrorKind::MismatchedBracket);
        assert_eq!(err.locator.column, 1);
        assert_eq!(err.locator.width, 3);
    }

    #[test]
    fn unclosed_loop_is_trailing_bracket() {
        let err = evaluate("MoOMOO").unwrap_err();
        assert_eq!(err.kind, ErrorKind::TrailingBracket);
        assert_eq!(err.locator.column, 4);
    }

    #[test]
    fn leftover_letters_are_trailing_command() {
        let err = evaluate("MoOMo").unwrap_err();
        assert_eq!(err.kind, ErrorKind::TrailingCommand);
        assert_eq!(err.locator.column, 4);
        assert_eq!(err.locator.width, 2);
    }

    #[test]
    fn unknown_triplet() {
        let err = evaluate("MoOMMo").unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnknownSymbol);
        assert!(err.message.contains("MMo"));
    }

    #[test]
    fn execute_rewrites_itself() {
        // cell = 6 selects MoO (increment)
        let out = run(&(increments(6) + "mOO"));
        assert_eq!(out.tape, vec![7]);
    }

    #[test]
    fn rewritten_command_persists_across_loop_passes() {
        // cell0 = 2 then loop { moO MoO*6 mOO mOo MOo }. The first pass turns
        // mOO into an increment; without that rewrite the second pass would
        // try to select command 12.
        let src = format!("MoOMoOMOOmoO{}mOOmOoMOomoo", increments(6));
        let out = run(&src);
        assert_eq!(out.tape, vec![0, 14]);
    }

    #[test]
    fn execute_out_of_range_fails() {
        let err = evaluate(&(increments(11) + "mOO")).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidOpcodeSelection);
    }

    #[test]
    fn execute_cannot_select_itself() {
        let err = evaluate(&(increments(3) + "mOO")).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidOpcodeSelection);
    }

    #[test]
    fn execute_selected_loop_without_partner() {
        // cell0 = 7 turns mOO into MOO on the first pass; on the second pass
        // cell0 is 0 and that MOO has no 'moo' to skip to.
        let src = format!("{}moOMoOMoOMOOmOomOOOOOmoOMOomoo", increments(7));
        let err = evaluate(&src).unwrap_err();
        assert_eq!(err.kind, ErrorKind::MismatchedBracket);
        assert!(err.message.contains("written by 'mOO'"));
    }

    #[test]
    fn stalled_loop_is_infinite_loop() {
        let err = evaluate("MoOMOOmoo").unwrap_err();
        assert_eq!(err.kind, ErrorKind::InfiniteLoop);
    }

    #[test]
    fn reads_input() {
        let opts = Options::new().input("7 B");
        let out = evaluate_with("oomOOMmoOMooMoo", &opts).unwrap();
        // oom reads 7, OOM prints it, Moo on the empty cell1 reads ' ', Moo prints it
        assert_eq!(out.output, "7\n ");
    }

    #[test]
    fn select_table() {
        assert_eq!(Opcode::select(0), Some(Opcode::LoopClose));
        assert_eq!(Opcode::select(10), Some(Opcode::PrintInt));
        assert_eq!(Opcode::select(3), None);
        assert_eq!(Opcode::select(11), None);
    }

    #[test]
    fn self_rewrite_does_not_leak_into_the_next_run() {
        let src = format!("MoOMoOMOOmoO{}mOOmOoMOomoo", increments(6));
        let first = run(&src);
        assert_eq!(first, run(&src));
        assert_eq!(first.tape, vec![0, 14]);
    }

    #[test]
    fn triplets_round_trip() {
        for op in EXECUTE_TABLE.iter().copied().chain([Opcode::ReadInt]) {
            assert_eq!(Opcode::from_triplet(op.triplet()), Some(op));
        }
    }
}
