//! Befunge-93 on a toroidal character grid.
//!
//! The source is split into rows and padded with spaces to a rectangle. The
//! instruction pointer starts top-left moving right and wraps at every edge.
//! Programs must contain `@` and an even number of `"` before they run, and
//! are cut off after [`DEFAULT_MAX_STEPS`] fetch cycles unless the caller
//! chooses another ceiling.

use tracing::{debug, instrument, trace};

use crate::StackOutcome;
use crate::budget::Budget;
use crate::diagnostic::{Diagnostic, ErrorKind, Fault, Reporter};
use crate::options::{Input, Options};
use crate::stack::{Stack, floor_div, floor_mod};

pub const VIRTUAL_NAME: &str = "<befunge>";
pub const DEFAULT_MAX_STEPS: u64 = 100_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Right,
    Left,
    Up,
    Down,
}

impl Direction {
    pub const ALL: [Direction; 4] = [Direction::Right, Direction::Left, Direction::Up, Direction::Down];

    fn delta(self) -> (isize, isize) {
        match self {
            Direction::Right => (1, 0),
            Direction::Left => (-1, 0),
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
        }
    }
}

/// Supplies the direction chosen by `?`.
pub trait RandomSource {
    fn direction(&mut self) -> Direction;
}

impl RandomSource for fastrand::Rng {
    fn direction(&mut self) -> Direction {
        Direction::ALL[self.usize(..Direction::ALL.len())]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Literal,
    StringPush,
}

/// Rectangular program grid. Row `y` is source line `y + 1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    rows: Vec<Vec<char>>,
    width: usize,
}

impl Grid {
    pub fn parse(source: &str) -> Self {
        let mut rows: Vec<Vec<char>> = source
            .split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line).chars().collect())
            .collect();
        let width = rows.iter().map(Vec::len).max().unwrap_or(0).max(1);
        for row in &mut rows {
            row.resize(width, ' ');
        }
        Grid { rows, width }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn get(&self, x: usize, y: usize) -> char {
        self.rows[y][x]
    }

    /// `None` when (x, y) falls outside the grid.
    pub fn checked_get(&self, x: i64, y: i64) -> Option<char> {
        let (x, y) = (usize::try_from(x).ok()?, usize::try_from(y).ok()?);
        self.rows.get(y)?.get(x).copied()
    }

    /// Returns false when (x, y) falls outside the grid.
    pub fn checked_set(&mut self, x: i64, y: i64, c: char) -> bool {
        let (Ok(x), Ok(y)) = (usize::try_from(x), usize::try_from(y)) else {
            return false;
        };
        match self.rows.get_mut(y).and_then(|row| row.get_mut(x)) {
            Some(cell) => {
                *cell = c;
                true
            }
            None => false,
        }
    }
}

/// Position plus direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pointer {
    pub x: usize,
    pub y: usize,
    pub dir: Direction,
}

impl Pointer {
    pub fn advance(&mut self, grid: &Grid) {
        let (dx, dy) = self.dir.delta();
        self.x = wrap(self.x, dx, grid.width());
        self.y = wrap(self.y, dy, grid.height());
    }
}

fn wrap(pos: usize, delta: isize, len: usize) -> usize {
    match delta {
        1 => (pos + 1) % len,
        -1 => (pos + len - 1) % len,
        _ => pos,
    }
}

/// Precondition check: a terminator exists and string mode always closes.
pub fn check_termination(source: &str) -> Result<(), String> {
    if !source.contains('@') {
        return Err("program has no '@' and can never halt".to_string());
    }
    let quotes = source.chars().filter(|&c| c == '"').count();
    if quotes % 2 != 0 {
        return Err(format!("odd number of '\"' ({quotes}): string mode never closes"));
    }
    Ok(())
}

pub fn evaluate(source: &str) -> Result<StackOutcome, Diagnostic> {
    evaluate_with(source, &Options::default())
}

/// Seeds `?` from [`Options::seed`], or from fresh entropy when unset.
pub fn evaluate_with(source: &str, options: &Options) -> Result<StackOutcome, Diagnostic> {
    let mut rng = match options.seed {
        Some(seed) => fastrand::Rng::with_seed(seed),
        None => fastrand::Rng::new(),
    };
    evaluate_with_rng(source, options, &mut rng)
}

#[instrument(skip_all, fields(len = source.len()))]
pub fn evaluate_with_rng(
    source: &str,
    options: &Options,
    rng: &mut dyn RandomSource,
) -> Result<StackOutcome, Diagnostic> {
    let reporter = Reporter::new(options.filename_or(VIRTUAL_NAME), source);
    check_termination(source).map_err(|msg| {
        reporter
            .at_end(ErrorKind::NoTermination, msg)
            .with_suggestion("add an '@' on the instruction pointer's path and close every string")
    })?;

    let grid = Grid::parse(source);
    debug!(width = grid.width(), height = grid.height(), "parsed befunge grid");

    let mut machine = Machine {
        grid,
        ptr: Pointer { x: 0, y: 0, dir: Direction::Right },
        mode: Mode::Literal,
        stack: Stack::new(),
        input: Input::new(&options.input),
        output: String::new(),
        reporter: &reporter,
    };
    let mut budget = Budget::new(options, Some(DEFAULT_MAX_STEPS));
    loop {
        budget.tick().map_err(|e| machine.fail(&e))?;
        if machine.step(rng)? == Flow::Halt {
            break;
        }
        machine.ptr.advance(&machine.grid);
    }

    debug!(steps = budget.steps(), stack_depth = machine.stack.len(), "befunge halted");
    Ok(StackOutcome { output: machine.output, stack: machine.stack.into_vec() })
}

#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Halt,
}

struct Machine<'r, 'i> {
    grid: Grid,
    ptr: Pointer,
    mode: Mode,
    stack: Stack,
    input: Input<'i>,
    output: String,
    reporter: &'r Reporter<'r>,
}

impl Machine<'_, '_> {
    fn fail(&self, fault: &dyn Fault) -> Diagnostic {
        self.error(fault.kind(), fault.to_string())
    }

    fn error(&self, kind: ErrorKind, message: impl Into<String>) -> Diagnostic {
        self.reporter.at_line_col(kind, message, self.ptr.y + 1, self.ptr.x + 1)
    }

    /// Pops for `symbol`; underflow names the instruction that needed the value.
    fn pop(&mut self, symbol: char) -> Result<i64, Diagnostic> {
        self.stack
            .pop()
            .map_err(|e| self.fail(&e).with_note(format!("'{symbol}' needs a value from the stack")))
    }

    fn to_char(&self, value: i64) -> Result<char, Diagnostic> {
        u32::try_from(value)
            .ok()
            .and_then(char::from_u32)
            .ok_or_else(|| self.error(ErrorKind::InvalidCharacter, format!("{value} is not a character code")))
    }

    fn step(&mut self, rng: &mut dyn RandomSource) -> Result<Flow, Diagnostic> {
        let c = self.grid.get(self.ptr.x, self.ptr.y);
        trace!(x = self.ptr.x, y = self.ptr.y, symbol = %c, mode = ?self.mode);

        if self.mode == Mode::StringPush {
            if c == '"' {
                self.mode = Mode::Literal;
            } else {
                self.stack.push(c as i64);
            }
            return Ok(Flow::Continue);
        }

        match c {
            ' ' => {}
            '@' => return Ok(Flow::Halt),
            '>' => self.ptr.dir = Direction::Right,
            '<' => self.ptr.dir = Direction::Left,
            '^' => self.ptr.dir = Direction::Up,
            'v' => self.ptr.dir = Direction::Down,
            '?' => self.ptr.dir = rng.direction(),
            '"' => self.mode = Mode::StringPush,
            '#' => self.ptr.advance(&self.grid),
            '0'..='9' => self.stack.push(i64::from(c as u8 - b'0')),
            '+' | '-' | '*' | '/' | '%' | '`' => {
                let a = self.pop(c)?;
                let b = self.pop(c)?;
                let value = match c {
                    '+' => Ok(b.wrapping_add(a)),
                    '-' => Ok(b.wrapping_sub(a)),
                    '*' => Ok(b.wrapping_mul(a)),
                    '/' => floor_div(b, a),
                    '%' => floor_mod(b, a),
                    _ => Ok(i64::from(b > a)),
                };
                let value = value.map_err(|e| self.fail(&e))?;
                self.stack.push(value);
            }
            '!' => {
                let a = self.pop(c)?;
                self.stack.push(i64::from(a == 0));
            }
            '_' => {
                self.ptr.dir = if self.stack.pop_or_zero() == 0 { Direction::Right } else { Direction::Left };
            }
            '|' => {
                self.ptr.dir = if self.stack.pop_or_zero() == 0 { Direction::Down } else { Direction::Up };
            }
            ':' => self.stack.duplicate(),
            '\\' => self.stack.swap(),
            '$' => {
                self.pop(c)?;
            }
            '.' => {
                let a = self.pop(c)?;
                self.output.push_str(&format!("{a} "));
            }
            ',' => {
                let a = self.pop(c)?;
                let ch = self.to_char(a)?;
                self.output.push(ch);
            }
            'g' => {
                let y = self.pop(c)?;
                let x = self.pop(c)?;
                let value = self.grid.checked_get(x, y).map_or(0, |ch| ch as i64);
                self.stack.push(value);
            }
            'p' => {
                let y = self.pop(c)?;
                let x = self.pop(c)?;
                let v = self.pop(c)?;
                let ch = self.to_char(v)?;
                if !self.grid.checked_set(x, y, ch) {
                    trace!(x, y, "put outside the grid ignored");
                }
            }
            '&' => {
                let value = self.input.read_integer().unwrap_or(-1);
                self.stack.push(value);
            }
            '~' => {
                let value = self.input.read_char().map_or(-1, |ch| ch as i64);
                self.stack.push(value);
            }
            other => {
                return Err(self
                    .error(
                        ErrorKind::UnknownSymbol,
                        format!("unknown symbol '{other}' at ({}, {})", self.ptr.x, self.ptr.y),
                    )
                    .with_note("positions are (column, row), counted from 0"));
            }
        }
        Ok(Flow::Continue)
    }
}
