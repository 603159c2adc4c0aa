use crate::diagnostic::{ErrorKind, Fault};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StackError {
    #[error("pop from empty stack")]
    Empty,
    #[error("division by zero")]
    DivisionByZero,
}

impl Fault for StackError {
    fn kind(&self) -> ErrorKind {
        match self {
            StackError::Empty => ErrorKind::EmptyStack,
            StackError::DivisionByZero => ErrorKind::DivisionByZero,
        }
    }
}

/// Value stack shared by the grid and token engines.
///
/// Underflow policy is chosen per operation: [`Stack::pop`] fails, while
/// [`Stack::pop_or_zero`] substitutes 0 for duplicate, swap and branches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stack {
    values: Vec<i64>,
}

impl Stack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, value: i64) {
        self.values.push(value);
    }

    pub fn pop(&mut self) -> Result<i64, StackError> {
        self.values.pop().ok_or(StackError::Empty)
    }

    pub fn pop_or_zero(&mut self) -> i64 {
        self.values.pop().unwrap_or(0)
    }

    pub fn peek_or_zero(&self) -> i64 {
        self.values.last().copied().unwrap_or(0)
    }

    /// Pushes a copy of the top value, or a single 0 when empty.
    pub fn duplicate(&mut self) {
        let top = self.peek_or_zero();
        self.push(top);
    }

    /// Exchanges the top two values; missing values are taken as 0.
    pub fn swap(&mut self) {
        let a = self.pop_or_zero();
        let b = self.pop_or_zero();
        self.push(a);
        self.push(b);
    }

    /// `a = pop(); b = pop(); push(op(b, a))`: the deeper value is the left operand.
    pub fn binary(&mut self, op: impl FnOnce(i64, i64) -> Result<i64, StackError>) -> Result<(), StackError> {
        let a = self.pop()?;
        let b = self.pop()?;
        self.push(op(b, a)?);
        Ok(())
    }

    /// Value `n` places below the top (0 is the top).
    pub fn nth_from_top(&self, n: usize) -> Result<i64, StackError> {
        let len = self.values.len();
        if n >= len {
            return Err(StackError::Empty);
        }
        Ok(self.values[len - 1 - n])
    }

    /// Drops `n` values under the top, keeping the top itself.
    pub fn slide(&mut self, n: usize) -> Result<(), StackError> {
        let top = self.pop()?;
        let keep = self.values.len().saturating_sub(n);
        self.values.truncate(keep);
        self.push(top);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Bottom-to-top snapshot.
    pub fn into_vec(self) -> Vec<i64> {
        self.values
    }
}

/// Integer division rounding toward negative infinity.
pub fn floor_div(a: i64, b: i64) -> Result<i64, StackError> {
    if b == 0 {
        return Err(StackError::DivisionByZero);
    }
    let q = a.wrapping_div(b);
    if a.wrapping_rem(b) != 0 && ((a < 0) != (b < 0)) { Ok(q - 1) } else { Ok(q) }
}

/// Remainder with the sign of the divisor, paired with [`floor_div`].
pub fn floor_mod(a: i64, b: i64) -> Result<i64, StackError> {
    if b == 0 {
        return Err(StackError::DivisionByZero);
    }
    let r = a.wrapping_rem(b);
    if r != 0 && ((r < 0) != (b < 0)) { Ok(r + b) } else { Ok(r) }
}
