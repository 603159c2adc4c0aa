use std::collections::HashMap;

use crate::diagnostic::{ErrorKind, Fault};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bracket {
    Open,
    Close,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BracketError {
    #[error("loop close at instruction {index} has no matching open")]
    UnmatchedClose { index: usize },
    #[error("loop open at instruction {index} is never closed")]
    UnclosedOpen { index: usize },
}

impl BracketError {
    pub fn index(&self) -> usize {
        match self {
            BracketError::UnmatchedClose { index } | BracketError::UnclosedOpen { index } => *index,
        }
    }
}

impl Fault for BracketError {
    fn kind(&self) -> ErrorKind {
        match self {
            BracketError::UnmatchedClose { .. } => ErrorKind::MismatchedBracket,
            BracketError::UnclosedOpen { .. } => ErrorKind::TrailingBracket,
        }
    }
}

/// Bidirectional loop-open ↔ loop-close map over instruction indices.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JumpMap {
    partners: HashMap<usize, usize>,
}

impl JumpMap {
    /// Single left-to-right pass: push on open, pop and pair on close.
    /// When several opens are left over the outermost one is reported.
    pub fn build(brackets: impl IntoIterator<Item = (usize, Bracket)>) -> Result<Self, BracketError> {
        let mut partners = HashMap::new();
        let mut open = Vec::new();
        for (index, bracket) in brackets {
            match bracket {
                Bracket::Open => open.push(index),
                Bracket::Close => {
                    let start = open.pop().ok_or(BracketError::UnmatchedClose { index })?;
                    partners.insert(start, index);
                    partners.insert(index, start);
                }
            }
        }
        if let Some(&index) = open.first() {
            return Err(BracketError::UnclosedOpen { index });
        }
        Ok(JumpMap { partners })
    }

    pub fn partner(&self, index: usize) -> Option<usize> {
        self.partners.get(&index).copied()
    }

    /// Number of matched pairs.
    pub fn pairs(&self) -> usize {
        self.partners.len() / 2
    }

    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.partners.keys().copied()
    }
}
