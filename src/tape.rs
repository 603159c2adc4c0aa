/// Byte-cell memory for the bracket engines.
///
/// Starts as a single zero cell and grows on demand to the right. The
/// cursor never moves left of cell 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tape {
    cells: Vec<u8>,
    cursor: usize,
}

impl Default for Tape {
    fn default() -> Self {
        Tape { cells: vec![0], cursor: 0 }
    }
}

impl Tape {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn right(&mut self) {
        self.cursor += 1;
        if self.cursor == self.cells.len() {
            self.cells.push(0);
        }
    }

    pub fn get(&self) -> u8 {
        self.cells[self.cursor]
    }

    pub fn set(&mut self, value: u8) {
        self.cells[self.cursor] = value;
    }

    pub fn increment(&mut self) {
        self.set(self.get().wrapping_add(1));
    }

    pub fn decrement(&mut self) {
        self.set(self.get().wrapping_sub(1));
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn cells(&self) -> &[u8] {
        &self.cells
    }

    pub fn into_cells(self) -> Vec<u8> {
        self.cells
    }
}
