/// Line index over a source string. Offsets are bytes; reported columns are
/// characters so that multi-byte symbols such as U+3164 count once.
pub struct SourceMap<'a> {
    source: &'a str,
    /// Byte offset where each line begins; the first entry is always 0.
    line_starts: Vec<usize>,
}

impl<'a> SourceMap<'a> {
    pub fn new(source: &'a str) -> Self {
        let line_starts = std::iter::once(0).chain(source.match_indices('\n').map(|(i, _)| i + 1)).collect();
        SourceMap { source, line_starts }
    }

    /// 1-based `(line, column)` of `offset`, clamped to the end of the source.
    pub fn lookup(&self, offset: usize) -> (usize, usize) {
        let offset = offset.min(self.source.len());
        let index = self.line_starts.partition_point(|&start| start <= offset) - 1;
        let start = self.line_starts[index];
        let column = match self.source.get(start..offset) {
            Some(prefix) => prefix.chars().count(),
            None => offset - start,
        };
        (index + 1, column + 1)
    }

    pub fn end(&self) -> (usize, usize) {
        self.lookup(self.source.len())
    }

    /// Text of 1-based `line` without its line terminator; empty when out of range.
    pub fn line_text(&self, line: usize) -> &'a str {
        let Some(&start) = line.checked_sub(1).and_then(|i| self.line_starts.get(i)) else {
            return "";
        };
        let end = self.line_starts.get(line).copied().unwrap_or(self.source.len());
        self.source[start..end].trim_end_matches(['\n', '\r'])
    }
}
