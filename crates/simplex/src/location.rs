use std::fmt;

/// A source position: 1-based line and column of the first character of a
/// token or expression.
///
/// Attached to every AST node at parse time and carried on errors so
/// diagnostics can point back into the source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct CodeRange {
    pub line: u32,
    pub column: u32,
}

impl CodeRange {
    #[must_use]
    pub const fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for CodeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Maps byte offsets to line/column positions.
///
/// Built once per source file; lookup is a binary search over line starts.
#[derive(Debug)]
pub(crate) struct LineIndex {
    line_starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        for (offset, byte) in source.bytes().enumerate() {
            if byte == b'\n' {
                line_starts.push(offset + 1);
            }
        }
        Self { line_starts }
    }

    pub fn position(&self, offset: usize) -> CodeRange {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(index) => index,
            Err(index) => index - 1,
        };
        let column = offset - self.line_starts[line];
        CodeRange::new(line as u32 + 1, column as u32 + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_of_first_byte() {
        let index = LineIndex::new("abc\ndef");
        assert_eq!(index.position(0), CodeRange::new(1, 1));
    }

    #[test]
    fn position_after_newline() {
        let index = LineIndex::new("abc\ndef");
        assert_eq!(index.position(4), CodeRange::new(2, 1));
        assert_eq!(index.position(6), CodeRange::new(2, 3));
    }
}
