use std::ops::Range;

/// A single physical line of a script.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceLine {
    /// 1-based line number in the script.
    pub number: usize,
    /// Line text without the trailing newline.
    pub text: String,
    /// Byte span of the text in the script.
    pub span: Range<usize>,
}

impl SourceLine {
    pub fn trimmed(&self) -> &str {
        self.text.trim()
    }
}

/// A brace-delimited unit of script text describing one exercise.
#[derive(Debug, Clone)]
pub struct ExerciseBlock {
    /// Position among the closed blocks of the script (0-based).
    pub index: usize,
    /// 1-based line of the opening brace.
    pub start_line: usize,
    /// 1-based line of the closing brace.
    pub end_line: usize,
    /// Byte span from the opening to the closing brace, inclusive.
    pub span: Range<usize>,
    /// Raw block text, braces included.
    pub text: String,
    /// Lines between the braces.
    pub lines: Vec<SourceLine>,
}

impl ExerciseBlock {
    /// Byte span of a block-relative line, falling back to the whole block.
    pub fn line_span(&self, number: usize) -> Range<usize> {
        self.lines
            .iter()
            .find(|l| l.number == number)
            .map(|l| l.span.clone())
            .unwrap_or_else(|| self.span.clone())
    }
}
