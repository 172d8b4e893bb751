use std::ops::Range;

use crate::block::{ExerciseBlock, SourceLine};
use crate::is_comment;
use crate::parser::error::ParseError;

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Split script text into balanced blocks.
///
/// Blocks open on a line that is exactly `{` and close when the brace depth
/// returns to zero. An unterminated trailing block is dropped with a warning.
pub fn extract_blocks(source: &str, file_id: usize) -> (Vec<ExerciseBlock>, Vec<ParseError>) {
    let mut state = ExtractState::new(source, file_id);
    for line in split_lines(source) {
        state.feed(line);
    }
    state.finalize()
}

// ---------------------------------------------------------------------------
// Extraction state
// ---------------------------------------------------------------------------

struct ExtractState<'a> {
    source: &'a str,
    file_id: usize,
    current: Option<BlockBuilder>,
    blocks: Vec<ExerciseBlock>,
    warnings: Vec<ParseError>,
    /// Span of the run of stray lines outside any block, reported once.
    stray: Option<Range<usize>>,
}

struct BlockBuilder {
    start_line: usize,
    span_start: usize,
    depth: i64,
    lines: Vec<SourceLine>,
}

impl<'a> ExtractState<'a> {
    fn new(source: &'a str, file_id: usize) -> Self {
        ExtractState {
            source,
            file_id,
            current: None,
            blocks: Vec::new(),
            warnings: Vec::new(),
            stray: None,
        }
    }

    fn feed(&mut self, line: SourceLine) {
        let trimmed = line.trimmed();

        let Some(builder) = self.current.as_mut() else {
            if trimmed.is_empty() || is_comment(trimmed) {
                self.flush_stray();
                return;
            }
            if trimmed == "{" {
                self.flush_stray();
                self.current = Some(BlockBuilder {
                    start_line: line.number,
                    span_start: line.span.start,
                    depth: 1,
                    lines: Vec::new(),
                });
            } else {
                self.stray = Some(match self.stray.take() {
                    Some(run) => run.start..line.span.end,
                    None => line.span.clone(),
                });
            }
            return;
        };

        // Braces inside comment lines never change nesting.
        if is_comment(trimmed) {
            builder.lines.push(line);
            return;
        }

        builder.depth += brace_delta(&line.text);
        if builder.depth > 0 {
            builder.lines.push(line);
            return;
        }

        // Closing line: keep any text written before the final brace.
        if trimmed != "}" {
            if let Some(pos) = line.text.rfind('}') {
                let before = &line.text[..pos];
                if !before.trim().is_empty() {
                    builder.lines.push(SourceLine {
                        number: line.number,
                        text: before.to_string(),
                        span: line.span.start..line.span.start + pos,
                    });
                }
            }
        }

        if let Some(builder) = self.current.take() {
            let span = builder.span_start..line.span.end;
            self.blocks.push(ExerciseBlock {
                index: self.blocks.len(),
                start_line: builder.start_line,
                end_line: line.number,
                text: self.source[span.clone()].to_string(),
                span,
                lines: builder.lines,
            });
        }
    }

    fn flush_stray(&mut self) {
        if let Some(span) = self.stray.take() {
            self.warnings.push(
                ParseError::warning("text outside of an exercise block is ignored", span, self.file_id)
                    .with_note("wrap each exercise in a `{` ... `}` pair on their own lines"),
            );
        }
    }

    fn finalize(mut self) -> (Vec<ExerciseBlock>, Vec<ParseError>) {
        self.flush_stray();
        if let Some(builder) = self.current.take() {
            let span = builder.span_start..self.source.len();
            self.warnings.push(ParseError::warning(
                format!(
                    "block starting on line {} is never closed and was skipped",
                    builder.start_line
                ),
                span,
                self.file_id,
            ));
        }
        (self.blocks, self.warnings)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Split source into lines with 1-based numbers and byte spans, dropping `\r`.
fn split_lines(source: &str) -> Vec<SourceLine> {
    let mut lines = Vec::new();
    let mut offset = 0;
    for (i, raw) in source.split('\n').enumerate() {
        let text = raw.strip_suffix('\r').unwrap_or(raw);
        lines.push(SourceLine {
            number: i + 1,
            text: text.to_string(),
            span: offset..offset + text.len(),
        });
        offset += raw.len() + 1;
    }
    lines
}

/// Net change in brace depth for one line, ignoring braces inside double quotes.
fn brace_delta(text: &str) -> i64 {
    let mut delta = 0;
    let mut in_string = false;
    let mut escaped = false;
    for c in text.chars() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => delta += 1,
            '}' => delta -= 1,
            _ => {}
        }
    }
    delta
}
