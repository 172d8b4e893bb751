pub mod annotation;
pub mod block;
pub mod call;
pub mod fields;
pub mod parser;

use crate::block::ExerciseBlock;
use crate::parser::ParseError;

/// A script split into its exercise blocks.
#[derive(Debug, Clone)]
pub struct Outline {
    /// Closed blocks, in source order.
    pub blocks: Vec<ExerciseBlock>,
    /// Structural warnings (stray text, unterminated blocks).
    pub warnings: Vec<ParseError>,
    /// The source file ID (for error reporting with codespan-reporting).
    pub source_id: usize,
}

/// Render a number without a trailing `.0` when it is integral.
pub fn format_number(n: f64) -> String {
    if n.is_finite() && n == n.floor() && n.abs() < 1e15 {
        (n as i64).to_string()
    } else {
        n.to_string()
    }
}

/// Returns true for `//` and `#` comment lines (already trimmed).
pub fn is_comment(trimmed: &str) -> bool {
    trimmed.starts_with("//") || trimmed.starts_with('#')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_render_without_trailing_zero() {
        assert_eq!(format_number(3.0), "3");
        assert_eq!(format_number(-2.5), "-2.5");
        assert_eq!(format_number(1e20), "100000000000000000000");
    }
}
