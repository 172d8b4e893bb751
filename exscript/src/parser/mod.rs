pub mod error;
pub mod sections;
mod structural;

pub use error::ParseError;
pub use sections::{BlockSections, classify};

use crate::Outline;

/// Parser entry point.
pub struct Parser {
    source: String,
    file_id: usize,
}

impl Parser {
    pub fn new(source: impl Into<String>, file_id: usize) -> Self {
        Parser {
            source: source.into(),
            file_id,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Split the script into exercise blocks. Never fails: structural
    /// problems are reported as warnings on the outline.
    pub fn parse(&self) -> Outline {
        let (blocks, warnings) = structural::extract_blocks(&self.source, self.file_id);
        Outline {
            blocks,
            warnings,
            source_id: self.file_id,
        }
    }
}
