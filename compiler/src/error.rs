use std::ops::Range;

use codespan_reporting::diagnostic::{Diagnostic as CodespanDiagnostic, Label, Severity as CodespanSeverity};
use exscript::call::CallError;
use serde::{Deserialize, Serialize};

/// Failure while evaluating a script function. Aborts the owning block.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FunctionError {
    #[error("unknown function '@{0}'")]
    UnknownFunction(String),
    #[error("@{function}: {message}")]
    InvalidParameter { function: String, message: String },
    #[error("undefined variable '{0}'")]
    UndefinedVariable(String),
    #[error("variable '{0}' depends on itself")]
    CircularVariable(String),
    #[error("calls nested deeper than {0} levels")]
    TooDeep(usize),
    #[error(transparent)]
    Words(#[from] WordLibraryError),
    #[error("{0}")]
    Syntax(#[from] CallError),
}

impl FunctionError {
    pub fn invalid(function: &str, message: impl Into<String>) -> Self {
        FunctionError::InvalidParameter {
            function: function.to_string(),
            message: message.into(),
        }
    }
}

/// Word library lookups and loading.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WordLibraryError {
    #[error("no words found for '{query}'{filters}")]
    NotFound { query: String, filters: String },
    #[error("invalid word library: {0}")]
    Load(String),
}

/// Failure to turn resolved content lines into structured content.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ContentError {
    #[error("could not detect the exercise type; set `type` in the metadata")]
    UndetectedType,
    #[error("unknown exercise type '{0}'")]
    UnknownType(String),
    #[error("exercise type '{tag}' has no variation '{variation}'")]
    UnknownVariation { tag: String, variation: String },
    #[error("no {0} content found")]
    NoContent(String),
    #[error("line {line}: {message}")]
    Line { line: usize, message: String },
    #[error("content is not {0} content")]
    Mismatch(String),
}

impl ContentError {
    pub fn line(line: usize, message: impl Into<String>) -> Self {
        ContentError::Line {
            line,
            message: message.into(),
        }
    }
}

/// Setup-time registration failure. Indicates a programming defect.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RegistryError {
    #[error("type descriptor is missing its tag")]
    MissingTag,
    #[error("type descriptor '{0}' is missing a display name")]
    MissingDisplayName(String),
    #[error("type descriptor '{0}' is missing its grammar")]
    MissingGrammar(String),
    #[error("type descriptor '{tag}' names undefined default variation '{variation}'")]
    UnknownDefaultVariation { tag: String, variation: String },
    #[error("exercise type '{0}' is already registered")]
    DuplicateType(String),
    #[error("alias '{alias}' is already taken by '{owner}'")]
    DuplicateAlias { alias: String, owner: String },
    #[error("function '{0}' is already registered")]
    DuplicateFunction(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A block-level error or warning enriched with source location information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    /// Index of the block among the closed blocks, if any.
    pub block: Option<usize>,
    /// 1-based script line.
    pub line: Option<usize>,
    /// Byte span in the script.
    pub span: Option<Range<usize>>,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Error,
            message: message.into(),
            block: None,
            line: None,
            span: None,
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Warning,
            ..Diagnostic::error(message)
        }
    }

    pub fn in_block(mut self, block: usize) -> Self {
        self.block = Some(block);
        self
    }

    pub fn at(mut self, line: usize, span: Range<usize>) -> Self {
        self.line = Some(line);
        self.span = Some(span);
        self
    }

    pub fn is_warning(&self) -> bool {
        self.severity == Severity::Warning
    }

    /// `block N (line L): message`, omitting the parts that are unknown.
    pub fn render(&self) -> String {
        match (self.block, self.line) {
            (Some(b), Some(l)) => format!("block {} (line {}): {}", b + 1, l, self.message),
            (Some(b), None) => format!("block {}: {}", b + 1, self.message),
            (None, Some(l)) => format!("line {}: {}", l, self.message),
            (None, None) => self.message.clone(),
        }
    }

    /// Convert to a codespan-reporting Diagnostic for display.
    pub fn to_codespan(&self, file_id: usize) -> CodespanDiagnostic<usize> {
        let severity = match self.severity {
            Severity::Error => CodespanSeverity::Error,
            Severity::Warning => CodespanSeverity::Warning,
        };
        let mut diagnostic = CodespanDiagnostic::new(severity).with_message(&self.message);
        if let Some(span) = &self.span {
            diagnostic = diagnostic.with_labels(vec![Label::primary(file_id, span.clone())]);
        }
        if let Some(block) = self.block {
            diagnostic = diagnostic.with_notes(vec![format!("in exercise block {}", block + 1)]);
        }
        diagnostic
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_includes_known_location() {
        let d = Diagnostic::error("unknown function '@nope'").in_block(1).at(7, 40..52);
        assert_eq!(d.render(), "block 2 (line 7): unknown function '@nope'");
        assert_eq!(Diagnostic::warning("x").render(), "x");
    }

    #[test]
    fn codespan_conversion_keeps_span() {
        let d = Diagnostic::warning("stray text").at(3, 10..14);
        let cs = d.to_codespan(0);
        assert_eq!(cs.severity, CodespanSeverity::Warning);
        assert_eq!(cs.labels.len(), 1);
        assert_eq!(cs.labels[0].range, 10..14);
    }
}
