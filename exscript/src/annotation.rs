use serde::{Deserialize, Serialize};

use crate::call::{CallError, Param, find_calls, quote_argument};

/// Kinds of inline annotation decorators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationKind {
    /// `@img(url)`
    Image,
    /// `@idea(text)`
    Idea,
    /// `@ins(text)`
    Instruction,
    /// `@notes(text)`
    Note,
}

impl AnnotationKind {
    pub const ALL: [AnnotationKind; 4] = [
        AnnotationKind::Image,
        AnnotationKind::Idea,
        AnnotationKind::Instruction,
        AnnotationKind::Note,
    ];

    pub fn from_function(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "img" => Some(AnnotationKind::Image),
            "idea" => Some(AnnotationKind::Idea),
            "ins" => Some(AnnotationKind::Instruction),
            "notes" => Some(AnnotationKind::Note),
            _ => None,
        }
    }

    pub fn function_name(&self) -> &'static str {
        match self {
            AnnotationKind::Image => "img",
            AnnotationKind::Idea => "idea",
            AnnotationKind::Instruction => "ins",
            AnnotationKind::Note => "notes",
        }
    }
}

/// An annotation attached to a content line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    pub kind: AnnotationKind,
    pub text: String,
}

impl Annotation {
    pub fn new(kind: AnnotationKind, text: impl Into<String>) -> Self {
        Annotation {
            kind,
            text: text.into(),
        }
    }

    /// Canonical decorator text, e.g. `@img("https://x/y.png")`.
    pub fn to_decorator(&self) -> String {
        format!("@{}({})", self.kind.function_name(), quote_argument(&self.text))
    }
}

/// Remove annotation decorators from `line`, returning the remaining text
/// (whitespace-collapsed) and the annotations in source order.
///
/// Only literal arguments are accepted here; calls nested inside an
/// annotation must have been resolved beforehand.
pub fn extract_annotations(line: &str) -> Result<(String, Vec<Annotation>), CallError> {
    let calls = find_calls(line)?;
    let mut annotations = Vec::new();
    let mut text = String::with_capacity(line.len());
    let mut last = 0;

    for call in calls {
        let Some(kind) = AnnotationKind::from_function(&call.name) else {
            continue;
        };
        let value = match call.positional(0) {
            Some(Param::Call(inner)) => {
                return Err(CallError::new(
                    format!("unresolved call '{}' inside @{}", inner.name, call.name),
                    call.span.clone(),
                ));
            }
            Some(param) => param.to_string(),
            None => String::new(),
        };
        text.push_str(&line[last..call.span.start]);
        last = call.span.end;
        annotations.push(Annotation::new(kind, value));
    }
    text.push_str(&line[last..]);

    let text = if annotations.is_empty() {
        text
    } else {
        text.split_whitespace().collect::<Vec<_>>().join(" ")
    };
    Ok((text, annotations))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_and_strips_decorators() {
        let (text, notes) = extract_annotations("The @idea(think of pets) cat @img(\"/cat.png\") sat.").unwrap();
        assert_eq!(text, "The cat sat.");
        assert_eq!(
            notes,
            vec![
                Annotation::new(AnnotationKind::Idea, "think of pets"),
                Annotation::new(AnnotationKind::Image, "/cat.png"),
            ]
        );
    }

    #[test]
    fn lines_without_decorators_are_untouched() {
        let (text, notes) = extract_annotations("  I | like  | it ").unwrap();
        assert_eq!(text, "  I | like  | it ");
        assert!(notes.is_empty());
    }

    #[test]
    fn other_calls_are_left_in_place() {
        let (text, notes) = extract_annotations("@notes(x) @fill(animals)").unwrap();
        assert_eq!(text, "@fill(animals)");
        assert_eq!(notes.len(), 1);
    }

    #[test]
    fn decorator_round_trip() {
        let a = Annotation::new(AnnotationKind::Image, "https://example.com/a.png");
        let (text, notes) = extract_annotations(&a.to_decorator()).unwrap();
        assert!(text.is_empty());
        assert_eq!(notes, vec![a]);
    }
}
