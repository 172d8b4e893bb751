//! Ordering: `I | like | to | read`, plus the `single` (letter scramble)
//! and `aligner` variations.

use exscript::call::{find_bare_calls, quote_argument};
use serde::{Deserialize, Serialize};

use crate::content::ContentLine;
use crate::error::{ContentError, RegistryError};
use crate::registry::{Grammar, TypeDescriptor, VariationDescriptor, VariationGrammar};
use crate::types::{ExerciseContent, mismatch, split_pipes, text_lines};
use crate::validation::{ValidationResult, duplicates};

pub const TAG: &str = "ordering";
pub const SINGLE: &str = "single";
pub const ALIGNER: &str = "aligner";

const MAX_SENTENCES: usize = 30;
const MIN_SEGMENTS: usize = 2;
const MAX_SEGMENTS: usize = 20;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderingContent {
    pub sentences: Vec<OrderingSentence>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderingSentence {
    /// Segments in their correct order.
    pub segments: Vec<String>,
}

pub fn descriptor() -> Result<TypeDescriptor, RegistryError> {
    TypeDescriptor::builder(TAG)
        .display_name("Ordering")
        .priority(60)
        .default_instructions("Put the pieces in the correct order.")
        .alias("order")
        .alias("sort")
        .grammar(Ordering)
        .variation(VariationDescriptor::new(SINGLE, "Letter scramble").with_grammar(Single))
        .variation(VariationDescriptor::new(ALIGNER, "Sentence aligner").with_grammar(Aligner))
        .detect_variation(detect_variation)
        .build()
}

/// `|` without `=` or `[`.
pub fn qualifies(text: &str) -> bool {
    text.contains('|') && !text.contains('=') && !text.contains('[')
}

fn has_align(text: &str) -> bool {
    find_bare_calls(text, &["align"]).is_ok_and(|calls| !calls.is_empty())
}

fn is_single_word(text: &str) -> bool {
    !text.is_empty() && text.chars().all(char::is_alphabetic)
}

fn detect_variation(lines: &[ContentLine]) -> Option<&'static str> {
    let mut text = text_lines(lines).peekable();
    text.peek()?;
    let lines: Vec<&ContentLine> = text.collect();
    if lines.iter().any(|l| has_align(&l.text)) {
        Some(ALIGNER)
    } else if lines.iter().all(|l| is_single_word(&l.text)) {
        Some(SINGLE)
    } else {
        None
    }
}

fn content(sentences: Vec<OrderingSentence>) -> Result<ExerciseContent, ContentError> {
    if sentences.is_empty() {
        return Err(ContentError::NoContent(TAG.to_string()));
    }
    Ok(ExerciseContent::Ordering(OrderingContent {
        sentences,
        variation: None,
    }))
}

fn unexpected(line: &ContentLine) -> ContentError {
    ContentError::line(
        line.line,
        format!("expected segments separated by '|', found '{}'", line.text),
    )
}

fn segments_of(content: &ExerciseContent) -> Result<&[OrderingSentence], ContentError> {
    match content {
        ExerciseContent::Ordering(c) => Ok(&c.sentences),
        _ => Err(mismatch(TAG)),
    }
}

struct Ordering;

impl Grammar for Ordering {
    fn detect(&self, lines: &[ContentLine]) -> bool {
        let mut text = text_lines(lines).peekable();
        if text.peek().is_none() {
            return false;
        }
        let lines: Vec<&ContentLine> = text.collect();
        lines.iter().any(|l| qualifies(&l.text) || has_align(&l.text))
            || lines.iter().all(|l| is_single_word(&l.text))
    }

    fn parse(&self, lines: &[ContentLine]) -> Result<ExerciseContent, ContentError> {
        let mut sentences = Vec::new();
        for line in text_lines(lines) {
            if !qualifies(&line.text) {
                return Err(unexpected(line));
            }
            sentences.push(OrderingSentence {
                segments: split_pipes(&line.text),
            });
        }
        content(sentences)
    }

    fn validate(&self, content: &ExerciseContent) -> ValidationResult {
        let sentences = match segments_of(content) {
            Ok(s) => s,
            Err(e) => return ValidationResult::failed(e.to_string()),
        };
        let mut result = ValidationResult::new();
        result.count("ordering exercise", sentences.len(), 1, MAX_SENTENCES);
        for (i, sentence) in sentences.iter().enumerate() {
            let label = format!("sentence {}", i + 1);
            result.count(&label, sentence.segments.len(), MIN_SEGMENTS, MAX_SEGMENTS);
            for segment in duplicates(sentence.segments.iter().map(String::as_str)) {
                result.error(format!("{} repeats the segment '{}'", label, segment));
            }
        }
        result
    }

    fn serialize(&self, content: &ExerciseContent) -> Result<Vec<String>, ContentError> {
        Ok(segments_of(content)?
            .iter()
            .map(|s| s.segments.join(" | "))
            .collect())
    }
}

/// Each bare word becomes a sentence of its letters.
struct Single;

impl VariationGrammar for Single {
    fn parse(&self, lines: &[ContentLine]) -> Option<Result<ExerciseContent, ContentError>> {
        let mut sentences = Vec::new();
        for line in text_lines(lines) {
            let segments = if is_single_word(&line.text) {
                line.text.chars().map(|c| c.to_string()).collect()
            } else if qualifies(&line.text) {
                split_pipes(&line.text)
            } else {
                return Some(Err(unexpected(line)));
            };
            sentences.push(OrderingSentence { segments });
        }
        Some(content(sentences))
    }

    fn validate(&self, content: &ExerciseContent) -> Option<ValidationResult> {
        let sentences = match segments_of(content) {
            Ok(s) => s,
            Err(e) => return Some(ValidationResult::failed(e.to_string())),
        };
        let mut result = ValidationResult::new();
        result.count("letter scramble", sentences.len(), 1, MAX_SENTENCES);
        for (i, sentence) in sentences.iter().enumerate() {
            let label = format!("word {}", i + 1);
            result.count(&label, sentence.segments.len(), MIN_SEGMENTS, MAX_SEGMENTS);
            let letters = sentence
                .segments
                .iter()
                .all(|s| s.chars().count() == 1 && s.chars().all(char::is_alphabetic));
            if !letters {
                result.error(format!("{} must consist of single letters", label));
            }
        }
        Some(result)
    }

    fn serialize(&self, content: &ExerciseContent) -> Option<Result<Vec<String>, ContentError>> {
        let sentences = match segments_of(content) {
            Ok(s) => s,
            Err(e) => return Some(Err(e)),
        };
        Some(Ok(sentences
            .iter()
            .map(|s| {
                let word: String = s.segments.concat();
                if is_single_word(&word) && s.segments.iter().all(|seg| seg.chars().count() == 1) {
                    word
                } else {
                    s.segments.join(" | ")
                }
            })
            .collect()))
    }
}

/// `align(a, b, c)` calls, and runs of plain lines, each form one sentence.
struct Aligner;

impl VariationGrammar for Aligner {
    fn parse(&self, lines: &[ContentLine]) -> Option<Result<ExerciseContent, ContentError>> {
        let mut sentences = Vec::new();
        let mut run: Vec<String> = Vec::new();
        let flush = |run: &mut Vec<String>, sentences: &mut Vec<OrderingSentence>| {
            if !run.is_empty() {
                sentences.push(OrderingSentence {
                    segments: std::mem::take(run),
                });
            }
        };

        for line in text_lines(lines) {
            let calls = match find_bare_calls(&line.text, &["align"]) {
                Ok(calls) => calls,
                Err(e) => return Some(Err(ContentError::line(line.line, e.message))),
            };
            if !calls.is_empty() {
                flush(&mut run, &mut sentences);
                for call in calls {
                    sentences.push(OrderingSentence {
                        segments: call.arguments.iter().map(|a| a.value.to_string()).collect(),
                    });
                }
            } else if qualifies(&line.text) {
                flush(&mut run, &mut sentences);
                sentences.push(OrderingSentence {
                    segments: split_pipes(&line.text),
                });
            } else {
                run.push(line.text.clone());
            }
        }
        flush(&mut run, &mut sentences);
        Some(content(sentences))
    }

    fn serialize(&self, content: &ExerciseContent) -> Option<Result<Vec<String>, ContentError>> {
        let sentences = match segments_of(content) {
            Ok(s) => s,
            Err(e) => return Some(Err(e)),
        };
        Some(Ok(sentences
            .iter()
            .map(|s| {
                let args: Vec<String> = s.segments.iter().map(|seg| quote_argument(seg)).collect();
                format!("align({})", args.join(", "))
            })
            .collect()))
    }
}
