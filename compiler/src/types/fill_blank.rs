//! Fill-in-the-blank: `The *cat|kitty* sat on the *mat*.`

use serde::{Deserialize, Serialize};

use crate::content::ContentLine;
use crate::error::{ContentError, RegistryError};
use crate::registry::{Grammar, TypeDescriptor};
use crate::types::{ExerciseContent, mismatch, text_lines};
use crate::validation::ValidationResult;

pub const TAG: &str = "fill-blank";

/// Stands in for a blank in the display text.
pub const PLACEHOLDER: &str = "___";

const MAX_SENTENCES: usize = 50;
const MAX_BLANKS: usize = 10;
const MAX_ANSWERS: usize = 10;
const MAX_SENTENCE_CHARS: usize = 500;
const MAX_ANSWER_CHARS: usize = 100;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FillBlankContent {
    pub sentences: Vec<FillSentence>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FillSentence {
    /// Display text with each blank replaced by the placeholder.
    pub text: String,
    pub blanks: Vec<Blank>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blank {
    /// Character offset of the placeholder in the display text.
    pub position: usize,
    /// Accepted answers; the first is canonical.
    pub answers: Vec<String>,
}

pub fn descriptor() -> Result<TypeDescriptor, RegistryError> {
    TypeDescriptor::builder(TAG)
        .display_name("Fill in the blank")
        .priority(20)
        .default_instructions("Fill in the missing words.")
        .alias("fill")
        .alias("fill_blank")
        .alias("blanks")
        .grammar(FillBlank)
        .build()
}

struct FillBlank;

/// Parse the `*...*` spans of one line. `None` if it has none.
///
/// A span is a `*`, a non-empty inner text that neither starts nor ends
/// with whitespace, and a closing `*`. Other asterisks are literal.
pub fn parse_sentence(line: &str) -> Option<FillSentence> {
    let chars: Vec<char> = line.chars().collect();
    let mut text = String::with_capacity(line.len());
    let mut text_len = 0;
    let mut blanks = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        if chars[i] == '*' {
            if let Some(close) = chars[i + 1..].iter().position(|&c| c == '*').map(|p| p + i + 1) {
                let inner: String = chars[i + 1..close].iter().collect();
                let spaced = inner.starts_with(char::is_whitespace) || inner.ends_with(char::is_whitespace);
                if !inner.is_empty() && !spaced {
                    blanks.push(Blank {
                        position: text_len,
                        answers: inner.split('|').map(|a| a.trim().to_string()).collect(),
                    });
                    text.push_str(PLACEHOLDER);
                    text_len += PLACEHOLDER.chars().count();
                    i = close + 1;
                    continue;
                }
            }
        }
        text.push(chars[i]);
        text_len += 1;
        i += 1;
    }

    if blanks.is_empty() {
        None
    } else {
        Some(FillSentence { text, blanks })
    }
}

/// Rebuild the `*answer*` form of a sentence.
pub fn render_sentence(sentence: &FillSentence) -> Result<String, ContentError> {
    let chars: Vec<char> = sentence.text.chars().collect();
    let placeholder_len = PLACEHOLDER.chars().count();
    let mut out = String::with_capacity(sentence.text.len() + 16);
    let mut cursor = 0;
    for blank in &sentence.blanks {
        let end = blank.position + placeholder_len;
        let found: String = chars.get(blank.position..end).map(|c| c.iter().collect()).unwrap_or_default();
        if blank.position < cursor || found != PLACEHOLDER {
            return Err(ContentError::line(0, format!(
                "blank at position {} does not point at a placeholder in '{}'",
                blank.position, sentence.text
            )));
        }
        out.extend(&chars[cursor..blank.position]);
        out.push('*');
        out.push_str(&blank.answers.join("|"));
        out.push('*');
        cursor = end;
    }
    out.extend(&chars[cursor..]);
    Ok(out)
}

impl Grammar for FillBlank {
    fn detect(&self, lines: &[ContentLine]) -> bool {
        text_lines(lines).any(|l| parse_sentence(&l.text).is_some())
    }

    fn parse(&self, lines: &[ContentLine]) -> Result<ExerciseContent, ContentError> {
        let mut sentences = Vec::new();
        for line in text_lines(lines) {
            match parse_sentence(&line.text) {
                Some(sentence) => sentences.push(sentence),
                None => {
                    return Err(ContentError::line(
                        line.line,
                        format!("no blank found in '{}' (mark answers as *answer*)", line.text),
                    ));
                }
            }
        }
        if sentences.is_empty() {
            return Err(ContentError::NoContent(TAG.to_string()));
        }
        Ok(ExerciseContent::FillBlank(FillBlankContent {
            sentences,
            variation: None,
        }))
    }

    fn validate(&self, content: &ExerciseContent) -> ValidationResult {
        let ExerciseContent::FillBlank(content) = content else {
            return ValidationResult::failed(mismatch(TAG).to_string());
        };
        let mut result = ValidationResult::new();
        result.count("fill-blank exercise", content.sentences.len(), 1, MAX_SENTENCES);
        for (i, sentence) in content.sentences.iter().enumerate() {
            let label = format!("sentence {}", i + 1);
            result.text(&label, &sentence.text, MAX_SENTENCE_CHARS);
            result.count(&label, sentence.blanks.len(), 1, MAX_BLANKS);
            let len = sentence.text.chars().count();
            for (j, blank) in sentence.blanks.iter().enumerate() {
                let label = format!("sentence {}, blank {}", i + 1, j + 1);
                if blank.position > len {
                    result.error(format!("{} is positioned outside the sentence", label));
                }
                result.count(&label, blank.answers.len(), 1, MAX_ANSWERS);
                for answer in &blank.answers {
                    result.text(&format!("{} answer", label), answer, MAX_ANSWER_CHARS);
                }
            }
        }
        result
    }

    fn serialize(&self, content: &ExerciseContent) -> Result<Vec<String>, ContentError> {
        let ExerciseContent::FillBlank(content) = content else {
            return Err(mismatch(TAG));
        };
        content.sentences.iter().map(render_sentence).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::lines_from_text;

    fn parse(lines: &[&str]) -> Result<FillBlankContent, ContentError> {
        match FillBlank.parse(&lines_from_text(lines).unwrap())? {
            ExerciseContent::FillBlank(c) => Ok(c),
            other => panic!("unexpected content {:?}", other),
        }
    }

    #[test]
    fn blanks_in_source_order() {
        let c = parse(&["The *cat|kitty* sat on the *mat*."]).unwrap();
        let s = &c.sentences[0];
        assert_eq!(s.text, "The ___ sat on the ___.");
        assert_eq!(s.blanks.len(), 2);
        assert_eq!(s.blanks[0].position, 4);
        assert_eq!(s.blanks[0].answers, vec!["cat", "kitty"]);
        assert_eq!(s.blanks[1].position, 19);
        assert_eq!(s.blanks[1].answers, vec!["mat"]);
    }

    #[test]
    fn positions_count_characters() {
        let c = parse(&["Él *es* alto."]).unwrap();
        assert_eq!(c.sentences[0].blanks[0].position, 3);
    }

    #[test]
    fn spaced_asterisks_are_literal() {
        assert!(parse_sentence("2 * 3 * 4").is_none());
        assert!(parse_sentence("a ** b").is_none());
        let s = parse_sentence("5 * 2 is *10*").unwrap();
        assert_eq!(s.blanks.len(), 1);
        assert_eq!(s.text, "5 * 2 is ___");
    }

    #[test]
    fn line_without_blank_is_an_error() {
        let err = parse(&["The *cat* sat.", "No blank here."]).unwrap_err();
        assert!(matches!(err, ContentError::Line { .. }));
    }

    #[test]
    fn validation_limits() {
        let ok = FillBlank.parse(&lines_from_text(&["A *b* c"]).unwrap()).unwrap();
        assert!(FillBlank.validate(&ok).is_valid);

        let empty_answer = FillBlank.parse(&lines_from_text(&["A *b||c* d"]).unwrap()).unwrap();
        assert!(!FillBlank.validate(&empty_answer).is_valid);

        let many = "*a* ".repeat(11);
        let too_many = FillBlank.parse(&lines_from_text(&[many.as_str()]).unwrap()).unwrap();
        assert!(!FillBlank.validate(&too_many).is_valid);

        let long = format!("*a* {}", "x".repeat(MAX_SENTENCE_CHARS));
        let too_long = FillBlank.parse(&lines_from_text(&[long.as_str()]).unwrap()).unwrap();
        assert!(!FillBlank.validate(&too_long).is_valid);
    }

    #[test]
    fn serialize_round_trip() {
        let original = FillBlank.parse(&lines_from_text(&["The *cat|kitty* sat on the *mat*."]).unwrap()).unwrap();
        let lines = FillBlank.serialize(&original).unwrap();
        assert_eq!(lines, vec!["The *cat|kitty* sat on the *mat*."]);
        let again = FillBlank.parse(&lines_from_text(&lines).unwrap()).unwrap();
        assert_eq!(again, original);
    }

    #[test]
    fn serialize_rejects_bad_positions() {
        let content = ExerciseContent::FillBlank(FillBlankContent {
            sentences: vec![FillSentence {
                text: "no placeholder".into(),
                blanks: vec![Blank {
                    position: 0,
                    answers: vec!["x".into()],
                }],
            }],
            variation: None,
        });
        assert!(FillBlank.serialize(&content).is_err());
    }
}
