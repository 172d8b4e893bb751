//! Multiple choice: `What is 2+2? = 3 | 4 | 5 [4]`.

use serde::{Deserialize, Serialize};

use crate::content::ContentLine;
use crate::error::{ContentError, RegistryError};
use crate::registry::{Grammar, TypeDescriptor};
use crate::types::{ExerciseContent, mismatch, split_pipes, text_lines};
use crate::validation::{ValidationResult, duplicates};

pub const TAG: &str = "multiple-choice";

const MAX_QUESTIONS: usize = 50;
const MIN_OPTIONS: usize = 2;
const MAX_OPTIONS: usize = 10;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultipleChoiceContent {
    pub questions: Vec<ChoiceQuestion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub correct_indices: Vec<usize>,
}

pub fn descriptor() -> Result<TypeDescriptor, RegistryError> {
    TypeDescriptor::builder(TAG)
        .display_name("Multiple choice")
        .priority(30)
        .default_instructions("Choose the correct answer.")
        .alias("mc")
        .alias("choice")
        .alias("quiz")
        .grammar(MultipleChoice)
        .build()
}

struct MultipleChoice;

pub fn qualifies(text: &str) -> bool {
    text.contains('|') && text.contains('[') && text.contains('=')
}

/// Parse one question line. Missing or unmatched labels mark the first
/// option as correct.
pub fn parse_question(text: &str) -> Option<ChoiceQuestion> {
    let (question, rest) = text.split_once('=')?;
    let rest = rest.trim();

    let (options_part, labels) = match (rest.rfind('['), rest.ends_with(']')) {
        (Some(open), true) => {
            let labels: Vec<String> = rest[open + 1..rest.len() - 1]
                .split(',')
                .map(|l| l.trim().to_string())
                .filter(|l| !l.is_empty())
                .collect();
            (&rest[..open], labels)
        }
        _ => (rest, Vec::new()),
    };

    let options = split_pipes(options_part);
    let mut correct: Vec<usize> = labels
        .iter()
        .filter_map(|label| options.iter().position(|o| o.to_lowercase() == label.to_lowercase()))
        .collect();
    correct.sort_unstable();
    correct.dedup();

    if correct.is_empty() {
        tracing::warn!(question = question.trim(), "no correct option marked; defaulting to the first");
        correct.push(0);
    }

    Some(ChoiceQuestion {
        question: question.trim().to_string(),
        options,
        correct_indices: correct,
    })
}

impl Grammar for MultipleChoice {
    fn detect(&self, lines: &[ContentLine]) -> bool {
        text_lines(lines).any(|l| qualifies(&l.text))
    }

    fn parse(&self, lines: &[ContentLine]) -> Result<ExerciseContent, ContentError> {
        let mut questions = Vec::new();
        for line in text_lines(lines) {
            let question = line
                .text
                .contains('|')
                .then(|| parse_question(&line.text))
                .flatten();
            match question {
                Some(q) => questions.push(q),
                None => {
                    return Err(ContentError::line(
                        line.line,
                        format!("expected 'question = a | b | c [answer]', found '{}'", line.text),
                    ));
                }
            }
        }
        if questions.is_empty() {
            return Err(ContentError::NoContent(TAG.to_string()));
        }
        Ok(ExerciseContent::MultipleChoice(MultipleChoiceContent {
            questions,
            variation: None,
        }))
    }

    fn validate(&self, content: &ExerciseContent) -> ValidationResult {
        let ExerciseContent::MultipleChoice(content) = content else {
            return ValidationResult::failed(mismatch(TAG).to_string());
        };
        let mut result = ValidationResult::new();
        result.count("multiple-choice exercise", content.questions.len(), 1, MAX_QUESTIONS);
        for (i, q) in content.questions.iter().enumerate() {
            let label = format!("question {}", i + 1);
            if q.question.trim().is_empty() {
                result.error(format!("{} has no question text", label));
            }
            result.count(&format!("{} options", label), q.options.len(), MIN_OPTIONS, MAX_OPTIONS);
            if q.options.iter().any(|o| o.trim().is_empty()) {
                result.error(format!("{} has an empty option", label));
            }
            for option in duplicates(q.options.iter().map(String::as_str)) {
                result.warning(format!("{} lists '{}' more than once", label, option));
            }
            if q.correct_indices.is_empty() {
                result.error(format!("{} has no correct answer", label));
            }
            if let Some(bad) = q.correct_indices.iter().find(|&&i| i >= q.options.len()) {
                result.error(format!("{} marks option {} as correct, but has {} options", label, bad + 1, q.options.len()));
            }
        }
        result
    }

    fn serialize(&self, content: &ExerciseContent) -> Result<Vec<String>, ContentError> {
        let ExerciseContent::MultipleChoice(content) = content else {
            return Err(mismatch(TAG));
        };
        content
            .questions
            .iter()
            .map(|q| {
                let labels = q
                    .correct_indices
                    .iter()
                    .map(|&i| {
                        q.options.get(i).cloned().ok_or_else(|| {
                            ContentError::line(0, format!("correct index {} is out of bounds", i))
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(format!("{} = {} [{}]", q.question, q.options.join(" | "), labels.join(", ")))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::lines_from_text;

    fn parse(lines: &[&str]) -> ExerciseContent {
        MultipleChoice.parse(&lines_from_text(lines).unwrap()).unwrap()
    }

    fn question(content: &ExerciseContent, i: usize) -> &ChoiceQuestion {
        let ExerciseContent::MultipleChoice(c) = content else {
            panic!("expected multiple choice");
        };
        &c.questions[i]
    }

    #[test]
    fn parses_question_options_and_answer() {
        let content = parse(&["What is 2+2? = 3 | 4 | 5 [4]"]);
        let q = question(&content, 0);
        assert_eq!(q.question, "What is 2+2?");
        assert_eq!(q.options, vec!["3", "4", "5"]);
        assert_eq!(q.correct_indices, vec![1]);
        assert!(MultipleChoice.validate(&content).is_valid);
    }

    #[test]
    fn labels_match_case_insensitively() {
        let content = parse(&["Pick colors = Red | blue | Green [RED, green]"]);
        assert_eq!(question(&content, 0).correct_indices, vec![0, 2]);
    }

    #[test]
    fn missing_or_unmatched_labels_default_to_first() {
        let content = parse(&["Capital? = Rome | Paris [Berlin]", "Sea? = Red | Dead"]);
        assert_eq!(question(&content, 0).correct_indices, vec![0]);
        assert_eq!(question(&content, 1).correct_indices, vec![0]);
        assert!(MultipleChoice.validate(&content).is_valid);
    }

    #[test]
    fn single_option_fails() {
        let content = parse(&["Only? = yes [yes] | "]);
        assert!(!MultipleChoice.validate(&content).is_valid);
    }

    #[test]
    fn out_of_bounds_index_fails() {
        let content = ExerciseContent::MultipleChoice(MultipleChoiceContent {
            questions: vec![ChoiceQuestion {
                question: "Q".into(),
                options: vec!["a".into(), "b".into()],
                correct_indices: vec![5],
            }],
            variation: None,
        });
        assert!(!MultipleChoice.validate(&content).is_valid);
        assert!(MultipleChoice.serialize(&content).is_err());
    }

    #[test]
    fn serialize_round_trip() {
        let content = parse(&["What is 2+2? = 3 | 4 | 5 [4]", "Colors? = red | tree | blue [red, blue]"]);
        let lines = MultipleChoice.serialize(&content).unwrap();
        assert_eq!(lines[0], "What is 2+2? = 3 | 4 | 5 [4]");
        assert_eq!(MultipleChoice.parse(&lines_from_text(&lines).unwrap()).unwrap(), content);
    }
}
