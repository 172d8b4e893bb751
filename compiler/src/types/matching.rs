//! Matching pairs: `Apple = Fruit` or `Sun :: Sol`.

use serde::{Deserialize, Serialize};

use crate::content::ContentLine;
use crate::error::{ContentError, RegistryError};
use crate::registry::{Grammar, TypeDescriptor};
use crate::types::{ExerciseContent, mismatch, text_lines};
use crate::validation::{ValidationResult, duplicates};

pub const TAG: &str = "matching";

const MIN_PAIRS: usize = 2;
const MAX_PAIRS: usize = 20;
const MAX_ITEM_CHARS: usize = 200;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchingContent {
    pub pairs: Vec<MatchPair>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchPair {
    pub left: String,
    pub right: String,
}

pub fn descriptor() -> Result<TypeDescriptor, RegistryError> {
    TypeDescriptor::builder(TAG)
        .display_name("Matching")
        .priority(50)
        .default_instructions("Match each item with its pair.")
        .alias("match")
        .alias("pairs")
        .grammar(Matching)
        .build()
}

struct Matching;

/// `::` anywhere, or `=` without `[`.
pub fn qualifies(text: &str) -> bool {
    text.contains("::") || (text.contains('=') && !text.contains('['))
}

/// Split at the earliest `::` or `=`.
pub fn split_pair(text: &str) -> Option<MatchPair> {
    let double = text.find("::").map(|p| (p, 2));
    let single = text.find('=').map(|p| (p, 1));
    let (pos, width) = match (double, single) {
        (Some(d), Some(s)) => {
            if d.0 <= s.0 {
                d
            } else {
                s
            }
        }
        (Some(d), None) => d,
        (None, Some(s)) => s,
        (None, None) => return None,
    };
    Some(MatchPair {
        left: text[..pos].trim().to_string(),
        right: text[pos + width..].trim().to_string(),
    })
}

impl Grammar for Matching {
    fn detect(&self, lines: &[ContentLine]) -> bool {
        text_lines(lines).any(|l| qualifies(&l.text))
    }

    fn parse(&self, lines: &[ContentLine]) -> Result<ExerciseContent, ContentError> {
        let mut pairs = Vec::new();
        for line in text_lines(lines) {
            let pair = qualifies(&line.text).then(|| split_pair(&line.text)).flatten();
            match pair {
                Some(pair) => pairs.push(pair),
                None => {
                    return Err(ContentError::line(
                        line.line,
                        format!("expected 'left = right' or 'left :: right', found '{}'", line.text),
                    ));
                }
            }
        }
        if pairs.is_empty() {
            return Err(ContentError::NoContent(TAG.to_string()));
        }
        Ok(ExerciseContent::Matching(MatchingContent {
            pairs,
            variation: None,
        }))
    }

    fn validate(&self, content: &ExerciseContent) -> ValidationResult {
        let ExerciseContent::Matching(content) = content else {
            return ValidationResult::failed(mismatch(TAG).to_string());
        };
        let mut result = ValidationResult::new();
        result.count("matching exercise", content.pairs.len(), MIN_PAIRS, MAX_PAIRS);
        for (i, pair) in content.pairs.iter().enumerate() {
            result.text(&format!("pair {} left item", i + 1), &pair.left, MAX_ITEM_CHARS);
            result.text(&format!("pair {} right item", i + 1), &pair.right, MAX_ITEM_CHARS);
        }
        for item in duplicates(content.pairs.iter().map(|p| p.left.as_str())) {
            result.error(format!("left item '{}' appears more than once", item));
        }
        for item in duplicates(content.pairs.iter().map(|p| p.right.as_str())) {
            result.error(format!("right item '{}' appears more than once", item));
        }
        result
    }

    fn serialize(&self, content: &ExerciseContent) -> Result<Vec<String>, ContentError> {
        let ExerciseContent::Matching(content) = content else {
            return Err(mismatch(TAG));
        };
        Ok(content
            .pairs
            .iter()
            .map(|p| {
                if p.left.contains('=') || p.right.contains('=') || p.left.contains('[') || p.right.contains('[') {
                    format!("{} :: {}", p.left, p.right)
                } else {
                    format!("{} = {}", p.left, p.right)
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::lines_from_text;

    fn parse(lines: &[&str]) -> ExerciseContent {
        Matching.parse(&lines_from_text(lines).unwrap()).unwrap()
    }

    #[test]
    fn qualification_rules() {
        assert!(qualifies("Apple = Fruit"));
        assert!(qualifies("a[1] :: first"));
        assert!(!qualifies("Q = a | b [a]"));
        assert!(!qualifies("no separator"));
    }

    #[test]
    fn two_pairs_are_valid() {
        let content = parse(&["Apple = Fruit", "Car = Vehicle"]);
        let ExerciseContent::Matching(m) = &content else {
            panic!("expected matching");
        };
        assert_eq!(m.pairs.len(), 2);
        assert_eq!(m.pairs[1], MatchPair { left: "Car".into(), right: "Vehicle".into() });
        assert!(Matching.validate(&content).is_valid);
    }

    #[test]
    fn single_pair_fails_validation() {
        let result = Matching.validate(&parse(&["Apple = Fruit"]));
        assert!(!result.is_valid);
        assert!(result.errors[0].contains("at least 2"));
    }

    #[test]
    fn earliest_separator_wins() {
        assert_eq!(
            split_pair("x = y :: z"),
            Some(MatchPair { left: "x".into(), right: "y :: z".into() })
        );
        assert_eq!(
            split_pair("a==b :: c"),
            Some(MatchPair { left: "a".into(), right: "=b :: c".into() })
        );
        assert_eq!(
            split_pair("E :: mc=2"),
            Some(MatchPair { left: "E".into(), right: "mc=2".into() })
        );
    }

    #[test]
    fn duplicates_are_case_insensitive() {
        let result = Matching.validate(&parse(&["Apple = Fruit", "apple = Tree"]));
        assert!(!result.is_valid);
        assert!(result.errors.iter().any(|e| e.contains("left item")));
    }

    #[test]
    fn empty_sides_fail() {
        let result = Matching.validate(&parse(&["Apple =", "Car = Vehicle"]));
        assert!(!result.is_valid);
    }

    #[test]
    fn serialize_round_trip() {
        let content = parse(&["Apple = Fruit", "E :: mc=2"]);
        let lines = Matching.serialize(&content).unwrap();
        assert_eq!(lines, vec!["Apple = Fruit", "E :: mc=2"]);
        assert_eq!(Matching.parse(&lines_from_text(&lines).unwrap()).unwrap(), content);
    }
}
