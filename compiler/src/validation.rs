use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Outcome of validating structured content.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        ValidationResult {
            is_valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        let mut result = ValidationResult::new();
        result.error(message);
        result
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.is_valid = false;
        self.errors.push(message.into());
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    /// Record an error unless `min <= count <= max`.
    pub fn count(&mut self, what: &str, count: usize, min: usize, max: usize) {
        if count < min {
            self.error(format!("{} needs at least {} {}, found {}", what, min, noun(min), count));
        } else if count > max {
            self.error(format!("{} allows at most {} {}, found {}", what, max, noun(max), count));
        }
    }

    /// Record an error when `text` is blank or longer than `max` characters.
    pub fn text(&mut self, what: &str, text: &str, max: usize) {
        if text.trim().is_empty() {
            self.error(format!("{} must not be empty", what));
        } else if text.chars().count() > max {
            self.error(format!("{} is longer than {} characters", what, max));
        }
    }

    pub fn merge(&mut self, other: ValidationResult) {
        if !other.is_valid {
            self.is_valid = false;
        }
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }
}

fn noun(n: usize) -> &'static str {
    if n == 1 { "entry" } else { "entries" }
}

/// Case- and whitespace-insensitive comparison key.
pub fn normalized(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

/// Items that repeat under `normalized`, in first-repeat order.
pub fn duplicates<'a>(items: impl IntoIterator<Item = &'a str>) -> Vec<&'a str> {
    let mut seen = HashSet::new();
    let mut repeated = Vec::new();
    for item in items {
        if !seen.insert(normalized(item)) && !repeated.contains(&item) {
            repeated.push(item);
        }
    }
    repeated
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_bounds() {
        let mut r = ValidationResult::new();
        r.count("matching", 1, 2, 20);
        assert!(!r.is_valid);
        assert_eq!(r.errors, vec!["matching needs at least 2 entries, found 1"]);

        let mut r = ValidationResult::new();
        r.count("x", 3, 1, 3);
        assert!(r.is_valid);
    }

    #[test]
    fn duplicates_ignore_case_and_spacing() {
        assert_eq!(duplicates(["cat", "dog", "Cat ", "the  end", "The end"]), vec!["Cat ", "The end"]);
        assert!(duplicates(["a", "b"]).is_empty());
    }

    #[test]
    fn text_rules() {
        let mut r = ValidationResult::new();
        r.text("answer", "  ", 10);
        r.text("answer", "abcdefghijk", 10);
        r.text("answer", "ok", 10);
        assert_eq!(r.errors.len(), 2);
    }
}
