//! Categorize: `Fruits = apple | pear`, with the `lake`, `ordering` and
//! `original` variations.

use serde::{Deserialize, Serialize};

use crate::content::ContentLine;
use crate::error::{ContentError, RegistryError};
use crate::registry::{Grammar, TypeDescriptor, VariationDescriptor, VariationGrammar};
use crate::types::{ExerciseContent, mismatch, text_lines};
use crate::validation::{ValidationResult, duplicates, normalized};

pub const TAG: &str = "categorize";
pub const ORIGINAL: &str = "original";
pub const ORDERING: &str = "ordering";
pub const LAKE: &str = "lake";

const MAX_CATEGORIES: usize = 10;
const MAX_ITEMS: usize = 30;
const MAX_NAME_CHARS: usize = 100;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorizeContent {
    pub categories: Vec<Category>,
    /// Lake: items that belong in the lake.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub correct_items: Vec<String>,
    /// Lake: items that do not.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub distractors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instruction: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    pub items: Vec<String>,
}

pub fn descriptor() -> Result<TypeDescriptor, RegistryError> {
    TypeDescriptor::builder(TAG)
        .display_name("Categorize")
        .priority(40)
        .default_instructions("Sort each item into its category.")
        .alias("categorise")
        .alias("category")
        .alias("groups")
        .grammar(Categorize)
        .variation(VariationDescriptor::new(ORIGINAL, "Categories"))
        .variation(VariationDescriptor::new(ORDERING, "Ordered categories").with_grammar(OrderedCategories))
        .variation(VariationDescriptor::new(LAKE, "Lake").with_grammar(Lake))
        .default_variation(ORIGINAL)
        .detect_variation(detect_variation)
        .build()
}

/// Split items on `|`, or on `,` when there is no pipe.
fn split_items(text: &str) -> Vec<String> {
    let separator = if text.contains('|') { '|' } else { ',' };
    text.split(separator)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// `NAME = items`, with the name non-empty.
fn category_line(text: &str) -> Option<Category> {
    let (name, items) = text.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some(Category {
        name: name.to_string(),
        items: split_items(items),
    })
}

/// `NAME = a | b` (at least two pipe items), without `[`.
fn is_piped_category(text: &str) -> bool {
    !text.contains('[')
        && text
            .split_once('=')
            .is_some_and(|(name, items)| !name.trim().is_empty() && items.split('|').filter(|i| !i.trim().is_empty()).count() >= 2)
}

fn detect_variation(lines: &[ContentLine]) -> Option<&'static str> {
    if text_lines(lines).any(|l| l.text.starts_with('=')) {
        return Some(LAKE);
    }
    let ordered = text_lines(lines)
        .filter_map(|l| category_line(&l.text).filter(|_| l.text.contains('|')))
        .filter(|c| c.items.len() >= 3)
        .count();
    if ordered >= 2 { Some(ORDERING) } else { Some(ORIGINAL) }
}

fn categorize_of(content: &ExerciseContent) -> Result<&CategorizeContent, ContentError> {
    match content {
        ExerciseContent::Categorize(c) => Ok(c),
        _ => Err(mismatch(TAG)),
    }
}

fn validate_categories(content: &CategorizeContent, min_categories: usize, min_items: usize) -> ValidationResult {
    let mut result = ValidationResult::new();
    result.count("categorize exercise", content.categories.len(), min_categories, MAX_CATEGORIES);
    for (i, category) in content.categories.iter().enumerate() {
        result.text(&format!("category {} name", i + 1), &category.name, MAX_NAME_CHARS);
        let label = format!("category '{}'", category.name);
        result.count(&label, category.items.len(), min_items, MAX_ITEMS);
    }
    for name in duplicates(content.categories.iter().map(|c| c.name.as_str())) {
        result.error(format!("category '{}' is defined more than once", name));
    }
    result
}

struct Categorize;

impl Grammar for Categorize {
    fn detect(&self, lines: &[ContentLine]) -> bool {
        text_lines(lines).any(|l| l.text.starts_with('=') || is_piped_category(&l.text))
    }

    fn parse(&self, lines: &[ContentLine]) -> Result<ExerciseContent, ContentError> {
        let mut categories = Vec::new();
        for line in text_lines(lines) {
            match category_line(&line.text) {
                Some(category) => categories.push(category),
                None => {
                    return Err(ContentError::line(
                        line.line,
                        format!("expected 'Category = item | item', found '{}'", line.text),
                    ));
                }
            }
        }
        if categories.is_empty() {
            return Err(ContentError::NoContent(TAG.to_string()));
        }
        Ok(ExerciseContent::Categorize(CategorizeContent {
            categories,
            ..CategorizeContent::default()
        }))
    }

    fn validate(&self, content: &ExerciseContent) -> ValidationResult {
        match categorize_of(content) {
            Ok(c) => validate_categories(c, 1, 1),
            Err(e) => ValidationResult::failed(e.to_string()),
        }
    }

    fn serialize(&self, content: &ExerciseContent) -> Result<Vec<String>, ContentError> {
        Ok(categorize_of(content)?
            .categories
            .iter()
            .map(|c| format!("{} = {}", c.name, c.items.join(" | ")))
            .collect())
    }
}

/// Categories of at least three items each.
struct OrderedCategories;

impl VariationGrammar for OrderedCategories {
    fn validate(&self, content: &ExerciseContent) -> Option<ValidationResult> {
        Some(match categorize_of(content) {
            Ok(c) => validate_categories(c, 2, 3),
            Err(e) => ValidationResult::failed(e.to_string()),
        })
    }
}

/// `= correct | items`, distractor lines, and an optional `? instruction`.
struct Lake;

impl VariationGrammar for Lake {
    fn parse(&self, lines: &[ContentLine]) -> Option<Result<ExerciseContent, ContentError>> {
        let mut content = CategorizeContent::default();
        for line in text_lines(lines) {
            if let Some(items) = line.text.strip_prefix('=') {
                content.correct_items.extend(split_items(items));
            } else if let Some(instruction) = line.text.strip_prefix('?') {
                content.instruction = Some(instruction.trim().to_string());
            } else {
                content.distractors.extend(split_items(&line.text));
            }
        }
        Some(Ok(ExerciseContent::Categorize(content)))
    }

    fn validate(&self, content: &ExerciseContent) -> Option<ValidationResult> {
        let content = match categorize_of(content) {
            Ok(c) => c,
            Err(e) => return Some(ValidationResult::failed(e.to_string())),
        };
        let mut result = ValidationResult::new();
        result.count("lake correct items", content.correct_items.len(), 1, MAX_ITEMS);
        result.count("lake distractors", content.distractors.len(), 0, MAX_ITEMS);
        if content.instruction.as_deref().is_none_or(|i| i.trim().is_empty()) {
            result.error("lake exercise needs instruction text (a '?' line or the 'instructions' metadata)");
        }
        for distractor in &content.distractors {
            if content.correct_items.iter().any(|c| normalized(c) == normalized(distractor)) {
                result.error(format!("'{}' is both a correct item and a distractor", distractor));
            }
        }
        for item in duplicates(content.correct_items.iter().map(String::as_str)) {
            result.warning(format!("correct item '{}' is listed more than once", item));
        }
        Some(result)
    }

    fn serialize(&self, content: &ExerciseContent) -> Option<Result<Vec<String>, ContentError>> {
        let content = match categorize_of(content) {
            Ok(c) => c,
            Err(e) => return Some(Err(e)),
        };
        let mut lines = Vec::new();
        if let Some(instruction) = &content.instruction {
            lines.push(format!("? {}", instruction));
        }
        lines.push(format!("= {}", content.correct_items.join(" | ")));
        if !content.distractors.is_empty() {
            lines.push(content.distractors.join(" | "));
        }
        Some(Ok(lines))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::lines_from_text;
    use crate::registry::TypeRegistry;

    fn registry() -> TypeRegistry {
        let mut registry = TypeRegistry::new();
        registry.register(descriptor().unwrap()).unwrap();
        registry
    }

    fn parse(lines: &[&str]) -> ExerciseContent {
        registry()
            .parse_content(TAG, &lines_from_text(lines).unwrap(), None)
            .unwrap()
    }

    fn inner(content: &ExerciseContent) -> &CategorizeContent {
        categorize_of(content).unwrap()
    }

    #[test]
    fn original_variation() {
        let content = parse(&["Fruits = apple | pear", "Tools = saw"]);
        assert_eq!(content.variation(), Some(ORIGINAL));
        assert_eq!(inner(&content).categories.len(), 2);
        assert_eq!(inner(&content).categories[1].items, vec!["saw"]);
        assert!(registry().validate_content(TAG, &content).is_valid);
    }

    #[test]
    fn items_split_on_pipes_before_commas() {
        let content = parse(&["Animals = cat | dog, puppy", "Colors = red, blue"]);
        assert_eq!(content.variation(), Some(ORIGINAL));
        assert_eq!(inner(&content).categories[0].items, vec!["cat", "dog, puppy"]);
        assert_eq!(inner(&content).categories[1].items, vec!["red", "blue"]);
    }

    #[test]
    fn ordering_variation_needs_three_items() {
        let content = parse(&["Fruits = apple | pear | plum", "Tools = saw | drill | hammer"]);
        assert_eq!(content.variation(), Some(ORDERING));
        assert!(registry().validate_content(TAG, &content).is_valid);

        let hinted = registry()
            .parse_content(TAG, &lines_from_text(&["Fruits = apple | pear", "Tools = saw | drill | hammer"]).unwrap(), Some("ordering"))
            .unwrap();
        assert!(!registry().validate_content(TAG, &hinted).is_valid);
    }

    #[test]
    fn duplicate_category_names_fail() {
        let content = parse(&["Fruits = apple", "fruits = pear"]);
        assert!(!registry().validate_content(TAG, &content).is_valid);
    }

    #[test]
    fn lake_variation() {
        let content = parse(&["? Pick the fruit", "= apple | pear", "car, hammer"]);
        assert_eq!(content.variation(), Some(LAKE));
        let c = inner(&content);
        assert_eq!(c.correct_items, vec!["apple", "pear"]);
        assert_eq!(c.distractors, vec!["car", "hammer"]);
        assert_eq!(c.instruction.as_deref(), Some("Pick the fruit"));
        assert!(registry().validate_content(TAG, &content).is_valid);
    }

    #[test]
    fn lake_requires_instruction_and_disjoint_items() {
        let content = parse(&["= apple | pear", "Apple"]);
        let result = registry().validate_content(TAG, &content);
        assert!(!result.is_valid);
        assert_eq!(result.errors.len(), 2);
    }

    #[test]
    fn serialize_round_trips() {
        let registry = registry();
        for lines in [
            vec!["Fruits = apple | pear", "Tools = saw"],
            vec!["? Pick the fruit", "= apple | pear", "car | hammer"],
        ] {
            let content = registry.parse_content(TAG, &lines_from_text(&lines).unwrap(), None).unwrap();
            let out = registry.serialize(TAG, &content).unwrap();
            let again = registry.parse_content(TAG, &lines_from_text(&out).unwrap(), None).unwrap();
            assert_eq!(again, content);
        }
    }
}
