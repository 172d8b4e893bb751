pub mod categorize;
pub mod fill_blank;
pub mod matching;
pub mod multiple_choice;
pub mod ordering;
pub mod selector;

use serde::{Deserialize, Serialize};

use crate::content::ContentLine;
use crate::error::{ContentError, RegistryError};
use crate::registry::TypeRegistry;

pub use categorize::CategorizeContent;
pub use fill_blank::FillBlankContent;
pub use matching::MatchingContent;
pub use multiple_choice::MultipleChoiceContent;
pub use ordering::OrderingContent;
pub use selector::SelectorContent;

/// Structured content, one variant per exercise type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ExerciseContent {
    FillBlank(FillBlankContent),
    Matching(MatchingContent),
    MultipleChoice(MultipleChoiceContent),
    Ordering(OrderingContent),
    Categorize(CategorizeContent),
    Selector(SelectorContent),
}

impl ExerciseContent {
    /// The type tag this variant belongs to.
    pub fn tag(&self) -> &'static str {
        match self {
            ExerciseContent::FillBlank(_) => fill_blank::TAG,
            ExerciseContent::Matching(_) => matching::TAG,
            ExerciseContent::MultipleChoice(_) => multiple_choice::TAG,
            ExerciseContent::Ordering(_) => ordering::TAG,
            ExerciseContent::Categorize(_) => categorize::TAG,
            ExerciseContent::Selector(_) => selector::TAG,
        }
    }

    pub fn variation(&self) -> Option<&str> {
        self.variation_slot().as_deref()
    }

    pub fn set_variation(&mut self, variation: Option<String>) {
        *self.variation_slot_mut() = variation;
    }

    fn variation_slot(&self) -> &Option<String> {
        match self {
            ExerciseContent::FillBlank(c) => &c.variation,
            ExerciseContent::Matching(c) => &c.variation,
            ExerciseContent::MultipleChoice(c) => &c.variation,
            ExerciseContent::Ordering(c) => &c.variation,
            ExerciseContent::Categorize(c) => &c.variation,
            ExerciseContent::Selector(c) => &c.variation,
        }
    }

    fn variation_slot_mut(&mut self) -> &mut Option<String> {
        match self {
            ExerciseContent::FillBlank(c) => &mut c.variation,
            ExerciseContent::Matching(c) => &mut c.variation,
            ExerciseContent::MultipleChoice(c) => &mut c.variation,
            ExerciseContent::Ordering(c) => &mut c.variation,
            ExerciseContent::Categorize(c) => &mut c.variation,
            ExerciseContent::Selector(c) => &mut c.variation,
        }
    }

    /// Supply block-level instructions to content that needs its own.
    pub fn inherit_instructions(&mut self, instructions: Option<&str>) {
        if let (ExerciseContent::Categorize(c), Some(text)) = (self, instructions) {
            if c.instruction.as_deref().is_none_or(|i| i.trim().is_empty()) {
                c.instruction = Some(text.to_string());
            }
        }
    }
}

/// Register the six built-in exercise types.
pub fn install(registry: &mut TypeRegistry) -> Result<(), RegistryError> {
    registry.register(selector::descriptor()?)?;
    registry.register(fill_blank::descriptor()?)?;
    registry.register(multiple_choice::descriptor()?)?;
    registry.register(categorize::descriptor()?)?;
    registry.register(matching::descriptor()?)?;
    registry.register(ordering::descriptor()?)?;
    Ok(())
}

/// Error for a content variant that belongs to another type.
pub(crate) fn mismatch(tag: &str) -> ContentError {
    ContentError::Mismatch(tag.to_string())
}

/// Lines that carry text, skipping annotation-only lines.
pub(crate) fn text_lines(lines: &[ContentLine]) -> impl Iterator<Item = &ContentLine> {
    lines.iter().filter(|l| !l.is_blank())
}

/// Split on `|`, trimming and dropping empty pieces.
pub(crate) fn split_pipes(text: &str) -> Vec<String> {
    text.split('|')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::lines_from_text;

    fn registry() -> TypeRegistry {
        let mut registry = TypeRegistry::new();
        install(&mut registry).unwrap();
        registry
    }

    fn detect(lines: &[&str]) -> Option<String> {
        let lines = lines_from_text(lines).unwrap();
        registry().detect_type(&lines).map(str::to_string)
    }

    #[test]
    fn detection_rule_set() {
        assert_eq!(detect(&["The *cat* sat."]).as_deref(), Some("fill-blank"));
        assert_eq!(detect(&["Capital? = Rome | Paris [Rome]"]).as_deref(), Some("multiple-choice"));
        assert_eq!(detect(&["Apple = Fruit", "Car = Vehicle"]).as_deref(), Some("matching"));
        assert_eq!(detect(&["Sun :: Sol"]).as_deref(), Some("matching"));
        assert_eq!(detect(&["Fruits = apple | pear", "Tools = saw | drill"]).as_deref(), Some("categorize"));
        assert_eq!(detect(&["= apple | pear", "car"]).as_deref(), Some("categorize"));
        assert_eq!(detect(&["I | like | to | read"]).as_deref(), Some("ordering"));
        assert_eq!(detect(&["align(I, like, tea)"]).as_deref(), Some("ordering"));
        assert_eq!(detect(&["house", "garden"]).as_deref(), Some("ordering"));
        assert_eq!(detect(&["The [cat] sleeps."]).as_deref(), Some("selector"));
        assert_eq!(detect(&["@img(/a.png)", "area(0, 0, 10, 10, true)"]).as_deref(), Some("selector"));
        assert_eq!(detect(&["Just a sentence."]), None);
    }

    #[test]
    fn illustrations_do_not_change_the_type() {
        assert_eq!(
            detect(&["@img(\"/cat.png\")", "The *cat* sat on the *mat*."]).as_deref(),
            Some("fill-blank")
        );
        assert_eq!(
            detect(&["@img(/farm.png)", "Cow = Moo", "Dog = Woof"]).as_deref(),
            Some("matching")
        );
        assert_eq!(detect(&["I | like | tea @img(/tea.png)"]).as_deref(), Some("ordering"));
        assert_eq!(detect(&["@img(/a.png)"]), None);
    }

    #[test]
    fn detection_is_deterministic() {
        let input = ["Apple = Fruit", "The *cat* sat."];
        let first = detect(&input);
        for _ in 0..10 {
            assert_eq!(detect(&input), first);
        }
    }

    #[test]
    fn aliases_resolve() {
        let registry = registry();
        assert_eq!(registry.resolve_tag("quiz"), Some("multiple-choice"));
        assert_eq!(registry.resolve_tag("fill_blank"), Some("fill-blank"));
        assert_eq!(registry.resolve_tag("highlight"), Some("selector"));
        assert_eq!(registry.resolve_tag("groups"), Some("categorize"));
        assert_eq!(registry.resolve_tag("sort"), Some("ordering"));
        assert_eq!(registry.resolve_tag("pairs"), Some("matching"));
        assert_eq!(registry.resolve_tag("essay"), None);
    }

    #[test]
    fn content_serializes_with_type_tag() {
        let lines = lines_from_text(&["Apple = Fruit", "Car = Vehicle"]).unwrap();
        let content = registry().parse_content("matching", &lines, None).unwrap();
        let json = serde_json::to_value(&content).unwrap();
        assert_eq!(json["type"], "matching");
        assert_eq!(json["pairs"][0]["left"], "Apple");
    }

    #[test]
    fn categorize_inherits_instructions() {
        let lines = lines_from_text(&["= apple | pear", "car"]).unwrap();
        let mut content = registry().parse_content("categorize", &lines, None).unwrap();
        content.inherit_instructions(Some("Pick the fruit"));
        let ExerciseContent::Categorize(c) = &content else {
            panic!("expected categorize content");
        };
        assert_eq!(c.instruction.as_deref(), Some("Pick the fruit"));
    }
}
