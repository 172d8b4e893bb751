mod descriptor;

use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};

pub use descriptor::{TypeDescriptor, TypeDescriptorBuilder, VariationDescriptor, VariationDetector};

use crate::content::ContentLine;
use crate::error::{ContentError, RegistryError};
use crate::types::ExerciseContent;
use crate::validation::ValidationResult;

/// Base operations of an exercise type.
pub trait Grammar: Send + Sync {
    /// True when the lines look like this type.
    fn detect(&self, lines: &[ContentLine]) -> bool;

    fn parse(&self, lines: &[ContentLine]) -> Result<ExerciseContent, ContentError>;

    fn validate(&self, content: &ExerciseContent) -> ValidationResult;

    /// Inverse of `parse`: script content lines.
    fn serialize(&self, content: &ExerciseContent) -> Result<Vec<String>, ContentError>;
}

/// Per-variation overrides. Returning `None` falls back to the base grammar.
pub trait VariationGrammar: Send + Sync {
    fn parse(&self, _lines: &[ContentLine]) -> Option<Result<ExerciseContent, ContentError>> {
        None
    }

    fn validate(&self, _content: &ExerciseContent) -> Option<ValidationResult> {
        None
    }

    fn serialize(&self, _content: &ExerciseContent) -> Option<Result<Vec<String>, ContentError>> {
        None
    }
}

/// Exercise types keyed by tag, detected in priority order.
#[derive(Default)]
pub struct TypeRegistry {
    descriptors: Vec<TypeDescriptor>,
    /// Tag or alias → index into `descriptors`.
    index: HashMap<String, usize>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        TypeRegistry::default()
    }

    pub fn register(&mut self, descriptor: TypeDescriptor) -> Result<(), RegistryError> {
        descriptor.check()?;
        let tag = descriptor.tag().to_string();
        if self.index.contains_key(&tag) {
            return Err(RegistryError::DuplicateType(tag));
        }
        for alias in descriptor.aliases() {
            if let Some(&owner) = self.index.get(alias) {
                return Err(RegistryError::DuplicateAlias {
                    alias: alias.clone(),
                    owner: self.descriptors[owner].tag().to_string(),
                });
            }
        }

        let position = self.descriptors.len();
        self.index.insert(tag.clone(), position);
        for alias in descriptor.aliases() {
            self.index.insert(alias.clone(), position);
        }
        tracing::debug!(tag = %tag, priority = descriptor.priority(), "registered exercise type");
        self.descriptors.push(descriptor);
        Ok(())
    }

    /// Look up by tag or alias, case-insensitively.
    pub fn get(&self, name: &str) -> Option<&TypeDescriptor> {
        let key = name.trim().to_ascii_lowercase();
        self.index.get(&key).map(|&i| &self.descriptors[i])
    }

    /// Canonical tag for a tag or alias.
    pub fn resolve_tag(&self, name: &str) -> Option<&str> {
        self.get(name).map(|d| d.tag())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Descriptors by ascending priority, ties in registration order.
    pub fn by_priority(&self) -> Vec<&TypeDescriptor> {
        let mut ordered: Vec<&TypeDescriptor> = self.descriptors.iter().collect();
        ordered.sort_by_key(|d| d.priority());
        ordered
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Tag of the first descriptor, by priority, whose detector matches.
    pub fn detect_type(&self, lines: &[ContentLine]) -> Option<&str> {
        self.by_priority()
            .into_iter()
            .find(|d| d.grammar().detect(lines))
            .map(|d| d.tag())
    }

    /// Parse with the base grammar, then let the chosen variation replace
    /// the result. The variation is the hint, else the descriptor's
    /// detector, else its default. The chosen name is stored on the content.
    pub fn parse_content(
        &self,
        tag: &str,
        lines: &[ContentLine],
        variation_hint: Option<&str>,
    ) -> Result<ExerciseContent, ContentError> {
        let descriptor = self
            .get(tag)
            .ok_or_else(|| ContentError::UnknownType(tag.to_string()))?;

        let variation = match variation_hint {
            Some(hint) => Some(descriptor.variation(hint).ok_or_else(|| ContentError::UnknownVariation {
                tag: descriptor.tag().to_string(),
                variation: hint.to_string(),
            })?),
            None => descriptor.detect_variation(lines),
        };

        let base = descriptor.grammar().parse(lines);
        let override_parse = variation
            .and_then(|v| v.grammar())
            .and_then(|g| g.parse(lines));
        let mut content = match override_parse {
            Some(result) => result?,
            None => base?,
        };
        content.set_variation(variation.map(|v| v.name().to_string()));
        Ok(content)
    }

    /// Validate with the content's variation validator if it has one, else
    /// the base validator. Never panics: a panicking validator yields a
    /// failed result.
    pub fn validate_content(&self, tag: &str, content: &ExerciseContent) -> ValidationResult {
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            let Some(descriptor) = self.get(tag) else {
                return ValidationResult::failed(format!("unknown exercise type '{}'", tag));
            };
            if content.tag() != descriptor.tag() {
                return ValidationResult::failed(format!(
                    "content of type '{}' does not match exercise type '{}'",
                    content.tag(),
                    descriptor.tag()
                ));
            }
            let variation_result = content
                .variation()
                .and_then(|name| descriptor.variation(name))
                .and_then(|v| v.grammar())
                .and_then(|g| g.validate(content));
            variation_result.unwrap_or_else(|| descriptor.grammar().validate(content))
        }));
        outcome.unwrap_or_else(|_| {
            tracing::error!(tag, "validator panicked");
            ValidationResult::failed("internal error while validating content")
        })
    }

    /// Variation-aware inverse of `parse_content`.
    pub fn serialize(&self, tag: &str, content: &ExerciseContent) -> Result<Vec<String>, ContentError> {
        let descriptor = self
            .get(tag)
            .ok_or_else(|| ContentError::UnknownType(tag.to_string()))?;
        if content.tag() != descriptor.tag() {
            return Err(ContentError::Mismatch(descriptor.tag().to_string()));
        }
        let override_serialize = content
            .variation()
            .and_then(|name| descriptor.variation(name))
            .and_then(|v| v.grammar())
            .and_then(|g| g.serialize(content));
        match override_serialize {
            Some(result) => result,
            None => descriptor.grammar().serialize(content),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::lines_from_text;
    use crate::types::matching::{MatchPair, MatchingContent};

    /// Accepts any non-empty input as a one-pair matching exercise.
    struct Anything {
        panic_on_validate: bool,
    }

    impl Grammar for Anything {
        fn detect(&self, lines: &[ContentLine]) -> bool {
            !lines.is_empty()
        }

        fn parse(&self, lines: &[ContentLine]) -> Result<ExerciseContent, ContentError> {
            Ok(ExerciseContent::Matching(MatchingContent {
                pairs: vec![MatchPair {
                    left: lines[0].text.clone(),
                    right: lines[0].text.clone(),
                }],
                variation: None,
            }))
        }

        fn validate(&self, _content: &ExerciseContent) -> ValidationResult {
            if self.panic_on_validate {
                panic!("validator bug");
            }
            ValidationResult::new()
        }

        fn serialize(&self, _content: &ExerciseContent) -> Result<Vec<String>, ContentError> {
            Ok(Vec::new())
        }
    }

    struct Strict;

    impl VariationGrammar for Strict {
        fn validate(&self, _content: &ExerciseContent) -> Option<ValidationResult> {
            Some(ValidationResult::failed("strict"))
        }
    }

    fn descriptor(tag: &str, priority: u16, panic_on_validate: bool) -> TypeDescriptor {
        aliased(tag, priority, panic_on_validate, &[])
    }

    fn aliased(tag: &str, priority: u16, panic_on_validate: bool, aliases: &[&str]) -> TypeDescriptor {
        aliases
            .iter()
            .fold(TypeDescriptor::builder(tag), |b, a| b.alias(*a))
            .display_name("Anything")
            .priority(priority)
            .grammar(Anything { panic_on_validate })
            .variation(VariationDescriptor::new("strict", "Strict").with_grammar(Strict))
            .variation(VariationDescriptor::new("loose", "Loose"))
            .build()
            .unwrap()
    }

    #[test]
    fn registration_rejects_duplicates() {
        let mut registry = TypeRegistry::new();
        registry.register(descriptor("matching", 10, false)).unwrap();
        assert_eq!(
            registry.register(descriptor("matching", 20, false)),
            Err(RegistryError::DuplicateType("matching".into()))
        );
    }

    #[test]
    fn builder_requires_grammar_and_name() {
        assert_eq!(
            TypeDescriptor::builder("x").display_name("X").build().err(),
            Some(RegistryError::MissingGrammar("x".into()))
        );
        assert_eq!(
            TypeDescriptor::builder("x").grammar(Anything { panic_on_validate: false }).build().err(),
            Some(RegistryError::MissingDisplayName("x".into()))
        );
        assert_eq!(
            TypeDescriptor::builder("").build().err(),
            Some(RegistryError::MissingTag)
        );
    }

    #[test]
    fn detection_follows_priority_not_registration() {
        let mut registry = TypeRegistry::new();
        registry.register(aliased("matching", 50, false, &["pairs"])).unwrap();
        registry.register(aliased("other", 10, false, &["o"])).unwrap();
        assert_eq!(
            registry.register(aliased("third", 60, false, &["pairs"])),
            Err(RegistryError::DuplicateAlias {
                alias: "pairs".into(),
                owner: "matching".into()
            })
        );
        let lines = lines_from_text(&["a = b"]).unwrap();
        assert_eq!(registry.detect_type(&lines), Some("other"));
        assert_eq!(registry.resolve_tag("PAIRS"), Some("matching"));
    }

    #[test]
    fn variations_and_hints() {
        let mut registry = TypeRegistry::new();
        registry.register(descriptor("matching", 10, false)).unwrap();
        let lines = lines_from_text(&["a = b"]).unwrap();

        let content = registry.parse_content("matching", &lines, Some("strict")).unwrap();
        assert_eq!(content.variation(), Some("strict"));
        assert!(!registry.validate_content("matching", &content).is_valid);

        let content = registry.parse_content("matching", &lines, Some("loose")).unwrap();
        assert!(registry.validate_content("matching", &content).is_valid);

        assert!(matches!(
            registry.parse_content("matching", &lines, Some("nope")),
            Err(ContentError::UnknownVariation { .. })
        ));
    }

    #[test]
    fn panicking_validator_yields_failed_result() {
        let mut registry = TypeRegistry::new();
        registry.register(descriptor("matching", 10, true)).unwrap();
        let lines = lines_from_text(&["a = b"]).unwrap();
        let content = registry.parse_content("matching", &lines, None).unwrap();
        let result = registry.validate_content("matching", &content);
        assert!(!result.is_valid);
        assert_eq!(result.errors.len(), 1);
    }

    #[test]
    fn mismatched_content_fails_validation() {
        let mut registry = TypeRegistry::new();
        registry.register(descriptor("other", 10, false)).unwrap();
        let lines = lines_from_text(&["a = b"]).unwrap();
        let content = registry.parse_content("other", &lines, None).unwrap();
        assert!(!registry.validate_content("other", &content).is_valid);
    }
}
