use crate::content::ContentLine;
use crate::error::RegistryError;
use crate::registry::{Grammar, VariationGrammar};

/// Picks a variation name from the content lines.
pub type VariationDetector = fn(&[ContentLine]) -> Option<&'static str>;

/// A named sub-grammar of an exercise type.
pub struct VariationDescriptor {
    name: String,
    display_name: String,
    grammar: Option<Box<dyn VariationGrammar>>,
}

impl VariationDescriptor {
    pub fn new(name: impl Into<String>, display_name: impl Into<String>) -> Self {
        VariationDescriptor {
            name: name.into().to_ascii_lowercase(),
            display_name: display_name.into(),
            grammar: None,
        }
    }

    pub fn with_grammar(mut self, grammar: impl VariationGrammar + 'static) -> Self {
        self.grammar = Some(Box::new(grammar));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn grammar(&self) -> Option<&dyn VariationGrammar> {
        self.grammar.as_deref()
    }
}

/// The registered bundle of operations for one exercise type.
pub struct TypeDescriptor {
    tag: String,
    display_name: String,
    priority: u16,
    default_instructions: String,
    aliases: Vec<String>,
    grammar: Box<dyn Grammar>,
    variations: Vec<VariationDescriptor>,
    default_variation: Option<String>,
    variation_detector: Option<VariationDetector>,
}

impl TypeDescriptor {
    pub fn builder(tag: impl Into<String>) -> TypeDescriptorBuilder {
        TypeDescriptorBuilder {
            tag: tag.into().trim().to_ascii_lowercase(),
            display_name: None,
            priority: 100,
            default_instructions: None,
            aliases: Vec::new(),
            grammar: None,
            variations: Vec::new(),
            default_variation: None,
            variation_detector: None,
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Detection order; lower runs first.
    pub fn priority(&self) -> u16 {
        self.priority
    }

    pub fn default_instructions(&self) -> &str {
        &self.default_instructions
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    pub fn grammar(&self) -> &dyn Grammar {
        self.grammar.as_ref()
    }

    pub fn variations(&self) -> &[VariationDescriptor] {
        &self.variations
    }

    pub fn variation(&self, name: &str) -> Option<&VariationDescriptor> {
        self.variations.iter().find(|v| v.name.eq_ignore_ascii_case(name.trim()))
    }

    pub fn default_variation(&self) -> Option<&str> {
        self.default_variation.as_deref()
    }

    /// Variation from the detector, else the default.
    pub fn detect_variation(&self, lines: &[ContentLine]) -> Option<&VariationDescriptor> {
        self.variation_detector
            .and_then(|detect| detect(lines))
            .and_then(|name| self.variation(name))
            .or_else(|| self.default_variation.as_deref().and_then(|name| self.variation(name)))
    }

    pub(super) fn check(&self) -> Result<(), RegistryError> {
        if self.tag.is_empty() {
            return Err(RegistryError::MissingTag);
        }
        if self.display_name.trim().is_empty() {
            return Err(RegistryError::MissingDisplayName(self.tag.clone()));
        }
        if let Some(default) = &self.default_variation {
            if self.variation(default).is_none() {
                return Err(RegistryError::UnknownDefaultVariation {
                    tag: self.tag.clone(),
                    variation: default.clone(),
                });
            }
        }
        Ok(())
    }
}

pub struct TypeDescriptorBuilder {
    tag: String,
    display_name: Option<String>,
    priority: u16,
    default_instructions: Option<String>,
    aliases: Vec<String>,
    grammar: Option<Box<dyn Grammar>>,
    variations: Vec<VariationDescriptor>,
    default_variation: Option<String>,
    variation_detector: Option<VariationDetector>,
}

impl TypeDescriptorBuilder {
    pub fn display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn priority(mut self, priority: u16) -> Self {
        self.priority = priority;
        self
    }

    pub fn default_instructions(mut self, text: impl Into<String>) -> Self {
        self.default_instructions = Some(text.into());
        self
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into().trim().to_ascii_lowercase());
        self
    }

    pub fn grammar(mut self, grammar: impl Grammar + 'static) -> Self {
        self.grammar = Some(Box::new(grammar));
        self
    }

    pub fn variation(mut self, variation: VariationDescriptor) -> Self {
        self.variations.push(variation);
        self
    }

    pub fn default_variation(mut self, name: impl Into<String>) -> Self {
        self.default_variation = Some(name.into().to_ascii_lowercase());
        self
    }

    pub fn detect_variation(mut self, detector: VariationDetector) -> Self {
        self.variation_detector = Some(detector);
        self
    }

    pub fn build(self) -> Result<TypeDescriptor, RegistryError> {
        if self.tag.is_empty() {
            return Err(RegistryError::MissingTag);
        }
        let grammar = self
            .grammar
            .ok_or_else(|| RegistryError::MissingGrammar(self.tag.clone()))?;
        let display_name = self
            .display_name
            .filter(|n| !n.trim().is_empty())
            .ok_or_else(|| RegistryError::MissingDisplayName(self.tag.clone()))?;
        let descriptor = TypeDescriptor {
            default_instructions: self
                .default_instructions
                .unwrap_or_else(|| format!("Complete the {} exercise.", display_name.to_lowercase())),
            tag: self.tag,
            display_name,
            priority: self.priority,
            aliases: self.aliases,
            grammar,
            variations: self.variations,
            default_variation: self.default_variation,
            variation_detector: self.variation_detector,
        };
        descriptor.check()?;
        Ok(descriptor)
    }
}
