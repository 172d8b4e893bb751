use exscript::annotation::{Annotation, AnnotationKind};
use exscript::fields::{Config, Metadata};
use serde::{Deserialize, Serialize};

use crate::content::ProcessedContent;
use crate::registry::TypeDescriptor;
use crate::types::ExerciseContent;
use crate::validation::ValidationResult;

/// The final exercise record handed to display and persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExercisePayload {
    #[serde(rename = "type")]
    pub exercise_type: String,
    pub title: String,
    pub instructions: String,
    pub difficulty: Option<String>,
    pub category: Option<String>,
    pub content: ExerciseContent,
    pub hints: Vec<String>,
    pub tags: Vec<String>,
    pub explanation: Option<String>,
    pub published: bool,
    pub author: String,
    pub variation: Option<String>,
    pub config: Config,
    /// The block text the exercise was compiled from.
    pub script: String,
    pub annotations: Vec<Annotation>,
    pub validation: ValidationResult,
}

impl ExercisePayload {
    pub fn is_valid(&self) -> bool {
        self.validation.is_valid
    }
}

/// Inputs gathered for one block.
pub struct PayloadParts<'a> {
    pub descriptor: &'a TypeDescriptor,
    pub block_index: usize,
    pub metadata: Metadata,
    pub config: Config,
    pub processed: ProcessedContent,
    pub content: ExerciseContent,
    pub validation: ValidationResult,
    pub author: &'a str,
    pub script: &'a str,
}

/// Combine metadata, content markers and validated content.
///
/// Titles default to `<display name> <block number>`. Instructions come
/// from metadata, then an `@ins(...)` annotation, then the type's default.
/// `HINT(...)` lines extend the metadata hints and `EXPLANATION(...)`
/// overrides the metadata explanation.
pub fn assemble(parts: PayloadParts<'_>) -> ExercisePayload {
    let PayloadParts {
        descriptor,
        block_index,
        metadata,
        config,
        processed,
        content,
        validation,
        author,
        script,
    } = parts;

    let annotations = processed.annotations();
    let title = metadata
        .title
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| {
            tracing::debug!(block = block_index, "no title, using the type name");
            format!("{} {}", descriptor.display_name(), block_index + 1)
        });
    let instructions = metadata
        .instructions
        .filter(|i| !i.trim().is_empty())
        .or_else(|| {
            annotations
                .iter()
                .find(|a| a.kind == AnnotationKind::Instruction)
                .map(|a| a.text.clone())
        })
        .unwrap_or_else(|| descriptor.default_instructions().to_string());

    let mut hints = metadata.hints;
    hints.extend(processed.hints);

    ExercisePayload {
        exercise_type: descriptor.tag().to_string(),
        title,
        instructions,
        difficulty: metadata.difficulty,
        category: metadata.category,
        variation: content.variation().map(str::to_string),
        content,
        hints,
        tags: metadata.tags,
        explanation: processed.explanation.or(metadata.explanation),
        published: false,
        author: author.to_string(),
        config,
        script: script.to_string(),
        annotations,
        validation,
    }
}
