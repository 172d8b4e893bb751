use exscript::block::ExerciseBlock;
use exscript::fields::{Config, Metadata, parse_fields};
use exscript::parser::{Parser, classify};
use serde::{Deserialize, Serialize};

use crate::content::process_content;
use crate::environment::VariableTable;
use crate::error::{ContentError, Diagnostic, RegistryError};
use crate::functions::{CallContext, FunctionRegistry, ScriptFunction, builtins};
use crate::payload::{ExercisePayload, PayloadParts, assemble};
use crate::random::{OsRandom, RandomSource};
use crate::registry::{TypeDescriptor, TypeRegistry};
use crate::types;
use crate::words::WordLibrary;

/// Result of compiling a script. Never an error: problems are reported in
/// `errors`/`warnings` and as structured diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseOutcome {
    pub exercises: Vec<ExercisePayload>,
    /// `block N (line L): message`.
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ParseOutcome {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// True when there are no errors and every exercise validated.
    pub fn is_clean(&self) -> bool {
        !self.has_errors() && self.exercises.iter().all(|e| e.is_valid())
    }

    fn push(&mut self, diagnostic: Diagnostic) {
        if diagnostic.is_warning() {
            self.warnings.push(diagnostic.render());
        } else {
            self.errors.push(diagnostic.render());
        }
        self.diagnostics.push(diagnostic);
    }
}

/// Function and type registries plus the word library.
///
/// Build once, then share: `parse` takes `&self` and keeps all per-call
/// state local.
pub struct Engine {
    functions: FunctionRegistry,
    types: TypeRegistry,
    words: WordLibrary,
    builtins_installed: bool,
}

impl Default for Engine {
    fn default() -> Self {
        Engine::new()
    }
}

impl Engine {
    /// An engine with empty registries and the built-in word library.
    pub fn new() -> Self {
        Engine {
            functions: FunctionRegistry::new(),
            types: TypeRegistry::new(),
            words: WordLibrary::builtin(),
            builtins_installed: false,
        }
    }

    /// An engine with the built-in functions and exercise types.
    ///
    /// # Panics
    ///
    /// If a built-in registration is rejected, which is a programming defect.
    pub fn builtin() -> Self {
        let mut engine = Engine::new();
        if let Err(e) = engine.install_builtins() {
            panic!("built-in registration failed: {}", e);
        }
        engine
    }

    /// Register the built-in functions and exercise types. A second call is a
    /// no-op.
    pub fn install_builtins(&mut self) -> Result<(), RegistryError> {
        if self.builtins_installed {
            tracing::warn!("built-ins already installed; ignoring");
            return Ok(());
        }
        builtins::install(&mut self.functions)?;
        types::install(&mut self.types)?;
        self.builtins_installed = true;
        Ok(())
    }

    pub fn with_words(mut self, words: WordLibrary) -> Self {
        self.words = words;
        self
    }

    pub fn register_function(&mut self, function: Box<dyn ScriptFunction>) -> Result<(), RegistryError> {
        self.functions.register(function)
    }

    pub fn register_type(&mut self, descriptor: TypeDescriptor) -> Result<(), RegistryError> {
        self.types.register(descriptor)
    }

    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    pub fn words(&self) -> &WordLibrary {
        &self.words
    }

    pub fn words_mut(&mut self) -> &mut WordLibrary {
        &mut self.words
    }

    /// Compile `script` using operating-system randomness.
    pub fn parse(&self, script: &str, author: &str) -> ParseOutcome {
        self.parse_with(script, author, &mut OsRandom::new())
    }

    /// Compile `script` drawing randomness from `rng`.
    pub fn parse_with(&self, script: &str, author: &str, rng: &mut dyn RandomSource) -> ParseOutcome {
        let outline = Parser::new(script, 0).parse();
        let mut outcome = ParseOutcome::default();

        for warning in &outline.warnings {
            let line = line_of(script, warning.span.start);
            outcome.push(Diagnostic::warning(&warning.message).at(line, warning.span.clone()));
        }

        for block in &outline.blocks {
            let _span = tracing::debug_span!("block", index = block.index, line = block.start_line).entered();
            if let Some(payload) = self.compile_block(block, author, rng, &mut outcome) {
                outcome.exercises.push(payload);
            }
        }

        tracing::debug!(
            exercises = outcome.exercises.len(),
            errors = outcome.errors.len(),
            warnings = outcome.warnings.len(),
            "script compiled"
        );
        outcome
    }

    fn compile_block(
        &self,
        block: &ExerciseBlock,
        author: &str,
        rng: &mut dyn RandomSource,
        outcome: &mut ParseOutcome,
    ) -> Option<ExercisePayload> {
        let block_error = |message: String| {
            Diagnostic::error(message)
                .in_block(block.index)
                .at(block.start_line, block.span.clone())
        };
        let block_warning = |message: String| {
            Diagnostic::warning(message)
                .in_block(block.index)
                .at(block.start_line, block.span.clone())
        };

        let sections = classify(block);

        let (fields, malformed) = parse_fields(&sections.metadata);
        for entry in malformed {
            outcome.push(block_warning(format!("ignoring metadata entry '{}'", entry)));
        }
        let metadata = Metadata::from_fields(fields);
        for note in metadata.unrecognized_values() {
            tracing::warn!(block = block.index, "{}", note);
            outcome.push(block_warning(note));
        }

        let (fields, malformed) = parse_fields(&sections.config);
        for entry in malformed {
            outcome.push(block_warning(format!("ignoring config entry '{}'", entry)));
        }
        let (config, notes) = Config::from_fields(fields);
        for note in notes {
            tracing::warn!(block = block.index, "{}", note);
            outcome.push(block_warning(note));
        }

        let declared = match metadata.exercise_type.as_deref() {
            Some(name) => match self.types.resolve_tag(name) {
                Some(tag) => Some(tag),
                None => {
                    tracing::warn!(block = block.index, type_name = name, "unknown exercise type");
                    outcome.push(block_warning(format!(
                        "unknown exercise type '{}', detecting the type from the content",
                        name
                    )));
                    None
                }
            },
            None => None,
        };

        let mut vars = VariableTable::new();
        let mut ctx = CallContext::new(&self.functions, &self.words, &mut vars, rng);
        let processed = match process_content(&sections.content, &mut ctx) {
            Ok(processed) => processed,
            Err(e) => {
                outcome.push(
                    Diagnostic::error(e.error.to_string())
                        .in_block(block.index)
                        .at(e.line, e.span),
                );
                return None;
            }
        };

        if processed.lines.is_empty() {
            outcome.push(block_error("exercise block has no content".to_string()));
            return None;
        }

        let Some(tag) = declared.or_else(|| self.types.detect_type(&processed.lines)) else {
            outcome.push(block_error(ContentError::UndetectedType.to_string()));
            return None;
        };
        tracing::debug!(tag, "exercise type");

        let mut content = match self
            .types
            .parse_content(tag, &processed.lines, config.variation.as_deref())
        {
            Ok(content) => content,
            Err(e) => {
                let diagnostic = match &e {
                    ContentError::Line { line, message } if *line > 0 => Diagnostic::error(message.clone())
                        .in_block(block.index)
                        .at(*line, block.line_span(*line)),
                    _ => block_error(e.to_string()),
                };
                outcome.push(diagnostic);
                return None;
            }
        };
        content.inherit_instructions(metadata.instructions.as_deref());

        let validation = self.types.validate_content(tag, &content);
        for error in &validation.errors {
            outcome.push(block_error(error.clone()));
        }
        for warning in &validation.warnings {
            outcome.push(block_warning(warning.clone()));
        }

        let descriptor = self.types.get(tag)?;
        Some(assemble(PayloadParts {
            descriptor,
            block_index: block.index,
            metadata,
            config,
            processed,
            content,
            validation,
            author,
            script: &block.text,
        }))
    }
}

/// 1-based line containing byte `offset`.
fn line_of(source: &str, offset: usize) -> usize {
    let end = offset.min(source.len());
    source.as_bytes()[..end].iter().filter(|&&b| b == b'\n').count() + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn install_is_idempotent() {
        let mut engine = Engine::builtin();
        let functions = engine.functions().len();
        let types = engine.types().len();
        assert!(engine.install_builtins().is_ok());
        assert_eq!(engine.functions().len(), functions);
        assert_eq!(engine.types().len(), types);
        assert_eq!(types, 6);
    }

    #[test]
    fn engine_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Engine>();
    }

    #[test]
    fn line_of_counts_newlines() {
        assert_eq!(line_of("a\nb\nc", 0), 1);
        assert_eq!(line_of("a\nb\nc", 2), 2);
        assert_eq!(line_of("a\nb\nc", 99), 3);
    }
}
