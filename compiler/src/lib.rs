pub mod content;
pub mod engine;
pub mod environment;
pub mod error;
pub mod functions;
pub mod payload;
pub mod random;
pub mod registry;
pub mod types;
pub mod validation;
pub mod value;
pub mod words;

pub use engine::{Engine, ParseOutcome};
pub use error::{ContentError, Diagnostic, FunctionError, RegistryError, Severity, WordLibraryError};
pub use payload::ExercisePayload;
pub use types::ExerciseContent;
pub use validation::ValidationResult;
pub use value::Value;
