pub mod schema;
pub mod types;
pub mod contracts;
pub mod media;
pub mod prompt;
pub mod parser;
pub mod tools;
pub mod ollama;
pub mod ollama_types;
pub mod executor;

pub use schema::*;
pub use types::*;
pub use tools::*;
pub use ollama::*;
pub use executor::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FlowError {
    /// Caller-supplied input failed its declared schema. No model call was made.
    #[error("Invalid input: {0}")]
    Validation(ValidationError),

    /// The model's output (or a tool call it requested) broke the declared contract.
    #[error("Model contract violation in {flow}: {detail}")]
    ModelContractViolation { flow: &'static str, detail: String },

    /// The model or a tool could not be reached, or errored.
    #[error("Transport failure: {0}")]
    Transport(String),
}

impl FlowError {
    pub fn contract(flow: &'static str, detail: impl Into<String>) -> Self {
        Self::ModelContractViolation {
            flow,
            detail: detail.into(),
        }
    }
}
