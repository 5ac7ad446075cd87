//! Agent Core: the query-orchestration engine.
//!
//! Submodules:
//! - `prompt`: renders the tool catalog and an instruction into a selection prompt
//! - `response_parser`: decodes the classifier's reply into a `ToolSelection`
//! - `fallback`: delete-user recovery when the classifier selects no tool
//! - `splitter`: segments a request into independent instructions
//! - `orchestrator`: runs the pipeline per instruction and aggregates steps
//! - `types`: selections and outcome records
//! - `errors`: instruction-level error kinds

pub mod errors;
pub mod fallback;
pub mod orchestrator;
pub mod prompt;
pub mod response_parser;
pub mod splitter;
pub mod types;

// Re-exports for convenience
pub use errors::AgentError;
pub use orchestrator::Orchestrator;
pub use types::{
    InstructionOutcome, OrchestrationResult, OutcomeResult, StepOutcome, ToolSelection,
};
