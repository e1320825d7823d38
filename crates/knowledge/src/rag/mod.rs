//! Retrieval-augmented answering.
//!
//! Turns retrieved passages into a grounded natural language answer via the LLM.

pub mod ask;
pub mod types;

pub use ask::{AnswerEngine, AnswerSettings};
pub use types::{Answer, SourceRef, CONFIDENCE_THRESHOLD};
