//! DOWN/UP alert correlation
//!
//! A ticket whose subject reports a node as DOWN is remembered under its
//! correlation key. A later ticket with the same key reporting UP closes every
//! remembered DOWN ticket for that key and clears them from the store.

pub mod engine;
pub mod extractor;
pub mod models;

pub use engine::CorrelationEngine;
pub use extractor::{classify, extract_correlation_key, is_down_state, is_up_state};
pub use models::CorrelationOutcome;
