// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod ingest;
pub mod runner;

// ---- Re-exports for stable public API ----
pub use crate::ingest::config::AppConfig;
pub use crate::ingest::types::PipelineKind;
pub use crate::ingest::{run_pipeline, RunOutcome, RunStatus, Stage};
