//! Edit server runtime
//!
//! This crate owns everything that touches the local machine during an edit:
//! the per-request scratch file, the external editor process, and the
//! blocking pipeline that ties them together.

pub mod editor;
pub mod scratch;
pub mod workflow;

// Re-export key types for easy access
pub use editor::{CommandEditor, EditorCommand, EditorOutcome, EditorRunner, ExitPolicy};
pub use scratch::{ScratchFile, SealedScratch};
pub use workflow::{EditPipeline, PipelineConfig};
