//! Edit Pipeline
//!
//! The blocking part of an edit: create the scratch file, write the request
//! body, run the editor, read the result back. Every step runs on the calling
//! thread, in order, and the scratch file is gone by the time [`EditPipeline::run`]
//! returns.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use editserver_protocol::EditError;
use tracing::{debug, warn};

use crate::editor::{EditorRunner, ExitPolicy};
use crate::scratch::ScratchFile;

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Directory scratch files are created in
    pub scratch_dir: PathBuf,
    /// How editor failures are treated
    pub exit_policy: ExitPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            scratch_dir: std::env::temp_dir(),
            exit_policy: ExitPolicy::default(),
        }
    }
}

/// Runs one edit end to end.
///
/// Cloning is cheap; clones share the same editor.
#[derive(Clone)]
pub struct EditPipeline {
    config: PipelineConfig,
    editor: Arc<dyn EditorRunner>,
}

impl EditPipeline {
    /// Create a pipeline. A relative scratch directory is resolved against the
    /// current directory so the editor always receives an absolute path.
    pub fn new(mut config: PipelineConfig, editor: Arc<dyn EditorRunner>) -> Self {
        config.scratch_dir = absolutize(&config.scratch_dir);
        Self { config, editor }
    }

    /// Configuration in effect, with the scratch directory already resolved.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Edit `content`, which the client declared to be `declared_len` bytes.
    pub fn run(&self, content: &[u8], declared_len: u64) -> Result<Vec<u8>, EditError> {
        let mut scratch = ScratchFile::create(&self.config.scratch_dir)?;

        let received = content.len() as u64;
        if received != declared_len {
            return Err(EditError::Transfer {
                declared: declared_len,
                written: received,
            });
        }

        let written = scratch.write_content(content)?;
        let scratch = scratch.seal()?;
        debug!(bytes = written, path = %scratch.path().display(), "Wrote content");

        let outcome = self.editor.run(scratch.path());
        if !outcome.is_success() {
            match self.config.exit_policy {
                ExitPolicy::Tolerant => {
                    warn!(%outcome, "Editor did not finish cleanly, returning file content anyway")
                }
                ExitPolicy::Strict => {
                    return Err(EditError::Editor {
                        outcome: outcome.to_string(),
                    })
                }
            }
        }

        let edited = scratch.read_back()?;
        debug!(bytes = edited.len(), "Returning content");
        Ok(edited)
    }
}

fn absolutize(dir: &Path) -> PathBuf {
    if dir.is_absolute() {
        return dir.to_path_buf();
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(dir),
        Err(_) => dir.to_path_buf(),
    }
}
