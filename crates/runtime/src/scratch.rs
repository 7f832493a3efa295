//! Scratch File Module
//!
//! A scratch file is the hand-off medium between an HTTP body and the
//! external editor. It lives exactly as long as the request that created it:
//! both [`ScratchFile`] and [`SealedScratch`] remove the file when dropped,
//! whichever path the request takes out of the pipeline.

use std::io::Write;
use std::path::Path;

use editserver_protocol::{EditError, SCRATCH_FILE_PREFIX};
use tempfile::{NamedTempFile, TempPath};
use tracing::debug;

/// A freshly created, still open scratch file.
#[derive(Debug)]
pub struct ScratchFile {
    file: NamedTempFile,
}

impl ScratchFile {
    /// Create a uniquely named scratch file inside `dir`.
    pub fn create(dir: &Path) -> Result<Self, EditError> {
        let file = tempfile::Builder::new()
            .prefix(SCRATCH_FILE_PREFIX)
            .tempfile_in(dir)
            .map_err(|source| EditError::CreateTempFile { source })?;

        debug!(path = %file.path().display(), "Created temporary file");
        Ok(Self { file })
    }

    /// Path of the underlying file.
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Write the whole of `content`, returning the number of bytes written.
    pub fn write_content(&mut self, content: &[u8]) -> Result<u64, EditError> {
        self.file
            .write_all(content)
            .and_then(|_| self.file.flush())
            .map_err(|source| EditError::Write {
                path: self.file.path().display().to_string(),
                source,
            })?;

        Ok(content.len() as u64)
    }

    /// Sync the content to disk and close the handle.
    ///
    /// The returned [`SealedScratch`] keeps ownership of the path, so the file
    /// is still removed once the request is done with it.
    pub fn seal(self) -> Result<SealedScratch, EditError> {
        self.file
            .as_file()
            .sync_all()
            .map_err(|source| EditError::Write {
                path: self.file.path().display().to_string(),
                source,
            })?;

        Ok(SealedScratch {
            path: self.file.into_temp_path(),
        })
    }
}

/// A scratch file whose content is on disk and whose handle is closed.
///
/// Other processes may now open, rewrite or even replace the file.
#[derive(Debug)]
pub struct SealedScratch {
    path: TempPath,
}

impl SealedScratch {
    /// Path handed to the editor.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the current content of the file.
    pub fn read_back(&self) -> Result<Vec<u8>, EditError> {
        std::fs::read(&self.path).map_err(|source| EditError::ReadBack {
            path: self.path.display().to_string(),
            source,
        })
    }
}

impl Drop for SealedScratch {
    fn drop(&mut self) {
        // TempPath unlinks the file right after this runs.
        debug!(path = %self.path.display(), "Unlinking temporary file");
    }
}
