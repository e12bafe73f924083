// ABOUTME: Per-page temporary storage for raw fetched markup.
// ABOUTME: The file is named from the profile id and sequence number and removed when dropped.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::ChainError;

/// Path of the raw markup file for page `seq` of profile `id`.
pub fn raw_page_path(work_dir: &Path, id: &str, seq: u64) -> PathBuf {
    work_dir.join(format!("{}-{}.html", sanitize(id), seq))
}

/// Path of the deferred notes file for profile `id`.
pub fn notes_path(work_dir: &Path, id: &str) -> PathBuf {
    work_dir.join(format!("{}-notes.html", sanitize(id)))
}

fn sanitize(id: &str) -> String {
    id.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

/// Raw markup of one page on disk. Deleted when dropped.
#[derive(Debug)]
pub struct RawPageFile {
    path: PathBuf,
}

impl RawPageFile {
    /// Writes `body` to `path`, replacing any stale file from an earlier run.
    pub fn write(path: PathBuf, body: &[u8]) -> Result<Self, ChainError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ChainError::io(parent.display().to_string(), "create work dir", e))?;
        }
        std::fs::write(&path, body)
            .map_err(|e| ChainError::io(path.display().to_string(), "write raw page", e))?;
        debug!(path = %path.display(), bytes = body.len(), "stored raw page");
        Ok(Self { path })
    }

    /// Reads the stored bytes back.
    pub fn read(&self) -> Result<Vec<u8>, ChainError> {
        std::fs::read(&self.path)
            .map_err(|e| ChainError::io(self.path.display().to_string(), "read raw page", e))
    }

    /// Deletes the file now.
    pub fn discard(self) {}
}

impl Drop for RawPageFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "removed raw page"),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => warn!(path = %self.path.display(), error = %err, "could not remove raw page"),
        }
    }
}
