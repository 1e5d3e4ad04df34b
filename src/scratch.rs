use crate::{error::PipelineError, util::sha256_hex};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const INPUT_STEM: &str = "source";

/// Request-scoped scratch directory shared with the converter.
///
/// The directory name is derived from the request's output token, so two
/// in-flight requests on a shared filesystem never touch the same files.
#[derive(Debug, Clone)]
pub struct ScratchArea {
    dir: PathBuf,
}

impl ScratchArea {
    pub fn for_request(root: &Path, token: &str) -> Result<Self, PipelineError> {
        let digest = sha256_hex(token.as_bytes());
        let dir = root.join(format!("req-{}", &digest[..16]));
        std::fs::create_dir_all(&dir).map_err(|e| PipelineError::scratch(&dir, e))?;
        debug!("scratch dir {}", dir.display());
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn input_path(&self, ext: &str) -> PathBuf {
        self.dir.join(format!("{INPUT_STEM}.{ext}"))
    }

    /// Directory the converter writes into.
    pub fn output_dir(&self) -> PathBuf {
        self.dir.join("out")
    }

    pub fn write_input(&self, ext: &str, bytes: &[u8]) -> Result<PathBuf, PipelineError> {
        let path = self.input_path(ext);
        std::fs::write(&path, bytes).map_err(|e| PipelineError::scratch(&path, e))?;
        let out_dir = self.output_dir();
        std::fs::create_dir_all(&out_dir).map_err(|e| PipelineError::scratch(&out_dir, e))?;
        debug!("wrote {} bytes to {}", bytes.len(), path.display());
        Ok(path)
    }

    pub fn cleanup(&self) {
        if let Err(err) = std::fs::remove_dir_all(&self.dir) {
            warn!("failed to remove scratch dir {}: {err}", self.dir.display());
        }
    }
}
