pub mod process;
pub mod soffice;

use crate::error::PipelineError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub use soffice::SofficeConverter;

/// Turns a document on scratch storage into a PDF on scratch storage.
///
/// Conversions run on a blocking thread, so implementations must be shareable.
pub trait Converter: Send + Sync + 'static {
    /// Converts `input` into a PDF inside `out_dir` and returns the PDF's path.
    fn convert(&self, input: &Path, out_dir: &Path) -> Result<PathBuf, PipelineError>;
}

/// Where a converter writes the PDF rendering of `input`.
pub fn expected_output(input: &Path, out_dir: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    out_dir.join(format!("{stem}.pdf"))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConverterDiag {
    pub soffice_exe: String,
    pub version: Option<String>,
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
}
