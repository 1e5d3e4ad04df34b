use serde::{Deserialize, Serialize};

/// What happened to one delivered request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestReport {
    pub request_id: String,
    pub source_bytes: u64,
    /// True when the source was not a PDF and went through the converter.
    pub converted: bool,
    pub page_count: u32,
    pub output_bytes: u64,
    pub bucket: String,
    pub key: String,
    pub started: String,
    pub finished: String,
    pub elapsed_ms: u64,
}
