use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Overrides `delivery.bucket` when set.
pub const BUCKET_ENV: &str = "STAMP_GATE_BUCKET";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub paths: Paths,
    #[serde(default)]
    pub fetch: Fetch,
    #[serde(default)]
    pub converter: Converter,
    #[serde(default)]
    pub watermark: Watermark,
    #[serde(default)]
    pub delivery: Delivery,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub debug: Debug,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config: {}", path.display()))?;
        let cfg: Config = toml::from_str(&raw).with_context(|| "parsing TOML")?;
        Ok(cfg)
    }

    /// Loads `path` when given, otherwise falls back to built-in defaults.
    /// Environment overrides are applied last in both cases.
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        let mut cfg = match path {
            Some(p) => Self::load(p)?,
            None => Self::default(),
        };
        cfg.apply_env();
        Ok(cfg)
    }

    pub fn apply_env(&mut self) {
        if let Ok(bucket) = std::env::var(BUCKET_ENV) {
            if !bucket.trim().is_empty() {
                self.delivery.bucket = bucket.trim().to_string();
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Paths {
    /// Root under which each request gets its own scratch directory.
    pub scratch_dir: String,
}
impl Default for Paths {
    fn default() -> Self {
        Self {
            scratch_dir: "/tmp/stamp-gate".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Fetch {
    /// 0 disables the timeout.
    pub timeout_seconds: u64,
    pub max_bytes: u64,
}
impl Default for Fetch {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            max_bytes: 100 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Converter {
    /// Path to `soffice`, or `auto` to probe `SOFFICE_PATH` and known layer locations.
    pub soffice_exe: String,
    /// 0 disables the timeout.
    pub timeout_seconds: u64,
    /// Scratch extension used when the request URL carries none.
    pub default_input_ext: String,
    /// Extra environment for the converter process.
    pub env: BTreeMap<String, String>,
}
impl Default for Converter {
    fn default() -> Self {
        Self {
            soffice_exe: "auto".into(),
            timeout_seconds: 120,
            default_input_ext: "docx".into(),
            env: default_converter_env(),
        }
    }
}

// LibreOffice writes its user profile under $HOME, which is read-only on Lambda.
fn default_converter_env() -> BTreeMap<String, String> {
    BTreeMap::from([("HOME".to_string(), "/tmp".to_string())])
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Watermark {
    pub text: String,
    pub font: String,
    pub font_size: f32,
    pub color: [f32; 3],
    pub opacity: f32,
    pub rotation_degrees: f32,
    /// Horizontal anchor as a fraction of page width.
    pub x_ratio: f32,
    /// Vertical anchor as a fraction of page height.
    pub y_ratio: f32,
}
impl Default for Watermark {
    fn default() -> Self {
        Self {
            text: "CONFIDENTIAL".into(),
            font: "Helvetica".into(),
            font_size: 50.0,
            color: [0.95, 0.1, 0.1],
            opacity: 0.3,
            rotation_degrees: 45.0,
            x_ratio: 0.25,
            y_ratio: 0.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Delivery {
    pub bucket: String,
    pub key_prefix: String,
    /// Empty means the region comes from the Lambda environment.
    pub region: String,
}
impl Default for Delivery {
    fn default() -> Self {
        Self {
            bucket: "converted-documents".into(),
            key_prefix: "converted-document-".into(),
            region: "".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Logging {
    pub level: String,
    pub json: bool,
    pub write_to_file: bool,
    pub file_path: String,
}
impl Default for Logging {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: true,
            write_to_file: false,
            file_path: "/tmp/stamp-gate/stamp-gate.log".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Debug {
    pub keep_converter_stderr: bool,
    pub keep_scratch: bool,
}
impl Default for Debug {
    fn default() -> Self {
        Self {
            keep_converter_stderr: true,
            keep_scratch: false,
        }
    }
}
