use super::{expected_output, process::run_captured, Converter, ConverterDiag};
use crate::{config::Config, error::PipelineError, util::timeout_from_secs};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Consulted when `converter.soffice_exe = "auto"`.
pub const SOFFICE_PATH_ENV: &str = "SOFFICE_PATH";

/// Where Lambda layers commonly stage LibreOffice.
const KNOWN_LOCATIONS: &[&str] = &[
    "/opt/libreoffice/program/soffice",
    "/opt/instdir/program/soffice",
    "/tmp/libreoffice/instdir/program/soffice",
    "/usr/bin/soffice",
];

/// Flags that keep LibreOffice from touching a display, a profile lock, or a
/// recovery dialog.
const HEADLESS_FLAGS: &[&str] = &[
    "--headless",
    "--invisible",
    "--nodefault",
    "--view",
    "--nolockcheck",
    "--nologo",
    "--norestore",
];

/// Headless LibreOffice.
pub struct SofficeConverter {
    cfg: Config,
    soffice_exe: PathBuf,
}

impl SofficeConverter {
    pub fn new(cfg: &Config) -> Self {
        let soffice_exe = resolve_soffice_exe(&cfg.converter.soffice_exe);
        debug!("soffice resolved to {}", soffice_exe.display());
        Self {
            cfg: cfg.clone(),
            soffice_exe,
        }
    }

    pub fn soffice_exe(&self) -> &Path {
        &self.soffice_exe
    }

    fn timeout(&self) -> Option<Duration> {
        timeout_from_secs(self.cfg.converter.timeout_seconds)
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.soffice_exe);
        for (k, v) in &self.cfg.converter.env {
            cmd.env(k, v);
        }
        cmd
    }

    /// Runs `soffice --version` and reports whether the converter is usable.
    pub fn doctor(&self) -> ConverterDiag {
        let mut cmd = self.command();
        cmd.arg("--version");
        let exe = self.soffice_exe.display().to_string();
        match run_captured(&mut cmd, Some(Duration::from_secs(60))) {
            Ok(out) if out.status.success() => ConverterDiag {
                soffice_exe: exe,
                version: String::from_utf8_lossy(&out.stdout)
                    .lines()
                    .next()
                    .map(|l| l.trim().to_string()),
                ok: true,
                error: None,
            },
            Ok(out) => ConverterDiag {
                soffice_exe: exe,
                version: None,
                ok: false,
                error: Some(format!(
                    "exit {}: {}",
                    out.status,
                    String::from_utf8_lossy(&out.stderr).trim()
                )),
            },
            Err(err) => ConverterDiag {
                soffice_exe: exe,
                version: None,
                ok: false,
                error: Some(format!("{err:#}")),
            },
        }
    }
}

impl Converter for SofficeConverter {
    fn convert(&self, input: &Path, out_dir: &Path) -> Result<PathBuf, PipelineError> {
        if !input.is_file() {
            return Err(PipelineError::Conversion(format!(
                "input does not exist: {}",
                input.display()
            )));
        }

        let mut cmd = self.command();
        cmd.args(HEADLESS_FLAGS)
            .arg("--convert-to")
            .arg("pdf")
            .arg("--outdir")
            .arg(out_dir)
            .arg(input);

        info!("converting {} with {}", input.display(), self.soffice_exe.display());
        let output = run_captured(&mut cmd, self.timeout())
            .map_err(|e| PipelineError::Conversion(format!("{e:#}")))?;

        if !output.status.success() {
            return Err(PipelineError::Conversion(format!(
                "soffice exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        if self.cfg.debug.keep_converter_stderr && !output.stderr.is_empty() {
            debug!(
                "soffice stderr: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        debug!(
            "soffice stdout: {}",
            String::from_utf8_lossy(&output.stdout).trim()
        );

        let produced = expected_output(input, out_dir);
        if !produced.is_file() {
            warn!("soffice exited cleanly but {} is missing", produced.display());
            return Err(PipelineError::Conversion(format!(
                "no output produced at {}",
                produced.display()
            )));
        }
        Ok(produced)
    }
}

fn resolve_soffice_exe(raw: &str) -> PathBuf {
    let raw = raw.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("auto") {
        if let Ok(env_val) = std::env::var(SOFFICE_PATH_ENV) {
            let p = PathBuf::from(env_val);
            if p.exists() {
                return p;
            }
        }
        for candidate in KNOWN_LOCATIONS {
            let p = Path::new(candidate);
            if p.exists() {
                return p.to_path_buf();
            }
        }
        return PathBuf::from("soffice");
    }
    PathBuf::from(raw)
}
