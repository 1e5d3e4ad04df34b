use crate::{
    config::Config,
    convert::SofficeConverter,
    pipeline::{prepare_pdf, scratch_extension},
    scratch::ScratchArea,
    stamp::stamp_pdf,
    util::{ensure_dir, sha256_hex},
};
use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const DEFAULT_CONFIG_FILE: &str = "stamp-gate.toml";

#[derive(Parser, Debug)]
#[command(name = "stamp-gate")]
#[command(about = "S3 Object Lambda that converts documents to PDF and watermarks every page")]
pub struct Args {
    /// Without a subcommand the binary serves Lambda invocations.
    #[command(subcommand)]
    pub cmd: Option<Command>,

    /// Path to config TOML. If omitted, uses ./stamp-gate.toml if present, else defaults.
    #[arg(long, env = "STAMP_GATE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override log level (trace/debug/info/warn/error).
    #[arg(long)]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the Lambda runtime loop.
    Serve {},
    /// Convert (if needed) and watermark a local file.
    Stamp {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
    },
    /// Check that the converter can be launched.
    Doctor {},
}

pub fn dispatch(args: Args) -> Result<()> {
    let cfg_path = resolve_config_path(args.config.as_deref());
    let cfg = Config::resolve(cfg_path.as_deref())?;

    let log_path = resolve_log_path(&cfg);
    let _guard = init_logging(&args, &cfg, log_path.as_deref())?;

    match args.cmd.clone().unwrap_or(Command::Serve {}) {
        Command::Serve {} => crate::lambda::serve(&cfg),
        Command::Stamp { input, output } => stamp_file(&cfg, &input, &output),
        Command::Doctor {} => doctor(&cfg),
    }
}

fn resolve_config_path(user: Option<&Path>) -> Option<PathBuf> {
    if let Some(p) = user {
        return Some(p.to_path_buf());
    }
    let default = PathBuf::from(DEFAULT_CONFIG_FILE);
    default.exists().then_some(default)
}

fn init_logging(args: &Args, cfg: &Config, file_path: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let level = args
        .log_level
        .as_deref()
        .unwrap_or(cfg.logging.level.as_str());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // CloudWatch adds its own timestamps and cannot render ANSI.
    let stdout_layer = if cfg.logging.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_current_span(false)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_ansi(false)
            .boxed()
    };

    let (file_layer, guard) = if let Some(path) = file_path {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        ensure_dir(parent)?;
        let file = std::fs::File::create(path)
            .with_context(|| format!("create log file: {}", path.display()))?;
        let (non_blocking, guard) = tracing_appender::non_blocking(file);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
            .boxed();
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow!("failed to init logging: {e}"))?;

    Ok(guard)
}

fn doctor(cfg: &Config) -> Result<()> {
    let converter = SofficeConverter::new(cfg);
    let diag = converter.doctor();
    println!("{}", serde_json::to_string_pretty(&diag)?);
    if !diag.ok {
        return Err(anyhow!("converter is not usable: {}", converter.soffice_exe().display()));
    }
    Ok(())
}

fn stamp_file(cfg: &Config, input: &Path, output: &Path) -> Result<()> {
    validate_input(input, output)?;

    let source = std::fs::read(input).with_context(|| format!("reading {}", input.display()))?;
    let ext = scratch_extension(
        input.extension().and_then(|s| s.to_str()),
        &cfg.converter.default_input_ext,
    );

    let scratch = ScratchArea::for_request(Path::new(&cfg.paths.scratch_dir), &sha256_hex(&source))?;
    let converter = SofficeConverter::new(cfg);
    let prepared = prepare_pdf(&converter, &scratch, &ext, source);
    if !cfg.debug.keep_scratch {
        scratch.cleanup();
    }
    let prepared = prepared.with_context(|| format!("preparing {}", input.display()))?;

    let stamped = stamp_pdf(&prepared.bytes, &cfg.watermark)?;

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        ensure_dir(parent)?;
    }
    std::fs::write(output, &stamped.bytes)
        .with_context(|| format!("writing {}", output.display()))?;
    info!("wrote {} ({} pages)", output.display(), stamped.page_count);

    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "input": input,
            "output": output,
            "converted": prepared.converted,
            "pages": stamped.page_count,
            "bytes": stamped.bytes.len(),
            "status": "ok"
        }))?
    );
    Ok(())
}

fn validate_input(input: &Path, output: &Path) -> Result<()> {
    let input_str = input.display().to_string();
    if looks_like_url(&input_str) {
        return Err(anyhow!("URL inputs are not supported locally: {input_str}"));
    }
    if !input.is_file() {
        return Err(anyhow!("input does not exist: {}", input.display()));
    }
    if input == output {
        return Err(anyhow!("refusing to overwrite the input: {}", output.display()));
    }
    Ok(())
}

fn looks_like_url(s: &str) -> bool {
    let s = s.to_ascii_lowercase();
    s.starts_with("http://") || s.starts_with("https://") || s.starts_with("s3://")
}

fn resolve_log_path(cfg: &Config) -> Option<PathBuf> {
    if !cfg.logging.write_to_file {
        return None;
    }
    if !cfg.logging.file_path.is_empty() {
        return Some(PathBuf::from(&cfg.logging.file_path));
    }
    Some(PathBuf::from(&cfg.paths.scratch_dir).join("stamp-gate.log"))
}
