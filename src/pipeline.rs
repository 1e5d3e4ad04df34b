use crate::{
    config::Config,
    context::{sanitize_ext, HandlerResponse, RetrievalContext},
    convert::Converter,
    deliver::{Deliverer, Delivery, PDF_CONTENT_TYPE},
    error::PipelineError,
    fetch::Fetcher,
    report::RequestReport,
    scratch::ScratchArea,
    sniff::{is_pdf, leading_bytes},
    stamp::stamp_pdf,
    util::now_rfc3339,
};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

// Used when neither the request nor the config yields a usable extension.
const FALLBACK_EXT: &str = "bin";

/// Fetch → persist → classify → convert → stamp → deliver, for one request.
pub struct Pipeline<F, C, D> {
    cfg: Config,
    fetcher: F,
    converter: Arc<C>,
    deliverer: D,
}

/// Source bytes that are known to be a PDF.
#[derive(Debug)]
pub struct PreparedPdf {
    pub bytes: Vec<u8>,
    pub converted: bool,
}

impl<F: Fetcher, C: Converter, D: Deliverer> Pipeline<F, C, D> {
    pub fn new(cfg: &Config, fetcher: F, converter: C, deliverer: D) -> Self {
        Self {
            cfg: cfg.clone(),
            fetcher,
            converter: Arc::new(converter),
            deliverer,
        }
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Runs the request and maps the outcome onto the platform response.
    /// Error details stay in the log; callers only ever see a generic failure.
    pub async fn handle(&self, ctx: &RetrievalContext) -> HandlerResponse {
        match self.run(ctx).await {
            Ok(report) => {
                info!(
                    request_id = %report.request_id,
                    converted = report.converted,
                    pages = report.page_count,
                    elapsed_ms = report.elapsed_ms,
                    "request delivered: {}",
                    serde_json::to_string(&report).unwrap_or_default()
                );
                HandlerResponse::success(&report.bucket, &report.key)
            }
            Err(err) => {
                error!(request_id = %ctx.request_id, kind = %err.kind(), "request failed: {err}");
                HandlerResponse::failure()
            }
        }
    }

    pub async fn run(&self, ctx: &RetrievalContext) -> Result<RequestReport, PipelineError> {
        let started_at = now_rfc3339();
        let started = Instant::now();

        let source = self.fetcher.fetch(&ctx.input_url).await?;
        let source_bytes = source.len() as u64;
        info!(request_id = %ctx.request_id, "fetched {} source bytes", source_bytes);

        let scratch = ScratchArea::for_request(Path::new(&self.cfg.paths.scratch_dir), &ctx.output_token)?;
        let ext = scratch_extension(
            ctx.source_ext.as_deref(),
            &self.cfg.converter.default_input_ext,
        );

        // The converter blocks until soffice exits; keep it off the async workers.
        let converter = Arc::clone(&self.converter);
        let staged = scratch.clone();
        let prepared = tokio::task::spawn_blocking(move || {
            prepare_pdf(converter.as_ref(), &staged, &ext, source)
        })
        .await
        .unwrap_or_else(|e| {
            Err(PipelineError::Conversion(format!(
                "conversion task failed: {e}"
            )))
        });
        if !self.cfg.debug.keep_scratch {
            scratch.cleanup();
        }
        let prepared = prepared?;

        let stamped = stamp_pdf(&prepared.bytes, &self.cfg.watermark)?;
        if !is_pdf(&stamped.bytes) {
            return Err(PipelineError::Parse(
                "stamped output does not start with a PDF header".into(),
            ));
        }
        debug!("stamped {} pages", stamped.page_count);

        let key = output_key(&self.cfg.delivery.key_prefix, &ctx.request_id);
        let bucket = self.cfg.delivery.bucket.clone();
        let output_bytes = stamped.bytes.len() as u64;

        self.deliverer
            .deliver(Delivery {
                route: ctx.output_route.clone(),
                token: ctx.output_token.clone(),
                bucket: bucket.clone(),
                key: key.clone(),
                content_type: PDF_CONTENT_TYPE,
                body: stamped.bytes,
            })
            .await?;

        Ok(RequestReport {
            request_id: ctx.request_id.clone(),
            source_bytes,
            converted: prepared.converted,
            page_count: stamped.page_count as u32,
            output_bytes,
            bucket,
            key,
            started: started_at,
            finished: now_rfc3339(),
            elapsed_ms: started.elapsed().as_millis() as u64,
        })
    }
}

/// Extension for the scratch copy of the source: the request's own if it had a
/// usable one, else the configured default, else `bin`.
pub fn scratch_extension(source_ext: Option<&str>, default_ext: &str) -> String {
    if let Some(ext) = source_ext.and_then(sanitize_ext) {
        return ext;
    }
    sanitize_ext(default_ext).unwrap_or_else(|| {
        warn!("converter.default_input_ext {default_ext:?} is unusable; using {FALLBACK_EXT}");
        FALLBACK_EXT.to_string()
    })
}

/// Persists `source`, then makes sure a PDF comes out: the bytes themselves if
/// they already are one, otherwise the verified converter output.
///
/// A non-PDF source is not rejected; it is handed to the converter.
pub fn prepare_pdf<C: Converter>(
    converter: &C,
    scratch: &ScratchArea,
    ext: &str,
    source: Vec<u8>,
) -> Result<PreparedPdf, PipelineError> {
    let input = scratch.write_input(ext, &source)?;

    if is_pdf(&source) {
        debug!("source is already a PDF");
        return Ok(PreparedPdf {
            bytes: source,
            converted: false,
        });
    }

    info!(
        "source is not a PDF (starts with \"{}\"); converting",
        leading_bytes(&source)
    );
    let produced = converter.convert(&input, &scratch.output_dir())?;
    let bytes = std::fs::read(&produced).map_err(|e| {
        PipelineError::Conversion(format!("reading {}: {e}", produced.display()))
    })?;

    if !is_pdf(&bytes) {
        return Err(PipelineError::ConversionVerification {
            leading: leading_bytes(&bytes),
        });
    }
    info!("converted to {} PDF bytes", bytes.len());

    Ok(PreparedPdf {
        bytes,
        converted: true,
    })
}

/// Object key reported for a delivered request; the same name goes into the
/// delivery metadata and the response body.
pub fn output_key(prefix: &str, request_id: &str) -> String {
    let safe: String = request_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{prefix}{safe}.pdf")
}
