use crate::{
    config::Config,
    context::{HandlerResponse, ObjectLambdaEvent, RetrievalContext},
    convert::{Converter, SofficeConverter},
    deliver::{Deliverer, S3Deliverer},
    fetch::{Fetcher, HttpFetcher},
    pipeline::Pipeline,
};
use anyhow::{anyhow, Context, Result};
use aws_config::{BehaviorVersion, Region};
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use tracing::{error, info};

/// Blocks on the Lambda runtime loop until the platform shuts the process down.
pub fn serve(cfg: &Config) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .with_context(|| "building tokio runtime")?;
    runtime.block_on(serve_async(cfg))
}

async fn serve_async(cfg: &Config) -> Result<()> {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());
    if !cfg.delivery.region.is_empty() {
        loader = loader.region(Region::new(cfg.delivery.region.clone()));
    }
    let shared_config = loader.load().await;
    let s3_client = aws_sdk_s3::Client::new(&shared_config);

    let fetcher = HttpFetcher::new(&cfg.fetch)?;
    let converter = SofficeConverter::new(cfg);
    info!(
        "serving: bucket={} soffice={} scratch={}",
        cfg.delivery.bucket,
        converter.soffice_exe().display(),
        cfg.paths.scratch_dir
    );
    let pipeline = Pipeline::new(cfg, fetcher, converter, S3Deliverer::new(s3_client));

    run(service_fn(|event: LambdaEvent<ObjectLambdaEvent>| {
        handle_event(&pipeline, event)
    }))
    .await
    .map_err(|e| anyhow!("lambda runtime failed: {e}"))
}

/// Never returns `Err`: every failure becomes a 500 response for the platform.
pub async fn handle_event<F: Fetcher, C: Converter, D: Deliverer>(
    pipeline: &Pipeline<F, C, D>,
    event: LambdaEvent<ObjectLambdaEvent>,
) -> Result<HandlerResponse, Error> {
    let (payload, context) = event.into_parts();
    let response = match RetrievalContext::from_event(&payload, &context.request_id) {
        Ok(ctx) => pipeline.handle(&ctx).await,
        Err(err) => {
            error!(request_id = %context.request_id, kind = %err.kind(), "{err}");
            HandlerResponse::failure()
        }
    };
    Ok(response)
}
