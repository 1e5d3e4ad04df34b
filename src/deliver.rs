use crate::error::PipelineError;
use aws_sdk_s3::{error::DisplayErrorContext, primitives::ByteStream, Client};
use std::future::Future;
use tracing::info;

pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// One finished response, addressed to the request that asked for it.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub route: String,
    pub token: String,
    pub bucket: String,
    pub key: String,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

/// Hands the transformed object back to the caller of the intercepted `GetObject`.
pub trait Deliverer {
    fn deliver(&self, delivery: Delivery) -> impl Future<Output = Result<(), PipelineError>> + Send;
}

/// Delivers through `WriteGetObjectResponse`.
///
/// That API is addressed purely by route and token. The destination bucket and
/// key ride along as object metadata so the response can be traced back.
pub struct S3Deliverer {
    client: Client,
}

impl S3Deliverer {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl Deliverer for S3Deliverer {
    async fn deliver(&self, delivery: Delivery) -> Result<(), PipelineError> {
        let len = delivery.body.len();
        self.client
            .write_get_object_response()
            .request_route(delivery.route)
            .request_token(delivery.token)
            .status_code(200)
            .content_type(delivery.content_type)
            .content_length(len as i64)
            .metadata("output-bucket", &delivery.bucket)
            .metadata("output-key", &delivery.key)
            .body(ByteStream::from(delivery.body))
            .send()
            .await
            .map_err(|e| PipelineError::Delivery(DisplayErrorContext(&e).to_string()))?;

        info!(
            "delivered {} bytes as {}/{}",
            len, delivery.bucket, delivery.key
        );
        Ok(())
    }
}
