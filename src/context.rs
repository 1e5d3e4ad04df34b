//! S3 Object Lambda wire types and the per-request retrieval context.

use crate::error::PipelineError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Inbound payload of an S3 Object Lambda `GetObject` interception.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectLambdaEvent {
    #[serde(default)]
    pub x_amz_request_id: Option<String>,
    #[serde(default)]
    pub get_object_context: Option<GetObjectContext>,
    #[serde(default)]
    pub user_request: Option<UserRequest>,
    #[serde(default)]
    pub configuration: Option<serde_json::Value>,
    #[serde(default)]
    pub user_identity: Option<serde_json::Value>,
    #[serde(default)]
    pub protocol_version: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetObjectContext {
    pub input_s3_url: String,
    pub output_route: String,
    pub output_token: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRequest {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

/// Everything one interception needs to know about where its bytes come from
/// and where they must go.
#[derive(Debug, Clone)]
pub struct RetrievalContext {
    pub request_id: String,
    pub output_route: String,
    pub output_token: String,
    pub input_url: String,
    /// Lower-case extension of the originally requested key, if it had a usable one.
    pub source_ext: Option<String>,
}

impl RetrievalContext {
    /// `fallback_request_id` is used when the event carries no `xAmzRequestId`,
    /// normally the Lambda invocation id.
    pub fn from_event(
        event: &ObjectLambdaEvent,
        fallback_request_id: &str,
    ) -> Result<Self, PipelineError> {
        let goc = event
            .get_object_context
            .as_ref()
            .ok_or_else(|| PipelineError::InvalidEvent("missing getObjectContext".into()))?;
        if goc.input_s3_url.is_empty() {
            return Err(PipelineError::InvalidEvent("empty inputS3Url".into()));
        }
        if goc.output_route.is_empty() || goc.output_token.is_empty() {
            return Err(PipelineError::InvalidEvent(
                "missing outputRoute or outputToken".into(),
            ));
        }

        let request_id = event
            .x_amz_request_id
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or(fallback_request_id)
            .to_string();

        let source_ext = event
            .user_request
            .as_ref()
            .and_then(|u| extension_from_url(&u.url));

        Ok(Self {
            request_id,
            output_route: goc.output_route.clone(),
            output_token: goc.output_token.clone(),
            input_url: goc.input_s3_url.clone(),
            source_ext,
        })
    }
}

fn ext_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z0-9]{1,10}$").expect("static regex"))
}

/// Sanitized extension of the last path segment of `url`.
pub fn extension_from_url(url: &str) -> Option<String> {
    let parsed = reqwest::Url::parse(url).ok()?;
    let last = parsed.path_segments()?.next_back()?;
    let (_, ext) = last.rsplit_once('.')?;
    sanitize_ext(ext)
}

/// Lower-cases `ext` and rejects anything that could escape a file name.
pub fn sanitize_ext(ext: &str) -> Option<String> {
    let ext = ext.trim().to_ascii_lowercase();
    ext_pattern().is_match(&ext).then_some(ext)
}

/// Outbound payload returned to the invoking platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandlerResponse {
    pub status_code: u16,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    /// JSON-encoded [`ResponseBody`].
    pub body: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseBody {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s3_location: Option<String>,
}

impl HandlerResponse {
    pub fn success(bucket: &str, key: &str) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert("Access-Control-Allow-Origin".into(), "*".into());
        headers.insert("Access-Control-Allow-Headers".into(), "Content-Type".into());
        headers.insert(
            "Access-Control-Allow-Methods".into(),
            "GET,POST,OPTIONS".into(),
        );
        Self {
            status_code: 200,
            headers,
            body: encode_body(ResponseBody {
                message: "File successfully converted and watermarked".into(),
                s3_location: Some(format!("{bucket}/{key}")),
            }),
        }
    }

    pub fn failure() -> Self {
        Self {
            status_code: 500,
            headers: BTreeMap::new(),
            body: encode_body(ResponseBody {
                message: "Failed to process file".into(),
                s3_location: None,
            }),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    pub fn parsed_body(&self) -> Option<ResponseBody> {
        serde_json::from_str(&self.body).ok()
    }
}

fn encode_body(body: ResponseBody) -> String {
    serde_json::to_string(&body).unwrap_or_else(|_| format!("{{\"message\":\"{}\"}}", body.message))
}
