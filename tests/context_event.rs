use stamp_gate::{
    context::{
        extension_from_url, sanitize_ext, HandlerResponse, ObjectLambdaEvent, RetrievalContext,
    },
    error::ErrorKind,
};

fn event_json() -> serde_json::Value {
    serde_json::json!({
        "xAmzRequestId": "req-123",
        "getObjectContext": {
            "inputS3Url": "https://bucket.s3.amazonaws.com/report.docx?X-Amz-Signature=abc",
            "outputRoute": "io-route",
            "outputToken": "io-token"
        },
        "userRequest": {
            "url": "https://ap-123.s3-object-lambda.eu-central-1.amazonaws.com/reports/Q3.DOCX",
            "headers": { "Host": "example" }
        },
        "protocolVersion": "1.00"
    })
}

#[test]
fn parses_object_lambda_event() {
    let event: ObjectLambdaEvent = serde_json::from_value(event_json()).unwrap();
    let ctx = RetrievalContext::from_event(&event, "lambda-id").unwrap();
    assert_eq!(ctx.request_id, "req-123");
    assert_eq!(ctx.output_route, "io-route");
    assert_eq!(ctx.output_token, "io-token");
    assert_eq!(ctx.source_ext.as_deref(), Some("docx"));
}

#[test]
fn falls_back_to_invocation_id() {
    let mut raw = event_json();
    raw.as_object_mut().unwrap().remove("xAmzRequestId");
    let event: ObjectLambdaEvent = serde_json::from_value(raw).unwrap();
    let ctx = RetrievalContext::from_event(&event, "lambda-id").unwrap();
    assert_eq!(ctx.request_id, "lambda-id");
}

#[test]
fn missing_context_is_invalid_event() {
    let event = ObjectLambdaEvent::default();
    let err = RetrievalContext::from_event(&event, "x").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidEvent);
}

#[test]
fn rejects_odd_extensions() {
    assert_eq!(extension_from_url("https://h/a/b"), None);
    assert_eq!(extension_from_url("https://h/a/b.tar%2F..%2Fx"), None);
    assert_eq!(sanitize_ext("PPTX").as_deref(), Some("pptx"));
    assert_eq!(sanitize_ext("../x"), None);
}

#[test]
fn success_body_carries_location() {
    let resp = HandlerResponse::success("dest", "k.pdf");
    assert!(resp.is_success());
    assert_eq!(resp.headers["Access-Control-Allow-Origin"], "*");
    let body = resp.parsed_body().unwrap();
    assert_eq!(body.s3_location.as_deref(), Some("dest/k.pdf"));

    let fail = HandlerResponse::failure();
    assert_eq!(fail.status_code, 500);
    assert!(fail.headers.is_empty());
    assert!(fail.parsed_body().unwrap().s3_location.is_none());
}
