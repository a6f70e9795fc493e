use crate::errors::ServerError;
use crate::responses::json::json_response;
use astra::{Body, Response};
use http::StatusCode;
use serde_json::json;

/// Render an error as `{error, kind}` with the given status.
pub fn error_to_response(err: &ServerError, status: u16) -> Response {
    let body = json!({ "error": err.to_string(), "kind": err.kind() });
    json_response(status, &body).unwrap_or_else(|_| fallback_response())
}

fn fallback_response() -> Response {
    let body = r#"{"error":"Internal Server Error","kind":"internal"}"#;
    let mut resp = Response::new(Body::from(body.to_string()));
    *resp.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    resp
}
