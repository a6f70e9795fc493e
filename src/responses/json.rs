use crate::errors::{ResultResp, ServerError};
use astra::{Body, ResponseBuilder};
use serde::Serialize;

pub const CORS_ALLOW_HEADERS: &str = "authorization, x-client-info, apikey, content-type";
pub const CORS_ALLOW_METHODS: &str = "GET, POST, PUT, OPTIONS";

/// Every response is callable from a browser on any origin.
pub fn with_cors(builder: http::response::Builder) -> http::response::Builder {
    builder
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Headers", CORS_ALLOW_HEADERS)
        .header("Access-Control-Allow-Methods", CORS_ALLOW_METHODS)
}

pub fn json_response<T: Serialize>(status: u16, value: &T) -> ResultResp {
    let body = serde_json::to_vec(value).map_err(|_| ServerError::InternalError)?;
    raw_json_response(status, body)
}

/// Send already-encoded JSON as is.
pub fn raw_json_response(status: u16, body: impl Into<Body>) -> ResultResp {
    let resp = with_cors(ResponseBuilder::new().status(status))
        .header("Content-Type", mime::APPLICATION_JSON.as_ref())
        .body(body.into())
        .map_err(|_| ServerError::InternalError)?;

    Ok(resp)
}

pub fn preflight_response() -> ResultResp {
    with_cors(ResponseBuilder::new().status(204))
        .body(Body::empty())
        .map_err(|_| ServerError::InternalError)
}
