use crate::upstream::UpstreamError;
use astra::Response;
use thiserror::Error;

/// Errors originating from either the server logic
/// (routing, identity, missing rows) or downstream layers (upstream API, DB).
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("No active session")]
    Unauthenticated,
    #[error("Not Found: {0}")]
    NotFound(String),
    #[error("Bad Request: {0}")]
    BadRequest(String),
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),
    #[error("Database Error: {0}")]
    Persistence(String),
    #[error("Internal Server Error")]
    InternalError,
}

impl ServerError {
    /// Stable machine-readable tag, surfaced next to the message in JSON errors.
    pub fn kind(&self) -> &'static str {
        match self {
            ServerError::Unauthenticated => "unauthenticated",
            ServerError::NotFound(_) => "not_found",
            ServerError::BadRequest(_) => "bad_request",
            ServerError::Upstream(UpstreamError::Network(_)) => "network",
            ServerError::Upstream(UpstreamError::Status { .. }) => "upstream",
            ServerError::Upstream(UpstreamError::InvalidBody(_)) => "malformed_payload",
            ServerError::MalformedPayload(_) => "malformed_payload",
            ServerError::Persistence(_) => "persistence",
            ServerError::InternalError => "internal",
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            ServerError::Unauthenticated => 401,
            ServerError::NotFound(_) => 404,
            ServerError::BadRequest(_) => 400,
            _ => 500,
        }
    }
}

impl From<rusqlite::Error> for ServerError {
    fn from(e: rusqlite::Error) -> Self {
        ServerError::Persistence(e.to_string())
    }
}

// Type alias commonly used by route handlers.
pub type ResultResp = Result<Response, ServerError>;
