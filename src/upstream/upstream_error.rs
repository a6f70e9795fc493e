use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum UpstreamError {
    /// DNS, TLS, timeout, connection reset.
    #[error("Network error: {0}")]
    Network(String),
    #[error("Upstream returned HTTP {status_code}: {message}")]
    Status { status_code: u16, message: String },
    /// 2xx response whose body is not JSON.
    #[error("Upstream body is not valid JSON: {0}")]
    InvalidBody(String),
}
