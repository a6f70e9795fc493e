mod client;
pub mod models;
mod upstream_error;

pub use client::{HttpUpstream, Upstream};
pub use upstream_error::UpstreamError;
