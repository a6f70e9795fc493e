// src/proxy.rs
use crate::auth::Caller;
use crate::db::connection::Database;
use crate::db::credentials::get_credential;
use crate::domain::credential::parse_endpoint_url;
use crate::errors::ServerError;
use crate::upstream::Upstream;
use std::sync::Arc;

/// Pass-through to the listings API using the caller's own stored credentials.
///
/// Nothing is normalized or persisted here. Every failure is terminal for the
/// request and reported with its exact reason.
pub struct ProxyGateway {
    db: Database,
    upstream: Arc<dyn Upstream>,
}

impl ProxyGateway {
    pub fn new(db: Database, upstream: Arc<dyn Upstream>) -> Self {
        Self { db, upstream }
    }

    /// Returns the upstream body text untouched, so key order and number
    /// formatting reach the caller exactly as the upstream sent them.
    pub fn proxy(&self, caller: Option<&Caller>, endpoint: &str) -> Result<String, ServerError> {
        let caller = caller.ok_or(ServerError::Unauthenticated)?;
        let endpoint = endpoint.trim();
        parse_endpoint_url(endpoint)?;

        let cred = self
            .db
            .with_conn(|conn| get_credential(conn, &caller.tenant_id))?;

        tracing::info!(tenant_id = %caller.tenant_id, endpoint, "proxying upstream request");
        let body = self
            .upstream
            .fetch(endpoint, &cred.api_credentials())
            .map_err(|e| {
                tracing::warn!(
                    tenant_id = %caller.tenant_id,
                    endpoint,
                    error = %e,
                    "proxy request failed"
                );
                e
            })?;

        Ok(body)
    }
}
