use crate::auth::{resolve_caller, Caller};
use crate::db::connection::Database;
use crate::db::{credentials, listings};
use crate::domain::{CredentialUpdate, ListingFilter, ListingStatus, ListingType};
use crate::errors::{ResultResp, ServerError};
use crate::proxy::ProxyGateway;
use crate::responses::{error_to_response, json_response, preflight_response, raw_json_response};
use crate::sync::{CancelToken, SyncOrchestrator};
use astra::{Request, Response};
use chrono::Utc;
use percent_encoding::percent_decode_str;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::io::Read;
use std::sync::Arc;

const MAX_BODY_BYTES: u64 = 64 * 1024;

/// Everything a request handler needs, shared across worker threads.
pub struct AppState {
    pub db: Database,
    pub sync: Arc<SyncOrchestrator>,
    pub proxy: ProxyGateway,
    /// Shared with the scheduler; on-demand runs honour it too.
    pub cancel: CancelToken,
}

#[derive(Debug, Deserialize)]
struct ProxyRequest {
    endpoint: Option<String>,
}

/// Route a request, rendering any error as JSON.
pub fn respond(req: Request, state: &AppState) -> Response {
    let method = req.method().as_str().to_string();
    let path = req.uri().path().to_string();

    match handle(req, state) {
        Ok(resp) => resp,
        Err(err) => {
            if err.status_code() >= 500 {
                tracing::error!(%method, %path, error = %err, "request failed");
            } else {
                tracing::debug!(%method, %path, error = %err, "request rejected");
            }
            error_to_response(&err, err.status_code())
        }
    }
}

pub fn handle(req: Request, state: &AppState) -> ResultResp {
    let method = req.method().as_str().to_string();
    let path = req.uri().path().to_string();

    match (method.as_str(), path.as_str()) {
        ("OPTIONS", _) => preflight_response(),
        ("GET", "/health") => json_response(200, &json!({ "status": "ok" })),

        // The two core entry points answer every failure with a 500.
        ("POST", "/sync") => core_entry(sync_now(state)),
        ("POST", "/proxy") => core_entry(proxy_request(req, state)),

        ("GET", "/settings") => get_settings(&req, state),
        ("PUT", "/settings") => put_settings(req, state),
        ("GET", "/listings") => get_listings(&req, state),
        ("GET", p) if p.starts_with("/listings/") => {
            get_one_listing(&req, state, &p["/listings/".len()..])
        }
        _ => Err(ServerError::NotFound(format!("no route for {method} {path}"))),
    }
}

fn core_entry(result: ResultResp) -> ResultResp {
    Ok(result.unwrap_or_else(|err| {
        tracing::warn!(error = %err, kind = err.kind(), "core request failed");
        error_to_response(&err, 500)
    }))
}

fn sync_now(state: &AppState) -> ResultResp {
    let report = state.sync.run(&state.cancel)?;
    json_response(200, &report)
}

fn proxy_request(mut req: Request, state: &AppState) -> ResultResp {
    // Identity first: an anonymous caller never reaches the upstream.
    let caller = current_caller(&req, state)?;
    let caller = caller.ok_or(ServerError::Unauthenticated)?;

    let body: ProxyRequest = read_json(&mut req)?;
    let endpoint = body
        .endpoint
        .ok_or_else(|| ServerError::BadRequest("missing \"endpoint\"".into()))?;

    let raw = state.proxy.proxy(Some(&caller), &endpoint)?;
    raw_json_response(200, raw)
}

fn get_settings(req: &Request, state: &AppState) -> ResultResp {
    let caller = require_caller(req, state)?;
    let cred = state
        .db
        .with_conn(|conn| credentials::get_credential(conn, &caller.tenant_id))?;
    json_response(200, &cred)
}

fn put_settings(mut req: Request, state: &AppState) -> ResultResp {
    let caller = require_caller(&req, state)?;
    let update: CredentialUpdate = read_json(&mut req)?;
    let now = Utc::now().timestamp();

    let cred = state.db.with_conn(|conn| {
        credentials::upsert_credential(conn, &caller.tenant_id, &update, now)
    })?;
    tracing::info!(tenant_id = %caller.tenant_id, "settings saved");
    json_response(200, &cred)
}

fn get_listings(req: &Request, state: &AppState) -> ResultResp {
    let caller = require_caller(req, state)?;
    let filter = listing_filter(req)?;
    let rows = state
        .db
        .with_conn(|conn| listings::list_listings(conn, &caller.tenant_id, &filter))?;
    json_response(200, &rows)
}

fn get_one_listing(req: &Request, state: &AppState, segment: &str) -> ResultResp {
    let caller = require_caller(req, state)?;
    // Upstream ids may hold spaces, slashes or non-ASCII text.
    let external_id = percent_decode_str(segment)
        .decode_utf8()
        .map_err(|_| ServerError::BadRequest("listing id is not valid UTF-8".into()))?;
    let external_id: &str = &external_id;
    let row = state
        .db
        .with_conn(|conn| listings::get_listing(conn, &caller.tenant_id, external_id))?
        .ok_or_else(|| ServerError::NotFound(format!("listing {external_id}")))?;
    json_response(200, &row)
}

fn current_caller(req: &Request, state: &AppState) -> Result<Option<Caller>, ServerError> {
    let now = Utc::now().timestamp();
    state.db.with_conn(|conn| resolve_caller(conn, req, now))
}

fn require_caller(req: &Request, state: &AppState) -> Result<Caller, ServerError> {
    current_caller(req, state)?.ok_or(ServerError::Unauthenticated)
}

fn read_json<T: DeserializeOwned>(req: &mut Request) -> Result<T, ServerError> {
    let mut raw = Vec::new();
    req.body_mut()
        .reader()
        .take(MAX_BODY_BYTES + 1)
        .read_to_end(&mut raw)
        .map_err(|e| ServerError::BadRequest(format!("could not read body: {e}")))?;
    if raw.len() as u64 > MAX_BODY_BYTES {
        return Err(ServerError::BadRequest("request body too large".into()));
    }
    serde_json::from_slice(&raw)
        .map_err(|e| ServerError::BadRequest(format!("invalid JSON body: {e}")))
}

fn parse_query(req: &Request) -> HashMap<String, String> {
    req.uri()
        .query()
        .map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
        .unwrap_or_default()
}

fn listing_filter(req: &Request) -> Result<ListingFilter, ServerError> {
    let params = parse_query(req);
    let listing_type = params
        .get("listing_type")
        .map(|v| v.parse::<ListingType>())
        .transpose()
        .map_err(ServerError::BadRequest)?;
    let status = params
        .get("status")
        .map(|v| v.parse::<ListingStatus>())
        .transpose()
        .map_err(ServerError::BadRequest)?;
    Ok(ListingFilter { listing_type, status })
}
