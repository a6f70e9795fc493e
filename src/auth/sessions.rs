// src/auth/sessions.rs
use crate::auth::token::{generate_token_default, hash_token};
use crate::domain::TenantId;
use crate::errors::ServerError;
use astra::Request;
use rusqlite::{params, Connection, OptionalExtension};

pub const SESSION_TTL_SECS: i64 = 60 * 60 * 24 * 7; // 7 days

/// An authenticated tenant, resolved from the request's session token.
#[derive(Debug, Clone, PartialEq)]
pub struct Caller {
    pub tenant_id: TenantId,
}

pub fn create_session(
    conn: &Connection,
    tenant_id: &TenantId,
    now: i64,
) -> Result<String, ServerError> {
    let raw_token = generate_token_default();
    let hash = hash_token(&raw_token);
    let expires_at = now + SESSION_TTL_SECS;

    conn.execute(
        r#"
        insert into sessions (tenant_id, token_hash, created_at, expires_at)
        values (?, ?, ?, ?)
        "#,
        params![tenant_id, hash.as_slice(), now, expires_at],
    )
    .map_err(|e| ServerError::Persistence(format!("create session failed: {e}")))?;

    Ok(raw_token)
}

pub fn revoke_session(conn: &Connection, raw_token: &str, now: i64) -> Result<bool, ServerError> {
    let hash = hash_token(raw_token);
    let n = conn
        .execute(
            "update sessions set revoked_at = ? where token_hash = ? and revoked_at is null",
            params![now, hash.as_slice()],
        )
        .map_err(|e| ServerError::Persistence(format!("revoke session failed: {e}")))?;
    Ok(n > 0)
}

pub fn load_tenant_from_session(
    conn: &Connection,
    raw_token: &str,
    now: i64,
) -> Result<Option<TenantId>, ServerError> {
    let hash = hash_token(raw_token);

    conn.query_row(
        r#"
        select tenant_id
        from sessions
        where token_hash = ?
          and expires_at > ?
          and revoked_at is null
        "#,
        params![hash.as_slice(), now],
        |row| row.get(0),
    )
    .optional()
    .map_err(|e| ServerError::Persistence(format!("session lookup failed: {e}")))
}

/// Raw session token from `Authorization: Bearer …`, else the `session` cookie.
pub fn session_token(req: &Request) -> Option<String> {
    let bearer = req
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer ").or_else(|| v.strip_prefix("bearer ")))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    req.headers()
        .get_all("cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, v)| *k == "session" && !v.is_empty())
        .map(|(_, v)| v.to_string())
}

/// `None` when the request carries no token or the token is unknown, expired or revoked.
pub fn resolve_caller(
    conn: &Connection,
    req: &Request,
    now: i64,
) -> Result<Option<Caller>, ServerError> {
    let Some(token) = session_token(req) else {
        return Ok(None);
    };
    Ok(load_tenant_from_session(conn, &token, now)?.map(|tenant_id| Caller { tenant_id }))
}
