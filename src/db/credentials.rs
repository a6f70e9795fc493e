// src/db/credentials.rs
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};

use crate::domain::{CredentialUpdate, TenantCredential, TenantId};
use crate::errors::ServerError;

const SELECT_COLUMNS: &str = "tenant_id, api_key, bearer_token, endpoint_for_sale, endpoint_sold,
     endpoint_for_lease, endpoint_leased, updated_at";

fn row_to_credential(row: &Row<'_>) -> rusqlite::Result<TenantCredential> {
    Ok(TenantCredential {
        tenant_id: row.get(0)?,
        api_key: row.get(1)?,
        bearer_token: row.get(2)?,
        endpoint_for_sale: row.get(3)?,
        endpoint_sold: row.get(4)?,
        endpoint_for_lease: row.get(5)?,
        endpoint_leased: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

/// Fetch one tenant's credentials; `NotFound` if the tenant never saved settings.
pub fn get_credential(
    conn: &Connection,
    tenant_id: &TenantId,
) -> Result<TenantCredential, ServerError> {
    find_credential(conn, tenant_id)?
        .ok_or_else(|| ServerError::NotFound(format!("no credentials for tenant {tenant_id}")))
}

pub fn find_credential(
    conn: &Connection,
    tenant_id: &TenantId,
) -> Result<Option<TenantCredential>, ServerError> {
    let row = conn
        .query_row(
            &format!("SELECT {SELECT_COLUMNS} FROM tenant_credentials WHERE tenant_id = ?1"),
            params![tenant_id],
            row_to_credential,
        )
        .optional()?;
    Ok(row)
}

pub fn get_all_credentials(conn: &Connection) -> Result<Vec<TenantCredential>, ServerError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SELECT_COLUMNS} FROM tenant_credentials ORDER BY tenant_id"
    ))?;
    let rows = stmt.query_map([], row_to_credential)?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

/// Merge a partial update into the tenant's row, creating it if absent.
///
/// Runs inside an IMMEDIATE transaction so two saves for the same tenant
/// serialize instead of losing each other's fields.
pub fn upsert_credential(
    conn: &mut Connection,
    tenant_id: &TenantId,
    update: &CredentialUpdate,
    now: i64,
) -> Result<TenantCredential, ServerError> {
    update.validate()?;

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let mut cred = find_credential(&tx, tenant_id)?
        .unwrap_or_else(|| TenantCredential::empty(tenant_id.clone()));
    update.apply_to(&mut cred);
    cred.updated_at = now;

    tx.execute(
        r#"
        INSERT INTO tenant_credentials (
            tenant_id, api_key, bearer_token, endpoint_for_sale, endpoint_sold,
            endpoint_for_lease, endpoint_leased, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        ON CONFLICT(tenant_id) DO UPDATE SET
            api_key = excluded.api_key,
            bearer_token = excluded.bearer_token,
            endpoint_for_sale = excluded.endpoint_for_sale,
            endpoint_sold = excluded.endpoint_sold,
            endpoint_for_lease = excluded.endpoint_for_lease,
            endpoint_leased = excluded.endpoint_leased,
            updated_at = excluded.updated_at
        "#,
        params![
            &cred.tenant_id,
            &cred.api_key,
            &cred.bearer_token,
            &cred.endpoint_for_sale,
            &cred.endpoint_sold,
            &cred.endpoint_for_lease,
            &cred.endpoint_leased,
            cred.updated_at,
        ],
    )?;

    tx.commit()?;
    Ok(cred)
}
