// src/domain/credential.rs

use crate::domain::listing::{ListingStatus, ListingType};
use crate::errors::ServerError;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque tenant identity, as issued by the auth collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(String);

impl TenantId {
    pub fn new(id: impl Into<String>) -> Result<Self, ServerError> {
        let id = id.into().trim().to_string();
        if id.is_empty() {
            return Err(ServerError::BadRequest("tenant id must not be empty".into()));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl ToSql for TenantId {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.0.as_str()))
    }
}

impl FromSql for TenantId {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        TenantId::new(value.as_str()?).map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

/// The two secrets sent with every upstream request.
#[derive(Clone)]
pub struct ApiCredentials {
    pub api_key: String,
    pub bearer_token: String,
}

impl fmt::Debug for ApiCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiCredentials")
            .field("api_key", &"<redacted>")
            .field("bearer_token", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TenantCredential {
    pub tenant_id: TenantId,
    pub api_key: String,
    pub bearer_token: String,
    pub endpoint_for_sale: Option<String>,
    pub endpoint_sold: Option<String>,
    pub endpoint_for_lease: Option<String>,
    pub endpoint_leased: Option<String>,
    pub updated_at: i64,
}

/// One (url, listing_type, status) unit of a sync run.
#[derive(Debug, Clone, PartialEq)]
pub struct Endpoint {
    pub url: String,
    pub listing_type: ListingType,
    pub status: ListingStatus,
}

impl TenantCredential {
    pub fn empty(tenant_id: TenantId) -> Self {
        Self {
            tenant_id,
            api_key: String::new(),
            bearer_token: String::new(),
            endpoint_for_sale: None,
            endpoint_sold: None,
            endpoint_for_lease: None,
            endpoint_leased: None,
            updated_at: 0,
        }
    }

    pub fn api_credentials(&self) -> ApiCredentials {
        ApiCredentials {
            api_key: self.api_key.clone(),
            bearer_token: self.bearer_token.clone(),
        }
    }

    /// Configured endpoints in processing order; blank URLs are skipped.
    ///
    /// Sold follows For Sale and Leased follows For Lease, so within one tenant
    /// the later-stage status is always the last one observed.
    pub fn endpoints(&self) -> Vec<Endpoint> {
        [
            (&self.endpoint_for_sale, ListingType::ForSale, ListingStatus::Available),
            (&self.endpoint_sold, ListingType::ForSale, ListingStatus::Sold),
            (&self.endpoint_for_lease, ListingType::ForLease, ListingStatus::Available),
            (&self.endpoint_leased, ListingType::ForLease, ListingStatus::Leased),
        ]
        .into_iter()
        .filter_map(|(url, listing_type, status)| {
            let url = url.as_deref().map(str::trim).filter(|u| !u.is_empty())?;
            Some(Endpoint {
                url: url.to_string(),
                listing_type,
                status,
            })
        })
        .collect()
    }
}

/// Partial settings save. `None` keeps the stored value; for endpoints an
/// empty string clears it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CredentialUpdate {
    pub api_key: Option<String>,
    pub bearer_token: Option<String>,
    pub endpoint_for_sale: Option<String>,
    pub endpoint_sold: Option<String>,
    pub endpoint_for_lease: Option<String>,
    pub endpoint_leased: Option<String>,
}

impl CredentialUpdate {
    /// Reject endpoint values that are neither blank nor an absolute http(s) URL.
    pub fn validate(&self) -> Result<(), ServerError> {
        for url in [
            &self.endpoint_for_sale,
            &self.endpoint_sold,
            &self.endpoint_for_lease,
            &self.endpoint_leased,
        ]
        .into_iter()
        .flatten()
        {
            if !url.trim().is_empty() {
                parse_endpoint_url(url)?;
            }
        }
        Ok(())
    }

    /// Field-level merge onto a stored row.
    pub fn apply_to(&self, cred: &mut TenantCredential) {
        if let Some(key) = &self.api_key {
            cred.api_key = key.trim().to_string();
        }
        if let Some(token) = &self.bearer_token {
            cred.bearer_token = token.trim().to_string();
        }
        merge_endpoint(&mut cred.endpoint_for_sale, &self.endpoint_for_sale);
        merge_endpoint(&mut cred.endpoint_sold, &self.endpoint_sold);
        merge_endpoint(&mut cred.endpoint_for_lease, &self.endpoint_for_lease);
        merge_endpoint(&mut cred.endpoint_leased, &self.endpoint_leased);
    }
}

fn merge_endpoint(stored: &mut Option<String>, update: &Option<String>) {
    if let Some(value) = update {
        let value = value.trim();
        *stored = if value.is_empty() {
            None
        } else {
            Some(value.to_string())
        };
    }
}

pub fn parse_endpoint_url(raw: &str) -> Result<url::Url, ServerError> {
    let parsed = url::Url::parse(raw.trim())
        .map_err(|e| ServerError::BadRequest(format!("invalid endpoint url {raw:?}: {e}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(ServerError::BadRequest(format!(
            "unsupported endpoint scheme {other:?}"
        ))),
    }
}
