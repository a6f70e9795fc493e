use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ListingType {
    #[serde(rename = "For Sale")]
    ForSale,
    #[serde(rename = "For Lease")]
    ForLease,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ListingStatus {
    Available,
    Sold,
    Leased,
}

impl ListingType {
    pub fn as_str(self) -> &'static str {
        match self {
            ListingType::ForSale => "For Sale",
            ListingType::ForLease => "For Lease",
        }
    }
}

impl ListingStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ListingStatus::Available => "Available",
            ListingStatus::Sold => "Sold",
            ListingStatus::Leased => "Leased",
        }
    }
}

impl fmt::Display for ListingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for ListingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ListingType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "For Sale" => Ok(ListingType::ForSale),
            "For Lease" => Ok(ListingType::ForLease),
            other => Err(format!("unknown listing type {other:?}")),
        }
    }
}

impl FromStr for ListingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Available" => Ok(ListingStatus::Available),
            "Sold" => Ok(ListingStatus::Sold),
            "Leased" => Ok(ListingStatus::Leased),
            other => Err(format!("unknown listing status {other:?}")),
        }
    }
}

impl ToSql for ListingType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl ToSql for ListingStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for ListingType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: String| FromSqlError::Other(e.into()))
    }
}

impl FromSql for ListingStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: String| FromSqlError::Other(e.into()))
    }
}

/// Display fields the normalizer fills in when the upstream payload has them.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ListingDetails {
    pub headline: Option<String>,
    pub display_price: Option<String>,
    pub image_url: Option<String>,
    pub bedrooms: Option<i64>,
    pub bathrooms: Option<i64>,
    pub car_spaces: Option<i64>,
    pub address: Option<String>,
}

/// A listing as produced by the normalizer, ready to upsert.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedListing {
    pub external_id: String,
    pub listing_type: ListingType,
    pub status: ListingStatus,
    pub details: ListingDetails,
}

/// A stored listing row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListingRecord {
    pub external_id: String,
    pub listing_type: ListingType,
    pub status: ListingStatus,
    #[serde(flatten)]
    pub details: ListingDetails,
    pub first_seen_at: i64,
}

#[derive(Debug, Clone, Default)]
pub struct ListingFilter {
    pub listing_type: Option<ListingType>,
    pub status: Option<ListingStatus>,
}
