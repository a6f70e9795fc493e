use crate::domain::{
    ListingDetails, ListingFilter, ListingRecord, NormalizedListing, TenantId,
};
use crate::errors::ServerError;
use rusqlite::{params, Connection, OptionalExtension, Row};

/// Insert-or-update one listing keyed by (tenant, external_id).
///
/// A single statement, so concurrent syncs cannot interleave between the
/// existence check and the write. Type and status always take the incoming
/// value; display fields only change when the incoming value is present.
pub fn upsert_listing(
    conn: &Connection,
    tenant_id: &TenantId,
    listing: &NormalizedListing,
    now: i64,
) -> Result<(), ServerError> {
    let d = &listing.details;
    conn.execute(
        r#"
        INSERT INTO listings (
            tenant_id, external_id, listing_type, status,
            headline, display_price, image_url, bedrooms, bathrooms, car_spaces, address,
            first_seen_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        ON CONFLICT(tenant_id, external_id) DO UPDATE SET
            listing_type  = excluded.listing_type,
            status        = excluded.status,
            headline      = COALESCE(excluded.headline, listings.headline),
            display_price = COALESCE(excluded.display_price, listings.display_price),
            image_url     = COALESCE(excluded.image_url, listings.image_url),
            bedrooms      = COALESCE(excluded.bedrooms, listings.bedrooms),
            bathrooms     = COALESCE(excluded.bathrooms, listings.bathrooms),
            car_spaces    = COALESCE(excluded.car_spaces, listings.car_spaces),
            address       = COALESCE(excluded.address, listings.address)
        "#,
        params![
            tenant_id,
            &listing.external_id,
            listing.listing_type,
            listing.status,
            &d.headline,
            &d.display_price,
            &d.image_url,
            d.bedrooms,
            d.bathrooms,
            d.car_spaces,
            &d.address,
            now,
        ],
    )
    .map_err(|e| {
        ServerError::Persistence(format!("upsert listing {} failed: {e}", listing.external_id))
    })?;
    Ok(())
}

fn row_to_listing(row: &Row<'_>) -> rusqlite::Result<ListingRecord> {
    Ok(ListingRecord {
        external_id: row.get("external_id")?,
        listing_type: row.get("listing_type")?,
        status: row.get("status")?,
        details: ListingDetails {
            headline: row.get("headline")?,
            display_price: row.get("display_price")?,
            image_url: row.get("image_url")?,
            bedrooms: row.get("bedrooms")?,
            bathrooms: row.get("bathrooms")?,
            car_spaces: row.get("car_spaces")?,
            address: row.get("address")?,
        },
        first_seen_at: row.get("first_seen_at")?,
    })
}

const SELECT_LISTING: &str = r#"
    SELECT external_id, listing_type, status, headline, display_price, image_url,
           bedrooms, bathrooms, car_spaces, address, first_seen_at
    FROM listings
"#;

pub fn get_listing(
    conn: &Connection,
    tenant_id: &TenantId,
    external_id: &str,
) -> Result<Option<ListingRecord>, ServerError> {
    let sql = format!("{SELECT_LISTING} WHERE tenant_id = ?1 AND external_id = ?2");
    Ok(conn
        .query_row(&sql, params![tenant_id, external_id], row_to_listing)
        .optional()?)
}

/// The tenant's listings, optionally narrowed by type and status.
pub fn list_listings(
    conn: &Connection,
    tenant_id: &TenantId,
    filter: &ListingFilter,
) -> Result<Vec<ListingRecord>, ServerError> {
    let sql = format!(
        "{SELECT_LISTING}
         WHERE tenant_id = ?1
           AND (?2 IS NULL OR listing_type = ?2)
           AND (?3 IS NULL OR status = ?3)
         ORDER BY external_id"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(
        params![tenant_id, filter.listing_type, filter.status],
        row_to_listing,
    )?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

pub fn count_listings(conn: &Connection, tenant_id: &TenantId) -> Result<i64, ServerError> {
    Ok(conn.query_row(
        "SELECT COUNT(*) FROM listings WHERE tenant_id = ?1",
        params![tenant_id],
        |r| r.get(0),
    )?)
}
