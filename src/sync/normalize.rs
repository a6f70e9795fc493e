use crate::domain::{Endpoint, ListingDetails, NormalizedListing};
use crate::errors::ServerError;
use crate::upstream::models::UpstreamListing;
use serde_json::Value;

/// The upstream returns a bare JSON array of listings.
pub fn listing_items(body: &str) -> Result<Vec<Value>, ServerError> {
    let body: Value = serde_json::from_str(body)
        .map_err(|e| ServerError::MalformedPayload(format!("response is not JSON: {e}")))?;
    match body {
        Value::Array(items) => Ok(items),
        other => Err(ServerError::MalformedPayload(format!(
            "expected a JSON array of listings, got {}",
            json_kind(&other)
        ))),
    }
}

/// Map one upstream listing onto the local record shape.
///
/// Type and status come from the endpoint the listing was fetched from,
/// never from the payload.
pub fn normalize_listing(
    raw: &Value,
    endpoint: &Endpoint,
) -> Result<NormalizedListing, ServerError> {
    if !raw.is_object() {
        return Err(ServerError::MalformedPayload(format!(
            "listing is a JSON {}, not an object",
            json_kind(raw)
        )));
    }

    let parsed: UpstreamListing = serde_json::from_value(raw.clone())
        .map_err(|e| ServerError::MalformedPayload(e.to_string()))?;

    let external_id = parsed
        .id
        .clone()
        .ok_or_else(|| ServerError::MalformedPayload("listing has no usable id".into()))?;

    Ok(NormalizedListing {
        external_id,
        listing_type: endpoint.listing_type,
        status: endpoint.status,
        details: ListingDetails {
            headline: parsed.headline.clone(),
            display_price: parsed.display_price(),
            image_url: parsed.first_image_url(),
            bedrooms: parsed.bedrooms,
            bathrooms: parsed.bathrooms,
            car_spaces: parsed.car_spaces,
            address: parsed.formatted_address(),
        },
    })
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ListingStatus, ListingType};
    use serde_json::json;

    fn sold() -> Endpoint {
        Endpoint {
            url: "https://x/sold".into(),
            listing_type: ListingType::ForSale,
            status: ListingStatus::Sold,
        }
    }

    #[test]
    fn full_payload_is_enriched() {
        let raw = json!({
            "id": 42,
            "headline": "Unit 1",
            "price": {"display": "$575,000"},
            "images": [{"url": "https://img/a.jpg"}],
            "bedrooms": 4, "bathrooms": 2, "carSpaces": 2,
            "address": {
                "streetNumber": "6",
                "street": "Speculation Road",
                "suburb": "Weir Views",
                "state": "Vic"
            }
        });
        let listing = normalize_listing(&raw, &sold()).unwrap();

        assert_eq!(listing.external_id, "42");
        assert_eq!(listing.listing_type, ListingType::ForSale);
        assert_eq!(listing.status, ListingStatus::Sold);
        assert_eq!(listing.details.headline.as_deref(), Some("Unit 1"));
        assert_eq!(listing.details.display_price.as_deref(), Some("$575,000"));
        assert_eq!(listing.details.car_spaces, Some(2));
        assert_eq!(
            listing.details.address.as_deref(),
            Some("6 Speculation Road, Weir Views Vic")
        );
    }

    #[test]
    fn id_only_payload_leaves_details_empty() {
        let listing = normalize_listing(&json!({"id": "abc"}), &sold()).unwrap();
        assert_eq!(listing.details, ListingDetails::default());
    }

    #[test]
    fn missing_or_blank_id_is_malformed() {
        for raw in [json!({"headline": "x"}), json!({"id": ""}), json!({"id": null}), json!("42")] {
            assert!(matches!(
                normalize_listing(&raw, &sold()),
                Err(ServerError::MalformedPayload(_))
            ));
        }
    }

    #[test]
    fn non_array_body_is_malformed() {
        assert!(listing_items(r#"{"items": []}"#).is_err());
        assert!(listing_items("not json").is_err());
        assert_eq!(listing_items("[1, 2]").unwrap().len(), 2);
    }
}
