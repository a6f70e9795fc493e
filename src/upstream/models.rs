use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

// listing
//  ├── id                (string or number)
//  ├── headline
//  ├── price
//  │    └── display
//  ├── images[]
//  │    └── url
//  ├── bedrooms
//  ├── bathrooms
//  ├── carSpaces
//  └── address
//       ├── streetNumber
//       ├── street
//       ├── suburb
//       └── state

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpstreamListing {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub headline: Option<String>,
    #[serde(default, deserialize_with = "lenient_nested")]
    pub price: Option<Price>,
    #[serde(default, deserialize_with = "lenient_nested")]
    pub images: Option<Vec<Image>>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub bedrooms: Option<i64>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub bathrooms: Option<i64>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub car_spaces: Option<i64>,
    #[serde(default, deserialize_with = "lenient_nested")]
    pub address: Option<Address>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Price {
    #[serde(default, deserialize_with = "lenient_string")]
    pub display: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Image {
    #[serde(default, deserialize_with = "lenient_string")]
    pub url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(default, deserialize_with = "lenient_string")]
    pub street_number: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub street: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub suburb: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub state: Option<String>,
}

/// Strings pass through trimmed, numbers become their decimal text,
/// anything else (null, blank, objects) is treated as absent.
fn lenient_string<'de, D>(de: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Option::<Value>::deserialize(de)?;
    Ok(match v {
        Some(Value::String(s)) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Some(Value::Number(n)) => Some(number_text(&n)),
        _ => None,
    })
}

/// Integers keep their digits; floats drop a zero fraction, so `42.0` and
/// `42` name the same listing.
fn number_text(n: &serde_json::Number) -> String {
    if n.is_f64() {
        if let Some(f) = n.as_f64() {
            return f.to_string();
        }
    }
    n.to_string()
}

/// Nested objects of the wrong shape are dropped rather than failing the listing.
fn lenient_nested<'de, D, T>(de: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let v = Option::<Value>::deserialize(de)?;
    Ok(v.and_then(|v| serde_json::from_value(v).ok()))
}

/// Integer counts; floats are truncated and numeric strings parsed.
fn lenient_count<'de, D>(de: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Option::<Value>::deserialize(de)?;
    Ok(match v {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Some(Value::String(s)) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| {
                s.parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite())
                    .map(|f| f.trunc() as i64)
            })
        }
        _ => None,
    })
}

impl UpstreamListing {
    pub fn display_price(&self) -> Option<String> {
        self.price.as_ref().and_then(|p| p.display.clone())
    }

    pub fn first_image_url(&self) -> Option<String> {
        self.images
            .as_ref()
            .and_then(|imgs| imgs.iter().find_map(|i| i.url.clone()))
    }

    /// "12 Smith St, Richmond VIC", skipping whatever parts are missing.
    pub fn formatted_address(&self) -> Option<String> {
        let a = self.address.as_ref()?;

        let street_line = join_present(&[a.street_number.as_deref(), a.street.as_deref()], " ");
        let locality = join_present(&[a.suburb.as_deref(), a.state.as_deref()], " ");
        join_present(&[street_line.as_deref(), locality.as_deref()], ", ")
    }
}

fn join_present(parts: &[Option<&str>], sep: &str) -> Option<String> {
    let present: Vec<&str> = parts.iter().flatten().copied().collect();
    if present.is_empty() {
        None
    } else {
        Some(present.join(sep))
    }
}
