use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

/// Charge line item on a booking
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Charge {
    #[serde(default)]
    pub amount: f64,
    /// Charge kind as reported upstream ("rent", "tax", "fee", ...)
    #[serde(rename = "type", default)]
    pub kind: String,
}

/// Reservation record as consumed from the booking API.
///
/// Dates stay as upstream strings and are read leniently: a missing, null or
/// non-string date becomes `None`, and the aggregator skips that booking
/// instead of the whole page failing to decode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: i64,
    #[serde(default)]
    pub property_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub arrival: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub departure: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub charges: Vec<Charge>,
    #[serde(default)]
    pub listing_site: Option<String>,
    #[serde(default)]
    pub total_amount: Option<f64>,
}

impl Booking {
    pub fn arrival_date(&self) -> Option<NaiveDate> {
        self.arrival.as_deref().and_then(parse_calendar_date)
    }

    pub fn departure_date(&self) -> Option<NaiveDate> {
        self.departure.as_deref().and_then(parse_calendar_date)
    }

    /// Sum of all charges tagged "rent"
    pub fn rent(&self) -> f64 {
        self.charges
            .iter()
            .filter(|c| c.kind.eq_ignore_ascii_case("rent"))
            .map(|c| c.amount)
            .sum()
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| v.as_str().map(str::to_string)))
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Parse an upstream date or date-time down to its calendar date.
///
/// Accepts `YYYY-MM-DD`, `YYYY-MM-DDTHH:MM:SS` and RFC 3339.
pub fn parse_calendar_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Some(dt.date());
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc).date_naive())
}

/// Postal address of a rental property
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Address {
    #[serde(default)]
    pub street1: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

/// Core property data model
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Property {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub address: Address,
    #[serde(default)]
    pub bedrooms: Option<u32>,
    #[serde(default)]
    pub bathrooms: Option<f32>,
    #[serde(default)]
    pub max_guests: Option<u32>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub thumbnail_url_medium: Option<String>,
    #[serde(default)]
    pub thumbnail_url_large: Option<String>,
    #[serde(default)]
    pub active: Option<bool>,
}

impl Property {
    pub fn has_thumbnail(&self) -> bool {
        self.thumbnail_url
            .as_deref()
            .map(|url| !url.trim().is_empty())
            .unwrap_or(false)
    }
}

/// Properties keyed by identifier, stamped with the capture time
#[derive(Debug, Clone)]
pub struct PropertySnapshot {
    pub properties: HashMap<i64, Property>,
    pub captured_at: DateTime<Utc>,
}

impl PropertySnapshot {
    pub fn new(properties: Vec<Property>, captured_at: DateTime<Utc>) -> Self {
        Self {
            properties: properties.into_iter().map(|p| (p.id, p)).collect(),
            captured_at,
        }
    }

    /// Properties ordered by identifier
    pub fn sorted(&self) -> Vec<Property> {
        let mut list: Vec<Property> = self.properties.values().cloned().collect();
        list.sort_by_key(|p| p.id);
        list
    }
}

/// Booking activity for one calendar month
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyMetrics {
    /// `YYYY-MM`
    pub month: String,
    pub bookings_count: u32,
    /// Prorated rent; `None` once redacted for an unprivileged caller
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revenue: Option<f64>,
    pub occupancy: f64,
    pub nights: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_calendar_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(parse_calendar_date("2024-03-09"), Some(expected));
        assert_eq!(parse_calendar_date("2024-03-09T16:00:00"), Some(expected));
        assert_eq!(parse_calendar_date("2024-03-09T16:00:00Z"), Some(expected));
        assert_eq!(parse_calendar_date("not a date"), None);
    }

    #[test]
    fn test_booking_deserializes_upstream_shape() {
        let json = r#"{
            "id": 42,
            "property_id": 7,
            "arrival": "2024-03-01",
            "departure": "2024-03-06",
            "listing_site": "Airbnb",
            "charges": [
                {"amount": 400.0, "type": "rent"},
                {"amount": 100.0, "type": "rent"},
                {"amount": 35.5, "type": "tax"}
            ]
        }"#;
        let booking: Booking = serde_json::from_str(json).unwrap();
        assert_eq!(booking.id, 42);
        assert_eq!(booking.rent(), 500.0);
        assert_eq!(booking.listing_site.as_deref(), Some("Airbnb"));
        assert!(booking.total_amount.is_none());
    }

    #[test]
    fn test_page_with_null_dates_still_decodes() {
        let json = r#"{
            "items": [
                {"id": 1, "arrival": "2024-03-01", "departure": "2024-03-04",
                 "charges": [{"amount": 300.0, "type": "rent"}]},
                {"id": 2, "arrival": null, "departure": "2024-03-06", "charges": null},
                {"id": 3, "departure": 20240310}
            ],
            "count": 3
        }"#;
        let page: crate::sources::types::Page<Booking> = serde_json::from_str(json).unwrap();
        let items = page.items.unwrap();

        assert_eq!(items.len(), 3);
        assert!(items[0].arrival_date().is_some());
        assert!(items[1].arrival_date().is_none());
        assert!(items[1].charges.is_empty());
        assert!(items[2].arrival.is_none());
        assert!(items[2].departure.is_none());
    }

    #[test]
    fn test_rent_without_charges_is_zero() {
        let booking: Booking =
            serde_json::from_str(r#"{"id": 1, "arrival": "2024-01-01", "departure": "2024-01-02"}"#)
                .unwrap();
        assert_eq!(booking.rent(), 0.0);
    }

    #[test]
    fn test_has_thumbnail_ignores_blank() {
        let mut property = Property {
            id: 1,
            ..Default::default()
        };
        assert!(!property.has_thumbnail());
        property.thumbnail_url = Some("  ".to_string());
        assert!(!property.has_thumbnail());
        property.thumbnail_url = Some("https://img.example/1.jpg".to_string());
        assert!(property.has_thumbnail());
    }
}
