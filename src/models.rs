use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::store::Record;

/// Search request. A missing `query` behaves like an empty one.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub query: String,
}

/// One hostel in a search response. Every field is always present; gaps in
/// the stored record are filled with fixed defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostelSummary {
    pub id: String,
    pub name: String,
    pub location: String,
    pub description: String,
    pub facilities: Vec<Value>,
    pub room_types: Vec<Value>,
    pub monthly_rent: Value,
    pub ratings: Value,
    pub contact: Value,
}

pub const DEFAULT_NAME: &str = "Unknown";
pub const DEFAULT_LOCATION: &str = "Not specified";
pub const DEFAULT_DESCRIPTION: &str = "No description available";
pub const DEFAULT_RENT: &str = "Not available";
pub const DEFAULT_RATINGS: &str = "Not rated";
pub const DEFAULT_CONTACT: &str = "Not provided";

impl HostelSummary {
    /// Project a stored record onto the response field set.
    pub fn from_record(record: &Record) -> Self {
        Self {
            id: record.id.clone(),
            name: text_field(record, "name", DEFAULT_NAME),
            location: text_field(record, "location", DEFAULT_LOCATION),
            description: text_field(record, "description", DEFAULT_DESCRIPTION),
            facilities: list_field(record, "facilities"),
            room_types: list_field(record, "room_types"),
            monthly_rent: value_field(record, "monthly_rent", DEFAULT_RENT),
            ratings: value_field(record, "ratings", DEFAULT_RATINGS),
            contact: contact_phone(record),
        }
    }
}

fn text_field(record: &Record, name: &str, default: &str) -> String {
    match record.field(name) {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => default.to_string(),
    }
}

fn list_field(record: &Record, name: &str) -> Vec<Value> {
    match record.field(name) {
        Some(Value::Array(items)) => items.clone(),
        Some(single) => vec![single.clone()],
        None => Vec::new(),
    }
}

fn value_field(record: &Record, name: &str, default: &str) -> Value {
    record
        .field(name)
        .cloned()
        .unwrap_or_else(|| Value::String(default.to_string()))
}

/// Contact is stored as `{"phone": ..., ...}`; only the phone is exposed.
fn contact_phone(record: &Record) -> Value {
    match record.field("contact") {
        Some(Value::Object(contact)) => contact
            .get("phone")
            .filter(|p| !p.is_null())
            .cloned()
            .unwrap_or_else(|| Value::String(DEFAULT_CONTACT.to_string())),
        Some(Value::String(s)) => Value::String(s.clone()),
        _ => Value::String(DEFAULT_CONTACT.to_string()),
    }
}

/// Body returned with 200 when the index has nothing to offer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn no_matches() -> Self {
        Self {
            message: "No matching hostels found".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(fields: Value) -> Record {
        match fields {
            Value::Object(map) => Record::new("65a1f0c2e4b0a1b2c3d4e5f6", map),
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_empty_record_gets_every_default() {
        let summary = HostelSummary::from_record(&record(json!({})));
        assert_eq!(summary.id, "65a1f0c2e4b0a1b2c3d4e5f6");
        assert_eq!(summary.name, DEFAULT_NAME);
        assert_eq!(summary.location, DEFAULT_LOCATION);
        assert_eq!(summary.description, DEFAULT_DESCRIPTION);
        assert!(summary.facilities.is_empty());
        assert!(summary.room_types.is_empty());
        assert_eq!(summary.monthly_rent, DEFAULT_RENT);
        assert_eq!(summary.ratings, DEFAULT_RATINGS);
        assert_eq!(summary.contact, DEFAULT_CONTACT);
    }

    #[test]
    fn test_full_record_passes_through() {
        let summary = HostelSummary::from_record(&record(json!({
            "name": "Station Stay",
            "location": "Pune",
            "description": "Two minutes from the railway station",
            "facilities": ["wifi", "mess"],
            "room_types": ["single", "double"],
            "monthly_rent": 6500,
            "ratings": 4.2,
            "contact": {"phone": "+91 90000 00000", "email": "desk@example.com"},
        })));
        assert_eq!(summary.name, "Station Stay");
        assert_eq!(summary.facilities, vec![json!("wifi"), json!("mess")]);
        assert_eq!(summary.monthly_rent, 6500);
        assert_eq!(summary.ratings, 4.2);
        assert_eq!(summary.contact, "+91 90000 00000");
    }

    #[test]
    fn test_null_fields_count_as_missing() {
        let summary = HostelSummary::from_record(&record(json!({
            "name": null,
            "facilities": null,
            "contact": {"phone": null},
        })));
        assert_eq!(summary.name, DEFAULT_NAME);
        assert!(summary.facilities.is_empty());
        assert_eq!(summary.contact, DEFAULT_CONTACT);
    }

    #[test]
    fn test_contact_without_phone() {
        let summary =
            HostelSummary::from_record(&record(json!({"contact": {"email": "a@b.c"}})));
        assert_eq!(summary.contact, DEFAULT_CONTACT);
    }

    #[test]
    fn test_scalar_facility_becomes_list() {
        let summary = HostelSummary::from_record(&record(json!({"facilities": "wifi"})));
        assert_eq!(summary.facilities, vec![json!("wifi")]);
    }

    #[test]
    fn test_serialized_summary_has_all_nine_fields() {
        let summary = HostelSummary::from_record(&record(json!({})));
        let json = serde_json::to_value(&summary).unwrap();
        let obj = json.as_object().unwrap();
        for key in [
            "id",
            "name",
            "location",
            "description",
            "facilities",
            "room_types",
            "monthly_rent",
            "ratings",
            "contact",
        ] {
            assert!(obj.contains_key(key), "missing {key}");
        }
        assert_eq!(obj.len(), 9);
    }

    #[test]
    fn test_missing_query_deserializes_empty() {
        let req: SearchRequest = serde_json::from_str("{}").unwrap();
        assert!(req.query.is_empty());
    }
}
