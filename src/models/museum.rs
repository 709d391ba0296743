//! Museum catalog model

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};

/// Fields an admin may change on an existing museum
pub const EDITABLE_TEXT_FIELDS: [&str; 6] = ["Name", "City", "State", "Type", "Category", "Established"];

/// Museum record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "PascalCase")]
pub struct Museum {
    #[serde(rename = "id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(rename = "Type", default)]
    #[sqlx(rename = "museum_type")]
    pub museum_type: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub category: String,
    /// Year or free text; older records store it as a number
    #[serde(default, deserialize_with = "lenient_text")]
    pub established: String,
    #[serde(default, deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    /// Annual visitor count when known
    #[serde(default, deserialize_with = "lenient_count", skip_serializing_if = "Option::is_none")]
    pub visitors: Option<i64>,
}

impl Museum {
    /// Both coordinates, when present and finite
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) if lat.is_finite() && lon.is_finite() => Some((lat, lon)),
            _ => None,
        }
    }

    /// Apply a validated change set
    pub fn apply(&mut self, update: &MuseumUpdate) {
        if let Some(ref v) = update.name {
            self.name = v.clone();
        }
        if let Some(ref v) = update.city {
            self.city = v.clone();
        }
        if let Some(ref v) = update.state {
            self.state = v.clone();
        }
        if let Some(ref v) = update.museum_type {
            self.museum_type = v.clone();
        }
        if let Some(ref v) = update.category {
            self.category = v.clone();
        }
        if let Some(ref v) = update.established {
            self.established = v.clone();
        }
        if update.latitude.is_some() {
            self.latitude = update.latitude;
        }
        if update.longitude.is_some() {
            self.longitude = update.longitude;
        }
    }
}

/// Create museum request.
///
/// Coordinates and visitor counts are accepted as numbers or numeric strings.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "PascalCase", default)]
pub struct CreateMuseum {
    pub name: String,
    pub city: String,
    pub state: String,
    #[serde(rename = "Type")]
    pub museum_type: String,
    pub category: String,
    #[schema(value_type = Option<String>)]
    pub established: Value,
    #[schema(value_type = Option<f64>)]
    pub latitude: Value,
    #[schema(value_type = Option<f64>)]
    pub longitude: Value,
    #[schema(value_type = Option<i64>)]
    pub visitors: Value,
}

impl CreateMuseum {
    /// Validate and build the record under the given identifier
    pub fn into_museum(self, id: String) -> AppResult<Museum> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::Validation("Name is required".to_string()));
        }
        Ok(Museum {
            id,
            name,
            city: self.city.trim().to_string(),
            state: self.state.trim().to_string(),
            museum_type: self.museum_type.trim().to_string(),
            category: self.category.trim().to_string(),
            established: stringify(&self.established).unwrap_or_default(),
            latitude: parse_number(&self.latitude),
            longitude: parse_number(&self.longitude),
            visitors: parse_number(&self.visitors).map(|v| v as i64),
        })
    }
}

/// Validated change set built from an arbitrary JSON object
#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct MuseumUpdate {
    pub name: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub museum_type: Option<String>,
    pub category: Option<String>,
    pub established: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl MuseumUpdate {
    /// Keep whitelisted keys only; strings are trimmed, numbers and booleans
    /// stringified, anything else dropped.
    pub fn from_json(data: &Map<String, Value>) -> AppResult<Self> {
        let text = |key: &str| data.get(key).and_then(stringify);
        let update = MuseumUpdate {
            name: text(EDITABLE_TEXT_FIELDS[0]),
            city: text(EDITABLE_TEXT_FIELDS[1]),
            state: text(EDITABLE_TEXT_FIELDS[2]),
            museum_type: text(EDITABLE_TEXT_FIELDS[3]),
            category: text(EDITABLE_TEXT_FIELDS[4]),
            established: text(EDITABLE_TEXT_FIELDS[5]),
            latitude: data.get("Latitude").and_then(parse_number),
            longitude: data.get("Longitude").and_then(parse_number),
        };

        if update == MuseumUpdate::default() {
            return Err(AppError::Validation("No valid fields to update".to_string()));
        }
        if matches!(update.name.as_deref(), Some("")) {
            return Err(AppError::Validation("Name cannot be empty".to_string()));
        }
        Ok(update)
    }
}

/// Distinct filter values for the visitor search page
#[derive(Debug, Serialize, ToSchema)]
pub struct MuseumFilters {
    pub cities: Vec<String>,
    pub types: Vec<String>,
}

/// Row of the museum seed CSV
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MuseumSeedRow {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(rename = "Type", default)]
    pub museum_type: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub established: String,
    #[serde(default)]
    pub latitude: String,
    #[serde(default)]
    pub longitude: String,
    #[serde(default)]
    pub visitors: String,
}

impl MuseumSeedRow {
    /// Rows missing any essential column are skipped
    pub fn into_museum(self, id: String) -> Option<Museum> {
        let essential = [&self.name, &self.city, &self.state, &self.museum_type];
        if essential.iter().any(|v| v.trim().is_empty()) {
            return None;
        }
        Some(Museum {
            id,
            name: self.name.trim().to_string(),
            city: self.city.trim().to_string(),
            state: self.state.trim().to_string(),
            museum_type: self.museum_type.trim().to_string(),
            category: self.category.trim().to_string(),
            established: self.established.trim().to_string(),
            latitude: self.latitude.trim().parse().ok(),
            longitude: self.longitude.trim().parse().ok(),
            visitors: self.visitors.trim().parse::<f64>().ok().map(|v| v as i64),
        })
    }
}

fn stringify(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn parse_number(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(stringify(&Value::deserialize(deserializer)?).unwrap_or_default())
}

fn lenient_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    Ok(parse_number(&Value::deserialize(deserializer)?))
}

fn lenient_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    Ok(parse_number(&Value::deserialize(deserializer)?).map(|v| v as i64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_stored_record_accepts_numbers_and_strings() {
        let museum: Museum = serde_json::from_value(json!({
            "id": "keep-1",
            "Name": "Old",
            "City": "Delhi",
            "Established": 1949,
            "Latitude": "28.61",
            "Longitude": 77.2,
            "Visitors": "12000"
        }))
        .unwrap();
        assert_eq!(museum.established, "1949");
        assert_eq!(museum.coordinates(), Some((28.61, 77.2)));
        assert_eq!(museum.visitors, Some(12000));
        assert_eq!(museum.state, "");
    }

    #[test]
    fn test_create_requires_name() {
        let request = CreateMuseum {
            name: "   ".to_string(),
            ..Default::default()
        };
        assert!(matches!(request.into_museum("x".into()), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_create_drops_bad_coordinates() {
        let request: CreateMuseum = serde_json::from_value(json!({
            "Name": "Salar Jung Museum",
            "City": "Hyderabad",
            "Latitude": "17.3713",
            "Longitude": "east-ish",
            "Established": 1951
        }))
        .unwrap();
        let museum = request.into_museum("m1".into()).unwrap();
        assert_eq!(museum.latitude, Some(17.3713));
        assert_eq!(museum.longitude, None);
        assert_eq!(museum.established, "1951");
        assert_eq!(museum.coordinates(), None);
    }

    #[test]
    fn test_update_whitelist() {
        let data = json!({
            "Name": " Indian Museum ",
            "Established": 1814,
            "id": "hijack",
            "Visitors": 10,
            "City": ["not", "a", "string"]
        });
        let update = MuseumUpdate::from_json(data.as_object().unwrap()).unwrap();
        assert_eq!(update.name.as_deref(), Some("Indian Museum"));
        assert_eq!(update.established.as_deref(), Some("1814"));
        assert_eq!(update.city, None);
    }

    #[test]
    fn test_update_rejects_empty() {
        let data = json!({ "id": "x", "Visitors": 3 });
        assert!(MuseumUpdate::from_json(data.as_object().unwrap()).is_err());
        let data = json!({ "Name": "" });
        assert!(MuseumUpdate::from_json(data.as_object().unwrap()).is_err());
    }
}
