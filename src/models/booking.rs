//! Booking (ticket) model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::error::AppError;

/// Column order of the ledger file
pub const LEDGER_HEADER: [&str; 16] = [
    "TicketID",
    "Museum",
    "Date",
    "Time",
    "People",
    "TourType",
    "VisitorName",
    "VisitorEmail",
    "VisitorPhone",
    "VisitorAge",
    "SpecialRequests",
    "EmergencyContact",
    "MuseumType",
    "Attended",
    "Rating",
    "Review",
];

/// Attendance status of a ticket.
///
/// Stored as `No`, `Yes` and `Cancelled` in the ledger. A blank cell reads
/// as `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub enum AttendanceStatus {
    #[serde(rename = "No")]
    Pending,
    #[serde(rename = "Yes")]
    Attended,
    #[serde(rename = "Cancelled")]
    Cancelled,
}

impl AttendanceStatus {
    /// Ledger representation
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Pending => "No",
            AttendanceStatus::Attended => "Yes",
            AttendanceStatus::Cancelled => "Cancelled",
        }
    }
}

impl std::fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for AttendanceStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" | "no" => Ok(AttendanceStatus::Pending),
            "attended" | "yes" => Ok(AttendanceStatus::Attended),
            "cancelled" => Ok(AttendanceStatus::Cancelled),
            other => Err(AppError::Validation(format!(
                "Invalid status '{}': expected Pending, Attended or Cancelled",
                other
            ))),
        }
    }
}

impl<'de> Deserialize<'de> for AttendanceStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
        if raw.trim().is_empty() {
            return Ok(AttendanceStatus::Pending);
        }
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// One ledger row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Booking {
    #[serde(rename = "TicketID")]
    pub ticket_id: String,
    #[serde(rename = "Museum")]
    pub museum: String,
    #[serde(rename = "Date")]
    pub date: String,
    #[serde(rename = "Time")]
    pub time: String,
    #[serde(rename = "People")]
    pub people: String,
    #[serde(rename = "TourType")]
    pub tour_type: String,
    #[serde(rename = "VisitorName")]
    pub visitor_name: String,
    #[serde(rename = "VisitorEmail")]
    pub visitor_email: String,
    #[serde(rename = "VisitorPhone")]
    pub visitor_phone: String,
    #[serde(rename = "VisitorAge")]
    pub visitor_age: String,
    #[serde(rename = "SpecialRequests")]
    pub special_requests: String,
    #[serde(rename = "EmergencyContact")]
    pub emergency_contact: String,
    #[serde(rename = "MuseumType")]
    pub museum_type: String,
    #[serde(rename = "Attended")]
    pub attended: AttendanceStatus,
    /// Empty until reviewed
    #[serde(rename = "Rating", with = "blank_rating")]
    #[schema(value_type = Option<i16>)]
    pub rating: Option<i16>,
    #[serde(rename = "Review", with = "blank_text")]
    #[schema(value_type = Option<String>)]
    pub review: Option<String>,
}

impl Booking {
    /// Build a fresh `Pending` booking for the given ticket
    pub fn new(ticket_id: String, request: NewBooking) -> Self {
        Self {
            ticket_id,
            museum: request.museum,
            date: request.date,
            time: request.time,
            people: request.people,
            tour_type: request.tour_type,
            visitor_name: request.visitor_name,
            visitor_email: request.visitor_email,
            visitor_phone: request.visitor_phone,
            visitor_age: request.visitor_age,
            special_requests: request.special_requests,
            emergency_contact: request.emergency_contact,
            museum_type: request.museum_type,
            attended: AttendanceStatus::Pending,
            rating: None,
            review: None,
        }
    }

    /// Text encoded in the ticket QR code
    pub fn qr_payload(&self) -> String {
        format!(
            "Ticket ID: {}\nMuseum: {}\nDate: {}\nTime: {}\nPeople: {}\nTour Type: {}\nVisitor: {}\nContact: {}",
            self.ticket_id,
            self.museum,
            self.date,
            self.time,
            self.people,
            self.tour_type,
            self.visitor_name,
            self.visitor_email
        )
    }
}

/// Fields supplied by the visitor when booking
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct NewBooking {
    pub date: String,
    pub time: String,
    #[serde(deserialize_with = "text_or_number")]
    #[schema(value_type = String)]
    pub people: String,
    pub museum: String,
    pub tour_type: String,
    pub visitor_name: String,
    pub visitor_email: String,
    pub visitor_phone: String,
    #[serde(deserialize_with = "text_or_number")]
    #[schema(value_type = String)]
    pub visitor_age: String,
    pub special_requests: String,
    pub emergency_contact: String,
    /// Museum type copied from the catalog by the client
    #[serde(rename = "type")]
    pub museum_type: String,
}

/// Internal row structure for the mirror table
#[derive(Debug, Clone, FromRow)]
pub struct BookingRow {
    ticket_id: String,
    museum: String,
    visit_date: String,
    visit_time: String,
    people: String,
    tour_type: String,
    visitor_name: String,
    visitor_email: String,
    visitor_phone: String,
    visitor_age: String,
    special_requests: String,
    emergency_contact: String,
    museum_type: String,
    attended: String,
    rating: Option<i16>,
    review: Option<String>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = AppError;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        Ok(Booking {
            ticket_id: row.ticket_id,
            museum: row.museum,
            date: row.visit_date,
            time: row.visit_time,
            people: row.people,
            tour_type: row.tour_type,
            visitor_name: row.visitor_name,
            visitor_email: row.visitor_email,
            visitor_phone: row.visitor_phone,
            visitor_age: row.visitor_age,
            special_requests: row.special_requests,
            emergency_contact: row.emergency_contact,
            museum_type: row.museum_type,
            attended: row.attended.parse()?,
            rating: row.rating,
            review: row.review.filter(|r| !r.is_empty()),
        })
    }
}

/// Denormalized review record kept for reporting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct RatingRecord {
    #[serde(rename = "TicketID")]
    pub ticket_id: String,
    #[serde(rename = "Museum")]
    pub museum: String,
    #[serde(rename = "MuseumType")]
    pub museum_type: String,
    #[serde(rename = "Date")]
    #[sqlx(rename = "visit_date")]
    pub date: String,
    #[serde(rename = "Time")]
    #[sqlx(rename = "visit_time")]
    pub time: String,
    #[serde(rename = "VisitorName")]
    pub visitor_name: String,
    #[serde(rename = "VisitorEmail")]
    pub visitor_email: String,
    #[serde(rename = "VisitorPhone")]
    pub visitor_phone: String,
    #[serde(rename = "Rating")]
    pub rating: i16,
    #[serde(rename = "Review")]
    pub review: String,
    pub created_at: DateTime<Utc>,
}

impl RatingRecord {
    /// Snapshot the booking fields at review time
    pub fn from_booking(booking: &Booking, rating: i16, review: &str) -> Self {
        Self {
            ticket_id: booking.ticket_id.clone(),
            museum: booking.museum.clone(),
            museum_type: booking.museum_type.clone(),
            date: booking.date.clone(),
            time: booking.time.clone(),
            visitor_name: booking.visitor_name.clone(),
            visitor_email: booking.visitor_email.clone(),
            visitor_phone: booking.visitor_phone.clone(),
            rating,
            review: review.to_string(),
            created_at: Utc::now(),
        }
    }
}

/// Accept a JSON string or number and keep it as text
fn text_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    })
}

/// Empty field <-> `None` for the rating column.
///
/// Ratings arrive as numbers from JSON and as text from the ledger.
mod blank_rating {
    use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<i16>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(v) => v.serialize(serializer),
            None => serializer.serialize_str(""),
        }
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(i64),
        Float(f64),
        Text(String),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i16>, D::Error> {
        let raw = Option::<Raw>::deserialize(deserializer)?;
        match raw {
            None => Ok(None),
            Some(Raw::Int(v)) => i16::try_from(v).map(Some).map_err(de::Error::custom),
            Some(Raw::Float(v)) => Ok(Some(v.round() as i16)),
            Some(Raw::Text(s)) => {
                let s = s.trim();
                if s.is_empty() {
                    return Ok(None);
                }
                // older ledgers store ratings as floats ("4.0")
                s.parse::<f64>()
                    .map(|v| v.is_finite().then(|| v.round() as i16))
                    .map_err(de::Error::custom)
            }
        }
    }
}

mod blank_text {
    use super::*;

    pub fn serialize<S: Serializer>(value: &Option<String>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(value.as_deref().unwrap_or(""))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.filter(|s| !s.is_empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parsing() {
        assert_eq!("Pending".parse::<AttendanceStatus>().unwrap(), AttendanceStatus::Pending);
        assert_eq!("attended".parse::<AttendanceStatus>().unwrap(), AttendanceStatus::Attended);
        assert_eq!("Yes".parse::<AttendanceStatus>().unwrap(), AttendanceStatus::Attended);
        assert_eq!("Cancelled".parse::<AttendanceStatus>().unwrap(), AttendanceStatus::Cancelled);
        assert!("Refunded".parse::<AttendanceStatus>().is_err());
    }

    #[test]
    fn test_blank_attended_cell_reads_as_pending() {
        let data = format!(
            "{}\nold00001,Indian Museum,2024-01-05,10:00,2,guided,Asha,,,,,,History,,nan,\n",
            LEDGER_HEADER.join(",")
        );
        let mut reader = csv::Reader::from_reader(data.as_bytes());
        let rows: Vec<Booking> = reader.deserialize().collect::<Result<_, _>>().unwrap();
        assert_eq!(rows[0].attended, AttendanceStatus::Pending);
        assert_eq!(rows[0].rating, None);
    }

    #[test]
    fn test_json_blanks() {
        let booking = Booking::new("abcd1234".into(), NewBooking::default());
        let json = serde_json::to_value(&booking).unwrap();
        assert_eq!(json["Rating"], "");
        assert_eq!(json["Review"], "");
        assert_eq!(json["Attended"], "No");
    }

    #[test]
    fn test_new_booking_accepts_numbers() {
        let request: NewBooking = serde_json::from_value(serde_json::json!({
            "museum": "National Museum",
            "people": 3,
            "visitorAge": "41",
            "type": "History"
        }))
        .unwrap();
        assert_eq!(request.people, "3");
        assert_eq!(request.visitor_age, "41");
        assert_eq!(request.museum_type, "History");
    }
}
