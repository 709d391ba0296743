//! Booking service: authoritative ledger plus best-effort mirror

use std::sync::Arc;

use serde_json::Value;
use uuid::Uuid;

use super::tickets::TicketService;
use crate::{
    error::{AppError, AppResult},
    ledger::Ledger,
    models::{AttendanceStatus, Booking, Listing, NewBooking, Pagination, RatingRecord},
    repository::BookingMirror,
};

/// Result of a successful booking
#[derive(Debug, Clone)]
pub struct BookingReceipt {
    pub booking: Booking,
    /// `None` when the QR image could not be written
    pub qr_url: Option<String>,
}

#[derive(Clone)]
pub struct BookingsService {
    ledger: Ledger,
    mirror: Arc<dyn BookingMirror>,
    tickets: TicketService,
}

impl BookingsService {
    pub fn new(ledger: Ledger, mirror: Arc<dyn BookingMirror>, tickets: TicketService) -> Self {
        Self { ledger, mirror, tickets }
    }

    /// Book a visit.
    ///
    /// The ledger row is written first; mirror and QR failures are logged only.
    pub async fn create(&self, request: NewBooking) -> AppResult<BookingReceipt> {
        for (field, value) in [("museum", &request.museum), ("date", &request.date), ("time", &request.time)] {
            if value.trim().is_empty() {
                return Err(AppError::Validation(format!("Field '{}' is required", field)));
            }
        }

        let booking = self.ledger.insert(request, generate_ticket_id).await?;
        tracing::info!(ticket_id = %booking.ticket_id, museum = %booking.museum, "Booking recorded");

        if let Err(e) = self.mirror.insert_booking(&booking).await {
            tracing::warn!("Failed to mirror booking {}: {}", booking.ticket_id, e);
        }

        let qr_url = match self.tickets.write_qr(&booking).await {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::warn!("Failed to write QR code for {}: {}", booking.ticket_id, e);
                None
            }
        };

        Ok(BookingReceipt { booking, qr_url })
    }

    /// Mark the bookings of a slot as attended, or only `ticket_id` within it.
    ///
    /// Returns the number of ledger rows touched; zero means nothing matched.
    pub async fn mark_attended(&self, date: &str, time: &str, ticket_id: Option<String>) -> AppResult<usize> {
        let date = date.trim().to_string();
        let time = time.trim().to_string();
        if date.is_empty() || time.is_empty() {
            return Err(AppError::Validation("Date and time are required".to_string()));
        }
        let ticket_id = ticket_id.map(|t| t.trim().to_string()).filter(|t| !t.is_empty());

        let (d, t, id) = (date.clone(), time.clone(), ticket_id.clone());
        let changed = self
            .ledger
            .update(move |b| {
                let matches = b.date == d && b.time == t && id.as_ref().map_or(true, |id| &b.ticket_id == id);
                if matches {
                    b.attended = AttendanceStatus::Attended;
                }
                matches
            })
            .await?;

        if changed.len() > 1 {
            tracing::warn!(
                "Marked {} bookings attended for slot {} {}; pass a ticket_id to target one",
                changed.len(),
                date,
                time
            );
        }

        if !changed.is_empty() {
            if let Err(e) = self.mirror.mark_attended(&date, &time, ticket_id).await {
                tracing::warn!("Failed to mirror attendance for {} {}: {}", date, time, e);
            }
        }

        Ok(changed.len())
    }

    pub async fn cancel(&self, ticket_id: &str) -> AppResult<Booking> {
        self.apply_status(ticket_id, AttendanceStatus::Cancelled).await
    }

    /// Admin status change; only `Pending`, `Attended` or `Cancelled`
    pub async fn set_status(&self, ticket_id: &str, status: &str) -> AppResult<Booking> {
        let status: AttendanceStatus = status.parse()?;
        self.apply_status(ticket_id, status).await
    }

    async fn apply_status(&self, ticket_id: &str, status: AttendanceStatus) -> AppResult<Booking> {
        let ticket_id = required_ticket(ticket_id)?;

        let target = ticket_id.clone();
        let changed = self
            .ledger
            .update(move |b| {
                if b.ticket_id == target {
                    b.attended = status;
                    true
                } else {
                    false
                }
            })
            .await?;

        let booking = changed
            .into_iter()
            .next()
            .ok_or_else(|| AppError::NotFound(format!("Booking {} not found", ticket_id)))?;

        if let Err(e) = self.mirror.set_status(&ticket_id, status).await {
            tracing::warn!("Failed to mirror status of {}: {}", ticket_id, e);
        }
        Ok(booking)
    }

    /// Attach (or overwrite) a rating and review, and append one rating record
    pub async fn submit_review(&self, ticket_id: &str, rating: i16, review: &str) -> AppResult<Booking> {
        let ticket_id = required_ticket(ticket_id)?;
        if !(1..=5).contains(&rating) {
            return Err(AppError::Validation("Rating must be between 1 and 5".to_string()));
        }
        let review = review.trim().to_string();

        let (target, text) = (ticket_id.clone(), review.clone());
        let changed = self
            .ledger
            .update(move |b| {
                if b.ticket_id == target {
                    b.rating = Some(rating);
                    b.review = Some(text.clone()).filter(|r| !r.is_empty());
                    true
                } else {
                    false
                }
            })
            .await?;

        let booking = changed
            .into_iter()
            .next()
            .ok_or_else(|| AppError::NotFound(format!("Booking {} not found", ticket_id)))?;

        if let Err(e) = self.mirror.set_review(&ticket_id, rating, &review).await {
            tracing::warn!("Failed to mirror review of {}: {}", ticket_id, e);
        }
        let record = RatingRecord::from_booking(&booking, rating, &review);
        if let Err(e) = self.mirror.insert_rating(&record).await {
            tracing::warn!("Failed to store rating record for {}: {}", ticket_id, e);
        }

        Ok(booking)
    }

    /// All bookings, from the mirror when it answers with data, else the ledger
    pub async fn list_all(&self) -> AppResult<Vec<Booking>> {
        match self.mirror.list_bookings().await {
            Ok(rows) if !rows.is_empty() => return Ok(rows),
            Ok(_) => {}
            Err(e) => tracing::warn!("Mirror unavailable for booking history, reading ledger: {}", e),
        }
        self.ledger.read_all().await
    }

    pub async fn list(&self, pagination: Option<Pagination>) -> AppResult<Listing<Booking>> {
        Ok(Listing::paginate(self.list_all().await?, pagination))
    }

    /// Ledger rows only, for analytics and history-based recommendations
    pub async fn ledger_rows(&self) -> AppResult<Vec<Booking>> {
        self.ledger.read_all().await
    }

    /// Rating records, newest first
    pub async fn list_ratings(&self, pagination: Option<Pagination>) -> AppResult<Listing<RatingRecord>> {
        Ok(Listing::paginate(self.mirror.list_ratings().await?, pagination))
    }
}

/// 8 hex characters from a random UUID
fn generate_ticket_id() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

fn required_ticket(ticket_id: &str) -> AppResult<String> {
    let ticket_id = ticket_id.trim();
    if ticket_id.is_empty() {
        return Err(AppError::Validation("Ticket ID is required".to_string()));
    }
    Ok(ticket_id.to_string())
}

/// Accept a rating sent as a number or numeric string
pub fn parse_rating(value: &Value) -> AppResult<i16> {
    let parsed = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    parsed
        .and_then(|v| i16::try_from(v).ok())
        .ok_or_else(|| AppError::Validation("Rating must be a whole number between 1 and 5".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MockBookingMirror;
    use serde_json::json;
    use std::collections::HashSet;

    fn temp_dir() -> std::path::PathBuf {
        std::env::temp_dir().join(format!("pixelpast-bookings-{}", Uuid::new_v4()))
    }

    async fn service(mirror: MockBookingMirror) -> BookingsService {
        let dir = temp_dir();
        let ledger = Ledger::open(dir.join("bookings.csv")).await.unwrap();
        BookingsService::new(ledger, Arc::new(mirror), TicketService::new(dir.join("qrcodes")))
    }

    fn request(date: &str, time: &str) -> NewBooking {
        NewBooking {
            museum: "Indian Museum".to_string(),
            museum_type: "History".to_string(),
            date: date.to_string(),
            time: time.to_string(),
            visitor_name: "Ravi".to_string(),
            ..Default::default()
        }
    }

    fn lenient_mirror() -> MockBookingMirror {
        let mut mirror = MockBookingMirror::new();
        mirror.expect_insert_booking().returning(|_| Ok(()));
        mirror.expect_mark_attended().returning(|_, _, _| Ok(1));
        mirror.expect_set_status().returning(|_, _| Ok(1));
        mirror
    }

    #[tokio::test]
    async fn test_create_survives_mirror_failure() {
        let mut mirror = MockBookingMirror::new();
        mirror
            .expect_insert_booking()
            .times(1)
            .returning(|_| Err(AppError::StoreUnavailable("down".into())));
        let service = service(mirror).await;

        let receipt = service.create(request("2025-03-01", "10:00")).await.unwrap();
        assert_eq!(receipt.booking.ticket_id.len(), 8);
        assert!(receipt.qr_url.is_some());

        let rows = service.ledger_rows().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].attended, AttendanceStatus::Pending);
    }

    #[tokio::test]
    async fn test_create_requires_slot_and_museum() {
        let mut mirror = MockBookingMirror::new();
        mirror.expect_insert_booking().never();
        let service = service(mirror).await;

        let result = service.create(request("", "10:00")).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
        assert!(service.ledger_rows().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_ticket_ids_are_unique() {
        let service = service(lenient_mirror()).await;
        let mut ids = HashSet::new();
        for _ in 0..20 {
            let receipt = service.create(request("2025-03-01", "10:00")).await.unwrap();
            assert!(ids.insert(receipt.booking.ticket_id));
        }
        assert_eq!(service.ledger_rows().await.unwrap().len(), 20);
    }

    #[tokio::test]
    async fn test_cancel_unknown_ticket_leaves_ledger_unchanged() {
        let service = service(lenient_mirror()).await;
        service.create(request("2025-03-01", "10:00")).await.unwrap();

        let result = service.cancel("nope0000").await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
        let rows = service.ledger_rows().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].attended, AttendanceStatus::Pending);

        assert!(matches!(service.cancel("  ").await, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_cancel_known_ticket() {
        let service = service(lenient_mirror()).await;
        let receipt = service.create(request("2025-03-01", "10:00")).await.unwrap();
        let cancelled = service.cancel(&receipt.booking.ticket_id).await.unwrap();
        assert_eq!(cancelled.attended, AttendanceStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_set_status_rejects_unknown_values() {
        let service = service(lenient_mirror()).await;
        let receipt = service.create(request("2025-03-01", "10:00")).await.unwrap();
        let id = receipt.booking.ticket_id;

        assert!(matches!(service.set_status(&id, "Refunded").await, Err(AppError::Validation(_))));
        let updated = service.set_status(&id, "Attended").await.unwrap();
        assert_eq!(updated.attended, AttendanceStatus::Attended);
    }

    #[tokio::test]
    async fn test_mark_attended_by_slot_and_ticket() {
        let service = service(lenient_mirror()).await;
        let a = service.create(request("2025-03-01", "10:00")).await.unwrap();
        service.create(request("2025-03-01", "10:00")).await.unwrap();
        service.create(request("2025-03-02", "10:00")).await.unwrap();

        let one = service
            .mark_attended("2025-03-01", "10:00", Some(a.booking.ticket_id.clone()))
            .await
            .unwrap();
        assert_eq!(one, 1);

        let slot = service.mark_attended("2025-03-01", "10:00", None).await.unwrap();
        assert_eq!(slot, 2);

        let none = service.mark_attended("2030-01-01", "09:00", None).await.unwrap();
        assert_eq!(none, 0);

        let rows = service.ledger_rows().await.unwrap();
        let attended = rows.iter().filter(|b| b.attended == AttendanceStatus::Attended).count();
        assert_eq!(attended, 2);
    }

    #[tokio::test]
    async fn test_review_overwrites_and_records_once_per_submission() {
        let mut mirror = lenient_mirror();
        mirror.expect_set_review().times(2).returning(|_, _, _| Ok(1));
        mirror
            .expect_insert_rating()
            .times(2)
            .withf(|record| record.museum == "Indian Museum" && record.museum_type == "History")
            .returning(|_| Ok(()));
        let service = service(mirror).await;

        let receipt = service.create(request("2025-03-01", "10:00")).await.unwrap();
        let id = receipt.booking.ticket_id;

        service.submit_review(&id, 4, "Great guide").await.unwrap();
        let second = service.submit_review(&id, 2, "Too crowded").await.unwrap();
        assert_eq!(second.rating, Some(2));

        let rows = service.ledger_rows().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].rating, Some(2));
        assert_eq!(rows[0].review.as_deref(), Some("Too crowded"));
    }

    #[tokio::test]
    async fn test_review_validation() {
        let service = service(lenient_mirror()).await;
        assert!(matches!(service.submit_review("x", 6, "").await, Err(AppError::Validation(_))));
        assert!(matches!(service.submit_review("", 3, "").await, Err(AppError::Validation(_))));
        assert!(matches!(service.submit_review("missing1", 3, "").await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_list_falls_back_to_ledger() {
        let mut mirror = lenient_mirror();
        mirror
            .expect_list_bookings()
            .returning(|| Err(AppError::StoreUnavailable("down".into())));
        let service = service(mirror).await;
        for _ in 0..3 {
            service.create(request("2025-03-01", "10:00")).await.unwrap();
        }

        match service.list(Some(Pagination::new(2, 2))).await.unwrap() {
            Listing::Paged(page) => {
                assert_eq!(page.items.len(), 1);
                assert_eq!(page.total, 3);
            }
            Listing::All(_) => panic!("expected a page"),
        }
    }

    #[tokio::test]
    async fn test_list_prefers_mirror() {
        let mut mirror = lenient_mirror();
        mirror
            .expect_list_bookings()
            .returning(|| Ok(vec![Booking::new("mirror01".into(), NewBooking::default())]));
        let service = service(mirror).await;
        service.create(request("2025-03-01", "10:00")).await.unwrap();

        let rows = service.list_all().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].ticket_id, "mirror01");
    }

    #[test]
    fn test_parse_rating() {
        assert_eq!(parse_rating(&json!(5)).unwrap(), 5);
        assert_eq!(parse_rating(&json!("3")).unwrap(), 3);
        assert!(parse_rating(&json!("great")).is_err());
        assert!(parse_rating(&json!(4.5)).is_err());
        assert!(parse_rating(&Value::Null).is_err());
    }
}
