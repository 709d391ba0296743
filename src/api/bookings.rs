//! Booking, attendance and review endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::{Booking, Listing, NewBooking, PageQuery, Pagination, RatingRecord},
    services::bookings::parse_rating,
};

use super::AdminSession;

/// Default page size for booking and rating lists
const BOOKINGS_PER_PAGE: i64 = 10;

#[derive(Serialize, ToSchema)]
pub struct BookResponse {
    pub message: String,
    pub ticket_id: String,
    /// Public path of the ticket QR code
    pub qr_url: Option<String>,
    pub museum: String,
    pub date: String,
    pub time: String,
}

#[derive(Deserialize, ToSchema)]
pub struct AttendRequest {
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub time: String,
    /// Restrict the update to one ticket of the slot
    #[serde(default)]
    pub ticket_id: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct AttendResponse {
    pub message: String,
    /// Bookings marked as attended
    pub updated: usize,
}

#[derive(Deserialize, ToSchema)]
pub struct TicketRequest {
    #[serde(default)]
    pub ticket_id: String,
}

#[derive(Deserialize, ToSchema)]
pub struct ReviewRequest {
    #[serde(default)]
    pub ticket_id: String,
    /// 1 to 5, as a number or numeric string
    #[schema(value_type = i16)]
    #[serde(default)]
    pub rating: Value,
    #[serde(default)]
    pub review: String,
}

#[derive(Deserialize, ToSchema)]
pub struct StatusRequest {
    /// Pending, Attended or Cancelled
    pub status: String,
}

#[derive(Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

/// Book a guided visit
#[utoipa::path(
    post,
    path = "/api/book",
    tag = "bookings",
    request_body = NewBooking,
    responses(
        (status = 200, description = "Booking recorded", body = BookResponse),
        (status = 400, description = "Museum, date or time missing")
    )
)]
pub async fn book(
    State(state): State<crate::AppState>,
    Json(request): Json<NewBooking>,
) -> AppResult<Json<BookResponse>> {
    let receipt = state.services.bookings.create(request).await?;
    let booking = receipt.booking;
    Ok(Json(BookResponse {
        message: "Booking confirmed!".to_string(),
        ticket_id: booking.ticket_id,
        qr_url: receipt.qr_url,
        museum: booking.museum,
        date: booking.date,
        time: booking.time,
    }))
}

/// Mark the bookings of a slot as attended
#[utoipa::path(
    post,
    path = "/api/attend",
    tag = "bookings",
    request_body = AttendRequest,
    responses(
        (status = 200, description = "Attendance recorded", body = AttendResponse),
        (status = 400, description = "Date or time missing")
    )
)]
pub async fn attend(
    State(state): State<crate::AppState>,
    Json(request): Json<AttendRequest>,
) -> AppResult<Json<AttendResponse>> {
    let ticket_id = request.ticket_id.filter(|t| !t.trim().is_empty());
    let updated = state
        .services
        .bookings
        .mark_attended(&request.date, &request.time, ticket_id)
        .await?;
    let message = if updated > 0 {
        "Tour marked as attended!"
    } else {
        "No matching booking found"
    };
    Ok(Json(AttendResponse {
        message: message.to_string(),
        updated,
    }))
}

/// Cancel a booking
#[utoipa::path(
    post,
    path = "/api/cancel",
    tag = "bookings",
    request_body = TicketRequest,
    responses(
        (status = 200, description = "Booking cancelled", body = MessageResponse),
        (status = 400, description = "Ticket ID missing"),
        (status = 404, description = "Unknown ticket")
    )
)]
pub async fn cancel(
    State(state): State<crate::AppState>,
    Json(request): Json<TicketRequest>,
) -> AppResult<Json<MessageResponse>> {
    state.services.bookings.cancel(&request.ticket_id).await?;
    Ok(Json(MessageResponse {
        message: "Booking cancelled".to_string(),
    }))
}

/// Rate and review a visit
#[utoipa::path(
    post,
    path = "/api/review",
    tag = "bookings",
    request_body = ReviewRequest,
    responses(
        (status = 200, description = "Review saved", body = MessageResponse),
        (status = 400, description = "Ticket ID or rating missing or invalid"),
        (status = 404, description = "Unknown ticket")
    )
)]
pub async fn review(
    State(state): State<crate::AppState>,
    Json(request): Json<ReviewRequest>,
) -> AppResult<Json<MessageResponse>> {
    let rating = parse_rating(&request.rating)?;
    state
        .services
        .bookings
        .submit_review(&request.ticket_id, rating, &request.review)
        .await?;
    Ok(Json(MessageResponse {
        message: "Thank you for your review!".to_string(),
    }))
}

/// Booking history
#[utoipa::path(
    get,
    path = "/api/history",
    tag = "bookings",
    params(PageQuery),
    responses(
        (status = 200, description = "All bookings, or one page when page/per_page is given", body = Vec<Booking>)
    )
)]
pub async fn history(
    State(state): State<crate::AppState>,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<Listing<Booking>>> {
    let pagination = Pagination::from_query(&query, BOOKINGS_PER_PAGE);
    Ok(Json(state.services.bookings.list(pagination).await?))
}

/// All bookings (admin)
#[utoipa::path(
    get,
    path = "/api/admin/bookings",
    tag = "admin",
    security(("session" = [])),
    params(PageQuery),
    responses(
        (status = 200, description = "Bookings", body = Vec<Booking>),
        (status = 401, description = "Admin session required")
    )
)]
pub async fn admin_bookings(
    State(state): State<crate::AppState>,
    AdminSession(_claims): AdminSession,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<Listing<Booking>>> {
    let pagination = Pagination::from_query(&query, BOOKINGS_PER_PAGE);
    Ok(Json(state.services.bookings.list(pagination).await?))
}

/// Change the attendance status of a booking (admin)
#[utoipa::path(
    put,
    path = "/api/admin/bookings/{ticket_id}/status",
    tag = "admin",
    security(("session" = [])),
    params(("ticket_id" = String, Path, description = "Ticket ID")),
    request_body = StatusRequest,
    responses(
        (status = 200, description = "Updated booking", body = Booking),
        (status = 400, description = "Unknown status value"),
        (status = 401, description = "Admin session required"),
        (status = 404, description = "Unknown ticket")
    )
)]
pub async fn update_status(
    State(state): State<crate::AppState>,
    AdminSession(claims): AdminSession,
    Path(ticket_id): Path<String>,
    Json(request): Json<StatusRequest>,
) -> AppResult<Json<Booking>> {
    let booking = state
        .services
        .bookings
        .set_status(&ticket_id, &request.status)
        .await?;
    tracing::info!(admin = %claims.username, ticket_id = %booking.ticket_id, status = %booking.attended, "Booking status changed");
    Ok(Json(booking))
}

/// Rating records, newest first (admin)
#[utoipa::path(
    get,
    path = "/api/admin/ratings",
    tag = "admin",
    security(("session" = [])),
    params(PageQuery),
    responses(
        (status = 200, description = "Rating records", body = Vec<RatingRecord>),
        (status = 401, description = "Admin session required")
    )
)]
pub async fn admin_ratings(
    State(state): State<crate::AppState>,
    AdminSession(_claims): AdminSession,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<Listing<RatingRecord>>> {
    let pagination = Pagination::from_query(&query, BOOKINGS_PER_PAGE);
    Ok(Json(state.services.bookings.list_ratings(pagination).await?))
}
