//! Contact form endpoint

use axum::{extract::State, Json};

use crate::{error::AppResult, services::email::ContactMessage};

use super::bookings::MessageResponse;

/// Send a message to the PixelPast team
#[utoipa::path(
    post,
    path = "/api/contact",
    tag = "contact",
    request_body = ContactMessage,
    responses(
        (status = 200, description = "Message sent", body = MessageResponse),
        (status = 400, description = "All fields are required"),
        (status = 500, description = "Email could not be sent")
    )
)]
pub async fn send_contact(
    State(state): State<crate::AppState>,
    Json(message): Json<ContactMessage>,
) -> AppResult<Json<MessageResponse>> {
    state.services.email.send_contact(&message).await?;
    Ok(Json(MessageResponse {
        message: "Message sent successfully.".to_string(),
    }))
}
