//! Museum assistant endpoints

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::AppResult;

use super::{bookings::MessageResponse, OptionalSession};

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    /// Conversation to continue; defaults to the login session
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ChatResponse {
    pub response: String,
    /// Send back on the next message to keep the conversation going
    pub session_id: String,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ChatResetRequest {
    pub session_id: Option<String>,
}

/// Conversation key: explicit id, then the login session, then a fresh one
fn conversation_id(explicit: Option<String>, session: &OptionalSession) -> Option<String> {
    explicit
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .or_else(|| session.0.as_ref().map(|claims| claims.sid.clone()))
}

/// Ask the museum assistant
#[utoipa::path(
    post,
    path = "/api/chat",
    tag = "chat",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Assistant answer", body = ChatResponse),
        (status = 400, description = "Message is required")
    )
)]
pub async fn chat(
    State(state): State<crate::AppState>,
    session: OptionalSession,
    Json(request): Json<ChatRequest>,
) -> AppResult<Json<ChatResponse>> {
    let session_id = conversation_id(request.session_id, &session).unwrap_or_else(|| Uuid::new_v4().to_string());
    let response = state
        .services
        .assistant
        .answer(&session_id, &request.message)
        .await?;
    Ok(Json(ChatResponse { response, session_id }))
}

/// Forget a conversation
#[utoipa::path(
    post,
    path = "/api/chat/reset",
    tag = "chat",
    request_body = ChatResetRequest,
    responses(
        (status = 200, description = "Conversation cleared", body = MessageResponse)
    )
)]
pub async fn reset(
    State(state): State<crate::AppState>,
    session: OptionalSession,
    Json(request): Json<ChatResetRequest>,
) -> AppResult<Json<MessageResponse>> {
    if let Some(session_id) = conversation_id(request.session_id, &session) {
        state.services.assistant.reset(&session_id).await?;
    }
    Ok(Json(MessageResponse {
        message: "Conversation reset".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Role, SessionClaims};

    fn logged_in() -> OptionalSession {
        OptionalSession(Some(SessionClaims {
            sub: Uuid::new_v4().to_string(),
            username: "ana".into(),
            role: Role::Visitor,
            sid: "login-sid".into(),
            exp: 0,
            iat: 0,
        }))
    }

    #[test]
    fn test_conversation_id_precedence() {
        assert_eq!(conversation_id(Some("explicit".into()), &logged_in()).as_deref(), Some("explicit"));
        assert_eq!(conversation_id(Some("  ".into()), &logged_in()).as_deref(), Some("login-sid"));
        assert_eq!(conversation_id(None, &OptionalSession(None)), None);
    }
}
