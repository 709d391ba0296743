//! Admin and visitor authentication endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::{
        account::{AdminRegistration, LoginRequest, VisitorRegistration},
        Passkey, Role, VisitorProfile,
    },
    services::accounts::Session,
};

use super::{
    bookings::MessageResponse, expired_session_cookie, session_cookie, AdminSession, VisitorSession,
};

/// Login response
#[derive(Serialize, ToSchema)]
pub struct LoginResponse {
    pub message: String,
    pub username: String,
    pub role: Role,
    /// Session token, also set as an HTTP-only cookie
    pub token: String,
    pub token_type: String,
    /// Expiry as a Unix timestamp
    pub expires_at: i64,
}

impl From<Session> for LoginResponse {
    fn from(session: Session) -> Self {
        Self {
            message: "Login successful".to_string(),
            username: session.claims.username,
            role: session.claims.role,
            token: session.token,
            token_type: "Bearer".to_string(),
            expires_at: session.claims.exp,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct PasskeyRequest {
    #[serde(default)]
    pub passkey: String,
}

#[derive(Serialize, ToSchema)]
pub struct PasskeyValidation {
    pub valid: bool,
}

fn login_response(
    state: &crate::AppState,
    jar: CookieJar,
    session: Session,
) -> (CookieJar, Json<LoginResponse>) {
    let jar = jar.add(session_cookie(&state.config.auth, session.token.clone()));
    (jar, Json(LoginResponse::from(session)))
}

/// Admin login
#[utoipa::path(
    post,
    path = "/admin/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in, session cookie set", body = LoginResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn admin_login(
    State(state): State<crate::AppState>,
    jar: CookieJar,
    Json(request): Json<LoginRequest>,
) -> AppResult<(CookieJar, Json<LoginResponse>)> {
    let session = state
        .services
        .accounts
        .login_admin(&request.username, &request.password)
        .await?;
    tracing::info!(username = %session.claims.username, "Admin logged in");
    Ok(login_response(&state, jar, session))
}

/// Register an admin with a valid pass key
#[utoipa::path(
    post,
    path = "/admin/register",
    tag = "auth",
    request_body = AdminRegistration,
    responses(
        (status = 201, description = "Admin registered", body = MessageResponse),
        (status = 400, description = "Missing field or invalid pass key"),
        (status = 409, description = "Username already exists")
    )
)]
pub async fn admin_register(
    State(state): State<crate::AppState>,
    Json(request): Json<AdminRegistration>,
) -> AppResult<(StatusCode, Json<MessageResponse>)> {
    state.services.accounts.register_admin(request).await?;
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "Registration successful".to_string(),
        }),
    ))
}

/// Check a pass key before registration
#[utoipa::path(
    post,
    path = "/admin/validate_passkey",
    tag = "auth",
    request_body = PasskeyRequest,
    responses(
        (status = 200, description = "Whether the pass key is accepted", body = PasskeyValidation)
    )
)]
pub async fn validate_passkey(
    State(state): State<crate::AppState>,
    Json(request): Json<PasskeyRequest>,
) -> AppResult<Json<PasskeyValidation>> {
    let valid = state.services.accounts.validate_passkey(request.passkey.trim()).await?;
    Ok(Json(PasskeyValidation { valid }))
}

/// Admin logout
#[utoipa::path(
    post,
    path = "/admin/logout",
    tag = "auth",
    responses(
        (status = 200, description = "Session cookie cleared", body = MessageResponse)
    )
)]
pub async fn admin_logout(
    State(state): State<crate::AppState>,
    jar: CookieJar,
) -> (CookieJar, Json<MessageResponse>) {
    logout(&state, jar)
}

fn logout(state: &crate::AppState, jar: CookieJar) -> (CookieJar, Json<MessageResponse>) {
    let jar = jar.remove(expired_session_cookie(&state.config.auth));
    (
        jar,
        Json(MessageResponse {
            message: "Logged out".to_string(),
        }),
    )
}

/// List pass keys (admin)
#[utoipa::path(
    get,
    path = "/api/admin/passkeys",
    tag = "admin",
    security(("session" = [])),
    responses(
        (status = 200, description = "Pass keys", body = Vec<Passkey>),
        (status = 401, description = "Admin session required")
    )
)]
pub async fn list_passkeys(
    State(state): State<crate::AppState>,
    AdminSession(_claims): AdminSession,
) -> AppResult<Json<Vec<Passkey>>> {
    Ok(Json(state.services.accounts.list_passkeys().await?))
}

/// Add a pass key (admin)
#[utoipa::path(
    post,
    path = "/api/admin/passkeys",
    tag = "admin",
    security(("session" = [])),
    request_body = PasskeyRequest,
    responses(
        (status = 201, description = "Pass key created", body = Passkey),
        (status = 400, description = "Pass key missing"),
        (status = 401, description = "Admin session required"),
        (status = 409, description = "Pass key already exists")
    )
)]
pub async fn create_passkey(
    State(state): State<crate::AppState>,
    AdminSession(claims): AdminSession,
    Json(request): Json<PasskeyRequest>,
) -> AppResult<(StatusCode, Json<Passkey>)> {
    state.services.accounts.create_passkey(&request.passkey).await?;
    tracing::info!(admin = %claims.username, "Pass key created");
    Ok((
        StatusCode::CREATED,
        Json(Passkey {
            passkey: request.passkey.trim().to_string(),
        }),
    ))
}

/// Remove a pass key (admin)
#[utoipa::path(
    delete,
    path = "/api/admin/passkeys/{passkey}",
    tag = "admin",
    security(("session" = [])),
    params(("passkey" = String, Path, description = "Pass key")),
    responses(
        (status = 204, description = "Pass key deleted"),
        (status = 400, description = "Last pass key cannot be deleted"),
        (status = 401, description = "Admin session required"),
        (status = 404, description = "Pass key not found")
    )
)]
pub async fn delete_passkey(
    State(state): State<crate::AppState>,
    AdminSession(claims): AdminSession,
    Path(passkey): Path<String>,
) -> AppResult<StatusCode> {
    state.services.accounts.delete_passkey(&passkey).await?;
    tracing::info!(admin = %claims.username, "Pass key deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Visitor sign-up
#[utoipa::path(
    post,
    path = "/visitor/register",
    tag = "auth",
    request_body = VisitorRegistration,
    responses(
        (status = 201, description = "Visitor registered", body = VisitorProfile),
        (status = 400, description = "Invalid field"),
        (status = 409, description = "Username or email already registered")
    )
)]
pub async fn visitor_register(
    State(state): State<crate::AppState>,
    Json(request): Json<VisitorRegistration>,
) -> AppResult<(StatusCode, Json<VisitorProfile>)> {
    let profile = state.services.accounts.register_visitor(request).await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

/// Visitor login
#[utoipa::path(
    post,
    path = "/visitor/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in, session cookie set", body = LoginResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn visitor_login(
    State(state): State<crate::AppState>,
    jar: CookieJar,
    Json(request): Json<LoginRequest>,
) -> AppResult<(CookieJar, Json<LoginResponse>)> {
    let session = state
        .services
        .accounts
        .login_visitor(&request.username, &request.password)
        .await?;
    Ok(login_response(&state, jar, session))
}

/// Visitor logout
#[utoipa::path(
    post,
    path = "/visitor/logout",
    tag = "auth",
    responses(
        (status = 200, description = "Session cookie cleared", body = MessageResponse)
    )
)]
pub async fn visitor_logout(
    State(state): State<crate::AppState>,
    jar: CookieJar,
) -> (CookieJar, Json<MessageResponse>) {
    logout(&state, jar)
}

/// Current visitor
#[utoipa::path(
    get,
    path = "/visitor/me",
    tag = "auth",
    security(("session" = [])),
    responses(
        (status = 200, description = "Visitor profile", body = VisitorProfile),
        (status = 401, description = "Not logged in")
    )
)]
pub async fn visitor_me(
    State(state): State<crate::AppState>,
    VisitorSession(claims): VisitorSession,
) -> AppResult<Json<VisitorProfile>> {
    Ok(Json(state.services.accounts.visitor_profile(&claims).await?))
}
