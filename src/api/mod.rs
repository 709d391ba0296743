//! API handlers for PixelPast endpoints

pub mod auth;
pub mod bookings;
pub mod chat;
pub mod contact;
pub mod health;
pub mod museums;
pub mod openapi;
pub mod recommendations;
pub mod stats;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use crate::{config::AuthConfig, error::AppError, models::SessionClaims, AppState};

/// Session token from the `Authorization: Bearer` header, else the session cookie
fn session_token(parts: &Parts, cookie_name: &str) -> Option<String> {
    if let Some(header) = parts.headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        if let Some(token) = header.strip_prefix("Bearer ") {
            return Some(token.trim().to_string());
        }
    }
    CookieJar::from_headers(&parts.headers)
        .get(cookie_name)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
}

fn decode_session(parts: &Parts, state: &AppState) -> Result<SessionClaims, AppError> {
    let token = session_token(parts, &state.config.auth.cookie_name)
        .ok_or_else(|| AppError::Authentication("Not logged in".to_string()))?;
    state.services.accounts.decode(&token)
}

/// Extractor for a logged-in admin
pub struct AdminSession(pub SessionClaims);

#[async_trait]
impl FromRequestParts<AppState> for AdminSession {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let claims = decode_session(parts, state)?;
        claims.require_admin()?;
        Ok(AdminSession(claims))
    }
}

/// Extractor for a logged-in visitor
pub struct VisitorSession(pub SessionClaims);

#[async_trait]
impl FromRequestParts<AppState> for VisitorSession {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let claims = decode_session(parts, state)?;
        claims.require_visitor()?;
        Ok(VisitorSession(claims))
    }
}

/// Any valid session, or none; invalid tokens count as none
pub struct OptionalSession(pub Option<SessionClaims>);

#[async_trait]
impl FromRequestParts<AppState> for OptionalSession {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(OptionalSession(decode_session(parts, state).ok()))
    }
}

/// HTTP-only cookie carrying a session token
pub(crate) fn session_cookie(config: &AuthConfig, token: String) -> Cookie<'static> {
    Cookie::build((config.cookie_name.clone(), token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

/// Cookie that clears the session cookie
pub(crate) fn expired_session_cookie(config: &AuthConfig) -> Cookie<'static> {
    Cookie::build((config.cookie_name.clone(), String::new()))
        .path("/")
        .build()
}
