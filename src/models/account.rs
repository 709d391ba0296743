//! Admin and visitor accounts, passkeys and session claims

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};

/// Admin account
#[derive(Debug, Clone, FromRow)]
pub struct AdminAccount {
    pub id: Uuid,
    pub username: String,
    /// Hashed password (argon2)
    pub password: String,
}

/// Visitor account
#[derive(Debug, Clone, FromRow)]
pub struct VisitorAccount {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    /// Hashed password (argon2)
    pub password: String,
}

/// Public view of a visitor account
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct VisitorProfile {
    pub id: Uuid,
    pub username: String,
    pub email: String,
}

impl From<VisitorAccount> for VisitorProfile {
    fn from(account: VisitorAccount) -> Self {
        Self {
            id: account.id,
            username: account.username,
            email: account.email,
        }
    }
}

/// Stored passkey
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Passkey {
    pub passkey: String,
}

/// Admin registration request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AdminRegistration {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
    #[serde(default)]
    pub passkey: String,
}

/// Visitor registration request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct VisitorRegistration {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,
    #[validate(email(message = "A valid email is required"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

/// Login request (admins and visitors)
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Role carried by a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Visitor,
}

/// Session token claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Account id
    pub sub: String,
    pub username: String,
    pub role: Role,
    /// Random per-login session id, also keys conversation state
    pub sid: String,
    pub exp: i64,
    pub iat: i64,
}

impl SessionClaims {
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        let data = decode::<SessionClaims>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(data.claims)
    }

    pub fn require_admin(&self) -> AppResult<()> {
        if self.role == Role::Admin {
            Ok(())
        } else {
            Err(AppError::Authentication("Admin session required".to_string()))
        }
    }

    pub fn require_visitor(&self) -> AppResult<()> {
        if self.role == Role::Visitor {
            Ok(())
        } else {
            Err(AppError::Authentication("Visitor session required".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn claims(role: Role) -> SessionClaims {
        let now = Utc::now().timestamp();
        SessionClaims {
            sub: Uuid::new_v4().to_string(),
            username: "curator".to_string(),
            role,
            sid: Uuid::new_v4().to_string(),
            exp: now + 3600,
            iat: now,
        }
    }

    #[test]
    fn test_token_round_trip() {
        let original = claims(Role::Admin);
        let token = original.create_token("secret").unwrap();
        let decoded = SessionClaims::from_token(&token, "secret").unwrap();
        assert_eq!(decoded.sid, original.sid);
        assert_eq!(decoded.role, Role::Admin);
        assert!(SessionClaims::from_token(&token, "other").is_err());
    }

    #[test]
    fn test_role_guards() {
        assert!(claims(Role::Admin).require_admin().is_ok());
        assert!(claims(Role::Visitor).require_admin().is_err());
        assert!(claims(Role::Visitor).require_visitor().is_ok());
    }

    #[test]
    fn test_visitor_registration_validation() {
        let bad = VisitorRegistration {
            username: "ana".into(),
            email: "not-an-email".into(),
            password: "secret1".into(),
        };
        assert!(bad.validate().is_err());
    }
}
