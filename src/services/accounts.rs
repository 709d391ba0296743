//! Admin, passkey and visitor account service

use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    models::{
        account::{AdminRegistration, VisitorRegistration},
        AdminAccount, Passkey, Role, SessionClaims, VisitorAccount, VisitorProfile,
    },
    repository::AccountStore,
};

/// Signed session handed out at login
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub claims: SessionClaims,
}

#[derive(Clone)]
pub struct AccountsService {
    store: Arc<dyn AccountStore>,
    config: AuthConfig,
}

impl AccountsService {
    pub fn new(store: Arc<dyn AccountStore>, config: AuthConfig) -> Self {
        Self { store, config }
    }

    /// A passkey is valid when stored, or when it is the bootstrap passkey and
    /// none are stored yet
    pub async fn validate_passkey(&self, passkey: &str) -> AppResult<bool> {
        if passkey.is_empty() {
            return Ok(false);
        }
        if self.store.passkey_exists(passkey).await? {
            return Ok(true);
        }
        Ok(passkey == self.config.bootstrap_passkey && self.store.count_passkeys().await? == 0)
    }

    pub async fn register_admin(&self, request: AdminRegistration) -> AppResult<()> {
        request.validate()?;
        if !self.validate_passkey(&request.passkey).await? {
            return Err(AppError::Validation("Invalid pass key".to_string()));
        }
        if self.store.find_admin(&request.username).await?.is_some() {
            return Err(AppError::Conflict("Username already exists".to_string()));
        }

        let account = AdminAccount {
            id: Uuid::new_v4(),
            username: request.username,
            password: hash_password(&request.password)?,
        };
        self.store.insert_admin(&account).await?;
        tracing::info!(username = %account.username, "Admin registered");
        Ok(())
    }

    pub async fn login_admin(&self, username: &str, password: &str) -> AppResult<Session> {
        let admin = self
            .store
            .find_admin(username)
            .await?
            .ok_or_else(|| AppError::Authentication("Invalid username or password".to_string()))?;
        if !verify_password(&admin.password, password)? {
            return Err(AppError::Authentication("Invalid username or password".to_string()));
        }
        self.issue(admin.id, &admin.username, Role::Admin)
    }

    /// Stored passkeys, or the bootstrap passkey while none are stored
    pub async fn list_passkeys(&self) -> AppResult<Vec<Passkey>> {
        let passkeys = self.store.list_passkeys().await?;
        if passkeys.is_empty() {
            return Ok(vec![Passkey {
                passkey: self.config.bootstrap_passkey.clone(),
            }]);
        }
        Ok(passkeys)
    }

    pub async fn create_passkey(&self, passkey: &str) -> AppResult<()> {
        let passkey = passkey.trim();
        if passkey.is_empty() {
            return Err(AppError::Validation("Pass key is required".to_string()));
        }
        self.store.insert_passkey(passkey).await
    }

    pub async fn delete_passkey(&self, passkey: &str) -> AppResult<()> {
        if passkey == self.config.bootstrap_passkey && self.store.count_passkeys().await? <= 1 {
            return Err(AppError::Validation("Cannot delete the last pass key".to_string()));
        }
        if !self.store.delete_passkey(passkey).await? {
            return Err(AppError::NotFound("Pass key not found".to_string()));
        }
        Ok(())
    }

    pub async fn register_visitor(&self, request: VisitorRegistration) -> AppResult<VisitorProfile> {
        request.validate()?;
        if self.store.find_visitor_by_username(&request.username).await?.is_some() {
            return Err(AppError::Conflict("Username already exists".to_string()));
        }
        if self.store.find_visitor_by_email(&request.email).await?.is_some() {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }

        let account = VisitorAccount {
            id: Uuid::new_v4(),
            username: request.username,
            email: request.email,
            password: hash_password(&request.password)?,
        };
        self.store.insert_visitor(&account).await?;
        tracing::info!(username = %account.username, "Visitor registered");
        Ok(account.into())
    }

    pub async fn login_visitor(&self, username: &str, password: &str) -> AppResult<Session> {
        let visitor = self
            .store
            .find_visitor_by_username(username)
            .await?
            .ok_or_else(|| AppError::Authentication("Invalid username or password".to_string()))?;
        if !verify_password(&visitor.password, password)? {
            return Err(AppError::Authentication("Invalid username or password".to_string()));
        }
        self.issue(visitor.id, &visitor.username, Role::Visitor)
    }

    pub async fn visitor_profile(&self, claims: &SessionClaims) -> AppResult<VisitorProfile> {
        claims.require_visitor()?;
        let id = Uuid::parse_str(&claims.sub)
            .map_err(|_| AppError::Authentication("Invalid session subject".to_string()))?;
        self.store
            .find_visitor_by_id(id)
            .await?
            .map(VisitorProfile::from)
            .ok_or_else(|| AppError::NotFound("Visitor not found".to_string()))
    }

    pub fn decode(&self, token: &str) -> AppResult<SessionClaims> {
        SessionClaims::from_token(token, &self.config.jwt_secret)
            .map_err(|e| AppError::Authentication(e.to_string()))
    }

    fn issue(&self, id: Uuid, username: &str, role: Role) -> AppResult<Session> {
        let now = Utc::now().timestamp();
        let claims = SessionClaims {
            sub: id.to_string(),
            username: username.to_string(),
            role,
            sid: Uuid::new_v4().to_string(),
            exp: now + (self.config.session_hours as i64 * 3600),
            iat: now,
        };
        let token = claims
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))?;
        Ok(Session { token, claims })
    }
}

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}

fn verify_password(hash: &str, password: &str) -> AppResult<bool> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MockAccountStore;

    const BOOTSTRAP: &str = "pixelpast-bootstrap";

    fn service(store: MockAccountStore) -> AccountsService {
        AccountsService::new(Arc::new(store), AuthConfig::default())
    }

    #[tokio::test]
    async fn test_bootstrap_passkey_only_while_empty() {
        let mut empty = MockAccountStore::new();
        empty.expect_passkey_exists().returning(|_| Ok(false));
        empty.expect_count_passkeys().returning(|| Ok(0));
        assert!(service(empty).validate_passkey(BOOTSTRAP).await.unwrap());

        let mut populated = MockAccountStore::new();
        populated.expect_passkey_exists().returning(|p| Ok(p == "museum-2025"));
        populated.expect_count_passkeys().returning(|| Ok(1));
        let service = service(populated);
        assert!(!service.validate_passkey(BOOTSTRAP).await.unwrap());
        assert!(service.validate_passkey("museum-2025").await.unwrap());
        assert!(!service.validate_passkey("").await.unwrap());
    }

    #[tokio::test]
    async fn test_list_shows_bootstrap_when_empty() {
        let mut store = MockAccountStore::new();
        store.expect_list_passkeys().returning(|| Ok(vec![]));
        let listed = service(store).list_passkeys().await.unwrap();
        assert_eq!(listed, vec![Passkey { passkey: BOOTSTRAP.to_string() }]);
    }

    #[tokio::test]
    async fn test_last_bootstrap_passkey_cannot_be_deleted() {
        let mut store = MockAccountStore::new();
        store.expect_count_passkeys().returning(|| Ok(1));
        store.expect_delete_passkey().never();
        let result = service(store).delete_passkey(BOOTSTRAP).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_delete_passkey_when_others_remain() {
        for passkey in [BOOTSTRAP, "museum-2025"] {
            let mut store = MockAccountStore::new();
            store.expect_count_passkeys().returning(|| Ok(2));
            store
                .expect_delete_passkey()
                .withf(move |p| p == passkey)
                .times(1)
                .returning(|_| Ok(true));
            assert!(service(store).delete_passkey(passkey).await.is_ok());
        }
    }

    #[tokio::test]
    async fn test_delete_unknown_passkey() {
        let mut store = MockAccountStore::new();
        store.expect_delete_passkey().returning(|_| Ok(false));
        let result = service(store).delete_passkey("nope").await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_register_admin_rejects_bad_passkey() {
        let mut store = MockAccountStore::new();
        store.expect_passkey_exists().returning(|_| Ok(false));
        store.expect_count_passkeys().returning(|| Ok(3));
        store.expect_insert_admin().never();
        let result = service(store)
            .register_admin(AdminRegistration {
                username: "curator".into(),
                password: "secret".into(),
                passkey: "guess".into(),
            })
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_admin_login_round_trip() {
        let hash = hash_password("secret").unwrap();
        let mut store = MockAccountStore::new();
        store.expect_find_admin().returning(move |username| {
            Ok(Some(AdminAccount {
                id: Uuid::new_v4(),
                username: username.to_string(),
                password: hash.clone(),
            }))
        });
        let service = service(store);

        let session = service.login_admin("curator", "secret").await.unwrap();
        let claims = service.decode(&session.token).unwrap();
        assert_eq!(claims.role, Role::Admin);
        assert_eq!(claims.username, "curator");

        let wrong = service.login_admin("curator", "nope").await;
        assert!(matches!(wrong, Err(AppError::Authentication(_))));
    }

    #[tokio::test]
    async fn test_register_visitor_duplicate_email() {
        let mut store = MockAccountStore::new();
        store.expect_find_visitor_by_username().returning(|_| Ok(None));
        store.expect_find_visitor_by_email().returning(|email| {
            Ok(Some(VisitorAccount {
                id: Uuid::new_v4(),
                username: "someone".into(),
                email: email.to_string(),
                password: String::new(),
            }))
        });
        store.expect_insert_visitor().never();

        let result = service(store)
            .register_visitor(VisitorRegistration {
                username: "ana".into(),
                email: "ana@example.org".into(),
                password: "secret1".into(),
            })
            .await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }
}
