//! Repository layer for database operations.
//!
//! Services depend on the store traits below rather than on PostgreSQL
//! directly, so the booking mirror, catalog and account stores can be swapped
//! or mocked.

pub mod accounts;
pub mod bookings;
pub mod museums;

use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        AdminAccount, AttendanceStatus, Booking, Museum, MuseumUpdate, Passkey, RatingRecord,
        VisitorAccount,
    },
};

/// Main repository struct holding database connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
    pub bookings: bookings::BookingsRepository,
    pub museums: museums::MuseumsRepository,
    pub accounts: accounts::AccountsRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            bookings: bookings::BookingsRepository::new(pool.clone()),
            museums: museums::MuseumsRepository::new(pool.clone()),
            accounts: accounts::AccountsRepository::new(pool.clone()),
            pool,
        }
    }

    /// Round-trip to the database
    pub async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Secondary copy of the booking ledger.
///
/// Writes are best-effort from the caller's point of view; reads are preferred
/// over the ledger when they succeed.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BookingMirror: Send + Sync {
    async fn insert_booking(&self, booking: &Booking) -> AppResult<()>;

    /// Mark every booking of a slot (or one ticket of it) as attended
    async fn mark_attended(&self, date: &str, time: &str, ticket_id: Option<String>) -> AppResult<u64>;

    async fn set_status(&self, ticket_id: &str, status: AttendanceStatus) -> AppResult<u64>;

    async fn set_review(&self, ticket_id: &str, rating: i16, review: &str) -> AppResult<u64>;

    async fn insert_rating(&self, record: &RatingRecord) -> AppResult<()>;

    async fn list_bookings(&self) -> AppResult<Vec<Booking>>;

    /// Newest first
    async fn list_ratings(&self) -> AppResult<Vec<RatingRecord>>;
}

/// Museum catalog storage
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MuseumStore: Send + Sync {
    /// Newest first
    async fn list(&self) -> AppResult<Vec<Museum>>;

    async fn insert(&self, museum: &Museum) -> AppResult<()>;

    /// Bulk load, returns the number of rows written
    async fn insert_many(&self, museums: &[Museum]) -> AppResult<u64>;

    /// Fails with `NotFound` when no record has this id
    async fn update(&self, id: &str, update: &MuseumUpdate) -> AppResult<Museum>;

    /// Fails with `NotFound` when no record has this id
    async fn delete(&self, id: &str) -> AppResult<()>;

    async fn count(&self) -> AppResult<i64>;
}

/// Admin, passkey and visitor account storage
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn find_admin(&self, username: &str) -> AppResult<Option<AdminAccount>>;

    /// Fails with `Conflict` when the username is taken
    async fn insert_admin(&self, account: &AdminAccount) -> AppResult<()>;

    async fn list_passkeys(&self) -> AppResult<Vec<Passkey>>;

    async fn passkey_exists(&self, passkey: &str) -> AppResult<bool>;

    async fn count_passkeys(&self) -> AppResult<i64>;

    /// Fails with `Conflict` when the passkey already exists
    async fn insert_passkey(&self, passkey: &str) -> AppResult<()>;

    /// Whether a row was removed
    async fn delete_passkey(&self, passkey: &str) -> AppResult<bool>;

    async fn find_visitor_by_username(&self, username: &str) -> AppResult<Option<VisitorAccount>>;

    async fn find_visitor_by_email(&self, email: &str) -> AppResult<Option<VisitorAccount>>;

    async fn find_visitor_by_id(&self, id: Uuid) -> AppResult<Option<VisitorAccount>>;

    /// Fails with `Conflict` when the username or email is taken
    async fn insert_visitor(&self, account: &VisitorAccount) -> AppResult<()>;
}

/// Map a unique-constraint violation to `Conflict`, anything else to a store error
pub(crate) fn conflict_on_unique(error: sqlx::Error, what: &str) -> AppError {
    let unique = error
        .as_database_error()
        .and_then(|e| e.code())
        .is_some_and(|code| code == "23505");
    if unique {
        AppError::Conflict(format!("{} already exists", what))
    } else {
        AppError::Database(error)
    }
}
