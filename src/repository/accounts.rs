//! Admin, passkey and visitor repository

use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use super::{conflict_on_unique, AccountStore};
use crate::{
    error::AppResult,
    models::{AdminAccount, Passkey, VisitorAccount},
};

#[derive(Clone)]
pub struct AccountsRepository {
    pool: Pool<Postgres>,
}

impl AccountsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountStore for AccountsRepository {
    async fn find_admin(&self, username: &str) -> AppResult<Option<AdminAccount>> {
        let admin = sqlx::query_as::<_, AdminAccount>(
            "SELECT id, username, password FROM admins WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(admin)
    }

    async fn insert_admin(&self, account: &AdminAccount) -> AppResult<()> {
        sqlx::query("INSERT INTO admins (id, username, password) VALUES ($1, $2, $3)")
            .bind(account.id)
            .bind(&account.username)
            .bind(&account.password)
            .execute(&self.pool)
            .await
            .map_err(|e| conflict_on_unique(e, "Username"))?;
        Ok(())
    }

    async fn list_passkeys(&self) -> AppResult<Vec<Passkey>> {
        let rows = sqlx::query_as::<_, Passkey>("SELECT passkey FROM passkeys ORDER BY crea_date")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn passkey_exists(&self, passkey: &str) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM passkeys WHERE passkey = $1)")
            .bind(passkey)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    async fn count_passkeys(&self) -> AppResult<i64> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM passkeys")
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }

    async fn insert_passkey(&self, passkey: &str) -> AppResult<()> {
        sqlx::query("INSERT INTO passkeys (passkey) VALUES ($1)")
            .bind(passkey)
            .execute(&self.pool)
            .await
            .map_err(|e| conflict_on_unique(e, "Passkey"))?;
        Ok(())
    }

    async fn delete_passkey(&self, passkey: &str) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM passkeys WHERE passkey = $1")
            .bind(passkey)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_visitor_by_username(&self, username: &str) -> AppResult<Option<VisitorAccount>> {
        let visitor = sqlx::query_as::<_, VisitorAccount>(
            "SELECT id, username, email, password FROM visitors WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(visitor)
    }

    async fn find_visitor_by_email(&self, email: &str) -> AppResult<Option<VisitorAccount>> {
        let visitor = sqlx::query_as::<_, VisitorAccount>(
            "SELECT id, username, email, password FROM visitors WHERE LOWER(email) = LOWER($1)",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(visitor)
    }

    async fn find_visitor_by_id(&self, id: Uuid) -> AppResult<Option<VisitorAccount>> {
        let visitor = sqlx::query_as::<_, VisitorAccount>(
            "SELECT id, username, email, password FROM visitors WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(visitor)
    }

    async fn insert_visitor(&self, account: &VisitorAccount) -> AppResult<()> {
        sqlx::query("INSERT INTO visitors (id, username, email, password) VALUES ($1, $2, $3, $4)")
            .bind(account.id)
            .bind(&account.username)
            .bind(&account.email)
            .bind(&account.password)
            .execute(&self.pool)
            .await
            .map_err(|e| conflict_on_unique(e, "Username or email"))?;
        Ok(())
    }
}
