//! Museum catalog repository (primary store)

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use super::{conflict_on_unique, MuseumStore};
use crate::{
    error::{AppError, AppResult},
    models::{Museum, MuseumUpdate},
};

const MUSEUM_COLUMNS: &str =
    "id, name, city, state, museum_type, category, established, latitude, longitude, visitors";

#[derive(Clone)]
pub struct MuseumsRepository {
    pool: Pool<Postgres>,
}

impl MuseumsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MuseumStore for MuseumsRepository {
    async fn list(&self) -> AppResult<Vec<Museum>> {
        let query = format!("SELECT {} FROM museums ORDER BY seq DESC", MUSEUM_COLUMNS);
        let rows = sqlx::query_as::<_, Museum>(&query)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn insert(&self, museum: &Museum) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO museums (id, name, city, state, museum_type, category, established, latitude, longitude, visitors)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(&museum.id)
        .bind(&museum.name)
        .bind(&museum.city)
        .bind(&museum.state)
        .bind(&museum.museum_type)
        .bind(&museum.category)
        .bind(&museum.established)
        .bind(museum.latitude)
        .bind(museum.longitude)
        .bind(museum.visitors)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "Museum"))?;
        Ok(())
    }

    async fn insert_many(&self, museums: &[Museum]) -> AppResult<u64> {
        let mut tx = self.pool.begin().await?;
        let mut written = 0;
        for museum in museums {
            let result = sqlx::query(
                r#"
                INSERT INTO museums (id, name, city, state, museum_type, category, established, latitude, longitude, visitors)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                ON CONFLICT (id) DO NOTHING
                "#,
            )
            .bind(&museum.id)
            .bind(&museum.name)
            .bind(&museum.city)
            .bind(&museum.state)
            .bind(&museum.museum_type)
            .bind(&museum.category)
            .bind(&museum.established)
            .bind(museum.latitude)
            .bind(museum.longitude)
            .bind(museum.visitors)
            .execute(&mut *tx)
            .await?;
            written += result.rows_affected();
        }
        tx.commit().await?;
        Ok(written)
    }

    async fn update(&self, id: &str, update: &MuseumUpdate) -> AppResult<Museum> {
        let query = format!(
            r#"
            UPDATE museums SET
                name = COALESCE($2, name),
                city = COALESCE($3, city),
                state = COALESCE($4, state),
                museum_type = COALESCE($5, museum_type),
                category = COALESCE($6, category),
                established = COALESCE($7, established),
                latitude = COALESCE($8, latitude),
                longitude = COALESCE($9, longitude)
            WHERE id = $1
            RETURNING {}
            "#,
            MUSEUM_COLUMNS
        );
        sqlx::query_as::<_, Museum>(&query)
            .bind(id)
            .bind(&update.name)
            .bind(&update.city)
            .bind(&update.state)
            .bind(&update.museum_type)
            .bind(&update.category)
            .bind(&update.established)
            .bind(update.latitude)
            .bind(update.longitude)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Museum with id {} not found", id)))
    }

    async fn delete(&self, id: &str) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM museums WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Museum with id {} not found", id)));
        }
        Ok(())
    }

    async fn count(&self) -> AppResult<i64> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM museums")
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }
}
