//! Booking mirror and ratings repository

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use super::BookingMirror;
use crate::{
    error::AppResult,
    models::{booking::BookingRow, AttendanceStatus, Booking, RatingRecord},
};

#[derive(Clone)]
pub struct BookingsRepository {
    pool: Pool<Postgres>,
}

impl BookingsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookingMirror for BookingsRepository {
    async fn insert_booking(&self, booking: &Booking) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO bookings (
                ticket_id, museum, visit_date, visit_time, people, tour_type,
                visitor_name, visitor_email, visitor_phone, visitor_age,
                special_requests, emergency_contact, museum_type, attended, rating, review
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            "#,
        )
        .bind(&booking.ticket_id)
        .bind(&booking.museum)
        .bind(&booking.date)
        .bind(&booking.time)
        .bind(&booking.people)
        .bind(&booking.tour_type)
        .bind(&booking.visitor_name)
        .bind(&booking.visitor_email)
        .bind(&booking.visitor_phone)
        .bind(&booking.visitor_age)
        .bind(&booking.special_requests)
        .bind(&booking.emergency_contact)
        .bind(&booking.museum_type)
        .bind(booking.attended.as_str())
        .bind(booking.rating)
        .bind(&booking.review)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn mark_attended(&self, date: &str, time: &str, ticket_id: Option<String>) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE bookings SET attended = $1
            WHERE visit_date = $2 AND visit_time = $3 AND ($4::TEXT IS NULL OR ticket_id = $4)
            "#,
        )
        .bind(AttendanceStatus::Attended.as_str())
        .bind(date)
        .bind(time)
        .bind(ticket_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn set_status(&self, ticket_id: &str, status: AttendanceStatus) -> AppResult<u64> {
        let result = sqlx::query("UPDATE bookings SET attended = $1 WHERE ticket_id = $2")
            .bind(status.as_str())
            .bind(ticket_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn set_review(&self, ticket_id: &str, rating: i16, review: &str) -> AppResult<u64> {
        let result = sqlx::query("UPDATE bookings SET rating = $1, review = $2 WHERE ticket_id = $3")
            .bind(rating)
            .bind(review)
            .bind(ticket_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn insert_rating(&self, record: &RatingRecord) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO ratings (
                ticket_id, museum, museum_type, visit_date, visit_time,
                visitor_name, visitor_email, visitor_phone, rating, review, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(&record.ticket_id)
        .bind(&record.museum)
        .bind(&record.museum_type)
        .bind(&record.date)
        .bind(&record.time)
        .bind(&record.visitor_name)
        .bind(&record.visitor_email)
        .bind(&record.visitor_phone)
        .bind(record.rating)
        .bind(&record.review)
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_bookings(&self) -> AppResult<Vec<Booking>> {
        let rows = sqlx::query_as::<_, BookingRow>(
            r#"
            SELECT ticket_id, museum, visit_date, visit_time, people, tour_type,
                   visitor_name, visitor_email, visitor_phone, visitor_age,
                   special_requests, emergency_contact, museum_type, attended, rating, review
            FROM bookings
            ORDER BY crea_date
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Booking::try_from).collect()
    }

    async fn list_ratings(&self) -> AppResult<Vec<RatingRecord>> {
        let rows = sqlx::query_as::<_, RatingRecord>(
            r#"
            SELECT ticket_id, museum, museum_type, visit_date, visit_time,
                   visitor_name, visitor_email, visitor_phone, rating, review, created_at
            FROM ratings
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
