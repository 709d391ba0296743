//! Statistics endpoints

use std::collections::BTreeMap;

use axum::{extract::State, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::AppResult;

use super::AdminSession;

/// Admin analytics response
#[derive(Debug, Serialize, ToSchema)]
pub struct AnalyticsResponse {
    pub booking_stats: BookingStats,
    pub museum_stats: MuseumStats,
}

#[derive(Debug, Default, Serialize, ToSchema)]
pub struct BookingStats {
    /// Ledger rows
    pub total_bookings: usize,
    /// Rows marked `Yes`
    pub attended_bookings: usize,
    /// Mean of recorded ratings, 0.0 when none
    pub avg_rating: f64,
}

#[derive(Debug, Default, Serialize, ToSchema)]
pub struct MuseumStats {
    pub total_museums: usize,
    /// Museum count per type
    pub museums_by_type: BTreeMap<String, usize>,
}

/// Bookings sharing one rating value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct RatingCount {
    #[serde(rename = "Rating")]
    pub rating: i16,
    #[serde(rename = "Count")]
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct DistrictVisitors {
    #[serde(rename = "District")]
    pub district: String,
    #[serde(rename = "TotalVisitors")]
    pub total_visitors: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct MonthlyVisitors {
    #[serde(rename = "Month")]
    pub month: String,
    #[serde(rename = "Visitors")]
    pub visitors: i64,
}

/// Booking and catalog analytics
#[utoipa::path(
    get,
    path = "/api/admin/analytics",
    tag = "stats",
    security(("session" = [])),
    responses(
        (status = 200, description = "Analytics", body = AnalyticsResponse),
        (status = 401, description = "Admin session required")
    )
)]
pub async fn get_analytics(
    State(state): State<crate::AppState>,
    AdminSession(_claims): AdminSession,
) -> AppResult<Json<AnalyticsResponse>> {
    let analytics = state.services.stats.analytics().await?;
    Ok(Json(analytics))
}

/// Number of bookings per rating value, most frequent first
#[utoipa::path(
    get,
    path = "/api/popular",
    tag = "stats",
    responses(
        (status = 200, description = "Rating distribution", body = Vec<RatingCount>)
    )
)]
pub async fn get_rating_distribution(
    State(state): State<crate::AppState>,
) -> AppResult<Json<Vec<RatingCount>>> {
    let distribution = state.services.stats.rating_distribution().await?;
    Ok(Json(distribution))
}

/// Foreign visitor totals by year
#[utoipa::path(
    get,
    path = "/api/foreign-visitors",
    tag = "stats",
    security(("session" = [])),
    responses(
        (status = 200, description = "Totals keyed by year", body = BTreeMap<String, i64>),
        (status = 401, description = "Admin session required")
    )
)]
pub async fn get_foreign_visitors(
    State(state): State<crate::AppState>,
    AdminSession(_claims): AdminSession,
) -> AppResult<Json<BTreeMap<String, i64>>> {
    let totals = state.services.stats.foreign_visitors_by_year().await?;
    Ok(Json(totals))
}

/// Top districts by foreign visitors
#[utoipa::path(
    get,
    path = "/api/foreign-visitors-by-district",
    tag = "stats",
    security(("session" = [])),
    responses(
        (status = 200, description = "Top 10 districts", body = Vec<DistrictVisitors>),
        (status = 401, description = "Admin session required")
    )
)]
pub async fn get_foreign_visitors_by_district(
    State(state): State<crate::AppState>,
    AdminSession(_claims): AdminSession,
) -> AppResult<Json<Vec<DistrictVisitors>>> {
    let districts = state.services.stats.foreign_visitors_by_district().await?;
    Ok(Json(districts))
}

/// Foreign visitors per calendar month
#[utoipa::path(
    get,
    path = "/api/foreign-visitors-monthly",
    tag = "stats",
    security(("session" = [])),
    responses(
        (status = 200, description = "Monthly totals in calendar order", body = Vec<MonthlyVisitors>),
        (status = 401, description = "Admin session required")
    )
)]
pub async fn get_foreign_visitors_monthly(
    State(state): State<crate::AppState>,
    AdminSession(_claims): AdminSession,
) -> AppResult<Json<Vec<MonthlyVisitors>>> {
    let monthly = state.services.stats.foreign_visitors_monthly().await?;
    Ok(Json(monthly))
}
