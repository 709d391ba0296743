//! Recommendation and search endpoints

use axum::{extract::State, Json};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::{
    error::{AppError, AppResult},
    models::Museum,
    services::recommendations::{Position, RecommendationSet},
};

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct RecommendationRequest {
    /// Interest keywords, e.g. `["art", "history"]`
    #[serde(default)]
    pub interests: Vec<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    /// Search radius for nearby museums (default 25 km)
    pub radius_km: Option<f64>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct SearchRequest {
    #[serde(default)]
    pub query: String,
}

/// Personalized, popular and nearby museums
#[utoipa::path(
    post,
    path = "/recommendations",
    tag = "recommendations",
    request_body = RecommendationRequest,
    responses(
        (status = 200, description = "Three rankings", body = RecommendationSet),
        (status = 400, description = "Invalid coordinates or radius")
    )
)]
pub async fn recommend(
    State(state): State<crate::AppState>,
    Json(request): Json<RecommendationRequest>,
) -> AppResult<Json<RecommendationSet>> {
    let position = match (request.lat, request.lon) {
        (Some(lat), Some(lon)) => Some(Position::new(lat, lon, request.radius_km)?),
        (None, None) => None,
        _ => {
            return Err(AppError::Validation(
                "lat and lon must be given together".to_string(),
            ))
        }
    };
    let set = state
        .services
        .recommendations
        .recommend(&request.interests, position)
        .await?;
    Ok(Json(set))
}

/// Catalog search by name, city or type
#[utoipa::path(
    post,
    path = "/recommend",
    tag = "recommendations",
    request_body = SearchRequest,
    responses(
        (status = 200, description = "Up to 5 matching museums", body = Vec<Museum>)
    )
)]
pub async fn search(
    State(state): State<crate::AppState>,
    Json(request): Json<SearchRequest>,
) -> AppResult<Json<Vec<Museum>>> {
    Ok(Json(state.services.recommendations.search(&request.query).await?))
}

/// Museums resembling past bookings
#[utoipa::path(
    get,
    path = "/api/personalized-recommendations",
    tag = "recommendations",
    responses(
        (status = 200, description = "Up to 10 museums", body = Vec<Museum>)
    )
)]
pub async fn from_history(State(state): State<crate::AppState>) -> AppResult<Json<Vec<Museum>>> {
    Ok(Json(state.services.recommendations.from_history().await?))
}

/// A few museums of the most booked types
#[utoipa::path(
    get,
    path = "/api/personalized",
    tag = "recommendations",
    responses(
        (status = 200, description = "Up to 5 museums, empty without booking history", body = Vec<Museum>)
    )
)]
pub async fn from_booked_types(State(state): State<crate::AppState>) -> AppResult<Json<Vec<Museum>>> {
    Ok(Json(state.services.recommendations.from_booked_types().await?))
}
