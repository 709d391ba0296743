//! Museum catalog endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{Map, Value};

use crate::{
    error::AppResult,
    models::{museum::MuseumFilters, CreateMuseum, Listing, Museum, MuseumUpdate, PageQuery, Pagination},
    services::museums::ReconcileReport,
};

use super::AdminSession;

/// Default page size of the public museum list
const EXHIBITIONS_PER_PAGE: i64 = 9;
const ADMIN_MUSEUMS_PER_PAGE: i64 = 20;

/// Museum list for browsing and search
#[utoipa::path(
    get,
    path = "/api/exhibitions",
    tag = "museums",
    params(PageQuery),
    responses(
        (status = 200, description = "All museums, or one page when page/per_page is given", body = Vec<Museum>)
    )
)]
pub async fn list_exhibitions(
    State(state): State<crate::AppState>,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<Listing<Museum>>> {
    let pagination = Pagination::from_query(&query, EXHIBITIONS_PER_PAGE);
    Ok(Json(state.services.museums.list_paginated(pagination).await?))
}

/// Distinct cities and types
#[utoipa::path(
    get,
    path = "/api/museum-filters",
    tag = "museums",
    responses(
        (status = 200, description = "Filter values", body = MuseumFilters)
    )
)]
pub async fn get_filters(State(state): State<crate::AppState>) -> AppResult<Json<MuseumFilters>> {
    Ok(Json(state.services.museums.filters().await?))
}

/// Museums that can be placed on a map
#[utoipa::path(
    get,
    path = "/api/museum-locations",
    tag = "museums",
    responses(
        (status = 200, description = "Museums with coordinates", body = Vec<Museum>)
    )
)]
pub async fn get_locations(State(state): State<crate::AppState>) -> AppResult<Json<Vec<Museum>>> {
    Ok(Json(state.services.museums.locations().await?))
}

/// Museum list (admin)
#[utoipa::path(
    get,
    path = "/api/admin/museums",
    tag = "admin",
    security(("session" = [])),
    params(PageQuery),
    responses(
        (status = 200, description = "Museums, newest first", body = Vec<Museum>),
        (status = 401, description = "Admin session required")
    )
)]
pub async fn admin_list(
    State(state): State<crate::AppState>,
    AdminSession(_claims): AdminSession,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<Listing<Museum>>> {
    let pagination = Pagination::from_query(&query, ADMIN_MUSEUMS_PER_PAGE);
    Ok(Json(state.services.museums.list_paginated(pagination).await?))
}

/// Add a museum (admin)
#[utoipa::path(
    post,
    path = "/api/admin/museums",
    tag = "admin",
    security(("session" = [])),
    request_body = CreateMuseum,
    responses(
        (status = 201, description = "Museum created", body = Museum),
        (status = 400, description = "Name missing"),
        (status = 401, description = "Admin session required")
    )
)]
pub async fn admin_create(
    State(state): State<crate::AppState>,
    AdminSession(claims): AdminSession,
    Json(request): Json<CreateMuseum>,
) -> AppResult<(StatusCode, Json<Museum>)> {
    let museum = state.services.museums.create(request).await?;
    tracing::info!(admin = %claims.username, id = %museum.id, "Museum created");
    Ok((StatusCode::CREATED, Json(museum)))
}

/// Edit a museum (admin)
#[utoipa::path(
    put,
    path = "/api/admin/museums/{id}",
    tag = "admin",
    security(("session" = [])),
    params(("id" = String, Path, description = "Museum ID")),
    request_body = MuseumUpdate,
    responses(
        (status = 200, description = "Updated museum", body = Museum),
        (status = 400, description = "No editable field given"),
        (status = 401, description = "Admin session required"),
        (status = 404, description = "Museum not found")
    )
)]
pub async fn admin_update(
    State(state): State<crate::AppState>,
    AdminSession(claims): AdminSession,
    Path(id): Path<String>,
    Json(data): Json<Map<String, Value>>,
) -> AppResult<Json<Museum>> {
    let museum = state.services.museums.update(&id, &data).await?;
    tracing::info!(admin = %claims.username, id = %museum.id, "Museum updated");
    Ok(Json(museum))
}

/// Remove a museum (admin)
#[utoipa::path(
    delete,
    path = "/api/admin/museums/{id}",
    tag = "admin",
    security(("session" = [])),
    params(("id" = String, Path, description = "Museum ID")),
    responses(
        (status = 204, description = "Museum deleted"),
        (status = 401, description = "Admin session required"),
        (status = 404, description = "Museum not found")
    )
)]
pub async fn admin_delete(
    State(state): State<crate::AppState>,
    AdminSession(claims): AdminSession,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    state.services.museums.delete(&id).await?;
    tracing::info!(admin = %claims.username, id = %id, "Museum deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Move museums held in the fallback file into the primary store (admin)
#[utoipa::path(
    post,
    path = "/api/admin/museums/reconcile",
    tag = "admin",
    security(("session" = [])),
    responses(
        (status = 200, description = "Reconciliation report", body = ReconcileReport),
        (status = 401, description = "Admin session required"),
        (status = 503, description = "Primary store still unavailable")
    )
)]
pub async fn admin_reconcile(
    State(state): State<crate::AppState>,
    AdminSession(_claims): AdminSession,
) -> AppResult<Json<ReconcileReport>> {
    Ok(Json(state.services.museums.reconcile().await?))
}
