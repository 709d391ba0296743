//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{auth, bookings, chat, contact, health, museums, recommendations, stats};

/// Registers the `session` scheme: a bearer token, also accepted from the session cookie
struct SessionSecurity;

impl Modify for SessionSecurity {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "session",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "PixelPast API",
        version = "0.3.0",
        description = "Museum discovery, guided tour booking and museum assistant API",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html"),
        contact(name = "PixelPast Team", email = "contact@pixelpast.org")
    ),
    modifiers(&SessionSecurity),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Bookings
        bookings::book,
        bookings::attend,
        bookings::cancel,
        bookings::review,
        bookings::history,
        bookings::admin_bookings,
        bookings::update_status,
        bookings::admin_ratings,
        // Museums
        museums::list_exhibitions,
        museums::get_filters,
        museums::get_locations,
        museums::admin_list,
        museums::admin_create,
        museums::admin_update,
        museums::admin_delete,
        museums::admin_reconcile,
        // Recommendations
        recommendations::recommend,
        recommendations::search,
        recommendations::from_history,
        recommendations::from_booked_types,
        // Assistant
        chat::chat,
        chat::reset,
        // Contact
        contact::send_contact,
        // Auth
        auth::admin_login,
        auth::admin_register,
        auth::validate_passkey,
        auth::admin_logout,
        auth::list_passkeys,
        auth::create_passkey,
        auth::delete_passkey,
        auth::visitor_register,
        auth::visitor_login,
        auth::visitor_logout,
        auth::visitor_me,
        // Stats
        stats::get_analytics,
        stats::get_rating_distribution,
        stats::get_foreign_visitors,
        stats::get_foreign_visitors_by_district,
        stats::get_foreign_visitors_monthly,
    ),
    components(
        schemas(
            // Bookings
            crate::models::Booking,
            crate::models::NewBooking,
            crate::models::AttendanceStatus,
            crate::models::RatingRecord,
            bookings::BookResponse,
            bookings::AttendRequest,
            bookings::AttendResponse,
            bookings::TicketRequest,
            bookings::ReviewRequest,
            bookings::StatusRequest,
            bookings::MessageResponse,
            // Museums
            crate::models::Museum,
            crate::models::CreateMuseum,
            crate::models::MuseumUpdate,
            crate::models::museum::MuseumFilters,
            crate::services::museums::ReconcileReport,
            // Recommendations
            recommendations::RecommendationRequest,
            recommendations::SearchRequest,
            crate::services::recommendations::RecommendationSet,
            crate::recommend::NearbyMuseum,
            // Assistant
            chat::ChatRequest,
            chat::ChatResponse,
            chat::ChatResetRequest,
            // Contact
            crate::services::email::ContactMessage,
            // Auth
            crate::models::account::LoginRequest,
            crate::models::account::AdminRegistration,
            crate::models::account::VisitorRegistration,
            crate::models::VisitorProfile,
            crate::models::Passkey,
            crate::models::Role,
            auth::LoginResponse,
            auth::PasskeyRequest,
            auth::PasskeyValidation,
            // Stats
            stats::AnalyticsResponse,
            stats::BookingStats,
            stats::MuseumStats,
            stats::RatingCount,
            stats::DistrictVisitors,
            stats::MonthlyVisitors,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
            crate::error::ErrorCode,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "bookings", description = "Tour booking, attendance and reviews"),
        (name = "museums", description = "Museum catalog"),
        (name = "recommendations", description = "Museum recommendations and search"),
        (name = "chat", description = "Museum assistant"),
        (name = "contact", description = "Contact form"),
        (name = "auth", description = "Admin and visitor accounts"),
        (name = "admin", description = "Administration"),
        (name = "stats", description = "Statistics")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_routes() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/book"));
        assert!(doc.paths.paths.contains_key("/api/admin/museums/{id}"));
        assert!(doc
            .components
            .as_ref()
            .is_some_and(|c| c.security_schemes.contains_key("session")));
    }
}
