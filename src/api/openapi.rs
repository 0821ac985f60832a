//! OpenAPI documentation

use axum::Router;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{auth, books, circulation, health, reports};

/// Registers the bearer token scheme referenced by the protected paths.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
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
        title = "Aklatan API",
        version = "0.3.0",
        description = "Library circulation REST API",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    modifiers(&SecurityAddon),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Auth
        auth::signup,
        auth::login,
        auth::me,
        // Books
        books::list_books,
        books::get_book,
        books::get_availability,
        books::create_book,
        books::update_book,
        books::delete_book,
        books::list_favorites,
        books::add_favorite,
        books::remove_favorite,
        // Circulation
        circulation::add_to_cart,
        circulation::remove_from_cart,
        circulation::get_cart,
        circulation::request_borrow,
        circulation::direct_borrow,
        circulation::list_requests,
        circulation::approve_request,
        circulation::list_pickups,
        circulation::confirm_pickup,
        circulation::list_loans,
        circulation::list_transactions,
        circulation::list_activity,
        circulation::run_sweep,
        // Reports
        reports::get_dashboard,
        reports::get_trends,
    ),
    components(
        schemas(
            // Auth
            crate::models::user::SignupRequest,
            crate::models::user::LoginRequest,
            crate::models::user::AuthResponse,
            crate::models::user::Profile,
            crate::models::user::Role,
            // Books
            crate::models::book::Book,
            crate::models::book::BookWithAvailability,
            crate::models::book::AvailabilitySplit,
            crate::models::book::BookQuery,
            crate::models::book::CreateBook,
            crate::models::book::UpdateBook,
            // Circulation
            crate::models::circulation::CartStatus,
            crate::models::circulation::RequestStatus,
            crate::models::circulation::TransactionStatus,
            crate::models::circulation::ActivityStatus,
            crate::models::circulation::CartEntry,
            crate::models::circulation::CartItemDetails,
            crate::models::circulation::BorrowRequest,
            crate::models::circulation::RequestDetails,
            crate::models::circulation::PickupDetails,
            crate::models::circulation::TransactionDetails,
            crate::models::circulation::ActivityDetails,
            crate::models::circulation::IssuedLoan,
            crate::models::circulation::SweepOutcome,
            circulation::CartRequest,
            circulation::BorrowRequestBody,
            circulation::ConfirmPickupRequest,
            // Reports
            reports::DashboardSummary,
            reports::MonthlyTrend,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Authentication endpoints"),
        (name = "books", description = "Catalog and favorites"),
        (name = "circulation", description = "Borrow pipeline: cart, requests, pickups, loans"),
        (name = "reports", description = "Dashboard and trends")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new().merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
