pub mod admin;
pub mod health;
pub mod sessions;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/api/cards/:card_id/sessions", post(sessions::create_session))
        .route(
            "/api/sessions/:id",
            get(sessions::get_session)
                .patch(sessions::update_session)
                .delete(sessions::close_session),
        )
        .route("/api/sessions/:id/next", post(sessions::next_step))
        .route("/api/sessions/:id/prev", post(sessions::prev_step))
        .route("/api/sessions/:id/submit", post(sessions::submit))
        .route(
            "/api/admin/cards/:card_id/booking-settings",
            get(admin::get_booking_settings).put(admin::put_booking_settings),
        )
        .route(
            "/api/admin/owners/:owner_id/professionals",
            get(admin::list_professionals).post(admin::add_professional),
        )
        .route(
            "/api/admin/owners/:owner_id/bookings",
            get(admin::list_bookings),
        )
        .route(
            "/api/admin/owners/:owner_id/bookings/:booking_id",
            get(admin::get_booking),
        )
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
