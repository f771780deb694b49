use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::Deserialize;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Booking, BookingSettings, BookingStatus, Professional};
use crate::state::AppState;

fn check_auth(headers: &HeaderMap, expected_token: &str) -> Result<(), AppError> {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let token = auth.strip_prefix("Bearer ").unwrap_or("");
    if token != expected_token {
        return Err(AppError::Unauthorized);
    }
    Ok(())
}

// GET /api/admin/cards/:card_id/booking-settings
pub async fn get_booking_settings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(card_id): Path<String>,
) -> Result<Json<BookingSettings>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let settings = {
        let db = state.db()?;
        queries::get_booking_settings(&db, &card_id)?
    };
    settings
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("booking settings for card {card_id}")))
}

// PUT /api/admin/cards/:card_id/booking-settings
pub async fn put_booking_settings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(card_id): Path<String>,
    Json(settings): Json<BookingSettings>,
) -> Result<Json<BookingSettings>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    settings
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    {
        let db = state.db()?;
        queries::save_booking_settings(&db, &card_id, &settings)?;
    }

    tracing::info!(
        card_id = %card_id,
        enabled = settings.enabled,
        services = settings.services.len(),
        "booking settings saved"
    );
    Ok(Json(settings))
}

// GET /api/admin/owners/:owner_id/professionals
pub async fn list_professionals(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(owner_id): Path<String>,
) -> Result<Json<Vec<Professional>>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let db = state.db()?;
    Ok(Json(queries::list_professionals(&db, &owner_id)?))
}

// POST /api/admin/owners/:owner_id/professionals
#[derive(Deserialize)]
pub struct NewProfessional {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub image_url: Option<String>,
}

pub async fn add_professional(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(owner_id): Path<String>,
    Json(req): Json<NewProfessional>,
) -> Result<(StatusCode, Json<Professional>), AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let name = req.name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("name is required".to_string()));
    }

    let professional = Professional {
        id: req
            .id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
        name: name.to_string(),
        image_url: req.image_url,
    };

    {
        let db = state.db()?;
        let taken = queries::list_professionals(&db, &owner_id)?
            .iter()
            .any(|p| p.id == professional.id);
        if taken {
            return Err(AppError::Conflict(format!(
                "professional {} already exists",
                professional.id
            )));
        }
        queries::add_professional(&db, &owner_id, &professional)?;
    }

    Ok((StatusCode::CREATED, Json(professional)))
}

// GET /api/admin/owners/:owner_id/bookings
#[derive(Deserialize)]
pub struct BookingsQuery {
    pub status: Option<BookingStatus>,
    pub limit: Option<i64>,
}

pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(owner_id): Path<String>,
    Query(query): Query<BookingsQuery>,
) -> Result<Json<Vec<Booking>>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let limit = query.limit.unwrap_or(50).clamp(1, 500);
    let db = state.db()?;
    Ok(Json(queries::list_bookings(&db, &owner_id, query.status, limit)?))
}

// GET /api/admin/owners/:owner_id/bookings/:booking_id
pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((owner_id, booking_id)): Path<(String, String)>,
) -> Result<Json<Booking>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let booking = {
        let db = state.db()?;
        queries::get_booking_by_id(&db, &booking_id)?
    };
    booking
        .filter(|b| b.record.professional_user_id == owner_id)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("booking {booking_id}")))
}
