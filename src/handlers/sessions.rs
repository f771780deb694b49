use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::{InitialData, SessionEdit};
use crate::services::flow::{BookingFlow, FlowConfig, FlowView, NextOutcome, SubmitOutcome};
use crate::services::sessions::{LogHost, SessionEntry};
use crate::state::AppState;

fn lookup(state: &AppState, id: &str) -> Result<Arc<SessionEntry>, AppError> {
    state
        .sessions
        .get(id)
        .ok_or_else(|| AppError::NotFound(format!("booking session {id}")))
}

// POST /api/cards/:card_id/sessions
#[derive(Deserialize)]
pub struct CreateSessionRequest {
    pub owner_id: String,
    #[serde(default)]
    pub inline_mode: bool,
    #[serde(default)]
    pub initial_step: Option<usize>,
    #[serde(default)]
    pub initial_data: InitialData,
}

#[derive(Serialize)]
pub struct SessionResponse {
    session_id: String,
    view: FlowView,
}

pub async fn create_session(
    State(state): State<Arc<AppState>>,
    Path(card_id): Path<String>,
    Json(req): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<SessionResponse>), AppError> {
    if req.owner_id.trim().is_empty() {
        return Err(AppError::BadRequest("owner_id is required".to_string()));
    }
    state.sessions.expire_idle();

    let session_id = uuid::Uuid::new_v4().to_string();
    let config = FlowConfig {
        card_id,
        owner_id: req.owner_id,
        inline_mode: req.inline_mode,
        initial_step: req.initial_step.unwrap_or(1),
        initial_data: req.initial_data,
    };
    let host = Arc::new(LogHost {
        session_id: session_id.clone(),
    });

    let mut flow = BookingFlow::start(config, state.ports(), host).await;
    let view = flow.view();
    state.sessions.insert(session_id.clone(), flow);

    tracing::info!(session_id = %session_id, settings = view.settings_state, "booking session opened");
    Ok((StatusCode::CREATED, Json(SessionResponse { session_id, view })))
}

// GET /api/sessions/:id
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SessionResponse>, AppError> {
    let entry = lookup(&state, &id)?;
    let view = entry.flow.lock().await.view();
    Ok(Json(SessionResponse {
        session_id: id,
        view,
    }))
}

// PATCH /api/sessions/:id
pub async fn update_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(edit): Json<SessionEdit>,
) -> Result<Json<SessionResponse>, AppError> {
    if edit.is_empty() {
        return Err(AppError::BadRequest("no fields to update".to_string()));
    }
    let entry = lookup(&state, &id)?;
    let mut flow = entry.flow.lock().await;
    if !flow.edit(edit) {
        return Err(AppError::Conflict(format!(
            "booking session {id} can no longer be edited"
        )));
    }
    Ok(Json(SessionResponse {
        session_id: id,
        view: flow.view(),
    }))
}

// POST /api/sessions/:id/next
#[derive(Serialize)]
pub struct NextResponse {
    result: NextOutcome,
    view: FlowView,
}

pub async fn next_step(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<NextResponse>, AppError> {
    let entry = lookup(&state, &id)?;
    let mut flow = entry.flow.lock().await;
    let result = flow.next();
    Ok(Json(NextResponse {
        result,
        view: flow.view(),
    }))
}

// POST /api/sessions/:id/prev
pub async fn prev_step(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SessionResponse>, AppError> {
    let entry = lookup(&state, &id)?;
    let mut flow = entry.flow.lock().await;
    flow.prev();
    Ok(Json(SessionResponse {
        session_id: id,
        view: flow.view(),
    }))
}

// POST /api/sessions/:id/submit
#[derive(Serialize)]
pub struct SubmitResponse {
    result: SubmitOutcome,
    view: FlowView,
}

pub async fn submit(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SubmitResponse>, AppError> {
    let entry = lookup(&state, &id)?;

    // Unlocked while the write runs; other requests observe `is_submitting`.
    let prepared = {
        let mut flow = entry.flow.lock().await;
        match flow.begin_submit() {
            Ok(prepared) => prepared,
            Err(result) => {
                return Ok(Json(SubmitResponse {
                    result,
                    view: flow.view(),
                }))
            }
        }
    };

    // finish_submit must run even if the client goes away.
    let task = tokio::spawn(async move {
        let result = prepared.run().await;
        let mut flow = entry.flow.lock().await;
        let result = flow.finish_submit(result);
        SubmitResponse {
            result,
            view: flow.view(),
        }
    });

    let response = task
        .await
        .map_err(|e| AppError::Database(anyhow::anyhow!("submission task failed: {e}")))?;
    Ok(Json(response))
}

// DELETE /api/sessions/:id
pub async fn close_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let entry = state
        .sessions
        .remove(&id)
        .ok_or_else(|| AppError::NotFound(format!("booking session {id}")))?;
    entry.flow.lock().await.close();
    Ok(StatusCode::NO_CONTENT)
}
