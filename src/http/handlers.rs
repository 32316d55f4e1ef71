use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

use super::state::AppState;
use crate::entry::{NewEntry, StorageError};
use crate::location::Accuracy;
use crate::session::CaptureError;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct StartCaptureRequest {
    /// Text already present in the note field (defaults to empty)
    pub baseline: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CaptureControlResponse {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct CaptureStatusResponse {
    pub state: crate::session::SessionState,
    pub text: String,
    pub is_final: bool,
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateEntryRequest {
    pub title: Option<String>,
    pub text: String,
    /// Geotag the note with a one-shot location fix
    #[serde(default)]
    pub attach_location: bool,
    /// Accuracy for the fix (default: block-level)
    pub accuracy: Option<Accuracy>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateEntryRequest {
    pub title: Option<String>,
    pub text: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn storage_error_response(e: StorageError) -> axum::response::Response {
    let status = match e {
        StorageError::NotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
        .into_response()
}

// ============================================================================
// Capture Handlers
// ============================================================================

/// POST /capture/start
/// Start a dictation session
pub async fn start_capture(
    State(state): State<AppState>,
    Json(req): Json<StartCaptureRequest>,
) -> impl IntoResponse {
    let baseline = req.baseline.unwrap_or_default();

    match state.start_capture(baseline).await {
        Ok(()) => (
            StatusCode::OK,
            Json(CaptureControlResponse {
                status: "listening".to_string(),
            }),
        )
            .into_response(),
        Err(CaptureError::SessionAlreadyActive) => (
            StatusCode::CONFLICT,
            Json(ErrorResponse {
                error: CaptureError::SessionAlreadyActive.to_string(),
            }),
        )
            .into_response(),
        Err(e) => {
            error!("failed to start capture: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            )
                .into_response()
        }
    }
}

/// POST /capture/stop
/// Stop capturing and wait for the final transcript
pub async fn stop_capture(State(state): State<AppState>) -> impl IntoResponse {
    state.capture.stop().await;
    (
        StatusCode::OK,
        Json(CaptureControlResponse {
            status: "finalizing".to_string(),
        }),
    )
}

/// POST /capture/cancel
/// Abort the session without a terminal transcript
pub async fn cancel_capture(State(state): State<AppState>) -> impl IntoResponse {
    state.capture.cancel().await;
    (
        StatusCode::OK,
        Json(CaptureControlResponse {
            status: "cancelled".to_string(),
        }),
    )
}

/// GET /capture/status
/// Session state plus the live merged text
pub async fn capture_status(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = state.snapshot.read().await;
    Json(CaptureStatusResponse {
        state: state.capture.state().await,
        text: snapshot.text.clone(),
        is_final: snapshot.is_final,
        error: snapshot.error.clone(),
    })
}

// ============================================================================
// Entry Handlers
// ============================================================================

/// GET /entries
/// All saved notes, sorted by date
pub async fn list_entries(State(state): State<AppState>) -> impl IntoResponse {
    match state.entries.find_all().await {
        Ok(entries) => (StatusCode::OK, Json(entries)).into_response(),
        Err(e) => {
            error!("failed to list entries: {}", e);
            storage_error_response(e)
        }
    }
}

/// POST /entries
/// Save a note, optionally geotagged
pub async fn create_entry(
    State(state): State<AppState>,
    Json(req): Json<CreateEntryRequest>,
) -> impl IntoResponse {
    let mut draft = NewEntry {
        title: req.title,
        text: req.text,
        ..NewEntry::default()
    };

    if req.attach_location {
        let accuracy = req.accuracy.unwrap_or(Accuracy::Block);
        match state.location.get_location(accuracy, None).await {
            Ok(fix) => {
                draft.latitude = Some(fix.latitude);
                draft.longitude = Some(fix.longitude);
            }
            Err(e) => {
                error!("location lookup failed: {}", e);
                return (
                    StatusCode::BAD_GATEWAY,
                    Json(ErrorResponse {
                        error: e.to_string(),
                    }),
                )
                    .into_response();
            }
        }
    }

    match state.entries.save(draft).await {
        Ok(entry) => {
            info!("entry saved: {}", entry.id);
            (StatusCode::CREATED, Json(entry)).into_response()
        }
        Err(e) => {
            error!("failed to save entry: {}", e);
            storage_error_response(e)
        }
    }
}

/// PUT /entries/:id
/// Update a note's title and/or text
pub async fn update_entry(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateEntryRequest>,
) -> impl IntoResponse {
    match state.entries.update(id, req.title, req.text).await {
        Ok(entry) => (StatusCode::OK, Json(entry)).into_response(),
        Err(e) => storage_error_response(e),
    }
}

/// DELETE /entries/:id
pub async fn delete_entry(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    match state.entries.delete(id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => storage_error_response(e),
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
