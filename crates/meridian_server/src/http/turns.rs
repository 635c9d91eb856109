use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use meridian_core::{TurnId, TurnStatus};
use meridian_runtime::{TurnRequest, TurnView};
use serde::Serialize;

use super::{ApiError, AppState, CallerId};

#[derive(Debug, Serialize)]
pub struct CreatedTurn {
    pub turn_id: TurnId,
    pub user_turn_id: TurnId,
    pub status: TurnStatus,
}

#[derive(Debug, Serialize)]
pub struct CancelAccepted {
    pub turn_id: TurnId,
    pub status: TurnStatus,
}

/// POST /api/chats/{chat_id}/turns
#[tracing::instrument(skip(state, body), fields(user.id = %caller.0))]
pub async fn create_turn(
    State(state): State<AppState>,
    caller: CallerId,
    Path(chat_id): Path<String>,
    body: Result<Json<TurnRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CreatedTurn>), ApiError> {
    let Json(request) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let handle = state.engine.start_turn(&caller.0, &chat_id, request).await?;

    // Dropping the handle leaves the turn running.
    let created = CreatedTurn {
        turn_id: handle.turn_id.clone(),
        user_turn_id: handle.user_turn_id.clone(),
        status: handle.status,
    };
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /api/turns/{turn_id}
#[tracing::instrument(skip(state), fields(user.id = %caller.0))]
pub async fn get_turn(
    State(state): State<AppState>,
    caller: CallerId,
    Path(turn_id): Path<String>,
) -> Result<Json<TurnView>, ApiError> {
    let view = state.engine.get_turn(&caller.0, &TurnId(turn_id)).await?;
    Ok(Json(view))
}

/// POST /api/turns/{turn_id}/cancel
#[tracing::instrument(skip(state), fields(user.id = %caller.0))]
pub async fn cancel_turn(
    State(state): State<AppState>,
    caller: CallerId,
    Path(turn_id): Path<String>,
) -> Result<(StatusCode, Json<CancelAccepted>), ApiError> {
    let turn_id = TurnId(turn_id);
    let status = state.engine.cancel_turn(&caller.0, &turn_id).await?;
    Ok((StatusCode::ACCEPTED, Json(CancelAccepted { turn_id, status })))
}
