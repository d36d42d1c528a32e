//! HTTP endpoint handlers. Thin wrappers that forward to the engine; the
//! per-session mutex is held across a whole submission so concurrent
//! requests against one session are serialized here.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::GameError;
use crate::protocol::*;
use crate::state::AppState;

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse {
    Json(HealthOut { ok: true })
}

#[instrument(level = "info", skip(state))]
pub async fn http_list_scenarios(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(ScenariosOut { scenarios: state.engine.list_scenarios() })
}

#[instrument(level = "info", skip(state), fields(%id, locale = %q.locale))]
pub async fn http_get_scenario(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(q): Query<ScenarioQuery>,
) -> Result<Json<ScenarioOut>, GameError> {
    let scenario = state.engine.get_scenario(&id).ok_or(GameError::NotFound("scenario"))?;
    Ok(Json(ScenarioOut {
        id,
        title: scenario.title(q.locale).to_string(),
        background: scenario.background(q.locale).to_string(),
        teen_opening: scenario.teen_opening(q.locale).to_string(),
        round_count: scenario.max_rounds(),
        is_multi_round: scenario.is_multi_round(),
    }))
}

#[instrument(level = "info", skip(state), fields(scenario = q.scenario.as_deref().unwrap_or("<default>"), locale = %q.locale))]
pub async fn http_start_game(
    State(state): State<Arc<AppState>>,
    Query(q): Query<StartQuery>,
) -> Result<Json<StartOut>, GameError> {
    let game_state = state
        .engine
        .create_game_state(q.scenario.as_deref(), q.locale)
        .ok_or(GameError::NotFound("scenario"))?;

    let session_id = Uuid::new_v4().to_string();
    let out = start_out(session_id.clone(), &game_state);
    state.sessions.put(&session_id, game_state);
    info!(target: "roleplay", %session_id, "Game session started");
    Ok(Json(out))
}

#[instrument(level = "info", skip(state, body), fields(%session_id, answer_len = body.parent_response.len()))]
pub async fn http_respond(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Json(body): Json<RespondIn>,
) -> Result<Json<GameView>, GameError> {
    let session = state.sessions.get(&session_id).ok_or(GameError::NotFound("session"))?;
    let mut game_state = session.lock().await;
    state
        .engine
        .process_parent_response(&mut game_state, &body.parent_response)
        .await?;
    info!(target: "roleplay", %session_id, completed = game_state.game_completed, "Submission processed");
    Ok(Json(game_view(&game_state)))
}

#[instrument(level = "info", skip(state), fields(%session_id))]
pub async fn http_advance_round(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<GameView>, GameError> {
    let session = state.sessions.get(&session_id).ok_or(GameError::NotFound("session"))?;
    let mut game_state = session.lock().await;
    state.engine.advance_round(&mut game_state);
    Ok(Json(game_view(&game_state)))
}

#[instrument(level = "info", skip(state), fields(%session_id))]
pub async fn http_end_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<EndOut>, GameError> {
    if !state.sessions.delete(&session_id) {
        return Err(GameError::NotFound("session"));
    }
    info!(target: "roleplay", %session_id, "Game session ended");
    Ok(Json(EndOut { ended: true }))
}
