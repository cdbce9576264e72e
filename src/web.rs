use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::board::Position;
use crate::config::{GateMode, ServerConfig};
use crate::game::{GameError, GameSession, Outcome, Snapshot};

/// One game shared by every request; the lock serialises move attempts.
#[derive(Clone)]
pub struct AppState {
    game: Arc<Mutex<GameSession>>,
}

#[derive(Serialize, Deserialize)]
pub struct NewGameRequest {
    #[serde(default)]
    mode: Option<String>,
}

#[derive(Serialize, Deserialize)]
pub struct ClickRequest {
    row: usize,
    col: usize,
}

#[derive(Serialize, Deserialize)]
pub struct PermissionRequest {
    granted: bool,
}

#[derive(Serialize, Deserialize)]
pub struct AnswerRequest {
    /// `null` cancels the prompt.
    #[serde(default)]
    answer: Option<String>,
}

#[derive(Serialize)]
pub struct ActionResponse {
    outcome: Option<Outcome>,
    state: Snapshot,
}

impl AppState {
    pub fn new(game: GameSession) -> Self {
        AppState {
            game: Arc::new(Mutex::new(game)),
        }
    }
}

fn string_to_mode(s: &str) -> Option<GateMode> {
    match s.to_lowercase().as_str() {
        "permission" => Some(GateMode::Permission),
        "unlock" => Some(GateMode::Unlock),
        _ => None,
    }
}

fn error_response(err: GameError, state: Snapshot) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({
            "error": err.to_string(),
            "state": state,
        })),
    )
        .into_response()
}

fn action_response(result: Result<Option<Outcome>, GameError>, game: &GameSession) -> Response {
    match result {
        Ok(outcome) => Json(ActionResponse {
            outcome,
            state: game.snapshot(),
        })
        .into_response(),
        Err(err) => error_response(err, game.snapshot()),
    }
}

async fn new_game(State(app_state): State<AppState>, Json(req): Json<NewGameRequest>) -> Response {
    let mut game = app_state.game.lock().await;
    match req.mode.as_deref().map(string_to_mode) {
        Some(Some(mode)) => game.reset_with_mode(mode),
        Some(None) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({
                    "error": "Unknown mode, expected \"permission\" or \"unlock\""
                })),
            )
                .into_response();
        }
        None => game.reset(),
    }
    Json(game.snapshot()).into_response()
}

async fn click(State(app_state): State<AppState>, Json(req): Json<ClickRequest>) -> Response {
    let mut game = app_state.game.lock().await;
    let result = game
        .select_or_attempt_move(Position::new(req.row, req.col))
        .map(Some);
    action_response(result, &game)
}

async fn forfeit(State(app_state): State<AppState>) -> Response {
    let mut game = app_state.game.lock().await;
    let result = game.forfeit_turn().map(|_| None);
    action_response(result, &game)
}

async fn permission(
    State(app_state): State<AppState>,
    Json(req): Json<PermissionRequest>,
) -> Response {
    let mut game = app_state.game.lock().await;
    let result = if req.granted {
        game.grant_permission()
    } else {
        game.refuse_permission()
    };
    action_response(result.map(|_| None), &game)
}

async fn answer(State(app_state): State<AppState>, Json(req): Json<AnswerRequest>) -> Response {
    let mut game = app_state.game.lock().await;
    let result = game.answer(req.answer.as_deref()).map(Some);
    action_response(result, &game)
}

async fn get_game_state(State(app_state): State<AppState>) -> Json<Snapshot> {
    let game = app_state.game.lock().await;
    Json(game.snapshot())
}

pub fn router(app_state: AppState, static_dir: &Path) -> Router {
    Router::new()
        .route("/api/new-game", post(new_game))
        .route("/api/click", post(click))
        .route("/api/forfeit", post(forfeit))
        .route("/api/permission", post(permission))
        .route("/api/answer", post(answer))
        .route("/api/game-state", get(get_game_state))
        .fallback_service(ServeDir::new(static_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

pub async fn run_server(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let bank = config.challenge_bank()?;
    info!(
        challenges = bank.challenges.len(),
        free = bank.free.len(),
        "challenge bank loaded"
    );
    let app_state = AppState::new(GameSession::new(config.mode, bank));
    let app = router(app_state, &config.static_dir);

    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    info!(addr = %config.bind, mode = config.mode.name(), "server listening");

    axum::serve(listener, app).await?;
    Ok(())
}
