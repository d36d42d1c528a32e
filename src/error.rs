//! Caller-visible failures. Only these two cross the engine boundary:
//! agent failures are absorbed into fallbacks and scenario-resolution
//! ambiguity degrades to the single-round path, both logged internally.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GameError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    InvalidState(&'static str),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for GameError {
    fn into_response(self) -> Response {
        let status = match self {
            GameError::NotFound(_) => StatusCode::NOT_FOUND,
            GameError::InvalidState(_) => StatusCode::CONFLICT,
        };
        (status, Json(ErrorBody { error: self.to_string() })).into_response()
    }
}
