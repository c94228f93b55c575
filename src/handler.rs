use std::sync::Arc;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::info;

use crate::config::App;
use crate::db::Database;
use crate::error::ApiError;

pub const LIVENESS_MESSAGE: &str = "Server is Running! Yayyyy!!";

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub expose_errors: bool,
    pub max_page_size: Option<u32>,
}

impl AppState {
    pub fn new(db: Arc<Database>, app: &App) -> Self {
        AppState {
            db,
            expose_errors: app.expose_errors,
            max_page_size: app.max_page_size,
        }
    }

    /// Logs `err` with its full cause chain and turns it into a 500.
    ///
    /// The response carries the chain only when `expose_errors` is set;
    /// otherwise callers see `context`.
    pub fn internal_error(&self, context: &str, err: anyhow::Error) -> ApiError {
        let detail = crate::unpack_error(&*err);
        tracing::error!(error = %detail, "{}", context);
        if self.expose_errors {
            ApiError::Internal(detail)
        } else {
            ApiError::Internal(context.to_string())
        }
    }
}

pub async fn healthcheck() -> &'static str {
    info!("got healthcheck request");
    LIVENESS_MESSAGE
}

pub fn success<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(data)).into_response()
}

pub fn created<T: Serialize>(data: T) -> Response {
    (StatusCode::CREATED, Json(data)).into_response()
}

/// Treats a missing or blank string field as absent.
pub fn required(field: Option<String>, name: &str) -> Result<String, ApiError> {
    match field {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ApiError::bad_request(format!("{name} is required"))),
    }
}
