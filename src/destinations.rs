//! `/destinations` REST handlers over the configured [`Directory`](crate::directory::Directory).
//!
//! | Method | Path | Result |
//! |--------|------|--------|
//! | `GET` | `/destinations` | all destinations, directory order |
//! | `POST` | `/destinations` | `201` + created destination |
//! | `PUT` | `/destinations/{id}` | `200` + message, `404` if unknown |
//! | `DELETE` | `/destinations/{id}` | `200`, `404` if unknown |
//!
//! Malformed JSON is a `400`; a destination that would never dispatch
//! correctly (bad URL, bad method) is a `422` listing every problem.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::config::validation::{validate_destination_url, validate_method};
use crate::directory::{DestinationPatch, NewDestination};
use crate::error::HopperError;
use crate::server::AppState;

enum ApiError {
    BadBody(JsonRejection),
    Invalid(Vec<String>),
    NotFound(String),
    Directory(HopperError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::BadBody(rejection) => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": format!("invalid request body: {rejection}") })),
            )
                .into_response(),
            Self::Invalid(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "error": "invalid destination", "details": errors })),
            )
                .into_response(),
            Self::NotFound(id) => (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": format!("no destination with id '{id}'") })),
            )
                .into_response(),
            Self::Directory(e) => {
                tracing::error!(error = %e, "directory operation failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": e.to_string() })),
                )
                    .into_response()
            }
        }
    }
}

impl From<HopperError> for ApiError {
    fn from(e: HopperError) -> Self {
        Self::Directory(e)
    }
}

fn check_url(url: &str, errors: &mut Vec<String>) {
    if let Err(msg) = validate_destination_url(url) {
        errors.push(format!("url: {msg}"));
    }
}

fn check_method(method: &str, errors: &mut Vec<String>) {
    if let Err((msg, suggestion)) = validate_method(method) {
        match suggestion {
            Some(s) => errors.push(format!("method: {msg} ({s})")),
            None => errors.push(format!("method: {msg}")),
        }
    }
}

fn validate_new(new: &NewDestination) -> Result<(), ApiError> {
    let mut errors = Vec::new();
    if new.is_active || !new.url.is_empty() {
        check_url(&new.url, &mut errors);
    }
    check_method(&new.method, &mut errors);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::Invalid(errors))
    }
}

fn validate_patch(patch: &DestinationPatch) -> Result<(), ApiError> {
    let mut errors = Vec::new();
    if let Some(url) = patch.url.as_deref().filter(|u| !u.is_empty()) {
        check_url(url, &mut errors);
    }
    if let Some(method) = patch.method.as_deref() {
        check_method(method, &mut errors);
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::Invalid(errors))
    }
}

pub async fn list_handler(State(state): State<Arc<AppState>>) -> Response {
    match state.directory.list().await {
        Ok(destinations) => Json(destinations).into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

pub async fn create_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Json<NewDestination>, JsonRejection>,
) -> Response {
    create(&state, body)
        .await
        .unwrap_or_else(IntoResponse::into_response)
}

async fn create(
    state: &AppState,
    body: Result<Json<NewDestination>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(new) = body.map_err(ApiError::BadBody)?;
    validate_new(&new)?;
    let created = state.directory.create(new).await?;
    tracing::info!(
        id = %created.id,
        url = %created.url,
        default = created.is_default,
        "destination added"
    );
    Ok((StatusCode::CREATED, Json(created)).into_response())
}

pub async fn update_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Result<Json<DestinationPatch>, JsonRejection>,
) -> Response {
    update(&state, id, body)
        .await
        .unwrap_or_else(IntoResponse::into_response)
}

async fn update(
    state: &AppState,
    id: String,
    body: Result<Json<DestinationPatch>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(patch) = body.map_err(ApiError::BadBody)?;
    validate_patch(&patch)?;
    let Some(updated) = state.directory.update(&id, patch).await? else {
        return Err(ApiError::NotFound(id));
    };
    tracing::info!(id = %id, default = updated.is_default, "destination updated");
    Ok(Json(json!({
        "message": "Destination updated successfully",
        "destination": updated,
    }))
    .into_response())
}

pub async fn delete_handler(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    match state.directory.delete(&id).await {
        Ok(true) => {
            tracing::info!(id = %id, "destination deleted");
            StatusCode::OK.into_response()
        }
        Ok(false) => ApiError::NotFound(id).into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}
