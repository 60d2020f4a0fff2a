use crate::{
    errors::{AppError, ServiceError, INVALID_MEME_ID, INVALID_USER_ID},
    extractors::JsonBody,
    models::{Meme, MemeWithOwner},
    payload::MemeFields,
    AppState,
};
use axum::{
    extract::{rejection::PathRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

/// Path segments that fail to decode are reported like any other malformed id.
fn path_id(path: Result<Path<String>, PathRejection>, message: &str) -> Result<String, AppError> {
    path.map(|Path(id)| id).map_err(|rejection| {
        tracing::debug!(%rejection, "Rejected path id");
        AppError::from(ServiceError::invalid(message))
    })
}

pub async fn index() -> &'static str {
    "API running. Try GET /memes, GET /memes/:id, POST /memes, PUT /memes/:id, DELETE /memes/:id or GET /users/:id/memes"
}

pub async fn list_memes(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<MemeWithOwner>>, AppError> {
    let memes = state.meme_service.list().await?;
    Ok(Json(memes))
}

pub async fn get_meme(
    State(state): State<Arc<AppState>>,
    path: Result<Path<String>, PathRejection>,
) -> Result<Json<Meme>, AppError> {
    let id_str = path_id(path, INVALID_MEME_ID)?;
    tracing::debug!(meme_id = %id_str, "Fetching meme");
    let meme = state.meme_service.get_by_id(&id_str).await?;
    Ok(Json(meme))
}

pub async fn create_meme(
    State(state): State<Arc<AppState>>,
    JsonBody(body): JsonBody,
) -> Result<impl IntoResponse, AppError> {
    let meme = state
        .meme_service
        .create(MemeFields::from_body(&body))
        .await?;
    Ok((StatusCode::CREATED, Json(meme)))
}

pub async fn update_meme(
    State(state): State<Arc<AppState>>,
    path: Result<Path<String>, PathRejection>,
    JsonBody(body): JsonBody,
) -> Result<Json<Meme>, AppError> {
    let id_str = path_id(path, INVALID_MEME_ID)?;
    let meme = state
        .meme_service
        .update(&id_str, MemeFields::from_body(&body))
        .await?;
    Ok(Json(meme))
}

pub async fn delete_meme(
    State(state): State<Arc<AppState>>,
    path: Result<Path<String>, PathRejection>,
) -> Result<Json<Meme>, AppError> {
    let id_str = path_id(path, INVALID_MEME_ID)?;
    let meme = state.meme_service.delete(&id_str).await?;
    Ok(Json(meme))
}

pub async fn memes_by_user(
    State(state): State<Arc<AppState>>,
    path: Result<Path<String>, PathRejection>,
) -> Result<Json<Vec<Meme>>, AppError> {
    let id_str = path_id(path, INVALID_USER_ID)?;
    let memes = state.user_service.memes_by_user(&id_str).await?;
    Ok(Json(memes))
}

/// Fallback for unknown paths and unsupported methods.
pub async fn not_found() -> AppError {
    AppError::RouteNotFound
}
