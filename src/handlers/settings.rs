// src/handlers/settings.rs

use axum::{
    extract::{rejection::JsonRejection, State},
    response::IntoResponse,
    Json,
};
use validator::Validate;

use crate::{common::error::AppError, config::AppState, models::settings::{Settings, UpdateSettingsPayload}};

// GET /api/settings
#[utoipa::path(
    get,
    path = "/api/settings",
    tag = "Settings",
    responses(
        (status = 200, description = "Configurações da loja", body = Settings)
    ),
    security(("api_jwt" = []), ("session_cookie" = []))
)]
pub async fn get_settings(State(app_state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let settings = app_state.settings_service.get().await?;
    Ok(Json(settings))
}

// PUT /api/settings
#[utoipa::path(
    put,
    path = "/api/settings",
    tag = "Settings",
    request_body = UpdateSettingsPayload,
    responses(
        (status = 200, description = "Configurações atualizadas", body = Settings),
        (status = 400, description = "Dados inválidos")
    ),
    security(("api_jwt" = []), ("session_cookie" = []))
)]
pub async fn update_settings(
    State(app_state): State<AppState>,
    payload: Result<Json<UpdateSettingsPayload>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;
    payload.validate()?;

    let settings = app_state.settings_service.update(payload).await?;
    Ok(Json(settings))
}
