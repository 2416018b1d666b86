// src/handlers/inventory.rs

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    models::medicine::{
        AdjustStockPayload, CreateMedicinePayload, ExpiringQuery, ExpiryEntry, InventoryQuery,
        LowStockQuery, Medicine, UpdateMedicinePayload,
    },
};

// GET /api/inventory?search=
#[utoipa::path(
    get,
    path = "/api/inventory",
    tag = "Inventory",
    params(InventoryQuery),
    responses(
        (status = 200, description = "Lotes em estoque", body = Vec<Medicine>)
    ),
    security(("api_jwt" = []), ("session_cookie" = []))
)]
pub async fn list_medicines(
    State(app_state): State<AppState>,
    query: Result<Query<InventoryQuery>, QueryRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Query(query) = query?;
    let medicines = app_state.inventory_service.list(query.search.as_deref()).await?;
    Ok(Json(medicines))
}

// POST /api/inventory
#[utoipa::path(
    post,
    path = "/api/inventory",
    tag = "Inventory",
    request_body = CreateMedicinePayload,
    responses(
        (status = 201, description = "Lote cadastrado", body = Medicine),
        (status = 400, description = "Dados inválidos ou lote duplicado")
    ),
    security(("api_jwt" = []), ("session_cookie" = []))
)]
pub async fn create_medicine(
    State(app_state): State<AppState>,
    payload: Result<Json<CreateMedicinePayload>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;
    payload.validate()?;

    let medicine = app_state.inventory_service.create(payload).await?;
    Ok((StatusCode::CREATED, Json(medicine)))
}

// GET /api/inventory/{id}
#[utoipa::path(
    get,
    path = "/api/inventory/{id}",
    tag = "Inventory",
    params(("id" = Uuid, Path, description = "ID do lote")),
    responses(
        (status = 200, description = "Lote", body = Medicine),
        (status = 404, description = "Lote não encontrado")
    ),
    security(("api_jwt" = []), ("session_cookie" = []))
)]
pub async fn get_medicine(
    State(app_state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Path(id) = path?;
    let medicine = app_state.inventory_service.get(id).await?;
    Ok(Json(medicine))
}

// PUT /api/inventory/{id}
#[utoipa::path(
    put,
    path = "/api/inventory/{id}",
    tag = "Inventory",
    params(("id" = Uuid, Path, description = "ID do lote")),
    request_body = UpdateMedicinePayload,
    responses(
        (status = 200, description = "Lote atualizado", body = Medicine),
        (status = 400, description = "Dados inválidos, tabletsPerStrip alterado ou lote duplicado"),
        (status = 404, description = "Lote não encontrado")
    ),
    security(("api_jwt" = []), ("session_cookie" = []))
)]
pub async fn update_medicine(
    State(app_state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdateMedicinePayload>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Path(id) = path?;
    let Json(payload) = payload?;
    payload.validate()?;

    let medicine = app_state.inventory_service.update(id, payload).await?;
    Ok(Json(medicine))
}

// DELETE /api/inventory/{id}
#[utoipa::path(
    delete,
    path = "/api/inventory/{id}",
    tag = "Inventory",
    params(("id" = Uuid, Path, description = "ID do lote")),
    responses(
        (status = 200, description = "Lote removido"),
        (status = 404, description = "Lote não encontrado")
    ),
    security(("api_jwt" = []), ("session_cookie" = []))
)]
pub async fn delete_medicine(
    State(app_state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Path(id) = path?;
    app_state.inventory_service.delete(id).await?;
    Ok(Json(json!({ "success": true })))
}

// POST /api/inventory/{id}/adjust-stock
#[utoipa::path(
    post,
    path = "/api/inventory/{id}/adjust-stock",
    tag = "Inventory",
    params(("id" = Uuid, Path, description = "ID do lote")),
    request_body = AdjustStockPayload,
    responses(
        (status = 200, description = "Estoque ajustado", body = Medicine),
        (status = 400, description = "Ajuste zero ou estoque insuficiente"),
        (status = 404, description = "Lote não encontrado")
    ),
    security(("api_jwt" = []), ("session_cookie" = []))
)]
pub async fn adjust_stock(
    State(app_state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<AdjustStockPayload>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Path(id) = path?;
    let Json(payload) = payload?;

    let medicine = app_state
        .inventory_service
        .adjust_stock(id, payload.delta, payload.reason.as_deref())
        .await?;
    Ok(Json(medicine))
}

// GET /api/inventory/low-stock?threshold=
#[utoipa::path(
    get,
    path = "/api/inventory/low-stock",
    tag = "Inventory",
    params(LowStockQuery),
    responses(
        (status = 200, description = "Lotes abaixo do limite", body = Vec<Medicine>)
    ),
    security(("api_jwt" = []), ("session_cookie" = []))
)]
pub async fn low_stock(
    State(app_state): State<AppState>,
    query: Result<Query<LowStockQuery>, QueryRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Query(query) = query?;
    let medicines = app_state.inventory_service.low_stock(query.threshold).await?;
    Ok(Json(medicines))
}

// GET /api/inventory/expiring?days=
#[utoipa::path(
    get,
    path = "/api/inventory/expiring",
    tag = "Inventory",
    params(ExpiringQuery),
    responses(
        (status = 200, description = "Lotes vencidos ou a vencer", body = Vec<ExpiryEntry>)
    ),
    security(("api_jwt" = []), ("session_cookie" = []))
)]
pub async fn expiring(
    State(app_state): State<AppState>,
    query: Result<Query<ExpiringQuery>, QueryRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Query(query) = query?;
    let today = chrono::Utc::now().date_naive();
    let entries = app_state.inventory_service.expiring(query.days, today).await?;
    Ok(Json(entries))
}
