// src/handlers/billing.rs

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    models::bill::{Bill, CreateBillPayload, DateRangeQuery, UpdateBillPayload},
    services::report_service::start_of_day,
};

// GET /api/billing?startDate=&endDate=
#[utoipa::path(
    get,
    path = "/api/billing",
    tag = "Billing",
    params(DateRangeQuery),
    responses(
        (status = 200, description = "Notas, da mais recente para a mais antiga", body = Vec<Bill>),
        (status = 400, description = "Intervalo de datas inválido")
    ),
    security(("api_jwt" = []), ("session_cookie" = []))
)]
pub async fn list_bills(
    State(app_state): State<AppState>,
    query: Result<Query<DateRangeQuery>, QueryRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Query(query) = query?;

    if let (Some(start), Some(end)) = (query.start_date, query.end_date) {
        if start > end {
            return Err(AppError::BadRequest("startDate must not be after endDate.".to_string()));
        }
    }

    // Intervalo fechado em dias: [início do startDate, início do dia seguinte ao endDate)
    let from = query.start_date.map(start_of_day);
    let to = query.end_date.and_then(|d| d.succ_opt()).map(start_of_day);

    let bills = app_state.billing_service.list_bills(from, to).await?;
    Ok(Json(bills))
}

// POST /api/billing
#[utoipa::path(
    post,
    path = "/api/billing",
    tag = "Billing",
    request_body = CreateBillPayload,
    responses(
        (status = 201, description = "Nota emitida e estoque baixado", body = Bill),
        (status = 400, description = "Carrinho inválido, remédio inexistente ou estoque insuficiente")
    ),
    security(("api_jwt" = []), ("session_cookie" = []))
)]
pub async fn create_bill(
    State(app_state): State<AppState>,
    payload: Result<Json<CreateBillPayload>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;
    payload.validate()?;

    let bill = app_state.billing_service.create_bill(payload).await?;
    Ok((StatusCode::CREATED, Json(bill)))
}

// GET /api/billing/{id}
#[utoipa::path(
    get,
    path = "/api/billing/{id}",
    tag = "Billing",
    params(("id" = Uuid, Path, description = "ID da nota")),
    responses(
        (status = 200, description = "Nota", body = Bill),
        (status = 404, description = "Nota não encontrada")
    ),
    security(("api_jwt" = []), ("session_cookie" = []))
)]
pub async fn get_bill(
    State(app_state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Path(id) = path?;
    let bill = app_state.billing_service.get_bill(id).await?;
    Ok(Json(bill))
}

// PUT /api/billing/{id} (só a flag de impressão é editável)
#[utoipa::path(
    put,
    path = "/api/billing/{id}",
    tag = "Billing",
    params(("id" = Uuid, Path, description = "ID da nota")),
    request_body = UpdateBillPayload,
    responses(
        (status = 200, description = "Nota atualizada", body = Bill),
        (status = 404, description = "Nota não encontrada")
    ),
    security(("api_jwt" = []), ("session_cookie" = []))
)]
pub async fn update_bill(
    State(app_state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdateBillPayload>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Path(id) = path?;
    let Json(payload) = payload?;
    let bill = app_state.billing_service.set_printed(id, payload.is_printed).await?;
    Ok(Json(bill))
}
