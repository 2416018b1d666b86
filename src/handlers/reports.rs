// src/handlers/reports.rs

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    response::IntoResponse,
    Json,
};

use crate::{
    common::error::AppError,
    config::AppState,
    models::{
        bill::DateRangeQuery,
        reports::{AnalyticsQuery, AnalyticsRange, DashboardAnalytics, SalesReport},
    },
};

// GET /api/sales-report?startDate=&endDate=
#[utoipa::path(
    get,
    path = "/api/sales-report",
    tag = "Reports",
    params(DateRangeQuery),
    responses(
        (status = 200, description = "Resumo de vendas do período", body = SalesReport),
        (status = 400, description = "Datas ausentes ou inválidas")
    ),
    security(("api_jwt" = []), ("session_cookie" = []))
)]
pub async fn sales_report(
    State(app_state): State<AppState>,
    query: Result<Query<DateRangeQuery>, QueryRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Query(query) = query?;
    let report = app_state
        .report_service
        .sales_report(query.start_date, query.end_date)
        .await?;
    Ok(Json(report))
}

// GET /api/dashboard-analytics?range=1d|7d|30d
#[utoipa::path(
    get,
    path = "/api/dashboard-analytics",
    tag = "Reports",
    params(AnalyticsQuery),
    responses(
        (status = 200, description = "Indicadores do painel", body = DashboardAnalytics),
        (status = 400, description = "Janela inválida")
    ),
    security(("api_jwt" = []), ("session_cookie" = []))
)]
pub async fn dashboard_analytics(
    State(app_state): State<AppState>,
    query: Result<Query<AnalyticsQuery>, QueryRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Query(query) = query?;
    let range = match query.range.as_deref() {
        Some(raw) => raw.parse::<AnalyticsRange>()?,
        None => AnalyticsRange::Week,
    };

    let today = chrono::Utc::now().date_naive();
    let analytics = app_state.report_service.dashboard(range, today).await?;
    Ok(Json(analytics))
}
