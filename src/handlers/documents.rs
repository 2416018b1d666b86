// src/handlers/documents.rs

use axum::{
    extract::{rejection::PathRejection, Path, State},
    http::header,
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use crate::{common::error::AppError, config::AppState};

// GET /api/billing/{id}/invoice
#[utoipa::path(
    get,
    path = "/api/billing/{id}/invoice",
    tag = "Billing",
    params(("id" = Uuid, Path, description = "ID da nota")),
    responses(
        (status = 200, description = "Nota fiscal em PDF (application/pdf)"),
        (status = 404, description = "Nota não encontrada")
    ),
    security(("api_jwt" = []), ("session_cookie" = []))
)]
pub async fn invoice_pdf(
    State(app_state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Response, AppError> {
    let Path(id) = path?;
    let (bill, pdf_bytes) = app_state.document_service.invoice_pdf(id).await?;

    // Configura os Headers para o navegador mostrar o PDF
    let headers = [
        (header::CONTENT_TYPE, "application/pdf".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("inline; filename=\"{}.pdf\"", bill.invoice_number()),
        ),
    ];

    Ok((headers, pdf_bytes).into_response())
}
