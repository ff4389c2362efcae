// src/handlers/documents.rs

use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
};

use crate::{
    common::error::ApiError,
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
};

// GET /api/proposals/{id}/pdf
#[utoipa::path(
    get,
    path = "/api/proposals/{id}/pdf",
    tag = "Contracts",
    params(("id" = String, Path, description = "ID da proposta (PROP-...)")),
    responses(
        (status = 200, description = "PDF da proposta", content_type = "application/pdf"),
        (status = 404, description = "Proposta não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn generate_proposal_pdf(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(caller): AuthenticatedUser,
    Path(proposal_id): Path<String>,
) -> Result<Response, ApiError> {
    let (proposal, client) = app_state
        .workflow_service
        .proposal_with_client(&caller, &proposal_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let document = app_state
        .document_service
        .render_proposal(&proposal, &client)
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    // Configura os Headers para o navegador baixar ou mostrar o PDF
    let headers = [
        (header::CONTENT_TYPE, "application/pdf".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", document.file_name),
        ),
    ];

    Ok((headers, document.bytes).into_response())
}
