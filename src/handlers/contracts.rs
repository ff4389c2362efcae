// src/handlers/contracts.rs

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::contracts::{Contract, Proposal},
    services::workflow_service::{SignContract, SignedContract},
};

const PDF_DATA_URI_PREFIX: &str = "data:application/pdf;base64,";

#[derive(Debug, Deserialize, ToSchema)]
pub struct SignContractPayload {
    /// PNG da assinatura como data-URI.
    #[serde(rename = "assinatura")]
    #[schema(example = "data:image/png;base64,iVBORw0KGgo...")]
    pub signature: String,
    #[serde(rename = "aceitoTermos", default)]
    pub terms_accepted: bool,
}

// GET /api/proposals
#[utoipa::path(
    get,
    path = "/api/proposals",
    tag = "Contracts",
    responses(
        (status = 200, description = "Propostas derivadas das solicitações", body = Vec<Proposal>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_proposals(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(caller): AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    let loaded = app_state
        .workflow_service
        .list_proposals(&caller)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(loaded))
}

// POST /api/proposals/{id}/accept
#[utoipa::path(
    post,
    path = "/api/proposals/{id}/accept",
    tag = "Contracts",
    params(("id" = String, Path, description = "ID da proposta")),
    responses(
        (status = 201, description = "Contrato criado aguardando assinatura", body = Contract),
        (status = 409, description = "Proposta já aceita ou contrato já existente")
    ),
    security(("api_jwt" = []))
)]
pub async fn accept_proposal(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(caller): AuthenticatedUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let contract = app_state
        .workflow_service
        .accept_proposal(&caller, &id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(contract)))
}

// POST /api/proposals/{id}/decline
#[utoipa::path(
    post,
    path = "/api/proposals/{id}/decline",
    tag = "Contracts",
    params(("id" = String, Path, description = "ID da proposta")),
    responses(
        (status = 200, description = "Proposta recusada", body = Proposal)
    ),
    security(("api_jwt" = []))
)]
pub async fn decline_proposal(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(caller): AuthenticatedUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let proposal = app_state
        .workflow_service
        .decline_proposal(&caller, &id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(proposal))
}

// GET /api/contracts
#[utoipa::path(
    get,
    path = "/api/contracts",
    tag = "Contracts",
    responses(
        (status = 200, description = "Contratos derivados das solicitações", body = Vec<Contract>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_contracts(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(caller): AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    let loaded = app_state
        .workflow_service
        .list_contracts(&caller)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(loaded))
}

// POST /api/contracts/{id}/sign
#[utoipa::path(
    post,
    path = "/api/contracts/{id}/sign",
    tag = "Contracts",
    params(("id" = String, Path, description = "ID do contrato (CONT-...)")),
    request_body = SignContractPayload,
    responses(
        (status = 200, description = "Contrato assinado e projeto criado", body = SignedContract),
        (status = 400, description = "Assinatura vazia ou termos não aceitos"),
        (status = 409, description = "Contrato já assinado")
    ),
    security(("api_jwt" = []))
)]
pub async fn sign_contract(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(caller): AuthenticatedUser,
    Path(id): Path<String>,
    Json(payload): Json<SignContractPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let input = SignContract {
        signature: payload.signature,
        terms_accepted: payload.terms_accepted,
        artifact: None,
    };

    let signed = app_state
        .workflow_service
        .sign_contract(&caller, &id, input)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(signed))
}

// GET /api/contracts/signed/{solicitacaoId}
#[utoipa::path(
    get,
    path = "/api/contracts/signed/{solicitacaoId}",
    tag = "Contracts",
    params(("solicitacaoId" = String, Path, description = "ID da solicitação")),
    responses(
        (status = 200, description = "PDF do contrato assinado", content_type = "application/pdf"),
        (status = 404, description = "Contrato assinado não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn download_signed_contract(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(caller): AuthenticatedUser,
    Path(solicitation_id): Path<String>,
) -> Result<Response, ApiError> {
    let record = app_state
        .workflow_service
        .signed_contract(&caller, &solicitation_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let encoded = record
        .file
        .strip_prefix(PDF_DATA_URI_PREFIX)
        .unwrap_or(&record.file);
    let pdf_bytes = STANDARD
        .decode(encoded)
        .map_err(|e| AppError::Document(format!("arquivo armazenado inválido: {e}")))
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let headers = [
        (header::CONTENT_TYPE, "application/pdf".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", record.file_name),
        ),
    ];

    Ok((headers, pdf_bytes).into_response())
}
