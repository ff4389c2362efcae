// src/handlers/solicitations.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::{
    common::error::ApiError,
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::{contracts::Proposal, solicitation::Solicitation},
    services::workflow_service::{NewSolicitation, ProposalDraft},
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct ResponsePayload {
    #[serde(rename = "texto")]
    #[schema(example = "Podemos ajustar o prazo?")]
    pub text: String,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct RejectPayload {
    #[serde(rename = "motivo", default)]
    pub reason: Option<String>,
}

// POST /api/solicitations
#[utoipa::path(
    post,
    path = "/api/solicitations",
    tag = "Solicitations",
    request_body = NewSolicitation,
    responses(
        (status = 201, description = "Solicitação criada", body = Solicitation),
        (status = 400, description = "Dados inválidos"),
        (status = 404, description = "Cliente não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_solicitation(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(caller): AuthenticatedUser,
    Json(payload): Json<NewSolicitation>,
) -> Result<impl IntoResponse, ApiError> {
    let created = app_state
        .workflow_service
        .create(&caller, payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(created)))
}

// GET /api/solicitations
#[utoipa::path(
    get,
    path = "/api/solicitations",
    tag = "Solicitations",
    responses(
        (status = 200, description = "Solicitações visíveis a quem chama", body = Vec<Solicitation>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_solicitations(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(caller): AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    let loaded = app_state
        .workflow_service
        .list_solicitations(&caller)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(loaded))
}

// POST /api/solicitations/{id}/review
#[utoipa::path(
    post,
    path = "/api/solicitations/{id}/review",
    tag = "Solicitations",
    params(("id" = String, Path, description = "ID da solicitação")),
    responses(
        (status = 200, description = "Solicitação em análise", body = Solicitation),
        (status = 409, description = "Transição inválida")
    ),
    security(("api_jwt" = []))
)]
pub async fn start_review(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(caller): AuthenticatedUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let updated = app_state
        .workflow_service
        .start_review(&caller, &id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(updated))
}

// POST /api/solicitations/{id}/proposal
#[utoipa::path(
    post,
    path = "/api/solicitations/{id}/proposal",
    tag = "Solicitations",
    params(("id" = String, Path, description = "ID da solicitação")),
    request_body = ProposalDraft,
    responses(
        (status = 201, description = "Proposta enviada", body = Proposal),
        (status = 400, description = "Valor ou descrição inválidos"),
        (status = 409, description = "Estado não aceita proposta")
    ),
    security(("api_jwt" = []))
)]
pub async fn submit_proposal(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(caller): AuthenticatedUser,
    Path(id): Path<String>,
    Json(payload): Json<ProposalDraft>,
) -> Result<impl IntoResponse, ApiError> {
    let proposal = app_state
        .workflow_service
        .submit_proposal(&caller, &id, payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(proposal)))
}

// POST /api/solicitations/{id}/responses
#[utoipa::path(
    post,
    path = "/api/solicitations/{id}/responses",
    tag = "Solicitations",
    params(("id" = String, Path, description = "ID da solicitação")),
    request_body = ResponsePayload,
    responses(
        (status = 200, description = "Mensagem registrada", body = Solicitation)
    ),
    security(("api_jwt" = []))
)]
pub async fn add_response(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(caller): AuthenticatedUser,
    Path(id): Path<String>,
    Json(payload): Json<ResponsePayload>,
) -> Result<impl IntoResponse, ApiError> {
    let updated = app_state
        .workflow_service
        .add_response(&caller, &id, &payload.text)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(updated))
}

// POST /api/solicitations/{id}/reject
#[utoipa::path(
    post,
    path = "/api/solicitations/{id}/reject",
    tag = "Solicitations",
    params(("id" = String, Path, description = "ID da solicitação")),
    request_body = RejectPayload,
    responses(
        (status = 200, description = "Solicitação rejeitada", body = Solicitation),
        (status = 409, description = "Já existe contrato")
    ),
    security(("api_jwt" = []))
)]
pub async fn reject_solicitation(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(caller): AuthenticatedUser,
    Path(id): Path<String>,
    Json(payload): Json<RejectPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let updated = app_state
        .workflow_service
        .reject(&caller, &id, payload.reason)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(updated))
}
