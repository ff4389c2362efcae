// src/handlers/crm.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::{
        catalog::CatalogService,
        crm::{Client, ContractedService, FunnelStage, NewClient},
        portfolio::{Deliverable, PortfolioItem},
    },
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct FunnelPayload {
    #[serde(rename = "etapaFunil")]
    pub stage: FunnelStage,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RatingPayload {
    #[schema(example = 4)]
    pub rating: i64,
}

// =============================================================================
//  ÁREA 1: CLIENTES
// =============================================================================

// POST /api/clients
#[utoipa::path(
    post,
    path = "/api/clients",
    tag = "CRM",
    request_body = NewClient,
    responses(
        (status = 201, description = "Cliente cadastrado", body = Client),
        (status = 400, description = "Dados inválidos"),
        (status = 409, description = "Email já cadastrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_client(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(caller): AuthenticatedUser,
    Json(payload): Json<NewClient>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let created = app_state
        .crm_service
        .create_client(&caller, payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(created)))
}

// GET /api/clients
#[utoipa::path(
    get,
    path = "/api/clients",
    tag = "CRM",
    responses(
        (status = 200, description = "Clientes da carteira", body = Vec<Client>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_clients(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(caller): AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    let loaded = app_state
        .crm_service
        .list_clients(&caller)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(loaded))
}

// GET /api/clients/{id}
#[utoipa::path(
    get,
    path = "/api/clients/{id}",
    tag = "CRM",
    params(("id" = String, Path, description = "ID do cliente")),
    responses(
        (status = 200, description = "Cliente", body = Client),
        (status = 404, description = "Cliente não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_client(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(caller): AuthenticatedUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let client = app_state
        .crm_service
        .get_client(&caller, &id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(client))
}

// DELETE /api/clients/{id}
#[utoipa::path(
    delete,
    path = "/api/clients/{id}",
    tag = "CRM",
    params(("id" = String, Path, description = "ID do cliente")),
    responses(
        (status = 204, description = "Cliente removido"),
        (status = 403, description = "Sem permissão")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_client(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(caller): AuthenticatedUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .crm_service
        .delete_client(&caller, &id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}

// PATCH /api/clients/{id}/funnel
#[utoipa::path(
    patch,
    path = "/api/clients/{id}/funnel",
    tag = "CRM",
    params(("id" = String, Path, description = "ID do cliente")),
    request_body = FunnelPayload,
    responses(
        (status = 200, description = "Etapa do funil atualizada", body = Client),
        (status = 400, description = "Regressão de etapa")
    ),
    security(("api_jwt" = []))
)]
pub async fn set_funnel_stage(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(caller): AuthenticatedUser,
    Path(id): Path<String>,
    Json(payload): Json<FunnelPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let updated = app_state
        .crm_service
        .set_funnel_stage(&caller, &id, payload.stage)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(updated))
}

// PATCH /api/clients/{id}/rating
#[utoipa::path(
    patch,
    path = "/api/clients/{id}/rating",
    tag = "CRM",
    params(("id" = String, Path, description = "ID do cliente")),
    request_body = RatingPayload,
    responses(
        (status = 200, description = "Avaliação registrada", body = Client),
        (status = 400, description = "Avaliação fora de 0..5")
    ),
    security(("api_jwt" = []))
)]
pub async fn rate_client(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(caller): AuthenticatedUser,
    Path(id): Path<String>,
    Json(payload): Json<RatingPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let updated = app_state
        .crm_service
        .rate_client(&caller, &id, payload.rating)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(updated))
}

// =============================================================================
//  ÁREA 2: ENTREGAS E PORTFÓLIO
// =============================================================================

// POST /api/clients/{id}/services/{serviceId}/finalize
#[utoipa::path(
    post,
    path = "/api/clients/{id}/services/{serviceId}/finalize",
    tag = "CRM",
    params(
        ("id" = String, Path, description = "ID do cliente"),
        ("serviceId" = String, Path, description = "ID do serviço contratado (SRV-...)")
    ),
    request_body = Deliverable,
    responses(
        (status = 200, description = "Serviço finalizado", body = ContractedService),
        (status = 409, description = "Serviço já finalizado ou pausado")
    ),
    security(("api_jwt" = []))
)]
pub async fn finalize_service(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(caller): AuthenticatedUser,
    Path((client_id, service_id)): Path<(String, String)>,
    Json(payload): Json<Deliverable>,
) -> Result<impl IntoResponse, ApiError> {
    let finished = app_state
        .portfolio_service
        .finalize_service(&caller, &client_id, &service_id, payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(finished))
}

// GET /api/portfolio
#[utoipa::path(
    get,
    path = "/api/portfolio",
    tag = "CRM",
    responses(
        (status = 200, description = "Vitrine pública", body = Vec<PortfolioItem>)
    )
)]
pub async fn list_portfolio(
    State(app_state): State<AppState>,
    locale: Locale,
) -> Result<impl IntoResponse, ApiError> {
    let items = app_state
        .portfolio_service
        .list()
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(items))
}

// =============================================================================
//  ÁREA 3: CATÁLOGO
// =============================================================================

// GET /api/catalog
#[utoipa::path(
    get,
    path = "/api/catalog",
    tag = "CRM",
    responses(
        (status = 200, description = "Serviços ativos do catálogo", body = Vec<CatalogService>)
    )
)]
pub async fn list_catalog(
    State(app_state): State<AppState>,
    locale: Locale,
) -> Result<impl IntoResponse, ApiError> {
    let entries = app_state
        .catalog_service
        .list()
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(entries))
}

// POST /api/catalog
#[utoipa::path(
    post,
    path = "/api/catalog",
    tag = "CRM",
    request_body = CatalogService,
    responses(
        (status = 201, description = "Serviço salvo no catálogo", body = CatalogService),
        (status = 400, description = "Dados inválidos")
    ),
    security(("api_jwt" = []))
)]
pub async fn upsert_catalog_entry(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(caller): AuthenticatedUser,
    Json(payload): Json<CatalogService>,
) -> Result<impl IntoResponse, ApiError> {
    let saved = app_state
        .catalog_service
        .upsert(&caller, payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(saved)))
}
