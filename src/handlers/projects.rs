// src/handlers/projects.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::{
    common::error::ApiError,
    config::AppState,
    db::Loaded,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::project::Project,
    services::project_service::{NewProject, ProjectUpdate},
};

// GET /api/projects
#[utoipa::path(
    get,
    path = "/api/projects",
    tag = "Projects",
    responses(
        (status = 200, description = "Projetos visíveis a quem chama", body = Vec<Project>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_projects(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(caller): AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    // A equipe lê o retrato do poller; o cliente (e o painel antes da 1ª leitura) vai direto
    let snapshot = if caller.is_staff() {
        app_state.project_poller.latest()
    } else {
        None
    };

    let loaded = match snapshot {
        Some(projects) => {
            let scope = app_state
                .crm_service
                .scope_for(&caller)
                .await
                .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
            Loaded {
                items: projects.iter().filter(|p| scope.admits(*p)).cloned().collect(),
                degraded: false,
            }
        }
        None => app_state
            .project_service
            .list(&caller)
            .await
            .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?,
    };

    Ok(Json(loaded))
}

// POST /api/projects
#[utoipa::path(
    post,
    path = "/api/projects",
    tag = "Projects",
    request_body = NewProject,
    responses(
        (status = 201, description = "Projeto lançado pela equipe", body = Project),
        (status = 400, description = "Título ou cliente ausente, valor negativo"),
        (status = 403, description = "Apenas a equipe lança projetos"),
        (status = 409, description = "Já existe projeto para o contrato")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_project(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(caller): AuthenticatedUser,
    Json(payload): Json<NewProject>,
) -> Result<impl IntoResponse, ApiError> {
    let created = app_state
        .project_service
        .create_project(&caller, payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(created)))
}

// PATCH /api/projects/{id}
#[utoipa::path(
    patch,
    path = "/api/projects/{id}",
    tag = "Projects",
    params(("id" = String, Path, description = "ID do projeto (PROJ-...)")),
    request_body = ProjectUpdate,
    responses(
        (status = 200, description = "Projeto atualizado", body = Project),
        (status = 400, description = "Progresso fora de 0..100"),
        (status = 409, description = "Transição de status inválida")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_project(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(caller): AuthenticatedUser,
    Path(id): Path<String>,
    Json(payload): Json<ProjectUpdate>,
) -> Result<impl IntoResponse, ApiError> {
    let updated = app_state
        .project_service
        .update_project(&caller, &id, payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(updated))
}

// POST /api/projects/{id}/approve
#[utoipa::path(
    post,
    path = "/api/projects/{id}/approve",
    tag = "Projects",
    params(("id" = String, Path, description = "ID do projeto (PROJ-...)")),
    responses(
        (status = 200, description = "Fase aprovada pelo cliente", body = Project),
        (status = 409, description = "Projeto não aguarda aprovação")
    ),
    security(("api_jwt" = []))
)]
pub async fn approve_project(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(caller): AuthenticatedUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let approved = app_state
        .project_service
        .approve_current_phase(&caller, &id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(approved))
}
