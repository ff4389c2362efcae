//src/lib.rs

use axum::{
    routing::{get, patch, post},
    Router,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod common;
pub mod config;
pub mod db;
pub mod docs;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use crate::{config::AppState, docs::ApiDoc};

/// Monta todas as rotas da API. A autenticação é feita pelo extrator `AuthenticatedUser`
/// em cada handler protegido.
pub fn router(app_state: AppState) -> Router {
    let solicitation_routes = Router::new()
        .route(
            "/",
            post(handlers::solicitations::create_solicitation)
                .get(handlers::solicitations::list_solicitations),
        )
        .route("/{id}/review", post(handlers::solicitations::start_review))
        .route("/{id}/proposal", post(handlers::solicitations::submit_proposal))
        .route("/{id}/responses", post(handlers::solicitations::add_response))
        .route("/{id}/reject", post(handlers::solicitations::reject_solicitation));

    let proposal_routes = Router::new()
        .route("/", get(handlers::contracts::list_proposals))
        .route("/{id}/accept", post(handlers::contracts::accept_proposal))
        .route("/{id}/decline", post(handlers::contracts::decline_proposal))
        .route("/{id}/pdf", get(handlers::documents::generate_proposal_pdf));

    let contract_routes = Router::new()
        .route("/", get(handlers::contracts::list_contracts))
        .route("/{id}/sign", post(handlers::contracts::sign_contract))
        .route(
            "/signed/{solicitation_id}",
            get(handlers::contracts::download_signed_contract),
        );

    let project_routes = Router::new()
        .route("/", get(handlers::projects::list_projects).post(handlers::projects::create_project))
        .route("/{id}", patch(handlers::projects::update_project))
        .route("/{id}/approve", post(handlers::projects::approve_project));

    let client_routes = Router::new()
        .route(
            "/",
            post(handlers::crm::create_client).get(handlers::crm::list_clients),
        )
        .route(
            "/{id}",
            get(handlers::crm::get_client).delete(handlers::crm::delete_client),
        )
        .route("/{id}/funnel", patch(handlers::crm::set_funnel_stage))
        .route("/{id}/rating", patch(handlers::crm::rate_client))
        .route(
            "/{id}/services/{service_id}/finalize",
            post(handlers::crm::finalize_service),
        );

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/api/health", get(|| async { "OK" }))
        .route("/api/portfolio", get(handlers::crm::list_portfolio))
        .route(
            "/api/catalog",
            get(handlers::crm::list_catalog).post(handlers::crm::upsert_catalog_entry),
        )
        .nest("/api/solicitations", solicitation_routes)
        .nest("/api/proposals", proposal_routes)
        .nest("/api/contracts", contract_routes)
        .nest("/api/projects", project_routes)
        .nest("/api/clients", client_routes)
        .with_state(app_state)
}
