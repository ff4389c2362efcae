// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;
use crate::services;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Solicitations ---
        handlers::solicitations::create_solicitation,
        handlers::solicitations::list_solicitations,
        handlers::solicitations::start_review,
        handlers::solicitations::submit_proposal,
        handlers::solicitations::add_response,
        handlers::solicitations::reject_solicitation,

        // --- Contracts ---
        handlers::contracts::list_proposals,
        handlers::contracts::accept_proposal,
        handlers::contracts::decline_proposal,
        handlers::contracts::list_contracts,
        handlers::contracts::sign_contract,
        handlers::contracts::download_signed_contract,
        handlers::documents::generate_proposal_pdf,

        // --- Projects ---
        handlers::projects::list_projects,
        handlers::projects::create_project,
        handlers::projects::update_project,
        handlers::projects::approve_project,

        // --- CRM ---
        handlers::crm::create_client,
        handlers::crm::list_clients,
        handlers::crm::get_client,
        handlers::crm::delete_client,
        handlers::crm::set_funnel_stage,
        handlers::crm::rate_client,
        handlers::crm::finalize_service,
        handlers::crm::list_portfolio,
        handlers::crm::list_catalog,
        handlers::crm::upsert_catalog_entry,
    ),
    components(
        schemas(
            // --- Auth ---
            models::auth::Role,

            // --- Solicitations ---
            models::solicitation::SolicitationStatus,
            models::solicitation::ProposalStatus,
            models::solicitation::ContractStatus,
            models::solicitation::ResponseAuthor,
            models::solicitation::SolicitationResponse,
            models::solicitation::QuotedService,
            models::solicitation::EmbeddedProposal,
            models::solicitation::EmbeddedContract,
            models::solicitation::Solicitation,

            // --- Contracts ---
            models::contracts::Proposal,
            models::contracts::Contract,
            models::contracts::SignedContractRecord,

            // --- Projects ---
            models::project::ProjectStatus,
            models::project::Project,

            // --- CRM ---
            models::crm::ClientStatus,
            models::crm::FunnelStage,
            models::crm::ServiceStatus,
            models::crm::DocumentKind,
            models::crm::ContractedService,
            models::crm::ClientDocument,
            models::crm::Interaction,
            models::crm::Client,
            models::crm::NewClient,
            models::catalog::CatalogService,
            models::portfolio::PortfolioItem,
            models::portfolio::Deliverable,
            models::notification::NotificationKind,
            models::notification::Notification,

            // --- Payloads ---
            services::workflow_service::NewSolicitation,
            services::workflow_service::ProposalDraft,
            services::workflow_service::SignedContract,
            services::project_service::ProjectUpdate,
            services::project_service::NewProject,
            services::transition::TransitionReport,
            handlers::solicitations::ResponsePayload,
            handlers::solicitations::RejectPayload,
            handlers::contracts::SignContractPayload,
            handlers::crm::FunnelPayload,
            handlers::crm::RatingPayload,
        )
    ),
    tags(
        (name = "Solicitations", description = "Pedidos de serviço e propostas"),
        (name = "Contracts", description = "Aceite, assinatura e documentos"),
        (name = "Projects", description = "Acompanhamento de projetos"),
        (name = "CRM", description = "Clientes, funil, entregas, portfólio e catálogo")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}
