// src/services/portfolio_service.rs

use chrono::Utc;
use validator::Validate;

use crate::{
    common::error::{AppError, DuplicateKind, EntityKind, ValidationFailure},
    db::{EntityRepository, PortfolioRepository},
    models::{
        auth::Caller,
        crm::{Client, ContractedService, ServiceStatus},
        portfolio::{Deliverable, PortfolioItem},
    },
    services::transition::{Transition, TransitionReport},
};

#[derive(Clone)]
pub struct PortfolioService {
    clients: EntityRepository<Client>,
    portfolio: PortfolioRepository,
}

impl PortfolioService {
    pub fn new(clients: EntityRepository<Client>, portfolio: PortfolioRepository) -> Self {
        Self { clients, portfolio }
    }

    pub async fn list(&self) -> Result<Vec<PortfolioItem>, AppError> {
        self.portfolio.list().await
    }

    /// Encerra um serviço contratado com a entrega. O cliente é sempre persistido; a vitrine
    /// só recebe o item quando a publicação foi autorizada.
    pub async fn finalize_service(
        &self,
        caller: &Caller,
        client_id: &str,
        service_id: &str,
        deliverable: Deliverable,
    ) -> Result<Transition<ContractedService>, AppError> {
        if !caller.is_staff() {
            return Err(AppError::Forbidden);
        }
        deliverable.validate()?;
        if deliverable.title.trim().is_empty() {
            return Err(AppError::validation(ValidationFailure::RequiredField("titulo")));
        }
        if deliverable.description.trim().is_empty() {
            return Err(AppError::validation(ValidationFailure::RequiredField("descricao")));
        }

        let mut client = self.clients.require(&caller.uid, client_id).await?;
        if !caller.can_access(client.admin_id.as_deref(), &client.id) {
            return Err(AppError::Forbidden);
        }

        let Some(service) = client
            .contracted_services
            .iter_mut()
            .find(|s| s.id == service_id)
        else {
            return Err(AppError::not_found(EntityKind::ContractedService, service_id));
        };

        match service.status {
            ServiceStatus::Ativo => {}
            ServiceStatus::Concluido => {
                return Err(AppError::Duplicate(DuplicateKind::ServiceAlreadyFinalized));
            }
            ServiceStatus::Pausado => {
                return Err(AppError::InvalidTransition {
                    entity: EntityKind::ContractedService,
                    from: "pausado".to_string(),
                    action: "finalize",
                });
            }
        }

        let now = Utc::now();
        service.status = ServiceStatus::Concluido;
        service.finished_at = Some(now);
        let finished = service.clone();
        client.record("entrega", format!("Serviço {} finalizado: {}", finished.name, deliverable.title));

        let mut report = TransitionReport::default();
        let outcome = self.clients.persist(&caller.uid, &client).await?;
        report.note("cliente", &outcome);

        if deliverable.publication_authorized {
            let item = PortfolioItem {
                id: finished.id.clone(),
                title: deliverable.title,
                description: deliverable.description,
                category: finished.category.clone(),
                client_id: client.id.clone(),
                client_name: client.company.clone().unwrap_or_else(|| client.name.clone()),
                service_id: finished.id.clone(),
                image_url: deliverable.image_url,
                link: deliverable.link,
                created_at: now,
            };
            if let Err(e) = self.portfolio.append(item).await {
                report.partial("portfólio", &e);
            }
        }

        tracing::info!("🏁 Serviço {} do cliente {} finalizado", finished.id, client.id);
        Ok(Transition::new(finished, report))
    }
}
