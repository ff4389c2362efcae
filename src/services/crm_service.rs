// src/services/crm_service.rs

use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    common::error::{AppError, DuplicateKind, ValidationFailure},
    db::{EntityRepository, Loaded, Scope},
    models::{
        auth::{Caller, Role},
        crm::{Client, ClientStatus, FunnelStage, NewClient},
        notification::{NotificationKind, ADMIN_BROADCAST},
    },
    services::{
        notification_service::NotificationService,
        transition::{Transition, TransitionReport},
    },
};

const MAX_RATING: i64 = 5;

/// Recorte de leitura de quem chama. Admin enxerga os próprios registros e os da carteira.
pub async fn resolve_scope(clients: &EntityRepository<Client>, caller: &Caller) -> Result<Scope, AppError> {
    match caller.role {
        Role::Webmaster => Ok(Scope::All),
        Role::Cliente => Ok(Scope::OwnedByClient(caller.uid.clone())),
        Role::Admin => {
            let owned = clients
                .find_by(&caller.uid, "adminId", Value::from(caller.uid.as_str()))
                .await?;
            Ok(Scope::OwnedByAdmin {
                admin_id: caller.uid.clone(),
                client_ids: owned.into_iter().map(|c| c.id).collect(),
            })
        }
    }
}

#[derive(Clone)]
pub struct CrmService {
    clients: EntityRepository<Client>,
    notifications: NotificationService,
}

impl CrmService {
    pub fn new(clients: EntityRepository<Client>, notifications: NotificationService) -> Self {
        Self {
            clients,
            notifications,
        }
    }

    pub async fn scope_for(&self, caller: &Caller) -> Result<Scope, AppError> {
        resolve_scope(&self.clients, caller).await
    }

    async fn accessible(&self, caller: &Caller, client_id: &str) -> Result<Client, AppError> {
        let client = self.clients.require(&caller.uid, client_id).await?;
        if !caller.can_access(client.admin_id.as_deref(), &client.id) {
            return Err(AppError::Forbidden);
        }
        Ok(client)
    }

    // =========================================================================
    //  CADASTRO
    // =========================================================================

    /// Um cliente do portal cadastra a si mesmo (id = uid). Staff cadastra terceiros.
    pub async fn create_client(&self, caller: &Caller, payload: NewClient) -> Result<Transition<Client>, AppError> {
        let name = payload.name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::validation(ValidationFailure::RequiredField("nome")));
        }
        let email = payload.email.trim().to_lowercase();

        // Recadastro do portal devolve o registro existente sem sobrescrever o histórico
        if caller.is_client() {
            if let Some(existing) = self.clients.get(&caller.uid, &caller.uid).await? {
                return Ok(Transition::new(existing, TransitionReport::default()));
            }
        }

        let (id, admin_id) = match caller.role {
            Role::Cliente => (caller.uid.clone(), payload.admin_id),
            Role::Admin => (Uuid::new_v4().to_string(), Some(caller.uid.clone())),
            Role::Webmaster => (Uuid::new_v4().to_string(), payload.admin_id),
        };

        // E-mail é único dentro da carteira do admin
        let same_email = self
            .clients
            .find_by(&caller.uid, "email", Value::from(email.as_str()))
            .await?;
        if same_email
            .iter()
            .any(|c| c.id != id && c.admin_id == admin_id)
        {
            return Err(AppError::Duplicate(DuplicateKind::EmailAlreadyExists));
        }

        let mut client = Client {
            id,
            name,
            email,
            company: payload.company,
            phone: payload.phone,
            address: payload.address,
            status: ClientStatus::Prospect,
            funnel_stage: FunnelStage::Prospect,
            rating: 0,
            total_value: Decimal::ZERO,
            contract_signed: false,
            contracted_services: Vec::new(),
            documents: Vec::new(),
            interactions: Vec::new(),
            admin_id,
            created_at: Utc::now(),
        };
        client.record("cadastro", "Cliente cadastrado");

        let mut report = TransitionReport::default();
        let outcome = self.clients.persist(&caller.uid, &client).await?;
        report.note("cliente", &outcome);

        tracing::info!("✅ Cliente {} cadastrado", client.id);
        self.notifications
            .notify(
                NotificationKind::NovoCliente,
                client.admin_id.as_deref().unwrap_or(ADMIN_BROADCAST),
                json!({ "clienteId": client.id, "nome": client.name }),
            )
            .await;

        Ok(Transition::new(client, report))
    }

    pub async fn list_clients(&self, caller: &Caller) -> Result<Loaded<Client>, AppError> {
        let scope = self.scope_for(caller).await?;
        self.clients.load(&caller.uid, &scope).await
    }

    pub async fn get_client(&self, caller: &Caller, client_id: &str) -> Result<Client, AppError> {
        self.accessible(caller, client_id).await
    }

    // =========================================================================
    //  FUNIL E AVALIAÇÃO (ÁREA ADMINISTRATIVA)
    // =========================================================================

    /// Ajuste manual do funil. Regressão é rejeitada; `perdido` é sempre permitido.
    pub async fn set_funnel_stage(
        &self,
        caller: &Caller,
        client_id: &str,
        stage: FunnelStage,
    ) -> Result<Transition<Client>, AppError> {
        if !caller.is_staff() {
            return Err(AppError::Forbidden);
        }
        let mut client = self.accessible(caller, client_id).await?;

        if client.funnel_stage == stage {
            return Ok(Transition::new(client, TransitionReport::default()));
        }
        if !client.funnel_stage.can_transition_to(stage) {
            return Err(AppError::validation(ValidationFailure::FunnelRegression {
                from: client.funnel_stage.as_str().to_string(),
                to: stage.as_str().to_string(),
            }));
        }

        let previous = client.funnel_stage;
        client.funnel_stage = stage;
        if stage == FunnelStage::Inativo || stage == FunnelStage::Perdido {
            client.status = ClientStatus::Inativo;
        }
        client.record(
            "funil",
            format!("Etapa alterada de {} para {}", previous.as_str(), stage.as_str()),
        );

        let mut report = TransitionReport::default();
        let outcome = self.clients.persist(&caller.uid, &client).await?;
        report.note("cliente", &outcome);
        tracing::info!("Funil de {}: {} -> {}", client.id, previous.as_str(), stage.as_str());
        Ok(Transition::new(client, report))
    }

    pub async fn rate_client(&self, caller: &Caller, client_id: &str, rating: i64) -> Result<Transition<Client>, AppError> {
        if !caller.is_staff() {
            return Err(AppError::Forbidden);
        }
        if !(0..=MAX_RATING).contains(&rating) {
            return Err(AppError::validation(ValidationFailure::RatingOutOfRange(rating)));
        }
        let mut client = self.accessible(caller, client_id).await?;
        client.rating = rating as u8;

        let mut report = TransitionReport::default();
        let outcome = self.clients.persist(&caller.uid, &client).await?;
        report.note("cliente", &outcome);
        Ok(Transition::new(client, report))
    }

    /// Exclusão definitiva. Serviços e documentos vão junto (fazem parte do documento).
    pub async fn delete_client(&self, caller: &Caller, client_id: &str) -> Result<(), AppError> {
        if !caller.is_staff() {
            return Err(AppError::Forbidden);
        }
        let client = self.accessible(caller, client_id).await?;
        self.clients.remove(&caller.uid, &client.id).await?;
        tracing::info!("🗑️ Cliente {} removido", client.id);
        Ok(())
    }
}
