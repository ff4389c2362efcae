// src/services/workflow_service.rs

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    common::{
        error::{AppError, DuplicateKind, EntityKind, ValidationFailure},
        ids::{contracted_service_id, IdGenerator, MAX_ID_ATTEMPTS},
    },
    db::{
        derived::{contract_of, derive_contracts, derive_proposals, proposal_of},
        EntityRepository, Loaded, PersistOutcome, Subscription,
    },
    models::{
        auth::{Caller, Role},
        catalog::{is_catalog_reference, CUSTOM_SERVICE_ID},
        contracts::{Contract, Proposal, SignedContractRecord},
        crm::{Client, ClientDocument, ClientStatus, ContractedService, DocumentKind, FunnelStage, ServiceStatus},
        notification::{NotificationKind, ADMIN_BROADCAST},
        project::Project,
        solicitation::{
            ContractStatus, EmbeddedContract, EmbeddedProposal, ProposalStatus, QuotedService,
            ResponseAuthor, Solicitation, SolicitationStatus,
        },
    },
    services::{
        catalog_service::CatalogService,
        crm_service::resolve_scope,
        document_service::{ContractInput, ContractRenderer, RenderedDocument},
        notification_service::NotificationService,
        project_service::ProjectService,
        signature::capture_signature,
        transition::{Transition, TransitionReport},
    },
};

const DEFAULT_VALIDITY_DAYS: u32 = 30;

// =============================================================================
//  ENTRADAS
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct NewSolicitation {
    /// Obrigatório quando quem abre é da equipe; o cliente do portal usa o próprio uid.
    #[serde(rename = "clienteId", default)]
    pub client_id: Option<String>,
    #[serde(rename = "servicoId", default)]
    #[schema(example = "custom")]
    pub service_id: Option<String>,
    #[serde(rename = "titulo", default)]
    #[schema(example = "Logo Design")]
    pub title: Option<String>,
    #[serde(rename = "categoria", default)]
    #[schema(example = "branding")]
    pub category: Option<String>,
    #[serde(rename = "valor", default)]
    pub value: Option<Decimal>,
    #[serde(rename = "descricao", default)]
    pub description: String,
    #[serde(rename = "prazo", default)]
    pub deadline: Option<String>,
    #[serde(rename = "recorrente", default)]
    pub recurring: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ProposalDraft {
    #[serde(rename = "valor")]
    #[schema(example = "2500")]
    pub value: Decimal,
    #[serde(rename = "descricao")]
    #[schema(example = "Full logo package")]
    pub description: String,
    #[serde(rename = "prazo", default)]
    #[schema(example = "15")]
    pub deadline: String,
    #[serde(rename = "validade", default)]
    pub validity_days: Option<u32>,
    #[serde(rename = "servicos", default)]
    pub services: Option<Vec<QuotedService>>,
}

/// Assinatura do contrato. `artifact` permite entregar um PDF já renderizado; sem ele o
/// renderizador configurado gera o documento.
#[derive(Debug, Clone)]
pub struct SignContract {
    pub signature: String,
    pub terms_accepted: bool,
    pub artifact: Option<RenderedDocument>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SignedContract {
    #[serde(rename = "contrato")]
    pub contract: Contract,
    #[serde(rename = "projeto")]
    pub project: Project,
    #[serde(rename = "nomeArquivo")]
    pub file_name: String,
}

// =============================================================================
//  SERVIÇO
// =============================================================================

#[derive(Clone)]
pub struct WorkflowService {
    solicitations: EntityRepository<Solicitation>,
    clients: EntityRepository<Client>,
    signed: EntityRepository<SignedContractRecord>,
    catalog: CatalogService,
    projects: ProjectService,
    notifications: NotificationService,
    ids: IdGenerator,
    renderer: Arc<dyn ContractRenderer>,
}

fn invalid(entity: EntityKind, from: SolicitationStatus, action: &'static str) -> AppError {
    AppError::InvalidTransition {
        entity,
        from: from.as_str().to_string(),
        action,
    }
}

fn ids_exhausted(what: &str) -> AppError {
    tracing::error!("🔥 Nenhum id livre para {} em {} tentativas", what, MAX_ID_ATTEMPTS);
    AppError::InternalServerError(anyhow::anyhow!("sem id livre para {what}"))
}

impl WorkflowService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        solicitations: EntityRepository<Solicitation>,
        clients: EntityRepository<Client>,
        signed: EntityRepository<SignedContractRecord>,
        catalog: CatalogService,
        projects: ProjectService,
        notifications: NotificationService,
        ids: IdGenerator,
        renderer: Arc<dyn ContractRenderer>,
    ) -> Self {
        Self {
            solicitations,
            clients,
            signed,
            catalog,
            projects,
            notifications,
            ids,
            renderer,
        }
    }

    // --- Auxiliares ---

    fn ensure_access(caller: &Caller, solicitation: &Solicitation) -> Result<(), AppError> {
        if caller.can_access(solicitation.admin_id.as_deref(), &solicitation.client_id) {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }

    async fn find_by_embedded(
        &self,
        caller: &Caller,
        field: &str,
        id: &str,
        kind: EntityKind,
    ) -> Result<Solicitation, AppError> {
        let solicitation = self
            .solicitations
            .find_by(&caller.uid, field, Value::from(id))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::not_found(kind, id))?;
        Self::ensure_access(caller, &solicitation)?;
        Ok(solicitation)
    }

    // Grava a solicitação nova num id livre; em colisão gera outro e tenta de novo.
    async fn insert_solicitation(&self, uid: &str, solicitation: &mut Solicitation) -> Result<PersistOutcome, AppError> {
        for _ in 0..MAX_ID_ATTEMPTS {
            if let Some(outcome) = self.solicitations.persist_new(uid, solicitation).await? {
                return Ok(outcome);
            }
            let taken = std::mem::replace(&mut solicitation.id, self.ids.solicitation());
            tracing::warn!("Id {} já em uso, tentando {}", taken, solicitation.id);
        }
        Err(ids_exhausted("solicitação"))
    }

    // Id de proposta/contrato que nenhuma solicitação carrega ainda.
    async fn free_embedded_id<F>(&self, uid: &str, field: &str, next: F) -> Result<String, AppError>
    where
        F: Fn() -> String,
    {
        for _ in 0..MAX_ID_ATTEMPTS {
            let candidate = next();
            let holders = self
                .solicitations
                .find_by(uid, field, Value::from(candidate.as_str()))
                .await?;
            if holders.is_empty() {
                return Ok(candidate);
            }
            tracing::warn!("Id {} já em uso em '{}', gerando outro", candidate, field);
        }
        Err(ids_exhausted(field))
    }

    async fn accessible(&self, caller: &Caller, id: &str) -> Result<Solicitation, AppError> {
        let solicitation = self.solicitations.require(&caller.uid, id).await?;
        Self::ensure_access(caller, &solicitation)?;
        Ok(solicitation)
    }

    /// Escrita secundária: acontece depois do commit e falhas viram aviso no relatório.
    async fn advance_funnel(
        &self,
        uid: &str,
        client_id: &str,
        stage: FunnelStage,
        note: String,
        report: &mut TransitionReport,
    ) {
        let mut client = match self.clients.require(uid, client_id).await {
            Ok(client) => client,
            Err(e) => {
                report.partial("funil do cliente", &e);
                return;
            }
        };
        let previous = client.funnel_stage;
        client.funnel_stage = previous.advance(stage);
        client.record("funil", note);

        match self.clients.persist(uid, &client).await {
            Ok(outcome) => report.note("cliente", &outcome),
            Err(e) => report.partial("funil do cliente", &e),
        }
        if previous != client.funnel_stage {
            tracing::info!(
                "Funil de {}: {} -> {}",
                client.id,
                previous.as_str(),
                client.funnel_stage.as_str()
            );
        }
    }

    async fn notify_admin(&self, solicitation: &Solicitation, kind: NotificationKind, payload: Value) {
        let recipient = solicitation.admin_id.as_deref().unwrap_or(ADMIN_BROADCAST);
        self.notifications.notify(kind, recipient, payload).await;
    }

    async fn notify_client(&self, solicitation: &Solicitation, kind: NotificationKind, payload: Value) {
        self.notifications
            .notify(kind, &solicitation.client_id, payload)
            .await;
    }

    // =========================================================================
    //  LEITURAS
    // =========================================================================

    pub async fn list_solicitations(&self, caller: &Caller) -> Result<Loaded<Solicitation>, AppError> {
        let scope = resolve_scope(&self.clients, caller).await?;
        self.solicitations.load(&caller.uid, &scope).await
    }

    pub async fn list_proposals(&self, caller: &Caller) -> Result<Loaded<Proposal>, AppError> {
        let loaded = self.list_solicitations(caller).await?;
        Ok(Loaded {
            items: derive_proposals(&loaded.items),
            degraded: loaded.degraded,
        })
    }

    pub async fn list_contracts(&self, caller: &Caller) -> Result<Loaded<Contract>, AppError> {
        let loaded = self.list_solicitations(caller).await?;
        Ok(Loaded {
            items: derive_contracts(&loaded.items),
            degraded: loaded.degraded,
        })
    }

    /// Proposta e cliente, para o PDF da proposta.
    pub async fn proposal_with_client(&self, caller: &Caller, proposal_id: &str) -> Result<(Proposal, Client), AppError> {
        let solicitation = self
            .find_by_embedded(caller, "proposta.id", proposal_id, EntityKind::Proposal)
            .await?;
        let proposal = proposal_of(&solicitation)
            .ok_or_else(|| AppError::not_found(EntityKind::Proposal, proposal_id))?;
        let client = self.clients.require(&caller.uid, &solicitation.client_id).await?;
        Ok((proposal, client))
    }

    /// Contrato assinado armazenado, para novo download.
    pub async fn signed_contract(&self, caller: &Caller, solicitation_id: &str) -> Result<SignedContractRecord, AppError> {
        let record = self.signed.require(&caller.uid, solicitation_id).await?;
        if !caller.can_access(record.admin_id.as_deref(), &record.client_id) {
            return Err(AppError::Forbidden);
        }
        Ok(record)
    }

    /// Consulta viva das solicitações de quem chama (cliente: as suas; admin: as dele).
    pub async fn watch_solicitations<F>(&self, caller: &Caller, callback: F) -> Result<Subscription, AppError>
    where
        F: Fn(Vec<Solicitation>) + Send + Sync + 'static,
    {
        let field = match caller.role {
            Role::Cliente => "clienteId",
            Role::Admin | Role::Webmaster => "adminId",
        };
        self.solicitations
            .subscribe(field, Value::from(caller.uid.as_str()), callback)
            .await
    }

    // =========================================================================
    //  TRANSIÇÕES
    // =========================================================================

    /// Abertura de solicitação (autoatendimento do cliente ou lançamento pela equipe).
    pub async fn create(&self, caller: &Caller, request: NewSolicitation) -> Result<Transition<Solicitation>, AppError> {
        let client_id = if caller.is_client() {
            caller.uid.clone()
        } else {
            request
                .client_id
                .filter(|id| !id.trim().is_empty())
                .ok_or(AppError::validation(ValidationFailure::RequiredField("clienteId")))?
        };
        let service_id = request
            .service_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| CUSTOM_SERVICE_ID.to_string());

        let mut title = request.title.map(|t| t.trim().to_string()).filter(|t| !t.is_empty());
        let mut category = request.category;
        let mut value = request.value;
        let mut recurring = request.recurring;

        // Serviço do catálogo preenche o que o cliente não informou
        if is_catalog_reference(&service_id) {
            let entry = self
                .catalog
                .get(&service_id)
                .await?
                .ok_or_else(|| AppError::not_found(EntityKind::CatalogService, &service_id))?;
            title.get_or_insert(entry.name);
            category.get_or_insert(entry.category);
            value.get_or_insert(entry.value);
            recurring.get_or_insert(entry.recurring);
        }

        let title = title.ok_or(AppError::validation(ValidationFailure::RequiredField("titulo")))?;
        let value = value.unwrap_or(Decimal::ZERO);
        if value < Decimal::ZERO {
            return Err(AppError::validation(ValidationFailure::NegativeValue));
        }

        let client = self.clients.require(&caller.uid, &client_id).await?;
        if !caller.can_access(client.admin_id.as_deref(), &client.id) {
            return Err(AppError::Forbidden);
        }

        let now = Utc::now();
        let mut solicitation = Solicitation {
            id: self.ids.solicitation(),
            service_id,
            title,
            category: category.unwrap_or_default(),
            value,
            status: SolicitationStatus::Nova,
            description: request.description,
            deadline: request.deadline,
            recurring: recurring.unwrap_or(false),
            client_id: client.id.clone(),
            admin_id: client.admin_id.clone(),
            responses: Vec::new(),
            proposal: None,
            proposal_status: None,
            contract: None,
            contract_status: None,
            project_id: None,
            created_at: now,
            updated_at: now,
        };

        let mut report = TransitionReport::default();
        let outcome = self.insert_solicitation(&caller.uid, &mut solicitation).await?;
        report.note("solicitação", &outcome);
        tracing::info!("📝 Solicitação {} criada para {}", solicitation.id, solicitation.client_id);

        self.advance_funnel(
            &caller.uid,
            &solicitation.client_id,
            FunnelStage::Contato,
            format!("Solicitação {} aberta", solicitation.id),
            &mut report,
        )
        .await;
        self.notify_admin(
            &solicitation,
            NotificationKind::NovaSolicitacao,
            json!({ "solicitacaoId": solicitation.id, "titulo": solicitation.title }),
        )
        .await;

        Ok(Transition::new(solicitation, report))
    }

    /// `nova` -> `analisando`.
    pub async fn start_review(&self, caller: &Caller, solicitation_id: &str) -> Result<Transition<Solicitation>, AppError> {
        if !caller.is_staff() {
            return Err(AppError::Forbidden);
        }
        let mut solicitation = self.accessible(caller, solicitation_id).await?;
        match solicitation.status {
            SolicitationStatus::Analisando => {
                return Ok(Transition::new(solicitation, TransitionReport::default()));
            }
            SolicitationStatus::Nova => {}
            other => return Err(invalid(EntityKind::Solicitation, other, "review")),
        }

        solicitation.status = SolicitationStatus::Analisando;
        if solicitation.admin_id.is_none() && caller.role == Role::Admin {
            solicitation.admin_id = Some(caller.uid.clone());
        }
        solicitation.updated_at = Utc::now();

        let mut report = TransitionReport::default();
        let outcome = self.solicitations.persist(&caller.uid, &solicitation).await?;
        report.note("solicitação", &outcome);
        Ok(Transition::new(solicitation, report))
    }

    pub async fn submit_proposal(
        &self,
        caller: &Caller,
        solicitation_id: &str,
        draft: ProposalDraft,
    ) -> Result<Transition<Proposal>, AppError> {
        if !caller.is_staff() {
            return Err(AppError::Forbidden);
        }
        if draft.value <= Decimal::ZERO {
            return Err(AppError::validation(ValidationFailure::NonPositiveValue));
        }
        let description = draft.description.trim().to_string();
        if description.is_empty() {
            return Err(AppError::validation(ValidationFailure::RequiredField("descricao")));
        }

        let mut solicitation = self.accessible(caller, solicitation_id).await?;
        if !solicitation.status.accepts_proposal_submission() {
            return Err(invalid(EntityKind::Solicitation, solicitation.status, "submit-proposal"));
        }

        let services = match draft.services {
            Some(services) if !services.is_empty() => services,
            _ => vec![QuotedService {
                name: solicitation.title.clone(),
                category: solicitation.category.clone(),
                value: draft.value,
                recurring: solicitation.recurring,
            }],
        };

        let proposal_id = self
            .free_embedded_id(&caller.uid, "proposta.id", || self.ids.proposal())
            .await?;
        let now = Utc::now();
        solicitation.proposal = Some(EmbeddedProposal {
            id: proposal_id,
            value: draft.value,
            description,
            deadline: draft.deadline,
            validity_days: draft.validity_days.unwrap_or(DEFAULT_VALIDITY_DAYS),
            services,
            created_at: now,
        });
        solicitation.status = SolicitationStatus::PropostaCriada;
        solicitation.proposal_status = Some(ProposalStatus::Pendente);
        if solicitation.admin_id.is_none() && caller.role == Role::Admin {
            solicitation.admin_id = Some(caller.uid.clone());
        }
        solicitation.updated_at = now;

        let proposal = proposal_of(&solicitation)
            .ok_or_else(|| AppError::not_found(EntityKind::Proposal, solicitation_id))?;

        let mut report = TransitionReport::default();
        let outcome = self.solicitations.persist(&caller.uid, &solicitation).await?;
        report.note("solicitação", &outcome);
        tracing::info!("📨 Proposta {} enviada (R$ {})", proposal.id, proposal.value);

        self.advance_funnel(
            &caller.uid,
            &solicitation.client_id,
            FunnelStage::Proposta,
            format!("Proposta {} enviada", proposal.id),
            &mut report,
        )
        .await;
        self.notify_client(
            &solicitation,
            NotificationKind::PropostaEnviada,
            json!({ "solicitacaoId": solicitation.id, "propostaId": proposal.id, "valor": proposal.value }),
        )
        .await;

        Ok(Transition::new(proposal, report))
    }

    /// Aceite do cliente. Reenvios (duplo clique, retry de rede) são rejeitados como duplicata.
    pub async fn accept_proposal(&self, caller: &Caller, proposal_id: &str) -> Result<Transition<Contract>, AppError> {
        if caller.role == Role::Admin {
            return Err(AppError::Forbidden);
        }
        let mut solicitation = self
            .find_by_embedded(caller, "proposta.id", proposal_id, EntityKind::Proposal)
            .await?;

        if solicitation.contract_exists() {
            tracing::warn!("Aceite repetido da proposta {} rejeitado", proposal_id);
            return Err(AppError::Duplicate(DuplicateKind::ContractAlreadyExists));
        }
        if solicitation.proposal_status == Some(ProposalStatus::Aceita) {
            return Err(AppError::Duplicate(DuplicateKind::ProposalAlreadyAccepted));
        }
        if !solicitation.has_active_proposal() {
            return Err(invalid(EntityKind::Proposal, solicitation.status, "accept"));
        }
        // Contrato já registrado por outro caminho (outra aba, replay)
        let by_proposal = self
            .solicitations
            .find_by(&caller.uid, "contrato.propostaId", Value::from(proposal_id))
            .await?;
        let already_signed = self.signed.get(&caller.uid, &solicitation.id).await?;
        if !by_proposal.is_empty() || already_signed.is_some() {
            return Err(AppError::Duplicate(DuplicateKind::ContractAlreadyExists));
        }

        let Some(proposal) = solicitation.proposal.clone() else {
            return Err(AppError::not_found(EntityKind::Proposal, proposal_id));
        };

        let contract_id = self
            .free_embedded_id(&caller.uid, "contrato.id", || self.ids.contract())
            .await?;
        let now = Utc::now();
        solicitation.contract = Some(EmbeddedContract {
            id: contract_id,
            proposal_id: proposal.id.clone(),
            title: solicitation.title.clone(),
            value: proposal.value,
            services: proposal.services.clone(),
            created_at: now,
            signed_at: None,
        });
        solicitation.status = SolicitationStatus::ContratoPendente;
        solicitation.proposal_status = Some(ProposalStatus::Aceita);
        solicitation.contract_status = Some(ContractStatus::AguardandoAssinatura);
        solicitation.updated_at = now;

        let contract = contract_of(&solicitation)
            .ok_or_else(|| AppError::not_found(EntityKind::Contract, proposal_id))?;

        let mut report = TransitionReport::default();
        let outcome = self.solicitations.persist(&caller.uid, &solicitation).await?;
        report.note("solicitação", &outcome);
        tracing::info!("🤝 Proposta {} aceita, contrato {} aguardando assinatura", proposal.id, contract.id);

        self.advance_funnel(
            &caller.uid,
            &solicitation.client_id,
            FunnelStage::Negociacao,
            format!("Proposta {} aceita", proposal.id),
            &mut report,
        )
        .await;
        self.notify_admin(
            &solicitation,
            NotificationKind::PropostaAceita,
            json!({ "solicitacaoId": solicitation.id, "propostaId": proposal.id, "contratoId": contract.id }),
        )
        .await;

        Ok(Transition::new(contract, report))
    }

    /// Recusa da proposta pelo cliente. Encerra a solicitação.
    pub async fn decline_proposal(&self, caller: &Caller, proposal_id: &str) -> Result<Transition<Proposal>, AppError> {
        if caller.role == Role::Admin {
            return Err(AppError::Forbidden);
        }
        let mut solicitation = self
            .find_by_embedded(caller, "proposta.id", proposal_id, EntityKind::Proposal)
            .await?;
        if !solicitation.has_active_proposal() {
            return Err(invalid(EntityKind::Proposal, solicitation.status, "decline"));
        }

        solicitation.status = SolicitationStatus::Rejeitada;
        solicitation.proposal_status = Some(ProposalStatus::Recusada);
        solicitation.updated_at = Utc::now();

        let proposal = proposal_of(&solicitation)
            .ok_or_else(|| AppError::not_found(EntityKind::Proposal, proposal_id))?;

        let mut report = TransitionReport::default();
        let outcome = self.solicitations.persist(&caller.uid, &solicitation).await?;
        report.note("solicitação", &outcome);
        tracing::info!("Proposta {} recusada pelo cliente", proposal.id);

        self.notify_admin(
            &solicitation,
            NotificationKind::PropostaRecusada,
            json!({ "solicitacaoId": solicitation.id, "propostaId": proposal.id }),
        )
        .await;

        Ok(Transition::new(proposal, report))
    }

    /// Assinatura. Ordem das escritas: registro assinado, projeto, cliente e, por último, a
    /// solicitação (ponto de commit). Uma falha antes do commit deixa a solicitação em
    /// `contrato-pendente` e a chamada pode ser repetida sem duplicar nada.
    pub async fn sign_contract(
        &self,
        caller: &Caller,
        contract_id: &str,
        input: SignContract,
    ) -> Result<Transition<SignedContract>, AppError> {
        if caller.role == Role::Admin {
            return Err(AppError::Forbidden);
        }
        // Pré-condições: nada é lido nem escrito antes delas
        if !input.terms_accepted {
            return Err(AppError::validation(ValidationFailure::TermsNotAccepted));
        }
        let signature = capture_signature(&input.signature)?;

        let mut solicitation = self
            .find_by_embedded(caller, "contrato.id", contract_id, EntityKind::Contract)
            .await?;
        if solicitation.contract_status == Some(ContractStatus::Assinado)
            || solicitation.status == SolicitationStatus::Concluida
        {
            return Err(AppError::Duplicate(DuplicateKind::ContractAlreadySigned));
        }
        if solicitation.status != SolicitationStatus::ContratoPendente {
            return Err(invalid(EntityKind::Contract, solicitation.status, "sign"));
        }
        let Some(contract) = solicitation.contract.clone() else {
            return Err(AppError::not_found(EntityKind::Contract, contract_id));
        };

        let mut client = self.clients.require(&caller.uid, &solicitation.client_id).await?;
        let signed_at = Utc::now();

        let artifact = match input.artifact {
            Some(artifact) => artifact,
            None => self.renderer.render_contract(&ContractInput {
                contract_id: Some(&contract.id),
                title: &contract.title,
                client: &client,
                services: &contract.services,
                total: contract.value,
                signature: &input.signature,
                terms_accepted: input.terms_accepted,
                signed_at,
            })?,
        };

        let mut report = TransitionReport::default();

        // 1. Registro assinado (chave = solicitação)
        let record = SignedContractRecord {
            id: solicitation.id.clone(),
            solicitation_id: solicitation.id.clone(),
            contract_id: contract.id.clone(),
            client_id: solicitation.client_id.clone(),
            admin_id: solicitation.admin_id.clone(),
            file: artifact.to_data_uri(),
            file_name: artifact.file_name.clone(),
            signature: signature.to_data_uri(),
            signed_at,
        };
        let outcome = self.signed.persist(&caller.uid, &record).await?;
        report.note("contrato assinado", &outcome);

        // 2. Projeto (idempotente por contratoId)
        let (project, outcome) = self
            .projects
            .create_from_contract(&caller.uid, &solicitation, &contract, signed_at)
            .await
            .inspect_err(|e| {
                tracing::error!("🔥 Assinatura de {} interrompida ao criar projeto: {}", contract.id, e)
            })?;
        if let Some(outcome) = outcome {
            report.note("projeto", &outcome);
        }

        // 3. Cliente (pulado se o documento do contrato já estiver lá)
        if !client.has_contract_document(&contract.id) {
            client.documents.push(ClientDocument {
                id: Uuid::new_v4().to_string(),
                kind: DocumentKind::Contrato,
                name: artifact.file_name.clone(),
                contract_id: Some(contract.id.clone()),
                solicitation_id: Some(solicitation.id.clone()),
                created_at: signed_at,
            });
            for (index, service) in contract.services.iter().enumerate() {
                client.contracted_services.push(ContractedService {
                    id: contracted_service_id(&contract.id, index),
                    name: service.name.clone(),
                    category: service.category.clone(),
                    value: service.value,
                    recurring: service.recurring,
                    status: ServiceStatus::Ativo,
                    contract_id: Some(contract.id.clone()),
                    started_at: signed_at,
                    finished_at: None,
                });
            }
            client.total_value += contract.value;
            client.contract_signed = true;
            client.status = ClientStatus::Ativo;
            client.funnel_stage = client.funnel_stage.advance(FunnelStage::Contratado);
            client.record("contrato", format!("Contrato {} assinado", contract.id));

            let outcome = self
                .clients
                .persist(&caller.uid, &client)
                .await
                .inspect_err(|e| {
                    tracing::error!("🔥 Assinatura de {} interrompida ao atualizar cliente: {}", contract.id, e)
                })?;
            report.note("cliente", &outcome);
        }

        // 4. Solicitação: commit
        solicitation.status = SolicitationStatus::Concluida;
        solicitation.contract_status = Some(ContractStatus::Assinado);
        solicitation.project_id = Some(project.id.clone());
        if let Some(embedded) = solicitation.contract.as_mut() {
            embedded.signed_at = Some(signed_at);
        }
        solicitation.updated_at = signed_at;

        let outcome = self.solicitations.persist(&caller.uid, &solicitation).await?;
        report.note("solicitação", &outcome);
        tracing::info!("✍️ Contrato {} assinado, projeto {}", contract.id, project.id);

        self.notify_admin(
            &solicitation,
            NotificationKind::ContratoAssinado,
            json!({
                "solicitacaoId": solicitation.id,
                "contratoId": contract.id,
                "projetoId": project.id,
            }),
        )
        .await;

        let contract = contract_of(&solicitation)
            .ok_or_else(|| AppError::not_found(EntityKind::Contract, contract_id))?;
        Ok(Transition::new(
            SignedContract {
                contract,
                project,
                file_name: artifact.file_name,
            },
            report,
        ))
    }

    /// Rejeição pela equipe, permitida até existir contrato. O motivo vira resposta do sistema.
    pub async fn reject(
        &self,
        caller: &Caller,
        solicitation_id: &str,
        reason: Option<String>,
    ) -> Result<Transition<Solicitation>, AppError> {
        if !caller.is_staff() {
            return Err(AppError::Forbidden);
        }
        let mut solicitation = self.accessible(caller, solicitation_id).await?;
        if !solicitation.status.is_rejectable() {
            return Err(invalid(EntityKind::Solicitation, solicitation.status, "reject"));
        }

        solicitation.status = SolicitationStatus::Rejeitada;
        if solicitation.proposal.is_some() {
            solicitation.proposal_status = Some(ProposalStatus::Recusada);
        }
        let reason = reason.map(|r| r.trim().to_string()).filter(|r| !r.is_empty());
        if let Some(reason) = &reason {
            solicitation.respond(ResponseAuthor::Sistema, reason.clone());
        }
        solicitation.updated_at = Utc::now();

        let mut report = TransitionReport::default();
        let outcome = self.solicitations.persist(&caller.uid, &solicitation).await?;
        report.note("solicitação", &outcome);
        tracing::info!("Solicitação {} rejeitada", solicitation.id);

        if let Some(reason) = reason {
            self.notify_client(
                &solicitation,
                NotificationKind::NovaMensagem,
                json!({ "solicitacaoId": solicitation.id, "texto": reason }),
            )
            .await;
        }

        Ok(Transition::new(solicitation, report))
    }

    /// Mensagem no histórico da solicitação, em qualquer estado.
    pub async fn add_response(
        &self,
        caller: &Caller,
        solicitation_id: &str,
        text: &str,
    ) -> Result<Transition<Solicitation>, AppError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AppError::validation(ValidationFailure::RequiredField("texto")));
        }
        let mut solicitation = self.accessible(caller, solicitation_id).await?;

        let author = if caller.is_client() {
            ResponseAuthor::Cliente
        } else {
            ResponseAuthor::Admin
        };
        solicitation.respond(author, text);

        let mut report = TransitionReport::default();
        let outcome = self.solicitations.persist(&caller.uid, &solicitation).await?;
        report.note("solicitação", &outcome);

        let payload = json!({ "solicitacaoId": solicitation.id, "texto": text });
        if author == ResponseAuthor::Cliente {
            self.notify_admin(&solicitation, NotificationKind::NovaMensagem, payload)
                .await;
        } else {
            self.notify_client(&solicitation, NotificationKind::NovaMensagem, payload)
                .await;
        }

        Ok(Transition::new(solicitation, report))
    }
}
