// src/services/project_service.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};
use utoipa::ToSchema;

use crate::{
    common::{
        error::{AppError, DuplicateKind, EntityKind, ValidationFailure},
        ids::{current_year, project_id, project_sequence, MAX_ID_ATTEMPTS},
    },
    db::{EntityRepository, Loaded, PersistOutcome, Scope},
    models::{
        auth::{Caller, Role},
        crm::Client,
        notification::{NotificationKind, ADMIN_BROADCAST},
        project::{Project, ProjectStatus},
        solicitation::{EmbeddedContract, Solicitation},
    },
    services::{
        crm_service::resolve_scope,
        notification_service::NotificationService,
        transition::{Transition, TransitionReport},
    },
};

/// Alteração administrativa de um projeto.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ProjectUpdate {
    pub status: Option<ProjectStatus>,
    #[serde(rename = "progresso")]
    #[schema(example = 40)]
    pub progress: Option<i64>,
}

/// Projeto lançado pela equipe fora do fluxo de assinatura (legado, contrato em papel).
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct NewProject {
    #[serde(rename = "titulo", default)]
    #[schema(example = "Site institucional")]
    pub title: String,
    #[serde(rename = "clienteId", default)]
    pub client_id: String,
    #[serde(rename = "valorContratado", default)]
    #[schema(example = "4200")]
    pub contracted_value: Decimal,
    #[serde(rename = "solicitacaoId", default)]
    pub solicitation_id: Option<String>,
    #[serde(rename = "propostaId", default)]
    pub proposal_id: Option<String>,
    #[serde(rename = "contratoId", default)]
    pub contract_id: Option<String>,
}

fn filled(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

#[derive(Clone)]
pub struct ProjectService {
    projects: EntityRepository<Project>,
    clients: EntityRepository<Client>,
    notifications: NotificationService,
}

impl ProjectService {
    pub fn new(
        projects: EntityRepository<Project>,
        clients: EntityRepository<Client>,
        notifications: NotificationService,
    ) -> Self {
        Self {
            projects,
            clients,
            notifications,
        }
    }

    pub async fn list(&self, caller: &Caller) -> Result<Loaded<Project>, AppError> {
        let scope = resolve_scope(&self.clients, caller).await?;
        self.projects.load(&caller.uid, &scope).await
    }

    /// Lista completa, usada pelo poller do painel administrativo.
    pub async fn list_all(&self, uid: &str) -> Result<Loaded<Project>, AppError> {
        self.projects.load(uid, &Scope::All).await
    }

    async fn next_sequence(&self, uid: &str, year: i32) -> Result<u32, AppError> {
        let existing = self.projects.load(uid, &Scope::All).await?;
        Ok(existing
            .items
            .iter()
            .filter_map(|p| project_sequence(&p.id, year))
            .max()
            .unwrap_or(0)
            + 1)
    }

    /// Grava o projeto no próximo `PROJ-<ano>-<n>` livre. A gravação é só-criação: se outra
    /// assinatura ocupou o número entre a leitura e a escrita, avança para o seguinte.
    async fn insert_with_free_id(&self, uid: &str, project: &mut Project) -> Result<PersistOutcome, AppError> {
        let year = current_year();
        let mut sequence = self.next_sequence(uid, year).await?;
        for _ in 0..MAX_ID_ATTEMPTS {
            project.id = project_id(year, sequence);
            if let Some(outcome) = self.projects.persist_new(uid, project).await? {
                return Ok(outcome);
            }
            tracing::warn!("Projeto {} já existe, tentando a próxima sequência", project.id);
            sequence += 1;
        }
        tracing::error!("🔥 Nenhuma sequência livre de projeto em {} tentativas", MAX_ID_ATTEMPTS);
        Err(AppError::InternalServerError(anyhow::anyhow!("sem id livre para projeto")))
    }

    /// Projeto do contrato assinado. Se já existir um para o `contratoId`, ele é devolvido
    /// sem nova escrita, o que torna a reexecução da assinatura segura.
    pub async fn create_from_contract(
        &self,
        uid: &str,
        solicitation: &Solicitation,
        contract: &EmbeddedContract,
        signed_at: DateTime<Utc>,
    ) -> Result<(Project, Option<PersistOutcome>), AppError> {
        let existing = self
            .projects
            .find_by(uid, "contratoId", Value::from(contract.id.as_str()))
            .await?;
        if let Some(project) = existing.into_iter().next() {
            tracing::info!("Projeto {} já existe para o contrato {}", project.id, contract.id);
            return Ok((project, None));
        }

        let mut project = Project {
            id: String::new(),
            title: contract.title.clone(),
            client_id: solicitation.client_id.clone(),
            admin_id: solicitation.admin_id.clone(),
            solicitation_id: Some(solicitation.id.clone()),
            proposal_id: Some(contract.proposal_id.clone()),
            contract_id: Some(contract.id.clone()),
            status: ProjectStatus::Planejamento,
            progress: 0,
            contracted_value: contract.value,
            approved_by_client: false,
            approved_at: None,
            created_at: signed_at,
            updated_at: signed_at,
        };
        let outcome = self.insert_with_free_id(uid, &mut project).await?;
        tracing::info!("🚀 Projeto {} criado a partir do contrato {}", project.id, contract.id);
        Ok((project, Some(outcome)))
    }

    /// Lançamento manual pela equipe. Os vínculos com solicitação/proposta/contrato são
    /// opcionais; quando há `contratoId`, continua valendo um projeto por contrato.
    pub async fn create_project(&self, caller: &Caller, payload: NewProject) -> Result<Transition<Project>, AppError> {
        if !caller.is_staff() {
            return Err(AppError::Forbidden);
        }
        let title = payload.title.trim().to_string();
        if title.is_empty() {
            return Err(AppError::validation(ValidationFailure::RequiredField("titulo")));
        }
        let client_id = payload.client_id.trim().to_string();
        if client_id.is_empty() {
            return Err(AppError::validation(ValidationFailure::RequiredField("clienteId")));
        }
        if payload.contracted_value < Decimal::ZERO {
            return Err(AppError::validation(ValidationFailure::NegativeValue));
        }

        let client = self.clients.require(&caller.uid, &client_id).await?;
        if !caller.can_access(client.admin_id.as_deref(), &client.id) {
            return Err(AppError::Forbidden);
        }

        let contract_id = filled(payload.contract_id);
        if let Some(contract_id) = contract_id.as_deref() {
            let existing = self
                .projects
                .find_by(&caller.uid, "contratoId", Value::from(contract_id))
                .await?;
            if !existing.is_empty() {
                return Err(AppError::Duplicate(DuplicateKind::ProjectAlreadyExists));
            }
        }

        let admin_id = client
            .admin_id
            .clone()
            .or_else(|| (caller.role == Role::Admin).then(|| caller.uid.clone()));
        let now = Utc::now();
        let mut project = Project {
            id: String::new(),
            title,
            client_id: client.id.clone(),
            admin_id,
            solicitation_id: filled(payload.solicitation_id),
            proposal_id: filled(payload.proposal_id),
            contract_id,
            status: ProjectStatus::Planejamento,
            progress: 0,
            contracted_value: payload.contracted_value,
            approved_by_client: false,
            approved_at: None,
            created_at: now,
            updated_at: now,
        };

        let mut report = TransitionReport::default();
        let outcome = self.insert_with_free_id(&caller.uid, &mut project).await?;
        report.note("projeto", &outcome);
        tracing::info!("🚀 Projeto {} lançado pela equipe para {}", project.id, project.client_id);
        Ok(Transition::new(project, report))
    }

    /// Única transição de projeto disponível ao portal do cliente.
    pub async fn approve_current_phase(&self, caller: &Caller, project_id: &str) -> Result<Transition<Project>, AppError> {
        let mut project = self.projects.require(&caller.uid, project_id).await?;
        if caller.role == Role::Admin {
            return Err(AppError::Forbidden);
        }
        if !caller.can_access(project.admin_id.as_deref(), &project.client_id) {
            return Err(AppError::Forbidden);
        }

        if project.status == ProjectStatus::Concluido && project.approved_by_client {
            return Err(AppError::Duplicate(DuplicateKind::ProjectAlreadyApproved));
        }
        if project.status != ProjectStatus::AguardandoAprovacao {
            return Err(AppError::InvalidTransition {
                entity: EntityKind::Project,
                from: project.status.as_str().to_string(),
                action: "approve",
            });
        }

        let now = Utc::now();
        project.status = ProjectStatus::Concluido;
        project.approved_by_client = true;
        project.approved_at = Some(now);
        project.progress = 100;
        project.updated_at = now;

        let mut report = TransitionReport::default();
        let outcome = self.projects.persist(&caller.uid, &project).await?;
        report.note("projeto", &outcome);

        tracing::info!("✅ Projeto {} aprovado pelo cliente", project.id);
        self.notifications
            .notify(
                NotificationKind::ProjetoAprovado,
                project.admin_id.as_deref().unwrap_or(ADMIN_BROADCAST),
                json!({ "projetoId": project.id, "clienteId": project.client_id }),
            )
            .await;

        Ok(Transition::new(project, report))
    }

    pub async fn update_project(
        &self,
        caller: &Caller,
        project_id: &str,
        update: ProjectUpdate,
    ) -> Result<Transition<Project>, AppError> {
        if !caller.is_staff() {
            return Err(AppError::Forbidden);
        }
        if let Some(progress) = update.progress {
            if !(0..=100).contains(&progress) {
                return Err(AppError::validation(ValidationFailure::ProgressOutOfRange(progress)));
            }
        }

        let mut project = self.projects.require(&caller.uid, project_id).await?;
        if !caller.can_access(project.admin_id.as_deref(), &project.client_id) {
            return Err(AppError::Forbidden);
        }

        if let Some(next) = update.status {
            if !project.status.admin_can_transition_to(next) {
                return Err(AppError::InvalidTransition {
                    entity: EntityKind::Project,
                    from: project.status.as_str().to_string(),
                    action: "update",
                });
            }
            project.status = next;
        } else if project.status.is_terminal() {
            return Err(AppError::InvalidTransition {
                entity: EntityKind::Project,
                from: project.status.as_str().to_string(),
                action: "update",
            });
        }
        if let Some(progress) = update.progress {
            project.progress = progress as u8;
        }
        project.updated_at = Utc::now();

        let mut report = TransitionReport::default();
        let outcome = self.projects.persist(&caller.uid, &project).await?;
        report.note("projeto", &outcome);
        tracing::info!(
            "Projeto {} atualizado: {} ({}%)",
            project.id,
            project.status.as_str(),
            project.progress
        );
        Ok(Transition::new(project, report))
    }
}
