// src/models/project.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum ProjectStatus {
    #[serde(rename = "planejamento")]
    Planejamento,
    #[serde(rename = "em-andamento")]
    EmAndamento,
    #[serde(rename = "pausado")]
    Pausado,
    #[serde(rename = "revisao")]
    Revisao,
    #[serde(rename = "aguardando-aprovacao", alias = "aprovacao")]
    AguardandoAprovacao,
    #[serde(rename = "concluido")]
    Concluido,
    #[serde(rename = "cancelado")]
    Cancelado,
}

impl ProjectStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ProjectStatus::Planejamento => "planejamento",
            ProjectStatus::EmAndamento => "em-andamento",
            ProjectStatus::Pausado => "pausado",
            ProjectStatus::Revisao => "revisao",
            ProjectStatus::AguardandoAprovacao => "aguardando-aprovacao",
            ProjectStatus::Concluido => "concluido",
            ProjectStatus::Cancelado => "cancelado",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ProjectStatus::Concluido | ProjectStatus::Cancelado)
    }

    /// Transições do lado administrativo. `aguardando-aprovacao -> concluido` fica de fora:
    /// só o cliente aprova a fase.
    pub fn admin_can_transition_to(self, next: ProjectStatus) -> bool {
        if self == next {
            return !self.is_terminal();
        }
        if next == ProjectStatus::Cancelado {
            return !self.is_terminal();
        }

        matches!(
            (self, next),
            (ProjectStatus::Planejamento, ProjectStatus::EmAndamento)
                | (ProjectStatus::EmAndamento, ProjectStatus::Pausado)
                | (ProjectStatus::EmAndamento, ProjectStatus::Revisao)
                | (ProjectStatus::EmAndamento, ProjectStatus::AguardandoAprovacao)
                | (ProjectStatus::Pausado, ProjectStatus::EmAndamento)
                | (ProjectStatus::Revisao, ProjectStatus::EmAndamento)
                | (ProjectStatus::Revisao, ProjectStatus::AguardandoAprovacao)
                | (ProjectStatus::AguardandoAprovacao, ProjectStatus::EmAndamento)
                | (ProjectStatus::AguardandoAprovacao, ProjectStatus::Revisao)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Project {
    pub id: String,
    #[serde(rename = "titulo")]
    pub title: String,
    #[serde(rename = "clienteId")]
    pub client_id: String,
    #[serde(rename = "adminId", default, skip_serializing_if = "Option::is_none")]
    pub admin_id: Option<String>,

    // Cadeia de rastreabilidade: solicitação -> proposta -> contrato
    #[serde(rename = "solicitacaoId", default, skip_serializing_if = "Option::is_none")]
    pub solicitation_id: Option<String>,
    #[serde(rename = "propostaId", default, skip_serializing_if = "Option::is_none")]
    pub proposal_id: Option<String>,
    #[serde(rename = "contratoId", default, skip_serializing_if = "Option::is_none")]
    pub contract_id: Option<String>,

    pub status: ProjectStatus,
    #[serde(rename = "progresso", default)]
    pub progress: u8,
    #[serde(rename = "valorContratado", default)]
    pub contracted_value: Decimal,

    #[serde(rename = "aprovadoPorCliente", default)]
    pub approved_by_client: bool,
    #[serde(rename = "aprovadoEm", default, skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<DateTime<Utc>>,

    #[serde(rename = "dataCriacao")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "dataAtualizacao")]
    pub updated_at: DateTime<Utc>,
}
