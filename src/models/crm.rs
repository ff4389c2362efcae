// src/models/crm.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

// --- ENUMS ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum ClientStatus {
    #[default]
    Prospect,
    Ativo,
    Inativo,
}

/// Posição do cliente no funil de vendas.
///
/// A ordem das variantes é a ordem do funil. `Perdido` fica fora da ordem: é terminal e
/// alcançável a partir de qualquer etapa não terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum FunnelStage {
    #[default]
    Prospect,
    Contato,
    Proposta,
    Negociacao,
    Contratado,
    Ativo,
    Inativo,
    Perdido,
}

impl FunnelStage {
    pub const ALL: [FunnelStage; 8] = [
        FunnelStage::Prospect,
        FunnelStage::Contato,
        FunnelStage::Proposta,
        FunnelStage::Negociacao,
        FunnelStage::Contratado,
        FunnelStage::Ativo,
        FunnelStage::Inativo,
        FunnelStage::Perdido,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FunnelStage::Prospect => "prospect",
            FunnelStage::Contato => "contato",
            FunnelStage::Proposta => "proposta",
            FunnelStage::Negociacao => "negociacao",
            FunnelStage::Contratado => "contratado",
            FunnelStage::Ativo => "ativo",
            FunnelStage::Inativo => "inativo",
            FunnelStage::Perdido => "perdido",
        }
    }

    fn rank(self) -> Option<u8> {
        match self {
            FunnelStage::Prospect => Some(0),
            FunnelStage::Contato => Some(1),
            FunnelStage::Proposta => Some(2),
            FunnelStage::Negociacao => Some(3),
            FunnelStage::Contratado => Some(4),
            FunnelStage::Ativo => Some(5),
            FunnelStage::Inativo => Some(6),
            FunnelStage::Perdido => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        self == FunnelStage::Perdido
    }

    pub fn can_transition_to(self, next: FunnelStage) -> bool {
        match (self.rank(), next.rank()) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(current), Some(target)) => target >= current,
        }
    }

    /// Avança para `target` se isso não for regressão; caso contrário mantém a etapa atual.
    pub fn advance(self, target: FunnelStage) -> FunnelStage {
        if self.can_transition_to(target) {
            target
        } else {
            self
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    #[default]
    Ativo,
    Pausado,
    Concluido,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Contrato,
    Proposta,
    Outro,
}

// --- COMPOSIÇÃO DO CLIENTE ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ContractedService {
    pub id: String,
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "categoria", default)]
    pub category: String,
    #[serde(rename = "valor")]
    pub value: Decimal,
    #[serde(rename = "recorrente", default)]
    pub recurring: bool,
    #[serde(default)]
    pub status: ServiceStatus,
    #[serde(rename = "contratoId", default, skip_serializing_if = "Option::is_none")]
    pub contract_id: Option<String>,
    #[serde(rename = "dataInicio")]
    pub started_at: DateTime<Utc>,
    #[serde(rename = "dataConclusao", default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ClientDocument {
    pub id: String,
    #[serde(rename = "tipo")]
    pub kind: DocumentKind,
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "contratoId", default, skip_serializing_if = "Option::is_none")]
    pub contract_id: Option<String>,
    #[serde(rename = "solicitacaoId", default, skip_serializing_if = "Option::is_none")]
    pub solicitation_id: Option<String>,
    #[serde(rename = "dataCriacao")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Interaction {
    #[serde(rename = "tipo")]
    pub kind: String,
    #[serde(rename = "descricao")]
    pub description: String,
    #[serde(rename = "data")]
    pub at: DateTime<Utc>,
}

// --- CLIENTE ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Client {
    pub id: String,
    #[serde(rename = "nome")]
    pub name: String,
    pub email: String,
    #[serde(rename = "empresa", default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(rename = "telefone", default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(rename = "endereco", default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    #[serde(default)]
    pub status: ClientStatus,
    #[serde(rename = "etapaFunil", default)]
    pub funnel_stage: FunnelStage,
    #[serde(default)]
    pub rating: u8,
    #[serde(rename = "valorTotal", default)]
    pub total_value: Decimal,
    #[serde(rename = "contratoAssinado", default)]
    pub contract_signed: bool,

    #[serde(rename = "servicosContratados", default)]
    pub contracted_services: Vec<ContractedService>,
    #[serde(rename = "documentos", default)]
    pub documents: Vec<ClientDocument>,
    #[serde(rename = "historicoInteracoes", default)]
    pub interactions: Vec<Interaction>,

    #[serde(rename = "adminId", default, skip_serializing_if = "Option::is_none")]
    pub admin_id: Option<String>,
    #[serde(rename = "dataCriacao")]
    pub created_at: DateTime<Utc>,
}

/// Cadastro de cliente (portal ou CRM).
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct NewClient {
    #[serde(rename = "nome")]
    #[validate(length(min = 1, max = 120, message = "required"))]
    #[schema(example = "Padaria Sol")]
    pub name: String,
    #[validate(email(message = "invalid_email"))]
    #[schema(example = "contato@padariasol.com")]
    pub email: String,
    #[serde(rename = "empresa", default)]
    pub company: Option<String>,
    #[serde(rename = "telefone", default)]
    pub phone: Option<String>,
    #[serde(rename = "endereco", default)]
    pub address: Option<String>,
    /// Ignorado quando quem cadastra é um admin: o responsável passa a ser ele.
    #[serde(rename = "adminId", default)]
    pub admin_id: Option<String>,
}

impl Client {
    pub fn record(&mut self, kind: &str, description: impl Into<String>) {
        self.interactions.push(Interaction {
            kind: kind.to_string(),
            description: description.into(),
            at: Utc::now(),
        });
    }

    pub fn has_contract_document(&self, contract_id: &str) -> bool {
        self.documents
            .iter()
            .any(|d| d.kind == DocumentKind::Contrato && d.contract_id.as_deref() == Some(contract_id))
    }
}
