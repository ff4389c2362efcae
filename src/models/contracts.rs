// src/models/contracts.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::solicitation::{ContractStatus, ProposalStatus, QuotedService};

// Visões derivadas: reconstruídas a partir das solicitações, nunca persistidas no topo.

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Proposal {
    pub id: String,
    #[serde(rename = "solicitacaoId")]
    pub solicitation_id: String,
    #[serde(rename = "clienteId")]
    pub client_id: String,
    #[serde(rename = "titulo")]
    pub title: String,
    #[serde(rename = "valor")]
    pub value: Decimal,
    #[serde(rename = "descricao")]
    pub description: String,
    #[serde(rename = "prazo")]
    pub deadline: String,
    #[serde(rename = "validade")]
    pub validity_days: u32,
    #[serde(rename = "servicos")]
    pub services: Vec<QuotedService>,
    #[serde(rename = "propostaStatus")]
    pub status: ProposalStatus,
    #[serde(rename = "ativa")]
    pub active: bool,
    #[serde(rename = "dataCriacao")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Contract {
    pub id: String,
    #[serde(rename = "propostaId")]
    pub proposal_id: String,
    #[serde(rename = "solicitacaoId")]
    pub solicitation_id: String,
    #[serde(rename = "clienteId")]
    pub client_id: String,
    #[serde(rename = "titulo")]
    pub title: String,
    #[serde(rename = "valor")]
    pub value: Decimal,
    #[serde(rename = "servicos")]
    pub services: Vec<QuotedService>,
    pub status: ContractStatus,
    #[serde(rename = "dataCriacao")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "assinadoEm", default, skip_serializing_if = "Option::is_none")]
    pub signed_at: Option<DateTime<Utc>>,
}

/// Registro do contrato assinado (`contratos_assinados`), chaveado pela solicitação.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SignedContractRecord {
    /// Igual ao `solicitacaoId`.
    pub id: String,
    #[serde(rename = "solicitacaoId")]
    pub solicitation_id: String,
    #[serde(rename = "contratoId")]
    pub contract_id: String,
    #[serde(rename = "clienteId")]
    pub client_id: String,
    #[serde(rename = "adminId", default, skip_serializing_if = "Option::is_none")]
    pub admin_id: Option<String>,
    /// PDF como data-URI.
    #[serde(rename = "arquivo")]
    pub file: String,
    #[serde(rename = "nomeArquivo")]
    pub file_name: String,
    /// PNG da assinatura como data-URI.
    #[serde(rename = "assinatura")]
    pub signature: String,
    #[serde(rename = "assinadoEm")]
    pub signed_at: DateTime<Utc>,
}
