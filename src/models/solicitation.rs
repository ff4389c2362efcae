// src/models/solicitation.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// --- STATUS (vocabulário canônico) ---

/// Estado da solicitação no funil comercial.
///
/// Sinônimos herdados são aceitos na leitura e normalizados: `proposta-enviada` vira
/// `proposta-criada`; `contrato-assinado` e `em-projeto` viram `concluida`. O marcador
/// "em projeto" é o campo `projetoId`, não um status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum SolicitationStatus {
    #[serde(rename = "nova")]
    Nova,
    #[serde(rename = "analisando")]
    Analisando,
    #[serde(rename = "proposta-criada", alias = "proposta-enviada")]
    PropostaCriada,
    #[serde(rename = "contrato-pendente")]
    ContratoPendente,
    #[serde(rename = "concluida", alias = "contrato-assinado", alias = "em-projeto")]
    Concluida,
    #[serde(rename = "rejeitada")]
    Rejeitada,
}

impl SolicitationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SolicitationStatus::Nova => "nova",
            SolicitationStatus::Analisando => "analisando",
            SolicitationStatus::PropostaCriada => "proposta-criada",
            SolicitationStatus::ContratoPendente => "contrato-pendente",
            SolicitationStatus::Concluida => "concluida",
            SolicitationStatus::Rejeitada => "rejeitada",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, SolicitationStatus::Concluida | SolicitationStatus::Rejeitada)
    }

    /// Estados que já carregam um contrato (pendente ou assinado).
    pub fn bears_contract(self) -> bool {
        matches!(self, SolicitationStatus::ContratoPendente | SolicitationStatus::Concluida)
    }

    pub fn accepts_proposal_submission(self) -> bool {
        matches!(self, SolicitationStatus::Nova | SolicitationStatus::Analisando)
    }

    /// Rejeição só é permitida antes de existir contrato.
    pub fn is_rejectable(self) -> bool {
        !self.is_terminal() && !self.bears_contract()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ProposalStatus {
    Pendente,
    Aceita,
    Recusada,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum ContractStatus {
    AguardandoAssinatura,
    Assinado,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum ResponseAuthor {
    Cliente,
    Admin,
    Sistema,
}

// --- PARTES EMBUTIDAS ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SolicitationResponse {
    #[serde(rename = "texto")]
    pub text: String,
    #[serde(rename = "autor")]
    pub author: ResponseAuthor,
    #[serde(rename = "dataCriacao")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct QuotedService {
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "categoria", default)]
    pub category: String,
    #[serde(rename = "valor")]
    pub value: Decimal,
    #[serde(rename = "recorrente", default)]
    pub recurring: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct EmbeddedProposal {
    pub id: String,
    #[serde(rename = "valor")]
    pub value: Decimal,
    #[serde(rename = "descricao")]
    pub description: String,
    #[serde(rename = "prazo")]
    pub deadline: String,
    /// Validade da proposta em dias.
    #[serde(rename = "validade")]
    pub validity_days: u32,
    #[serde(rename = "servicos", default)]
    pub services: Vec<QuotedService>,
    #[serde(rename = "dataCriacao")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct EmbeddedContract {
    pub id: String,
    #[serde(rename = "propostaId")]
    pub proposal_id: String,
    #[serde(rename = "titulo")]
    pub title: String,
    #[serde(rename = "valor")]
    pub value: Decimal,
    #[serde(rename = "servicos", default)]
    pub services: Vec<QuotedService>,
    #[serde(rename = "dataCriacao")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "assinadoEm", default, skip_serializing_if = "Option::is_none")]
    pub signed_at: Option<DateTime<Utc>>,
}

// --- SOLICITAÇÃO ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Solicitation {
    pub id: String,
    /// Id do catálogo, ou `custom` / `contato`.
    #[serde(rename = "servicoId")]
    pub service_id: String,
    #[serde(rename = "titulo")]
    pub title: String,
    #[serde(rename = "categoria", default)]
    pub category: String,
    #[serde(rename = "valor", default)]
    pub value: Decimal,
    pub status: SolicitationStatus,
    #[serde(rename = "descricao", default)]
    pub description: String,
    #[serde(rename = "prazo", default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<String>,
    #[serde(rename = "recorrente", default)]
    pub recurring: bool,
    #[serde(rename = "clienteId")]
    pub client_id: String,
    #[serde(rename = "adminId", default, skip_serializing_if = "Option::is_none")]
    pub admin_id: Option<String>,

    #[serde(rename = "respostas", default)]
    pub responses: Vec<SolicitationResponse>,

    #[serde(rename = "proposta", default, skip_serializing_if = "Option::is_none")]
    pub proposal: Option<EmbeddedProposal>,
    #[serde(rename = "propostaStatus", default, skip_serializing_if = "Option::is_none")]
    pub proposal_status: Option<ProposalStatus>,

    #[serde(rename = "contrato", default, skip_serializing_if = "Option::is_none")]
    pub contract: Option<EmbeddedContract>,
    #[serde(rename = "contratoStatus", default, skip_serializing_if = "Option::is_none")]
    pub contract_status: Option<ContractStatus>,

    #[serde(rename = "projetoId", default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,

    #[serde(rename = "dataCriacao")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "dataAtualizacao")]
    pub updated_at: DateTime<Utc>,
}

impl Solicitation {
    pub fn respond(&mut self, author: ResponseAuthor, text: impl Into<String>) {
        let now = Utc::now();
        self.responses.push(SolicitationResponse {
            text: text.into(),
            author,
            created_at: now,
        });
        self.updated_at = now;
    }

    /// A proposta está "ativa" enquanto não houver contrato e ela não tiver sido aceita.
    pub fn has_active_proposal(&self) -> bool {
        self.proposal.is_some()
            && !self.status.bears_contract()
            && !self.status.is_terminal()
            && self.proposal_status != Some(ProposalStatus::Aceita)
    }

    /// Checagem por prefixo usada contra envios duplicados: qualquer status com "contrato"
    /// ou contrato embutido indica que o contrato já existe.
    pub fn contract_exists(&self) -> bool {
        self.contract.is_some()
            || self.contract_status.is_some()
            || self.status.as_str().contains("contrato")
            || self.status == SolicitationStatus::Concluida
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse_status(raw: &str) -> SolicitationStatus {
        serde_json::from_value(json!(raw)).unwrap()
    }

    #[test]
    fn legacy_synonyms_normalize_to_canonical_states() {
        assert_eq!(parse_status("proposta-enviada"), SolicitationStatus::PropostaCriada);
        assert_eq!(parse_status("contrato-assinado"), SolicitationStatus::Concluida);
        assert_eq!(parse_status("em-projeto"), SolicitationStatus::Concluida);
        assert_eq!(
            serde_json::to_value(SolicitationStatus::Concluida).unwrap(),
            json!("concluida")
        );
    }

    #[test]
    fn rejection_is_closed_once_a_contract_exists() {
        assert!(SolicitationStatus::Nova.is_rejectable());
        assert!(SolicitationStatus::PropostaCriada.is_rejectable());
        assert!(!SolicitationStatus::ContratoPendente.is_rejectable());
        assert!(!SolicitationStatus::Concluida.is_rejectable());
        assert!(!SolicitationStatus::Rejeitada.is_rejectable());
    }

    #[test]
    fn contract_status_serializes_kebab_case() {
        assert_eq!(
            serde_json::to_value(ContractStatus::AguardandoAssinatura).unwrap(),
            json!("aguardando-assinatura")
        );
    }
}
