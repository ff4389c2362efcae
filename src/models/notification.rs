// src/models/notification.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

/// Destinatário usado quando a solicitação ainda não tem admin responsável.
pub const ADMIN_BROADCAST: &str = "admins";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum NotificationKind {
    NovoCliente,
    NovaSolicitacao,
    PropostaEnviada,
    PropostaAceita,
    PropostaRecusada,
    ContratoAssinado,
    ProjetoAprovado,
    NovaMensagem,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Notification {
    pub id: String,
    #[serde(rename = "tipo")]
    pub kind: NotificationKind,
    #[serde(rename = "destinatarioId")]
    pub recipient_id: String,
    #[schema(value_type = Object)]
    pub payload: Value,
    #[serde(rename = "lida", default)]
    pub read: bool,
    #[serde(rename = "criadaEm")]
    pub created_at: DateTime<Utc>,
}
