// src/models/portfolio.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PortfolioItem {
    pub id: String,
    #[serde(rename = "titulo")]
    pub title: String,
    #[serde(rename = "descricao")]
    pub description: String,
    #[serde(rename = "categoria", default)]
    pub category: String,
    #[serde(rename = "clienteId")]
    pub client_id: String,
    #[serde(rename = "clienteNome")]
    pub client_name: String,
    #[serde(rename = "servicoId")]
    pub service_id: String,
    #[serde(rename = "imagemUrl", default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(rename = "dataCriacao")]
    pub created_at: DateTime<Utc>,
}

/// Entrega que encerra um serviço contratado.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct Deliverable {
    #[serde(rename = "titulo")]
    #[schema(example = "Identidade visual - Padaria Sol")]
    pub title: String,
    #[serde(rename = "descricao")]
    #[schema(example = "Logo, paleta e manual de marca")]
    pub description: String,
    #[serde(rename = "imagemUrl", default)]
    pub image_url: Option<String>,
    #[serde(default)]
    #[validate(url(message = "invalid_url"))]
    pub link: Option<String>,
    #[serde(rename = "autorizadoPublicacao", default)]
    pub publication_authorized: bool,
}
