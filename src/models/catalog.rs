// src/models/catalog.rs

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Ids reservados de `servicoId` que não apontam para o catálogo.
pub const CUSTOM_SERVICE_ID: &str = "custom";
pub const CONTACT_SERVICE_ID: &str = "contato";

pub fn is_catalog_reference(service_id: &str) -> bool {
    !service_id.is_empty() && service_id != CUSTOM_SERVICE_ID && service_id != CONTACT_SERVICE_ID
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CatalogService {
    /// Vazio no cadastro: um id novo é gerado.
    #[serde(default)]
    pub id: String,
    #[serde(rename = "nome")]
    #[schema(example = "Identidade Visual")]
    pub name: String,
    #[serde(rename = "categoria", default)]
    #[schema(example = "branding")]
    pub category: String,
    #[serde(rename = "descricao", default)]
    pub description: String,
    #[serde(rename = "valor", default)]
    #[schema(example = "2500.00")]
    pub value: Decimal,
    #[serde(rename = "recorrente", default)]
    pub recurring: bool,
    #[serde(default = "default_true")]
    pub ativo: bool,
}

fn default_true() -> bool {
    true
}
