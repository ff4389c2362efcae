// src/common/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::fmt;
use thiserror::Error;

use crate::common::i18n::I18nStore;
use crate::db::document_store::StoreError;
use crate::db::local_cache::CacheError;
use crate::middleware::i18n::Locale;

// Tipo de entidade citado nas mensagens de "não encontrado"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntityKind {
    Client,
    Solicitation,
    Proposal,
    Contract,
    Project,
    ContractedService,
    CatalogService,
    SignedContract,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Client => "client",
            EntityKind::Solicitation => "solicitation",
            EntityKind::Proposal => "proposal",
            EntityKind::Contract => "contract",
            EntityKind::Project => "project",
            EntityKind::ContractedService => "contracted-service",
            EntityKind::CatalogService => "catalog-service",
            EntityKind::SignedContract => "signed-contract",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Guarda de entrada que falhou. Cada variante vira uma mensagem própria para o usuário.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationFailure {
    RequiredField(&'static str),
    NonPositiveValue,
    NegativeValue,
    EmptySignature,
    InvalidSignatureImage,
    TermsNotAccepted,
    ProgressOutOfRange(i64),
    RatingOutOfRange(i64),
    FunnelRegression { from: String, to: String },
}

impl ValidationFailure {
    pub fn code(&self) -> &'static str {
        match self {
            ValidationFailure::RequiredField(_) => "required_field",
            ValidationFailure::NonPositiveValue => "non_positive_value",
            ValidationFailure::NegativeValue => "negative_value",
            ValidationFailure::EmptySignature => "empty_signature",
            ValidationFailure::InvalidSignatureImage => "invalid_signature_image",
            ValidationFailure::TermsNotAccepted => "terms_not_accepted",
            ValidationFailure::ProgressOutOfRange(_) => "progress_out_of_range",
            ValidationFailure::RatingOutOfRange(_) => "rating_out_of_range",
            ValidationFailure::FunnelRegression { .. } => "funnel_regression",
        }
    }

    fn args(&self) -> Vec<(&'static str, String)> {
        match self {
            ValidationFailure::RequiredField(field) => vec![("field", field.to_string())],
            ValidationFailure::ProgressOutOfRange(v) | ValidationFailure::RatingOutOfRange(v) => {
                vec![("value", v.to_string())]
            }
            ValidationFailure::FunnelRegression { from, to } => {
                vec![("from", from.clone()), ("to", to.clone())]
            }
            _ => Vec::new(),
        }
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationFailure::RequiredField(field) => write!(f, "campo obrigatório: {field}"),
            ValidationFailure::FunnelRegression { from, to } => {
                write!(f, "funil não pode regredir de {from} para {to}")
            }
            other => f.write_str(other.code()),
        }
    }
}

/// "Você já fez isso", distinto de validação ("você esqueceu algo").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateKind {
    ContractAlreadyExists,
    ProposalAlreadyAccepted,
    ContractAlreadySigned,
    ServiceAlreadyFinalized,
    ProjectAlreadyApproved,
    ProjectAlreadyExists,
    EmailAlreadyExists,
}

impl DuplicateKind {
    pub fn code(self) -> &'static str {
        match self {
            DuplicateKind::ContractAlreadyExists => "contract_already_exists",
            DuplicateKind::ProposalAlreadyAccepted => "proposal_already_accepted",
            DuplicateKind::ContractAlreadySigned => "contract_already_signed",
            DuplicateKind::ServiceAlreadyFinalized => "service_already_finalized",
            DuplicateKind::ProjectAlreadyApproved => "project_already_approved",
            DuplicateKind::ProjectAlreadyExists => "project_already_exists",
            DuplicateKind::EmailAlreadyExists => "email_already_exists",
        }
    }
}

impl fmt::Display for DuplicateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Validação falhou: {0}")]
    Validation(ValidationFailure),

    #[error("Operação já realizada: {0}")]
    Duplicate(DuplicateKind),

    #[error("Transição inválida: {entity} em '{from}' não aceita '{action}'")]
    InvalidTransition {
        entity: EntityKind,
        from: String,
        action: &'static str,
    },

    #[error("{0} não encontrado: {1}")]
    NotFound(EntityKind, String),

    #[error("Dados indisponíveis (remoto e cache local falharam)")]
    DataUnavailable,

    #[error("Falha no armazenamento remoto: {0}")]
    Store(#[from] StoreError),

    #[error("Falha no cache local: {0}")]
    Cache(#[from] CacheError),

    #[error("Falha ao gerar documento: {0}")]
    Document(String),

    #[error("Fonte não encontrada: {0}")]
    FontNotFound(String),

    #[error("Token inválido")]
    InvalidToken,

    #[error("Acesso negado")]
    Forbidden,

    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Erro de serialização: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

impl AppError {
    pub fn validation(failure: ValidationFailure) -> Self {
        AppError::Validation(failure)
    }

    pub fn not_found(kind: EntityKind, id: impl Into<String>) -> Self {
        AppError::NotFound(kind, id.into())
    }

    /// Código estável, usado como chave de tradução e no corpo da resposta.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "validation_failed",
            AppError::Validation(failure) => failure.code(),
            AppError::Duplicate(kind) => kind.code(),
            AppError::InvalidTransition { .. } => "invalid_transition",
            AppError::NotFound(..) => "not_found",
            AppError::DataUnavailable => "data_unavailable",
            AppError::Document(_) | AppError::FontNotFound(_) => "document_failed",
            AppError::InvalidToken | AppError::JwtError(_) => "invalid_token",
            AppError::Forbidden => "forbidden",
            AppError::Store(_)
            | AppError::Cache(_)
            | AppError::DatabaseError(_)
            | AppError::Serialization(_)
            | AppError::InternalServerError(_) => "internal_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Duplicate(_) | AppError::InvalidTransition { .. } => StatusCode::CONFLICT,
            AppError::NotFound(..) => StatusCode::NOT_FOUND,
            AppError::DataUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            AppError::InvalidToken | AppError::JwtError(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message_args(&self) -> Vec<(&'static str, String)> {
        match self {
            AppError::Validation(failure) => failure.args(),
            AppError::InvalidTransition { entity, from, action } => vec![
                ("entity", entity.to_string()),
                ("from", from.clone()),
                ("action", action.to_string()),
            ],
            AppError::NotFound(kind, id) => vec![("entity", kind.to_string()), ("id", id.clone())],
            _ => Vec::new(),
        }
    }

    /// Converte para a resposta HTTP já traduzida para o idioma do usuário.
    pub fn to_api_error(&self, locale: &Locale, store: &I18nStore) -> ApiError {
        if let AppError::ValidationError(errors) = self {
            let mut details = std::collections::HashMap::new();
            for (field, field_errors) in errors.field_errors() {
                let messages: Vec<String> = field_errors
                    .iter()
                    .map(|e| {
                        let code = e.message.as_deref().unwrap_or(&e.code);
                        store.translate(&locale.0, &format!("field.{code}"), &[])
                    })
                    .collect();
                details.insert(field.to_string(), messages);
            }
            return ApiError {
                status: StatusCode::BAD_REQUEST,
                error: store.translate(&locale.0, "error.validation_failed", &[]),
                details: Some(json!(details)),
            };
        }

        let status = self.status();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("Erro Interno do Servidor: {}", self);
        }

        // Nomes de entidade também passam pela tradução
        let args: Vec<(&'static str, String)> = self
            .message_args()
            .into_iter()
            .map(|(key, value)| match key {
                "entity" => (key, store.translate(&locale.0, &format!("entity.{value}"), &[])),
                _ => (key, value),
            })
            .collect();
        let borrowed: Vec<(&str, &str)> = args.iter().map(|(k, v)| (*k, v.as_str())).collect();
        ApiError {
            status,
            error: store.translate(&locale.0, &format!("error.{}", self.code()), &borrowed),
            details: Some(json!({ "code": self.code() })),
        }
    }
}

// Resposta de erro pronta para o cliente HTTP
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub error: String,
    pub details: Option<Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.details {
            Some(details) => json!({ "error": self.error, "details": details }),
            None => json!({ "error": self.error }),
        };
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_and_validation_have_distinct_codes_and_statuses() {
        let dup = AppError::Duplicate(DuplicateKind::ContractAlreadyExists);
        let val = AppError::validation(ValidationFailure::EmptySignature);
        assert_ne!(dup.code(), val.code());
        assert_eq!(dup.status(), StatusCode::CONFLICT);
        assert_eq!(val.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn not_found_message_names_the_entity() {
        let store = I18nStore::new();
        let api = AppError::not_found(EntityKind::Contract, "CONT-2026-000001")
            .to_api_error(&Locale("pt".into()), &store);
        assert_eq!(api.status, StatusCode::NOT_FOUND);
        assert!(api.error.contains("contrato"));
        assert!(api.error.contains("CONT-2026-000001"));
    }

    #[test]
    fn signature_message_is_actionable_in_english() {
        let store = I18nStore::new();
        let api = AppError::validation(ValidationFailure::EmptySignature)
            .to_api_error(&Locale("en".into()), &store);
        assert!(api.error.to_lowercase().contains("sign"));
    }
}
