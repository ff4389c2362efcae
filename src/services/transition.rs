// src/services/transition.rs

use serde::Serialize;
use utoipa::ToSchema;

use crate::{common::error::AppError, db::PersistOutcome};

/// Avisos de escritas secundárias que degradaram ou falharam depois do ponto de commit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct TransitionReport {
    #[serde(rename = "avisos")]
    pub warnings: Vec<String>,
}

impl TransitionReport {
    pub fn note(&mut self, what: &str, outcome: &PersistOutcome) {
        if let PersistOutcome::LocalOnly { reason } = outcome {
            tracing::warn!("⚠️ {} salvo apenas no cache local: {}", what, reason);
            self.warnings.push(format!("{what}: salvo apenas localmente ({reason})"));
        }
    }

    pub fn partial(&mut self, what: &str, error: &AppError) {
        tracing::error!("🔥 Falha parcial em {}: {}", what, error);
        self.warnings.push(format!("{what}: {error}"));
    }

    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Resultado de uma transição aplicada.
#[derive(Debug, Clone, Serialize)]
pub struct Transition<T> {
    #[serde(rename = "dados")]
    pub value: T,
    #[serde(flatten)]
    pub report: TransitionReport,
}

impl<T> Transition<T> {
    pub fn new(value: T, report: TransitionReport) -> Self {
        Self { value, report }
    }
}
