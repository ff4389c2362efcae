// src/services/catalog_service.rs

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    common::error::{AppError, ValidationFailure},
    db::{EntityRepository, Scope},
    models::{auth::Caller, catalog::CatalogService as CatalogEntry},
    services::transition::{Transition, TransitionReport},
};

// O catálogo é público; o espelho local dele fica sob este uid.
const CATALOG_CACHE_UID: &str = "publico";

#[derive(Clone)]
pub struct CatalogService {
    entries: EntityRepository<CatalogEntry>,
}

impl CatalogService {
    pub fn new(entries: EntityRepository<CatalogEntry>) -> Self {
        Self { entries }
    }

    /// Só os serviços ativos, para a vitrine do portal.
    pub async fn list(&self) -> Result<Vec<CatalogEntry>, AppError> {
        let loaded = self.entries.load(CATALOG_CACHE_UID, &Scope::All).await?;
        Ok(loaded.items.into_iter().filter(|s| s.ativo).collect())
    }

    pub async fn get(&self, id: &str) -> Result<Option<CatalogEntry>, AppError> {
        self.entries.get(CATALOG_CACHE_UID, id).await
    }

    pub async fn upsert(&self, caller: &Caller, mut entry: CatalogEntry) -> Result<Transition<CatalogEntry>, AppError> {
        if !caller.is_staff() {
            return Err(AppError::Forbidden);
        }
        if entry.name.trim().is_empty() {
            return Err(AppError::validation(ValidationFailure::RequiredField("nome")));
        }
        if entry.value < Decimal::ZERO {
            return Err(AppError::validation(ValidationFailure::NegativeValue));
        }
        if entry.id.trim().is_empty() {
            entry.id = Uuid::new_v4().to_string();
        }

        let mut report = TransitionReport::default();
        let outcome = self.entries.persist(CATALOG_CACHE_UID, &entry).await?;
        report.note("catálogo", &outcome);
        tracing::info!("Serviço de catálogo {} salvo", entry.id);
        Ok(Transition::new(entry, report))
    }
}
