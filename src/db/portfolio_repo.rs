// src/db/portfolio_repo.rs

use std::sync::Arc;

use crate::{
    common::error::AppError,
    db::local_cache::{CacheError, LocalCache},
    models::portfolio::PortfolioItem,
};

const PORTFOLIO_KEY: &str = "portfolio";

/// O portfólio é uma lista plana no cache local, sem espelho remoto.
#[derive(Clone)]
pub struct PortfolioRepository {
    cache: Arc<dyn LocalCache>,
}

impl PortfolioRepository {
    pub fn new(cache: Arc<dyn LocalCache>) -> Self {
        Self { cache }
    }

    pub async fn list(&self) -> Result<Vec<PortfolioItem>, AppError> {
        let Some(raw) = self.cache.get_item(PORTFOLIO_KEY).await? else {
            return Ok(Vec::new());
        };
        serde_json::from_str(&raw)
            .map_err(|e| AppError::Cache(CacheError::Corrupted(e.to_string())))
    }

    pub async fn append(&self, item: PortfolioItem) -> Result<(), AppError> {
        let mut items = match self.list().await {
            Ok(items) => items,
            Err(AppError::Cache(CacheError::Corrupted(reason))) => {
                tracing::warn!("Portfólio local corrompido, recriando: {}", reason);
                Vec::new()
            }
            Err(e) => return Err(e),
        };
        // Mesmo serviço finalizado duas vezes não duplica a vitrine.
        items.retain(|existing| existing.id != item.id);
        items.push(item);
        self.cache
            .set_item(PORTFOLIO_KEY, serde_json::to_string(&items)?)
            .await?;
        Ok(())
    }
}
