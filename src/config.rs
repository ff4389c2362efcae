// src/config.rs

use std::{env, path::PathBuf, sync::Arc, time::Duration};

use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    common::{i18n::I18nStore, ids::IdGenerator},
    db::{
        DocumentStore, EntityRepository, FileLocalCache, LocalCache, MemoryDocumentStore,
        PgDocumentStore, PortfolioRepository,
    },
    services::{
        catalog_service::CatalogService,
        crm_service::CrmService,
        document_service::DocumentService,
        notification_service::{NotificationService, Notifier, StoreNotifier, WebhookNotifier},
        portfolio_service::PortfolioService,
        project_poller::ProjectPoller,
        project_service::ProjectService,
        workflow_service::WorkflowService,
    },
};

// Identidade usada pelo poller do painel no cache local
const PANEL_UID: &str = "painel";

#[derive(Debug, Clone)]
pub struct Settings {
    /// Sem URL, os documentos ficam em memória (desenvolvimento).
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub bind_addr: String,
    pub local_cache_dir: PathBuf,
    pub project_poll_interval: Duration,
    pub notify_webhook_url: Option<String>,
    pub notify_timeout: Duration,
    pub fonts_dir: PathBuf,
    pub font_family: String,
    pub agency_name: String,
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|s| !s.trim().is_empty())
}

fn number(name: &str, default: u64) -> anyhow::Result<u64> {
    match optional(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("{name} deve ser um número inteiro positivo")),
        None => Ok(default),
    }
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = optional("DATABASE_URL");
        if let Some(url) = &database_url {
            if !url.starts_with("postgresql://") && !url.starts_with("postgres://") {
                anyhow::bail!("DATABASE_URL deve começar com postgresql:// ou postgres://");
            }
        }

        let notify_webhook_url = optional("NOTIFY_WEBHOOK_URL");
        if let Some(url) = &notify_webhook_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                anyhow::bail!("NOTIFY_WEBHOOK_URL deve começar com http:// ou https://");
            }
        }

        let poll_secs = number("PROJECT_POLL_INTERVAL_SECS", 5)?;
        if poll_secs == 0 {
            anyhow::bail!("PROJECT_POLL_INTERVAL_SECS deve ser maior que zero");
        }

        Ok(Self {
            database_url,
            jwt_secret: optional("JWT_SECRET")
                .ok_or_else(|| anyhow::anyhow!("JWT_SECRET deve ser definido"))?,
            bind_addr: optional("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string()),
            local_cache_dir: optional("LOCAL_CACHE_DIR")
                .unwrap_or_else(|| "./.cache".to_string())
                .into(),
            project_poll_interval: Duration::from_secs(poll_secs),
            notify_webhook_url,
            notify_timeout: Duration::from_millis(number("NOTIFY_TIMEOUT_MS", 3000)?),
            fonts_dir: optional("FONTS_DIR").unwrap_or_else(|| "./fonts".to_string()).into(),
            font_family: optional("FONT_FAMILY").unwrap_or_else(|| "Roboto".to_string()),
            agency_name: optional("AGENCY_NAME").unwrap_or_else(|| "Agência".to_string()),
        })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db_pool: Option<PgPool>,
    pub jwt_secret: String,
    pub i18n_store: Arc<I18nStore>,
    pub workflow_service: WorkflowService,
    pub crm_service: CrmService,
    pub project_service: ProjectService,
    pub portfolio_service: PortfolioService,
    pub catalog_service: CatalogService,
    pub document_service: DocumentService,
    pub project_poller: Arc<ProjectPoller>,
}

impl AppState {
    pub async fn new(settings: &Settings) -> anyhow::Result<Self> {
        let (store, db_pool): (Arc<dyn DocumentStore>, Option<PgPool>) = match &settings.database_url {
            Some(url) => {
                let pool = PgPoolOptions::new()
                    .max_connections(5)
                    .acquire_timeout(Duration::from_secs(3))
                    .connect(url)
                    .await?;
                tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");
                (Arc::new(PgDocumentStore::new(pool.clone())), Some(pool))
            }
            None => {
                tracing::warn!("DATABASE_URL ausente: usando armazenamento em memória");
                (Arc::new(MemoryDocumentStore::new()), None)
            }
        };

        let cache: Arc<dyn LocalCache> = Arc::new(FileLocalCache::new(&settings.local_cache_dir));

        let notifier: Arc<dyn Notifier> = match &settings.notify_webhook_url {
            Some(url) => Arc::new(WebhookNotifier::new(url.clone(), settings.notify_timeout)?),
            None => Arc::new(StoreNotifier::new(Arc::clone(&store))),
        };

        Ok(Self::assemble(settings, store, cache, notifier, db_pool))
    }

    /// Monta o gráfico de dependências sobre os armazenamentos dados.
    pub fn assemble(
        settings: &Settings,
        store: Arc<dyn DocumentStore>,
        cache: Arc<dyn LocalCache>,
        notifier: Arc<dyn Notifier>,
        db_pool: Option<PgPool>,
    ) -> Self {
        let ids = IdGenerator::new();
        let notifications = NotificationService::new(notifier, settings.notify_timeout);

        let clients = EntityRepository::new(Arc::clone(&store), Arc::clone(&cache));
        let solicitations = EntityRepository::new(Arc::clone(&store), Arc::clone(&cache));
        let projects = EntityRepository::new(Arc::clone(&store), Arc::clone(&cache));
        let signed = EntityRepository::new(Arc::clone(&store), Arc::clone(&cache));
        let catalog = EntityRepository::new(Arc::clone(&store), Arc::clone(&cache));

        let document_service = DocumentService::new(
            settings.fonts_dir.clone(),
            settings.font_family.clone(),
            settings.agency_name.clone(),
            ids.clone(),
        );
        let catalog_service = CatalogService::new(catalog);
        let crm_service = CrmService::new(clients.clone(), notifications.clone());
        let project_service = ProjectService::new(projects, clients.clone(), notifications.clone());
        let portfolio_service =
            PortfolioService::new(clients.clone(), PortfolioRepository::new(Arc::clone(&cache)));
        let workflow_service = WorkflowService::new(
            solicitations,
            clients,
            signed,
            catalog_service.clone(),
            project_service.clone(),
            notifications,
            ids,
            Arc::new(document_service.clone()),
        );

        let project_poller = Arc::new(ProjectPoller::spawn(
            project_service.clone(),
            PANEL_UID,
            settings.project_poll_interval,
        ));

        Self {
            db_pool,
            jwt_secret: settings.jwt_secret.clone(),
            i18n_store: Arc::new(I18nStore::new()),
            workflow_service,
            crm_service,
            project_service,
            portfolio_service,
            catalog_service,
            document_service,
            project_poller,
        }
    }
}
