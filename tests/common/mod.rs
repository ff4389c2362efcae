#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use agencia_backend::{
    common::{error::AppError, ids::IdGenerator},
    db::{
        document_store::{SnapshotCallback, StoreError, Subscription, NOTIFICATIONS},
        local_cache::CacheError,
        DocumentStore, EntityRepository, LocalCache, MemoryDocumentStore, MemoryLocalCache,
        PortfolioRepository,
    },
    models::{
        auth::Caller,
        contracts::Contract,
        crm::{Client, NewClient},
    },
    services::{
        catalog_service::CatalogService,
        crm_service::CrmService,
        document_service::{ContractInput, ContractRenderer, RenderedDocument},
        notification_service::{NotificationService, StoreNotifier},
        portfolio_service::PortfolioService,
        project_service::ProjectService,
        signature::capture_signature,
        transition::Transition,
        workflow_service::{NewSolicitation, ProposalDraft, SignContract, SignedContract, WorkflowService},
    },
};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{DynamicImage, ImageOutputFormat, Rgba, RgbaImage};
use rust_decimal::Decimal;
use serde_json::Value;

pub const ADMIN: &str = "adm-1";
pub const CLIENT: &str = "cli-1";

/// Renderizador sem fontes: valida como o real e devolve um PDF mínimo.
pub struct FakeRenderer;

impl ContractRenderer for FakeRenderer {
    fn render_contract(&self, input: &ContractInput<'_>) -> Result<RenderedDocument, AppError> {
        if !input.terms_accepted {
            return Err(AppError::validation(
                agencia_backend::common::error::ValidationFailure::TermsNotAccepted,
            ));
        }
        capture_signature(input.signature)?;
        let id = input.contract_id.unwrap_or("CONT-teste").to_string();
        Ok(RenderedDocument {
            bytes: b"%PDF-1.4 teste".to_vec(),
            file_name: format!("contrato_{id}.pdf"),
            contract_id: Some(id),
        })
    }
}

fn png_data_uri(img: RgbaImage) -> String {
    let mut out = Vec::new();
    DynamicImage::ImageRgba8(img)
        .write_to(&mut out, ImageOutputFormat::Png)
        .unwrap();
    format!("data:image/png;base64,{}", STANDARD.encode(out))
}

pub fn drawn_signature() -> String {
    let mut img = RgbaImage::from_pixel(60, 20, Rgba([255, 255, 255, 0]));
    for x in 5..50 {
        img.put_pixel(x, 10, Rgba([10, 10, 10, 255]));
    }
    png_data_uri(img)
}

pub fn blank_signature() -> String {
    png_data_uri(RgbaImage::from_pixel(60, 20, Rgba([0, 0, 0, 0])))
}

/// Devolve o controle ao runtime antes de cada operação, para que tarefas concorrentes
/// (`tokio::join!`) se intercalem entre a leitura e a escrita.
pub struct YieldingStore(pub MemoryDocumentStore);

#[async_trait]
impl DocumentStore for YieldingStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
        tokio::task::yield_now().await;
        self.0.get(collection, id).await
    }

    async fn list(&self, collection: &str) -> Result<Vec<Value>, StoreError> {
        tokio::task::yield_now().await;
        self.0.list(collection).await
    }

    async fn query(&self, collection: &str, field: &str, value: &Value) -> Result<Vec<Value>, StoreError> {
        tokio::task::yield_now().await;
        self.0.query(collection, field, value).await
    }

    async fn set(&self, collection: &str, id: &str, document: Value) -> Result<(), StoreError> {
        tokio::task::yield_now().await;
        self.0.set(collection, id, document).await
    }

    async fn create(&self, collection: &str, id: &str, document: Value) -> Result<bool, StoreError> {
        tokio::task::yield_now().await;
        self.0.create(collection, id, document).await
    }

    async fn update(&self, collection: &str, id: &str, partial: Value) -> Result<(), StoreError> {
        tokio::task::yield_now().await;
        self.0.update(collection, id, partial).await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        tokio::task::yield_now().await;
        self.0.delete(collection, id).await
    }

    async fn subscribe(
        &self,
        collection: &str,
        field: &str,
        value: Value,
        callback: SnapshotCallback,
    ) -> Result<Subscription, StoreError> {
        self.0.subscribe(collection, field, value, callback).await
    }
}

/// Escritas numa coleção falham enquanto `armed` estiver ligado; leituras seguem normais.
pub struct FailingWrites {
    pub inner: MemoryDocumentStore,
    pub collection: &'static str,
    pub armed: Arc<AtomicBool>,
}

impl FailingWrites {
    fn check(&self, collection: &str) -> Result<(), StoreError> {
        if collection == self.collection && self.armed.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(format!("escrita em '{collection}' recusada")));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for FailingWrites {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
        self.inner.get(collection, id).await
    }

    async fn list(&self, collection: &str) -> Result<Vec<Value>, StoreError> {
        self.inner.list(collection).await
    }

    async fn query(&self, collection: &str, field: &str, value: &Value) -> Result<Vec<Value>, StoreError> {
        self.inner.query(collection, field, value).await
    }

    async fn set(&self, collection: &str, id: &str, document: Value) -> Result<(), StoreError> {
        self.check(collection)?;
        self.inner.set(collection, id, document).await
    }

    async fn create(&self, collection: &str, id: &str, document: Value) -> Result<bool, StoreError> {
        self.check(collection)?;
        self.inner.create(collection, id, document).await
    }

    async fn update(&self, collection: &str, id: &str, partial: Value) -> Result<(), StoreError> {
        self.check(collection)?;
        self.inner.update(collection, id, partial).await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        self.inner.delete(collection, id).await
    }

    async fn subscribe(
        &self,
        collection: &str,
        field: &str,
        value: Value,
        callback: SnapshotCallback,
    ) -> Result<Subscription, StoreError> {
        self.inner.subscribe(collection, field, value, callback).await
    }
}

/// Cache que recusa gravar uma chave específica enquanto `armed` estiver ligado.
pub struct FailingCache {
    pub inner: MemoryLocalCache,
    pub key: String,
    pub armed: Arc<AtomicBool>,
}

#[async_trait]
impl LocalCache for FailingCache {
    async fn get_item(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.inner.get_item(key).await
    }

    async fn set_item(&self, key: &str, value: String) -> Result<(), CacheError> {
        if key == self.key && self.armed.load(Ordering::SeqCst) {
            return Err(CacheError::Corrupted("disco cheio".to_string()));
        }
        self.inner.set_item(key, value).await
    }

    async fn remove_item(&self, key: &str) -> Result<(), CacheError> {
        self.inner.remove_item(key).await
    }
}

fn workflow_over(
    remote: &Arc<dyn DocumentStore>,
    local: &Arc<dyn LocalCache>,
    clients: &EntityRepository<Client>,
    catalog: &CatalogService,
    projects: &ProjectService,
    notifications: &NotificationService,
    seed: u64,
) -> WorkflowService {
    WorkflowService::new(
        EntityRepository::new(Arc::clone(remote), Arc::clone(local)),
        clients.clone(),
        EntityRepository::new(Arc::clone(remote), Arc::clone(local)),
        catalog.clone(),
        projects.clone(),
        notifications.clone(),
        IdGenerator::starting_at(seed),
        Arc::new(FakeRenderer),
    )
}

pub struct Harness {
    pub store: MemoryDocumentStore,
    remote: Arc<dyn DocumentStore>,
    local: Arc<dyn LocalCache>,
    notifications: NotificationService,
    pub clients: EntityRepository<Client>,
    pub workflow: WorkflowService,
    pub crm: CrmService,
    pub projects: ProjectService,
    pub portfolio: PortfolioService,
    pub catalog: CatalogService,
}

impl Harness {
    pub fn new() -> Self {
        let store = MemoryDocumentStore::new();
        Self::over(store.clone(), Arc::new(store), Arc::new(MemoryLocalCache::new()))
    }

    /// `store` é o armazenamento inspecionado pelos testes; `remote` pode embrulhá-lo.
    pub fn over(store: MemoryDocumentStore, remote: Arc<dyn DocumentStore>, local: Arc<dyn LocalCache>) -> Self {
        let notifications = NotificationService::new(
            Arc::new(StoreNotifier::new(Arc::clone(&remote))),
            Duration::from_secs(1),
        );
        let clients = EntityRepository::new(Arc::clone(&remote), Arc::clone(&local));
        let catalog = CatalogService::new(EntityRepository::new(Arc::clone(&remote), Arc::clone(&local)));
        let projects = ProjectService::new(
            EntityRepository::new(Arc::clone(&remote), Arc::clone(&local)),
            clients.clone(),
            notifications.clone(),
        );
        let crm = CrmService::new(clients.clone(), notifications.clone());
        let portfolio = PortfolioService::new(clients.clone(), PortfolioRepository::new(Arc::clone(&local)));

        let workflow = workflow_over(&remote, &local, &clients, &catalog, &projects, &notifications, 1);

        Self {
            store,
            remote,
            local,
            notifications,
            clients,
            workflow,
            crm,
            projects,
            portfolio,
            catalog,
        }
    }

    /// Outra instância do fluxo sobre os mesmos armazenamentos, com o gerador de ids na
    /// semente dada (como um segundo processo, ou o mesmo depois de reiniciar).
    pub fn workflow_seeded(&self, seed: u64) -> WorkflowService {
        workflow_over(
            &self.remote,
            &self.local,
            &self.clients,
            &self.catalog,
            &self.projects,
            &self.notifications,
            seed,
        )
    }

    pub fn admin(&self) -> Caller {
        Caller::admin(ADMIN)
    }

    pub fn client(&self) -> Caller {
        Caller::client(CLIENT)
    }

    pub fn notification_count(&self) -> usize {
        self.store.count(NOTIFICATIONS)
    }

    /// Cliente do portal que se cadastra na carteira do admin.
    pub async fn register_client(&self) -> Client {
        let payload = NewClient {
            name: "Padaria Sol".to_string(),
            email: "contato@padariasol.com".to_string(),
            company: Some("Padaria Sol LTDA".to_string()),
            phone: None,
            address: None,
            admin_id: Some(ADMIN.to_string()),
        };
        self.crm
            .create_client(&self.client(), payload)
            .await
            .unwrap()
            .value
    }

    /// Outro cliente do portal na mesma carteira.
    pub async fn register(&self, uid: &str) -> Client {
        let payload = NewClient {
            name: format!("Cliente {uid}"),
            email: format!("contato@{uid}.com"),
            company: None,
            phone: None,
            address: None,
            admin_id: Some(ADMIN.to_string()),
        };
        self.crm
            .create_client(&Caller::client(uid), payload)
            .await
            .unwrap()
            .value
    }

    pub async fn client_record(&self) -> Client {
        self.clients.require(ADMIN, CLIENT).await.unwrap()
    }

    /// Solicitação, proposta de R$ 1800 e aceite, para um cliente já cadastrado.
    pub async fn accepted_contract_for(&self, uid: &str) -> Contract {
        let client = Caller::client(uid);
        let request = NewSolicitation {
            title: Some("Identidade visual".to_string()),
            category: Some("branding".to_string()),
            ..Default::default()
        };
        let sol = self.workflow.create(&client, request).await.unwrap().value;
        let draft = ProposalDraft {
            value: Decimal::new(1800, 0),
            description: "Logo, paleta e manual".to_string(),
            deadline: "20".to_string(),
            validity_days: None,
            services: None,
        };
        let proposal = self
            .workflow
            .submit_proposal(&self.admin(), &sol.id, draft)
            .await
            .unwrap()
            .value;
        self.workflow
            .accept_proposal(&client, &proposal.id)
            .await
            .unwrap()
            .value
    }

    pub async fn sign(&self, uid: &str, contract_id: &str) -> Result<Transition<SignedContract>, AppError> {
        self.workflow
            .sign_contract(
                &Caller::client(uid),
                contract_id,
                SignContract {
                    signature: drawn_signature(),
                    terms_accepted: true,
                    artifact: None,
                },
            )
            .await
    }

    /// Percorre o fluxo completo até o contrato assinado.
    pub async fn signed_contract(&self) -> SignedContract {
        self.register_client().await;
        let contract = self.accepted_contract_for(CLIENT).await;
        self.sign(CLIENT, &contract.id).await.unwrap().value
    }
}
