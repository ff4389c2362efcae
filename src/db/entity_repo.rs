// src/db/entity_repo.rs

use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::{
    common::error::{AppError, EntityKind},
    db::{
        document_store::{matches_field, DocumentStore, StoreError, Subscription},
        local_cache::{cache_key, CacheError, LocalCache},
    },
};

const ADMIN_FIELD: &str = "adminId";

/// Entidade persistida como documento numa coleção nomeada.
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const COLLECTION: &'static str;
    const KIND: EntityKind;
    /// Campo que aponta para o cliente dono, quando existe.
    const CLIENT_FIELD: Option<&'static str> = None;

    fn id(&self) -> &str;

    fn admin_id(&self) -> Option<&str> {
        None
    }

    fn client_id(&self) -> Option<&str> {
        None
    }
}

/// Recorte de visibilidade de quem está lendo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// Webmaster: enxerga tudo.
    All,
    /// Admin: entidades com o seu `adminId` ou de clientes da sua carteira.
    OwnedByAdmin {
        admin_id: String,
        client_ids: Vec<String>,
    },
    /// Cliente do portal: apenas o que é dele.
    OwnedByClient(String),
}

impl Scope {
    pub fn admits<T: Entity>(&self, entity: &T) -> bool {
        match self {
            Scope::All => true,
            Scope::OwnedByAdmin { admin_id, client_ids } => {
                entity.admin_id() == Some(admin_id.as_str())
                    || entity
                        .client_id()
                        .is_some_and(|c| client_ids.iter().any(|id| id == c))
            }
            Scope::OwnedByClient(client_id) => entity.client_id() == Some(client_id.as_str()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Loaded<T> {
    #[serde(rename = "itens")]
    pub items: Vec<T>,
    /// `true` quando o remoto falhou e só o cache local respondeu.
    #[serde(rename = "degradado")]
    pub degraded: bool,
}

/// Resultado de uma escrita. `LocalOnly` é o canal de erro recuperável: o dado está salvo
/// no espelho local, mas o remoto não confirmou.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistOutcome {
    Remote,
    LocalOnly { reason: String },
}

impl PersistOutcome {
    pub fn is_degraded(&self) -> bool {
        matches!(self, PersistOutcome::LocalOnly { .. })
    }
}

/// Mantém a primeira posição de cada chave com o último valor visto.
pub fn dedup_by<T, K, F>(items: Vec<T>, key: F) -> Vec<T>
where
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    let mut index: HashMap<K, usize> = HashMap::new();
    let mut out: Vec<T> = Vec::with_capacity(items.len());
    for item in items {
        match index.get(&key(&item)) {
            Some(&pos) => out[pos] = item,
            None => {
                index.insert(key(&item), out.len());
                out.push(item);
            }
        }
    }
    out
}

/// Remoto vence em conflito de `id`; o cache local só preenche lacunas.
pub fn merge_remote_wins<T: Entity>(local: Vec<T>, remote: Vec<T>) -> Vec<T> {
    let remote = dedup_by(remote, |e: &T| e.id().to_string());
    let mut merged = remote;
    let known: HashSet<String> = merged.iter().map(|e| e.id().to_string()).collect();
    merged.extend(
        dedup_by(local, |e: &T| e.id().to_string())
            .into_iter()
            .filter(|e| !known.contains(e.id())),
    );
    merged
}

/// Leitura/escrita de uma coleção nos dois armazenamentos, com reconciliação.
pub struct EntityRepository<T> {
    store: Arc<dyn DocumentStore>,
    cache: Arc<dyn LocalCache>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for EntityRepository<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            cache: Arc::clone(&self.cache),
            _marker: PhantomData,
        }
    }
}

impl<T: Entity> EntityRepository<T> {
    pub fn new(store: Arc<dyn DocumentStore>, cache: Arc<dyn LocalCache>) -> Self {
        Self {
            store,
            cache,
            _marker: PhantomData,
        }
    }

    // Documentos que não batem com o esquema são descartados na leitura.
    fn decode(doc: Value) -> Option<T> {
        match serde_json::from_value::<T>(doc) {
            Ok(entity) => Some(entity),
            Err(e) => {
                tracing::warn!("Documento inválido em '{}' descartado: {}", T::COLLECTION, e);
                None
            }
        }
    }

    fn decode_all(docs: Vec<Value>) -> Vec<T> {
        docs.into_iter().filter_map(Self::decode).collect()
    }

    async fn read_local(&self, uid: &str) -> Result<Vec<T>, CacheError> {
        let Some(raw) = self.cache.get_item(&cache_key(T::COLLECTION, uid)).await? else {
            return Ok(Vec::new());
        };
        match serde_json::from_str::<Vec<Value>>(&raw) {
            Ok(docs) => Ok(Self::decode_all(docs)),
            Err(e) => Err(CacheError::Corrupted(e.to_string())),
        }
    }

    async fn write_local(&self, uid: &str, items: &[T]) -> Result<(), AppError> {
        let raw = serde_json::to_string(items)?;
        self.cache
            .set_item(&cache_key(T::COLLECTION, uid), raw)
            .await?;
        Ok(())
    }

    /// Upsert no espelho local do usuário.
    async fn mirror(&self, uid: &str, entities: &[T]) -> Result<(), AppError> {
        self.reconcile(uid, entities, &HashSet::new()).await
    }

    /// Tira do espelho os ids em `stale` e faz upsert de `entities`.
    async fn reconcile(&self, uid: &str, entities: &[T], stale: &HashSet<String>) -> Result<(), AppError> {
        let current = match self.read_local(uid).await {
            Ok(items) => items,
            Err(CacheError::Corrupted(reason)) => {
                tracing::warn!("Cache local de '{}' corrompido, recriando: {}", T::COLLECTION, reason);
                Vec::new()
            }
            Err(e) => return Err(e.into()),
        };
        let mut all: Vec<T> = current
            .into_iter()
            .filter(|item| !stale.contains(item.id()))
            .collect();
        all.extend(entities.iter().cloned());
        let all = dedup_by(all, |e: &T| e.id().to_string());
        self.write_local(uid, &all).await
    }

    async fn mirror_best_effort(&self, uid: &str, entities: &[T]) {
        self.reconcile_best_effort(uid, entities, &HashSet::new()).await;
    }

    async fn reconcile_best_effort(&self, uid: &str, entities: &[T], stale: &HashSet<String>) {
        if entities.is_empty() && stale.is_empty() {
            return;
        }
        if !stale.is_empty() {
            tracing::debug!("🧹 {} itens de '{}' sumiram do remoto, limpando o espelho", stale.len(), T::COLLECTION);
        }
        if let Err(e) = self.reconcile(uid, entities, stale).await {
            tracing::warn!("Falha ao espelhar '{}' no cache local: {}", T::COLLECTION, e);
        }
    }

    // =========================================================================
    //  PENDENTES: gravados só no cache, ainda sem confirmação do remoto
    // =========================================================================

    fn pending_key(uid: &str) -> String {
        cache_key(&format!("{}_pendentes", T::COLLECTION), uid)
    }

    async fn pending(&self, uid: &str) -> HashSet<String> {
        match self.cache.get_item(&Self::pending_key(uid)).await {
            Ok(Some(raw)) => serde_json::from_str::<Vec<String>>(&raw)
                .map(|ids| ids.into_iter().collect())
                .unwrap_or_else(|e| {
                    tracing::warn!("Lista de pendentes de '{}' ilegível: {}", T::COLLECTION, e);
                    HashSet::new()
                }),
            Ok(None) => HashSet::new(),
            Err(e) => {
                tracing::warn!("Lista de pendentes de '{}' indisponível: {}", T::COLLECTION, e);
                HashSet::new()
            }
        }
    }

    async fn set_pending(&self, uid: &str, id: &str, pending: bool) {
        let mut ids = self.pending(uid).await;
        let changed = if pending { ids.insert(id.to_string()) } else { ids.remove(id) };
        if !changed {
            return;
        }
        let mut ids: Vec<String> = ids.into_iter().collect();
        ids.sort();
        let result = match serde_json::to_string(&ids) {
            Ok(raw) => self.cache.set_item(&Self::pending_key(uid), raw).await.map_err(AppError::from),
            Err(e) => Err(e.into()),
        };
        if let Err(e) = result {
            tracing::warn!("Falha ao registrar pendente {}/{}: {}", T::COLLECTION, id, e);
        }
    }

    pub async fn get(&self, uid: &str, id: &str) -> Result<Option<T>, AppError> {
        match self.store.get(T::COLLECTION, id).await {
            Ok(Some(doc)) => Ok(Self::decode(doc)),
            // Remoto no ar e sem o documento: só vale a cópia local ainda não confirmada
            Ok(None) => {
                if self.pending(uid).await.contains(id) {
                    return Ok(self.local_by_id(uid, id).await);
                }
                let stale = HashSet::from([id.to_string()]);
                if self.local_by_id(uid, id).await.is_some() {
                    self.reconcile_best_effort(uid, &[], &stale).await;
                }
                Ok(None)
            }
            Err(e) => {
                tracing::warn!("Leitura remota de {}/{} falhou, usando cache local: {}", T::COLLECTION, id, e);
                match self.read_local(uid).await {
                    Ok(items) => Ok(items.into_iter().find(|item| item.id() == id)),
                    Err(cache_err) => {
                        tracing::error!("Cache local também falhou: {}", cache_err);
                        Err(AppError::DataUnavailable)
                    }
                }
            }
        }
    }

    /// Como `get`, mas ausência vira `NotFound` com o tipo da entidade.
    pub async fn require(&self, uid: &str, id: &str) -> Result<T, AppError> {
        self.get(uid, id)
            .await?
            .ok_or_else(|| AppError::not_found(T::KIND, id))
    }

    async fn local_by_id(&self, uid: &str, id: &str) -> Option<T> {
        self.read_local(uid)
            .await
            .ok()
            .and_then(|items| items.into_iter().find(|item| item.id() == id))
    }

    async fn local_matching(&self, uid: &str, field: &str, value: &Value) -> Result<Vec<T>, CacheError> {
        Ok(self
            .read_local(uid)
            .await?
            .into_iter()
            .filter(|item| {
                serde_json::to_value(item)
                    .map(|doc| matches_field(&doc, field, value))
                    .unwrap_or(false)
            })
            .collect())
    }

    /// Igualdade em um campo (aceita caminho pontuado). Com o remoto no ar, do local só
    /// entram as gravações pendentes.
    pub async fn find_by(&self, uid: &str, field: &str, value: Value) -> Result<Vec<T>, AppError> {
        let local = self.local_matching(uid, field, &value).await;
        match self.store.query(T::COLLECTION, field, &value).await {
            Ok(docs) => {
                let remote = Self::decode_all(docs);
                let local = self.keep_pending(uid, local.unwrap_or_default(), &remote).await;
                Ok(merge_remote_wins(local, remote))
            }
            Err(e) => {
                tracing::warn!("Consulta remota em '{}' falhou, usando cache local: {}", T::COLLECTION, e);
                local.map_err(|cache_err| {
                    tracing::error!("Cache local também falhou: {}", cache_err);
                    AppError::DataUnavailable
                })
            }
        }
    }

    async fn load_remote(&self, scope: &Scope) -> Result<Vec<T>, AppError> {
        let docs = match scope {
            Scope::All => self.store.list(T::COLLECTION).await?,
            Scope::OwnedByAdmin { admin_id, client_ids } => {
                let mut docs = self
                    .store
                    .query(T::COLLECTION, ADMIN_FIELD, &Value::from(admin_id.as_str()))
                    .await?;
                if let Some(field) = T::CLIENT_FIELD {
                    for client_id in client_ids {
                        docs.extend(
                            self.store
                                .query(T::COLLECTION, field, &Value::from(client_id.as_str()))
                                .await?,
                        );
                    }
                }
                docs
            }
            Scope::OwnedByClient(client_id) => match T::CLIENT_FIELD {
                Some(field) => {
                    self.store
                        .query(T::COLLECTION, field, &Value::from(client_id.as_str()))
                        .await?
                }
                None => Vec::new(),
            },
        };

        let items = Self::decode_all(docs)
            .into_iter()
            .filter(|item| scope.admits(item))
            .collect();
        Ok(dedup_by(items, |e: &T| e.id().to_string()))
    }

    // Separa o local em pendentes (mantidos) e fantasmas (apagados no remoto, saem do espelho).
    async fn split_local(&self, uid: &str, local: Vec<T>, remote: &[T]) -> (Vec<T>, HashSet<String>) {
        let remote_ids: HashSet<&str> = remote.iter().map(|e| e.id()).collect();
        let pending = self.pending(uid).await;
        let mut kept = Vec::new();
        let mut stale = HashSet::new();
        for item in local {
            if remote_ids.contains(item.id()) {
                continue;
            }
            if pending.contains(item.id()) {
                kept.push(item);
            } else {
                stale.insert(item.id().to_string());
            }
        }
        (kept, stale)
    }

    async fn keep_pending(&self, uid: &str, local: Vec<T>, remote: &[T]) -> Vec<T> {
        let (kept, stale) = self.split_local(uid, local, remote).await;
        self.reconcile_best_effort(uid, &[], &stale).await;
        kept
    }

    async fn keep_pending_and_mirror(&self, uid: &str, local: Vec<T>, remote: &[T]) -> Vec<T> {
        let (kept, stale) = self.split_local(uid, local, remote).await;
        self.reconcile_best_effort(uid, remote, &stale).await;
        kept
    }

    /// Lista no recorte pedido: remoto vence; do cache local só entram gravações que o
    /// remoto ainda não confirmou.
    pub async fn load(&self, uid: &str, scope: &Scope) -> Result<Loaded<T>, AppError> {
        let local = self
            .read_local(uid)
            .await
            .map(|items| items.into_iter().filter(|i| scope.admits(i)).collect::<Vec<_>>());

        match self.load_remote(scope).await {
            Ok(remote) => {
                let local = local.unwrap_or_else(|e| {
                    tracing::warn!("Cache local de '{}' ilegível: {}", T::COLLECTION, e);
                    Vec::new()
                });
                let local = self.keep_pending_and_mirror(uid, local, &remote).await;
                Ok(Loaded {
                    items: merge_remote_wins(local, remote),
                    degraded: false,
                })
            }
            Err(remote_err) => match local {
                Ok(items) => {
                    tracing::warn!(
                        "Remoto indisponível para '{}', servindo {} itens do cache local: {}",
                        T::COLLECTION,
                        items.len(),
                        remote_err
                    );
                    Ok(Loaded {
                        items,
                        degraded: true,
                    })
                }
                Err(cache_err) => {
                    tracing::error!(
                        "Leitura de '{}' falhou no remoto ({}) e no cache ({})",
                        T::COLLECTION,
                        remote_err,
                        cache_err
                    );
                    Err(AppError::DataUnavailable)
                }
            },
        }
    }

    /// Grava no remoto; se ele falhar, grava só no cache local e avisa via `LocalOnly`.
    /// Só retorna erro quando os dois armazenamentos falham.
    pub async fn persist(&self, uid: &str, entity: &T) -> Result<PersistOutcome, AppError> {
        let doc = serde_json::to_value(entity)?;
        match self.store.set(T::COLLECTION, entity.id(), doc).await {
            Ok(()) => {
                self.confirmed(uid, entity).await;
                Ok(PersistOutcome::Remote)
            }
            Err(remote_err) => self.degrade(uid, entity, remote_err).await,
        }
    }

    /// Como `persist`, mas só grava se o `id` estiver livre. `Ok(None)` quando já existe
    /// documento com esse id (quem chama gera outro e tenta de novo).
    /// Com o remoto fora do ar, a checagem se limita ao espelho local do usuário.
    pub async fn persist_new(&self, uid: &str, entity: &T) -> Result<Option<PersistOutcome>, AppError> {
        let doc = serde_json::to_value(entity)?;
        match self.store.create(T::COLLECTION, entity.id(), doc).await {
            Ok(true) => {
                self.confirmed(uid, entity).await;
                Ok(Some(PersistOutcome::Remote))
            }
            Ok(false) => {
                tracing::debug!("Id {}/{} já existe", T::COLLECTION, entity.id());
                Ok(None)
            }
            Err(remote_err) => {
                if self.local_by_id(uid, entity.id()).await.is_some() {
                    return Ok(None);
                }
                self.degrade(uid, entity, remote_err).await.map(Some)
            }
        }
    }

    async fn confirmed(&self, uid: &str, entity: &T) {
        self.mirror_best_effort(uid, std::slice::from_ref(entity)).await;
        self.set_pending(uid, entity.id(), false).await;
    }

    async fn degrade(
        &self,
        uid: &str,
        entity: &T,
        remote_err: StoreError,
    ) -> Result<PersistOutcome, AppError> {
        tracing::warn!(
            "Gravação remota de {}/{} falhou, degradando para cache local: {}",
            T::COLLECTION,
            entity.id(),
            remote_err
        );
        match self.mirror(uid, std::slice::from_ref(entity)).await {
            Ok(()) => {
                self.set_pending(uid, entity.id(), true).await;
                Ok(PersistOutcome::LocalOnly {
                    reason: remote_err.to_string(),
                })
            }
            Err(cache_err) => {
                tracing::error!("Cache local também falhou: {}", cache_err);
                Err(AppError::Store(remote_err))
            }
        }
    }

    /// Remoção definitiva (remoto e espelho local).
    pub async fn remove(&self, uid: &str, id: &str) -> Result<(), AppError> {
        self.store.delete(T::COLLECTION, id).await?;
        self.set_pending(uid, id, false).await;
        match self.read_local(uid).await {
            Ok(items) => {
                let kept: Vec<T> = items.into_iter().filter(|item| item.id() != id).collect();
                self.write_local(uid, &kept).await?;
            }
            Err(e) => tracing::warn!("Cache local de '{}' não pôde ser limpo: {}", T::COLLECTION, e),
        }
        Ok(())
    }

    /// Consulta viva decodificada e sem duplicatas. Guarde o `Subscription` enquanto a view
    /// existir; soltá-lo (ou chamar `cancel`) libera a assinatura.
    pub async fn subscribe<F>(&self, field: &str, value: Value, callback: F) -> Result<Subscription, AppError>
    where
        F: Fn(Vec<T>) + Send + Sync + 'static,
    {
        let subscription = self
            .store
            .subscribe(
                T::COLLECTION,
                field,
                value,
                Arc::new(move |docs: Vec<Value>| {
                    let items = dedup_by(Self::decode_all(docs), |e: &T| e.id().to_string());
                    callback(items);
                }),
            )
            .await?;
        Ok(subscription)
    }
}
