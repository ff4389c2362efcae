// src/db/memory_store.rs

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::broadcast;

use crate::db::document_store::{
    matches_field, merge_shallow, DocumentStore, SnapshotCallback, StoreError, Subscription,
};

type Collections = HashMap<String, BTreeMap<String, Value>>;

struct Inner {
    collections: RwLock<Collections>,
    changes: broadcast::Sender<String>,
    offline: AtomicBool,
}

/// Armazenamento de documentos em memória, com feed de mudanças por coleção.
///
/// Usado quando não há `DATABASE_URL` e nos testes. `set_offline(true)` simula o remoto
/// fora do ar: toda operação passa a falhar com `StoreError::Unavailable`.
#[derive(Clone)]
pub struct MemoryDocumentStore {
    inner: Arc<Inner>,
}

impl Default for MemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(256);
        Self {
            inner: Arc::new(Inner {
                collections: RwLock::new(HashMap::new()),
                changes,
                offline: AtomicBool::new(false),
            }),
        }
    }

    pub fn set_offline(&self, offline: bool) {
        self.inner.offline.store(offline, Ordering::SeqCst);
    }

    /// Quantos documentos existem na coleção (ignora o modo offline).
    pub fn count(&self, collection: &str) -> usize {
        self.read()
            .map(|c| c.get(collection).map_or(0, BTreeMap::len))
            .unwrap_or(0)
    }

    fn ensure_online(&self) -> Result<(), StoreError> {
        if self.inner.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store offline".to_string()));
        }
        Ok(())
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Collections>, StoreError> {
        self.inner
            .collections
            .read()
            .map_err(|_| StoreError::Backend("lock envenenado".to_string()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Collections>, StoreError> {
        self.inner
            .collections
            .write()
            .map_err(|_| StoreError::Backend("lock envenenado".to_string()))
    }

    fn notify(&self, collection: &str) {
        // Sem assinantes o envio falha; não é erro.
        let _ = self.inner.changes.send(collection.to_string());
    }

    fn snapshot(&self, collection: &str, field: &str, value: &Value) -> Vec<Value> {
        self.read()
            .map(|c| {
                c.get(collection)
                    .map(|docs| {
                        docs.values()
                            .filter(|doc| matches_field(doc, field, value))
                            .cloned()
                            .collect()
                    })
                    .unwrap_or_default()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
        self.ensure_online()?;
        Ok(self.read()?.get(collection).and_then(|docs| docs.get(id)).cloned())
    }

    async fn list(&self, collection: &str) -> Result<Vec<Value>, StoreError> {
        self.ensure_online()?;
        Ok(self
            .read()?
            .get(collection)
            .map(|docs| docs.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn query(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<Value>, StoreError> {
        self.ensure_online()?;
        Ok(self.snapshot(collection, field, value))
    }

    async fn set(&self, collection: &str, id: &str, document: Value) -> Result<(), StoreError> {
        self.ensure_online()?;
        self.write()?
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), document);
        self.notify(collection);
        Ok(())
    }

    async fn create(&self, collection: &str, id: &str, document: Value) -> Result<bool, StoreError> {
        self.ensure_online()?;
        let created = {
            let mut collections = self.write()?;
            let docs = collections.entry(collection.to_string()).or_default();
            if docs.contains_key(id) {
                false
            } else {
                docs.insert(id.to_string(), document);
                true
            }
        };
        if created {
            self.notify(collection);
        }
        Ok(created)
    }

    async fn update(&self, collection: &str, id: &str, partial: Value) -> Result<(), StoreError> {
        self.ensure_online()?;
        {
            let mut collections = self.write()?;
            let doc = collections
                .get_mut(collection)
                .and_then(|docs| docs.get_mut(id))
                .ok_or_else(|| StoreError::NotFound {
                    collection: collection.to_string(),
                    id: id.to_string(),
                })?;
            merge_shallow(doc, partial)?;
        }
        self.notify(collection);
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        self.ensure_online()?;
        let removed = self
            .write()?
            .get_mut(collection)
            .and_then(|docs| docs.remove(id))
            .is_some();
        if removed {
            self.notify(collection);
        }
        Ok(())
    }

    async fn subscribe(
        &self,
        collection: &str,
        field: &str,
        value: Value,
        callback: SnapshotCallback,
    ) -> Result<Subscription, StoreError> {
        self.ensure_online()?;

        // Assina antes do snapshot inicial para não perder mudanças no meio.
        let mut changes = self.inner.changes.subscribe();
        callback(self.snapshot(collection, field, &value));

        let store = self.clone();
        let collection = collection.to_string();
        let field = field.to_string();
        let task = tokio::spawn(async move {
            loop {
                match changes.recv().await {
                    Ok(changed) if changed == collection => {
                        callback(store.snapshot(&collection, &field, &value));
                    }
                    Ok(_) => continue,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::debug!("Assinatura de '{}' atrasada em {} eventos", collection, skipped);
                        callback(store.snapshot(&collection, &field, &value));
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        Ok(Subscription::new(task))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn create_never_overwrites() {
        let store = MemoryDocumentStore::new();
        assert!(store.create("projetos", "PROJ-1", json!({ "v": 1 })).await.unwrap());
        assert!(!store.create("projetos", "PROJ-1", json!({ "v": 2 })).await.unwrap());

        let doc = store.get("projetos", "PROJ-1").await.unwrap().unwrap();
        assert_eq!(doc["v"], 1);
        assert_eq!(store.count("projetos"), 1);

        store.set_offline(true);
        assert!(store.create("projetos", "PROJ-2", json!({})).await.is_err());
    }
}
