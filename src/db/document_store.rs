// src/db/document_store.rs

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tokio::task::JoinHandle;

// Coleções do armazenamento remoto
pub const CLIENTS: &str = "clientes";
pub const SOLICITATIONS: &str = "solicitacoes_clientes";
pub const CATALOG: &str = "servicos";
pub const PROJECTS: &str = "projetos";
pub const SIGNED_CONTRACTS: &str = "contratos_assinados";
pub const NOTIFICATIONS: &str = "notificacoes";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("armazenamento indisponível: {0}")]
    Unavailable(String),

    #[error("documento inexistente: {collection}/{id}")]
    NotFound { collection: String, id: String },

    #[error("documento inválido: {0}")]
    InvalidDocument(String),

    #[error("falha no backend: {0}")]
    Backend(String),
}

/// Recebe o conjunto completo de resultados a cada mudança remota.
pub type SnapshotCallback = Arc<dyn Fn(Vec<Value>) + Send + Sync>;

/// Armazenamento remoto de documentos JSON (sem esquema) em coleções nomeadas.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError>;

    async fn list(&self, collection: &str) -> Result<Vec<Value>, StoreError>;

    /// Igualdade em um campo; `field` aceita caminho pontuado (`proposta.id`).
    async fn query(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<Value>, StoreError>;

    /// Upsert do documento inteiro.
    async fn set(&self, collection: &str, id: &str, document: Value) -> Result<(), StoreError>;

    /// Grava só se o `id` ainda estiver livre. `Ok(false)` quando já existe documento com ele.
    async fn create(&self, collection: &str, id: &str, document: Value) -> Result<bool, StoreError>;

    /// Mescla rasa das chaves de `partial`; falha se o documento não existir.
    async fn update(&self, collection: &str, id: &str, partial: Value) -> Result<(), StoreError>;

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError>;

    /// Consulta viva. O callback recebe o snapshot inicial e um novo a cada mudança.
    async fn subscribe(
        &self,
        collection: &str,
        field: &str,
        value: Value,
        callback: SnapshotCallback,
    ) -> Result<Subscription, StoreError>;
}

/// Navega um caminho pontuado dentro de um documento.
pub fn lookup_path<'a>(document: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(document, |current, segment| current.get(segment))
}

pub fn matches_field(document: &Value, field: &str, value: &Value) -> bool {
    lookup_path(document, field) == Some(value)
}

/// Mescla rasa usada por `update`.
pub fn merge_shallow(target: &mut Value, partial: Value) -> Result<(), StoreError> {
    let (Some(target), Value::Object(partial)) = (target.as_object_mut(), partial) else {
        return Err(StoreError::InvalidDocument(
            "update exige objetos JSON".to_string(),
        ));
    };
    for (key, value) in partial {
        target.insert(key, value);
    }
    Ok(())
}

/// Handle de uma consulta viva. Cancelar é idempotente; o `Drop` também cancela.
#[derive(Debug)]
pub struct Subscription {
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Subscription {
    pub fn new(task: JoinHandle<()>) -> Self {
        Self {
            task: Mutex::new(Some(task)),
        }
    }

    /// Retorna `true` apenas na primeira chamada efetiva.
    pub fn cancel(&self) -> bool {
        let task = match self.task.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        match task {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    pub fn is_active(&self) -> bool {
        match self.task.lock() {
            Ok(guard) => guard.as_ref().is_some_and(|h| !h.is_finished()),
            Err(_) => false,
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn lookup_path_walks_nested_objects() {
        let doc = json!({ "proposta": { "id": "PROP-1" }, "status": "nova" });
        assert_eq!(lookup_path(&doc, "proposta.id"), Some(&json!("PROP-1")));
        assert_eq!(lookup_path(&doc, "status"), Some(&json!("nova")));
        assert_eq!(lookup_path(&doc, "contrato.id"), None);
    }

    #[test]
    fn merge_shallow_overwrites_top_level_keys_only() {
        let mut doc = json!({ "a": 1, "b": { "c": 2 } });
        merge_shallow(&mut doc, json!({ "b": { "d": 3 } })).unwrap();
        assert_eq!(doc, json!({ "a": 1, "b": { "d": 3 } }));
    }

    #[tokio::test]
    async fn cancel_is_idempotent() {
        let sub = Subscription::new(tokio::spawn(std::future::pending::<()>()));
        assert!(sub.is_active());
        assert!(sub.cancel());
        assert!(!sub.cancel());
        assert!(!sub.is_active());
    }
}
