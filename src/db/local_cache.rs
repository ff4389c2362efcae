// src/db/local_cache.rs

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("falha de E/S no cache local: {0}")]
    Io(#[from] std::io::Error),

    #[error("cache local corrompido: {0}")]
    Corrupted(String),
}

/// Chave por usuário, no formato `<coleção>_<uid>`.
pub fn cache_key(collection: &str, uid: &str) -> String {
    format!("{collection}_{uid}")
}

/// Armazenamento chave/valor de strings, privado por usuário (espelho offline).
#[async_trait]
pub trait LocalCache: Send + Sync {
    async fn get_item(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set_item(&self, key: &str, value: String) -> Result<(), CacheError>;

    async fn remove_item(&self, key: &str) -> Result<(), CacheError>;
}

#[derive(Default)]
pub struct MemoryLocalCache {
    items: RwLock<HashMap<String, String>>,
}

impl MemoryLocalCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LocalCache for MemoryLocalCache {
    async fn get_item(&self, key: &str) -> Result<Option<String>, CacheError> {
        let items = self
            .items
            .read()
            .map_err(|_| CacheError::Corrupted("lock envenenado".to_string()))?;
        Ok(items.get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: String) -> Result<(), CacheError> {
        self.items
            .write()
            .map_err(|_| CacheError::Corrupted("lock envenenado".to_string()))?
            .insert(key.to_string(), value);
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<(), CacheError> {
        self.items
            .write()
            .map_err(|_| CacheError::Corrupted("lock envenenado".to_string()))?
            .remove(key);
        Ok(())
    }
}

/// Um arquivo por chave dentro de um diretório; o nome é a chave em base64 (URL-safe),
/// então chaves distintas nunca caem no mesmo arquivo.
pub struct FileLocalCache {
    dir: PathBuf,
}

impl FileLocalCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", URL_SAFE_NO_PAD.encode(key)))
    }
}

#[async_trait]
impl LocalCache for FileLocalCache {
    async fn get_item(&self, key: &str) -> Result<Option<String>, CacheError> {
        match tokio::fs::read_to_string(self.path_for(key)).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set_item(&self, key: &str, value: String) -> Result<(), CacheError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        // Escreve num temporário e renomeia para não deixar arquivo pela metade.
        let target = self.path_for(key);
        let tmp = target.with_extension("json.tmp");
        tokio::fs::write(&tmp, value).await?;
        tokio::fs::rename(&tmp, &target).await?;
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<(), CacheError> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn file_cache_round_trips_with_path_like_keys() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileLocalCache::new(dir.path());
        let key = cache_key("solicitacoes_clientes", "uid/../x");

        assert_eq!(cache.get_item(&key).await.unwrap(), None);
        cache.set_item(&key, "[]".to_string()).await.unwrap();
        assert_eq!(cache.get_item(&key).await.unwrap().as_deref(), Some("[]"));

        let files: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(files.len(), 1);

        cache.remove_item(&key).await.unwrap();
        cache.remove_item(&key).await.unwrap();
        assert_eq!(cache.get_item(&key).await.unwrap(), None);
    }

    #[tokio::test]
    async fn keys_that_differ_only_in_punctuation_stay_apart() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileLocalCache::new(dir.path());
        let slashed = cache_key("projetos", "uid/../x");
        let underscored = cache_key("projetos", "uid_.._x");

        cache.set_item(&slashed, "[\"a\"]".to_string()).await.unwrap();
        cache.set_item(&underscored, "[\"b\"]".to_string()).await.unwrap();

        assert_eq!(cache.get_item(&slashed).await.unwrap().as_deref(), Some("[\"a\"]"));
        assert_eq!(cache.get_item(&underscored).await.unwrap().as_deref(), Some("[\"b\"]"));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);

        cache.remove_item(&slashed).await.unwrap();
        assert_eq!(cache.get_item(&underscored).await.unwrap().as_deref(), Some("[\"b\"]"));
    }
}
