// src/db/pg_store.rs

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{postgres::PgListener, types::Json, PgPool, Row};

use crate::db::document_store::{DocumentStore, SnapshotCallback, StoreError, Subscription};

// Canal do LISTEN/NOTIFY usado pelas consultas vivas
const CHANGES_CHANNEL: &str = "documents_changed";

/// Documentos JSONB no Postgres: uma tabela `documents (collection, id, data)`.
#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn notify(&self, collection: &str) -> Result<(), StoreError> {
        sqlx::query("SELECT pg_notify($1, $2)")
            .bind(CHANGES_CHANNEL)
            .bind(collection)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;
        Ok(())
    }

    async fn fetch_matching(
        pool: &PgPool,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<Value>, StoreError> {
        let path: Vec<String> = field.split('.').map(str::to_string).collect();
        let rows = sqlx::query(
            r#"
            SELECT data FROM documents
            WHERE collection = $1 AND data #> $2 = $3
            ORDER BY updated_at ASC
            "#,
        )
        .bind(collection)
        .bind(path)
        .bind(Json(value))
        .fetch_all(pool)
        .await
        .map_err(map_sqlx)?;

        rows.into_iter().map(decode_row).collect()
    }
}

// Depois do commit, falha no NOTIFY só atrasa as assinaturas; a escrita vale.
fn committed(collection: &str, notified: Result<(), StoreError>) -> Result<(), StoreError> {
    if let Err(e) = notified {
        tracing::warn!("⚠️ Gravado em '{}', mas o NOTIFY falhou: {}", collection, e);
    }
    Ok(())
}

fn decode_row(row: sqlx::postgres::PgRow) -> Result<Value, StoreError> {
    row.try_get::<Json<Value>, _>("data")
        .map(|Json(v)| v)
        .map_err(map_sqlx)
}

// Falhas de conexão viram `Unavailable` (o repositório degrada para o cache local).
fn map_sqlx(e: sqlx::Error) -> StoreError {
    match e {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            StoreError::Unavailable(e.to_string())
        }
        other => StoreError::Backend(other.to_string()),
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
        let row = sqlx::query("SELECT data FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx)?;

        row.map(decode_row).transpose()
    }

    async fn list(&self, collection: &str) -> Result<Vec<Value>, StoreError> {
        let rows = sqlx::query(
            "SELECT data FROM documents WHERE collection = $1 ORDER BY updated_at ASC",
        )
        .bind(collection)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;

        rows.into_iter().map(decode_row).collect()
    }

    async fn query(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<Value>, StoreError> {
        Self::fetch_matching(&self.pool, collection, field, value).await
    }

    async fn set(&self, collection: &str, id: &str, document: Value) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO documents (collection, id, data)
            VALUES ($1, $2, $3)
            ON CONFLICT (collection, id)
            DO UPDATE SET data = EXCLUDED.data, updated_at = NOW()
            "#,
        )
        .bind(collection)
        .bind(id)
        .bind(Json(&document))
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;

        committed(collection, self.notify(collection).await)
    }

    async fn create(&self, collection: &str, id: &str, document: Value) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO documents (collection, id, data)
            VALUES ($1, $2, $3)
            ON CONFLICT (collection, id) DO NOTHING
            "#,
        )
        .bind(collection)
        .bind(id)
        .bind(Json(&document))
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;

        if result.rows_affected() == 0 {
            return Ok(false);
        }
        committed(collection, self.notify(collection).await)?;
        Ok(true)
    }

    async fn update(&self, collection: &str, id: &str, partial: Value) -> Result<(), StoreError> {
        if !partial.is_object() {
            return Err(StoreError::InvalidDocument("update exige objetos JSON".to_string()));
        }

        let result = sqlx::query(
            r#"
            UPDATE documents SET data = data || $3, updated_at = NOW()
            WHERE collection = $1 AND id = $2
            "#,
        )
        .bind(collection)
        .bind(id)
        .bind(Json(&partial))
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        }

        committed(collection, self.notify(collection).await)
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;

        if result.rows_affected() > 0 {
            committed(collection, self.notify(collection).await)?;
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
        let mut listener = PgListener::connect_with(&self.pool).await.map_err(map_sqlx)?;
        listener.listen(CHANGES_CHANNEL).await.map_err(map_sqlx)?;

        callback(Self::fetch_matching(&self.pool, collection, field, &value).await?);

        let pool = self.pool.clone();
        let collection = collection.to_string();
        let field = field.to_string();
        let task = tokio::spawn(async move {
            loop {
                match listener.recv().await {
                    Ok(notification) if notification.payload() == collection => {
                        match Self::fetch_matching(&pool, &collection, &field, &value).await {
                            Ok(docs) => callback(docs),
                            Err(e) => tracing::warn!("Falha ao atualizar assinatura de '{}': {}", collection, e),
                        }
                    }
                    Ok(_) => continue,
                    Err(e) => {
                        tracing::warn!("Listener de '{}' encerrado: {}", collection, e);
                        break;
                    }
                }
            }
        });

        Ok(Subscription::new(task))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notify_failure_after_commit_is_not_an_error() {
        let notified = Err(StoreError::Unavailable("conexão caiu".to_string()));
        assert!(committed("projetos", notified).is_ok());
        assert!(committed("projetos", Ok(())).is_ok());
    }
}
