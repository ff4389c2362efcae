// src/services/notification_service.rs

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::document_store::{DocumentStore, NOTIFICATIONS},
    models::notification::{Notification, NotificationKind},
};

/// Canal de entrega de notificações.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn deliver(&self, notification: &Notification) -> Result<(), AppError>;
}

/// Grava a notificação na coleção `notificacoes` (lida pelo sininho da UI).
pub struct StoreNotifier {
    store: Arc<dyn DocumentStore>,
}

impl StoreNotifier {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Notifier for StoreNotifier {
    async fn deliver(&self, notification: &Notification) -> Result<(), AppError> {
        self.store
            .set(NOTIFICATIONS, &notification.id, serde_json::to_value(notification)?)
            .await?;
        Ok(())
    }
}

/// Envia a notificação como JSON para um webhook externo.
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::InternalServerError(anyhow::anyhow!(e)))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn deliver(&self, notification: &Notification) -> Result<(), AppError> {
        self.client
            .post(&self.url)
            .json(notification)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| AppError::InternalServerError(anyhow::anyhow!("webhook: {e}")))?;
        Ok(())
    }
}

/// Disparo "fire-and-forget": o fluxo nunca consome o resultado; falhas só viram log.
#[derive(Clone)]
pub struct NotificationService {
    notifier: Arc<dyn Notifier>,
    timeout: Duration,
}

impl NotificationService {
    pub fn new(notifier: Arc<dyn Notifier>, timeout: Duration) -> Self {
        Self { notifier, timeout }
    }

    pub async fn notify(&self, kind: NotificationKind, recipient_id: &str, payload: Value) {
        let notification = Notification {
            id: Uuid::new_v4().to_string(),
            kind,
            recipient_id: recipient_id.to_string(),
            payload,
            read: false,
            created_at: Utc::now(),
        };

        match tokio::time::timeout(self.timeout, self.notifier.deliver(&notification)).await {
            Ok(Ok(())) => {
                tracing::debug!("🔔 Notificação {:?} entregue para {}", kind, recipient_id);
            }
            Ok(Err(e)) => {
                tracing::warn!("Falha ao notificar {:?} para {}: {}", kind, recipient_id, e);
            }
            Err(_) => {
                tracing::warn!(
                    "Notificação {:?} para {} excedeu {:?}",
                    kind,
                    recipient_id,
                    self.timeout
                );
            }
        }
    }
}
