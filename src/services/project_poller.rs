// src/services/project_poller.rs

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::{models::project::Project, services::project_service::ProjectService};

/// Lista de projetos recarregada em intervalo fixo para o painel administrativo.
/// Fica `None` até a primeira leitura concluir.
pub type ProjectSnapshot = Option<Arc<Vec<Project>>>;

pub struct ProjectPoller {
    rx: watch::Receiver<ProjectSnapshot>,
    task: JoinHandle<()>,
}

impl ProjectPoller {
    pub fn spawn(service: ProjectService, uid: impl Into<String>, every: Duration) -> Self {
        let uid = uid.into();
        let (tx, rx) = watch::channel(None);

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                match service.list_all(&uid).await {
                    Ok(loaded) => {
                        if loaded.degraded {
                            tracing::warn!("Poller de projetos servindo cache local");
                        }
                        if tx.send(Some(Arc::new(loaded.items))).is_err() {
                            // Nenhum leitor restante
                            break;
                        }
                    }
                    Err(e) => tracing::error!("Poller de projetos falhou: {e}"),
                }
            }
        });

        Self { rx, task }
    }

    pub fn subscribe(&self) -> watch::Receiver<ProjectSnapshot> {
        self.rx.clone()
    }

    pub fn latest(&self) -> ProjectSnapshot {
        self.rx.borrow().clone()
    }
}

impl Drop for ProjectPoller {
    fn drop(&mut self) {
        self.task.abort();
    }
}
