/// Entrega de notificações por webhook, com o servidor externo simulado
use std::sync::Arc;
use std::time::Duration;

use agencia_backend::{
    models::notification::NotificationKind,
    services::notification_service::{NotificationService, Notifier, WebhookNotifier},
};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn service(url: String, timeout: Duration) -> NotificationService {
    let notifier: Arc<dyn Notifier> = Arc::new(WebhookNotifier::new(url, timeout).unwrap());
    NotificationService::new(notifier, timeout)
}

#[tokio::test]
async fn webhook_receives_kind_recipient_and_payload() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/hooks/agencia"))
        .and(body_partial_json(json!({
            "tipo": "contrato-assinado",
            "destinatarioId": "adm-1",
            "payload": { "contratoId": "CONT-2025-000001" },
            "lida": false
        })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    service(format!("{}/hooks/agencia", mock_server.uri()), Duration::from_secs(2))
        .notify(
            NotificationKind::ContratoAssinado,
            "adm-1",
            json!({ "contratoId": "CONT-2025-000001" }),
        )
        .await;
}

#[tokio::test]
async fn server_error_is_reported_by_the_notifier() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let notifier = WebhookNotifier::new(mock_server.uri(), Duration::from_secs(2)).unwrap();
    let notification = agencia_backend::models::notification::Notification {
        id: "n-1".to_string(),
        kind: NotificationKind::NovaMensagem,
        recipient_id: "cli-1".to_string(),
        payload: json!({ "texto": "Olá" }),
        read: false,
        created_at: chrono::Utc::now(),
    };
    let err = notifier.deliver(&notification).await.unwrap_err();
    assert_eq!(err.code(), "internal_error");
}

#[tokio::test]
async fn slow_or_failing_delivery_never_reaches_the_caller() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&mock_server)
        .await;

    let started = std::time::Instant::now();
    service(mock_server.uri(), Duration::from_millis(200))
        .notify(NotificationKind::NovoCliente, "admins", json!({}))
        .await;
    assert!(started.elapsed() < Duration::from_secs(3));
}
