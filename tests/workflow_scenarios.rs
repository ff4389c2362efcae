mod common;

use agencia_backend::{
    db::{
        document_store::{PROJECTS, SIGNED_CONTRACTS, SOLICITATIONS},
        local_cache::cache_key,
        MemoryDocumentStore, MemoryLocalCache,
    },
    models::{
        crm::{FunnelStage, ServiceStatus},
        solicitation::{
            ContractStatus, ProposalStatus, ResponseAuthor, Solicitation, SolicitationStatus,
        },
    },
    services::workflow_service::{NewSolicitation, ProposalDraft, SignContract},
};
use common::{
    blank_signature, drawn_signature, FailingCache, FailingWrites, Harness, YieldingStore, ADMIN, CLIENT,
};
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

fn logo_request() -> NewSolicitation {
    NewSolicitation {
        title: Some("Logo Design".to_string()),
        category: Some("branding".to_string()),
        value: Some(Decimal::ZERO),
        ..Default::default()
    }
}

fn logo_proposal() -> ProposalDraft {
    ProposalDraft {
        value: Decimal::new(2500, 0),
        description: "Full logo package".to_string(),
        deadline: "15".to_string(),
        validity_days: None,
        services: None,
    }
}

fn signing(signature: String) -> SignContract {
    SignContract {
        signature,
        terms_accepted: true,
        artifact: None,
    }
}

async fn solicitation(h: &Harness, id: &str) -> Solicitation {
    h.workflow
        .list_solicitations(&h.admin())
        .await
        .unwrap()
        .items
        .into_iter()
        .find(|s| s.id == id)
        .unwrap()
}

/// Cliente cadastrado, solicitação aberta e proposta enviada. Devolve (solicitação, proposta).
async fn proposed(h: &Harness) -> (String, String) {
    h.register_client().await;
    let created = h.workflow.create(&h.client(), logo_request()).await.unwrap();
    let proposal = h
        .workflow
        .submit_proposal(&h.admin(), &created.value.id, logo_proposal())
        .await
        .unwrap();
    (created.value.id, proposal.value.id)
}

#[tokio::test]
async fn full_flow_from_request_to_signed_contract() {
    let h = Harness::new();
    h.register_client().await;

    let created = h.workflow.create(&h.client(), logo_request()).await.unwrap();
    assert_eq!(created.value.status, SolicitationStatus::Nova);
    assert_eq!(created.value.admin_id.as_deref(), Some(ADMIN));
    assert!(created.report.is_clean());
    let sol_id = created.value.id;

    h.workflow
        .submit_proposal(&h.admin(), &sol_id, logo_proposal())
        .await
        .unwrap();
    let after_proposal = solicitation(&h, &sol_id).await;
    assert_eq!(after_proposal.status, SolicitationStatus::PropostaCriada);
    assert_eq!(after_proposal.proposal.as_ref().unwrap().value, Decimal::new(2500, 0));
    let proposal_id = after_proposal.proposal.unwrap().id;

    let contract = h.workflow.accept_proposal(&h.client(), &proposal_id).await.unwrap().value;
    assert_eq!(solicitation(&h, &sol_id).await.status, SolicitationStatus::ContratoPendente);
    let contracts = h.workflow.list_contracts(&h.client()).await.unwrap().items;
    assert_eq!(contracts.len(), 1);
    assert_eq!(contracts[0].value, Decimal::new(2500, 0));

    let signed = h
        .workflow
        .sign_contract(&h.client(), &contract.id, signing(drawn_signature()))
        .await
        .unwrap();
    assert_eq!(signed.value.contract.status, ContractStatus::Assinado);

    let done = solicitation(&h, &sol_id).await;
    assert_eq!(done.status, SolicitationStatus::Concluida);
    assert_eq!(done.contract_status, Some(ContractStatus::Assinado));

    let projects = h.projects.list_all(ADMIN).await.unwrap().items;
    assert_eq!(projects.len(), 1);
    assert_eq!(projects[0].contracted_value, Decimal::new(2500, 0));

    let client = h.client_record().await;
    assert_eq!(client.funnel_stage, FunnelStage::Contratado);
    assert_eq!(client.contracted_services.len(), 1);
    assert_eq!(client.contracted_services[0].status, ServiceStatus::Ativo);
    assert_eq!(client.total_value, Decimal::new(2500, 0));
    assert!(client.contract_signed);
}

#[tokio::test]
async fn empty_signature_leaves_no_trace() {
    let h = Harness::new();
    let (sol_id, proposal_id) = proposed(&h).await;
    let contract = h.workflow.accept_proposal(&h.client(), &proposal_id).await.unwrap().value;

    let notifications_before = h.notification_count();
    let solicitations_before = h.store.count(SOLICITATIONS);

    let err = h
        .workflow
        .sign_contract(&h.client(), &contract.id, signing(blank_signature()))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "empty_signature");

    assert_eq!(solicitation(&h, &sol_id).await.status, SolicitationStatus::ContratoPendente);
    assert_eq!(h.store.count(PROJECTS), 0);
    assert_eq!(h.store.count(SOLICITATIONS), solicitations_before);
    assert_eq!(h.notification_count(), notifications_before);
    assert!(!h.client_record().await.contract_signed);
}

#[tokio::test]
async fn unchecked_terms_are_refused_before_any_lookup() {
    let h = Harness::new();
    // Contrato inexistente: se a validação não viesse antes, o erro seria not_found
    let err = h
        .workflow
        .sign_contract(
            &h.client(),
            "CONT-inexistente",
            SignContract {
                signature: drawn_signature(),
                terms_accepted: false,
                artifact: None,
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.code(), "terms_not_accepted");
}

#[tokio::test]
async fn second_accept_is_a_duplicate_and_keeps_one_contract() {
    let h = Harness::new();
    let (_, proposal_id) = proposed(&h).await;

    h.workflow.accept_proposal(&h.client(), &proposal_id).await.unwrap();
    let err = h
        .workflow
        .accept_proposal(&h.client(), &proposal_id)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "contract_already_exists");

    let contracts = h.workflow.list_contracts(&h.admin()).await.unwrap().items;
    assert_eq!(contracts.len(), 1);
    let proposals = h.workflow.list_proposals(&h.client()).await.unwrap().items;
    assert_eq!(proposals.len(), 1);
    assert_eq!(proposals[0].status, ProposalStatus::Aceita);
    assert!(!proposals[0].active);
}

#[tokio::test]
async fn signing_twice_is_rejected_and_creates_one_project() {
    let h = Harness::new();
    let (_, proposal_id) = proposed(&h).await;
    let contract = h.workflow.accept_proposal(&h.client(), &proposal_id).await.unwrap().value;

    h.workflow
        .sign_contract(&h.client(), &contract.id, signing(drawn_signature()))
        .await
        .unwrap();
    let err = h
        .workflow
        .sign_contract(&h.client(), &contract.id, signing(drawn_signature()))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "contract_already_signed");
    assert_eq!(h.store.count(PROJECTS), 1);
    assert_eq!(h.client_record().await.contracted_services.len(), 1);
}

#[tokio::test]
async fn project_points_back_to_its_origin() {
    let h = Harness::new();
    let (sol_id, proposal_id) = proposed(&h).await;
    let contract = h.workflow.accept_proposal(&h.client(), &proposal_id).await.unwrap().value;
    let signed = h
        .workflow
        .sign_contract(&h.client(), &contract.id, signing(drawn_signature()))
        .await
        .unwrap()
        .value;

    let project = signed.project;
    assert_eq!(project.solicitation_id.as_deref(), Some(sol_id.as_str()));
    assert_eq!(project.proposal_id.as_deref(), Some(proposal_id.as_str()));
    assert_eq!(project.contract_id.as_deref(), Some(contract.id.as_str()));

    let origin = solicitation(&h, &sol_id).await;
    assert_eq!(origin.contract.as_ref().unwrap().id, contract.id);
    assert_eq!(origin.contract.as_ref().unwrap().proposal_id, proposal_id);
    assert_eq!(origin.proposal.as_ref().unwrap().id, proposal_id);
    assert_eq!(origin.project_id.as_deref(), Some(project.id.as_str()));

    let record = h.workflow.signed_contract(&h.admin(), &sol_id).await.unwrap();
    assert_eq!(record.contract_id, contract.id);
    assert!(record.file.starts_with("data:application/pdf;base64,"));
    assert!(record.signature.starts_with("data:image/png;base64,"));
}

#[tokio::test]
async fn proposal_guards_reject_bad_values_and_wrong_roles() {
    let h = Harness::new();
    h.register_client().await;
    let sol_id = h.workflow.create(&h.client(), logo_request()).await.unwrap().value.id;

    let mut zero = logo_proposal();
    zero.value = Decimal::ZERO;
    let err = h.workflow.submit_proposal(&h.admin(), &sol_id, zero).await.unwrap_err();
    assert_eq!(err.code(), "non_positive_value");

    let err = h
        .workflow
        .submit_proposal(&h.client(), &sol_id, logo_proposal())
        .await
        .unwrap_err();
    assert_eq!(err.code(), "forbidden");

    let other_admin = agencia_backend::models::auth::Caller::admin("adm-2");
    let err = h
        .workflow
        .submit_proposal(&other_admin, &sol_id, logo_proposal())
        .await
        .unwrap_err();
    assert_eq!(err.code(), "forbidden");
}

#[tokio::test]
async fn declined_proposal_closes_the_request() {
    let h = Harness::new();
    let (sol_id, proposal_id) = proposed(&h).await;

    h.workflow.decline_proposal(&h.client(), &proposal_id).await.unwrap();
    let closed = solicitation(&h, &sol_id).await;
    assert_eq!(closed.status, SolicitationStatus::Rejeitada);
    assert_eq!(closed.proposal_status, Some(ProposalStatus::Recusada));

    let err = h.workflow.accept_proposal(&h.client(), &proposal_id).await.unwrap_err();
    assert_eq!(err.code(), "invalid_transition");
}

#[tokio::test]
async fn rejection_with_reason_becomes_a_system_response() {
    let h = Harness::new();
    h.register_client().await;
    let sol_id = h.workflow.create(&h.client(), logo_request()).await.unwrap().value.id;

    let rejected = h
        .workflow
        .reject(&h.admin(), &sol_id, Some("Fora do escopo".to_string()))
        .await
        .unwrap()
        .value;
    assert_eq!(rejected.status, SolicitationStatus::Rejeitada);
    assert_eq!(rejected.responses.last().unwrap().text, "Fora do escopo");

    let err = h
        .workflow
        .submit_proposal(&h.admin(), &sol_id, logo_proposal())
        .await
        .unwrap_err();
    assert_eq!(err.code(), "invalid_transition");
}

#[tokio::test]
async fn opening_a_request_moves_the_funnel_to_contact() {
    let h = Harness::new();
    h.register_client().await;
    assert_eq!(h.client_record().await.funnel_stage, FunnelStage::Prospect);

    h.workflow.create(&h.client(), logo_request()).await.unwrap();
    assert_eq!(h.client_record().await.funnel_stage, FunnelStage::Contato);
}

#[tokio::test]
async fn missing_title_is_a_validation_error() {
    let h = Harness::new();
    h.register_client().await;
    let err = h
        .workflow
        .create(&h.client(), NewSolicitation::default())
        .await
        .unwrap_err();
    assert_eq!(err.code(), "required_field");
    assert_eq!(h.store.count(SOLICITATIONS), 0);
}

#[tokio::test]
async fn review_is_staff_only_and_repeatable() {
    let h = Harness::new();
    h.register_client().await;
    let sol_id = h.workflow.create(&h.client(), logo_request()).await.unwrap().value.id;

    let err = h.workflow.start_review(&h.client(), &sol_id).await.unwrap_err();
    assert_eq!(err.code(), "forbidden");

    let reviewed = h.workflow.start_review(&h.admin(), &sol_id).await.unwrap().value;
    assert_eq!(reviewed.status, SolicitationStatus::Analisando);
    let again = h.workflow.start_review(&h.admin(), &sol_id).await.unwrap();
    assert_eq!(again.value.status, SolicitationStatus::Analisando);
    assert!(again.report.is_clean());

    // Proposta continua possível a partir de "analisando"
    h.workflow
        .submit_proposal(&h.admin(), &sol_id, logo_proposal())
        .await
        .unwrap();
    let err = h.workflow.start_review(&h.admin(), &sol_id).await.unwrap_err();
    assert_eq!(err.code(), "invalid_transition");
}

#[tokio::test]
async fn responses_record_the_author_and_notify_the_other_side() {
    let h = Harness::new();
    h.register_client().await;
    let sol_id = h.workflow.create(&h.client(), logo_request()).await.unwrap().value.id;
    let before = h.notification_count();

    let from_client = h
        .workflow
        .add_response(&h.client(), &sol_id, "  Podemos usar azul?  ")
        .await
        .unwrap()
        .value;
    let last = from_client.responses.last().unwrap();
    assert_eq!(last.author, ResponseAuthor::Cliente);
    assert_eq!(last.text, "Podemos usar azul?");

    let from_admin = h
        .workflow
        .add_response(&h.admin(), &sol_id, "Claro!")
        .await
        .unwrap()
        .value;
    assert_eq!(from_admin.responses.len(), 2);
    assert_eq!(from_admin.responses[1].author, ResponseAuthor::Admin);
    assert_eq!(h.notification_count(), before + 2);

    let err = h.workflow.add_response(&h.client(), &sol_id, "   ").await.unwrap_err();
    assert_eq!(err.code(), "required_field");
}

#[tokio::test]
async fn client_watch_receives_new_requests() {
    let h = Harness::new();
    h.register_client().await;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let subscription = h
        .workflow
        .watch_solicitations(&h.client(), move |items| {
            let _ = tx.send(items.len());
        })
        .await
        .unwrap();
    assert_eq!(rx.recv().await, Some(0));

    h.workflow.create(&h.client(), logo_request()).await.unwrap();
    let seen = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .unwrap();
    assert_eq!(seen, Some(1));
    assert!(subscription.cancel());
}

#[tokio::test]
async fn concurrent_signatures_get_distinct_project_numbers() {
    let store = MemoryDocumentStore::new();
    let h = Harness::over(
        store.clone(),
        Arc::new(YieldingStore(store)),
        Arc::new(MemoryLocalCache::new()),
    );
    h.register("cli-1").await;
    h.register("cli-2").await;
    let first = h.accepted_contract_for("cli-1").await;
    let second = h.accepted_contract_for("cli-2").await;

    let (a, b) = tokio::join!(h.sign("cli-1", &first.id), h.sign("cli-2", &second.id));
    let (a, b) = (a.unwrap().value, b.unwrap().value);

    assert_ne!(a.project.id, b.project.id);
    assert_eq!(h.store.count(PROJECTS), 2);
    for signed in [&a, &b] {
        let sol = solicitation(&h, &signed.contract.solicitation_id).await;
        assert_eq!(sol.project_id.as_deref(), Some(signed.project.id.as_str()));
        assert_eq!(signed.project.client_id, sol.client_id);
        assert_eq!(signed.project.contract_id.as_deref(), Some(signed.contract.id.as_str()));
    }
}

#[tokio::test]
async fn ids_reissued_after_a_restart_do_not_overwrite_existing_records() {
    let h = Harness::new();
    h.register_client().await;

    // Duas instâncias com a mesma semente: a segunda faz o papel do processo reiniciado
    let a = h.workflow_seeded(10).create(&h.client(), logo_request()).await.unwrap().value;
    let b = h.workflow_seeded(10).create(&h.client(), logo_request()).await.unwrap().value;
    assert_ne!(a.id, b.id);
    assert_eq!(h.store.count(SOLICITATIONS), 2);
    assert_eq!(solicitation(&h, &a.id).await.status, SolicitationStatus::Nova);

    let pa = h
        .workflow_seeded(20)
        .submit_proposal(&h.admin(), &a.id, logo_proposal())
        .await
        .unwrap()
        .value;
    let pb = h
        .workflow_seeded(20)
        .submit_proposal(&h.admin(), &b.id, logo_proposal())
        .await
        .unwrap()
        .value;
    assert_ne!(pa.id, pb.id);

    let ca = h.workflow_seeded(30).accept_proposal(&h.client(), &pa.id).await.unwrap().value;
    let cb = h.workflow_seeded(30).accept_proposal(&h.client(), &pb.id).await.unwrap().value;
    assert_ne!(ca.id, cb.id);

    let proposals = h.workflow.list_proposals(&h.admin()).await.unwrap().items;
    assert_eq!(proposals.len(), 2);
    let contracts = h.workflow.list_contracts(&h.admin()).await.unwrap().items;
    assert_eq!(contracts.len(), 2);
    let by_b = contracts.iter().find(|c| c.id == cb.id).unwrap();
    assert_eq!(by_b.solicitation_id, b.id);
    assert_eq!(by_b.proposal_id, pb.id);
}

#[tokio::test]
async fn signing_retry_after_a_failed_commit_completes_once() {
    let store = MemoryDocumentStore::new();
    let armed = Arc::new(AtomicBool::new(false));
    let remote = FailingWrites {
        inner: store.clone(),
        collection: SOLICITATIONS,
        armed: Arc::clone(&armed),
    };
    let local = FailingCache {
        inner: MemoryLocalCache::new(),
        key: cache_key(SOLICITATIONS, CLIENT),
        armed: Arc::clone(&armed),
    };
    let h = Harness::over(store, Arc::new(remote), Arc::new(local));
    h.register_client().await;
    let contract = h.accepted_contract_for(CLIENT).await;

    // Registro, projeto e cliente gravam; a solicitação (commit) falha nos dois armazenamentos
    armed.store(true, Ordering::SeqCst);
    let err = h.sign(CLIENT, &contract.id).await.unwrap_err();
    assert_eq!(err.code(), "internal_error");
    assert_eq!(
        solicitation(&h, &contract.solicitation_id).await.status,
        SolicitationStatus::ContratoPendente
    );

    armed.store(false, Ordering::SeqCst);
    let signed = h.sign(CLIENT, &contract.id).await.unwrap().value;

    assert_eq!(h.store.count(PROJECTS), 1);
    assert_eq!(h.store.count(SIGNED_CONTRACTS), 1);
    let client = h.client_record().await;
    assert_eq!(client.documents.len(), 1);
    assert_eq!(client.contracted_services.len(), 1);
    assert_eq!(client.total_value, Decimal::new(1800, 0));

    let sol = solicitation(&h, &contract.solicitation_id).await;
    assert_eq!(sol.status, SolicitationStatus::Concluida);
    assert_eq!(sol.project_id.as_deref(), Some(signed.project.id.as_str()));
}
