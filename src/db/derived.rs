// src/db/derived.rs

use crate::{
    db::entity_repo::dedup_by,
    models::{
        contracts::{Contract, Proposal},
        solicitation::{ContractStatus, ProposalStatus, Solicitation},
    },
};

// Propostas e contratos não existem como documentos próprios: são reconstruídos das
// solicitações a cada leitura. A deduplicação acontece aqui porque replays de assinatura e
// mesclas com o cache local podem repetir a mesma solicitação.

pub fn proposal_of(solicitation: &Solicitation) -> Option<Proposal> {
    let embedded = solicitation.proposal.as_ref()?;
    Some(Proposal {
        id: embedded.id.clone(),
        solicitation_id: solicitation.id.clone(),
        client_id: solicitation.client_id.clone(),
        title: solicitation.title.clone(),
        value: embedded.value,
        description: embedded.description.clone(),
        deadline: embedded.deadline.clone(),
        validity_days: embedded.validity_days,
        services: embedded.services.clone(),
        status: solicitation.proposal_status.unwrap_or(ProposalStatus::Pendente),
        active: solicitation.has_active_proposal(),
        created_at: embedded.created_at,
    })
}

pub fn contract_of(solicitation: &Solicitation) -> Option<Contract> {
    let embedded = solicitation.contract.as_ref()?;
    Some(Contract {
        id: embedded.id.clone(),
        proposal_id: embedded.proposal_id.clone(),
        solicitation_id: solicitation.id.clone(),
        client_id: solicitation.client_id.clone(),
        title: embedded.title.clone(),
        value: embedded.value,
        services: embedded.services.clone(),
        status: solicitation
            .contract_status
            .unwrap_or(ContractStatus::AguardandoAssinatura),
        created_at: embedded.created_at,
        signed_at: embedded.signed_at,
    })
}

/// Uma proposta por `id`.
pub fn derive_proposals(solicitations: &[Solicitation]) -> Vec<Proposal> {
    dedup_by(
        solicitations.iter().filter_map(proposal_of).collect(),
        |p: &Proposal| p.id.clone(),
    )
}

/// Um contrato por `solicitacaoId`.
pub fn derive_contracts(solicitations: &[Solicitation]) -> Vec<Contract> {
    dedup_by(
        solicitations.iter().filter_map(contract_of).collect(),
        |c: &Contract| c.solicitation_id.clone(),
    )
}
