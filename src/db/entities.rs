// src/db/entities.rs

use crate::{
    common::error::EntityKind,
    db::{
        document_store::{CATALOG, CLIENTS, PROJECTS, SIGNED_CONTRACTS, SOLICITATIONS},
        entity_repo::Entity,
    },
    models::{
        catalog::CatalogService, contracts::SignedContractRecord, crm::Client, project::Project,
        solicitation::Solicitation,
    },
};

impl Entity for Client {
    const COLLECTION: &'static str = CLIENTS;
    const KIND: EntityKind = EntityKind::Client;
    const CLIENT_FIELD: Option<&'static str> = Some("id");

    fn id(&self) -> &str {
        &self.id
    }

    fn admin_id(&self) -> Option<&str> {
        self.admin_id.as_deref()
    }

    fn client_id(&self) -> Option<&str> {
        Some(&self.id)
    }
}

impl Entity for Solicitation {
    const COLLECTION: &'static str = SOLICITATIONS;
    const KIND: EntityKind = EntityKind::Solicitation;
    const CLIENT_FIELD: Option<&'static str> = Some("clienteId");

    fn id(&self) -> &str {
        &self.id
    }

    fn admin_id(&self) -> Option<&str> {
        self.admin_id.as_deref()
    }

    fn client_id(&self) -> Option<&str> {
        Some(&self.client_id)
    }
}

impl Entity for Project {
    const COLLECTION: &'static str = PROJECTS;
    const KIND: EntityKind = EntityKind::Project;
    const CLIENT_FIELD: Option<&'static str> = Some("clienteId");

    fn id(&self) -> &str {
        &self.id
    }

    fn admin_id(&self) -> Option<&str> {
        self.admin_id.as_deref()
    }

    fn client_id(&self) -> Option<&str> {
        Some(&self.client_id)
    }
}

impl Entity for SignedContractRecord {
    const COLLECTION: &'static str = SIGNED_CONTRACTS;
    const KIND: EntityKind = EntityKind::SignedContract;
    const CLIENT_FIELD: Option<&'static str> = Some("clienteId");

    fn id(&self) -> &str {
        &self.id
    }

    fn admin_id(&self) -> Option<&str> {
        self.admin_id.as_deref()
    }

    fn client_id(&self) -> Option<&str> {
        Some(&self.client_id)
    }
}

// Catálogo é público: sem dono.
impl Entity for CatalogService {
    const COLLECTION: &'static str = CATALOG;
    const KIND: EntityKind = EntityKind::CatalogService;

    fn id(&self) -> &str {
        &self.id
    }
}
