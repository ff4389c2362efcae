// src/models/auth.rs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Acesso privilegiado: enxerga tudo.
    Webmaster,
    Admin,
    Cliente,
}

// Estrutura de dados ("claims") do JWT emitido pelo provedor externo
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // Subject (uid do usuário)
    pub role: Role,
    pub exp: usize, // Expiration time (quando o token expira)
}

/// Quem está chamando a operação. Para clientes do portal, o uid é o id do `Client`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub uid: String,
    pub role: Role,
}

impl Caller {
    pub fn new(uid: impl Into<String>, role: Role) -> Self {
        Self { uid: uid.into(), role }
    }

    pub fn webmaster(uid: impl Into<String>) -> Self {
        Self::new(uid, Role::Webmaster)
    }

    pub fn admin(uid: impl Into<String>) -> Self {
        Self::new(uid, Role::Admin)
    }

    pub fn client(uid: impl Into<String>) -> Self {
        Self::new(uid, Role::Cliente)
    }

    pub fn is_staff(&self) -> bool {
        matches!(self.role, Role::Webmaster | Role::Admin)
    }

    pub fn is_client(&self) -> bool {
        self.role == Role::Cliente
    }

    /// Dono do registro: o próprio cliente, o admin responsável (ou qualquer admin se ainda
    /// não houver um) e o webmaster.
    pub fn can_access(&self, admin_id: Option<&str>, client_id: &str) -> bool {
        match self.role {
            Role::Webmaster => true,
            Role::Admin => admin_id.is_none_or(|id| id == self.uid),
            Role::Cliente => client_id == self.uid,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clients_only_reach_their_own_records() {
        let ana = Caller::client("ana");
        assert!(ana.can_access(Some("adm"), "ana"));
        assert!(!ana.can_access(Some("adm"), "bia"));
    }

    #[test]
    fn admins_reach_own_and_unassigned_records() {
        let adm = Caller::admin("adm");
        assert!(adm.can_access(Some("adm"), "ana"));
        assert!(adm.can_access(None, "ana"));
        assert!(!adm.can_access(Some("outro"), "ana"));
        assert!(Caller::webmaster("w").can_access(Some("outro"), "ana"));
    }
}
