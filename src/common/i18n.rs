// src/common/i18n.rs

use std::collections::HashMap;

pub const DEFAULT_LANG: &str = "pt";

// Tabelas embutidas: (chave, texto). Parâmetros no formato {nome}.
const PT: &[(&str, &str)] = &[
    ("error.validation_failed", "Um ou mais campos são inválidos."),
    ("error.required_field", "O campo '{field}' é obrigatório."),
    ("error.non_positive_value", "O valor precisa ser maior que zero."),
    ("error.negative_value", "O valor não pode ser negativo."),
    ("error.empty_signature", "Por favor, assine antes de confirmar."),
    ("error.invalid_signature_image", "A imagem da assinatura é inválida. Assine novamente."),
    ("error.terms_not_accepted", "Você precisa aceitar os termos do contrato para continuar."),
    ("error.progress_out_of_range", "O progresso deve estar entre 0 e 100 (recebido: {value})."),
    ("error.rating_out_of_range", "A avaliação deve estar entre 0 e 5 (recebido: {value})."),
    ("error.funnel_regression", "O funil não pode voltar de '{from}' para '{to}'."),
    ("error.contract_already_exists", "Já existe um contrato para esta solicitação."),
    ("error.proposal_already_accepted", "Esta proposta já foi aceita."),
    ("error.contract_already_signed", "Este contrato já foi assinado."),
    ("error.service_already_finalized", "Este serviço já foi finalizado."),
    ("error.project_already_approved", "Este projeto já foi aprovado."),
    ("error.project_already_exists", "Já existe um projeto para este contrato."),
    ("error.email_already_exists", "Este e-mail já está em uso."),
    ("error.invalid_transition", "Não é possível executar '{action}': {entity} está em '{from}'."),
    ("error.not_found", "{entity} não encontrado(a): {id}."),
    ("error.data_unavailable", "Dados indisponíveis no momento. Tente novamente."),
    ("error.document_failed", "Não foi possível gerar o documento."),
    ("error.invalid_token", "Token de autenticação inválido ou ausente."),
    ("error.forbidden", "Você não tem acesso a este recurso."),
    ("error.internal_error", "Ocorreu um erro inesperado."),
    ("entity.client", "cliente"),
    ("entity.solicitation", "solicitação"),
    ("entity.proposal", "proposta"),
    ("entity.contract", "contrato"),
    ("entity.project", "projeto"),
    ("entity.contracted-service", "serviço contratado"),
    ("entity.catalog-service", "serviço do catálogo"),
    ("entity.signed-contract", "contrato assinado"),
    ("field.required", "Obrigatório."),
    ("field.invalid_email", "E-mail inválido."),
    ("field.invalid_url", "URL inválida."),
    ("status.solicitation.nova", "Nova"),
    ("status.solicitation.analisando", "Em análise"),
    ("status.solicitation.proposta-criada", "Proposta enviada"),
    ("status.solicitation.contrato-pendente", "Aguardando assinatura"),
    ("status.solicitation.concluida", "Concluída"),
    ("status.solicitation.rejeitada", "Rejeitada"),
    ("status.project.planejamento", "Planejamento"),
    ("status.project.em-andamento", "Em andamento"),
    ("status.project.pausado", "Pausado"),
    ("status.project.revisao", "Em revisão"),
    ("status.project.aguardando-aprovacao", "Aguardando aprovação"),
    ("status.project.concluido", "Concluído"),
    ("status.project.cancelado", "Cancelado"),
    ("status.funnel.prospect", "Prospect"),
    ("status.funnel.contato", "Contato"),
    ("status.funnel.proposta", "Proposta"),
    ("status.funnel.negociacao", "Negociação"),
    ("status.funnel.contratado", "Contratado"),
    ("status.funnel.ativo", "Ativo"),
    ("status.funnel.inativo", "Inativo"),
    ("status.funnel.perdido", "Perdido"),
];

const EN: &[(&str, &str)] = &[
    ("error.validation_failed", "One or more fields are invalid."),
    ("error.required_field", "The field '{field}' is required."),
    ("error.non_positive_value", "The value must be greater than zero."),
    ("error.negative_value", "The value cannot be negative."),
    ("error.empty_signature", "Please sign before confirming."),
    ("error.invalid_signature_image", "The signature image is invalid. Please sign again."),
    ("error.terms_not_accepted", "You must accept the contract terms to continue."),
    ("error.progress_out_of_range", "Progress must be between 0 and 100 (got {value})."),
    ("error.rating_out_of_range", "Rating must be between 0 and 5 (got {value})."),
    ("error.funnel_regression", "The funnel cannot move back from '{from}' to '{to}'."),
    ("error.contract_already_exists", "A contract already exists for this request."),
    ("error.proposal_already_accepted", "This proposal has already been accepted."),
    ("error.contract_already_signed", "This contract has already been signed."),
    ("error.service_already_finalized", "This service has already been finalized."),
    ("error.project_already_approved", "This project has already been approved."),
    ("error.project_already_exists", "A project already exists for this contract."),
    ("error.email_already_exists", "This e-mail is already in use."),
    ("error.invalid_transition", "Cannot '{action}': the {entity} is '{from}'."),
    ("error.not_found", "{entity} not found: {id}."),
    ("error.data_unavailable", "Data is unavailable right now. Please try again."),
    ("error.document_failed", "The document could not be generated."),
    ("error.invalid_token", "Invalid or missing authentication token."),
    ("error.forbidden", "You do not have access to this resource."),
    ("error.internal_error", "An unexpected error occurred."),
    ("entity.client", "client"),
    ("entity.solicitation", "request"),
    ("entity.proposal", "proposal"),
    ("entity.contract", "contract"),
    ("entity.project", "project"),
    ("entity.contracted-service", "contracted service"),
    ("entity.catalog-service", "catalog service"),
    ("entity.signed-contract", "signed contract"),
    ("field.required", "Required."),
    ("field.invalid_email", "Invalid e-mail."),
    ("field.invalid_url", "Invalid URL."),
    ("status.solicitation.nova", "New"),
    ("status.solicitation.analisando", "Under review"),
    ("status.solicitation.proposta-criada", "Proposal sent"),
    ("status.solicitation.contrato-pendente", "Awaiting signature"),
    ("status.solicitation.concluida", "Completed"),
    ("status.solicitation.rejeitada", "Rejected"),
    ("status.project.planejamento", "Planning"),
    ("status.project.em-andamento", "In progress"),
    ("status.project.pausado", "Paused"),
    ("status.project.revisao", "In review"),
    ("status.project.aguardando-aprovacao", "Awaiting approval"),
    ("status.project.concluido", "Completed"),
    ("status.project.cancelado", "Cancelled"),
    ("status.funnel.prospect", "Prospect"),
    ("status.funnel.contato", "Contacted"),
    ("status.funnel.proposta", "Proposal"),
    ("status.funnel.negociacao", "Negotiation"),
    ("status.funnel.contratado", "Contracted"),
    ("status.funnel.ativo", "Active"),
    ("status.funnel.inativo", "Inactive"),
    ("status.funnel.perdido", "Lost"),
];

/// Tabela de tradução da borda da UI (mensagens de erro e rótulos de status).
#[derive(Debug, Clone)]
pub struct I18nStore {
    tables: HashMap<&'static str, HashMap<&'static str, &'static str>>,
}

impl Default for I18nStore {
    fn default() -> Self {
        Self::new()
    }
}

impl I18nStore {
    pub fn new() -> Self {
        let mut tables = HashMap::new();
        tables.insert("pt", PT.iter().copied().collect());
        tables.insert("en", EN.iter().copied().collect());
        Self { tables }
    }

    /// Idioma desconhecido cai para português; chave desconhecida volta como está.
    pub fn translate(&self, lang: &str, key: &str, args: &[(&str, &str)]) -> String {
        let template = self
            .tables
            .get(lang)
            .and_then(|table| table.get(key))
            .or_else(|| self.tables.get(DEFAULT_LANG).and_then(|table| table.get(key)))
            .copied()
            .unwrap_or(key);

        let mut message = template.to_string();
        for (name, value) in args {
            message = message.replace(&format!("{{{name}}}"), value);
        }
        message
    }

    pub fn status_label(&self, lang: &str, family: &str, status: &str) -> String {
        self.translate(lang, &format!("status.{family}.{status}"), &[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_languages_cover_the_same_keys() {
        let pt: Vec<_> = PT.iter().map(|(k, _)| *k).collect();
        let en: Vec<_> = EN.iter().map(|(k, _)| *k).collect();
        assert_eq!(pt, en);
    }

    #[test]
    fn unknown_language_falls_back_to_portuguese() {
        let store = I18nStore::new();
        assert_eq!(store.status_label("fr", "solicitation", "nova"), "Nova");
    }

    #[test]
    fn substitutes_named_arguments() {
        let store = I18nStore::new();
        let msg = store.translate("en", "error.required_field", &[("field", "descricao")]);
        assert_eq!(msg, "The field 'descricao' is required.");
    }
}
