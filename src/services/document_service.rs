// src/services/document_service.rs

use std::path::PathBuf;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use genpdf::{elements, fonts::{FontData, FontFamily}, style, Element};
use image::Luma;
use qrcode::QrCode;
use rust_decimal::Decimal;

use crate::{
    common::{
        error::{AppError, ValidationFailure},
        ids::IdGenerator,
    },
    models::{contracts::Proposal, crm::Client, solicitation::QuotedService},
    services::signature::capture_signature,
};

/// Artefato pronto para download e para o registro de contratos assinados.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedDocument {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub contract_id: Option<String>,
}

impl RenderedDocument {
    pub fn to_data_uri(&self) -> String {
        format!("data:application/pdf;base64,{}", STANDARD.encode(&self.bytes))
    }
}

/// Dados de entrada do contrato. A assinatura chega como data-URI PNG.
#[derive(Debug, Clone)]
pub struct ContractInput<'a> {
    /// Quando ausente, um `CONT-<ano>-<sufixo>` novo é gerado.
    pub contract_id: Option<&'a str>,
    pub title: &'a str,
    pub client: &'a Client,
    pub services: &'a [QuotedService],
    pub total: Decimal,
    pub signature: &'a str,
    pub terms_accepted: bool,
    pub signed_at: DateTime<Utc>,
}

/// Geração do PDF do contrato. Não toca em estado do fluxo.
pub trait ContractRenderer: Send + Sync {
    fn render_contract(&self, input: &ContractInput<'_>) -> Result<RenderedDocument, AppError>;
}

#[derive(Clone)]
pub struct DocumentService {
    fonts_dir: PathBuf,
    font_family: String,
    agency_name: String,
    ids: IdGenerator,
}

fn pdf_error(e: impl std::fmt::Display) -> AppError {
    AppError::Document(e.to_string())
}

impl DocumentService {
    pub fn new(
        fonts_dir: impl Into<PathBuf>,
        font_family: impl Into<String>,
        agency_name: impl Into<String>,
        ids: IdGenerator,
    ) -> Self {
        Self {
            fonts_dir: fonts_dir.into(),
            font_family: font_family.into(),
            agency_name: agency_name.into(),
            ids,
        }
    }

    fn load_fonts(&self) -> Result<FontFamily<FontData>, AppError> {
        genpdf::fonts::from_files(&self.fonts_dir, &self.font_family, None).map_err(|_| {
            AppError::FontNotFound(format!(
                "Fonte {} não encontrada na pasta {}",
                self.font_family,
                self.fonts_dir.display()
            ))
        })
    }

    fn new_document(&self, title: String) -> Result<genpdf::Document, AppError> {
        let mut doc = genpdf::Document::new(self.load_fonts()?);
        doc.set_title(title);
        let mut decorator = genpdf::SimplePageDecorator::new();
        decorator.set_margins(10);
        doc.set_page_decorator(decorator);

        doc.push(
            elements::Paragraph::new(self.agency_name.clone())
                .styled(style::Style::new().bold().with_font_size(18)),
        );
        doc.push(elements::Break::new(1.5));
        Ok(doc)
    }

    fn push_client_block(doc: &mut genpdf::Document, client: &Client) {
        doc.push(elements::Paragraph::new(format!("Cliente: {}", client.name)));
        if let Some(company) = &client.company {
            doc.push(elements::Paragraph::new(format!("Empresa: {}", company)));
        }
        doc.push(elements::Paragraph::new(format!("E-mail: {}", client.email)));
        if let Some(phone) = &client.phone {
            doc.push(elements::Paragraph::new(format!("Telefone: {}", phone)));
        }
        doc.push(elements::Break::new(2));
    }

    // Pesos das colunas: Serviço (4), Categoria (2), Recorrência (2), Valor (2)
    fn push_services_table(doc: &mut genpdf::Document, services: &[QuotedService]) -> Result<(), AppError> {
        let mut table = elements::TableLayout::new(vec![4, 2, 2, 2]);
        table.set_cell_decorator(elements::FrameCellDecorator::new(true, true, false));

        let style_bold = style::Style::new().bold();
        table
            .row()
            .element(elements::Paragraph::new("Serviço").styled(style_bold))
            .element(elements::Paragraph::new("Categoria").styled(style_bold))
            .element(elements::Paragraph::new("Recorrência").styled(style_bold))
            .element(elements::Paragraph::new("Valor").styled(style_bold))
            .push()
            .map_err(pdf_error)?;

        for service in services {
            let recurrence = if service.recurring { "Mensal" } else { "Única" };
            table
                .row()
                .element(elements::Paragraph::new(service.name.clone()))
                .element(elements::Paragraph::new(service.category.clone()))
                .element(elements::Paragraph::new(recurrence))
                .element(elements::Paragraph::new(format!("R$ {:.2}", service.value)))
                .push()
                .map_err(pdf_error)?;
        }

        doc.push(table);
        doc.push(elements::Break::new(2));
        Ok(())
    }

    fn push_total(doc: &mut genpdf::Document, total: Decimal) {
        let mut total_paragraph = elements::Paragraph::new(format!("VALOR TOTAL: R$ {:.2}", total));
        total_paragraph.set_alignment(genpdf::Alignment::Right);
        doc.push(total_paragraph.styled(style::Style::new().bold().with_font_size(12)));
        doc.push(elements::Break::new(2));
    }

    fn finish(doc: genpdf::Document) -> Result<Vec<u8>, AppError> {
        let mut buffer = Vec::new();
        doc.render(&mut buffer).map_err(pdf_error)?;
        Ok(buffer)
    }

    pub fn render_proposal(&self, proposal: &Proposal, client: &Client) -> Result<RenderedDocument, AppError> {
        let mut doc = self.new_document(format!("Proposta {}", proposal.id))?;

        doc.push(
            elements::Paragraph::new(format!("PROPOSTA COMERCIAL {}", proposal.id))
                .styled(style::Style::new().bold().with_font_size(14)),
        );
        doc.push(elements::Paragraph::new(format!(
            "Data: {}",
            proposal.created_at.format("%d/%m/%Y")
        )));
        doc.push(elements::Paragraph::new(proposal.title.clone()));
        doc.push(elements::Break::new(1));
        Self::push_client_block(&mut doc, client);

        doc.push(elements::Paragraph::new(proposal.description.clone()));
        doc.push(elements::Break::new(1));
        Self::push_services_table(&mut doc, &proposal.services)?;
        Self::push_total(&mut doc, proposal.value);

        doc.push(elements::Paragraph::new(format!("Prazo de entrega: {} dias", proposal.deadline)));
        doc.push(
            elements::Paragraph::new(format!(
                "Proposta válida por {} dias a partir da emissão.",
                proposal.validity_days
            ))
            .styled(style::Style::new().italic().with_font_size(8)),
        );

        Ok(RenderedDocument {
            bytes: Self::finish(doc)?,
            file_name: format!("proposta_{}.pdf", proposal.id),
            contract_id: None,
        })
    }

    fn verification_qr(payload: &str) -> Result<elements::Image, AppError> {
        let code = QrCode::new(payload.as_bytes()).map_err(pdf_error)?;
        let image_buffer = code.render::<Luma<u8>>().build();
        let dynamic_image = image::DynamicImage::ImageLuma8(image_buffer);
        Ok(elements::Image::from_dynamic_image(dynamic_image)
            .map_err(pdf_error)?
            .with_scale(genpdf::Scale::new(0.5, 0.5)))
    }
}

impl ContractRenderer for DocumentService {
    fn render_contract(&self, input: &ContractInput<'_>) -> Result<RenderedDocument, AppError> {
        // Pré-condições antes de qualquer I/O (fontes incluídas)
        if !input.terms_accepted {
            return Err(AppError::validation(ValidationFailure::TermsNotAccepted));
        }
        let signature = capture_signature(input.signature)?;

        let contract_id = match input.contract_id {
            Some(id) => id.to_string(),
            None => self.ids.contract(),
        };

        let mut doc = self.new_document(format!("Contrato {}", contract_id))?;
        doc.push(
            elements::Paragraph::new(format!("CONTRATO DE PRESTAÇÃO DE SERVIÇOS {}", contract_id))
                .styled(style::Style::new().bold().with_font_size(14)),
        );
        doc.push(elements::Paragraph::new(input.title.to_string()));
        doc.push(elements::Break::new(1));
        Self::push_client_block(&mut doc, input.client);
        Self::push_services_table(&mut doc, input.services)?;
        Self::push_total(&mut doc, input.total);

        doc.push(elements::Paragraph::new(
            "O CONTRATANTE declara ter lido e aceito as condições deste contrato.",
        ));
        doc.push(elements::Break::new(1.5));

        let signature_image = elements::Image::from_dynamic_image(signature.flattened()?)
            .map_err(pdf_error)?
            .with_scale(genpdf::Scale::new(0.6, 0.6));
        doc.push(signature_image);
        doc.push(elements::Paragraph::new(format!(
            "{} - assinado em {}",
            input.client.name,
            input.signed_at.format("%d/%m/%Y %H:%M")
        )));
        doc.push(elements::Break::new(2));

        // --- VERIFICAÇÃO (QR CODE) ---
        doc.push(
            elements::Paragraph::new("VERIFICAÇÃO")
                .styled(style::Style::new().bold().with_font_size(10)),
        );
        let qr_payload = format!("{}|{}|{}", contract_id, input.client.id, input.signed_at.to_rfc3339());
        doc.push(Self::verification_qr(&qr_payload)?);

        Ok(RenderedDocument {
            bytes: Self::finish(doc)?,
            file_name: format!("contrato_{}.pdf", contract_id),
            contract_id: Some(contract_id),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::crm::{ClientStatus, FunnelStage};

    fn client() -> Client {
        Client {
            id: "c1".into(),
            name: "Ana".into(),
            email: "ana@x.com".into(),
            company: None,
            phone: None,
            address: None,
            status: ClientStatus::Prospect,
            funnel_stage: FunnelStage::Negociacao,
            rating: 0,
            total_value: Decimal::ZERO,
            contract_signed: false,
            contracted_services: vec![],
            documents: vec![],
            interactions: vec![],
            admin_id: None,
            created_at: Utc::now(),
        }
    }

    fn service() -> DocumentService {
        DocumentService::new("/nao/existe", "Roboto", "Agência", IdGenerator::starting_at(1))
    }

    fn input<'a>(client: &'a Client, signature: &'a str, terms_accepted: bool) -> ContractInput<'a> {
        ContractInput {
            contract_id: Some("CONT-2025-000001"),
            title: "Logo",
            client,
            services: &[],
            total: Decimal::new(2500, 0),
            signature,
            terms_accepted,
            signed_at: Utc::now(),
        }
    }

    #[test]
    fn refuses_without_terms_before_touching_fonts() {
        let c = client();
        let err = service().render_contract(&input(&c, "", false)).unwrap_err();
        assert_eq!(err.code(), "terms_not_accepted");
    }

    #[test]
    fn refuses_empty_signature_before_touching_fonts() {
        let c = client();
        let err = service().render_contract(&input(&c, "", true)).unwrap_err();
        assert_eq!(err.code(), "empty_signature");
    }

    #[test]
    fn data_uri_carries_pdf_mime() {
        let doc = RenderedDocument {
            bytes: b"%PDF".to_vec(),
            file_name: "x.pdf".into(),
            contract_id: None,
        };
        assert_eq!(doc.to_data_uri(), "data:application/pdf;base64,JVBERg==");
    }
}
