// src/services/signature.rs

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{DynamicImage, Rgb, RgbImage};

use crate::common::error::{AppError, ValidationFailure};

const PNG_DATA_URI_PREFIX: &str = "data:image/png;base64,";

// Pixel conta como "tinta" se for opaco o bastante e mais escuro que quase-branco.
const MIN_ALPHA: u8 = 16;
const NEAR_WHITE: u8 = 240;

/// Assinatura capturada no canvas do portal (PNG).
#[derive(Debug, Clone)]
pub struct SignatureImage {
    png: Vec<u8>,
}

impl SignatureImage {
    /// Aceita data-URI PNG ou base64 puro. Vazio é `EmptySignature`.
    pub fn from_data_uri(raw: &str) -> Result<Self, AppError> {
        let encoded = raw.trim();
        let encoded = encoded.strip_prefix(PNG_DATA_URI_PREFIX).unwrap_or(encoded);
        if encoded.is_empty() {
            return Err(AppError::validation(ValidationFailure::EmptySignature));
        }

        let png = STANDARD
            .decode(encoded)
            .map_err(|_| AppError::validation(ValidationFailure::InvalidSignatureImage))?;
        Ok(Self { png })
    }

    pub fn from_png(png: Vec<u8>) -> Self {
        Self { png }
    }

    fn decode(&self) -> Result<DynamicImage, AppError> {
        image::load_from_memory(&self.png)
            .map_err(|_| AppError::validation(ValidationFailure::InvalidSignatureImage))
    }

    /// Equivalente ao "isEmpty" do canvas: nenhum traço visível.
    pub fn is_empty(&self) -> Result<bool, AppError> {
        let rgba = self.decode()?.to_rgba8();
        Ok(!rgba.pixels().any(|p| {
            let [r, g, b, a] = p.0;
            a >= MIN_ALPHA && (r < NEAR_WHITE || g < NEAR_WHITE || b < NEAR_WHITE)
        }))
    }

    /// Composição sobre fundo branco, sem canal alfa (o PDF não aceita transparência).
    pub fn flattened(&self) -> Result<DynamicImage, AppError> {
        let rgba = self.decode()?.to_rgba8();
        let (width, height) = rgba.dimensions();
        let flat = RgbImage::from_fn(width, height, |x, y| {
            let [r, g, b, a] = rgba.get_pixel(x, y).0;
            let blend = |c: u8| -> u8 {
                let alpha = u16::from(a);
                ((u16::from(c) * alpha + 255 * (255 - alpha)) / 255) as u8
            };
            Rgb([blend(r), blend(g), blend(b)])
        });
        Ok(DynamicImage::ImageRgb8(flat))
    }

    pub fn to_data_uri(&self) -> String {
        format!("{PNG_DATA_URI_PREFIX}{}", STANDARD.encode(&self.png))
    }
}

/// Decodifica e exige ao menos um traço.
pub fn capture_signature(raw: &str) -> Result<SignatureImage, AppError> {
    let signature = SignatureImage::from_data_uri(raw)?;
    if signature.is_empty()? {
        return Err(AppError::validation(ValidationFailure::EmptySignature));
    }
    Ok(signature)
}
