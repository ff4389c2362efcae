// src/common/ids.rs

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{Datelike, Utc};

const SIX_DIGITS: u64 = 1_000_000;

/// Quantos ids novos tentar antes de desistir quando o gerado já está em uso
/// (outro processo, ou um reinício que voltou a semente).
pub const MAX_ID_ATTEMPTS: usize = 50;

/// Gera os identificadores legíveis do fluxo comercial.
///
/// `SOL-`, `PROP-` e `CONT-` usam um sufixo de 6 dígitos derivado do relógio e depois
/// incrementado, então IDs emitidos pelo mesmo processo não se repetem dentro de um ano.
/// Entre processos (ou depois de um reinício) podem colidir: quem grava confere se o id está
/// livre e pede outro. O `PROJ-` segue a sequência anual calculada pelo repositório de projetos.
#[derive(Clone, Debug)]
pub struct IdGenerator {
    seq: Arc<AtomicU64>,
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdGenerator {
    pub fn new() -> Self {
        let seed = Utc::now().timestamp_millis().unsigned_abs() % SIX_DIGITS;
        Self::starting_at(seed)
    }

    pub fn starting_at(seed: u64) -> Self {
        Self {
            seq: Arc::new(AtomicU64::new(seed % SIX_DIGITS)),
        }
    }

    fn next_suffix(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::Relaxed) % SIX_DIGITS
    }

    pub fn solicitation(&self) -> String {
        format!("SOL-{}-{:06}", current_year(), self.next_suffix())
    }

    pub fn proposal(&self) -> String {
        format!("PROP-{}-{:06}", current_year(), self.next_suffix())
    }

    pub fn contract(&self) -> String {
        format!("CONT-{}-{:06}", current_year(), self.next_suffix())
    }
}

pub fn current_year() -> i32 {
    Utc::now().year()
}

pub fn project_id(year: i32, sequence: u32) -> String {
    format!("PROJ-{year}-{sequence:03}")
}

/// Extrai a sequência de um `PROJ-<ano>-<n>` do ano pedido.
pub fn project_sequence(id: &str, year: i32) -> Option<u32> {
    id.strip_prefix(&format!("PROJ-{year}-"))?.parse().ok()
}

pub fn contracted_service_id(contract_id: &str, index: usize) -> String {
    format!("SRV-{contract_id}-{}", index + 1)
}
