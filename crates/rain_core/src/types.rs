//! Tipos de medição publicados pelo daemon.
//!
//! Uma [`Measurement`] é um valor imutável: o daemon nunca a altera depois
//! de criada, apenas substitui a publicada por uma nova.

use chrono::{DateTime, SecondsFormat, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// Número de placas físicas do detector. Apenas informativo.
pub const TOTAL_BOARDS: u8 = 6;

/// Medição decodificada de um frame do detector de chuva.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Measurement {
    /// Instante da leitura (UTC, precisão de segundos)
    pub timestamp: DateTime<Utc>,
    /// Versão do software que produziu a medição
    pub software_version: String,
    /// Placas reportando chuva (bits setados no byte de status, 0–8)
    pub unsafe_boards: u8,
    /// Total de placas do detector (sempre [`TOTAL_BOARDS`])
    pub total_boards: u8,
    /// Byte de status original, preservado para diagnóstico
    pub raw_port1: u8,
}

impl Measurement {
    /// Cria uma medição a partir do byte de status bruto.
    ///
    /// O timestamp é truncado para segundos inteiros.
    pub fn from_status(status: u8, as_of: DateTime<Utc>, software_version: &str) -> Self {
        Self {
            timestamp: truncate_to_seconds(as_of),
            software_version: software_version.to_owned(),
            unsafe_boards: status.count_ones() as u8,
            total_boards: TOTAL_BOARDS,
            raw_port1: status,
        }
    }

    /// Timestamp no formato `YYYY-MM-DDTHH:MM:SSZ`.
    pub fn timestamp_string(&self) -> String {
        self.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true)
    }

    /// `true` se alguma placa reporta chuva.
    pub fn is_raining(&self) -> bool {
        self.unsafe_boards > 0
    }
}

fn truncate_to_seconds(t: DateTime<Utc>) -> DateTime<Utc> {
    t.with_nanosecond(0).unwrap_or(t)
}
