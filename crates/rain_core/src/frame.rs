//! Decodificador do frame de status do detector de chuva.
//!
//! O hardware emite periodicamente uma linha de tamanho fixo:
//!
//! ```text
//! ┌─────────┬──────────┬──────────┬────────────┐
//! │ '$' (1) │ Port1(1) │ Port2(1) │ "\r\n" (2) │
//! └─────────┴──────────┴──────────┴────────────┘
//! ```
//!
//! - `Port1`: um bit por placa, MSB primeiro; bit setado = placa molhada
//! - `Port2`: reservado, obrigatório mas ignorado (qualquer valor é aceito)

use crate::types::Measurement;
use chrono::{DateTime, Utc};

/// Byte que inicia todo frame.
pub const FRAME_MARKER: u8 = b'$';

/// Terminador de linha do frame.
pub const FRAME_TERMINATOR: &[u8; 2] = b"\r\n";

/// Tamanho exato de um frame válido (marker + 2 payload + terminador).
pub const FRAME_LEN: usize = 5;

/// Motivo da rejeição de uma linha.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedReason {
    Length(usize),
    Marker(u8),
    Terminator,
}

impl std::fmt::Display for MalformedReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Length(n) => write!(f, "tamanho {n} (esperado {FRAME_LEN})"),
            Self::Marker(b) => write!(f, "marker 0x{b:02X} (esperado 0x{FRAME_MARKER:02X})"),
            Self::Terminator => write!(f, "terminador diferente de CRLF"),
        }
    }
}

/// Erros de decodificação de frame.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    #[error("Frame malformado: {0}")]
    Malformed(MalformedReason),
}

/// Decodifica uma linha bruta (incluindo o terminador) em [`Measurement`].
///
/// A linha inteira precisa casar com a gramática do frame. Função pura:
/// o instante da leitura é fornecido pelo chamador.
pub fn decode_frame(
    line: &[u8],
    as_of: DateTime<Utc>,
    software_version: &str,
) -> Result<Measurement, FrameError> {
    let &[marker, port1, _port2, cr, lf] = line else {
        return Err(FrameError::Malformed(MalformedReason::Length(line.len())));
    };

    if marker != FRAME_MARKER {
        return Err(FrameError::Malformed(MalformedReason::Marker(marker)));
    }
    if [cr, lf] != *FRAME_TERMINATOR {
        return Err(FrameError::Malformed(MalformedReason::Terminator));
    }

    let status = u8::from_be_bytes([port1]);
    Ok(Measurement::from_status(status, as_of, software_version))
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────
