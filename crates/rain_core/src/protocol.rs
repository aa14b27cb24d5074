//! Protocolo de consulta request/response via UDP.
//!
//! Formato dos datagramas:
//!
//! ```text
//! Request:  ┌──────────┬─────────┬────────┐
//!           │ Magic(1) │ Ver.(1) │ Op (1) │
//!           └──────────┴─────────┴────────┘
//! Response: ┌──────────┬─────────┬─────────────────────────────────┐
//!           │ Magic(1) │ Ver.(1) │ bincode(Option<Measurement>)(N) │
//!           └──────────┴─────────┴─────────────────────────────────┘
//! ```
//!
//! - Magic byte `0x52` ('R') identifica pacotes do detector de chuva
//! - Única operação: [`Request::LastMeasurement`], sem argumentos

use crate::types::Measurement;

/// Magic byte que identifica pacotes do protocolo.
pub const MAGIC_BYTE: u8 = 0x52; // 'R'

/// Versão atual do protocolo.
pub const PROTOCOL_VERSION: u8 = 1;

/// Tamanho do header (magic + version).
const HEADER_SIZE: usize = 2;

/// Código da operação `last_measurement`.
const OP_LAST_MEASUREMENT: u8 = 0x01;

/// Maior resposta possível; usado para dimensionar buffers de recepção.
pub const MAX_RESPONSE_SIZE: usize = 512;

/// Erros do protocolo.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Pacote muito curto ({0} bytes, mínimo {HEADER_SIZE})")]
    TooShort(usize),

    #[error("Magic byte inválido: 0x{0:02X} (esperado 0x{MAGIC_BYTE:02X})")]
    InvalidMagic(u8),

    #[error("Versão incompatível: {0} (suportada: {PROTOCOL_VERSION})")]
    VersionMismatch(u8),

    #[error("Operação desconhecida: 0x{0:02X}")]
    UnknownOp(u8),

    #[error("Request com {0} bytes extras")]
    TrailingBytes(usize),

    #[error("Erro de serialização: {0}")]
    Serialize(String),

    #[error("Erro de deserialização: {0}")]
    Deserialize(String),
}

/// Operações remotas expostas pelo daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    LastMeasurement,
}

/// Codifica um [`Request`] no formato `[MAGIC][VERSION][OP]`.
pub fn encode_request(request: Request) -> Vec<u8> {
    let op = match request {
        Request::LastMeasurement => OP_LAST_MEASUREMENT,
    };
    vec![MAGIC_BYTE, PROTOCOL_VERSION, op]
}

/// Decodifica um datagrama de request.
pub fn decode_request(data: &[u8]) -> Result<Request, ProtocolError> {
    let body = check_header(data)?;
    match body {
        [OP_LAST_MEASUREMENT] => Ok(Request::LastMeasurement),
        [] => Err(ProtocolError::TooShort(data.len())),
        [OP_LAST_MEASUREMENT, rest @ ..] => Err(ProtocolError::TrailingBytes(rest.len())),
        [op, ..] => Err(ProtocolError::UnknownOp(*op)),
    }
}

/// Codifica a resposta de `last_measurement`.
///
/// Retorna bytes no formato: `[MAGIC][VERSION][bincode_payload...]`
pub fn encode_response(measurement: Option<&Measurement>) -> Result<Vec<u8>, ProtocolError> {
    let body =
        bincode::serialize(&measurement).map_err(|e| ProtocolError::Serialize(e.to_string()))?;

    let mut frame = Vec::with_capacity(HEADER_SIZE + body.len());
    frame.push(MAGIC_BYTE);
    frame.push(PROTOCOL_VERSION);
    frame.extend_from_slice(&body);

    Ok(frame)
}

/// Decodifica a resposta de `last_measurement`.
///
/// `Ok(None)` significa que o daemon ainda não tem medição.
pub fn decode_response(data: &[u8]) -> Result<Option<Measurement>, ProtocolError> {
    let body = check_header(data)?;
    bincode::deserialize(body).map_err(|e| ProtocolError::Deserialize(e.to_string()))
}

/// Valida magic byte e versão, retornando o restante do pacote.
fn check_header(data: &[u8]) -> Result<&[u8], ProtocolError> {
    if data.len() < HEADER_SIZE {
        return Err(ProtocolError::TooShort(data.len()));
    }

    let magic = data[0];
    if magic != MAGIC_BYTE {
        return Err(ProtocolError::InvalidMagic(magic));
    }

    let version = data[1];
    if version != PROTOCOL_VERSION {
        return Err(ProtocolError::VersionMismatch(version));
    }

    Ok(&data[HEADER_SIZE..])
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────
