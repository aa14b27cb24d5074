//! # Rain Core
//!
//! Crate compartilhada entre o daemon `raindetectord` e o cliente
//! `rain_query`: decodificação do frame serial do detector de chuva,
//! tipo de medição, protocolo de consulta UDP e configuração TOML.
//!
//! ## Módulos
//! - [`types`] – [`Measurement`] publicada pelo daemon
//! - [`frame`] – Decodificador do frame `$ port1 port2 \r\n`
//! - [`protocol`] – Request/response binário com magic byte
//! - [`config`] – Configuração unificada via TOML

pub mod types;
pub mod frame;
pub mod protocol;
pub mod config;

// Re-exports convenientes
pub use types::{Measurement, TOTAL_BOARDS};
pub use frame::{decode_frame, FrameError};
pub use protocol::{PROTOCOL_VERSION, Request};
pub use config::AppConfig;
