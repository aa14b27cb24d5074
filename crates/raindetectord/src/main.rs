//! # raindetectord
//!
//! Daemon do detector de chuva: lê continuamente o frame de status pela
//! porta serial e responde consultas UDP com a última medição.
//!
//! Feito para rodar sob um supervisor externo, uma instância por detector.
//!
//! ## Uso
//! ```bash
//! raindetectord                   # config.toml ao lado do executável
//! raindetectord /etc/rain.toml    # config explícito
//! ```

mod acquisition;
mod log_sink;
mod published;
mod query_server;
mod serial_link;
mod shutdown;

use acquisition::AcquisitionSettings;
use log_sink::TracingSink;
use published::LatestMeasurement;
use rain_core::config::AppConfig;
use serial_link::SerialPortOpener;
use std::net::UdpSocket;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{error, info};

/// Versão embutida em toda medição publicada.
const SOFTWARE_VERSION: &str = env!("CARGO_PKG_VERSION");

fn main() -> ExitCode {
    // ── Logging ──
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    // ── Carregar config ──
    let config = AppConfig::load(&AppConfig::path_from_args());
    let errors = config.validate_daemon();
    if !errors.is_empty() {
        for e in &errors {
            error!("Configuração inválida: {e}");
        }
        return ExitCode::FAILURE;
    }

    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(config: &AppConfig) -> std::io::Result<()> {
    let running = Arc::new(AtomicBool::new(true));
    let state = LatestMeasurement::new();

    // ── Socket UDP de consultas ──
    let bind_addr = config.server.bind_addr();
    let sock = UdpSocket::bind(&bind_addr).map_err(|e| {
        std::io::Error::new(e.kind(), format!("Falha ao bind {bind_addr}: {e}"))
    })?;
    let server = query_server::spawn_query_server(sock, state.clone(), running.clone())?;

    // ── Aquisição serial ──
    let settings = AcquisitionSettings {
        reconnect_backoff: config.serial.reconnect_backoff(),
        software_version: SOFTWARE_VERSION.into(),
    };
    let acquisition = acquisition::spawn(
        SerialPortOpener::new(&config.serial),
        state,
        Arc::new(TracingSink),
        settings,
        running.clone(),
    )?;

    // ── Banner ──
    println!();
    println!("══════════════════════════════════════════════");
    println!("   🌧  RAINDETECTORD v{SOFTWARE_VERSION} – ATIVO");
    println!("══════════════════════════════════════════════");
    println!("  Dispositivo: {} @ {} baud", config.serial.device, config.serial.baud_rate);
    println!("  Consultas:   udp://{bind_addr}");
    println!("  Protocolo:   v{}", rain_core::PROTOCOL_VERSION);
    println!("══════════════════════════════════════════════");
    println!();

    // ── Espera SIGINT/SIGTERM ──
    if let Err(e) = shutdown::wait_for_stop(&running, || acquisition.is_finished()) {
        error!("Falha ao esperar sinais de encerramento: {e}");
        running.store(false, Ordering::Relaxed);
    }

    if acquisition.join().is_err() {
        error!("Thread de aquisição terminou com panic");
    }
    if server.join().is_err() {
        error!("Thread de consultas terminou com panic");
    }

    info!("Daemon encerrado");
    Ok(())
}
