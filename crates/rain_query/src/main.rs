//! # rain_query
//!
//! Consulta o `raindetectord` e imprime a última medição do detector.
//!
//! ## Uso
//! ```bash
//! rain_query                   # config.toml ao lado do executável
//! rain_query /etc/rain.toml    # config explícito (seção [client])
//! ```

mod client;

use rain_core::Measurement;
use rain_core::config::AppConfig;
use std::process::ExitCode;
use tracing::error;

fn main() -> ExitCode {
    // ── Logging ──
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let config = AppConfig::load(&AppConfig::path_from_args());
    let errors = config.validate_client();
    if !errors.is_empty() {
        for e in &errors {
            error!("Configuração inválida: {e}");
        }
        return ExitCode::FAILURE;
    }
    let addr = config.client.server_addr();

    match client::last_measurement(&addr, config.client.timeout()) {
        Ok(Some(m)) => {
            print_measurement(&m);
            ExitCode::SUCCESS
        }
        Ok(None) => {
            println!("Nenhuma medição disponível");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Falha ao consultar {addr}: {e}");
            ExitCode::FAILURE
        }
    }
}

fn print_measurement(m: &Measurement) {
    let status = if m.is_raining() { "CHUVA" } else { "SECO" };
    println!("Timestamp:  {}", m.timestamp_string());
    println!("Versão:     {}", m.software_version);
    println!("Placas:     {}/{} molhadas ({status})", m.unsafe_boards, m.total_boards);
    println!("Port1:      0b{:08b} (0x{:02X})", m.raw_port1, m.raw_port1);
}
