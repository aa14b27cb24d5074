//! Thread de aquisição: abre a porta serial, lê frames e publica a última
//! medição.
//!
//! ```text
//! Disconnected ──open ok──► Connecting ──clear/flush/descarte──► Streaming
//!      ▲   │                                                        │
//!      │   └─open falhou: log + backoff                             │
//!      └──────────────── erro de I/O: fecha, log + backoff ─────────┘
//! ```
//!
//! Nenhuma falha é fatal: o loop só termina quando a flag `running` é
//! desligada.

use crate::log_sink::{DAEMON_NAME, LogSink, Severity};
use crate::published::LatestMeasurement;
use crate::serial_link::{LinkError, LinkOpener, SerialLink};
use chrono::Utc;
use rain_core::{Measurement, decode_frame};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Granularidade com que o backoff verifica a flag de parada.
const PAUSE_SLICE: Duration = Duration::from_millis(100);

/// Parâmetros do loop de aquisição.
#[derive(Debug, Clone)]
pub struct AcquisitionSettings {
    /// Espera fixa após cada falha de conexão
    pub reconnect_backoff: Duration,
    /// Versão embutida em toda medição
    pub software_version: String,
}

/// Loop de aquisição serial.
pub struct AcquisitionLoop<O> {
    opener: O,
    state: LatestMeasurement,
    sink: Arc<dyn LogSink>,
    settings: AcquisitionSettings,
    running: Arc<AtomicBool>,
}

impl<O: LinkOpener> AcquisitionLoop<O> {
    pub fn new(
        opener: O,
        state: LatestMeasurement,
        sink: Arc<dyn LogSink>,
        settings: AcquisitionSettings,
        running: Arc<AtomicBool>,
    ) -> Self {
        Self {
            opener,
            state,
            sink,
            settings,
            running,
        }
    }

    /// Executa até `running` ser desligada.
    pub fn run(mut self) {
        info!("Thread de aquisição iniciada");

        while self.is_running() {
            let result = match self.opener.open() {
                Ok(link) => self.stream(link),
                Err(e) => Err(e),
            };

            if let Err(e) = result {
                self.recover(&e);
            }
        }

        info!("Thread de aquisição encerrada");
    }

    /// Estado `Streaming`: retorna `Ok` apenas quando o daemon está parando.
    ///
    /// A conexão é fechada ao sair (drop do link).
    fn stream(&self, mut link: Box<dyn SerialLink>) -> Result<(), LinkError> {
        self.state.clear();
        link.clear_buffers()?;

        // A primeira linha pode ser resto de um frame anterior à conexão
        let _ = link.read_line()?;

        self.sink
            .log(DAEMON_NAME, Severity::Info, "Conectado ao detector de chuva");

        while self.is_running() {
            let Some(line) = link.read_line()? else {
                continue;
            };

            match decode_frame(&line, Utc::now(), &self.settings.software_version) {
                Ok(measurement) => self.publish(measurement),
                Err(e) => debug!("Linha ignorada: {e}"),
            }
        }

        Ok(())
    }

    fn publish(&self, measurement: Measurement) {
        debug!(
            "Frame: {}/{} placas molhadas (port1 0b{:08b})",
            measurement.unsafe_boards, measurement.total_boards, measurement.raw_port1
        );
        self.state.publish(measurement);
    }

    fn recover(&self, error: &LinkError) {
        let backoff = self.settings.reconnect_backoff;
        let message = match error {
            LinkError::Open { .. } => format!("Falha ao conectar ao detector: {error}"),
            LinkError::Read(_) => format!("Conexão com o detector perdida: {error}"),
        };

        self.sink.log(DAEMON_NAME, Severity::Error, &message);
        eprintln!("{message}. Tentando novamente em {:.0}s...", backoff.as_secs_f64());

        self.pause(backoff);
    }

    /// Dorme `duration`, acordando antes se o daemon for parado.
    fn pause(&self, duration: Duration) {
        let deadline = Instant::now() + duration;
        while self.is_running() {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            std::thread::sleep(PAUSE_SLICE.min(deadline - now));
        }
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }
}

/// Inicia o loop de aquisição em uma thread dedicada.
pub fn spawn<O: LinkOpener + 'static>(
    opener: O,
    state: LatestMeasurement,
    sink: Arc<dyn LogSink>,
    settings: AcquisitionSettings,
    running: Arc<AtomicBool>,
) -> std::io::Result<JoinHandle<()>> {
    let acquisition = AcquisitionLoop::new(opener, state, sink, settings, running);

    std::thread::Builder::new()
        .name("serial-acquisition".into())
        .spawn(move || acquisition.run())
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────
