//! Encerramento por sinal do sistema.
//!
//! SIGINT ou SIGTERM desligam a flag `running` compartilhada pelas threads
//! de aquisição e de consultas; `main` então faz o join das duas.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{info, warn};

/// Sinais de parada registrados no runtime atual.
pub struct StopSignals {
    #[cfg(unix)]
    interrupt: tokio::signal::unix::Signal,
    #[cfg(unix)]
    terminate: tokio::signal::unix::Signal,
}

impl StopSignals {
    /// Registra os handlers. Precisa de um runtime tokio ativo.
    pub fn register() -> io::Result<Self> {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};
            Ok(Self {
                interrupt: signal(SignalKind::interrupt())?,
                terminate: signal(SignalKind::terminate())?,
            })
        }
        #[cfg(not(unix))]
        {
            Ok(Self {})
        }
    }

    /// Espera o próximo sinal de parada e devolve seu nome.
    pub async fn recv(&mut self) -> io::Result<&'static str> {
        #[cfg(unix)]
        {
            tokio::select! {
                _ = self.interrupt.recv() => Ok("SIGINT"),
                _ = self.terminate.recv() => Ok("SIGTERM"),
            }
        }
        #[cfg(not(unix))]
        {
            tokio::signal::ctrl_c().await?;
            Ok("Ctrl-C")
        }
    }
}

/// Intervalo entre verificações de `finished` enquanto espera sinais.
const CHECK_INTERVAL: Duration = Duration::from_secs(1);

/// Bloqueia até SIGINT/SIGTERM ou até `finished()` retornar `true`, e
/// então desliga `running`.
pub fn wait_for_stop(running: &AtomicBool, finished: impl Fn() -> bool) -> io::Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let outcome = runtime.block_on(async {
        let mut signals = StopSignals::register()?;
        loop {
            tokio::select! {
                signal = signals.recv() => return signal.map(Some),
                _ = tokio::time::sleep(CHECK_INTERVAL) => {
                    if finished() {
                        return Ok(None);
                    }
                }
            }
        }
    });

    running.store(false, Ordering::Relaxed);
    match outcome? {
        Some(signal) => info!("{signal} recebido, encerrando daemon"),
        None => warn!("Thread de aquisição terminou, encerrando daemon"),
    }
    Ok(())
}
