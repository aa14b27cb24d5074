//! Destino dos logs operacionais do daemon.
//!
//! O loop de aquisição reporta falhas de conexão por aqui, com o nome do
//! daemon e a severidade. Em produção tudo vai para `tracing`.

use tracing::{error, info};

/// Nome do daemon incluído em todo log.
pub const DAEMON_NAME: &str = "raindetectord";

/// Severidade de uma mensagem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Error,
}

/// Recebe `(daemon, severidade, mensagem)`.
pub trait LogSink: Send + Sync {
    fn log(&self, daemon: &str, severity: Severity, message: &str);
}

/// Sink padrão: encaminha para os macros do `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn log(&self, daemon: &str, severity: Severity, message: &str) {
        match severity {
            Severity::Info => info!(daemon = daemon, "{message}"),
            Severity::Error => error!(daemon = daemon, "{message}"),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Sink que guarda as mensagens para inspeção nos testes.
    #[derive(Debug, Default)]
    pub struct RecordingSink {
        entries: Mutex<Vec<(String, Severity, String)>>,
    }

    impl RecordingSink {
        pub fn errors(&self) -> Vec<String> {
            self.entries
                .lock()
                .unwrap()
                .iter()
                .filter(|(_, severity, _)| *severity == Severity::Error)
                .map(|(_, _, message)| message.clone())
                .collect()
        }

        pub fn daemons(&self) -> Vec<String> {
            self.entries
                .lock()
                .unwrap()
                .iter()
                .map(|(daemon, _, _)| daemon.clone())
                .collect()
        }
    }

    impl LogSink for RecordingSink {
        fn log(&self, daemon: &str, severity: Severity, message: &str) {
            self.entries
                .lock()
                .unwrap()
                .push((daemon.to_owned(), severity, message.to_owned()));
        }
    }
}
