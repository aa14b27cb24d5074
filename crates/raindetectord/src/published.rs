//! Slot compartilhado com a última medição decodificada.
//!
//! A thread de aquisição é a única escritora; consultas remotas leem
//! concorrentemente. O lock é mantido apenas para clonar ou substituir o
//! valor, nunca durante I/O.

use rain_core::Measurement;
use std::sync::{Arc, Mutex, MutexGuard};

/// Última medição publicada (ou `None` desde o início/reconexão).
#[derive(Debug, Clone, Default)]
pub struct LatestMeasurement {
    slot: Arc<Mutex<Option<Measurement>>>,
}

impl LatestMeasurement {
    pub fn new() -> Self {
        Self::default()
    }

    /// Substitui a medição publicada por inteiro.
    pub fn publish(&self, measurement: Measurement) {
        *self.lock() = Some(measurement);
    }

    /// Invalida a medição publicada (nova conexão serial).
    pub fn clear(&self) {
        *self.lock() = None;
    }

    /// Cópia da medição atual, ou `None` se ainda não há dados.
    pub fn last_measurement(&self) -> Option<Measurement> {
        self.lock().clone()
    }

    // O slot só guarda valores completos, então um lock envenenado ainda é
    // consistente.
    fn lock(&self) -> MutexGuard<'_, Option<Measurement>> {
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
