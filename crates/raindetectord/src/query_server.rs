//! Servidor UDP de consultas `last_measurement`.
//!
//! Cada datagrama de request recebe um datagrama de resposta com a
//! medição publicada (ou `None`). O servidor só lê o slot compartilhado.

use crate::published::LatestMeasurement;
use rain_core::protocol::{Request, decode_request, encode_response};
use std::net::UdpSocket;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Timeout do socket, para observar a flag de parada.
const POLL_TIMEOUT: Duration = Duration::from_secs(1);

/// Inicia a thread do servidor sobre um socket já em bind.
pub fn spawn_query_server(
    sock: UdpSocket,
    state: LatestMeasurement,
    running: Arc<AtomicBool>,
) -> std::io::Result<JoinHandle<()>> {
    sock.set_read_timeout(Some(POLL_TIMEOUT))?;

    std::thread::Builder::new()
        .name("udp-query".into())
        .spawn(move || serve_loop(&sock, &state, &running))
}

fn serve_loop(sock: &UdpSocket, state: &LatestMeasurement, running: &AtomicBool) {
    if let Ok(addr) = sock.local_addr() {
        info!("Servidor de consultas escutando em {addr}");
    }

    let mut buf = [0u8; 64];
    while running.load(Ordering::Relaxed) {
        match sock.recv_from(&mut buf) {
            Ok((size, addr)) => match decode_request(&buf[..size]) {
                Ok(Request::LastMeasurement) => {
                    let measurement = state.last_measurement();
                    match encode_response(measurement.as_ref()) {
                        Ok(frame) => {
                            if let Err(e) = sock.send_to(&frame, addr) {
                                warn!("Erro ao responder {addr}: {e}");
                            }
                        }
                        Err(e) => error!("Erro ao serializar resposta: {e}"),
                    }
                }
                Err(e) => {
                    debug!("Request inválido de {addr}: {e}");
                }
            },
            Err(ref e)
                if e.kind() == std::io::ErrorKind::TimedOut
                    || e.kind() == std::io::ErrorKind::WouldBlock =>
            {
                // Timeout normal, continua
            }
            Err(e) => {
                warn!("Erro ao receber UDP: {e}");
            }
        }
    }

    info!("Servidor de consultas encerrado");
}
