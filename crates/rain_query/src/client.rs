//! Cliente UDP da consulta `last_measurement`.

use rain_core::Measurement;
use rain_core::protocol::{
    MAX_RESPONSE_SIZE, ProtocolError, Request, decode_response, encode_request,
};
use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, ToSocketAddrs, UdpSocket};
use std::time::Duration;
use tracing::debug;

/// Erros da consulta ao daemon.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("Erro de rede: {0}")]
    Io(#[from] io::Error),

    #[error("Sem resposta de {addr} em {timeout:?}")]
    Timeout { addr: String, timeout: Duration },

    #[error("Endereço sem resolução: {0}")]
    Unresolved(String),

    #[error("Resposta inválida: {0}")]
    Protocol(#[from] ProtocolError),
}

/// Pergunta ao daemon em `addr` pela última medição.
///
/// `Ok(None)` significa que o daemon ainda não decodificou nenhum frame
/// desde a última conexão com o detector.
pub fn last_measurement(addr: &str, timeout: Duration) -> Result<Option<Measurement>, QueryError> {
    let target = addr
        .to_socket_addrs()?
        .next()
        .ok_or_else(|| QueryError::Unresolved(addr.to_owned()))?;

    let sock = UdpSocket::bind(local_bind_addr(&target))?;
    sock.set_read_timeout(Some(timeout))?;
    sock.connect(target)?;

    sock.send(&encode_request(Request::LastMeasurement))?;
    debug!("Request enviado para {addr}");

    let mut buf = [0u8; MAX_RESPONSE_SIZE];
    let size = match sock.recv(&mut buf) {
        Ok(size) => size,
        Err(e)
            if e.kind() == io::ErrorKind::TimedOut || e.kind() == io::ErrorKind::WouldBlock =>
        {
            return Err(QueryError::Timeout {
                addr: addr.to_owned(),
                timeout,
            });
        }
        Err(e) => return Err(e.into()),
    };

    Ok(decode_response(&buf[..size])?)
}

/// Endereço local não especificado da mesma família de `target`.
fn local_bind_addr(target: &SocketAddr) -> SocketAddr {
    let ip = match target {
        SocketAddr::V4(_) => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        SocketAddr::V6(_) => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
    };
    SocketAddr::new(ip, 0)
}
