//! Conexão serial com o detector de chuva.
//!
//! [`LinkOpener`] abre a porta; [`SerialLink`] é o handle aberto, usado
//! exclusivamente pela thread de aquisição e descartado (fechando a porta)
//! a cada reconexão.

use rain_core::config::SerialConfig;
use rain_core::frame::{FRAME_LEN, FRAME_MARKER, FRAME_TERMINATOR as CRLF};
use serialport::{ClearBuffer, SerialPort};
use std::io::{self, Read};
use std::time::Duration;
use tracing::debug;

/// Maior linha aceita antes de cortar (lixo sem terminador).
pub const MAX_LINE_LEN: usize = 64;

/// Falhas da conexão serial que forçam reconexão.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    #[error("Falha ao abrir {device}: {source}")]
    Open {
        device: String,
        source: serialport::Error,
    },

    #[error("Erro de I/O na porta serial: {0}")]
    Read(#[from] io::Error),
}

/// Handle de uma porta serial aberta.
pub trait SerialLink: Send {
    /// Descarta bytes pendentes de entrada e saída.
    fn clear_buffers(&mut self) -> Result<(), LinkError>;

    /// Lê uma linha terminada em CRLF.
    ///
    /// `Ok(None)` indica timeout (sem frame neste ciclo), não erro.
    fn read_line(&mut self) -> Result<Option<Vec<u8>>, LinkError>;
}

/// Abre novas conexões a cada tentativa.
pub trait LinkOpener: Send {
    fn open(&mut self) -> Result<Box<dyn SerialLink>, LinkError>;
}

// ──────────────────────────────────────────────
// Leitura de linhas
// ──────────────────────────────────────────────

/// Acumula bytes de um `Read` e separa linhas terminadas em CRLF.
///
/// Um `\n` isolado não termina a linha: ele pode aparecer como byte de
/// payload do frame. Pelo mesmo motivo, bytes que começam com `$` só são
/// cortados antes do tamanho de um frame se não houver como completá-lo.
#[derive(Debug)]
pub struct LineReader<R> {
    inner: R,
    pending: Vec<u8>,
}

impl<R: Read> LineReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            pending: Vec::with_capacity(MAX_LINE_LEN),
        }
    }

    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    /// Descarta bytes já lidos mas ainda não consumidos.
    pub fn discard_pending(&mut self) {
        self.pending.clear();
    }

    /// Próxima linha (com o terminador), ou `None` em timeout.
    ///
    /// Bytes parciais lidos antes do timeout são descartados.
    pub fn read_line(&mut self) -> io::Result<Option<Vec<u8>>> {
        let mut chunk = [0u8; MAX_LINE_LEN];
        loop {
            if let Some(end) = self.line_end() {
                return Ok(Some(self.pending.drain(..end).collect()));
            }
            if self.pending.len() >= MAX_LINE_LEN {
                return Ok(Some(self.pending.drain(..MAX_LINE_LEN).collect()));
            }

            match self.inner.read(&mut chunk) {
                Ok(0) => {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "dispositivo retornou 0 bytes (desconectado?)",
                    ));
                }
                Ok(n) => self.pending.extend_from_slice(&chunk[..n]),
                Err(e)
                    if e.kind() == io::ErrorKind::TimedOut
                        || e.kind() == io::ErrorKind::WouldBlock =>
                {
                    if !self.pending.is_empty() {
                        debug!("Timeout com {} bytes parciais, descartando", self.pending.len());
                        self.pending.clear();
                    }
                    return Ok(None);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
    }

    /// Tamanho da próxima linha completa em `pending`, se houver.
    fn line_end(&self) -> Option<usize> {
        let pending = self.pending.as_slice();
        if pending.first() == Some(&FRAME_MARKER) {
            // Payload `\r\n` não pode encerrar o frame antes do terminador
            if pending.len() < FRAME_LEN {
                return None;
            }
            if pending[FRAME_LEN - CRLF.len()..FRAME_LEN] == CRLF[..] {
                return Some(FRAME_LEN);
            }
        }
        pending
            .windows(CRLF.len())
            .position(|w| w == CRLF)
            .map(|start| start + CRLF.len())
    }
}

// ──────────────────────────────────────────────
// Porta serial real
// ──────────────────────────────────────────────

/// Conexão sobre uma porta do crate `serialport`.
pub struct SerialPortLink {
    reader: LineReader<Box<dyn SerialPort>>,
}

impl SerialLink for SerialPortLink {
    fn clear_buffers(&mut self) -> Result<(), LinkError> {
        self.reader.discard_pending();
        self.reader
            .get_mut()
            .clear(ClearBuffer::All)
            .map_err(|e| LinkError::Read(e.into()))
    }

    fn read_line(&mut self) -> Result<Option<Vec<u8>>, LinkError> {
        Ok(self.reader.read_line()?)
    }
}

/// Abre o dispositivo configurado com parâmetros fixos.
#[derive(Debug, Clone)]
pub struct SerialPortOpener {
    device: String,
    baud_rate: u32,
    timeout: Duration,
}

impl SerialPortOpener {
    pub fn new(config: &SerialConfig) -> Self {
        Self {
            device: config.device.clone(),
            baud_rate: config.baud_rate,
            timeout: config.read_timeout(),
        }
    }
}

impl LinkOpener for SerialPortOpener {
    fn open(&mut self) -> Result<Box<dyn SerialLink>, LinkError> {
        let port = serialport::new(&self.device, self.baud_rate)
            .timeout(self.timeout)
            .open()
            .map_err(|source| LinkError::Open {
                device: self.device.clone(),
                source,
            })?;
        Ok(Box::new(SerialPortLink {
            reader: LineReader::new(port),
        }))
    }
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// `Read` que devolve um roteiro de chunks e erros.
    struct ScriptedRead(VecDeque<io::Result<Vec<u8>>>);

    impl ScriptedRead {
        fn new(script: Vec<io::Result<Vec<u8>>>) -> Self {
            Self(script.into())
        }
    }

    impl Read for ScriptedRead {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.0.pop_front() {
                Some(Ok(bytes)) => {
                    let n = bytes.len().min(buf.len());
                    buf[..n].copy_from_slice(&bytes[..n]);
                    if n < bytes.len() {
                        self.0.push_front(Ok(bytes[n..].to_vec()));
                    }
                    Ok(n)
                }
                Some(Err(e)) => Err(e),
                None => Err(io::ErrorKind::TimedOut.into()),
            }
        }
    }

    fn chunk(bytes: &[u8]) -> io::Result<Vec<u8>> {
        Ok(bytes.to_vec())
    }

    fn timeout() -> io::Result<Vec<u8>> {
        Err(io::ErrorKind::TimedOut.into())
    }

    #[test]
    fn splits_lines_on_crlf() {
        let mut r = LineReader::new(ScriptedRead::new(vec![chunk(b"$\x01\x00\r\n$\x03\x00\r\n")]));
        assert_eq!(r.read_line().unwrap().unwrap(), b"$\x01\x00\r\n");
        assert_eq!(r.read_line().unwrap().unwrap(), b"$\x03\x00\r\n");
        assert_eq!(r.read_line().unwrap(), None);
    }

    #[test]
    fn joins_fragments_across_reads() {
        let mut r = LineReader::new(ScriptedRead::new(vec![chunk(b"$\x07"), chunk(b"\x00\r"), chunk(b"\n")]));
        assert_eq!(r.read_line().unwrap().unwrap(), b"$\x07\x00\r\n");
    }

    #[test]
    fn bare_newline_does_not_end_line() {
        let mut r = LineReader::new(ScriptedRead::new(vec![chunk(b"$\n\n\r\n")]));
        assert_eq!(r.read_line().unwrap().unwrap(), b"$\n\n\r\n");
    }

    #[test]
    fn crlf_payload_stays_in_one_frame() {
        let mut r = LineReader::new(ScriptedRead::new(vec![chunk(b"$\r\n\r\n$\x01\x00\r\n")]));
        assert_eq!(r.read_line().unwrap().unwrap(), b"$\r\n\r\n");
        assert_eq!(r.read_line().unwrap().unwrap(), b"$\x01\x00\r\n");
    }

    #[test]
    fn crlf_payload_split_across_reads() {
        let mut r = LineReader::new(ScriptedRead::new(vec![chunk(b"$\r"), chunk(b"\n"), chunk(b"\r\n")]));
        assert_eq!(r.read_line().unwrap().unwrap(), b"$\r\n\r\n");
    }

    #[test]
    fn short_marker_line_is_cut_once_more_bytes_arrive() {
        let mut r = LineReader::new(ScriptedRead::new(vec![chunk(b"$\r\n"), chunk(b"$\x02\x00\r\n")]));
        assert_eq!(r.read_line().unwrap().unwrap(), b"$\r\n");
        assert_eq!(r.read_line().unwrap().unwrap(), b"$\x02\x00\r\n");
    }

    #[test]
    fn timeout_discards_partial_line() {
        let mut r = LineReader::new(ScriptedRead::new(vec![
            chunk(b"$\x07"),
            timeout(),
            chunk(b"$\x01\x00\r\n"),
        ]));
        assert_eq!(r.read_line().unwrap(), None);
        assert_eq!(r.read_line().unwrap().unwrap(), b"$\x01\x00\r\n");
    }

    #[test]
    fn long_garbage_is_cut() {
        let garbage = [b'x'; MAX_LINE_LEN + 10];
        let mut r = LineReader::new(ScriptedRead::new(vec![chunk(&garbage), chunk(b"\r\n")]));
        assert_eq!(r.read_line().unwrap().unwrap().len(), MAX_LINE_LEN);
        let rest = r.read_line().unwrap().unwrap();
        assert_eq!(rest.len(), 12);
        assert!(rest.ends_with(b"\r\n"));
    }

    #[test]
    fn io_errors_propagate() {
        let mut r = LineReader::new(ScriptedRead::new(vec![Err(io::Error::new(
            io::ErrorKind::BrokenPipe,
            "unplugged",
        ))]));
        assert_eq!(r.read_line().unwrap_err().kind(), io::ErrorKind::BrokenPipe);
    }

    #[test]
    fn zero_byte_read_is_an_error() {
        let mut r = LineReader::new(ScriptedRead::new(vec![chunk(b"")]));
        assert_eq!(r.read_line().unwrap_err().kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn interrupted_read_is_retried() {
        let mut r = LineReader::new(ScriptedRead::new(vec![
            Err(io::ErrorKind::Interrupted.into()),
            chunk(b"$\x00\x00\r\n"),
        ]));
        assert_eq!(r.read_line().unwrap().unwrap(), b"$\x00\x00\r\n");
    }

    #[test]
    fn discard_pending_drops_buffered_lines() {
        let mut r = LineReader::new(ScriptedRead::new(vec![chunk(b"$\x01\x00\r\n$\x02\x00\r\n")]));
        assert!(r.read_line().unwrap().is_some());
        r.discard_pending();
        assert_eq!(r.read_line().unwrap(), None);
    }

    #[test]
    fn opening_missing_device_fails() {
        let mut opener = SerialPortOpener::new(&SerialConfig {
            device: "/dev/raindetectord-test-missing".into(),
            ..SerialConfig::default()
        });
        assert!(matches!(opener.open(), Err(LinkError::Open { .. })));
    }
}
