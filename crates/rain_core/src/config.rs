//! Configuração unificada via TOML.
//!
//! Todos os campos têm default: sem `config.toml` o daemon usa os
//! parâmetros fixos do detector (`/dev/rain`, 9600 baud, timeout de 5 s,
//! backoff de 10 s).

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Erros ao carregar configuração de um caminho explícito.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Erro ao ler {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Erro ao parsear {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Parâmetros da porta serial do detector.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Caminho do dispositivo serial
    pub device: String,
    /// Baud rate
    pub baud_rate: u32,
    /// Timeout de leitura (segundos)
    pub read_timeout_secs: f64,
    /// Espera fixa entre tentativas de reconexão (segundos)
    pub reconnect_backoff_secs: f64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            device: "/dev/rain".into(),
            baud_rate: 9600,
            read_timeout_secs: 5.0,
            reconnect_backoff_secs: 10.0,
        }
    }
}

impl SerialConfig {
    /// Erros de validação da seção `[serial]`.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.device.trim().is_empty() {
            errors.push("Dispositivo serial não pode ser vazio".into());
        }
        if self.baud_rate == 0 {
            errors.push("Baud rate não pode ser 0".into());
        }
        check_secs(&mut errors, "Timeout de leitura", self.read_timeout_secs, false);
        check_secs(&mut errors, "Backoff de reconexão", self.reconnect_backoff_secs, true);
        errors
    }

    /// Só chamar após [`SerialConfig::validate`] sem erros.
    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.read_timeout_secs)
    }

    /// Só chamar após [`SerialConfig::validate`] sem erros.
    pub fn reconnect_backoff(&self) -> Duration {
        Duration::from_secs_f64(self.reconnect_backoff_secs)
    }
}

/// Endereço em que o daemon atende consultas UDP.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// IP local para bind
    pub bind_ip: String,
    /// Porta UDP
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_ip: "127.0.0.1".into(),
            port: 9016,
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        join_host_port(&self.bind_ip, self.port)
    }

    /// Erros de validação da seção `[server]`.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.port == 0 {
            errors.push("Porta do servidor não pode ser 0".into());
        }
        errors
    }
}

/// Configuração do cliente de consulta.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// IP do daemon
    pub server_ip: String,
    /// Porta UDP do daemon
    pub port: u16,
    /// Tempo máximo de espera pela resposta (segundos)
    pub timeout_secs: f64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_ip: "127.0.0.1".into(),
            port: 9016,
            timeout_secs: 2.0,
        }
    }
}

impl ClientConfig {
    pub fn server_addr(&self) -> String {
        join_host_port(&self.server_ip, self.port)
    }

    /// Erros de validação da seção `[client]`.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.port == 0 {
            errors.push("Porta do cliente não pode ser 0".into());
        }
        check_secs(&mut errors, "Timeout do cliente", self.timeout_secs, false);
        errors
    }

    /// Só chamar após [`ClientConfig::validate`] sem erros.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs_f64(self.timeout_secs)
    }
}

/// `host:port`, com colchetes para IPv6 literal.
fn join_host_port(host: &str, port: u16) -> String {
    match host.parse::<IpAddr>() {
        Ok(ip) => SocketAddr::new(ip, port).to_string(),
        Err(_) => format!("{host}:{port}"),
    }
}

/// Configuração raiz (daemon e cliente).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub serial: SerialConfig,
    pub server: ServerConfig,
    pub client: ClientConfig,
}

impl AppConfig {
    /// Carrega configuração de um arquivo TOML.
    ///
    /// Arquivo ausente ou inválido resulta na configuração padrão.
    pub fn load(path: &Path) -> Self {
        if path.exists() {
            match Self::load_strict(path) {
                Ok(config) => {
                    info!("Configuração carregada de {}", path.display());
                    return config;
                }
                Err(e) => warn!("{e}"),
            }
        }

        info!("Usando configuração padrão");
        AppConfig::default()
    }

    /// Carrega configuração propagando erros de leitura e parse.
    pub fn load_strict(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Retorna o caminho padrão do config.toml.
    pub fn default_path() -> PathBuf {
        let exe_dir = std::env::current_exe()
            .map(|p| p.parent().unwrap_or(Path::new(".")).to_path_buf())
            .unwrap_or_else(|_| PathBuf::from("."));
        exe_dir.join("config.toml")
    }

    /// Caminho passado como primeiro argumento, ou o padrão.
    pub fn path_from_args() -> PathBuf {
        std::env::args_os()
            .nth(1)
            .map(PathBuf::from)
            .unwrap_or_else(Self::default_path)
    }

    /// Valida as seções usadas pelo daemon (`[serial]` e `[server]`).
    pub fn validate_daemon(&self) -> Vec<String> {
        let mut errors = self.serial.validate();
        errors.extend(self.server.validate());
        errors
    }

    /// Valida a seção usada pelo cliente (`[client]`).
    pub fn validate_client(&self) -> Vec<String> {
        self.client.validate()
    }
}

/// Maior intervalo aceito em campos de segundos (1 dia).
const MAX_SECS: f64 = 86_400.0;

/// Confere se `value` é um intervalo utilizável como [`Duration`].
fn check_secs(errors: &mut Vec<String>, label: &str, value: f64, allow_zero: bool) {
    let in_range = if allow_zero { value >= 0.0 } else { value > 0.0 };
    if !in_range || value > MAX_SECS || Duration::try_from_secs_f64(value).is_err() {
        let min = if allow_zero { ">= 0" } else { "> 0" };
        errors.push(format!("{label} inválido: {value} (deve ser {min} e <= {MAX_SECS})"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        let errors = config.validate_daemon();
        assert!(errors.is_empty(), "Erros: {:?}", errors);
        assert!(config.validate_client().is_empty());
    }

    #[test]
    fn defaults_match_detector_parameters() {
        let serial = SerialConfig::default();
        assert_eq!(serial.device, "/dev/rain");
        assert_eq!(serial.baud_rate, 9600);
        assert_eq!(serial.read_timeout(), Duration::from_secs(5));
        assert_eq!(serial.reconnect_backoff(), Duration::from_secs(10));
    }

    #[test]
    fn roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(config.serial.device, parsed.serial.device);
        assert_eq!(config.server.port, parsed.server.port);
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let partial = r#"
[serial]
device = "/dev/ttyUSB3"
"#;
        let config: AppConfig = toml::from_str(partial).unwrap();
        assert_eq!(config.serial.device, "/dev/ttyUSB3");
        // Outros campos devem ter valor padrão
        assert_eq!(config.serial.baud_rate, 9600);
        assert_eq!(config.server.port, 9016);
        assert_eq!(config.client.server_addr(), "127.0.0.1:9016");
    }

    #[test]
    fn validate_reports_bad_values() {
        let mut config = AppConfig::default();
        config.serial.device = "  ".into();
        config.serial.read_timeout_secs = 0.0;
        config.server.port = 0;
        assert_eq!(config.validate_daemon().len(), 3);
        // O cliente não depende de [serial] nem de [server]
        assert!(config.validate_client().is_empty());
    }

    #[test]
    fn rejects_seconds_that_do_not_fit_a_duration() {
        let config: AppConfig = toml::from_str(
            r#"
[serial]
read_timeout_secs = inf
reconnect_backoff_secs = 1e30

[client]
timeout_secs = nan
"#,
        )
        .unwrap();
        assert_eq!(config.validate_daemon().len(), 2, "{:?}", config.validate_daemon());
        assert_eq!(config.validate_client().len(), 1);
    }

    #[test]
    fn zero_backoff_is_allowed_but_zero_timeout_is_not() {
        let mut config = AppConfig::default();
        config.serial.reconnect_backoff_secs = 0.0;
        assert!(config.validate_daemon().is_empty());
        config.serial.read_timeout_secs = -1.0;
        assert_eq!(config.validate_daemon().len(), 1);
    }

    #[test]
    fn ipv6_addresses_are_bracketed() {
        let client = ClientConfig {
            server_ip: "::1".into(),
            ..ClientConfig::default()
        };
        assert_eq!(client.server_addr(), "[::1]:9016");

        let server = ServerConfig {
            bind_ip: "rainhost.local".into(),
            port: 7000,
        };
        assert_eq!(server.bind_addr(), "rainhost.local:7000");
    }

    #[test]
    fn missing_file_uses_defaults() {
        let config = AppConfig::load(Path::new("/nonexistent/raindetectord/config.toml"));
        assert_eq!(config.serial.device, "/dev/rain");
        assert!(matches!(
            AppConfig::load_strict(Path::new("/nonexistent/raindetectord/config.toml")),
            Err(ConfigError::Read { .. })
        ));
    }
}
