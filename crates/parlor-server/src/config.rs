//! Server configuration loading from file and environment variables.

use parlor_voice::OpenAiConfig;
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use thiserror::Error;

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server network settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// OpenAI engine settings.
    #[serde(default)]
    pub openai: OpenAiConfig,
}

/// Network configuration for the HTTP server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Browser origins allowed by CORS.
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "parlor_server=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
}

fn default_port() -> u16 {
    8000
}

fn default_cors_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".to_string(),
        "http://localhost:5173".to_string(),
    ]
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: default_cors_origins(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// The loaded configuration cannot start a working server.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `PARLOR_HOST` overrides `server.host`
/// - `PARLOR_PORT` overrides `server.port`
/// - `PARLOR_LOG_LEVEL` overrides `logging.level`
/// - `PARLOR_LOG_JSON` overrides `logging.json` (set to "true" to enable)
/// - `OPENAI_API_KEY` overrides `openai.api_key`
/// - `VECTOR_STORE_ID` overrides `openai.vector_store_id`
/// - `KB_ASSISTANT_ID` overrides `openai.assistant_id`
/// - `OPENAI_REALTIME_MODEL` overrides `openai.realtime_model`
/// - `OPENAI_STT_MODEL` overrides `openai.stt_model`
/// - `OPENAI_RAG_ASSISTANT_MODEL` overrides `openai.assistant_model`
/// - `OPENAI_TTS_VOICE` overrides `openai.voice`
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    // Environment variable overrides
    if let Ok(host) = std::env::var("PARLOR_HOST") {
        if let Ok(parsed) = host.parse() {
            config.server.host = parsed;
        }
    }
    if let Ok(port) = std::env::var("PARLOR_PORT") {
        if let Ok(parsed) = port.parse() {
            config.server.port = parsed;
        }
    }
    if let Ok(level) = std::env::var("PARLOR_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Ok(json) = std::env::var("PARLOR_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }
    if let Ok(key) = std::env::var("OPENAI_API_KEY") {
        config.openai.api_key = key;
    }
    if let Ok(id) = std::env::var("VECTOR_STORE_ID") {
        config.openai.vector_store_id = id;
    }
    if let Ok(id) = std::env::var("KB_ASSISTANT_ID") {
        if !id.trim().is_empty() {
            config.openai.assistant_id = Some(id);
        }
    }
    if let Ok(model) = std::env::var("OPENAI_REALTIME_MODEL") {
        config.openai.realtime_model = model;
    }
    if let Ok(model) = std::env::var("OPENAI_STT_MODEL") {
        config.openai.stt_model = model;
    }
    if let Ok(model) = std::env::var("OPENAI_RAG_ASSISTANT_MODEL") {
        config.openai.assistant_model = model;
    }
    if let Ok(voice) = std::env::var("OPENAI_TTS_VOICE") {
        config.openai.voice = voice;
    }

    Ok(config)
}

/// Rejects configurations that would fail on the first turn instead of at
/// startup.
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.openai.api_key.trim().is_empty() {
        return Err(ConfigError::Invalid(
            "openai.api_key is required (or set OPENAI_API_KEY)".to_string(),
        ));
    }
    if config.openai.vector_store_id.trim().is_empty() && config.openai.assistant_id.is_none() {
        return Err(ConfigError::Invalid(
            "openai.vector_store_id is required unless openai.assistant_id is set".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_when_no_path_given() {
        let config = load_config(None).unwrap();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.server.cors_origins.len(), 2);
        assert_eq!(config.openai.voice, "alloy");
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = load_config(Some("/nonexistent/parlor.toml")).unwrap();
        assert_eq!(config.server.port, 8000);
    }

    #[test]
    fn file_values_override_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[server]
port = 9100
cors_origins = ["https://kb.example.org"]

[logging]
level = "debug"

[openai]
api_key = "sk-test"
vector_store_id = "vs_123"
voice = "verse"
"#
        )
        .unwrap();

        let config = load_config(Some(file.path().to_str().unwrap())).unwrap();
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.server.cors_origins, vec!["https://kb.example.org"]);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.openai.api_key, "sk-test");
        assert_eq!(config.openai.vector_store_id, "vs_123");
        assert_eq!(config.openai.voice, "verse");
    }

    #[test]
    fn malformed_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "not valid toml [[[").unwrap();
        let result = load_config(Some(file.path().to_str().unwrap()));
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn validation_requires_an_api_key() {
        let config = Config::default();
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("api_key"));
    }

    #[test]
    fn validation_accepts_assistant_id_in_place_of_vector_store() {
        let mut config = Config::default();
        config.openai.api_key = "sk-test".to_string();
        assert!(validate(&config).is_err());

        config.openai.assistant_id = Some("asst_123".to_string());
        assert!(validate(&config).is_ok());
    }
}
