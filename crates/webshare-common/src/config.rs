//! Application configuration loaded from environment variables and config files.
//!
//! Supports `.env` files for development and environment variables for production.
//! Config precedence: CLI flags > env vars > .env file > config.toml > defaults
//!
//! Two plain variables are honoured for hosting platforms that inject them:
//! `PORT` (listen port) and `METERED_API_KEY` (relay credential service key).

use serde::Deserialize;

/// Origins the browser client is served from.
pub const DEFAULT_ALLOWED_ORIGINS: &[&str] = &[
    "https://websharer.netlify.app",
    "http://localhost:8000",
    "http://localhost:8080",
    "http://127.0.0.1:8000",
    "http://127.0.0.1:8080",
];

/// Values supplied on the command line. They win over every other source.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    /// Config file to read instead of the optional `config.toml`.
    pub config_file: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
}

/// Load configuration at startup, reading a `.env` file first if present.
pub fn init(overrides: &Overrides) -> Result<AppConfig, config::ConfigError> {
    // Load .env file if present (development)
    let _ = dotenvy::dotenv();

    load(overrides)
}

/// Build a configuration from files and environment without reading `.env`.
pub fn load(overrides: &Overrides) -> Result<AppConfig, config::ConfigError> {
    let file = match &overrides.config_file {
        Some(path) => config::File::with_name(path).required(true),
        None => config::File::with_name("config").required(false),
    };

    let hosting_port = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .map(i64::from);
    let hosting_api_key = std::env::var("METERED_API_KEY")
        .ok()
        .filter(|k| !k.is_empty());

    let cfg = config::Config::builder()
        // Defaults
        .set_default("server.host", "0.0.0.0")?
        .set_default("server.port", 3000)?
        .set_default("signaling.keepalive_interval_secs", 30)?
        .set_default("signaling.outbound_buffer", 256)?
        .set_default(
            "turn.api_url",
            "https://webshare.metered.live/api/v1/turn/credentials",
        )?
        .set_default("turn.timeout_secs", 5)?
        .set_default("turn.rate_limit_per_minute", 10)?
        .set_default("turn.trust_forwarded_for", false)?
        .set_default("cors.allowed_origins", DEFAULT_ALLOWED_ORIGINS.to_vec())?
        .add_source(file)
        // Environment variables (WEBSHARE_SERVER__PORT, WEBSHARE_TURN__API_KEY, etc.)
        .add_source(
            config::Environment::with_prefix("WEBSHARE")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("cors.allowed_origins")
                .try_parsing(true),
        )
        .set_override_option("server.port", hosting_port)?
        .set_override_option("turn.api_key", hosting_api_key)?
        .set_override_option("server.host", overrides.host.clone())?
        .set_override_option("server.port", overrides.port.map(i64::from))?
        .build()?;

    cfg.try_deserialize()
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub signaling: SignalingConfig,
    pub turn: TurnConfig,
    pub cors: CorsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SignalingConfig {
    /// Seconds between liveness probes. A connection that misses one probe is reclaimed
    /// on the next tick.
    pub keepalive_interval_secs: u64,
    /// Depth of each connection's outbound queue.
    pub outbound_buffer: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TurnConfig {
    /// Credential service endpoint; the key is appended as `?apiKey=`.
    pub api_url: String,
    /// Optional; without it every request is answered with the fallback servers.
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    pub rate_limit_per_minute: u32,
    /// Key the rate limit on the first `X-Forwarded-For` hop instead of the socket
    /// peer. Only enable behind a proxy that overwrites the header.
    pub trust_forwarded_for: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_every_section() {
        let cfg = load(&Overrides {
            port: Some(4100),
            ..Default::default()
        })
        .expect("defaults should deserialize");

        assert_eq!(cfg.server.port, 4100);
        assert_eq!(cfg.signaling.keepalive_interval_secs, 30);
        assert_eq!(cfg.turn.rate_limit_per_minute, 10);
        assert!(!cfg.turn.trust_forwarded_for);
        assert!(cfg
            .cors
            .allowed_origins
            .iter()
            .any(|o| o == "https://websharer.netlify.app"));
    }

    #[test]
    fn cli_host_wins() {
        let cfg = load(&Overrides {
            host: Some("127.0.0.1".into()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(cfg.server.host, "127.0.0.1");
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let result = load(&Overrides {
            config_file: Some("definitely-not-here.toml".into()),
            ..Default::default()
        });
        assert!(result.is_err());
    }
}
