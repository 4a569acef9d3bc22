use std::env;
use std::fs;
use std::net::IpAddr;
use std::path::PathBuf;

use dirs_next::config_dir;
use serde::{Deserialize, Serialize};
use tracing::warn;
use url::Url;

const DEFAULT_UPSTREAM_URL: &str = "https://duckduckgo.com";
const DEFAULT_BACKEND_ORIGIN: &str = "http://127.0.0.1:8000";

/// Runtime configuration for the facade and the reverse proxy. Resolved once
/// at startup and passed into every component; environment variables win
/// over the config file, the file over built-in defaults.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    /// None disables the IP gate entirely; an empty list rejects everyone.
    pub allowed_ips: Option<Vec<IpAddr>>,
    pub trust_forwarded_for: bool,
    pub upstream_url: String,
    pub backend_origin: String,
    pub proxy_port: u16,
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct ConfigFile {
    host: Option<String>,
    port: Option<u16>,
    origins: Option<Vec<String>>,
    allowed_ips: Option<Vec<String>>,
    trust_forwarded_for: Option<bool>,
    upstream_url: Option<String>,
    backend_origin: Option<String>,
    proxy_port: Option<u16>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: IpAddr::from([127, 0, 0, 1]),
            port: 8000,
            allowed_origins: Vec::new(),
            allowed_ips: None,
            trust_forwarded_for: false,
            upstream_url: DEFAULT_UPSTREAM_URL.to_string(),
            backend_origin: DEFAULT_BACKEND_ORIGIN.to_string(),
            proxy_port: 8080,
        }
    }
}

fn config_file_path() -> PathBuf {
    let mut path = config_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("duckgate");
    path.push("duckgate.toml");
    path
}

fn load_config_file() -> ConfigFile {
    let path = config_file_path();
    if path.exists() {
        let content = fs::read_to_string(&path).unwrap_or_default();
        toml::from_str(&content).unwrap_or_default()
    } else {
        // First run: write an empty template so operators have a file to edit
        if let Some(parent) = path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        let default = ConfigFile::default();
        let toml_str = toml::to_string_pretty(&default).unwrap_or_default();
        let _ = fs::write(&path, toml_str);
        default
    }
}

impl Config {
    pub fn load() -> Self {
        let file = load_config_file();
        let defaults = Config::default();

        let host = env::var("DUCKGATE_HOST")
            .ok()
            .or(file.host)
            .and_then(|value| parse_addr(&value))
            .unwrap_or(defaults.host);
        let port = env::var("DUCKGATE_PORT")
            .ok()
            .and_then(|value| value.parse().ok())
            .or(file.port)
            .unwrap_or(defaults.port);
        let allowed_origins = env::var("DUCKGATE_ORIGINS")
            .ok()
            .map(|value| split_list(&value))
            .or(file.origins)
            .unwrap_or(defaults.allowed_origins);
        let allowed_ips = env::var("DUCKGATE_ALLOWED_IPS")
            .ok()
            .map(|value| split_list(&value))
            .or(file.allowed_ips)
            .map(|entries| parse_addr_list(&entries));
        let trust_forwarded_for = env::var("DUCKGATE_TRUST_FORWARDED_FOR")
            .ok()
            .map(|value| matches!(value.to_lowercase().as_str(), "1" | "true" | "yes"))
            .or(file.trust_forwarded_for)
            .unwrap_or(defaults.trust_forwarded_for);
        let upstream_url = env::var("DUCKGATE_UPSTREAM_URL")
            .ok()
            .or(file.upstream_url)
            .map(|value| checked_origin(value, DEFAULT_UPSTREAM_URL))
            .unwrap_or(defaults.upstream_url);
        let backend_origin = env::var("DUCKGATE_BACKEND_ORIGIN")
            .ok()
            .or(file.backend_origin)
            .map(|value| checked_origin(value, DEFAULT_BACKEND_ORIGIN))
            .unwrap_or(defaults.backend_origin);
        let proxy_port = env::var("DUCKGATE_PROXY_PORT")
            .ok()
            .and_then(|value| value.parse().ok())
            .or(file.proxy_port)
            .unwrap_or(defaults.proxy_port);

        Config {
            host,
            port,
            allowed_origins,
            allowed_ips,
            trust_forwarded_for,
            upstream_url,
            backend_origin,
            proxy_port,
        }
    }
}

/// Splits a comma-separated value, dropping blank entries. An empty input
/// produces an empty list.
fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_addr(value: &str) -> Option<IpAddr> {
    match value.parse() {
        Ok(addr) => Some(addr),
        Err(_) => {
            warn!("Ignoring unparseable address: {}", value);
            None
        }
    }
}

fn parse_addr_list(entries: &[String]) -> Vec<IpAddr> {
    entries.iter().filter_map(|entry| parse_addr(entry)).collect()
}

fn checked_origin(value: String, fallback: &str) -> String {
    match Url::parse(&value) {
        Ok(_) => value.trim_end_matches('/').to_string(),
        Err(e) => {
            warn!("Ignoring invalid origin {}: {}", value, e);
            fallback.to_string()
        }
    }
}
