use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;
use tandem_core::IceServerConfig;
use tandem_core::utils::default_stun_urls;
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value '{value}' for {var}")]
    Invalid { var: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
    /// Pushed to every client right after it registers.
    pub ice_servers: Vec<IceServerConfig>,
}

impl ServerConfig {
    /// Reads `TANDEM_HOST`, `TANDEM_PORT`, `TANDEM_STUN_URLS` (comma separated) and the
    /// optional `TURN_URL` / `TURN_USERNAME` / `TURN_CREDENTIAL` triple.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let host = parse_var("TANDEM_HOST", env::var("TANDEM_HOST").ok(), defaults.host)?;
        let port = parse_var("TANDEM_PORT", env::var("TANDEM_PORT").ok(), defaults.port)?;

        let stun_urls = env::var("TANDEM_STUN_URLS")
            .ok()
            .map(|urls| parse_url_list(&urls))
            .unwrap_or_else(default_stun_urls);

        let turn = env::var("TURN_URL").ok().map(|url| IceServerConfig {
            urls: vec![url],
            username: env::var("TURN_USERNAME").ok(),
            credential: env::var("TURN_CREDENTIAL").ok(),
        });

        Ok(Self {
            host,
            port,
            ice_servers: build_ice_servers(stun_urls, turn),
        })
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            ice_servers: build_ice_servers(default_stun_urls(), None),
        }
    }
}

fn parse_var<T: FromStr>(
    var: &'static str,
    raw: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value }),
    }
}

fn parse_url_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}

fn build_ice_servers(
    stun_urls: Vec<String>,
    turn: Option<IceServerConfig>,
) -> Vec<IceServerConfig> {
    let mut servers = Vec::new();
    if !stun_urls.is_empty() {
        servers.push(IceServerConfig {
            urls: stun_urls,
            username: None,
            credential: None,
        });
    }
    servers.extend(turn);
    servers
}
