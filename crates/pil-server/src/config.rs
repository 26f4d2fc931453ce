use std::net::{Ipv4Addr, SocketAddr};
use std::path::Path;

use serde::{Deserialize, Serialize};

use pil_chain::ChainConfig;
use pil_crypto::HashAlgorithm;
use pil_ledger::LedgerConfig;

use crate::error::{ServerError, ServerResult};

/// Server configuration, usually read from `pil.toml`.
///
/// Every field has a default, so an empty or partial file is valid.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Digest used for snapshot and document hashes. Changing it on a
    /// populated store makes every stored hash fail verification.
    pub hash_function: HashAlgorithm,
    /// Attach a permissive CORS layer, for browser dashboards served from
    /// another origin.
    pub allow_any_origin: bool,
    pub ledger: LedgerConfig,
    pub chain: ChainConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 8640)),
            hash_function: HashAlgorithm::default(),
            allow_any_origin: false,
            ledger: LedgerConfig::default(),
            chain: ChainConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn from_toml_str(raw: &str) -> ServerResult<Self> {
        toml::from_str(raw).map_err(|e| ServerError::Config(e.to_string()))
    }

    pub fn load(path: impl AsRef<Path>) -> ServerResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ServerError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&raw)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn default_config() {
        let c = ServerConfig::default();
        assert_eq!(c.bind_addr, "127.0.0.1:8640".parse::<SocketAddr>().unwrap());
        assert_eq!(c.hash_function, HashAlgorithm::Blake3);
        assert_eq!(c.ledger.transaction_timeout(), Duration::from_secs(10));
        assert_eq!(c.chain.max_append_retries, 3);
        assert!(!c.allow_any_origin);
    }

    #[test]
    fn empty_file_is_default() {
        assert_eq!(ServerConfig::from_toml_str("").unwrap(), ServerConfig::default());
    }

    #[test]
    fn partial_file_overrides_only_what_it_names() {
        let c = ServerConfig::from_toml_str(
            r#"
            bind_addr = "0.0.0.0:9000"
            hash_function = "sha256"

            [ledger]
            transaction_timeout_ms = 2500
            "#,
        )
        .unwrap();
        assert_eq!(c.bind_addr.port(), 9000);
        assert_eq!(c.hash_function, HashAlgorithm::Sha256);
        assert_eq!(c.ledger.transaction_timeout(), Duration::from_millis(2500));
        assert_eq!(c.ledger.event_channel_capacity, 256);
        assert_eq!(c.chain, ChainConfig::default());
    }

    #[test]
    fn unknown_hash_function_is_a_config_error() {
        let err = ServerConfig::from_toml_str(r#"hash_function = "md5""#).unwrap_err();
        assert!(matches!(err, ServerError::Config(_)));
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let err = ServerConfig::load("/nonexistent/pil.toml").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/pil.toml"));
    }
}
