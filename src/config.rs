//! Configuration surface: the gateway consumes a snapshot of providers,
//! routes, and settings from an external collaborator and never writes
//! back to it.

use crate::route::RouteTable;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Bind address, timeouts, and proxy-chain depth.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub bind_host: String,
    pub bind_port: u16,
    pub request_timeout_secs: u64,
    pub max_proxy_depth: usize,
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_host: "127.0.0.1".to_string(),
            bind_port: 9527,
            request_timeout_secs: 120,
            max_proxy_depth: crate::route::DEFAULT_MAX_PROXY_DEPTH,
            log_level: "info".to_string(),
        }
    }
}

impl Settings {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind_host, self.bind_port)
    }
}

/// A full configuration snapshot: routes plus process-wide settings.
/// Loaded at boot and whenever the external store notifies a change; the
/// engine holds it behind an atomically-swapped pointer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigSnapshot {
    pub routes: RouteTable,
    pub settings: Settings,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}: {source}")]
    Io { path: String, source: std::io::Error },
    #[error("failed to parse config file {path:?}: {source}")]
    Parse { path: String, source: toml::de::Error },
    #[error("duplicate proxy_path {0:?} among enabled routes")]
    DuplicateProxyPath(String),
}

/// Loads a [`ConfigSnapshot`] from a TOML file on disk. Snapshots are
/// pulled at boot and on an external notification.
pub fn load_from_toml_file(path: &std::path::Path) -> Result<ConfigSnapshot, ConfigError> {
    let text = std::fs::read_to_string(path)
        .map_err(|source| ConfigError::Io { path: path.display().to_string(), source })?;
    let snapshot: ConfigSnapshot = toml::from_str(&text)
        .map_err(|source| ConfigError::Parse { path: path.display().to_string(), source })?;
    validate(&snapshot)?;
    Ok(snapshot)
}

fn validate(snapshot: &ConfigSnapshot) -> Result<(), ConfigError> {
    let mut seen = std::collections::HashSet::new();
    for route in snapshot.routes.routes.iter().filter(|r| r.enabled) {
        if !seen.insert(route.proxy_path.as_str()) {
            return Err(ConfigError::DuplicateProxyPath(route.proxy_path.clone()));
        }
    }
    Ok(())
}

/// In-process boundary for an embedding application to supply snapshots
/// programmatically instead of from a file. `load_from_toml_file` plus
/// [`StaticConfigSource`] below are the only implementations this crate
/// ships.
pub trait ConfigSource: Send + Sync {
    fn load(&self) -> Result<ConfigSnapshot, ConfigError>;
}

/// A [`ConfigSource`] that always returns a fixed snapshot; used by the CLI
/// binary's `--config` flag and by tests.
pub struct StaticConfigSource(pub ConfigSnapshot);

impl ConfigSource for StaticConfigSource {
    fn load(&self) -> Result<ConfigSnapshot, ConfigError> {
        Ok(self.0.clone())
    }
}

/// A [`ConfigSource`] that reads a TOML file on each call, re-reading the
/// file so an external "notification" can be as simple as a re-invocation
/// of `load`.
pub struct FileConfigSource {
    pub path: std::path::PathBuf,
}

impl ConfigSource for FileConfigSource {
    fn load(&self) -> Result<ConfigSnapshot, ConfigError> {
        load_from_toml_file(&self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::{Outbound, ProviderTarget, ProxyRoute};

    fn route(id: &str, path: &str, enabled: bool) -> ProxyRoute {
        ProxyRoute {
            id: id.to_string(),
            proxy_path: path.to_string(),
            inbound_adapter: "openai".to_string(),
            outbound: Outbound::Provider {
                target: ProviderTarget {
                    base_url: "https://api.openai.com".to_string(),
                    api_key: "k".to_string(),
                    chat_path: "/v1/chat/completions".to_string(),
                },
                adapter: "openai".to_string(),
            },
            model_mappings: vec![],
            enabled,
        }
    }

    #[test]
    fn rejects_duplicate_enabled_proxy_paths() {
        let snapshot = ConfigSnapshot {
            routes: RouteTable { routes: vec![route("a", "shared", true), route("b", "shared", true)] },
            settings: Settings::default(),
        };
        assert!(matches!(validate(&snapshot), Err(ConfigError::DuplicateProxyPath(_))));
    }

    #[test]
    fn allows_duplicate_paths_when_one_is_disabled() {
        let snapshot = ConfigSnapshot {
            routes: RouteTable { routes: vec![route("a", "shared", true), route("b", "shared", false)] },
            settings: Settings::default(),
        };
        assert!(validate(&snapshot).is_ok());
    }

    #[test]
    fn default_settings_bind_to_documented_address() {
        assert_eq!(Settings::default().bind_addr(), "127.0.0.1:9527");
    }
}
