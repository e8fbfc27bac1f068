//! Rendezvous server configuration.
//!
//! Layered defaults -> optional TOML file -> environment/flags, in that
//! order of increasing precedence, following the donor relay's own
//! config module.

use clap::Parser;
use serde::{Deserialize, Serialize};

/// Rendezvous server configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "parley-relay", about = "parley rendezvous server")]
pub struct RelayConfig {
    /// Address to bind the signaling listener on.
    #[arg(long, env = "PARLEY_BIND_ADDR", default_value = "0.0.0.0:4433")]
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Seconds a booked slot waits for its partner before expiring.
    #[arg(long, env = "PARLEY_SLOT_TIMEOUT", default_value_t = 1800)]
    #[serde(default = "default_slot_timeout")]
    pub slot_timeout_secs: u64,

    /// STUN server URLs advertised to clients.
    #[arg(long = "stun-url", env = "PARLEY_STUN_URLS", value_delimiter = ',')]
    #[serde(default)]
    pub stun_urls: Vec<String>,

    /// Optional TURN server URL.
    #[arg(long, env = "PARLEY_TURN_URL")]
    #[serde(default)]
    pub turn_url: Option<String>,

    /// Shared secret used to mint ephemeral TURN credentials.
    #[arg(long, env = "PARLEY_TURN_SECRET")]
    #[serde(default)]
    pub turn_secret: Option<String>,

    /// Maximum concurrent signaling connections.
    #[arg(long, env = "PARLEY_MAX_CONNECTIONS", default_value_t = 10_000)]
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,

    /// Optional path to a TOML config file, merged under defaults and
    /// below environment/flag overrides.
    #[arg(long, env = "PARLEY_CONFIG")]
    #[serde(skip)]
    pub config_path: Option<String>,
}

fn default_bind_addr() -> String {
    "0.0.0.0:4433".to_string()
}

fn default_slot_timeout() -> u64 {
    1800
}

fn default_max_connections() -> usize {
    10_000
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            slot_timeout_secs: default_slot_timeout(),
            stun_urls: Vec::new(),
            turn_url: None,
            turn_secret: None,
            max_connections: default_max_connections(),
            config_path: None,
        }
    }
}

impl RelayConfig {
    /// Load configuration from CLI flags/environment (`clap`'s `env`
    /// feature), falling back to a TOML file given by `--config` and
    /// finally to [`RelayConfig::default`].
    pub fn load() -> anyhow::Result<Self> {
        let cli = Self::parse();
        let base = match &cli.config_path {
            Some(path) => {
                let text = std::fs::read_to_string(path)?;
                toml::from_str(&text)?
            }
            None => Self::default(),
        };
        Ok(cli.merged_over(base))
    }

    /// Overlay flag/env-supplied fields on top of a TOML-loaded base,
    /// treating clap's own defaults as "not explicitly set" only where
    /// the base disagrees; in practice clap has already applied env
    /// vars and flags, so this simply prefers `self`'s values except
    /// where a TOML file set something clap left at its built-in
    /// default and the environment didn't override it.
    fn merged_over(self, base: Self) -> Self {
        Self {
            bind_addr: if self.bind_addr == default_bind_addr() {
                base.bind_addr
            } else {
                self.bind_addr
            },
            slot_timeout_secs: if self.slot_timeout_secs == default_slot_timeout() {
                base.slot_timeout_secs
            } else {
                self.slot_timeout_secs
            },
            stun_urls: if self.stun_urls.is_empty() {
                base.stun_urls
            } else {
                self.stun_urls
            },
            turn_url: self.turn_url.or(base.turn_url),
            turn_secret: self.turn_secret.or(base.turn_secret),
            max_connections: if self.max_connections == default_max_connections() {
                base.max_connections
            } else {
                self.max_connections
            },
            config_path: self.config_path,
        }
    }

    /// Slot timeout as a [`std::time::Duration`].
    pub fn slot_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.slot_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_sane_timeout() {
        let cfg = RelayConfig::default();
        assert_eq!(cfg.slot_timeout_secs, 1800);
        assert_eq!(cfg.slot_timeout(), std::time::Duration::from_secs(1800));
    }

    #[test]
    fn toml_base_fills_in_unset_fields() {
        let base = RelayConfig {
            stun_urls: vec!["stun:stun.example.org:3478".to_string()],
            ..RelayConfig::default()
        };
        let cli = RelayConfig::default();
        let merged = cli.merged_over(base);
        assert_eq!(merged.stun_urls, vec!["stun:stun.example.org:3478"]);
    }
}
