//! ICE server advertisement: a static STUN list plus, optionally, one
//! TURN server with per-connection ephemeral HMAC-SHA1 credentials.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use parley_proto::wire::IceServer;
use sha1::Sha1;

use crate::config::RelayConfig;

type HmacSha1 = Hmac<Sha1>;

/// Build the `iceServers` list for one connection, minting a fresh TURN
/// credential (if a TURN server is configured) that expires `valid_for`
/// from now.
pub fn ice_servers(config: &RelayConfig, valid_for: std::time::Duration) -> Vec<IceServer> {
    let mut servers: Vec<IceServer> = config
        .stun_urls
        .iter()
        .map(|url| IceServer {
            urls: vec![url.clone()],
            username: None,
            credential: None,
        })
        .collect();

    if let (Some(turn_url), Some(secret)) = (&config.turn_url, &config.turn_secret) {
        let expiry = now_unix() + valid_for.as_secs();
        let (username, credential) = turn_credential(secret, expiry);
        servers.push(IceServer {
            urls: vec![turn_url.clone()],
            username: Some(username),
            credential: Some(credential),
        });
    }

    servers
}

/// `username = "<expiry>:wormhole"`, `credential = base64(HMAC-SHA1(secret, username))`.
fn turn_credential(secret: &str, expiry_unix_secs: u64) -> (String, String) {
    let username = format!("{expiry_unix_secs}:wormhole");
    let mut mac = HmacSha1::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(username.as_bytes());
    let credential = STANDARD.encode(mac.finalize().into_bytes());
    (username, credential)
}

fn now_unix() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stun_only_config_yields_no_credentials() {
        let config = RelayConfig {
            stun_urls: vec!["stun:stun.example.org:3478".to_string()],
            ..RelayConfig::default()
        };
        let servers = ice_servers(&config, std::time::Duration::from_secs(1800));
        assert_eq!(servers.len(), 1);
        assert!(servers[0].username.is_none());
    }

    #[test]
    fn turn_credential_username_carries_expiry() {
        let (username, credential) = turn_credential("sharedsecret", 1_700_000_000);
        assert_eq!(username, "1700000000:wormhole");
        assert!(!credential.is_empty());
    }

    #[test]
    fn turn_credential_is_deterministic_for_fixed_inputs() {
        let a = turn_credential("sharedsecret", 42);
        let b = turn_credential("sharedsecret", 42);
        assert_eq!(a, b);
    }

    #[test]
    fn configured_turn_appends_a_credentialed_server() {
        let config = RelayConfig {
            stun_urls: vec!["stun:stun.example.org:3478".to_string()],
            turn_url: Some("turn:turn.example.org:3478".to_string()),
            turn_secret: Some("sharedsecret".to_string()),
            ..RelayConfig::default()
        };
        let servers = ice_servers(&config, std::time::Duration::from_secs(1800));
        assert_eq!(servers.len(), 2);
        let turn = &servers[1];
        assert!(turn.username.is_some());
        assert!(turn.credential.is_some());
    }
}
