/*
 * Responsibility
 * - 設定の読み込み (環境変数 → `.cfg` の KEY=VALUE フォールバック)
 * - 設定値のバリデーション (proof 関連の必須値が無ければ起動失敗)
 */
use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, warn};

use crate::services::token::{DEFAULT_TTL_SECONDS, MAX_TTL_SECONDS};

pub const DEFAULT_CONFIG_FILE: &str = ".cfg";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    fn parse(value: Option<&str>) -> Self {
        match value
            .unwrap_or("development")
            .to_ascii_lowercase()
            .as_str()
        {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "missing configuration: {}", key),
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Where the issuer's public key material comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssuerKeySource {
    /// PEM written by the key conversion collaborator.
    Pem(PathBuf),
    /// Cached JWKS document.
    Jwks(PathBuf),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub app_env: AppEnv,

    pub proof_len: usize,
    pub mint_zkp: bool,
    pub proof_deadline: Duration,

    pub issuer_keys: IssuerKeySource,
    pub issuer_strict: bool,

    pub workload_id: String,
    pub workload_key_path: PathBuf,
    pub dasvid_ttl_seconds: i64,

    // Identity bootstrap is handled outside this process.
    pub socket_path: Option<String>,
}

impl Config {
    /// Environment first, then the fallback file (`DASVID_CONFIG_FILE`, default `.cfg`).
    ///
    /// The process environment is not modified.
    pub fn from_env() -> Result<Self, ConfigError> {
        let path = std::env::var("DASVID_CONFIG_FILE")
            .unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        let fallback = load_fallback(Path::new(&path));

        Self::from_lookup(|key| std::env::var(key).ok().or_else(|| fallback.get(key).cloned()))
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let port: u16 = get("PORT")
            .and_then(|s| s.parse().ok())
            .unwrap_or(8443);
        let addr = SocketAddr::from(([0, 0, 0, 0], port));

        let app_env = AppEnv::parse(get("APP_ENV").as_deref());

        let proof_len = get("PROOF_LEN")
            .ok_or(ConfigError::Missing("PROOF_LEN"))?
            .parse::<usize>()
            .ok()
            .filter(|n| *n >= 1)
            .ok_or(ConfigError::Invalid("PROOF_LEN"))?;

        let mint_zkp = match get("MINT_ZKP") {
            Some(v) => parse_bool(&v).ok_or(ConfigError::Invalid("MINT_ZKP"))?,
            None => {
                warn!("MINT_ZKP not set, minting DA-SVIDs without proofs");
                false
            }
        };

        let proof_deadline = match get("PROOF_DEADLINE_MS") {
            Some(v) => v
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|_| ConfigError::Invalid("PROOF_DEADLINE_MS"))?,
            None => Duration::from_millis(10_000),
        };

        let issuer_keys = match (get("PEM_PATH"), get("JWKS_PATH")) {
            (Some(pem), jwks) => {
                if jwks.is_some() {
                    warn!("both PEM_PATH and JWKS_PATH set, using PEM_PATH");
                }
                IssuerKeySource::Pem(PathBuf::from(pem))
            }
            (None, Some(jwks)) => IssuerKeySource::Jwks(PathBuf::from(jwks)),
            (None, None) => return Err(ConfigError::Missing("PEM_PATH")),
        };

        let issuer_strict = match get("ISSUER_STRICT") {
            Some(v) => parse_bool(&v).ok_or(ConfigError::Invalid("ISSUER_STRICT"))?,
            None => false,
        };

        let workload_id = get("WORKLOAD_ID").ok_or(ConfigError::Missing("WORKLOAD_ID"))?;
        let workload_key_path = get("WORKLOAD_KEY_PATH")
            .map(PathBuf::from)
            .ok_or(ConfigError::Missing("WORKLOAD_KEY_PATH"))?;

        let dasvid_ttl_seconds = match get("DASVID_TTL_SECONDS") {
            Some(v) => v
                .parse::<i64>()
                .ok()
                .filter(|n| (1..=MAX_TTL_SECONDS).contains(n))
                .ok_or(ConfigError::Invalid("DASVID_TTL_SECONDS"))?,
            None => DEFAULT_TTL_SECONDS,
        };

        let socket_path = get("SOCKET_PATH");
        if socket_path.is_none() {
            warn!("SOCKET_PATH not set, workload identity must be provisioned externally");
        }

        Ok(Self {
            addr,
            app_env,
            proof_len,
            mint_zkp,
            proof_deadline,
            issuer_keys,
            issuer_strict,
            workload_id,
            workload_key_path,
            dasvid_ttl_seconds,
            socket_path,
        })
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn load_fallback(path: &Path) -> HashMap<String, String> {
    match dotenvy::from_filename_iter(path) {
        Ok(iter) => iter
            .filter_map(|item| {
                item.inspect_err(|e| warn!(error = %e, "skipping unreadable config line"))
                    .ok()
            })
            .collect(),
        Err(_) => {
            debug!(path = %path.display(), "no fallback config file");
            HashMap::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const BASE: &[(&str, &str)] = &[
        ("PROOF_LEN", "16"),
        ("PEM_PATH", "/run/dasvid/issuer.pem"),
        ("WORKLOAD_ID", "spiffe://example.org/asserting-wl"),
        ("WORKLOAD_KEY_PATH", "/run/dasvid/workload.pem"),
    ];

    fn with(extra: &[(&'static str, &'static str)]) -> Vec<(&'static str, &'static str)> {
        let mut pairs = BASE.to_vec();
        pairs.retain(|(k, _)| !extra.iter().any(|(e, _)| e == k));
        pairs.extend_from_slice(extra);
        pairs
    }

    #[test]
    fn defaults_apply_to_optional_keys() {
        let config = Config::from_lookup(lookup(BASE)).expect("config");
        assert_eq!(config.proof_len, 16);
        assert!(!config.mint_zkp);
        assert!(!config.issuer_strict);
        assert_eq!(config.dasvid_ttl_seconds, 120);
        assert_eq!(config.addr.port(), 8443);
        assert_eq!(config.proof_deadline, Duration::from_secs(10));
        assert_eq!(config.app_env, AppEnv::Development);
        assert_eq!(
            config.issuer_keys,
            IssuerKeySource::Pem(PathBuf::from("/run/dasvid/issuer.pem"))
        );
        assert!(config.socket_path.is_none());
    }

    #[test]
    fn proof_len_is_required_and_positive() {
        let missing: Vec<_> = BASE.iter().copied().filter(|(k, _)| *k != "PROOF_LEN").collect();
        assert_eq!(
            Config::from_lookup(lookup(&missing)).err(),
            Some(ConfigError::Missing("PROOF_LEN"))
        );
        for bad in ["0", "-1", "many"] {
            assert_eq!(
                Config::from_lookup(lookup(&with(&[("PROOF_LEN", bad)]))).err(),
                Some(ConfigError::Invalid("PROOF_LEN"))
            );
        }
    }

    #[test]
    fn issuer_key_source_is_required() {
        let without: Vec<_> = BASE.iter().copied().filter(|(k, _)| *k != "PEM_PATH").collect();
        assert_eq!(
            Config::from_lookup(lookup(&without)).err(),
            Some(ConfigError::Missing("PEM_PATH"))
        );

        let mut jwks = without.clone();
        jwks.push(("JWKS_PATH", "/var/cache/dasvid/jwks.json"));
        let config = Config::from_lookup(lookup(&jwks)).expect("config");
        assert_eq!(
            config.issuer_keys,
            IssuerKeySource::Jwks(PathBuf::from("/var/cache/dasvid/jwks.json"))
        );
    }

    #[test]
    fn toggles_and_overrides() {
        let config = Config::from_lookup(lookup(&with(&[
            ("MINT_ZKP", "true"),
            ("ISSUER_STRICT", "1"),
            ("DASVID_TTL_SECONDS", "30"),
            ("PORT", "9000"),
            ("APP_ENV", "production"),
            ("SOCKET_PATH", "unix:///tmp/spire-agent/public/api.sock"),
            ("PROOF_DEADLINE_MS", "250"),
        ])))
        .expect("config");
        assert!(config.mint_zkp);
        assert!(config.issuer_strict);
        assert_eq!(config.dasvid_ttl_seconds, 30);
        assert_eq!(config.addr.port(), 9000);
        assert!(config.app_env.is_production());
        assert!(config.socket_path.is_some());
        assert_eq!(config.proof_deadline, Duration::from_millis(250));

        assert_eq!(
            Config::from_lookup(lookup(&with(&[("MINT_ZKP", "maybe")]))).err(),
            Some(ConfigError::Invalid("MINT_ZKP"))
        );
    }

    #[test]
    fn ttl_must_fit_within_a_day() {
        for ttl in ["0", "-5", "86401", "10000000000000000", "soon"] {
            assert_eq!(
                Config::from_lookup(lookup(&with(&[("DASVID_TTL_SECONDS", ttl)]))).err(),
                Some(ConfigError::Invalid("DASVID_TTL_SECONDS")),
                "{ttl}"
            );
        }
        let config = Config::from_lookup(lookup(&with(&[("DASVID_TTL_SECONDS", "86400")])))
            .expect("config");
        assert_eq!(config.dasvid_ttl_seconds, 86_400);
    }

    #[test]
    fn blank_values_count_as_missing() {
        assert_eq!(
            Config::from_lookup(lookup(&with(&[("WORKLOAD_ID", "  ")]))).err(),
            Some(ConfigError::Missing("WORKLOAD_ID"))
        );
    }
}
