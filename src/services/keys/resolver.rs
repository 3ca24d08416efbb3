//! Issuer resolution: issuer identifier -> key set endpoint.
//!
//! Pure table lookup, no network access. New providers are new table entries.

use tracing::{info, warn};

use super::KeyError;

pub const GOOGLE_ISSUER: &str = "accounts.google.com";
pub const GOOGLE_CERTS_URI: &str = "https://www.googleapis.com/oauth2/v3/certs";
pub const OKTA_KEYS_SUFFIX: &str = "/v1/keys";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IssuerRule {
    /// Issuer string matched exactly, endpoint fixed.
    Exact { issuer: String, endpoint: String },
    /// Endpoint is the issuer with `suffix` appended. Matches any issuer.
    Suffix { suffix: String },
}

impl IssuerRule {
    pub fn exact(issuer: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self::Exact {
            issuer: issuer.into(),
            endpoint: endpoint.into(),
        }
    }

    fn apply(&self, issuer: &str) -> Option<String> {
        match self {
            Self::Exact {
                issuer: known,
                endpoint,
            } => (known == issuer).then(|| endpoint.clone()),
            Self::Suffix { suffix } => Some(format!("{}{}", issuer.trim_end_matches('/'), suffix)),
        }
    }
}

#[derive(Clone, Debug)]
pub struct IssuerResolver {
    rules: Vec<IssuerRule>,
}

impl IssuerResolver {
    pub fn new(rules: Vec<IssuerRule>) -> Self {
        let mut resolver = Self { rules: Vec::new() };
        for rule in rules {
            resolver = resolver.with_rule(rule);
        }
        resolver
    }

    /// Google by exact match; every other issuer is treated as Okta.
    pub fn well_known() -> Self {
        Self::strict().with_rule(IssuerRule::Suffix {
            suffix: OKTA_KEYS_SUFFIX.to_string(),
        })
    }

    /// Exact entries only; unknown issuers are rejected.
    pub fn strict() -> Self {
        Self::new(vec![
            IssuerRule::exact(GOOGLE_ISSUER, GOOGLE_CERTS_URI),
            IssuerRule::exact(format!("https://{GOOGLE_ISSUER}"), GOOGLE_CERTS_URI),
        ])
    }

    pub fn from_policy(strict: bool) -> Self {
        if strict {
            Self::strict()
        } else {
            Self::well_known()
        }
    }

    /// Add a rule. Exact rules always take precedence over suffix rules.
    pub fn with_rule(mut self, rule: IssuerRule) -> Self {
        match rule {
            IssuerRule::Exact { .. } => {
                let at = self
                    .rules
                    .iter()
                    .position(|r| matches!(r, IssuerRule::Suffix { .. }))
                    .unwrap_or(self.rules.len());
                self.rules.insert(at, rule);
            }
            IssuerRule::Suffix { .. } => self.rules.push(rule),
        }
        self
    }

    pub fn rules(&self) -> &[IssuerRule] {
        &self.rules
    }

    pub fn resolve(&self, issuer: &str) -> Result<String, KeyError> {
        let issuer = issuer.trim();
        if issuer.is_empty() {
            return Err(KeyError::UnknownIssuer(String::new()));
        }

        let (rule, endpoint) = self
            .rules
            .iter()
            .find_map(|rule| rule.apply(issuer).map(|endpoint| (rule, endpoint)))
            .ok_or_else(|| KeyError::UnknownIssuer(issuer.to_string()))?;

        if matches!(rule, IssuerRule::Suffix { .. }) {
            // Trust boundary: this issuer is not in the table.
            warn!(issuer, endpoint = %endpoint, "issuer matched by fallback rule only");
        } else {
            info!(issuer, endpoint = %endpoint, "issuer resolved");
        }
        Ok(endpoint)
    }
}

impl Default for IssuerResolver {
    fn default() -> Self {
        Self::well_known()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn google_maps_to_fixed_certs_uri() {
        let resolver = IssuerResolver::well_known();
        assert_eq!(
            resolver.resolve("accounts.google.com").expect("google"),
            "https://www.googleapis.com/oauth2/v3/certs"
        );
        assert_eq!(
            resolver
                .resolve("https://accounts.google.com")
                .expect("google"),
            GOOGLE_CERTS_URI
        );
    }

    #[test]
    fn other_issuers_follow_okta_convention() {
        let resolver = IssuerResolver::well_known();
        assert_eq!(
            resolver.resolve("https://example.okta.com").expect("okta"),
            "https://example.okta.com/v1/keys"
        );
        assert_eq!(
            resolver
                .resolve("https://example.okta.com/oauth2/default/")
                .expect("okta"),
            "https://example.okta.com/oauth2/default/v1/keys"
        );
    }

    #[test]
    fn strict_mode_rejects_unknown_issuers() {
        let resolver = IssuerResolver::strict();
        assert!(matches!(
            resolver.resolve("https://example.okta.com"),
            Err(KeyError::UnknownIssuer(_))
        ));
        assert!(resolver.resolve(GOOGLE_ISSUER).is_ok());
    }

    #[test]
    fn empty_issuer_is_unknown() {
        assert!(matches!(
            IssuerResolver::well_known().resolve("  "),
            Err(KeyError::UnknownIssuer(_))
        ));
    }

    #[test]
    fn exact_entries_win_over_the_fallback() {
        let resolver = IssuerResolver::well_known().with_rule(IssuerRule::exact(
            "https://login.example.com",
            "https://login.example.com/.well-known/jwks.json",
        ));
        assert!(matches!(
            resolver.rules().last(),
            Some(IssuerRule::Suffix { .. })
        ));
        assert_eq!(
            resolver.resolve("https://login.example.com").expect("exact"),
            "https://login.example.com/.well-known/jwks.json"
        );
    }
}
