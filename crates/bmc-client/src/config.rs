//! Connection configuration
//!
//! All four connection parameters are required; a missing one is a fatal
//! startup condition, never a per-reconcile condition. The configuration is
//! read from the environment exactly once and passed by reference from then
//! on.

use crate::error::BmcError;
use std::env;

/// Environment variable holding the OAuth2 client id.
pub const ENV_BMC_CLIENT_ID: &str = "BMC_CLIENT_ID";
/// Environment variable holding the OAuth2 client secret.
pub const ENV_BMC_CLIENT_SECRET: &str = "BMC_CLIENT_SECRET";
/// Environment variable holding the OAuth2 token endpoint URL.
pub const ENV_BMC_TOKEN_URL: &str = "BMC_TOKEN_URL";
/// Environment variable holding the provisioning API base URL.
pub const ENV_BMC_ENDPOINT_URL: &str = "BMC_ENDPOINT_URL";

/// Connection parameters for the BMC provisioning API.
#[derive(Debug, Clone)]
pub struct BmcConfig {
    /// OAuth2 client id for the client-credentials exchange.
    pub client_id: String,
    /// OAuth2 client secret.
    pub client_secret: String,
    /// Token endpoint URL.
    pub token_url: String,
    /// Provisioning API base URL.
    pub endpoint_url: String,
}

impl BmcConfig {
    /// Builds the configuration from the `BMC_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`BmcError::Configuration`] naming every missing variable, so
    /// an operator can fix the deployment in one pass.
    pub fn from_env() -> Result<Self, BmcError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup. Empty
    /// values count as missing.
    ///
    /// # Errors
    ///
    /// Returns [`BmcError::Configuration`] naming every missing variable.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, BmcError> {
        let mut missing = Vec::new();
        let mut read = |name: &'static str| match lookup(name) {
            Some(value) if !value.is_empty() => Some(value),
            _ => {
                missing.push(name);
                None
            }
        };

        let client_id = read(ENV_BMC_CLIENT_ID);
        let client_secret = read(ENV_BMC_CLIENT_SECRET);
        let token_url = read(ENV_BMC_TOKEN_URL);
        let endpoint_url = read(ENV_BMC_ENDPOINT_URL);

        if !missing.is_empty() {
            return Err(BmcError::Configuration(format!(
                "incomplete BMC connection configuration, missing: {}",
                missing.join(", ")
            )));
        }

        // The values are all Some when nothing is missing.
        Ok(Self {
            client_id: client_id.unwrap_or_default(),
            client_secret: client_secret.unwrap_or_default(),
            token_url: token_url.unwrap_or_default(),
            endpoint_url: endpoint_url.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(entries: &[(&str, &str)]) -> HashMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    fn full_set() -> HashMap<String, String> {
        vars(&[
            (ENV_BMC_CLIENT_ID, "client"),
            (ENV_BMC_CLIENT_SECRET, "secret"),
            (ENV_BMC_TOKEN_URL, "https://auth.example/token"),
            (ENV_BMC_ENDPOINT_URL, "https://api.example/bmc/v1"),
        ])
    }

    #[test]
    fn complete_configuration_loads() {
        let env = full_set();
        let config = BmcConfig::from_lookup(|name| env.get(name).cloned()).unwrap();
        assert_eq!(config.client_id, "client");
        assert_eq!(config.client_secret, "secret");
        assert_eq!(config.token_url, "https://auth.example/token");
        assert_eq!(config.endpoint_url, "https://api.example/bmc/v1");
    }

    #[test]
    fn one_missing_variable_is_fatal_and_named() {
        let mut env = full_set();
        env.remove(ENV_BMC_CLIENT_SECRET);
        let err = BmcConfig::from_lookup(|name| env.get(name).cloned()).unwrap_err();
        let BmcError::Configuration(message) = err else {
            panic!("expected a configuration error");
        };
        assert!(message.contains(ENV_BMC_CLIENT_SECRET));
        assert!(!message.contains(ENV_BMC_CLIENT_ID));
    }

    #[test]
    fn every_absent_variable_is_listed() {
        let err = BmcConfig::from_lookup(|_| None).unwrap_err();
        let BmcError::Configuration(message) = err else {
            panic!("expected a configuration error");
        };
        for name in [
            ENV_BMC_CLIENT_ID,
            ENV_BMC_CLIENT_SECRET,
            ENV_BMC_TOKEN_URL,
            ENV_BMC_ENDPOINT_URL,
        ] {
            assert!(message.contains(name), "{name} should be reported");
        }
    }

    #[test]
    fn empty_value_counts_as_missing() {
        let mut env = full_set();
        env.insert(ENV_BMC_ENDPOINT_URL.to_owned(), String::new());
        let err = BmcConfig::from_lookup(|name| env.get(name).cloned()).unwrap_err();
        let BmcError::Configuration(message) = err else {
            panic!("expected a configuration error");
        };
        assert!(message.contains(ENV_BMC_ENDPOINT_URL));
    }
}
