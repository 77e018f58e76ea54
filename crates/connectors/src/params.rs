//! Typed access to a connector's `params` map

use std::collections::HashMap;
use std::time::Duration;

use contracts::{ChannelKind, ContractError};
use reqwest::Url;

/// Default HTTP request timeout for connectors
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Borrowed view over connector params, reporting errors against the channel
pub(crate) struct Params<'a> {
    kind: ChannelKind,
    map: &'a HashMap<String, String>,
}

impl<'a> Params<'a> {
    pub(crate) fn new(kind: ChannelKind, map: &'a HashMap<String, String>) -> Self {
        Self { kind, map }
    }

    /// Non-blank value or None
    pub(crate) fn optional(&self, key: &str) -> Option<&'a str> {
        self.map
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub(crate) fn required(&self, key: &str) -> Result<&'a str, ContractError> {
        self.optional(key)
            .ok_or_else(|| self.error(format!("missing '{key}' parameter")))
    }

    /// Secret given inline as `key` or by environment variable name as `key_env`
    pub(crate) fn optional_secret(&self, key: &str) -> Result<Option<String>, ContractError> {
        if let Some(value) = self.optional(key) {
            return Ok(Some(value.to_string()));
        }
        let env_key = format!("{key}_env");
        match self.optional(&env_key) {
            Some(var) => std::env::var(var)
                .map(Some)
                .map_err(|_| self.error(format!("environment variable '{var}' ({env_key}) is not set"))),
            None => Ok(None),
        }
    }

    pub(crate) fn secret(&self, key: &str) -> Result<String, ContractError> {
        self.optional_secret(key)?
            .ok_or_else(|| self.error(format!("missing '{key}' or '{key}_env' parameter")))
    }

    /// Absolute http(s) URL without a trailing slash
    pub(crate) fn url(&self, key: &str) -> Result<String, ContractError> {
        let raw = self.required(key)?;
        let parsed = Url::parse(raw).map_err(|e| self.error(format!("invalid '{key}' url '{raw}': {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(self.error(format!("'{key}' must be an http(s) url, got '{raw}'")));
        }
        Ok(raw.trim_end_matches('/').to_string())
    }

    /// Comma-separated list, blanks dropped
    pub(crate) fn list(&self, key: &str) -> Vec<String> {
        self.optional(key)
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// `request_timeout_ms`, defaulting to [`DEFAULT_REQUEST_TIMEOUT`]
    pub(crate) fn request_timeout(&self) -> Result<Duration, ContractError> {
        match self.optional("request_timeout_ms") {
            Some(raw) => raw
                .parse::<u64>()
                .ok()
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis)
                .ok_or_else(|| self.error(format!("invalid request_timeout_ms '{raw}'"))),
            None => Ok(DEFAULT_REQUEST_TIMEOUT),
        }
    }

    fn error(&self, message: String) -> ContractError {
        ContractError::connector_config(self.kind, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_required_and_blank() {
        let m = map(&[("a", "x"), ("b", "  ")]);
        let p = Params::new(ChannelKind::Webhook, &m);
        assert_eq!(p.required("a").unwrap(), "x");
        assert!(p.required("b").is_err());
        assert!(p.required("c").is_err());
    }

    #[test]
    fn test_secret_from_env() {
        std::env::set_var("CONNECTORS_PARAMS_TEST_TOKEN", "s3cr3t");
        let m = map(&[("token_env", "CONNECTORS_PARAMS_TEST_TOKEN")]);
        let p = Params::new(ChannelKind::ChatBroadcast, &m);
        assert_eq!(p.secret("token").unwrap(), "s3cr3t");
    }

    #[test]
    fn test_secret_env_missing() {
        let m = map(&[("token_env", "CONNECTORS_PARAMS_TEST_UNSET_VAR")]);
        let p = Params::new(ChannelKind::ChatBroadcast, &m);
        let err = p.secret("token").unwrap_err();
        assert!(err.to_string().contains("CONNECTORS_PARAMS_TEST_UNSET_VAR"));
    }

    #[test]
    fn test_url_validation() {
        let m = map(&[("ok", "https://api.example.com/"), ("bad", "ftp://x"), ("junk", "not a url")]);
        let p = Params::new(ChannelKind::IssueTracker, &m);
        assert_eq!(p.url("ok").unwrap(), "https://api.example.com");
        assert!(p.url("bad").is_err());
        assert!(p.url("junk").is_err());
    }

    #[test]
    fn test_list_and_timeout() {
        let m = map(&[("ids", "a, b,,c "), ("request_timeout_ms", "250")]);
        let p = Params::new(ChannelKind::SocialQueue, &m);
        assert_eq!(p.list("ids"), vec!["a", "b", "c"]);
        assert_eq!(p.request_timeout().unwrap(), Duration::from_millis(250));
    }
}
