use anyhow::{Context, Result};
use url::Url;

/// Runtime configuration, read once at startup. Missing required values
/// abort the boot with a message naming the variable.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Disables rate limiting. Set by giving LOBBY_DEV_MODE any non-empty
    /// value.
    pub dev_mode: bool,
    pub store_url: Url,
    pub store_key: String,
    pub ntfy_guestbook_url: Url,
    pub ntfy_relay_url: Url,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let host = var("LOBBY_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port = match var("LOBBY_PORT") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("LOBBY_PORT is not a valid port: {raw}"))?,
            None => 3000,
        };
        let dev_mode = var("LOBBY_DEV_MODE").is_some_and(|v| !v.is_empty());

        let store_url = required_url(&var, "LOBBY_STORE_URL")?;
        let store_key = var("LOBBY_STORE_KEY").context("env var LOBBY_STORE_KEY is not set")?;
        let ntfy_guestbook_url = required_url(&var, "LOBBY_NTFY_GUESTBOOK_URL")?;
        let ntfy_relay_url = required_url(&var, "LOBBY_NTFY_RELAY_URL")?;

        Ok(Self {
            host,
            port,
            dev_mode,
            store_url,
            store_key,
            ntfy_guestbook_url,
            ntfy_relay_url,
        })
    }
}

fn required_url(var: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Url> {
    let raw = var(key).with_context(|| format!("env var {key} is not set"))?;
    Url::parse(&raw).with_context(|| format!("env var {key} is not a valid URL: {raw}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    fn complete() -> Vec<(&'static str, &'static str)> {
        vec![
            ("LOBBY_STORE_URL", "https://store.example"),
            ("LOBBY_STORE_KEY", "secret"),
            ("LOBBY_NTFY_GUESTBOOK_URL", "https://ntfy.example/guestbook"),
            ("LOBBY_NTFY_RELAY_URL", "https://ntfy.example/relay"),
        ]
    }

    #[test]
    fn defaults_cover_host_port_and_dev_mode() {
        let config = Config::from_lookup(lookup(&complete())).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert!(!config.dev_mode);
    }

    #[test]
    fn missing_store_url_is_fatal_and_named() {
        let mut vars = complete();
        vars.retain(|(k, _)| *k != "LOBBY_STORE_URL");
        let err = Config::from_lookup(lookup(&vars)).unwrap_err();
        assert!(err.to_string().contains("LOBBY_STORE_URL"));
    }

    #[test]
    fn missing_store_key_is_fatal_and_named() {
        let mut vars = complete();
        vars.retain(|(k, _)| *k != "LOBBY_STORE_KEY");
        let err = Config::from_lookup(lookup(&vars)).unwrap_err();
        assert!(err.to_string().contains("LOBBY_STORE_KEY"));
    }

    #[test]
    fn invalid_webhook_url_is_fatal() {
        let mut vars = complete();
        vars.retain(|(k, _)| *k != "LOBBY_NTFY_RELAY_URL");
        vars.push(("LOBBY_NTFY_RELAY_URL", "not a url"));
        let err = Config::from_lookup(lookup(&vars)).unwrap_err();
        assert!(err.to_string().contains("LOBBY_NTFY_RELAY_URL"));
    }

    #[test]
    fn any_nonempty_value_enables_dev_mode() {
        let mut vars = complete();
        vars.push(("LOBBY_DEV_MODE", "1"));
        assert!(Config::from_lookup(lookup(&vars)).unwrap().dev_mode);

        let mut vars = complete();
        vars.push(("LOBBY_DEV_MODE", ""));
        assert!(!Config::from_lookup(lookup(&vars)).unwrap().dev_mode);
    }

    #[test]
    fn unparseable_port_is_fatal() {
        let mut vars = complete();
        vars.push(("LOBBY_PORT", "lots"));
        assert!(Config::from_lookup(lookup(&vars)).is_err());
    }
}
