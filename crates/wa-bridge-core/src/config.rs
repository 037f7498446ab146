use std::{env, fs, path::Path, time::Duration};

use url::Url;

use crate::{errors::Error, security::AllowList, Result};

pub const DEFAULT_RELAY_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_RELAY_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_SIDECAR_URL: &str = "ws://127.0.0.1:8787";
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_ACK_MESSAGE: &str = "Processing your message...";

/// Typed configuration for the bridge.
#[derive(Clone, Debug)]
pub struct Config {
    // Relay
    pub relay_base_url: Url,
    pub relay_timeout: Duration,

    // Authorization
    pub allowed_senders: AllowList,
    pub ack_message: String,

    // WhatsApp sidecar
    pub sidecar_url: Url,
    pub print_qr: bool,
    pub send_timeout: Duration,
}

impl Config {
    /// Read the process environment. Call [`load_dotenv`] first, before any
    /// threads are spawned, to pick up a local `.env` file.
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. `load` uses the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let relay_base_url = parse_url(
            "AI_RESUMER_BASE_URL",
            lookup("AI_RESUMER_BASE_URL").and_then(non_empty),
            DEFAULT_RELAY_BASE_URL,
        )?;
        let relay_timeout =
            parse_millis(lookup("RELAY_TIMEOUT_MS")).unwrap_or(DEFAULT_RELAY_TIMEOUT);

        let allowed_senders = AllowList::new(parse_csv(lookup("ALLOWED_SENDERS")));
        let ack_message = lookup("ACK_MESSAGE")
            .and_then(non_empty)
            .unwrap_or_else(|| DEFAULT_ACK_MESSAGE.to_string());

        let sidecar_url = parse_url(
            "WHATSAPP_SIDECAR_URL",
            lookup("WHATSAPP_SIDECAR_URL").and_then(non_empty),
            DEFAULT_SIDECAR_URL,
        )?;
        if sidecar_url.scheme() != "ws" {
            return Err(Error::Config(format!(
                "WHATSAPP_SIDECAR_URL must be a ws:// URL, got {sidecar_url}"
            )));
        }
        let print_qr = lookup("WHATSAPP_PRINT_QR")
            .map(|s| parse_bool(&s))
            .unwrap_or(true);
        let send_timeout =
            parse_millis(lookup("WHATSAPP_SEND_TIMEOUT_MS")).unwrap_or(DEFAULT_SEND_TIMEOUT);

        Ok(Self {
            relay_base_url,
            relay_timeout,
            allowed_senders,
            ack_message,
            sidecar_url,
            print_qr,
            send_timeout,
        })
    }
}

/// Load `.env` from the working directory into the process environment.
/// Existing variables win. Must run before the async runtime starts.
pub fn load_dotenv() {
    load_dotenv_if_present(Path::new(".env"));
}

fn parse_url(key: &str, value: Option<String>, default: &str) -> Result<Url> {
    let raw = value.unwrap_or_else(|| default.to_string());
    Url::parse(raw.trim()).map_err(|e| Error::Config(format!("{key} is not a valid URL: {e}")))
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for (key, val) in parse_dotenv(&contents) {
        if env::var_os(&key).is_some() {
            continue; // do not override existing env
        }
        env::set_var(key, val);
    }
}

fn parse_dotenv(contents: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        out.push((key.to_string(), val));
    }
    out
}

/// Positive millisecond count; anything else is treated as unset.
fn parse_millis(v: Option<String>) -> Option<Duration> {
    v.and_then(|s| s.trim().parse::<u64>().ok())
        .filter(|ms| *ms > 0)
        .map(Duration::from_millis)
}

fn parse_bool(s: &str) -> bool {
    matches!(
        s.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn parse_csv(v: Option<String>) -> Vec<String> {
    v.unwrap_or_default()
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SenderId;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k: &str| map.get(k).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let cfg = Config::from_lookup(|_| None).unwrap();
        assert_eq!(cfg.relay_base_url.as_str(), "http://localhost:8000/");
        assert_eq!(cfg.relay_timeout, Duration::from_secs(10));
        assert!(cfg.allowed_senders.is_empty());
        assert_eq!(cfg.ack_message, DEFAULT_ACK_MESSAGE);
        assert_eq!(cfg.sidecar_url.as_str(), "ws://127.0.0.1:8787/");
        assert!(cfg.print_qr);
        assert_eq!(cfg.send_timeout, DEFAULT_SEND_TIMEOUT);
    }

    #[test]
    fn blank_base_url_falls_back_to_default() {
        let cfg = Config::from_lookup(lookup_from(&[("AI_RESUMER_BASE_URL", "  ")])).unwrap();
        assert_eq!(cfg.relay_base_url.as_str(), "http://localhost:8000/");
    }

    #[test]
    fn reads_overrides() {
        let cfg = Config::from_lookup(lookup_from(&[
            ("AI_RESUMER_BASE_URL", "https://relay.example.com/api"),
            ("RELAY_TIMEOUT_MS", "2500"),
            ("ALLOWED_SENDERS", " 551100@c.us, ,551200@c.us "),
            ("ACK_MESSAGE", "Processando..."),
            ("WHATSAPP_SIDECAR_URL", "ws://sidecar.local:9000"),
            ("WHATSAPP_PRINT_QR", "off"),
            ("WHATSAPP_SEND_TIMEOUT_MS", "1500"),
        ]))
        .unwrap();

        assert_eq!(cfg.relay_base_url.as_str(), "https://relay.example.com/api");
        assert_eq!(cfg.relay_timeout, Duration::from_millis(2500));
        assert_eq!(cfg.allowed_senders.len(), 2);
        assert!(cfg
            .allowed_senders
            .is_authorized(&SenderId("551200@c.us".to_string())));
        assert_eq!(cfg.ack_message, "Processando...");
        assert_eq!(cfg.sidecar_url.port(), Some(9000));
        assert!(!cfg.print_qr);
        assert_eq!(cfg.send_timeout, Duration::from_millis(1500));
    }

    #[test]
    fn invalid_timeout_uses_default() {
        for bad in ["", "abc", "0", "-5"] {
            let cfg = Config::from_lookup(lookup_from(&[
                ("RELAY_TIMEOUT_MS", bad),
                ("WHATSAPP_SEND_TIMEOUT_MS", bad),
            ]))
            .unwrap();
            assert_eq!(cfg.relay_timeout, DEFAULT_RELAY_TIMEOUT, "input {bad:?}");
            assert_eq!(cfg.send_timeout, DEFAULT_SEND_TIMEOUT, "input {bad:?}");
        }
    }

    #[test]
    fn rejects_malformed_urls() {
        let err = Config::from_lookup(lookup_from(&[("AI_RESUMER_BASE_URL", "not a url")]))
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let err = Config::from_lookup(lookup_from(&[(
            "WHATSAPP_SIDECAR_URL",
            "http://127.0.0.1:8787",
        )]))
        .unwrap_err();
        assert!(err.to_string().contains("ws://"));
    }

    #[test]
    fn dotenv_parsing_skips_comments_and_strips_quotes() {
        let parsed = parse_dotenv(
            "# comment\n\nAI_RESUMER_BASE_URL=\"http://x:1\"\nACK_MESSAGE='wait'\nnoequals\n=novalue\n",
        );
        assert_eq!(
            parsed,
            vec![
                ("AI_RESUMER_BASE_URL".to_string(), "http://x:1".to_string()),
                ("ACK_MESSAGE".to_string(), "wait".to_string()),
            ]
        );
    }

    #[test]
    fn dotenv_file_fills_unset_vars_only() {
        let dir = env::temp_dir().join(format!("wa-bridge-dotenv-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(".env");
        fs::write(
            &path,
            "WA_BRIDGE_TEST_DOTENV_NEW=from-file\nWA_BRIDGE_TEST_DOTENV_SET=from-file\n",
        )
        .unwrap();
        env::set_var("WA_BRIDGE_TEST_DOTENV_SET", "from-env");

        load_dotenv_if_present(&path);

        assert_eq!(env::var("WA_BRIDGE_TEST_DOTENV_NEW").unwrap(), "from-file");
        assert_eq!(env::var("WA_BRIDGE_TEST_DOTENV_SET").unwrap(), "from-env");
        let _ = fs::remove_dir_all(&dir);
    }
}
