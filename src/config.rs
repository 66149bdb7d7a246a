use std::time::Duration;

use anyhow::Context;
use clap::ValueEnum;

use crate::squadcast::client::DEFAULT_BASE_URL;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(15 * 60);
pub const DEFAULT_FUTURE_WINDOW: Duration = Duration::from_secs(72 * 3600);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Which Squadcast API shape to enumerate schedules with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ApiShape {
    /// `/v3/schedules` plus per-schedule on-call and events.
    #[value(name = "v3")]
    Flat,
    /// `/v3/teams`, GraphQL schedules per team, `/v4/schedules/who-is-oncall`.
    Teams,
}

#[derive(Clone)]
pub struct Config {
    pub base_url: String,
    /// Long-lived secret exchanged for access tokens. Only the token manager sees it.
    pub refresh_token: String,
    pub api_shape: ApiShape,
    pub port: u16,
    /// How often to check.
    pub interval: Duration,
    /// How far ahead someone must be on call.
    pub future_window: Duration,
    /// Upper bound on each call to Squadcast.
    pub request_timeout: Duration,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("base_url", &self.base_url)
            .field("refresh_token", &"<redacted>")
            .field("api_shape", &self.api_shape)
            .field("port", &self.port)
            .field("interval", &self.interval)
            .field("future_window", &self.future_window)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

/// Command-line values that take precedence over the environment.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub base_url: Option<String>,
    pub api_shape: Option<ApiShape>,
    pub port: Option<u16>,
    pub interval: Option<Duration>,
    pub future_window: Option<Duration>,
    pub request_timeout: Option<Duration>,
}

impl Config {
    pub fn apply(mut self, overrides: &Overrides) -> Self {
        if let Some(url) = &overrides.base_url {
            self.base_url = url.clone();
        }
        if let Some(shape) = overrides.api_shape {
            self.api_shape = shape;
        }
        if let Some(port) = overrides.port {
            self.port = port;
        }
        if let Some(interval) = overrides.interval {
            self.interval = interval;
        }
        if let Some(window) = overrides.future_window {
            self.future_window = window;
        }
        if let Some(timeout) = overrides.request_timeout {
            self.request_timeout = timeout;
        }
        self
    }

    /// Build from an arbitrary variable lookup.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let refresh_token = get("SQUADCAST_REFRESH_TOKEN")
            .filter(|v| !v.trim().is_empty())
            .context("SQUADCAST_REFRESH_TOKEN is not set")?;

        let api_shape = match get("SQUADCAST_API") {
            Some(v) => ApiShape::from_str(v.trim(), true)
                .map_err(|e| anyhow::anyhow!("invalid SQUADCAST_API '{}': {}", v, e))?,
            None => ApiShape::Flat,
        };

        let port = match get("ONCALL_WATCH_PORT") {
            Some(v) => v
                .trim()
                .parse()
                .with_context(|| format!("invalid ONCALL_WATCH_PORT '{}'", v))?,
            None => DEFAULT_PORT,
        };

        Ok(Config {
            base_url: get("SQUADCAST_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.into()),
            refresh_token,
            api_shape,
            port,
            interval: duration_var(&get, "ONCALL_WATCH_INTERVAL", DEFAULT_INTERVAL)?,
            future_window: duration_var(&get, "ONCALL_WATCH_FUTURE_WINDOW", DEFAULT_FUTURE_WINDOW)?,
            request_timeout: duration_var(
                &get,
                "ONCALL_WATCH_REQUEST_TIMEOUT",
                DEFAULT_REQUEST_TIMEOUT,
            )?,
        })
    }
}

fn duration_var(
    get: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: Duration,
) -> anyhow::Result<Duration> {
    match get(name) {
        Some(v) => parse_duration(&v).map_err(|e| anyhow::anyhow!("invalid {}: {}", name, e)),
        None => Ok(default),
    }
}

/// Parse a duration like "30s", "15m", "72h" or "2d". A bare number is seconds.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim().to_lowercase();
    let (digits, unit) = match s.find(|c: char| !c.is_ascii_digit()) {
        Some(idx) => s.split_at(idx),
        None => (s.as_str(), "s"),
    };
    let n: u64 = digits
        .parse()
        .map_err(|_| format!("invalid duration '{}'", s))?;
    let scale = match unit {
        "s" => 1,
        "m" => 60,
        "h" => 3600,
        "d" => 86_400,
        _ => return Err(format!("unknown duration unit in '{}'", s)),
    };
    let secs = n
        .checked_mul(scale)
        .ok_or_else(|| format!("duration '{}' is too large", s))?;
    if secs == 0 {
        return Err("duration must be greater than zero".into());
    }
    let d = Duration::from_secs(secs);
    // Must also fit a calendar offset, the future window is added to "now".
    chrono::Duration::from_std(d).map_err(|_| format!("duration '{}' is too large", s))?;
    Ok(d)
}

pub fn load() -> anyhow::Result<Config> {
    dotenvy::dotenv().ok();
    Config::from_lookup(|name| std::env::var(name).ok())
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
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let cfg = Config::from_lookup(lookup(&[("SQUADCAST_REFRESH_TOKEN", "secret")])).unwrap();
        assert_eq!(cfg.base_url, DEFAULT_BASE_URL);
        assert_eq!(cfg.api_shape, ApiShape::Flat);
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.interval, Duration::from_secs(900));
        assert_eq!(cfg.future_window, Duration::from_secs(72 * 3600));
    }

    #[test]
    fn test_missing_refresh_token_is_an_error() {
        assert!(Config::from_lookup(lookup(&[])).is_err());
        assert!(Config::from_lookup(lookup(&[("SQUADCAST_REFRESH_TOKEN", "  ")])).is_err());
    }

    #[test]
    fn test_env_values_are_parsed() {
        let cfg = Config::from_lookup(lookup(&[
            ("SQUADCAST_REFRESH_TOKEN", "secret"),
            ("SQUADCAST_API", "teams"),
            ("ONCALL_WATCH_PORT", "9100"),
            ("ONCALL_WATCH_INTERVAL", "5m"),
            ("ONCALL_WATCH_FUTURE_WINDOW", "2d"),
        ]))
        .unwrap();
        assert_eq!(cfg.api_shape, ApiShape::Teams);
        assert_eq!(cfg.port, 9100);
        assert_eq!(cfg.interval, Duration::from_secs(300));
        assert_eq!(cfg.future_window, Duration::from_secs(2 * 86_400));
    }

    #[test]
    fn test_invalid_api_shape_rejected() {
        let res = Config::from_lookup(lookup(&[
            ("SQUADCAST_REFRESH_TOKEN", "secret"),
            ("SQUADCAST_API", "v9"),
        ]));
        assert!(res.is_err());
    }

    #[test]
    fn test_overrides_win() {
        let cfg = Config::from_lookup(lookup(&[("SQUADCAST_REFRESH_TOKEN", "secret")]))
            .unwrap()
            .apply(&Overrides {
                port: Some(1234),
                interval: Some(Duration::from_secs(60)),
                ..Default::default()
            });
        assert_eq!(cfg.port, 1234);
        assert_eq!(cfg.interval, Duration::from_secs(60));
        assert_eq!(cfg.future_window, DEFAULT_FUTURE_WINDOW);
    }

    #[test]
    fn test_parse_duration_units() {
        assert_eq!(parse_duration("30s").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_duration("15m").unwrap(), Duration::from_secs(900));
        assert_eq!(parse_duration("72h").unwrap(), Duration::from_secs(259_200));
        assert_eq!(parse_duration("45").unwrap(), Duration::from_secs(45));
        assert!(parse_duration("0s").is_err());
        assert!(parse_duration("5w").is_err());
        assert!(parse_duration("m").is_err());
    }

    #[test]
    fn test_parse_duration_rejects_overflow() {
        let err = parse_duration("18446744073709551615d").unwrap_err();
        assert!(err.contains("too large"), "{}", err);
        assert!(parse_duration("18446744073709551615m").is_err());
        assert!(parse_duration("18446744073709551615").is_err());
        assert!(parse_duration("99999999999999999999h").is_err());
        assert!(parse_duration("1000000d").is_ok());
    }

    #[test]
    fn test_overflowing_env_duration_is_a_config_error() {
        let vars = [
            ("SQUADCAST_REFRESH_TOKEN", "secret"),
            ("ONCALL_WATCH_FUTURE_WINDOW", "18446744073709551615h"),
        ];
        assert!(Config::from_lookup(lookup(&vars)).is_err());
    }

    #[test]
    fn test_debug_redacts_secret() {
        let cfg = Config::from_lookup(lookup(&[("SQUADCAST_REFRESH_TOKEN", "hunter2")])).unwrap();
        assert!(!format!("{:?}", cfg).contains("hunter2"));
    }
}
