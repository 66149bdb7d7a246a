use std::time::Duration;

use clap::{Parser, Subcommand};

use crate::config::{parse_duration, ApiShape, Overrides};

/// oncall-watch: checks that someone is on call in Squadcast, now and ahead
#[derive(Parser)]
#[command(name = "oncall-watch", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Port number for Prometheus metrics
    #[arg(short, long)]
    pub port: Option<u16>,

    /// How often to check for on-calls (e.g. 15m)
    #[arg(long, value_parser = parse_duration)]
    pub interval: Option<Duration>,

    /// How far in the future to check for the existence of an on-call (e.g. 72h)
    #[arg(long = "future-window", alias = "future_window", value_parser = parse_duration)]
    pub future_window: Option<Duration>,

    /// Per-request timeout against the Squadcast API (e.g. 30s)
    #[arg(long, value_parser = parse_duration)]
    pub request_timeout: Option<Duration>,

    /// Squadcast API shape to use
    #[arg(long, value_enum)]
    pub api: Option<ApiShape>,

    /// Override the Squadcast API base URL
    #[arg(long)]
    pub base_url: Option<String>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Poll continuously and serve metrics (default)
    Serve,

    /// Run a single verification and exit non-zero if nobody is on call
    Check,
}

impl Cli {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            base_url: self.base_url.clone(),
            api_shape: self.api,
            port: self.port,
            interval: self.interval,
            future_window: self.future_window,
            request_timeout: self.request_timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_args_defaults_to_serve() {
        let cli = Cli::try_parse_from(["oncall-watch"]).unwrap();
        assert!(cli.command.is_none());
        assert!(cli.overrides().interval.is_none());
    }

    #[test]
    fn test_flags_become_overrides() {
        let cli = Cli::try_parse_from([
            "oncall-watch",
            "--port",
            "9000",
            "--interval",
            "5m",
            "--future_window",
            "24h",
            "--api",
            "teams",
            "check",
        ])
        .unwrap();
        assert_eq!(cli.command, Some(Commands::Check));
        let o = cli.overrides();
        assert_eq!(o.port, Some(9000));
        assert_eq!(o.interval, Some(Duration::from_secs(300)));
        assert_eq!(o.future_window, Some(Duration::from_secs(86_400)));
        assert_eq!(o.api_shape, Some(ApiShape::Teams));
    }

    #[test]
    fn test_bad_duration_rejected() {
        assert!(Cli::try_parse_from(["oncall-watch", "--interval", "soon"]).is_err());
    }
}
