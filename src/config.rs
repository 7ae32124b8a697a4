/// file: src/config.rs
/// description: static endpoint and tuning knobs for the alarm feed client
use crate::{cli::Args, error::AlarmFeedError, formatter::OutputFormat};
use anyhow::Result;
use std::time::Duration;
use url::Url;

pub const DEFAULT_ENDPOINT: &str = "wss://ws2relayserver.loca.lt";

#[derive(Debug, Clone)]
pub struct Config {
    pub websocket: WebSocketConfig,
    pub backoff: BackoffConfig,
    pub metrics: MetricsConfig,
    pub display: DisplayConfig,
}

#[derive(Debug, Clone)]
pub struct WebSocketConfig {
    pub url: Url,
    pub connect_timeout: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BackoffConfig {
    pub base: Duration,
    pub cap: Duration,
    /// `None` retries forever.
    pub max_attempts: Option<u32>,
    pub jitter: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(1_000),
            cap: Duration::from_millis(30_000),
            max_attempts: Some(5),
            jitter: 0.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct DisplayConfig {
    pub format: OutputFormat,
    pub colored: bool,
    pub quiet: bool,
    /// Accept notification commands on stdin.
    pub interactive: bool,
}

impl Config {
    /// Defaults for everything except the endpoint.
    pub fn new(url: Url) -> Self {
        Config {
            websocket: WebSocketConfig {
                url,
                connect_timeout: Duration::from_secs(30),
            },
            backoff: BackoffConfig::default(),
            metrics: MetricsConfig {
                enabled: false,
                port: 9090,
            },
            display: DisplayConfig {
                format: OutputFormat::Table,
                colored: true,
                quiet: false,
                interactive: true,
            },
        }
    }

    pub fn from_args(args: &Args) -> Result<Self> {
        let url = normalize_endpoint(&args.url)?;

        Ok(Config {
            websocket: WebSocketConfig {
                url,
                connect_timeout: Duration::from_secs(args.timeout),
            },
            backoff: BackoffConfig {
                base: Duration::from_millis(args.reconnect_base_ms),
                cap: Duration::from_millis(args.reconnect_cap_ms),
                max_attempts: (args.max_reconnects > 0).then_some(args.max_reconnects),
                jitter: args.jitter,
            },
            metrics: MetricsConfig {
                enabled: args.metrics,
                port: args.metrics_port,
            },
            display: DisplayConfig {
                format: OutputFormat::from(args.format.as_str()),
                colored: !args.no_color,
                quiet: args.quiet,
                interactive: !args.no_input,
            },
        })
    }
}

/// Parses an endpoint, mapping `http(s)` onto `ws(s)`.
pub fn normalize_endpoint(raw: &str) -> Result<Url, AlarmFeedError> {
    let mut url = Url::parse(raw)?;
    let scheme = match url.scheme() {
        "ws" | "http" => "ws",
        "wss" | "https" => "wss",
        other => return Err(AlarmFeedError::InvalidEndpoint(other.to_string())),
    };
    if url.scheme() != scheme {
        url.set_scheme(scheme)
            .map_err(|_| AlarmFeedError::InvalidEndpoint(raw.to_string()))?;
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn https_endpoint_becomes_wss() {
        let url = normalize_endpoint("https://ws2relayserver.loca.lt").unwrap();
        assert_eq!(url.scheme(), "wss");
        assert_eq!(url.host_str(), Some("ws2relayserver.loca.lt"));
    }

    #[test]
    fn unsupported_scheme_is_rejected() {
        let err = normalize_endpoint("ftp://example.com").unwrap_err();
        assert!(matches!(err, AlarmFeedError::InvalidEndpoint(scheme) if scheme == "ftp"));
    }

    #[test]
    fn defaults_follow_the_reconnect_policy() {
        let args = Args::parse_from(["alarm-feed"]);
        let config = Config::from_args(&args).unwrap();
        assert_eq!(config.websocket.url.as_str(), "wss://ws2relayserver.loca.lt/");
        assert_eq!(config.backoff, BackoffConfig::default());
        assert!(!config.metrics.enabled);
        assert!(config.display.interactive);
    }

    #[test]
    fn no_input_disables_dashboard_commands() {
        let args = Args::parse_from(["alarm-feed", "--no-input"]);
        let config = Config::from_args(&args).unwrap();
        assert!(!config.display.interactive);
    }

    #[test]
    fn zero_max_reconnects_means_unlimited() {
        let args = Args::parse_from(["alarm-feed", "--max-reconnects", "0", "--no-color"]);
        let config = Config::from_args(&args).unwrap();
        assert_eq!(config.backoff.max_attempts, None);
        assert!(!config.display.colored);
    }
}
