use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "alarm-feed",
    about = "live alarm dashboard over a reconnecting websocket feed",
    version
)]
pub struct Args {
    /// WebSocket endpoint URL (http/https are rewritten to ws/wss)
    #[arg(short, long, default_value = crate::config::DEFAULT_ENDPOINT)]
    pub url: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Output logs in JSON format
    #[arg(long)]
    pub json_logs: bool,

    /// Enable metrics server
    #[arg(long)]
    pub metrics: bool,

    /// Metrics server port
    #[arg(long, default_value = "9090")]
    pub metrics_port: u16,

    /// Connection timeout in seconds
    #[arg(long, default_value = "30")]
    pub timeout: u64,

    /// Base reconnect delay in milliseconds (doubled per attempt)
    #[arg(long, default_value = "1000")]
    pub reconnect_base_ms: u64,

    /// Upper bound on the reconnect delay in milliseconds
    #[arg(long, default_value = "30000")]
    pub reconnect_cap_ms: u64,

    /// Maximum number of automatic reconnection attempts (0 for unlimited)
    #[arg(long, default_value = "5")]
    pub max_reconnects: u32,

    /// Random stretch applied to each reconnect delay, as a fraction (0.0 - 1.0)
    #[arg(long, default_value = "0.0")]
    pub jitter: f64,

    /// Output format: table, json, minimal
    #[arg(long, default_value = "table")]
    pub format: String,

    /// Disable colored output (useful for piping to files)
    #[arg(long)]
    pub no_color: bool,

    /// Quiet mode - only toasts and alarm updates
    #[arg(long)]
    pub quiet: bool,

    /// Do not read notification commands (list, read <id>, read-all, clear) from stdin
    #[arg(long)]
    pub no_input: bool,
}
