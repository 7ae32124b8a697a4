use crate::error::AlarmFeedError;
use anyhow::Result;
use metrics::{Counter, Gauge, counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::{net::SocketAddr, sync::LazyLock};
use tracing::{error, info};

// Global metrics
pub static FRAMES_RECEIVED_COUNTER: LazyLock<Counter> =
    LazyLock::new(|| counter!("alarm_feed_frames_received_total"));
pub static DECODE_FAILURES_COUNTER: LazyLock<Counter> =
    LazyLock::new(|| counter!("alarm_feed_decode_failures_total"));
pub static LISTENER_FAILURES_COUNTER: LazyLock<Counter> =
    LazyLock::new(|| counter!("alarm_feed_listener_failures_total"));
pub static RECONNECT_COUNTER: LazyLock<Counter> =
    LazyLock::new(|| counter!("alarm_feed_reconnects_total"));
pub static ALARM_RECORDS_COUNTER: LazyLock<Counter> =
    LazyLock::new(|| counter!("alarm_feed_alarm_records_total"));
pub static CONNECTED_GAUGE: LazyLock<Gauge> = LazyLock::new(|| gauge!("alarm_feed_connected"));

pub async fn setup_metrics(port: u16) -> Result<()> {
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();

    let builder = PrometheusBuilder::new()
        .with_http_listener(addr)
        .add_global_label("service", "alarm-feed")
        .add_global_label("version", env!("CARGO_PKG_VERSION"));

    match builder.install() {
        Ok(_handle) => {
            info!(
                "Prometheus metrics server started on http://{}/metrics",
                addr
            );

            FRAMES_RECEIVED_COUNTER.absolute(0);
            DECODE_FAILURES_COUNTER.absolute(0);
            LISTENER_FAILURES_COUNTER.absolute(0);
            RECONNECT_COUNTER.absolute(0);
            ALARM_RECORDS_COUNTER.absolute(0);
            CONNECTED_GAUGE.set(0.0);

            Ok(())
        }
        Err(e) => {
            error!("Failed to start metrics server: {}", e);
            Err(AlarmFeedError::MetricsError(e.to_string()).into())
        }
    }
}
