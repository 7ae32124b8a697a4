use thiserror::Error;

#[derive(Error, Debug)]
pub enum AlarmFeedError {
    #[error("WebSocket connection error: {0}")]
    WebSocketError(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("JSON serialization/deserialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("URL parsing error: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("Unsupported endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("Connection timeout")]
    Timeout,

    #[error("Invalid message format: {0}")]
    InvalidMessage(String),

    #[error("Metrics server error: {0}")]
    MetricsError(String),

    #[error("Unknown command: {0}")]
    InvalidCommand(String),

    #[error("Client worker has stopped")]
    ClientStopped,
}
