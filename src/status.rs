/// file: src/status.rs
/// description: connection status reported to listeners and the internal connection state
use serde::{Deserialize, Serialize};
use std::fmt;

/// Connectivity as seen by subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Connecting,
    Connected,
    Disconnected,
    Error,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Disconnected => "disconnected",
            ConnectionStatus::Error => "error",
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Internal state of the reconnecting client.
///
/// `Idle` is only reachable before the first `connect()` and after an explicit
/// `disconnect()`; the retry timer never moves the client out of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum ConnectionState {
    #[default]
    Idle,
    Connecting,
    Connected,
    Disconnected,
    Errored,
}

impl ConnectionState {
    /// Public status for this state. `Idle` reads as `Disconnected`.
    pub fn status(&self) -> ConnectionStatus {
        match self {
            ConnectionState::Idle | ConnectionState::Disconnected => {
                ConnectionStatus::Disconnected
            }
            ConnectionState::Connecting => ConnectionStatus::Connecting,
            ConnectionState::Connected => ConnectionStatus::Connected,
            ConnectionState::Errored => ConnectionStatus::Error,
        }
    }

    /// True while an attempt is in flight or a socket is open.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            ConnectionState::Connecting | ConnectionState::Connected
        )
    }
}
