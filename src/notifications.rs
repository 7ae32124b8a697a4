/// file: src/notifications.rs
/// description: notification feed derived from connection status and alarm updates
use crate::{
    status::ConnectionStatus,
    types::{AlarmRecord, InboundMessage},
};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Number of most recent alarm records kept for display and diffing.
pub const ALARM_WINDOW: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Info,
    Success,
    Warning,
    Error,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Info => "info",
            NotificationKind::Success => "success",
            NotificationKind::Warning => "warning",
            NotificationKind::Error => "error",
        }
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    /// Creation order; later notifications always get larger ids.
    pub id: u64,
    pub title: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub read: bool,
}

/// Newest-first notification list plus the alarm window it was derived from.
#[derive(Debug)]
pub struct NotificationStore {
    notifications: Vec<Notification>,
    unread_count: usize,
    next_id: u64,
    connection_status: ConnectionStatus,
    alarm_window: Vec<AlarmRecord>,
}

impl Default for NotificationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationStore {
    pub fn new() -> Self {
        Self {
            notifications: Vec::new(),
            unread_count: 0,
            next_id: 1,
            connection_status: ConnectionStatus::Connecting,
            alarm_window: Vec::new(),
        }
    }

    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    pub fn unread_count(&self) -> usize {
        self.unread_count
    }

    pub fn connection_status(&self) -> ConnectionStatus {
        self.connection_status
    }

    /// Up to [`ALARM_WINDOW`] records from the latest `alarm-records` message.
    pub fn alarm_records(&self) -> &[AlarmRecord] {
        &self.alarm_window
    }

    /// Badge text for the unread counter, `None` when everything is read.
    pub fn badge_label(&self) -> Option<String> {
        match self.unread_count {
            0 => None,
            count if count > 99 => Some("99+".to_string()),
            count => Some(count.to_string()),
        }
    }

    /// Prepends a new unread notification and returns a copy of it.
    pub fn push(
        &mut self,
        title: impl Into<String>,
        message: impl Into<String>,
        kind: NotificationKind,
    ) -> Notification {
        let notification = Notification {
            id: self.next_id,
            title: title.into(),
            message: message.into(),
            timestamp: Utc::now(),
            kind,
            read: false,
        };
        self.next_id += 1;
        self.notifications.insert(0, notification.clone());
        self.recount();
        notification
    }

    pub fn handle_status(&mut self, status: ConnectionStatus) -> Option<Notification> {
        self.connection_status = status;
        let (title, message, kind) = match status {
            ConnectionStatus::Connecting => return None,
            ConnectionStatus::Connected => (
                "Connection Established",
                "Successfully connected to the alarm monitoring system.",
                NotificationKind::Success,
            ),
            ConnectionStatus::Disconnected => (
                "Connection Lost",
                "Disconnected from the alarm monitoring system. Attempting to reconnect...",
                NotificationKind::Warning,
            ),
            ConnectionStatus::Error => (
                "Connection Error",
                "Failed to connect to the alarm monitoring system.",
                NotificationKind::Error,
            ),
        };
        Some(self.push(title, message, kind))
    }

    /// Replaces the alarm window and raises one aggregate notification for
    /// ids that were not in the previous window.
    pub fn handle_message(&mut self, message: &InboundMessage) -> Option<Notification> {
        let InboundMessage::AlarmRecords(records) = message else {
            return None;
        };

        let window: Vec<AlarmRecord> = records.iter().take(ALARM_WINDOW).cloned().collect();
        let new_alarms = window
            .iter()
            .filter(|record| !self.alarm_window.iter().any(|seen| seen.id == record.id))
            .count();
        self.alarm_window = window;

        if new_alarms == 0 {
            return None;
        }
        let (title, message) = if new_alarms == 1 {
            (
                "1 New Alarm".to_string(),
                "1 new alarm has been detected.".to_string(),
            )
        } else {
            (
                format!("{new_alarms} New Alarms"),
                format!("{new_alarms} new alarms have been detected."),
            )
        };
        Some(self.push(title, message, NotificationKind::Warning))
    }

    /// Marks one notification read. Returns `true` if it was unread.
    pub fn mark_as_read(&mut self, id: u64) -> bool {
        let Some(notification) = self.notifications.iter_mut().find(|n| n.id == id) else {
            return false;
        };
        let was_unread = !notification.read;
        notification.read = true;
        self.recount();
        was_unread
    }

    pub fn mark_all_as_read(&mut self) {
        for notification in &mut self.notifications {
            notification.read = true;
        }
        self.recount();
    }

    pub fn clear_all(&mut self) {
        self.notifications.clear();
        self.recount();
    }

    fn recount(&mut self) {
        self.unread_count = self.notifications.iter().filter(|n| !n.read).count();
    }
}
