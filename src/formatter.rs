use crate::{
    notifications::{Notification, NotificationKind},
    status::ConnectionStatus,
    types::AlarmRecord,
};
use chrono::{DateTime, Local, Utc};

// ANSI color codes
pub struct Colors;

impl Colors {
    pub const RESET: &'static str = "\x1b[0m";
    pub const BOLD: &'static str = "\x1b[1m";
    pub const DIM: &'static str = "\x1b[2m";

    pub const RED: &'static str = "\x1b[31m";
    pub const WHITE: &'static str = "\x1b[37m";

    pub const BRIGHT_RED: &'static str = "\x1b[91m";
    pub const BRIGHT_GREEN: &'static str = "\x1b[92m";
    pub const BRIGHT_YELLOW: &'static str = "\x1b[93m";
    pub const BRIGHT_BLUE: &'static str = "\x1b[94m";
    pub const BRIGHT_CYAN: &'static str = "\x1b[96m";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    Minimal,
}

impl From<&str> for OutputFormat {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputFormat::Json,
            "minimal" => OutputFormat::Minimal,
            _ => OutputFormat::Table,
        }
    }
}

/// Banner text shown for each connection status.
pub fn status_text(status: ConnectionStatus) -> &'static str {
    match status {
        ConnectionStatus::Connecting => "Connecting to alarm system...",
        ConnectionStatus::Connected => "Connected to alarm system",
        ConnectionStatus::Disconnected => {
            "Disconnected from alarm system. Attempting to reconnect..."
        }
        ConnectionStatus::Error => "Failed to connect to alarm system",
    }
}

/// Age of `timestamp` as seen at `now`, worded like a notification feed.
pub fn relative_time(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - timestamp).num_seconds().max(0);
    let minutes = (seconds + 30) / 60;
    let hours = (minutes + 30) / 60;
    let days = (hours + 12) / 24;

    match seconds {
        s if s < 30 => "less than a minute ago".to_string(),
        s if s < 90 => "1 minute ago".to_string(),
        _ if minutes < 45 => format!("{minutes} minutes ago"),
        _ if minutes < 90 => "about 1 hour ago".to_string(),
        _ if hours < 24 => format!("about {hours} hours ago"),
        _ if hours < 42 => "1 day ago".to_string(),
        _ if days < 30 => format!("{days} days ago"),
        _ if days < 45 => "about 1 month ago".to_string(),
        _ if days < 365 => format!("{} months ago", days / 30),
        _ if days < 730 => "about 1 year ago".to_string(),
        _ => format!("over {} years ago", days / 365),
    }
}

pub struct AlarmFormatter {
    format: OutputFormat,
    colored: bool,
}

impl AlarmFormatter {
    pub fn new(format: OutputFormat, colored: bool) -> Self {
        Self { format, colored }
    }

    fn paint(&self, color: &str, text: &str) -> String {
        if self.colored {
            format!("{}{}{}{}", Colors::BOLD, color, text, Colors::RESET)
        } else {
            text.to_string()
        }
    }

    pub fn format_status(&self, status: ConnectionStatus) -> String {
        match self.format {
            OutputFormat::Json => serde_json::json!({
                "event": "status",
                "status": status,
                "text": status_text(status),
            })
            .to_string(),
            OutputFormat::Minimal => format!("status {}", status),
            OutputFormat::Table => {
                let (color, symbol) = match status {
                    ConnectionStatus::Connecting => (Colors::BRIGHT_BLUE, "*"),
                    ConnectionStatus::Connected => (Colors::BRIGHT_GREEN, "+"),
                    ConnectionStatus::Disconnected => (Colors::BRIGHT_YELLOW, "!"),
                    ConnectionStatus::Error => (Colors::BRIGHT_RED, "X"),
                };
                let label = format!("[{}]", status.as_str().to_uppercase());
                format!(
                    "{} {} {}",
                    self.paint(color, &label),
                    symbol,
                    status_text(status)
                )
            }
        }
    }

    /// One-line toast for a freshly created notification.
    pub fn format_toast(&self, notification: &Notification, badge: Option<&str>) -> String {
        match self.format {
            OutputFormat::Json => serde_json::json!({
                "event": "notification",
                "notification": notification,
                "unread": badge,
            })
            .to_string(),
            OutputFormat::Minimal => format!(
                "notify {} {}",
                notification.kind.as_str(),
                notification.title
            ),
            OutputFormat::Table => {
                let color = match notification.kind {
                    NotificationKind::Error => Colors::RED,
                    NotificationKind::Warning => Colors::BRIGHT_YELLOW,
                    NotificationKind::Success => Colors::BRIGHT_GREEN,
                    NotificationKind::Info => Colors::WHITE,
                };
                let badge = badge
                    .map(|label| format!(" ({} unread)", label))
                    .unwrap_or_default();
                format!(
                    "{} {}: {}{}",
                    self.paint(color, "[NOTIFY]"),
                    notification.title,
                    notification.message,
                    badge
                )
            }
        }
    }

    pub fn format_alarm_table(&self, records: &[AlarmRecord]) -> String {
        match self.format {
            OutputFormat::Json => serde_json::json!({
                "event": "alarms",
                "records": records,
            })
            .to_string(),
            OutputFormat::Minimal => records
                .iter()
                .map(|record| format!("alarm {} {}", record.id, record.timestamp.to_rfc3339()))
                .collect::<Vec<_>>()
                .join("\n"),
            OutputFormat::Table => {
                let mut lines = vec![
                    self.paint(Colors::BRIGHT_CYAN, &format!("{:<38} {}", "ID", "Timestamp")),
                    format!("{:-<38} {:-<24}", "", ""),
                ];
                if records.is_empty() {
                    lines.push(self.dim("No alarm records to display"));
                }
                for record in records {
                    let local = record.timestamp.with_timezone(&Local);
                    lines.push(format!(
                        "{:<38} {}",
                        record.id,
                        local.format("%Y-%m-%d %H:%M:%S")
                    ));
                }
                lines.join("\n")
            }
        }
    }

    /// The notification list, newest first, with unread entries marked `*`.
    pub fn format_notification_panel(
        &self,
        notifications: &[Notification],
        badge: Option<&str>,
        now: DateTime<Utc>,
    ) -> String {
        match self.format {
            OutputFormat::Json => serde_json::json!({
                "event": "notifications",
                "unread": badge,
                "notifications": notifications,
            })
            .to_string(),
            OutputFormat::Minimal => {
                if notifications.is_empty() {
                    return "notifications none".to_string();
                }
                notifications
                    .iter()
                    .map(|n| {
                        format!(
                            "notification {} {} {} {}",
                            n.id,
                            if n.read { "read" } else { "unread" },
                            n.kind,
                            n.title
                        )
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            }
            OutputFormat::Table => {
                let badge = badge
                    .map(|label| format!(" ({} unread)", label))
                    .unwrap_or_default();
                let mut lines = vec![format!(
                    "{}{}",
                    self.paint(Colors::BRIGHT_CYAN, "Notifications"),
                    badge
                )];
                if notifications.is_empty() {
                    lines.push(self.dim("No notifications yet"));
                }
                for n in notifications {
                    let marker = if n.read { ' ' } else { '*' };
                    lines.push(format!(
                        "{} #{:<4} [{:<7}] {} ({})",
                        marker,
                        n.id,
                        n.kind,
                        n.title,
                        relative_time(n.timestamp, now)
                    ));
                    lines.push(format!("         {}", self.dim(&n.message)));
                }
                lines.join("\n")
            }
        }
    }

    fn dim(&self, text: &str) -> String {
        if self.colored {
            format!("{}{}{}", Colors::DIM, text, Colors::RESET)
        } else {
            text.to_string()
        }
    }

    pub fn print_status(&self, status: ConnectionStatus) {
        println!("{}", self.format_status(status));
    }

    pub fn print_toast(&self, notification: &Notification, badge: Option<&str>) {
        println!("{}", self.format_toast(notification, badge));
    }

    pub fn print_alarm_table(&self, records: &[AlarmRecord]) {
        let table = self.format_alarm_table(records);
        if !table.is_empty() {
            println!("{}", table);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn plain() -> AlarmFormatter {
        AlarmFormatter::new(OutputFormat::Table, false)
    }

    #[test]
    fn status_banner_uses_dashboard_wording() {
        let line = plain().format_status(ConnectionStatus::Disconnected);
        assert_eq!(
            line,
            "[DISCONNECTED] ! Disconnected from alarm system. Attempting to reconnect..."
        );
    }

    #[test]
    fn empty_table_shows_placeholder() {
        let table = plain().format_alarm_table(&[]);
        assert!(table.ends_with("No alarm records to display"));
    }

    #[test]
    fn toast_includes_badge() {
        let notification = Notification {
            id: 1,
            title: "Connection Error".into(),
            message: "Failed to connect to the alarm monitoring system.".into(),
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            kind: NotificationKind::Error,
            read: false,
        };
        let line = plain().format_toast(&notification, Some("3"));
        assert_eq!(
            line,
            "[NOTIFY] Connection Error: Failed to connect to the alarm monitoring system. (3 unread)"
        );

        let json = AlarmFormatter::new(OutputFormat::Json, false).format_toast(&notification, None);
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["notification"]["type"], "error");
    }

    #[test]
    fn relative_time_buckets() {
        let now = Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap();
        let ago = |seconds: i64| relative_time(now - chrono::Duration::seconds(seconds), now);

        assert_eq!(ago(0), "less than a minute ago");
        assert_eq!(ago(-5), "less than a minute ago");
        assert_eq!(ago(60), "1 minute ago");
        assert_eq!(ago(5 * 60), "5 minutes ago");
        assert_eq!(ago(60 * 60), "about 1 hour ago");
        assert_eq!(ago(3 * 3600), "about 3 hours ago");
        assert_eq!(ago(30 * 3600), "1 day ago");
        assert_eq!(ago(4 * 86_400), "4 days ago");
    }

    #[test]
    fn notification_panel_lists_newest_first_with_unread_marker() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 10, 0).unwrap();
        let notifications = vec![
            Notification {
                id: 2,
                title: "1 New Alarm".into(),
                message: "1 new alarm has been detected.".into(),
                timestamp: now,
                kind: NotificationKind::Warning,
                read: false,
            },
            Notification {
                id: 1,
                title: "Connection Established".into(),
                message: "Successfully connected to the alarm monitoring system.".into(),
                timestamp: now - chrono::Duration::minutes(10),
                kind: NotificationKind::Success,
                read: true,
            },
        ];

        let panel = plain().format_notification_panel(&notifications, Some("1"), now);
        let lines: Vec<&str> = panel.lines().collect();
        assert_eq!(lines[0], "Notifications (1 unread)");
        assert_eq!(
            lines[1],
            "* #2    [warning] 1 New Alarm (less than a minute ago)"
        );
        assert_eq!(
            lines[3],
            "  #1    [success] Connection Established (10 minutes ago)"
        );

        let minimal = AlarmFormatter::new(OutputFormat::Minimal, false)
            .format_notification_panel(&notifications, Some("1"), now);
        assert_eq!(
            minimal,
            "notification 2 unread warning 1 New Alarm\nnotification 1 read success Connection Established"
        );
    }

    #[test]
    fn empty_notification_panel_shows_placeholder() {
        let panel = plain().format_notification_panel(&[], None, Utc::now());
        assert_eq!(panel, "Notifications\nNo notifications yet");
    }

    #[test]
    fn minimal_alarm_lines() {
        let records = vec![AlarmRecord {
            id: "a-1".into(),
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        }];
        let text = AlarmFormatter::new(OutputFormat::Minimal, false).format_alarm_table(&records);
        assert_eq!(text, "alarm a-1 2024-05-01T12:00:00+00:00");
    }
}
