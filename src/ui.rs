/// file: src/ui.rs
/// description: terminal dashboard fed by client events
use crate::{
    error::AlarmFeedError,
    events::{ClientEvent, EventReceiver},
    formatter::{AlarmFormatter, Colors, OutputFormat},
    notifications::NotificationStore,
};
use chrono::{DateTime, Utc};
use std::io::BufRead;
use std::str::FromStr;
use tokio::sync::mpsc;
use tracing::{debug, warn};

const COMMAND_HELP: &str = "Commands: list | read <id> | read-all | clear | help";

/// A line typed into the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashboardCommand {
    List,
    Read(u64),
    ReadAll,
    Clear,
    Help,
}

impl FromStr for DashboardCommand {
    type Err = AlarmFeedError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let command = match (words.next(), words.next()) {
            (Some("list" | "ls"), None) => DashboardCommand::List,
            (Some("read"), Some(id)) => id
                .trim_start_matches('#')
                .parse()
                .map(DashboardCommand::Read)
                .map_err(|_| AlarmFeedError::InvalidCommand(line.to_string()))?,
            (Some("read-all"), None) => DashboardCommand::ReadAll,
            (Some("clear"), None) => DashboardCommand::Clear,
            (Some("help" | "?"), None) => DashboardCommand::Help,
            _ => return Err(AlarmFeedError::InvalidCommand(line.to_string())),
        };
        if words.next().is_some() {
            return Err(AlarmFeedError::InvalidCommand(line.to_string()));
        }
        Ok(command)
    }
}

/// Reads dashboard commands from stdin on a detached thread, so a pending
/// read never holds up runtime shutdown.
pub fn spawn_command_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(16);
    let spawned = std::thread::Builder::new()
        .name("dashboard-input".into())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                match line {
                    Ok(line) => {
                        if tx.blocking_send(line).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "Failed to read dashboard command");
                        break;
                    }
                }
            }
        });
    if let Err(e) = spawned {
        warn!(error = %e, "Command input disabled");
    }
    rx
}

pub struct UIOptions {
    pub format: OutputFormat,
    pub colored: bool,
    pub quiet: bool,
}

pub struct DashboardController {
    event_receiver: EventReceiver,
    commands: Option<mpsc::Receiver<String>>,
    store: NotificationStore,
    formatter: AlarmFormatter,
    quiet_mode: bool,
    format: OutputFormat,
}

impl DashboardController {
    pub fn new(event_receiver: EventReceiver, options: UIOptions) -> Self {
        Self {
            event_receiver,
            commands: None,
            store: NotificationStore::new(),
            formatter: AlarmFormatter::new(options.format, options.colored),
            quiet_mode: options.quiet,
            format: options.format,
        }
    }

    /// Feeds typed commands into [`DashboardController::run`].
    pub fn with_commands(mut self, commands: mpsc::Receiver<String>) -> Self {
        self.commands = Some(commands);
        self
    }

    pub fn store(&self) -> &NotificationStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut NotificationStore {
        &mut self.store
    }

    /// Runs until every event sender is gone. Closing the command input
    /// only stops command handling.
    pub async fn run(&mut self) {
        self.print_startup_banner();
        if !self.quiet_mode {
            println!("{}", self.render_status());
        }

        loop {
            tokio::select! {
                event = self.event_receiver.recv() => match event {
                    Some(event) => self.handle_event(event),
                    None => break,
                },
                line = next_command(&mut self.commands) => match line {
                    Some(line) => {
                        let output = self.handle_command(&line);
                        if !output.is_empty() {
                            println!("{}", output);
                        }
                    }
                    None => {
                        debug!("Command input closed");
                        self.commands = None;
                    }
                },
            }
        }
    }

    /// Current connection status as a banner line.
    pub fn render_status(&self) -> String {
        self.formatter.format_status(self.store.connection_status())
    }

    pub fn render_panel(&self, now: DateTime<Utc>) -> String {
        let badge = self.store.badge_label();
        self.formatter
            .format_notification_panel(self.store.notifications(), badge.as_deref(), now)
    }

    /// Applies one typed command and returns the text to show for it.
    pub fn handle_command(&mut self, line: &str) -> String {
        let line = line.trim();
        if line.is_empty() {
            return String::new();
        }
        let command = match line.parse::<DashboardCommand>() {
            Ok(command) => command,
            Err(e) => return format!("{}\n{}", e, COMMAND_HELP),
        };
        debug!(?command, "Dashboard command");

        let mut notice = None;
        match command {
            DashboardCommand::List => {}
            DashboardCommand::Read(id) => {
                if !self.store.mark_as_read(id) {
                    notice = Some(format!("Notification #{} is already read or does not exist", id));
                }
            }
            DashboardCommand::ReadAll => self.store.mark_all_as_read(),
            DashboardCommand::Clear => self.store.clear_all(),
            DashboardCommand::Help => return COMMAND_HELP.to_string(),
        }

        let panel = self.render_panel(Utc::now());
        match notice {
            Some(notice) => format!("{}\n{}", notice, panel),
            None => panel,
        }
    }

    pub fn handle_event(&mut self, event: ClientEvent) {
        let created = match event {
            ClientEvent::Status(status) => {
                if !self.quiet_mode {
                    self.formatter.print_status(status);
                }
                self.store.handle_status(status)
            }
            ClientEvent::Message(message) => {
                let created = self.store.handle_message(&message);
                if created.is_some() || !self.quiet_mode {
                    self.formatter.print_alarm_table(self.store.alarm_records());
                }
                if created.is_none() {
                    debug!(kind = message.kind(), "Message produced no notification");
                }
                created
            }
        };

        if let Some(notification) = created {
            let badge = self.store.badge_label();
            self.formatter.print_toast(&notification, badge.as_deref());
        }
    }

    fn print_startup_banner(&self) {
        if self.quiet_mode || self.format != OutputFormat::Table {
            return;
        }

        println!();
        println!(
            "{}{}╔══════════════════════════════════════════════════════════════╗{}",
            Colors::BOLD,
            Colors::BRIGHT_CYAN,
            Colors::RESET
        );
        println!(
            "{}{}║                    LIVE ALARM DASHBOARD                      ║{}",
            Colors::BOLD,
            Colors::BRIGHT_CYAN,
            Colors::RESET
        );
        println!(
            "{}{}╚══════════════════════════════════════════════════════════════╝{}",
            Colors::BOLD,
            Colors::BRIGHT_CYAN,
            Colors::RESET
        );
        println!(
            "{}Version {}{}",
            Colors::DIM,
            env!("CARGO_PKG_VERSION"),
            Colors::RESET
        );
        println!();
    }
}

async fn next_command(commands: &mut Option<mpsc::Receiver<String>>) -> Option<String> {
    match commands {
        Some(commands) => commands.recv().await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        events::create_event_channel,
        status::ConnectionStatus,
        types::{AlarmRecord, InboundMessage},
    };
    use chrono::Utc;
    use std::sync::Arc;

    fn options(format: OutputFormat) -> UIOptions {
        UIOptions {
            format,
            colored: false,
            quiet: true,
        }
    }

    fn controller() -> DashboardController {
        let (_tx, rx) = create_event_channel();
        DashboardController::new(rx, options(OutputFormat::Minimal))
    }

    fn table_controller() -> DashboardController {
        let (_tx, rx) = create_event_channel();
        DashboardController::new(rx, options(OutputFormat::Table))
    }

    #[test]
    fn initial_status_reads_connecting() {
        let ui = table_controller();
        assert_eq!(
            ui.render_status(),
            "[CONNECTING] * Connecting to alarm system..."
        );
    }

    #[test]
    fn commands_parse() {
        assert_eq!("list".parse::<DashboardCommand>().unwrap(), DashboardCommand::List);
        assert_eq!(
            " read #7 ".parse::<DashboardCommand>().unwrap(),
            DashboardCommand::Read(7)
        );
        assert_eq!(
            "read-all".parse::<DashboardCommand>().unwrap(),
            DashboardCommand::ReadAll
        );
        assert!("read".parse::<DashboardCommand>().is_err());
        assert!("read seven".parse::<DashboardCommand>().is_err());
        assert!("clear everything".parse::<DashboardCommand>().is_err());
        assert!(matches!(
            "reboot".parse::<DashboardCommand>(),
            Err(AlarmFeedError::InvalidCommand(line)) if line == "reboot"
        ));
    }

    #[test]
    fn commands_drive_the_notification_panel() {
        let mut ui = table_controller();
        ui.handle_event(ClientEvent::Status(ConnectionStatus::Connected));
        ui.handle_event(ClientEvent::Status(ConnectionStatus::Error));

        let listed = ui.handle_command("list");
        assert!(listed.starts_with("Notifications (2 unread)"));
        assert!(listed.contains("* #2    [error  ] Connection Error (less than a minute ago)"));
        assert!(listed.contains("* #1    [success] Connection Established"));

        let after_read = ui.handle_command("read 1");
        assert_eq!(ui.store().unread_count(), 1);
        assert!(ui.store().notifications().iter().any(|n| n.id == 1 && n.read));
        assert!(after_read.starts_with("Notifications (1 unread)"));
        assert!(after_read.contains("  #1    [success]"));

        let again = ui.handle_command("read 1");
        assert!(again.starts_with("Notification #1 is already read or does not exist"));
        assert_eq!(ui.store().unread_count(), 1);

        let all_read = ui.handle_command("read-all");
        assert_eq!(ui.store().badge_label(), None);
        assert!(all_read.starts_with("Notifications\n"));
        assert!(!all_read.contains('*'));

        let cleared = ui.handle_command("clear");
        assert!(ui.store().notifications().is_empty());
        assert_eq!(cleared, "Notifications\nNo notifications yet");

        assert!(ui.handle_command("reboot").contains(COMMAND_HELP));
        assert_eq!(ui.handle_command("   "), "");
    }

    #[tokio::test]
    async fn run_applies_typed_commands_between_events() {
        let (events_tx, events_rx) = create_event_channel();
        let (commands_tx, commands_rx) = mpsc::channel(4);
        let mut ui =
            DashboardController::new(events_rx, options(OutputFormat::Minimal)).with_commands(commands_rx);

        let task = tokio::spawn(async move {
            ui.run().await;
            ui
        });

        events_tx
            .send(ClientEvent::Status(ConnectionStatus::Connected))
            .await
            .unwrap();
        tokio::task::yield_now().await;
        commands_tx.send("read-all".into()).await.unwrap();
        tokio::task::yield_now().await;

        // Closing input leaves the dashboard running on events.
        drop(commands_tx);
        events_tx
            .send(ClientEvent::Status(ConnectionStatus::Error))
            .await
            .unwrap();
        drop(events_tx);

        let ui = task.await.unwrap();
        let store = ui.store();
        assert_eq!(store.notifications().len(), 2);
        assert_eq!(store.unread_count(), 1);
        assert_eq!(store.connection_status(), ConnectionStatus::Error);
    }

    #[test]
    fn events_flow_into_store() {
        let mut ui = controller();
        ui.handle_event(ClientEvent::Status(ConnectionStatus::Connected));
        ui.handle_event(ClientEvent::Message(Arc::new(InboundMessage::AlarmRecords(
            vec![AlarmRecord {
                id: "a".into(),
                timestamp: Utc::now(),
            }],
        ))));

        let store = ui.store();
        assert_eq!(store.connection_status(), ConnectionStatus::Connected);
        assert_eq!(store.notifications().len(), 2);
        assert_eq!(store.notifications()[0].title, "1 New Alarm");
        assert_eq!(store.unread_count(), 2);

        ui.store_mut().mark_all_as_read();
        assert_eq!(ui.store().badge_label(), None);
    }
}
