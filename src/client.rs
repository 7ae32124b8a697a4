// file: src/client.rs
// description: reconnecting WebSocket client that fans out status and alarm messages
// reference: https://docs.rs/tokio/latest/tokio/macro.select.html

use crate::{
    client_state::{ClientStats, ConnectionMachine, Effect, StatsSnapshot},
    config::Config,
    error::AlarmFeedError,
    listeners::{ListenerId, ListenerRegistry},
    monitoring,
    status::{ConnectionState, ConnectionStatus},
    transport::{Transport, TransportEvent, TransportHandle, TransportSink, WebSocketTransport},
    types::{InboundMessage, decode_frame},
};
use std::future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Sleep, sleep};
use tracing::{debug, error, info, trace, warn};

#[derive(Debug)]
enum Command {
    Connect,
    Disconnect,
    Shutdown,
}

/// Handle to the single connection worker.
///
/// Every method is non-blocking: commands are queued to the worker, which
/// handles commands, transport events and the retry timer one at a time and
/// finishes listener dispatch for each before taking the next. Listeners run
/// on the worker task, so they must not block.
///
/// Dropping the handle stops the worker and closes any open socket.
pub struct ReconnectingClient {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<ConnectionState>,
    status_listeners: Arc<ListenerRegistry<ConnectionStatus>>,
    message_listeners: Arc<ListenerRegistry<InboundMessage>>,
    stats: Arc<ClientStats>,
    worker: Option<JoinHandle<()>>,
}

impl ReconnectingClient {
    /// Client over the real WebSocket transport. Must be called inside a tokio runtime.
    pub fn new(config: Arc<Config>) -> Self {
        let transport = WebSocketTransport::new(config.websocket.connect_timeout);
        Self::with_transport(config, Arc::new(transport))
    }

    pub fn with_transport(config: Arc<Config>, transport: Arc<dyn Transport>) -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Idle);
        let status_listeners = Arc::new(ListenerRegistry::new("connection-status"));
        let message_listeners = Arc::new(ListenerRegistry::new("message"));
        let stats = Arc::new(ClientStats::default());

        let worker = ClientWorker {
            machine: ConnectionMachine::new(&config.backoff),
            config,
            transport,
            connection: None,
            retry: None,
            commands: command_rx,
            event_tx,
            event_rx,
            state_tx,
            status_listeners: status_listeners.clone(),
            message_listeners: message_listeners.clone(),
            stats: stats.clone(),
        };

        Self {
            commands: command_tx,
            state: state_rx,
            status_listeners,
            message_listeners,
            stats,
            worker: Some(tokio::spawn(worker.run())),
        }
    }

    /// Starts connecting unless an attempt is already in progress or open.
    pub fn connect(&self) -> Result<(), AlarmFeedError> {
        self.commands
            .send(Command::Connect)
            .map_err(|_| AlarmFeedError::ClientStopped)
    }

    /// Closes the socket, cancels any pending retry and resets the attempt counter.
    pub fn disconnect(&self) {
        if self.commands.send(Command::Disconnect).is_err() {
            debug!("disconnect() after worker stopped");
        }
    }

    pub fn add_connection_status_listener<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&ConnectionStatus) + Send + Sync + 'static,
    {
        self.status_listeners.add(listener)
    }

    pub fn remove_connection_status_listener(&self, id: ListenerId) -> bool {
        self.status_listeners.remove(id)
    }

    pub fn add_message_listener<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&InboundMessage) + Send + Sync + 'static,
    {
        self.message_listeners.add(listener)
    }

    pub fn remove_message_listener(&self, id: ListenerId) -> bool {
        self.message_listeners.remove(id)
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn status(&self) -> ConnectionStatus {
        self.state().status()
    }

    /// Receiver that observes every published state, including `Connecting`.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Disconnects and waits for the worker to exit.
    pub async fn shutdown(mut self) {
        let _ = self.commands.send(Command::Shutdown);
        if let Some(worker) = self.worker.take()
            && let Err(e) = worker.await
        {
            error!("Client worker ended abnormally: {}", e);
        }
    }
}

struct ClientWorker {
    config: Arc<Config>,
    transport: Arc<dyn Transport>,
    machine: ConnectionMachine,
    connection: Option<TransportHandle>,
    retry: Option<Pin<Box<Sleep>>>,
    commands: mpsc::UnboundedReceiver<Command>,
    event_tx: mpsc::UnboundedSender<(u64, TransportEvent)>,
    event_rx: mpsc::UnboundedReceiver<(u64, TransportEvent)>,
    state_tx: watch::Sender<ConnectionState>,
    status_listeners: Arc<ListenerRegistry<ConnectionStatus>>,
    message_listeners: Arc<ListenerRegistry<InboundMessage>>,
    stats: Arc<ClientStats>,
}

impl ClientWorker {
    async fn run(mut self) {
        info!(url = %self.config.websocket.url, "Client worker started");

        loop {
            tokio::select! {
                biased;

                command = self.commands.recv() => match command {
                    Some(Command::Connect) => {
                        let effects = self.machine.connect();
                        self.apply(effects);
                    }
                    Some(Command::Disconnect) => {
                        info!("Disconnect requested");
                        let effects = self.machine.disconnect();
                        self.apply(effects);
                    }
                    Some(Command::Shutdown) | None => {
                        let effects = self.machine.disconnect();
                        self.apply(effects);
                        break;
                    }
                },

                Some((generation, event)) = self.event_rx.recv() => {
                    self.handle_transport_event(generation, event);
                }

                _ = wait_for_retry(&mut self.retry) => {
                    self.retry = None;
                    info!(attempt = self.machine.attempt(), "Retry timer elapsed, reconnecting");
                    let effects = self.machine.retry_elapsed();
                    self.apply(effects);
                }
            }
        }

        info!("Client worker stopped");
    }

    fn handle_transport_event(&mut self, generation: u64, event: TransportEvent) {
        if let TransportEvent::Frame(text) = &event {
            if self.machine.accepts_frames(generation) {
                self.handle_frame(text);
            } else {
                trace!(generation, "Dropping frame from inactive connection");
            }
            return;
        }

        match &event {
            TransportEvent::OpenFailed(reason) => warn!("Connection attempt failed: {}", reason),
            TransportEvent::Error(reason) => warn!("Transport error: {}", reason),
            _ => debug!(generation, ?event, "Transport event"),
        }

        let effects = self.machine.on_transport_event(generation, &event);
        self.apply(effects);
    }

    fn handle_frame(&mut self, text: &str) {
        self.stats.record_frame();
        monitoring::FRAMES_RECEIVED_COUNTER.increment(1);

        let message = match decode_frame(text) {
            Ok(message) => message,
            Err(e) => {
                self.stats.record_decode_failure();
                monitoring::DECODE_FAILURES_COUNTER.increment(1);
                warn!(
                    "Failed to decode frame: {}. Message: {}",
                    e,
                    text.chars().take(100).collect::<String>()
                );
                return;
            }
        };

        if let InboundMessage::AlarmRecords(records) = &message {
            debug!("Dispatching {} alarm records", records.len());
            monitoring::ALARM_RECORDS_COUNTER.increment(records.len() as u64);
        }

        let report = self.message_listeners.notify(&message);
        self.stats.record_dispatch();
        self.record_listener_failures(report.failed);
    }

    fn apply(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Open { generation } => self.open(generation),
                Effect::Close => {
                    if let Some(connection) = self.connection.take() {
                        connection.close();
                    }
                }
                Effect::ScheduleRetry { delay, attempt } => {
                    warn!(
                        "Reconnecting in {} ms (attempt {})",
                        delay.as_millis(),
                        attempt
                    );
                    self.stats.record_reconnect();
                    monitoring::RECONNECT_COUNTER.increment(1);
                    self.retry = Some(Box::pin(sleep(delay)));
                }
                Effect::CancelRetry => {
                    if self.retry.take().is_some() {
                        debug!("Pending retry cancelled");
                    }
                }
                Effect::GiveUp { attempts } => {
                    error!(
                        "Maximum reconnection attempts ({}) reached, waiting for connect()",
                        attempts
                    );
                }
                Effect::Emit(status) => self.emit(status),
            }
        }
        self.publish_state();
    }

    fn open(&mut self, generation: u64) {
        if let Some(stale) = self.connection.take() {
            stale.close();
        }
        info!(
            generation,
            "Connecting to {}", self.config.websocket.url
        );
        self.publish_state();

        let sink = TransportSink::new(generation, self.event_tx.clone());
        self.connection = Some(self.transport.open(&self.config.websocket.url, sink));
        self.stats.record_open();
    }

    fn emit(&mut self, status: ConnectionStatus) {
        self.publish_state();
        monitoring::CONNECTED_GAUGE.set(if status == ConnectionStatus::Connected {
            1.0
        } else {
            0.0
        });
        info!(%status, "Connection status changed");

        let report = self.status_listeners.notify(&status);
        self.record_listener_failures(report.failed);
    }

    fn publish_state(&self) {
        self.state_tx.send_if_modified(|state| {
            let next = self.machine.state();
            let changed = *state != next;
            *state = next;
            changed
        });
    }

    fn record_listener_failures(&self, failed: usize) {
        if failed > 0 {
            self.stats.record_listener_failures(failed);
            monitoring::LISTENER_FAILURES_COUNTER.increment(failed as u64);
        }
    }
}

async fn wait_for_retry(retry: &mut Option<Pin<Box<Sleep>>>) {
    match retry {
        Some(timer) => timer.as_mut().await,
        None => future::pending().await,
    }
}
