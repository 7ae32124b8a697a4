/// file: src/events.rs
/// description: Event system to decouple client listeners from UI presentation
use crate::{
    client::ReconnectingClient, listeners::ListenerId, status::ConnectionStatus,
    types::InboundMessage,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::warn;

#[derive(Debug, Clone)]
pub enum ClientEvent {
    Status(ConnectionStatus),
    Message(Arc<InboundMessage>),
}

// Listeners run on the client worker and must never wait on the UI, so a
// full queue drops events instead of blocking.
const EVENT_CHANNEL_CAPACITY: usize = 1_024;

pub type EventSender = mpsc::Sender<ClientEvent>;
pub type EventReceiver = mpsc::Receiver<ClientEvent>;

pub fn create_event_channel() -> (EventSender, EventReceiver) {
    mpsc::channel(EVENT_CHANNEL_CAPACITY)
}

/// Listener registrations that forward client events into a channel.
#[derive(Debug)]
pub struct EventBridge {
    status: ListenerId,
    message: ListenerId,
}

impl EventBridge {
    pub fn attach(client: &ReconnectingClient) -> (Self, EventReceiver) {
        let (tx, rx) = create_event_channel();

        let status_tx = tx.clone();
        let status = client.add_connection_status_listener(move |status| {
            forward(&status_tx, ClientEvent::Status(*status));
        });
        let message = client.add_message_listener(move |message| {
            forward(&tx, ClientEvent::Message(Arc::new(message.clone())));
        });

        (Self { status, message }, rx)
    }

    pub fn detach(self, client: &ReconnectingClient) {
        client.remove_connection_status_listener(self.status);
        client.remove_message_listener(self.message);
    }
}

fn forward(tx: &EventSender, event: ClientEvent) {
    if let Err(e) = tx.try_send(event) {
        match e {
            mpsc::error::TrySendError::Full(event) => {
                warn!("Event queue full, dropping {:?}", event);
            }
            mpsc::error::TrySendError::Closed(_) => {}
        }
    }
}
