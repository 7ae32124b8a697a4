/// file: src/client_state.rs
/// description: Separate state management from client logic
use crate::{
    backoff::Backoff,
    config::BackoffConfig,
    status::{ConnectionState, ConnectionStatus},
    transport::TransportEvent,
};
use serde::Serialize;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

/// Work the client has to carry out after a state change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Open { generation: u64 },
    Close,
    ScheduleRetry { delay: Duration, attempt: u32 },
    CancelRetry,
    Emit(ConnectionStatus),
    GiveUp { attempts: u32 },
}

/// Connection state machine. Owns no I/O; every method returns the effects
/// the caller must apply, in order.
#[derive(Debug)]
pub struct ConnectionMachine {
    state: ConnectionState,
    backoff: Backoff,
    generation: u64,
}

impl ConnectionMachine {
    pub fn new(config: &BackoffConfig) -> Self {
        Self {
            state: ConnectionState::Idle,
            backoff: Backoff::new(config),
            generation: 0,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Generation of the current (or last) connection attempt.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn attempt(&self) -> u32 {
        self.backoff.attempt()
    }

    pub fn backoff(&self) -> &Backoff {
        &self.backoff
    }

    pub fn connect(&mut self) -> Vec<Effect> {
        if self.state.is_active() {
            debug!(state = ?self.state, "connect() ignored, attempt already in progress");
            return Vec::new();
        }
        if self.backoff.is_exhausted() {
            self.backoff.reset();
        }
        let mut effects = vec![Effect::CancelRetry];
        effects.extend(self.start_attempt());
        effects
    }

    pub fn disconnect(&mut self) -> Vec<Effect> {
        let was_connected = self.state == ConnectionState::Connected;
        let mut effects = vec![Effect::CancelRetry];
        if self.state.is_active() {
            effects.push(Effect::Close);
        }
        if was_connected {
            effects.push(Effect::Emit(ConnectionStatus::Disconnected));
        }

        // Anything still in flight from the old socket is stale from here on.
        self.generation += 1;
        self.state = ConnectionState::Idle;
        self.backoff.reset();
        effects
    }

    pub fn retry_elapsed(&mut self) -> Vec<Effect> {
        match self.state {
            ConnectionState::Disconnected | ConnectionState::Errored => self.start_attempt(),
            _ => Vec::new(),
        }
    }

    /// True when frames tagged with `generation` belong to the open socket.
    pub fn accepts_frames(&self, generation: u64) -> bool {
        generation == self.generation && self.state == ConnectionState::Connected
    }

    pub fn on_transport_event(&mut self, generation: u64, event: &TransportEvent) -> Vec<Effect> {
        if generation != self.generation {
            debug!(generation, current = self.generation, "Dropping stale transport event");
            return Vec::new();
        }

        match (self.state, event) {
            (ConnectionState::Connecting, TransportEvent::Opened) => {
                self.state = ConnectionState::Connected;
                self.backoff.reset();
                vec![Effect::Emit(ConnectionStatus::Connected)]
            }
            (ConnectionState::Connecting, TransportEvent::OpenFailed(_))
            | (ConnectionState::Connecting, TransportEvent::Closed)
            | (ConnectionState::Connecting, TransportEvent::Error(_))
            | (ConnectionState::Connected, TransportEvent::Error(_)) => {
                self.fail(ConnectionState::Errored, ConnectionStatus::Error)
            }
            (ConnectionState::Connected, TransportEvent::Closed) => {
                self.fail(ConnectionState::Disconnected, ConnectionStatus::Disconnected)
            }
            (state, event) => {
                debug!(?state, ?event, "Transport event has no transition");
                Vec::new()
            }
        }
    }

    fn start_attempt(&mut self) -> Vec<Effect> {
        self.generation += 1;
        self.state = ConnectionState::Connecting;
        vec![Effect::Open {
            generation: self.generation,
        }]
    }

    fn fail(&mut self, next: ConnectionState, status: ConnectionStatus) -> Vec<Effect> {
        self.state = next;
        let mut effects = vec![Effect::Close, Effect::Emit(status)];
        match self.backoff.next_delay() {
            Some(delay) => effects.push(Effect::ScheduleRetry {
                delay,
                attempt: self.backoff.attempt(),
            }),
            None => effects.push(Effect::GiveUp {
                attempts: self.backoff.attempt(),
            }),
        }
        effects
    }
}

/// In-process counters mirrored to the metrics exporter.
#[derive(Debug, Default)]
pub struct ClientStats {
    pub frames_received: AtomicU64,
    pub messages_dispatched: AtomicU64,
    pub decode_failures: AtomicU64,
    pub listener_failures: AtomicU64,
    pub connections_opened: AtomicU64,
    pub reconnects_scheduled: AtomicU32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub frames_received: u64,
    pub messages_dispatched: u64,
    pub decode_failures: u64,
    pub listener_failures: u64,
    pub connections_opened: u64,
    pub reconnects_scheduled: u32,
}

impl ClientStats {
    pub fn record_frame(&self) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dispatch(&self) {
        self.messages_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_decode_failure(&self) {
        self.decode_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_listener_failures(&self, count: usize) {
        self.listener_failures
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_open(&self) {
        self.connections_opened.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_reconnect(&self) {
        self.reconnects_scheduled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            frames_received: self.frames_received.load(Ordering::Relaxed),
            messages_dispatched: self.messages_dispatched.load(Ordering::Relaxed),
            decode_failures: self.decode_failures.load(Ordering::Relaxed),
            listener_failures: self.listener_failures.load(Ordering::Relaxed),
            connections_opened: self.connections_opened.load(Ordering::Relaxed),
            reconnects_scheduled: self.reconnects_scheduled.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn machine() -> ConnectionMachine {
        ConnectionMachine::new(&BackoffConfig::default())
    }

    fn emitted(effects: &[Effect]) -> Vec<ConnectionStatus> {
        effects
            .iter()
            .filter_map(|effect| match effect {
                Effect::Emit(status) => Some(*status),
                _ => None,
            })
            .collect()
    }

    fn retry_delay(effects: &[Effect]) -> Option<Duration> {
        effects.iter().find_map(|effect| match effect {
            Effect::ScheduleRetry { delay, .. } => Some(*delay),
            _ => None,
        })
    }

    fn fail_open(machine: &mut ConnectionMachine) -> Vec<Effect> {
        let generation = machine.generation();
        machine.on_transport_event(generation, &TransportEvent::OpenFailed("refused".into()))
    }

    #[test]
    fn connect_from_idle_opens_without_emitting() {
        let mut machine = machine();
        let effects = machine.connect();
        assert_eq!(
            effects,
            vec![Effect::CancelRetry, Effect::Open { generation: 1 }]
        );
        assert_eq!(machine.state(), ConnectionState::Connecting);
    }

    #[test]
    fn connect_is_noop_while_active() {
        let mut machine = machine();
        machine.connect();
        assert!(machine.connect().is_empty());

        machine.on_transport_event(1, &TransportEvent::Opened);
        assert!(machine.connect().is_empty());
        assert_eq!(machine.generation(), 1);
        assert_eq!(machine.attempt(), 0);
    }

    #[test]
    fn open_then_close_emits_connected_then_disconnected() {
        let mut machine = machine();
        machine.connect();

        let opened = machine.on_transport_event(1, &TransportEvent::Opened);
        assert_eq!(emitted(&opened), vec![ConnectionStatus::Connected]);

        let closed = machine.on_transport_event(1, &TransportEvent::Closed);
        assert_eq!(emitted(&closed), vec![ConnectionStatus::Disconnected]);
        assert_eq!(retry_delay(&closed), Some(Duration::from_millis(2_000)));
        assert_eq!(machine.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn successful_open_resets_attempts() {
        let mut machine = machine();
        machine.connect();
        fail_open(&mut machine);
        machine.retry_elapsed();
        fail_open(&mut machine);
        assert_eq!(machine.attempt(), 2);

        machine.retry_elapsed();
        let generation = machine.generation();
        machine.on_transport_event(generation, &TransportEvent::Opened);
        assert_eq!(machine.attempt(), 0);

        let effects = machine.on_transport_event(generation, &TransportEvent::Error("reset".into()));
        assert_eq!(emitted(&effects), vec![ConnectionStatus::Error]);
        assert_eq!(retry_delay(&effects), Some(Duration::from_millis(2_000)));
    }

    #[test]
    fn gives_up_after_five_consecutive_failures() {
        let mut machine = machine();
        machine.connect();

        let mut delays = Vec::new();
        for _ in 0..5 {
            let effects = fail_open(&mut machine);
            delays.push(retry_delay(&effects).unwrap().as_millis());
            machine.retry_elapsed();
        }
        assert_eq!(delays, vec![2_000, 4_000, 8_000, 16_000, 30_000]);

        let effects = fail_open(&mut machine);
        assert_eq!(retry_delay(&effects), None);
        assert!(effects.contains(&Effect::GiveUp { attempts: 5 }));
        assert_eq!(machine.state(), ConnectionState::Errored);
    }

    #[test]
    fn explicit_connect_after_giving_up_restarts_schedule() {
        let mut machine = machine();
        machine.connect();
        for _ in 0..5 {
            fail_open(&mut machine);
            machine.retry_elapsed();
        }
        fail_open(&mut machine);

        machine.connect();
        let effects = fail_open(&mut machine);
        assert_eq!(retry_delay(&effects), Some(Duration::from_millis(2_000)));
    }

    #[test]
    fn disconnect_then_connect_starts_counter_from_zero() {
        let mut machine = machine();
        machine.connect();
        fail_open(&mut machine);
        machine.retry_elapsed();
        fail_open(&mut machine);

        let effects = machine.disconnect();
        assert_eq!(effects, vec![Effect::CancelRetry]);
        assert_eq!(machine.state(), ConnectionState::Idle);

        machine.connect();
        let effects = fail_open(&mut machine);
        assert_eq!(retry_delay(&effects), Some(Duration::from_millis(2_000)));
    }

    #[test]
    fn disconnect_while_connected_emits_once_and_ignores_late_close() {
        let mut machine = machine();
        machine.connect();
        machine.on_transport_event(1, &TransportEvent::Opened);

        let effects = machine.disconnect();
        assert_eq!(
            effects,
            vec![
                Effect::CancelRetry,
                Effect::Close,
                Effect::Emit(ConnectionStatus::Disconnected)
            ]
        );

        assert!(machine.on_transport_event(1, &TransportEvent::Closed).is_empty());
        assert!(machine.retry_elapsed().is_empty());
        assert_eq!(machine.state(), ConnectionState::Idle);
    }

    #[test]
    fn disconnect_when_idle_is_safe() {
        let mut machine = machine();
        assert_eq!(machine.disconnect(), vec![Effect::CancelRetry]);
        assert_eq!(machine.disconnect(), vec![Effect::CancelRetry]);
    }

    #[test]
    fn frames_only_accepted_from_open_socket() {
        let mut machine = machine();
        machine.connect();
        assert!(!machine.accepts_frames(1));
        machine.on_transport_event(1, &TransportEvent::Opened);
        assert!(machine.accepts_frames(1));
        assert!(!machine.accepts_frames(0));
    }

    #[derive(Debug, Clone)]
    enum Step {
        Connect,
        Disconnect,
        Retry,
        Opened,
        OpenFailed,
        Closed,
        Error,
    }

    fn step() -> impl Strategy<Value = Step> {
        prop_oneof![
            Just(Step::Connect),
            Just(Step::Disconnect),
            Just(Step::Retry),
            Just(Step::Opened),
            Just(Step::OpenFailed),
            Just(Step::Closed),
            Just(Step::Error),
        ]
    }

    fn transport_event(step: &Step) -> Option<TransportEvent> {
        match step {
            Step::Opened => Some(TransportEvent::Opened),
            Step::OpenFailed => Some(TransportEvent::OpenFailed("refused".into())),
            Step::Closed => Some(TransportEvent::Closed),
            Step::Error => Some(TransportEvent::Error("reset".into())),
            _ => None,
        }
    }

    proptest! {
        #[test]
        fn emitted_statuses_follow_transition_table(steps in prop::collection::vec(step(), 0..64)) {
            let mut machine = machine();

            for step in &steps {
                let before = machine.state();
                let effects = match step {
                    Step::Connect => machine.connect(),
                    Step::Disconnect => machine.disconnect(),
                    Step::Retry => machine.retry_elapsed(),
                    other => {
                        let event = transport_event(other).unwrap();
                        let generation = machine.generation();
                        machine.on_transport_event(generation, &event)
                    }
                };
                let after = machine.state();
                let statuses = emitted(&effects);

                prop_assert!(statuses.len() <= 1);
                match statuses.first() {
                    Some(ConnectionStatus::Connected) => {
                        prop_assert_eq!(before, ConnectionState::Connecting);
                        prop_assert_eq!(after, ConnectionState::Connected);
                    }
                    Some(ConnectionStatus::Disconnected) => {
                        prop_assert_eq!(before, ConnectionState::Connected);
                        prop_assert!(matches!(after, ConnectionState::Disconnected | ConnectionState::Idle));
                    }
                    Some(ConnectionStatus::Error) => {
                        prop_assert!(before.is_active());
                        prop_assert_eq!(after, ConnectionState::Errored);
                    }
                    Some(ConnectionStatus::Connecting) => {
                        prop_assert!(false, "connecting is never emitted");
                    }
                    None => {
                        if before != after {
                            prop_assert!(
                                after == ConnectionState::Connecting || after == ConnectionState::Idle,
                                "silent transition {:?} -> {:?}", before, after
                            );
                        }
                    }
                }

                let scheduled = effects.iter().filter(|e| matches!(e, Effect::ScheduleRetry { .. })).count();
                prop_assert!(scheduled <= 1);
                if scheduled == 1 {
                    prop_assert!(machine.attempt() <= 5);
                    prop_assert!(matches!(after, ConnectionState::Disconnected | ConnectionState::Errored));
                }
            }
        }
    }
}
