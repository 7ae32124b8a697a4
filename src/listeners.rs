/// file: src/listeners.rs
/// description: ordered subscriber registry with token-based removal and isolated dispatch
use parking_lot::Mutex;
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::error;

// Shared across registries so a token from one channel never matches another.
static NEXT_LISTENER_ID: AtomicU64 = AtomicU64::new(1);

/// Subscription token returned by `add`, required for removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Outcome of one notification pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub delivered: usize,
    pub failed: usize,
}

pub struct ListenerRegistry<T> {
    channel: &'static str,
    entries: Mutex<Vec<(ListenerId, Callback<T>)>>,
}

impl<T> ListenerRegistry<T> {
    pub fn new(channel: &'static str) -> Self {
        Self {
            channel,
            entries: Mutex::new(Vec::new()),
        }
    }

    pub fn add<F>(&self, callback: F) -> ListenerId
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = ListenerId(NEXT_LISTENER_ID.fetch_add(1, Ordering::Relaxed));
        self.entries.lock().push((id, Arc::new(callback)));
        id
    }

    /// Removes a listener. Unknown ids are ignored and reported as `false`.
    pub fn remove(&self, id: ListenerId) -> bool {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|(entry_id, _)| *entry_id != id);
        entries.len() != before
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Calls every listener registered when the pass starts, in insertion order.
    ///
    /// The registry is snapshotted and unlocked before the first call, so
    /// callbacks may add or remove listeners; those changes apply from the next
    /// pass. A panicking listener is logged and skipped.
    pub fn notify(&self, event: &T) -> DispatchReport {
        let snapshot: Vec<(ListenerId, Callback<T>)> = self.entries.lock().clone();
        let mut report = DispatchReport::default();

        for (id, callback) in snapshot {
            match panic::catch_unwind(AssertUnwindSafe(|| callback(event))) {
                Ok(()) => report.delivered += 1,
                Err(payload) => {
                    report.failed += 1;
                    error!(
                        channel = self.channel,
                        listener = %id,
                        "Listener panicked: {}",
                        panic_message(payload.as_ref())
                    );
                }
            }
        }
        report
    }
}

impl<T> fmt::Debug for ListenerRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("channel", &self.channel)
            .field("listeners", &self.len())
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}
