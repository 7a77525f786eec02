use super::types::{EventKind, ListenerId, SessionEvent};
use crate::signal::{RawSignal, Signal, SignalEvent};
use crate::session::ConnectionId;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Callback invoked for each matching session event
pub type EventHandler = Arc<dyn Fn(SessionEvent) + Send + Sync>;

/// Listener registry shared by `Session` implementations.
///
/// Every registration gets its own `ListenerId`, so two registrations for the
/// same event name are removed independently.
#[derive(Default)]
pub struct EventBus {
    next_id: AtomicU64,
    listeners: Mutex<Vec<(ListenerId, EventKind, EventHandler)>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(&self, kind: EventKind, handler: EventHandler) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.lock().push((id, kind, handler));
        debug!("Registered listener {:?} for {}", id, kind);
        id
    }

    /// Remove one listener. Returns false if it was not registered.
    pub fn off(&self, id: ListenerId) -> bool {
        let mut listeners = self.lock();
        let before = listeners.len();
        listeners.retain(|(listener, _, _)| *listener != id);
        before != listeners.len()
    }

    /// Number of listeners registered for `kind`
    pub fn count(&self, kind: EventKind) -> usize {
        self.lock().iter().filter(|(_, k, _)| *k == kind).count()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver an event to every listener registered for its kind.
    /// Returns how many listeners were called.
    pub fn dispatch(&self, event: SessionEvent) -> usize {
        let kind = event.kind();
        // Handlers run outside the lock so they may register or remove listeners
        let handlers: Vec<EventHandler> = self
            .lock()
            .iter()
            .filter(|(_, k, _)| *k == kind)
            .map(|(_, _, handler)| Arc::clone(handler))
            .collect();

        for handler in &handlers {
            handler(event.clone());
        }
        handlers.len()
    }

    /// Decode a transport signal and dispatch it. Unknown signal types are dropped.
    pub fn dispatch_raw_signal(&self, raw: RawSignal, from: ConnectionId) -> usize {
        match Signal::decode(raw) {
            Ok(signal) => self.dispatch(SessionEvent::Signal(SignalEvent { signal, from })),
            Err(e) => {
                debug!("Dropping signal: {}", e);
                0
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(ListenerId, EventKind, EventHandler)>> {
        self.listeners.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
