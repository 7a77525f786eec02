//! Session contract and lifecycle
//!
//! - `Session` / `PublisherHandle` / `SessionFactory`: the real-time service
//! - `EventBus`: listener registry shared by session implementations
//! - `SessionManager`: connect once, disconnect once

mod bus;
mod manager;
mod transport;
mod types;

pub use bus::{EventBus, EventHandler};
pub use manager::SessionManager;
pub use transport::{PublisherHandle, Session, SessionFactory};
pub use types::{
    ConnectionId, EventKind, InsertMode, ListenerId, PublisherOptions, SessionEvent,
    SessionState, StreamId, StreamInfo, SubscriberOptions, SurfaceId,
};
