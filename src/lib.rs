pub mod call;
pub mod config;
pub mod error;
pub mod http;
pub mod nats;
pub mod session;
pub mod signal;
pub mod speech;

pub use call::{
    CallEvent, CallHandle, CallObserver, CallOptions, CallSession, CallState, CallView,
    ChatMessage, Command, Effect, LoggingObserver, Notice, Sender,
};
pub use config::Config;
pub use error::CallError;
pub use http::{create_router, AppState};
pub use nats::{NatsRecognizerProvider, NatsSession, NatsSessionFactory};
pub use session::{Session, SessionFactory, SessionManager};
pub use signal::{Signal, SignalKind};
pub use speech::{RecognizerProvider, SpeechRecognizer};
