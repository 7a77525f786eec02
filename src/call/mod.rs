//! Call screen coordination
//!
//! This module provides the pieces that keep one participant's call screen
//! consistent with the session:
//! - `CallState`: pure reducer over `CallEvent`s producing `Effect`s
//! - Local publisher toggles, caption pipeline and display, chat panels,
//!   remote stream surfaces
//! - `CallSession`: runtime owning the publisher, recognizer and listeners

mod captions;
mod chat;
mod event;
mod remote;
mod runtime;
mod state;
mod view;

pub use captions::{CaptionDisplay, CaptionPhase, CAPTION_DISPLAY};
pub use chat::{ChatLog, ChatMessage, Sender};
pub use event::{CallEvent, Command, Effect, Notice};
pub use remote::{RemoteStatus, RemoteStreams, RemoteView};
pub use runtime::{CallHandle, CallObserver, CallOptions, CallSession, LoggingObserver};
pub use state::{CallState, MediaFlags};
pub use view::{CallView, Preview};
