use super::transport::{Session, SessionFactory};
use super::types::SessionState;
use crate::config::CallConfig;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Owns the single session handle for the lifetime of the call screen.
///
/// Dependents only ever see the session after a successful connect. The
/// session is disconnected exactly once on shutdown, whether or not the
/// connect succeeded.
pub struct SessionManager {
    factory: Arc<dyn SessionFactory>,
    credentials: CallConfig,
    session: Option<Arc<dyn Session>>,
    connected: bool,
    shut_down: bool,
}

impl SessionManager {
    pub fn new(factory: Arc<dyn SessionFactory>, credentials: CallConfig) -> Self {
        Self {
            factory,
            credentials,
            session: None,
            connected: false,
            shut_down: false,
        }
    }

    /// Initialise the session and connect with the configured token.
    ///
    /// Returns the connected session, or `None` if the connect failed. There
    /// is no retry.
    pub async fn connect(&mut self) -> Option<Arc<dyn Session>> {
        if self.shut_down {
            warn!("Session manager already shut down");
            return None;
        }
        if let Some(session) = self.session() {
            return Some(session);
        }
        if self.session.is_some() {
            warn!("Session already initialised and not connected");
            return None;
        }

        let session = self
            .factory
            .init_session(&self.credentials.api_key, &self.credentials.session_id);
        self.session = Some(Arc::clone(&session));

        info!("Connecting to session {}", self.credentials.session_id);

        match session.connect(&self.credentials.token).await {
            Ok(connection_id) => {
                info!("Connected to session as {}", connection_id);
                self.connected = true;
                Some(session)
            }
            Err(e) => {
                error!("Connect error: {}", e);
                None
            }
        }
    }

    /// The connected session, if any
    pub fn session(&self) -> Option<Arc<dyn Session>> {
        if self.connected {
            self.session.clone()
        } else {
            None
        }
    }

    pub fn lifecycle(&self) -> SessionState {
        match &self.session {
            Some(session) => session.state(),
            None => SessionState::Disconnected,
        }
    }

    /// Disconnect the session. Only the first call does anything.
    pub async fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;
        self.connected = false;

        if let Some(session) = self.session.take() {
            info!("Disconnecting session {}", session.session_id());
            session.disconnect().await;
        }
    }
}
