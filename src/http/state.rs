use crate::call::CallHandle;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Mounted call screen; empty when there is no connected session
    pub call: Arc<RwLock<Option<CallHandle>>>,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            call: Arc::new(RwLock::new(None)),
        }
    }

    pub async fn attach(&self, call: CallHandle) {
        *self.call.write().await = Some(call);
    }

    pub async fn detach(&self) -> Option<CallHandle> {
        self.call.write().await.take()
    }

    pub async fn current(&self) -> Option<CallHandle> {
        self.call.read().await.clone()
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
