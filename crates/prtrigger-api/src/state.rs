//! Application state.

use prtrigger_scheduler::EventIntake;
use std::sync::Arc;

/// Where scheduler state lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Storage {
    Postgres,
    /// Single-node mode, state is lost on restart.
    Memory,
}

impl Storage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Storage::Postgres => "postgres",
            Storage::Memory => "memory",
        }
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub intake: Arc<EventIntake>,
    pub node_id: Arc<str>,
    pub storage: Storage,
    /// Shared secret for webhook signatures. `None` disables the check.
    pub webhook_secret: Option<Arc<str>>,
}

impl AppState {
    pub fn new(intake: EventIntake, node_id: impl Into<Arc<str>>, storage: Storage) -> Self {
        Self {
            intake: Arc::new(intake),
            node_id: node_id.into(),
            storage,
            webhook_secret: None,
        }
    }

    pub fn with_webhook_secret(mut self, secret: impl Into<Arc<str>>) -> Self {
        self.webhook_secret = Some(secret.into());
        self
    }
}
