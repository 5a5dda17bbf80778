//! Structured events emitted by the request gate.
//!
//! Control flow never depends on these; observers only watch.

use super::identity::Identity;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateEvent {
    /// Emitted before every private-route check, whether or not it passes.
    PrivateRouteCheck {
        path: String,
        identity: Option<Identity>,
    },
    /// The sync endpoint answered 2xx and the validation cookie was written.
    SyncSucceeded { identity: Identity },
    /// The sync call could not be completed.
    SyncFailed { identity: Identity, error: String },
}

pub trait GateObserver: Send + Sync {
    fn on_event(&self, event: &GateEvent);
}

/// Forwards gate events to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl GateObserver for TracingObserver {
    fn on_event(&self, event: &GateEvent) {
        match event {
            GateEvent::PrivateRouteCheck { path, identity } => {
                tracing::error!(
                    path = %path,
                    has_identity = identity.is_some(),
                    "Private route requires a signed-in user"
                );
            }
            GateEvent::SyncSucceeded { identity } => {
                tracing::debug!(user_id = %identity, "User synced, validation cookie set");
            }
            GateEvent::SyncFailed { identity, error } => {
                tracing::error!(user_id = %identity, error = %error, "Error syncing user");
            }
        }
    }
}
