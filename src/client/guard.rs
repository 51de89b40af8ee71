use tracing::debug;

use crate::client::ConnectionId;
use crate::hub::HubHandle;

/// Requests Leave for a connection exactly once.
///
/// The guard is armed right after the connection joined and is released
/// either explicitly with [`LeaveGuard::release`] or implicitly on drop, so
/// every exit path of the connection task (orderly close, read error, write
/// error, panic) ends in a single Leave.
#[derive(Debug)]
pub struct LeaveGuard {
    id: ConnectionId,
    hub: Option<HubHandle>,
}

impl LeaveGuard {
    pub fn new(id: ConnectionId, hub: HubHandle) -> Self {
        Self { id, hub: Some(hub) }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Issues the Leave now. Later calls and the eventual drop do nothing.
    pub fn release(&mut self) {
        if let Some(hub) = self.hub.take() {
            // A stopped hub already closed every queue.
            if hub.leave(self.id.clone()).is_err() {
                debug!(connection_id = %self.id, "hub closed before leave");
            }
        }
    }

    pub fn is_released(&self) -> bool {
        self.hub.is_none()
    }
}

impl Drop for LeaveGuard {
    fn drop(&mut self) {
        self.release();
    }
}
