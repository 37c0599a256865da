use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;

/// Shared online/offline flag.
///
/// Besides the flag itself, every offline-to-online transition bumps a
/// reconnect counter. Watchers follow the counter rather than the flag, so
/// a quick online-then-offline flap is still seen as a reconnect.
#[derive(Debug, Clone)]
pub struct Connectivity {
    online: Arc<watch::Sender<bool>>,
    reconnects: Arc<watch::Sender<u64>>,
}

impl Connectivity {
    pub fn new(online: bool) -> Self {
        let (online, _rx) = watch::channel(online);
        let (reconnects, _rx) = watch::channel(0);
        Self {
            online: Arc::new(online),
            reconnects: Arc::new(reconnects),
        }
    }

    pub fn is_online(&self) -> bool {
        *self.online.borrow()
    }

    /// Update the flag. Returns true when this changed the state.
    pub fn set_online(&self, online: bool) -> bool {
        let changed = self.online.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        });
        if changed {
            if online {
                self.reconnects.send_modify(|count| *count += 1);
            }
            info!(online, "Connectivity changed");
        }
        changed
    }

    /// Receiver for the reconnect counter; `changed()` fires after at least
    /// one offline-to-online transition since the last read.
    pub fn reconnects(&self) -> watch::Receiver<u64> {
        self.reconnects.subscribe()
    }
}

impl Default for Connectivity {
    fn default() -> Self {
        Self::new(true)
    }
}
