//! Online/offline tracking.

use tokio::sync::watch;
use tracing::info;

use crate::runtime::SyncTrigger;

/// Tracks connectivity and requests a sync when it comes back.
#[derive(Debug)]
pub struct ConnectivityMonitor {
    online_tx: watch::Sender<bool>,
    trigger: Option<SyncTrigger>,
}

impl ConnectivityMonitor {
    pub fn new(initially_online: bool) -> Self {
        let (online_tx, _) = watch::channel(initially_online);
        Self {
            online_tx,
            trigger: None,
        }
    }

    /// Fires `trigger` on every offline to online transition.
    pub fn with_trigger(mut self, trigger: SyncTrigger) -> Self {
        self.trigger = Some(trigger);
        self
    }

    pub fn is_online(&self) -> bool {
        *self.online_tx.borrow()
    }

    /// Records the current connectivity. Returns true if it changed.
    pub fn set_online(&self, online: bool) -> bool {
        let was_online = self.online_tx.send_replace(online);
        if was_online == online {
            return false;
        }

        if online {
            info!("connectivity restored");
            if let Some(trigger) = &self.trigger {
                trigger.request();
            }
        } else {
            info!("connectivity lost");
        }
        true
    }

    /// Watch connectivity changes.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.online_tx.subscribe()
    }
}

impl Default for ConnectivityMonitor {
    fn default() -> Self {
        Self::new(true)
    }
}
