//! Event bus for broadcasting document patches

use crate::view::Patch;
use std::sync::Arc;
use tokio::sync::broadcast;

#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Arc<Patch>>,
}

impl EventBus {
    pub fn new(sender: broadcast::Sender<Arc<Patch>>) -> Self {
        Self { sender }
    }

    /// Bus with its own channel
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn publish(&self, patch: Patch) {
        let _ = self.sender.send(Arc::new(patch));
    }

    pub fn publish_all(&self, patches: Vec<Patch>) {
        for patch in patches {
            self.publish(patch);
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<Patch>> {
        self.sender.subscribe()
    }
}
