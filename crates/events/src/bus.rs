//! Publish/subscribe seam between the write path and its listeners.
//!
//! Delivery is best-effort fan-out. The store is the source of truth, so a
//! listener that falls behind or starts late re-reads state instead of
//! replaying history.

use std::sync::Arc;
use std::sync::mpsc::Receiver;

/// One listener's queue of published messages.
///
/// Sees only what was published after it subscribed, in publish order.
/// Meant to be consumed from a single thread.
#[derive(Debug)]
pub struct Subscription<M> {
    receiver: Receiver<M>,
}

impl<M> Subscription<M> {
    pub fn new(receiver: Receiver<M>) -> Self {
        Self { receiver }
    }

    /// Next queued message, if any, without blocking.
    pub fn try_next(&self) -> Option<M> {
        self.receiver.try_recv().ok()
    }

    /// Everything queued right now.
    pub fn drain(&self) -> Vec<M> {
        self.receiver.try_iter().collect()
    }

    /// Blocking iterator; ends once the bus is dropped.
    pub fn iter(&self) -> impl Iterator<Item = M> + '_ {
        self.receiver.iter()
    }
}

/// Fan-out of committed changes.
///
/// Called only after the change is durable. A failed publish is reported to
/// the caller but never undoes the change.
pub trait EventBus<M>: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    fn publish(&self, message: M) -> Result<(), Self::Error>;

    fn subscribe(&self) -> Subscription<M>;
}

impl<M, B> EventBus<M> for Arc<B>
where
    B: EventBus<M> + ?Sized,
{
    type Error = B::Error;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        <B as EventBus<M>>::publish(self, message)
    }

    fn subscribe(&self) -> Subscription<M> {
        <B as EventBus<M>>::subscribe(self)
    }
}
