//! Event publishing/subscription abstraction (mechanics only).
//!
//! The bus is intentionally lightweight: transport-agnostic, at-least-once,
//! no persistence (the event store is the source of truth). Consumers must be
//! idempotent.

use std::sync::Arc;
use std::sync::mpsc::Receiver;
use std::time::Duration;

/// A subscription to an event stream.
///
/// Each subscription receives a copy of every message published to the bus
/// (broadcast semantics). Designed for single-threaded consumption.
pub struct Subscription<M> {
    rx: Receiver<M>,
}

impl<M> Subscription<M> {
    pub fn new(rx: Receiver<M>) -> Self {
        Self { rx }
    }

    /// Block until the next message arrives or the bus is dropped.
    pub fn recv(&self) -> Result<M, std::sync::mpsc::RecvError> {
        self.rx.recv()
    }

    /// Block with a timeout (allows shutdown checks in consumer loops).
    pub fn recv_timeout(
        &self,
        timeout: Duration,
    ) -> Result<M, std::sync::mpsc::RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }

    /// Non-blocking receive.
    pub fn try_recv(&self) -> Result<M, std::sync::mpsc::TryRecvError> {
        self.rx.try_recv()
    }
}

/// Publish/subscribe bus for event distribution.
pub trait EventBus<M>: Send + Sync {
    type Error: core::fmt::Debug;

    /// Publish a message to all current subscribers (best-effort fan-out).
    fn publish(&self, message: M) -> Result<(), Self::Error>;

    /// Create a new subscription receiving all subsequently published messages.
    fn subscribe(&self) -> Subscription<M>;
}

impl<M, B> EventBus<M> for Arc<B>
where
    B: EventBus<M> + ?Sized,
{
    type Error = B::Error;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        (**self).publish(message)
    }

    fn subscribe(&self) -> Subscription<M> {
        (**self).subscribe()
    }
}
