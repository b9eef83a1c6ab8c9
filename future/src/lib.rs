//! Single-assignment futures with suspend-on-read.
//!
//! A [`Future`] is a placeholder for a value computed elsewhere, typically by
//! a network response handler. Reading it suspends the calling task (never
//! the thread) until the producer assigns a value:
//!
//! ```ignore
//! let (resolver, future) = retro_future::promise();
//! tokio::spawn(async move { resolver.resolve(compute().await) });
//! let value = future.read().await?;
//! ```
//!
//! # State machine
//!
//! ```text
//! Pending ──resolve──▶ Resolved(T)
//!    │
//!    └──fail / drop──▶ Failed(ChannelError)
//! ```
//!
//! The only writer is the [`Resolver`], and every write consumes it, so a
//! future is assigned at most once. A resolver dropped without assigning
//! publishes `Failed(Cancelled)`: a blocked reader is always woken.
//!
//! # Ordering
//!
//! Each reader waits on its own future. Readers resume in the order their
//! futures settle, regardless of the order the reads were started in.

use std::future::IntoFuture;
use std::time::Duration;

use futures_util::future::BoxFuture;
use tokio::sync::watch;

use retro_types::{ChannelError, FutureState};

/// Create a pending future together with the handle that settles it.
#[must_use]
pub fn promise<T>() -> (Resolver<T>, Future<T>) {
    let (tx, rx) = watch::channel(FutureState::Pending);
    (Resolver { tx }, Future { rx })
}

/// Read side of a single-assignment cell.
///
/// Cloning is cheap; every clone observes the same assignment.
#[derive(Debug)]
pub struct Future<T> {
    rx: watch::Receiver<FutureState<T>>,
}

impl<T> Clone for Future<T> {
    fn clone(&self) -> Self {
        Self {
            rx: self.rx.clone(),
        }
    }
}

impl<T> Future<T> {
    /// A future that is already resolved.
    #[must_use]
    pub fn ready(value: T) -> Self {
        let (_tx, rx) = watch::channel(FutureState::Resolved(value));
        Self { rx }
    }

    /// A future that has already failed.
    #[must_use]
    pub fn failed(error: ChannelError) -> Self {
        let (_tx, rx) = watch::channel(FutureState::Failed(error));
        Self { rx }
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.rx.borrow().is_pending()
    }

    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.rx.borrow().is_resolved()
    }

    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.rx.borrow().is_failed()
    }

    /// Whether `other` reads the same cell.
    #[must_use]
    pub fn same_cell(&self, other: &Self) -> bool {
        self.rx.same_channel(&other.rx)
    }
}

impl<T: Clone> Future<T> {
    /// Snapshot of the current state.
    #[must_use]
    pub fn state(&self) -> FutureState<T> {
        self.rx.borrow().clone()
    }

    /// The outcome if the future has settled; `None` while pending. Never
    /// suspends.
    #[must_use]
    pub fn try_read(&self) -> Option<Result<T, ChannelError>> {
        self.rx.borrow().outcome()
    }

    /// Suspend until the future settles and return its outcome.
    ///
    /// Returns immediately when the future is already settled.
    pub async fn read(&self) -> Result<T, ChannelError> {
        let mut rx = self.rx.clone();
        let outcome = match rx.wait_for(FutureState::is_terminal).await {
            Ok(state) => state.outcome(),
            // Sender gone while still pending. Resolver::drop publishes a
            // terminal state first, so this only happens for cells built by hand.
            Err(_) => None,
        };
        outcome.unwrap_or_else(|| Err(producer_dropped()))
    }

    /// Like [`read`](Self::read), but gives up after `limit`.
    ///
    /// Expiry fails this read with `Timeout`; the future itself stays pending
    /// and other readers keep waiting.
    pub async fn read_timeout(&self, limit: Duration) -> Result<T, ChannelError> {
        match tokio::time::timeout(limit, self.read()).await {
            Ok(outcome) => outcome,
            Err(_) => Err(ChannelError::timeout(format!(
                "read timed out after {}ms",
                limit.as_millis()
            ))),
        }
    }
}

impl<T> IntoFuture for Future<T>
where
    T: Clone + Send + Sync + 'static,
{
    type Output = Result<T, ChannelError>;
    type IntoFuture = BoxFuture<'static, Self::Output>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(async move { self.read().await })
    }
}

fn producer_dropped() -> ChannelError {
    ChannelError::cancelled("producer dropped before assigning a value")
}

/// Write side of a single-assignment cell.
///
/// Settling consumes the resolver. Dropping it unsettled fails the future
/// with `Cancelled`.
#[derive(Debug)]
pub struct Resolver<T> {
    tx: watch::Sender<FutureState<T>>,
}

impl<T> Resolver<T> {
    pub fn resolve(self, value: T) {
        self.publish(FutureState::Resolved(value));
    }

    pub fn fail(self, error: ChannelError) {
        self.publish(FutureState::Failed(error));
    }

    pub fn settle(self, outcome: Result<T, ChannelError>) {
        self.publish(outcome.into());
    }

    /// Another read handle on this cell.
    #[must_use]
    pub fn subscribe(&self) -> Future<T> {
        Future {
            rx: self.tx.subscribe(),
        }
    }

    #[must_use]
    pub fn has_readers(&self) -> bool {
        self.tx.receiver_count() > 0
    }

    /// Completes once every read handle has been dropped.
    pub async fn readers_gone(&self) {
        self.tx.closed().await;
    }

    /// Write `next` if the cell is still pending. Works with no live readers,
    /// so a handle subscribed later still sees the value.
    fn publish(&self, next: FutureState<T>) -> bool {
        self.tx.send_if_modified(move |state| {
            if !state.is_pending() {
                return false;
            }
            *state = next;
            true
        })
    }
}

impl<T> Drop for Resolver<T> {
    fn drop(&mut self) {
        if self.publish(FutureState::Failed(producer_dropped())) {
            tracing::trace!("resolver dropped while pending; future cancelled");
        }
    }
}
