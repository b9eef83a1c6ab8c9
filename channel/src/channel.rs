//! Keyed request registry.

use std::collections::HashMap;
use std::fmt;
use std::future::Future as StdFuture;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use futures_util::future::AbortHandle;
use serde_json::Value;
use tokio::runtime::Handle;

use retro_future::Future;
use retro_transport::Transport;
use retro_types::{ChannelError, DedupPolicy, RequestId, RequestKey};

use crate::spawn::{no_runtime, spawn_abortable};

/// Per-channel behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChannelOptions {
    pub dedup: DedupPolicy,
    /// Fail a request with `Timeout` if the transport has not answered by
    /// then. `None` waits for the transport's own limits.
    pub request_timeout: Option<Duration>,
}

impl ChannelOptions {
    #[must_use]
    pub fn with_dedup(mut self, dedup: DedupPolicy) -> Self {
        self.dedup = dedup;
        self
    }

    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }
}

struct InFlight {
    key: RequestKey,
    future: Future<Value>,
    abort: AbortHandle,
}

#[derive(Default)]
struct Registry {
    next_id: RequestId,
    requests: HashMap<RequestId, InFlight>,
    /// Request that a `get` under `Share` joins, per key.
    shared: HashMap<RequestKey, RequestId>,
    closed: bool,
}

impl Registry {
    fn allocate_id(&mut self) -> RequestId {
        let id = self.next_id;
        self.next_id = id.next();
        id
    }

    fn joinable(&self, key: &RequestKey) -> Option<(RequestId, Future<Value>)> {
        let id = *self.shared.get(key)?;
        let entry = self.requests.get(&id)?;
        entry.future.is_pending().then(|| (id, entry.future.clone()))
    }

    fn insert(&mut self, id: RequestId, entry: InFlight, share: bool) {
        if share {
            self.shared.insert(entry.key.clone(), id);
        }
        self.requests.insert(id, entry);
    }

    /// Forget `id`. The key slot is only cleared while it still points at
    /// this request.
    fn finish(&mut self, id: RequestId) {
        let Some(entry) = self.requests.remove(&id) else {
            return;
        };
        if self.shared.get(&entry.key) == Some(&id) {
            self.shared.remove(&entry.key);
        }
    }

    fn drain(&mut self) -> Vec<InFlight> {
        self.shared.clear();
        self.requests.drain().map(|(_, entry)| entry).collect()
    }
}

/// Issues keyed GET requests and hands out futures for their values.
///
/// `get` never suspends: it starts the request (or joins one already in
/// flight for the key) and returns immediately. Reading the future is the
/// suspension point.
pub struct AsyncChannel<T: Transport> {
    transport: Arc<T>,
    options: ChannelOptions,
    registry: Arc<Mutex<Registry>>,
}

impl<T: Transport> AsyncChannel<T> {
    #[must_use]
    pub fn new(transport: Arc<T>, options: ChannelOptions) -> Self {
        Self {
            transport,
            options,
            registry: Arc::new(Mutex::new(Registry::default())),
        }
    }

    #[must_use]
    pub fn options(&self) -> &ChannelOptions {
        &self.options
    }

    #[must_use]
    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    /// Request the value for `key`.
    ///
    /// Must be called from within a tokio runtime. Otherwise, and after
    /// [`close`](Self::close), the returned future is already
    /// `Failed(Cancelled)`.
    pub fn get(&self, key: &RequestKey) -> Future<Value> {
        let Ok(handle) = Handle::try_current() else {
            tracing::warn!(key = %key, "get called outside a tokio runtime");
            return Future::failed(no_runtime());
        };

        let share = self.options.dedup.shares_inflight();
        // Held across the spawn so the completion path cannot run before the
        // entry exists.
        let mut registry = lock(&self.registry);
        if registry.closed {
            return Future::failed(ChannelError::cancelled("channel is closed"));
        }
        if share && let Some((id, future)) = registry.joinable(key) {
            tracing::trace!(request_id = %id, key = %key, "joining in-flight request");
            return future;
        }

        let id = registry.allocate_id();
        let work = self.request_work(id, key.clone());
        let (future, abort) = spawn_abortable(&handle, work);
        tracing::debug!(request_id = %id, key = %key, "request issued");

        registry.insert(
            id,
            InFlight {
                key: key.clone(),
                future: future.clone(),
                abort,
            },
            share,
        );
        future
    }

    /// [`get`](Self::get) with an unvalidated key. An invalid key yields a
    /// failed future.
    pub fn get_str(&self, key: &str) -> Future<Value> {
        match RequestKey::new(key) {
            Ok(key) => self.get(&key),
            Err(err) => Future::failed(ChannelError::protocol(err.to_string())),
        }
    }

    /// Issue every key before returning; futures are in `keys` order.
    pub fn get_many<'a, I>(&self, keys: I) -> Vec<Future<Value>>
    where
        I: IntoIterator<Item = &'a RequestKey>,
    {
        keys.into_iter().map(|key| self.get(key)).collect()
    }

    /// Keys with a request still in flight, sorted.
    #[must_use]
    pub fn pending_keys(&self) -> Vec<RequestKey> {
        let registry = lock(&self.registry);
        let mut keys: Vec<RequestKey> = registry
            .requests
            .values()
            .map(|entry| entry.key.clone())
            .collect();
        keys.sort();
        keys.dedup();
        keys
    }

    /// Number of requests in flight.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        lock(&self.registry).requests.len()
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        lock(&self.registry).closed
    }

    /// Abort every in-flight request and refuse new ones.
    ///
    /// Readers of aborted requests observe `Failed(Cancelled)`.
    pub fn close(&self) {
        let aborted = {
            let mut registry = lock(&self.registry);
            registry.closed = true;
            registry.drain()
        };
        if !aborted.is_empty() {
            tracing::debug!(count = aborted.len(), "aborting in-flight requests");
        }
        for entry in aborted {
            entry.abort.abort();
        }
    }

    fn request_work(
        &self,
        id: RequestId,
        key: RequestKey,
    ) -> impl StdFuture<Output = Result<Value, ChannelError>> + Send + use<T> {
        let transport = Arc::clone(&self.transport);
        let registry = Arc::clone(&self.registry);
        let limit = self.options.request_timeout;

        async move {
            let started = Instant::now();
            let outcome = match limit {
                Some(limit) => tokio::time::timeout(limit, transport.fetch(&key))
                    .await
                    .unwrap_or_else(|_| {
                        Err(ChannelError::timeout(format!(
                            "request for {key} timed out after {}ms",
                            limit.as_millis()
                        )))
                    }),
                None => transport.fetch(&key).await,
            };
            lock(&registry).finish(id);

            let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
            match &outcome {
                Ok(_) => {
                    tracing::debug!(request_id = %id, key = %key, elapsed_ms, "request resolved");
                }
                Err(err) => {
                    tracing::warn!(
                        request_id = %id,
                        key = %key,
                        elapsed_ms,
                        code = %err.code,
                        status = err.status,
                        "request failed: {}",
                        err.message
                    );
                }
            }
            outcome
        }
    }
}

impl<T: Transport> Drop for AsyncChannel<T> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<T: Transport> fmt::Debug for AsyncChannel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncChannel")
            .field("options", &self.options)
            .field("in_flight", &self.in_flight())
            .finish_non_exhaustive()
    }
}

fn lock(registry: &Mutex<Registry>) -> MutexGuard<'_, Registry> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}
