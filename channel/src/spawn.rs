use std::future::Future as StdFuture;

use futures_util::future::{AbortHandle, Abortable};
use tokio::runtime::Handle;

use retro_future::{Future, promise};
use retro_types::ChannelError;

/// Run `work` on the current tokio runtime and publish its outcome into a
/// new [`Future`].
///
/// Without a runtime the returned future is already `Failed(Cancelled)`.
pub fn spawn_request<T, F>(work: F) -> Future<T>
where
    T: Send + Sync + 'static,
    F: StdFuture<Output = Result<T, ChannelError>> + Send + 'static,
{
    match Handle::try_current() {
        Ok(handle) => spawn_abortable(&handle, work).0,
        Err(_) => Future::failed(no_runtime()),
    }
}

/// Like [`spawn_request`], on an explicit runtime handle, also returning
/// the handle that aborts the work.
///
/// An aborted request fails with `Cancelled`.
pub(crate) fn spawn_abortable<T, F>(handle: &Handle, work: F) -> (Future<T>, AbortHandle)
where
    T: Send + Sync + 'static,
    F: StdFuture<Output = Result<T, ChannelError>> + Send + 'static,
{
    let (resolver, future) = promise();
    let (abort_handle, abort_registration) = AbortHandle::new_pair();
    let work = Abortable::new(work, abort_registration);

    handle.spawn(async move {
        match work.await {
            Ok(outcome) => resolver.settle(outcome),
            Err(_aborted) => resolver.fail(ChannelError::cancelled("request aborted")),
        }
    });

    (future, abort_handle)
}

pub(crate) fn no_runtime() -> ChannelError {
    ChannelError::cancelled("no tokio runtime is running; cannot issue request")
}
