//! Keyed asynchronous channels.
//!
//! An [`AsyncChannel`] turns `get(key)` into an immediately returned
//! [`retro_future::Future`] whose value arrives when the transport answers.
//! [`EventLoop`] hosts the lightweight threads that read those futures.

mod channel;
mod event_loop;
mod spawn;

pub use channel::{AsyncChannel, ChannelOptions};
pub use event_loop::EventLoop;
pub use spawn::spawn_request;
