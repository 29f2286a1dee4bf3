//! Beacon delivery.
//!
//! ```text
//! Tracker ─→ Request ─→ Transport::deliver
//!                        ├─ SocketTransport    raw HTTP/1.0 over TCP, right away
//!                        └─ DeferredTransport  queue, flushed on drop
//! ```

pub mod deferred;
pub mod socket;

use std::sync::Arc;

use crate::error::Result;
use crate::request::Request;

pub use deferred::DeferredTransport;
pub use socket::SocketTransport;

/// Sends rendered beacons to a collector.
pub trait Transport: Send + Sync {
    /// Send one request. Returns the raw response text, or `None` when the
    /// response was not read (fire-and-forget, or queued for later).
    fn deliver(&self, request: &Request) -> Result<Option<String>>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn deliver(&self, request: &Request) -> Result<Option<String>> {
        (**self).deliver(request)
    }
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn deliver(&self, request: &Request) -> Result<Option<String>> {
        (**self).deliver(request)
    }
}
