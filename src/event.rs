//! Lifecycle events and their observers.
//!
//! Observers are notified synchronously from the engine task, in registration order, with the
//! head of the request the event belongs to.
use bytes::Bytes;

use crate::{error::Error, http::Uri, request::Request, response::Response};

/// Lifecycle event of a request.
#[derive(Debug)]
#[non_exhaustive]
pub enum Event<'a> {
    /// The normalized request entered the engine.
    Request,
    /// A socket was assigned to the request.
    Socket {
        authority: &'a str,
        /// `true` if the socket was idle in the pool.
        reused: bool,
    },
    /// Final response status line and headers were received.
    Headers(&'a Response),
    /// Response body bytes, after transfer decoding.
    BodyData(&'a Bytes),
    /// The request was cancelled.
    Cancel,
    /// The request completed with this response.
    Response(&'a Response),
    /// A redirect response is being followed to `location`.
    Redirect {
        response: &'a Response,
        location: &'a Uri,
    },
    /// The request failed, with the response head if one was received.
    Error {
        response: Option<&'a Response>,
        error: &'a Error,
    },
    /// Raw bytes written to the socket.
    DataOut(&'a [u8]),
    /// Raw bytes read from the socket.
    DataIn(&'a [u8]),
}

/// Receives lifecycle events.
///
/// Implemented for any `FnMut(&Request, &Event)` closure.
pub trait Observer: Send {
    fn observe(&mut self, request: &Request, event: &Event<'_>);
}

impl<F> Observer for F
where
    F: FnMut(&Request, &Event<'_>) + Send,
{
    #[inline]
    fn observe(&mut self, request: &Request, event: &Event<'_>) {
        self(request, event)
    }
}

/// Handle returned when registering an [`Observer`], used to remove it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObservationId(pub(crate) u64);

/// Registered observers.
#[derive(Default)]
pub(crate) struct Observers {
    list: Vec<(ObservationId, Box<dyn Observer>)>,
}

impl Observers {
    pub(crate) fn add(&mut self, id: ObservationId, observer: Box<dyn Observer>) {
        self.list.push((id, observer));
    }

    pub(crate) fn remove(&mut self, id: ObservationId) -> bool {
        let len = self.list.len();
        self.list.retain(|(observation, _)| *observation != id);
        self.list.len() != len
    }

    pub(crate) fn clear(&mut self) {
        self.list.clear();
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub(crate) fn notify(&mut self, request: &Request, event: &Event<'_>) {
        for (_, observer) in &mut self.list {
            observer.observe(request, event);
        }
    }
}

impl std::fmt::Debug for Observers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observers").field("len", &self.list.len()).finish()
    }
}
