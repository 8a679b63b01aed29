use bytes::BytesMut;
use tokio::{sync::oneshot, task::AbortHandle};

use crate::{
    body::Body,
    error::Error,
    http::Uri,
    proto::{BodySink, ResponseParser},
    request::Request,
    response::Response,
    transport::{SocketId, Target},
};

use super::RequestId;

pub(crate) type Responder = oneshot::Sender<Result<Response, Error>>;

/// Where a request is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Phase {
    /// Defaults and framing headers are being derived.
    Normalizing,
    /// Waiting for the host name lookup.
    Resolving,
    /// Waiting in the pending queue for a socket.
    Queued,
    /// A new socket is connecting.
    Connecting,
    /// Request head written, waiting for it to drain.
    SendingHeaders,
    /// Waiting for `100 Continue` or the continue delay.
    ContinueWait,
    /// Request body is being written.
    SendingBody,
    /// Request fully written, reading the response.
    AwaitResponse,
    /// Response complete, its body is decoded on a blocking thread.
    Decoding,
}

impl Phase {
    /// Returns `true` if the request body may not be completely written yet.
    pub(crate) fn is_sending(self) -> bool {
        matches!(self, Self::SendingHeaders | Self::ContinueWait | Self::SendingBody)
    }
}

/// Timer kinds a cycle can arm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TimerKind {
    Transfer,
    Continue,
}

/// State of one request, kept across redirects.
#[derive(Debug)]
pub(crate) struct Cycle {
    pub(crate) id: RequestId,
    pub(crate) request: Request,
    responder: Option<Responder>,
    pub(crate) phase: Phase,
    /// Bumped on every exchange, stale timer and lookup results carry an older value.
    pub(crate) generation: u64,
    pub(crate) authority: String,
    pub(crate) target: Option<Target>,
    pub(crate) socket: Option<SocketId>,
    /// Body being written, taken out of the request once the exchange starts.
    pub(crate) body: Body,
    /// Copy of a buffered body to resend on redirect.
    pub(crate) body_copy: Option<Body>,
    /// Writes queued on the socket and not drained yet.
    pub(crate) outstanding: usize,
    /// Stream body bytes written so far, checked against the declared length.
    pub(crate) body_sent: u64,
    pub(crate) parser: Option<ResponseParser>,
    pub(crate) buffer: BytesMut,
    pub(crate) head: Option<Response>,
    pub(crate) sink: Option<BodySink>,
    /// The socket cannot be reused after this exchange.
    pub(crate) force_close: bool,
    pub(crate) history: Vec<Uri>,
    pub(crate) previous: Option<Response>,
    timers: Vec<(TimerKind, AbortHandle)>,
}

impl Cycle {
    pub(crate) fn new(id: RequestId, request: Request, responder: Responder) -> Self {
        Self {
            id,
            request,
            responder: Some(responder),
            phase: Phase::Normalizing,
            generation: 0,
            authority: String::new(),
            target: None,
            socket: None,
            body: Body::Empty,
            body_copy: None,
            outstanding: 0,
            body_sent: 0,
            parser: None,
            buffer: BytesMut::new(),
            head: None,
            sink: None,
            force_close: false,
            history: Vec::new(),
            previous: None,
            timers: Vec::new(),
        }
    }

    pub(crate) fn add_timer(&mut self, kind: TimerKind, handle: AbortHandle) {
        self.timers.push((kind, handle));
    }

    pub(crate) fn cancel_timer(&mut self, kind: TimerKind) {
        self.timers.retain(|(timer, handle)| {
            if *timer == kind {
                handle.abort();
            }
            *timer != kind
        });
    }

    pub(crate) fn cancel_timers(&mut self) {
        for (_, handle) in self.timers.drain(..) {
            handle.abort();
        }
    }

    /// Reset exchange state for the next hop of a redirect.
    pub(crate) fn reset_exchange(&mut self) {
        self.cancel_timers();
        self.generation += 1;
        self.target = None;
        self.socket = None;
        self.body = Body::Empty;
        self.outstanding = 0;
        self.body_sent = 0;
        self.parser = None;
        self.buffer.clear();
        self.head = None;
        self.sink = None;
        self.force_close = false;
    }

    /// Resolve the request future, at most once.
    pub(crate) fn respond(&mut self, result: Result<Response, Error>) {
        self.cancel_timers();
        if let Some(responder) = self.responder.take() {
            let _ = responder.send(result);
        }
    }
}

impl Drop for Cycle {
    fn drop(&mut self) {
        self.cancel_timers();
    }
}
