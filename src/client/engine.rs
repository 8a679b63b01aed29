//! Request lifecycle engine.
//!
//! The engine is a single task owning every cycle, the pending queue, the connection pool, and
//! the observers. It reacts to messages from three channels: commands from [`Client`] handles,
//! internal notices (normalization, host lookup, and timers), and socket events.
//!
//! [`Client`]: super::Client
use bytes::{Bytes, BytesMut};
use std::{
    collections::{HashMap, VecDeque},
    future::Future,
    io,
    net::SocketAddr,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll, Waker},
    time::Duration,
};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

#[cfg(feature = "gzip")]
use super::inflate::inflate;
use super::{
    RequestId,
    cycle::{Cycle, Phase, Responder, TimerKind},
};
use crate::{
    body::Body,
    common::ParseResult,
    config::Options,
    error::Error,
    event::{Event, ObservationId, Observer, Observers},
    headers::{
        HeaderValue,
        standard::{
            CONNECTION, CONTENT_ENCODING, CONTENT_LENGTH, EXPECT, HOST, LOCATION, REFERER,
            TRANSFER_ENCODING,
        },
    },
    http::{StatusCode, Uri, Version},
    log::{debug, trace, warning},
    normalize::{GZIP_SUPPORT, normalize},
    pool::ConnectionPool,
    proto::{BodySink, Frame, Limits, ResponseParser, encode_head},
    request::Request,
    response::{Response, ResponseBody},
    transport::{Connector, EventRx, EventTx, SocketError, SocketEvent, SocketId, Target},
};

/// Message from a [`Client`][super::Client] handle.
pub(crate) enum Command {
    Submit {
        id: RequestId,
        request: Request,
        tx: Responder,
    },
    Cancel(RequestId),
    CancelAll,
    Configure(Box<Options>),
    Observe(ObservationId, Box<dyn Observer>),
    RemoveObservation(ObservationId),
    RemoveAllObservations,
}

/// Result of work the engine spawned.
enum Notice {
    Normalized {
        id: RequestId,
        result: Result<Request, Error>,
    },
    Resolved {
        id: RequestId,
        generation: u64,
        result: io::Result<Vec<SocketAddr>>,
    },
    Timer {
        id: RequestId,
        generation: u64,
        kind: TimerKind,
    },
    Decoded {
        id: RequestId,
        generation: u64,
        result: Result<ResponseBody, Error>,
    },
}

pub(crate) struct Engine<C> {
    options: Arc<Options>,
    commands: UnboundedReceiver<Command>,
    accepting: bool,
    notice_tx: UnboundedSender<Notice>,
    notices: UnboundedReceiver<Notice>,
    event_tx: EventTx,
    events: EventRx,
    cycles: HashMap<RequestId, Cycle>,
    /// Cycles waiting for a socket, in submission order.
    pending: VecDeque<RequestId>,
    /// Cycles bound to a socket.
    active: HashMap<SocketId, RequestId>,
    pool: ConnectionPool<C>,
    observers: Observers,
    needs_assign: bool,
    waker: Waker,
}

impl<C: Connector> Engine<C> {
    pub(crate) fn new(options: Options, connector: C, commands: UnboundedReceiver<Command>) -> Self {
        let (notice_tx, notices) = mpsc::unbounded_channel();
        let (event_tx, events) = mpsc::unbounded_channel();
        Self {
            pool: ConnectionPool::new(connector, &options),
            options: Arc::new(options),
            commands,
            accepting: true,
            notice_tx,
            notices,
            event_tx,
            events,
            cycles: HashMap::new(),
            pending: VecDeque::new(),
            active: HashMap::new(),
            observers: Observers::default(),
            needs_assign: false,
            waker: Waker::noop().clone(),
        }
    }

    // ===== Commands =====

    fn on_command(&mut self, command: Command) {
        match command {
            Command::Submit { id, request, tx } => self.submit(id, request, tx),
            Command::Cancel(id) => self.cancel(id),
            Command::CancelAll => {
                let mut ids: Vec<_> = self.cycles.keys().copied().collect();
                ids.sort_unstable();
                for id in ids {
                    self.cancel(id);
                }
            }
            Command::Configure(options) => {
                debug!("options updated");
                self.pool.configure(&options);
                self.options = Arc::new(*options);
            }
            Command::Observe(id, observer) => self.observers.add(id, observer),
            Command::RemoveObservation(id) => {
                self.observers.remove(id);
            }
            Command::RemoveAllObservations => self.observers.clear(),
        }
    }

    fn submit(&mut self, id: RequestId, request: Request, tx: Responder) {
        debug!("request {id} submitted: {} {}", request.method(), request.uri());
        self.cycles.insert(id, Cycle::new(id, request.head(), tx));

        let options = self.options.clone();
        let notice_tx = self.notice_tx.clone();
        tokio::spawn(async move {
            let result = normalize(request, &options).await;
            let _ = notice_tx.send(Notice::Normalized { id, result });
        });
    }

    fn cancel(&mut self, id: RequestId) {
        let Some(mut cycle) = self.cycles.remove(&id) else {
            return;
        };
        debug!("request {id} cancelled");
        self.pending.retain(|pending| *pending != id);
        self.release(&mut cycle, false);
        self.observers.notify(&cycle.request, &Event::Cancel);
        cycle.respond(Err(Error::Cancelled));
    }

    // ===== Notices =====

    fn on_notice(&mut self, notice: Notice) {
        match notice {
            Notice::Normalized { id, result } => {
                let Some(cycle) = self.cycles.get_mut(&id) else {
                    return;
                };
                match result {
                    Ok(request) => {
                        cycle.request = request;
                        self.observers.notify(&cycle.request, &Event::Request);
                        self.resolve(id);
                    }
                    Err(err) => self.fail(id, err),
                }
            }
            Notice::Resolved { id, generation, result } => {
                let Some(cycle) = self.cycles.get_mut(&id) else {
                    return;
                };
                if cycle.generation != generation || cycle.phase != Phase::Resolving {
                    return;
                }
                match result {
                    Ok(addrs) if !addrs.is_empty() => self.enqueue(id, addrs),
                    Ok(_) => {
                        let host = cycle.request.uri().host().to_owned();
                        let source = io::Error::new(io::ErrorKind::NotFound, "no address found");
                        self.fail(id, Error::Dns { host, source });
                    }
                    Err(source) => {
                        let host = cycle.request.uri().host().to_owned();
                        self.fail(id, Error::Dns { host, source });
                    }
                }
            }
            Notice::Timer { id, generation, kind } => {
                let Some(cycle) = self.cycles.get_mut(&id) else {
                    return;
                };
                if cycle.generation != generation {
                    return;
                }
                match kind {
                    TimerKind::Transfer => self.fail(id, Error::TransferTimeout),
                    TimerKind::Continue if cycle.phase == Phase::ContinueWait => {
                        trace!("request {id} continue delay elapsed");
                        self.send_body(id);
                    }
                    TimerKind::Continue => {}
                }
            }
            Notice::Decoded { id, generation, result } => {
                if !self
                    .cycles
                    .get(&id)
                    .is_some_and(|cycle| cycle.generation == generation && cycle.phase == Phase::Decoding)
                {
                    return;
                }
                let Some(mut cycle) = self.cycles.remove(&id) else {
                    return;
                };
                let Some(response) = cycle.head.take() else {
                    return;
                };
                match result {
                    Ok(body) => self.finish(cycle, response, body),
                    Err(err) => {
                        cycle.head = Some(response);
                        self.fail_cycle(cycle, err);
                    }
                }
            }
        }
    }

    /// Compute the authority and look up the host, IP literals skip the lookup.
    fn resolve(&mut self, id: RequestId) {
        let Some(cycle) = self.cycles.get_mut(&id) else {
            return;
        };
        let uri = cycle.request.uri();
        cycle.authority = uri.authority();
        cycle.phase = Phase::Resolving;

        let port = uri.port_or_default();
        if let Some(ip) = uri.host_ip() {
            return self.enqueue(id, vec![SocketAddr::new(ip, port)]);
        }

        let host = uri.host().to_owned();
        let generation = cycle.generation;
        let notice_tx = self.notice_tx.clone();
        trace!("request {id} resolving {host}");
        tokio::spawn(async move {
            let result = tokio::net::lookup_host((host, port))
                .await
                .map(|addrs| addrs.collect());
            let _ = notice_tx.send(Notice::Resolved { id, generation, result });
        });
    }

    fn enqueue(&mut self, id: RequestId, addrs: Vec<SocketAddr>) {
        let Some(cycle) = self.cycles.get_mut(&id) else {
            return;
        };
        let uri = cycle.request.uri();
        cycle.target = Some(Target {
            authority: cycle.authority.clone(),
            host: uri.host().to_owned(),
            https: uri.is_https(),
            addrs,
        });
        cycle.phase = Phase::Queued;
        self.pending.push_back(id);
        self.needs_assign = true;
    }

    // ===== Socket Assignment =====

    /// Give pending cycles a socket, reusing idle ones first.
    ///
    /// Cycles that get none stay queued until the pool changes.
    fn assign(&mut self) {
        self.needs_assign = false;
        let mut waiting = VecDeque::new();

        while let Some(id) = self.pending.pop_front() {
            let Some(cycle) = self.cycles.get_mut(&id) else {
                continue;
            };

            let (socket, reused) = if let Some(socket) = self.pool.checkout(&cycle.authority) {
                (socket, true)
            } else if let Some(target) = &cycle.target
                && let Some(socket) = self.pool.checkout_new(target, self.event_tx.clone())
            {
                (socket, false)
            } else {
                waiting.push_back(id);
                continue;
            };

            debug!("request {id} assigned socket #{socket} to {}", cycle.authority);
            cycle.socket = Some(socket);
            cycle.phase = Phase::Connecting;
            self.active.insert(socket, id);
            let event = Event::Socket {
                authority: &cycle.authority,
                reused,
            };
            self.observers.notify(&cycle.request, &event);

            if reused {
                self.start_exchange(id);
            }
        }

        self.pending = waiting;
    }

    /// Return the socket of a cycle to the pool, or evict it.
    fn release(&mut self, cycle: &mut Cycle, reuse: bool) {
        if let Some(socket) = cycle.socket.take() {
            self.active.remove(&socket);
            if reuse {
                trace!("socket #{socket} checked in");
                self.pool.checkin(socket);
            } else {
                self.pool.evict(socket);
            }
            self.needs_assign = true;
        }
    }

    // ===== Sending =====

    /// Write the request head on a connected socket.
    fn start_exchange(&mut self, id: RequestId) {
        let Some(cycle) = self.cycles.get_mut(&id) else {
            return;
        };
        let Some(socket) = cycle.socket.and_then(|socket| self.pool.get(socket)) else {
            return;
        };

        let limits = Limits {
            max_header_bytes: self.options.max_header_bytes,
            max_body_bytes: self.options.max_body_bytes,
        };
        cycle.parser = Some(ResponseParser::new(*cycle.request.method(), limits));
        cycle.sink = Some(BodySink::new(self.options.store_body, self.options.body_spill_threshold));
        cycle.buffer.clear();
        cycle.body_sent = 0;
        cycle.body = cycle.request.take_body();
        cycle.body_copy = cycle.body.try_clone();

        if let Some(timeout) = self.options.transfer_timeout {
            arm_timer(&self.notice_tx, cycle, TimerKind::Transfer, timeout);
        }

        let mut head = BytesMut::new();
        encode_head(&cycle.request, &mut head);
        trace!("request {id} sending head, {} bytes", head.len());

        if !socket.send(head.freeze()) {
            let err = io::Error::new(io::ErrorKind::BrokenPipe, "connection task exited");
            return self.fail(id, Error::Transport(err));
        }
        cycle.outstanding += 1;
        cycle.phase = match cycle.body.is_empty() {
            true => Phase::AwaitResponse,
            false => Phase::SendingHeaders,
        };
    }

    fn on_drain(&mut self, id: RequestId) {
        let Some(cycle) = self.cycles.get_mut(&id) else {
            return;
        };
        cycle.outstanding = cycle.outstanding.saturating_sub(1);

        match cycle.phase {
            Phase::SendingHeaders => {
                if cycle.request.headers().contains_token(EXPECT, "100-continue") {
                    trace!("request {id} waiting for 100-continue");
                    cycle.phase = Phase::ContinueWait;
                    arm_timer(&self.notice_tx, cycle, TimerKind::Continue, self.options.continue_wait);
                } else {
                    self.send_body(id);
                }
            }
            Phase::SendingBody => {
                self.pump(id);
            }
            _ => {}
        }
    }

    /// Start writing the body after the head is written.
    fn send_body(&mut self, id: RequestId) {
        let Some(cycle) = self.cycles.get_mut(&id) else {
            return;
        };
        cycle.cancel_timer(TimerKind::Continue);

        match std::mem::take(&mut cycle.body) {
            Body::Full(bytes) => {
                let sent = cycle
                    .socket
                    .and_then(|socket| self.pool.get(socket))
                    .is_some_and(|socket| socket.send(bytes));
                if sent {
                    cycle.outstanding += 1;
                }
                cycle.phase = Phase::AwaitResponse;
            }
            Body::Stream(stream) => {
                cycle.body = Body::Stream(stream);
                cycle.phase = Phase::SendingBody;
                self.pump(id);
            }
            Body::Empty | Body::Aggregate(_) => cycle.phase = Phase::AwaitResponse,
        }
    }

    /// Write the next chunk of a stream body, at most one chunk is in flight.
    ///
    /// Returns `true` if the cycle made progress.
    fn pump(&mut self, id: RequestId) -> bool {
        let Some(cycle) = self.cycles.get_mut(&id) else {
            return false;
        };
        if cycle.phase != Phase::SendingBody || cycle.outstanding > 0 {
            return false;
        }

        let mut cx = Context::from_waker(&self.waker);
        let declared = match &cycle.body {
            Body::Stream(stream) => stream.len(),
            _ => None,
        };
        let polled = match &mut cycle.body {
            Body::Stream(stream) => loop {
                match stream.poll_chunk(&mut cx) {
                    Poll::Ready(Some(Ok(chunk))) if chunk.is_empty() => continue,
                    poll => break poll,
                }
            },
            _ => Poll::Ready(None),
        };

        match polled {
            Poll::Ready(Some(Ok(chunk))) => {
                cycle.body_sent += chunk.len() as u64;
                if declared.is_some_and(|len| cycle.body_sent > len) {
                    self.fail(id, Error::Body(length_mismatch("longer")));
                    return true;
                }
                let sent = cycle
                    .socket
                    .and_then(|socket| self.pool.get(socket))
                    .is_some_and(|socket| socket.send(chunk));
                if sent {
                    cycle.outstanding += 1;
                }
                true
            }
            Poll::Ready(None) => {
                if declared.is_some_and(|len| cycle.body_sent < len) {
                    self.fail(id, Error::Body(length_mismatch("shorter")));
                    return true;
                }
                trace!("request {id} body sent");
                cycle.body = Body::Empty;
                cycle.phase = Phase::AwaitResponse;
                true
            }
            Poll::Ready(Some(Err(err))) => {
                self.fail(id, Error::Body(err));
                true
            }
            Poll::Pending => false,
        }
    }

    fn poll_bodies(&mut self) -> bool {
        let ids: Vec<_> = self
            .cycles
            .values()
            .filter(|cycle| cycle.phase == Phase::SendingBody && cycle.outstanding == 0)
            .map(|cycle| cycle.id)
            .collect();

        let mut progressed = false;
        for id in ids {
            progressed |= self.pump(id);
        }
        progressed
    }

    // ===== Socket Events =====

    fn on_socket(&mut self, socket: SocketId, event: SocketEvent) {
        let Some(&id) = self.active.get(&socket) else {
            return self.on_idle_socket(socket, event);
        };

        match event {
            SocketEvent::Ready => {
                if self.cycles.get(&id).is_some_and(|cycle| cycle.phase == Phase::Connecting) {
                    trace!("socket #{socket} connected");
                    self.start_exchange(id);
                }
            }
            SocketEvent::Sent(bytes) => {
                if self.options.log_raw_writes {
                    trace!("socket #{socket} write: {}", String::from_utf8_lossy(&bytes));
                }
                if let Some(cycle) = self.cycles.get(&id) {
                    self.observers.notify(&cycle.request, &Event::DataOut(&bytes));
                }
            }
            SocketEvent::Drain => self.on_drain(id),
            SocketEvent::Data(bytes) => self.on_data(id, socket, bytes),
            SocketEvent::Closed => self.on_closed(id),
            SocketEvent::Error(SocketError::ConnectTimeout) => {
                let authority = self
                    .cycles
                    .get(&id)
                    .map(|cycle| cycle.authority.clone())
                    .unwrap_or_default();
                self.fail(id, Error::ConnectTimeout(authority));
            }
            SocketEvent::Error(SocketError::Io(err)) => {
                if !self.complete_eof(id) {
                    self.fail(id, Error::Transport(err));
                }
            }
        }
    }

    /// Events of pooled sockets, an idle socket that closes or sends anything is evicted.
    fn on_idle_socket(&mut self, socket: SocketId, event: SocketEvent) {
        match event {
            SocketEvent::Closed | SocketEvent::Error(_) | SocketEvent::Data(_) => {
                if self.pool.is_idle(socket) {
                    debug!("idle socket #{socket} closed");
                    self.pool.evict(socket);
                    self.needs_assign = true;
                }
            }
            SocketEvent::Ready | SocketEvent::Sent(_) | SocketEvent::Drain => {}
        }
    }

    fn on_closed(&mut self, id: RequestId) {
        if !self.complete_eof(id) {
            let err = io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed before the response was complete",
            );
            self.fail(id, Error::Transport(err));
        }
    }

    /// Complete a response whose body is delimited by connection closure.
    fn complete_eof(&mut self, id: RequestId) -> bool {
        let Some(cycle) = self.cycles.get_mut(&id) else {
            return true;
        };
        let finished = cycle
            .parser
            .as_mut()
            .and_then(|parser| parser.finish_eof())
            .is_some();
        if finished {
            cycle.force_close = true;
            self.complete(id);
        }
        finished
    }

    fn on_data(&mut self, id: RequestId, socket: SocketId, bytes: Bytes) {
        if self.options.log_raw_reads {
            trace!("socket #{socket} read: {}", String::from_utf8_lossy(&bytes));
        }
        let Some(cycle) = self.cycles.get_mut(&id) else {
            return;
        };
        self.observers.notify(&cycle.request, &Event::DataIn(&bytes));
        cycle.buffer.extend_from_slice(&bytes);
        self.parse(id);
    }

    /// Feed buffered bytes to the parser until it needs more.
    fn parse(&mut self, id: RequestId) {
        loop {
            let Some(cycle) = self.cycles.get_mut(&id) else {
                return;
            };
            let Some(parser) = cycle.parser.as_mut() else {
                return;
            };

            match parser.parse(&mut cycle.buffer) {
                ParseResult::Pending => return,
                ParseResult::Err(err) => return self.fail(id, Error::Parse(err)),
                ParseResult::Ok(Frame::Head(head)) if head.status().is_informational() => {
                    trace!("request {id} interim response {}", head.status());
                    if head.status() == StatusCode::CONTINUE && cycle.phase == Phase::ContinueWait {
                        self.send_body(id);
                    }
                }
                ParseResult::Ok(Frame::Head(head)) => {
                    debug!("request {id} response {} {}", head.status(), head.reason());
                    if cycle.phase.is_sending() {
                        debug!("request {id} response arrived before the body was sent");
                        cycle.force_close = true;
                        cycle.body = Body::Empty;
                        cycle.cancel_timer(TimerKind::Continue);
                    }
                    cycle.phase = Phase::AwaitResponse;
                    self.observers.notify(&cycle.request, &Event::Headers(&head));
                    cycle.head = Some(head);
                }
                ParseResult::Ok(Frame::Data(data)) => {
                    self.observers.notify(&cycle.request, &Event::BodyData(&data));
                    if let Some(sink) = &mut cycle.sink
                        && let Err(err) = sink.write(&data)
                    {
                        return self.fail(id, Error::Transport(err));
                    }
                }
                ParseResult::Ok(Frame::End(trailers)) => {
                    if let Some(head) = &mut cycle.head {
                        for (name, value) in &trailers {
                            head.headers_mut().append(name.clone(), value.clone());
                        }
                    }
                    return self.complete(id);
                }
            }
        }
    }

    // ===== Completion =====

    fn complete(&mut self, id: RequestId) {
        let Some(mut cycle) = self.cycles.remove(&id) else {
            return;
        };
        let Some(response) = cycle.head.take() else {
            let err = io::Error::new(io::ErrorKind::InvalidData, "response ended without a head");
            return self.fail_cycle(cycle, Error::Transport(err));
        };

        let reuse = !cycle.force_close
            && cycle.buffer.is_empty()
            && !should_close(&cycle.request, &response, self.options.keep_alive);
        self.release(&mut cycle, reuse);
        cycle.cancel_timers();

        let body = match cycle.sink.take().map(BodySink::finish) {
            Some(Ok(body)) => body,
            Some(Err(err)) => {
                cycle.head = Some(response);
                return self.fail_cycle(cycle, Error::Transport(err));
            }
            None => ResponseBody::Empty,
        };

        let gzip = is_gzip(&response);
        let buffer = self.options.buffer_response_body;
        if !gzip && !(buffer && matches!(body, ResponseBody::File(_))) {
            return self.finish(cycle, response, body);
        }

        trace!("request {id} decoding body on a blocking thread");
        let notice_tx = self.notice_tx.clone();
        let generation = cycle.generation;
        tokio::task::spawn_blocking(move || {
            let result = decode_body(body, gzip, buffer);
            let _ = notice_tx.send(Notice::Decoded { id, generation, result });
        });
        cycle.phase = Phase::Decoding;
        cycle.head = Some(response);
        self.cycles.insert(id, cycle);
    }

    /// Attach the decoded body, then redirect or fulfill.
    fn finish(&mut self, cycle: Cycle, mut response: Response, body: ResponseBody) {
        if is_gzip(&response) {
            response.headers_mut().remove(CONTENT_ENCODING);
            response.headers_mut().remove(CONTENT_LENGTH);
        }
        *response.body_mut() = body;
        response.set_uri(cycle.request.uri().clone());

        match self.redirect_target(&cycle, &response) {
            Some(location) => self.redirect(cycle, response, location),
            None => self.fulfill(cycle, response),
        }
    }

    /// Returns the location to follow if the response is a redirect that should be followed.
    fn redirect_target(&self, cycle: &Cycle, response: &Response) -> Option<Uri> {
        if !self.options.follow_redirects || !cycle.request.method().is_redirectable() {
            return None;
        }
        let status = response.status();
        if !status.is_redirection() || status == StatusCode::NOT_MODIFIED {
            return None;
        }

        let location = response.headers().get(LOCATION)?.to_str()?.trim();
        let target = match cycle.request.uri().resolve(location) {
            Ok(target) if target.is_http() => target,
            _ => {
                debug!("request {} cannot follow location {location:?}", cycle.id);
                return None;
            }
        };

        if target == *cycle.request.uri() || cycle.history.contains(&target) {
            debug!("request {} redirect loop to {target}", cycle.id);
            return None;
        }
        Some(target)
    }

    fn redirect(&mut self, mut cycle: Cycle, response: Response, location: Uri) {
        debug!("request {} redirected to {location}", cycle.id);
        let event = Event::Redirect {
            response: &response,
            location: &location,
        };
        self.observers.notify(&cycle.request, &event);

        let previous = std::mem::replace(cycle.request.uri_mut(), location);
        let host = HeaderValue::from_string(cycle.request.uri().host_header());
        let headers = cycle.request.headers_mut();
        headers.insert(HOST, host);
        if self.options.auto_referer {
            headers.insert(REFERER, HeaderValue::from_string(previous.to_string()));
        }

        match cycle.body_copy.take() {
            Some(body) => *cycle.request.body_mut() = body,
            None => {
                let headers = cycle.request.headers_mut();
                headers.remove(CONTENT_LENGTH);
                headers.remove(TRANSFER_ENCODING);
                headers.remove(EXPECT);
            }
        }

        let mut response = response;
        if let Some(earlier) = cycle.previous.take() {
            response.set_previous(earlier);
        }
        cycle.previous = Some(response);
        cycle.history.push(previous);
        cycle.reset_exchange();

        let id = cycle.id;
        self.cycles.insert(id, cycle);
        self.resolve(id);
    }

    fn fulfill(&mut self, mut cycle: Cycle, mut response: Response) {
        if let Some(previous) = cycle.previous.take() {
            response.set_previous(previous);
        }
        debug!("request {} completed with {}", cycle.id, response.status());
        self.observers.notify(&cycle.request, &Event::Response(&response));
        cycle.respond(Ok(response));
    }

    fn fail(&mut self, id: RequestId, error: Error) {
        if let Some(cycle) = self.cycles.remove(&id) {
            self.fail_cycle(cycle, error);
        }
    }

    fn fail_cycle(&mut self, mut cycle: Cycle, error: Error) {
        warning!("request {} failed: {error}", cycle.id);
        self.pending.retain(|pending| *pending != cycle.id);
        self.release(&mut cycle, false);
        cycle.cancel_timers();

        let event = Event::Error {
            response: cycle.head.as_ref(),
            error: &error,
        };
        self.observers.notify(&cycle.request, &event);
        cycle.respond(Err(error));
    }
}

impl<C: Connector + Unpin> Future for Engine<C> {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let me = self.get_mut();
        if !me.waker.will_wake(cx.waker()) {
            me.waker = cx.waker().clone();
        }

        loop {
            let mut progressed = false;

            while me.accepting {
                match me.commands.poll_recv(cx) {
                    Poll::Ready(Some(command)) => {
                        me.on_command(command);
                        progressed = true;
                    }
                    Poll::Ready(None) => {
                        trace!("all client handles dropped");
                        me.accepting = false;
                    }
                    Poll::Pending => break,
                }
            }

            while let Poll::Ready(Some(notice)) = me.notices.poll_recv(cx) {
                me.on_notice(notice);
                progressed = true;
            }

            while let Poll::Ready(Some((socket, event))) = me.events.poll_recv(cx) {
                me.on_socket(socket, event);
                progressed = true;
            }

            if me.needs_assign {
                me.assign();
                progressed = true;
            }

            progressed |= me.poll_bodies();

            if !progressed {
                break;
            }
        }

        if !me.accepting && me.cycles.is_empty() {
            debug!("engine exited");
            me.pool.clear();
            return Poll::Ready(());
        }
        Poll::Pending
    }
}

// ===== Helpers =====

fn arm_timer(notice_tx: &UnboundedSender<Notice>, cycle: &mut Cycle, kind: TimerKind, delay: Duration) {
    let notice_tx = notice_tx.clone();
    let id = cycle.id;
    let generation = cycle.generation;
    let handle = tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        let _ = notice_tx.send(Notice::Timer { id, generation, kind });
    });
    cycle.add_timer(kind, handle.abort_handle());
}

fn length_mismatch(which: &str) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidData,
        format!("stream body is {which} than its declared length"),
    )
}

/// Returns `true` if the body is `gzip` encoded and this build can decode it.
fn is_gzip(response: &Response) -> bool {
    GZIP_SUPPORT
        && response
            .headers()
            .get(CONTENT_ENCODING)
            .is_some_and(|value| value.as_bytes().trim_ascii().eq_ignore_ascii_case(b"gzip"))
}

/// Inflate and read back a spilled body, runs on a blocking thread.
fn decode_body(body: ResponseBody, gzip: bool, buffer: bool) -> Result<ResponseBody, Error> {
    let body = match gzip {
        true => inflate(body).map_err(Error::Decompress)?,
        false => body,
    };
    match body {
        ResponseBody::File(file) if buffer => {
            let bytes = ResponseBody::File(file).into_bytes().map_err(Error::Transport)?;
            Ok(ResponseBody::Bytes(bytes))
        }
        body => Ok(body),
    }
}

#[cfg(not(feature = "gzip"))]
fn inflate(body: ResponseBody) -> io::Result<ResponseBody> {
    Ok(body)
}

/// Returns `true` if the connection cannot be reused after this exchange.
fn should_close(request: &Request, response: &Response, keep_alive: bool) -> bool {
    if !keep_alive {
        return true;
    }
    if request.headers().contains_token(CONNECTION, "close")
        || response.headers().contains_token(CONNECTION, "close")
    {
        return true;
    }
    *response.version() == Version::HTTP_10
        && !response.headers().contains_token(CONNECTION, "keep-alive")
}
