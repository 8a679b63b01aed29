//! Connection pool keyed by authority.
use std::{num::NonZeroUsize, time::Duration};
use tokio::time::Instant;

use crate::config::Options;
use crate::log::debug;
use crate::transport::{Connector, EventTx, Socket, SocketId, Target};


#[derive(Debug)]
struct Entry {
    socket: Socket,
    busy: bool,
    idle_since: Instant,
}

/// Sockets grouped by `host:port` authority, each either busy with one request or idle.
///
/// The number of sockets per authority never exceeds `max_connections_per_host`, and the total
/// never exceeds `max_connections` unless that is unlimited.
#[derive(Debug)]
pub(crate) struct ConnectionPool<C> {
    connector: C,
    entries: Vec<Entry>,
    next_id: SocketId,
    max_connections: Option<NonZeroUsize>,
    max_per_host: NonZeroUsize,
    idle_timeout: Duration,
}

impl<C: Connector> ConnectionPool<C> {
    pub(crate) fn new(connector: C, options: &Options) -> Self {
        Self {
            connector,
            entries: Vec::new(),
            next_id: 0,
            max_connections: options.max_connections,
            max_per_host: options.max_connections_per_host,
            idle_timeout: options.keep_alive_idle_timeout,
        }
    }

    pub(crate) fn configure(&mut self, options: &Options) {
        self.max_connections = options.max_connections;
        self.max_per_host = options.max_connections_per_host;
        self.idle_timeout = options.keep_alive_idle_timeout;
        self.connector.configure(options);
    }

    /// Number of sockets, busy or idle.
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn count_for(&self, authority: &str) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.socket.authority() == authority)
            .count()
    }

    pub(crate) fn get(&self, id: SocketId) -> Option<&Socket> {
        self.entries
            .iter()
            .find(|entry| entry.socket.id() == id)
            .map(|entry| &entry.socket)
    }

    /// Returns `true` if the socket is pooled and not serving a request.
    pub(crate) fn is_idle(&self, id: SocketId) -> bool {
        self.entries.iter().any(|entry| entry.socket.id() == id && !entry.busy)
    }

    /// Take an idle socket of `authority`.
    ///
    /// Idle sockets past the keep-alive idle timeout are evicted instead.
    pub(crate) fn checkout(&mut self, authority: &str) -> Option<SocketId> {
        self.evict_expired();

        let entry = self
            .entries
            .iter_mut()
            .find(|entry| !entry.busy && entry.socket.authority() == authority)?;
        entry.busy = true;
        Some(entry.socket.id())
    }

    /// Create a new busy socket for `target` if the connection limits allow it.
    ///
    /// When the global limit is reached, the longest idle socket of another authority is evicted
    /// to make room.
    pub(crate) fn checkout_new(&mut self, target: &Target, events: EventTx) -> Option<SocketId> {
        self.evict_expired();
        if self.count_for(&target.authority) >= self.max_per_host.get() {
            return None;
        }
        if self.max_connections.is_some_and(|max| self.entries.len() >= max.get()) {
            let oldest = self
                .entries
                .iter()
                .filter(|entry| !entry.busy)
                .min_by_key(|entry| entry.idle_since)?
                .socket
                .id();
            self.evict(oldest);
        }

        let id = self.next_id;
        self.next_id += 1;

        let socket = self.connector.connect(id, target, events);
        self.entries.push(Entry {
            socket,
            busy: true,
            idle_since: Instant::now(),
        });
        Some(id)
    }

    /// Evict idle sockets of every authority past the keep-alive idle timeout.
    fn evict_expired(&mut self) {
        let now = Instant::now();
        let idle_timeout = self.idle_timeout;

        self.entries.retain(|entry| {
            let expired = !entry.busy && now.duration_since(entry.idle_since) >= idle_timeout;
            if expired {
                debug!("socket #{} idle for too long, evicted", entry.socket.id());
                entry.socket.stop();
            }
            !expired
        });
    }

    /// Mark socket idle, ready for reuse.
    pub(crate) fn checkin(&mut self, id: SocketId) {
        if let Some(entry) = self.entries.iter_mut().find(|entry| entry.socket.id() == id) {
            entry.busy = false;
            entry.idle_since = Instant::now();
        }
    }

    /// Stop and remove a socket.
    pub(crate) fn evict(&mut self, id: SocketId) {
        if let Some(idx) = self.entries.iter().position(|entry| entry.socket.id() == id) {
            let entry = self.entries.swap_remove(idx);
            debug!("socket #{id} to {} evicted", entry.socket.authority());
            entry.socket.stop();
        }
    }

    /// Stop and remove every socket.
    pub(crate) fn clear(&mut self) {
        for entry in self.entries.drain(..) {
            entry.socket.stop();
        }
    }
}
