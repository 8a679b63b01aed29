//! Connection transport.
//!
//! Every connection is driven by its own task which exchanges [`SocketCommand`]s and
//! [`SocketEvent`]s with the engine, the engine only ever holds a [`Socket`] handle.
use bytes::Bytes;
use std::{
    io,
    net::{IpAddr, SocketAddr},
    time::Duration,
};
use tokio::{
    net::{TcpSocket, TcpStream},
    sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel},
};

use crate::config::Options;
use crate::log::{debug, trace};

mod task;
#[cfg(feature = "tls")]
mod tls;

use task::SocketTask;

pub(crate) type SocketId = u64;

pub(crate) type EventTx = UnboundedSender<(SocketId, SocketEvent)>;

pub(crate) type EventRx = UnboundedReceiver<(SocketId, SocketEvent)>;

type CommandRx = UnboundedReceiver<SocketCommand>;

/// Message from the engine to a connection task.
#[derive(Debug)]
pub(crate) enum SocketCommand {
    /// Queue bytes for writing, answered with [`SocketEvent::Drain`] once written.
    Send(Bytes),
    /// Close the connection.
    Stop,
}

/// Notification from a connection task.
#[derive(Debug)]
pub(crate) enum SocketEvent {
    /// Connected, including the TLS handshake.
    Ready,
    /// Bytes were written.
    Sent(Bytes),
    /// A queued [`SocketCommand::Send`] is fully written.
    Drain,
    /// Bytes were read.
    Data(Bytes),
    /// Peer closed the connection.
    Closed,
    /// Connection failed, the task has exited.
    Error(SocketError),
}

#[derive(Debug)]
pub(crate) enum SocketError {
    ConnectTimeout,
    Io(io::Error),
}

/// Where to connect.
#[derive(Debug, Clone)]
pub(crate) struct Target {
    /// `host:port` the connection is pooled under.
    pub(crate) authority: String,
    /// Host name used for TLS server name.
    pub(crate) host: String,
    pub(crate) https: bool,
    /// Resolved addresses, tried in order.
    pub(crate) addrs: Vec<SocketAddr>,
}

/// Handle to a connection task.
#[derive(Debug)]
pub(crate) struct Socket {
    id: SocketId,
    authority: String,
    tx: UnboundedSender<SocketCommand>,
}

impl Socket {
    pub(crate) fn new(id: SocketId, authority: String, tx: UnboundedSender<SocketCommand>) -> Self {
        Self { id, authority, tx }
    }

    #[inline]
    pub(crate) fn id(&self) -> SocketId {
        self.id
    }

    #[inline]
    pub(crate) fn authority(&self) -> &str {
        &self.authority
    }

    /// Queue bytes for writing, returns `false` if the connection task is gone.
    pub(crate) fn send(&self, bytes: Bytes) -> bool {
        self.tx.send(SocketCommand::Send(bytes)).is_ok()
    }

    pub(crate) fn stop(&self) {
        let _ = self.tx.send(SocketCommand::Stop);
    }
}

// ===== Connector =====

/// Creates connection tasks.
pub(crate) trait Connector: Send {
    /// Start connecting to `target`, events are reported through `events` tagged with `id`.
    fn connect(&mut self, id: SocketId, target: &Target, events: EventTx) -> Socket;

    /// Apply updated client options to connections created afterwards.
    fn configure(&mut self, options: &Options);
}

#[derive(Debug, Clone, Copy)]
struct Settings {
    connect_timeout: Option<Duration>,
    bind_ip: Option<IpAddr>,
    chunk_size: usize,
}

/// Connector over TCP, with TLS for `https`.
pub(crate) struct TcpConnector {
    settings: Settings,
    #[cfg(feature = "tls")]
    tls: tls::TlsContext,
}

impl TcpConnector {
    pub(crate) fn new(options: &Options) -> Self {
        Self {
            settings: Settings::from_options(options),
            #[cfg(feature = "tls")]
            tls: tls::TlsContext::new(options.tls.clone()),
        }
    }
}

impl Settings {
    fn from_options(options: &Options) -> Self {
        Self {
            connect_timeout: options.connect_timeout,
            bind_ip: options.bind_local_ip,
            chunk_size: options.io_chunk_size.get(),
        }
    }
}

impl Connector for TcpConnector {
    fn connect(&mut self, id: SocketId, target: &Target, events: EventTx) -> Socket {
        let (tx, rx) = unbounded_channel();
        debug!("socket #{id} connecting to {} {:?}", target.authority, target.addrs);

        #[cfg(feature = "tls")]
        let tls = target.https.then(|| self.tls.connector());
        #[cfg(not(feature = "tls"))]
        let tls: Option<io::Result<()>> = target.https.then(|| {
            Err(io::Error::new(io::ErrorKind::Unsupported, "https requires the `tls` feature"))
        });

        let mut target = target.clone();
        #[cfg(feature = "tls")]
        if let Some(name) = self.tls.server_name() {
            target.host = name.to_owned();
        }

        let socket = Socket::new(id, target.authority.clone(), tx);
        tokio::spawn(run(id, target, self.settings, tls, rx, events));
        socket
    }

    fn configure(&mut self, options: &Options) {
        self.settings = Settings::from_options(options);
        #[cfg(feature = "tls")]
        self.tls.configure(options.tls.clone());
    }
}

impl std::fmt::Debug for TcpConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpConnector").field("settings", &self.settings).finish_non_exhaustive()
    }
}

#[cfg(feature = "tls")]
type TlsSetup = io::Result<tokio_rustls::TlsConnector>;

#[cfg(not(feature = "tls"))]
type TlsSetup = io::Result<()>;

async fn run(
    id: SocketId,
    target: Target,
    settings: Settings,
    tls: Option<TlsSetup>,
    rx: CommandRx,
    events: EventTx,
) {
    let connecting = async {
        let tcp = connect_tcp(&target.addrs, settings.bind_ip).await?;
        match tls {
            None => Ok(Stream::Tcp(tcp)),
            #[cfg(feature = "tls")]
            Some(tls) => {
                let tls = tls::handshake(tls?, &target.host, tcp).await?;
                Ok(Stream::Tls(Box::new(tls)))
            }
            #[cfg(not(feature = "tls"))]
            Some(Err(err)) => Err(err),
            #[cfg(not(feature = "tls"))]
            Some(Ok(())) => Ok(Stream::Tcp(tcp)),
        }
    };

    let result = match settings.connect_timeout {
        Some(timeout) => match tokio::time::timeout(timeout, connecting).await {
            Ok(result) => result.map_err(SocketError::Io),
            Err(_) => Err(SocketError::ConnectTimeout),
        },
        None => connecting.await.map_err(SocketError::Io),
    };

    let stream = match result {
        Ok(stream) => stream,
        Err(err) => {
            debug!("socket #{id} failed to connect: {err:?}");
            let _ = events.send((id, SocketEvent::Error(err)));
            return;
        }
    };

    if events.send((id, SocketEvent::Ready)).is_err() {
        return;
    }

    match stream {
        Stream::Tcp(tcp) => SocketTask::new(id, tcp, settings.chunk_size, rx, events).await,
        #[cfg(feature = "tls")]
        Stream::Tls(tls) => SocketTask::new(id, *tls, settings.chunk_size, rx, events).await,
    }
    trace!("socket #{id} task exited");
}

enum Stream {
    Tcp(TcpStream),
    #[cfg(feature = "tls")]
    Tls(Box<tokio_rustls::client::TlsStream<TcpStream>>),
}

async fn connect_tcp(addrs: &[SocketAddr], bind_ip: Option<IpAddr>) -> io::Result<TcpStream> {
    let mut last_error = None;

    for addr in addrs {
        let socket = match addr {
            SocketAddr::V4(_) => TcpSocket::new_v4()?,
            SocketAddr::V6(_) => TcpSocket::new_v6()?,
        };
        if let Some(ip) = bind_ip {
            socket.bind(SocketAddr::new(ip, 0))?;
        }
        match socket.connect(*addr).await {
            Ok(tcp) => {
                tcp.set_nodelay(true)?;
                return Ok(tcp);
            }
            Err(err) => last_error = Some(err),
        }
    }

    Err(last_error.unwrap_or_else(|| {
        io::Error::new(io::ErrorKind::AddrNotAvailable, "no address to connect to")
    }))
}
