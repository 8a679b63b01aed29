//! Asynchronous HTTP client.
//!
//! A [`Client`] is a cheap handle to an engine task which owns every in-flight request, the
//! connection pool, and registered observers. Handles can be cloned and shared, the engine exits
//! once every handle is dropped and the last request has settled.
use std::{
    future::Future,
    pin::Pin,
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
    task::{Context, Poll},
};
use tokio::sync::{mpsc, oneshot};

use crate::{
    config::{ConfigError, OptionValue, Options},
    error::Error,
    event::{ObservationId, Observer},
    request::IntoRequest,
    response::Response,
    transport::{Connector, TcpConnector},
};

mod cycle;
mod engine;
#[cfg(feature = "gzip")]
mod inflate;

use engine::{Command, Engine};

/// Identifies a submitted request, used for cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(u64);

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Asynchronous HTTP client.
///
/// # Example
///
/// ```no_run
/// # async fn app() -> Result<(), ferry::Error> {
/// let client = ferry::Client::new(ferry::Options::default());
/// let response = client.request("http://example.com/").await?;
/// println!("{}", response.status());
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct Client {
    shared: Arc<Shared>,
}

#[derive(Debug)]
struct Shared {
    tx: mpsc::UnboundedSender<Command>,
    options: Mutex<Options>,
    next_request: AtomicU64,
    next_observation: AtomicU64,
}

impl Client {
    /// Create client and spawn its engine task.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a tokio runtime.
    pub fn new(options: Options) -> Client {
        let connector = TcpConnector::new(&options);
        Self::with_connector(options, connector)
    }

    pub(crate) fn with_connector<C>(options: Options, connector: C) -> Client
    where
        C: Connector + Unpin + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(Engine::new(options.clone(), connector, rx));
        Client {
            shared: Arc::new(Shared {
                tx,
                options: Mutex::new(options),
                next_request: AtomicU64::new(0),
                next_observation: AtomicU64::new(0),
            }),
        }
    }

    /// Send a request and wait for its response.
    ///
    /// # Errors
    ///
    /// Returns error if the request is invalid, or the exchange fails.
    pub async fn request<R: IntoRequest>(&self, input: R) -> Result<Response, Error> {
        self.submit(input).await
    }

    /// Submit a request, returning a future of its response.
    ///
    /// The request is sent even if the returned future is never polled.
    pub fn submit<R: IntoRequest>(&self, input: R) -> ResponseFuture {
        let id = RequestId(self.shared.next_request.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = oneshot::channel();

        match input.into_request() {
            Ok(request) => {
                if let Err(mpsc::error::SendError(Command::Submit { tx, .. })) =
                    self.shared.tx.send(Command::Submit { id, request, tx })
                {
                    let _ = tx.send(Err(Error::Closed));
                }
            }
            Err(err) => {
                let _ = tx.send(Err(err));
            }
        }

        ResponseFuture { id, rx }
    }

    /// Cancel a request, its future resolves with [`Error::Cancelled`].
    ///
    /// Does nothing if the request already completed.
    pub fn cancel(&self, id: RequestId) {
        let _ = self.shared.tx.send(Command::Cancel(id));
    }

    /// Cancel every request in flight.
    pub fn cancel_all(&self) {
        let _ = self.shared.tx.send(Command::CancelAll);
    }

    /// Returns a copy of the current options.
    pub fn options(&self) -> Options {
        self.lock_options().clone()
    }

    /// Set an option by name, see [`Options::set`].
    ///
    /// Requests already in flight keep the options they were submitted with where the option
    /// affects normalization.
    ///
    /// # Errors
    ///
    /// Returns error if the key is unknown or the value is invalid, options are unchanged.
    pub fn set_option(&self, key: &str, value: impl Into<OptionValue>) -> Result<(), ConfigError> {
        self.update_options(|options| options.set(key, value))
    }

    /// Set several options by name, see [`Options::set_all`].
    ///
    /// # Errors
    ///
    /// Returns the first error, options are unchanged.
    pub fn set_all_options<I, K, V>(&self, options: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<OptionValue>,
    {
        self.update_options(|current| current.set_all(options))
    }

    fn update_options<F>(&self, f: F) -> Result<(), ConfigError>
    where
        F: FnOnce(&mut Options) -> Result<(), ConfigError>,
    {
        let mut current = self.lock_options();
        let mut options = current.clone();
        f(&mut options)?;
        *current = options.clone();
        let _ = self.shared.tx.send(Command::Configure(Box::new(options)));
        Ok(())
    }

    fn lock_options(&self) -> std::sync::MutexGuard<'_, Options> {
        self.shared.options.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register an observer of lifecycle events of every request.
    pub fn observe<O: Observer + 'static>(&self, observer: O) -> ObservationId {
        let id = ObservationId(self.shared.next_observation.fetch_add(1, Ordering::Relaxed));
        let _ = self.shared.tx.send(Command::Observe(id, Box::new(observer)));
        id
    }

    /// Remove an observer.
    pub fn remove_observation(&self, id: ObservationId) {
        let _ = self.shared.tx.send(Command::RemoveObservation(id));
    }

    /// Remove every observer.
    pub fn remove_all_observations(&self) {
        let _ = self.shared.tx.send(Command::RemoveAllObservations);
    }
}

impl Default for Client {
    /// Client with default [`Options`].
    ///
    /// # Panics
    ///
    /// Panics if called outside of a tokio runtime.
    fn default() -> Self {
        Self::new(Options::default())
    }
}

// ===== Future =====

/// Future of a submitted request.
#[derive(Debug)]
#[must_use = "dropping the future does not cancel the request"]
pub struct ResponseFuture {
    id: RequestId,
    rx: oneshot::Receiver<Result<Response, Error>>,
}

impl ResponseFuture {
    /// Returns the id of the request, used for [`Client::cancel`].
    #[inline]
    pub fn id(&self) -> RequestId {
        self.id
    }
}

impl Future for ResponseFuture {
    type Output = Result<Response, Error>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(_)) => Poll::Ready(Err(Error::Closed)),
            Poll::Pending => Poll::Pending,
        }
    }
}
