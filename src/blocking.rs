//! Synchronous client.
//!
//! [`Client`] owns a current thread runtime and drives the asynchronous client on it for the
//! duration of each call, so it must not be used from within an asynchronous context.
use std::io;
use tokio::{runtime, task::JoinSet};

use crate::{
    config::Options,
    error::Error,
    log::debug,
    request::IntoRequest,
    response::Response,
};

/// Blocking HTTP client.
#[derive(Debug)]
pub struct Client {
    runtime: runtime::Runtime,
    client: crate::Client,
}

impl Client {
    /// Create client with its own runtime.
    ///
    /// # Errors
    ///
    /// Returns error if the runtime cannot be created.
    pub fn new(options: Options) -> io::Result<Client> {
        let runtime = runtime::Builder::new_current_thread().enable_all().build()?;
        let client = {
            let _guard = runtime.enter();
            crate::Client::new(options)
        };
        Ok(Client { runtime, client })
    }

    /// Returns the underlying asynchronous client, e.g. to set options or observe events.
    #[inline]
    pub fn client(&self) -> &crate::Client {
        &self.client
    }

    /// Send a request and block until its response.
    ///
    /// # Errors
    ///
    /// Returns error if the request is invalid, or the exchange fails.
    pub fn request<R: IntoRequest>(&self, input: R) -> Result<Response, Error> {
        self.runtime.block_on(self.client.request(input))
    }

    /// Send requests in parallel, calling `on_each` with the index and result of each request in
    /// completion order.
    ///
    /// Blocks until every request has completed.
    pub fn request_multi<I, R, F>(&self, requests: I, mut on_each: F)
    where
        I: IntoIterator<Item = R>,
        R: IntoRequest,
        F: FnMut(usize, Result<Response, Error>),
    {
        let mut set = JoinSet::new();
        for (index, request) in requests.into_iter().enumerate() {
            let future = self.client.submit(request);
            set.spawn_on(async move { (index, future.await) }, self.runtime.handle());
        }
        debug!("running {} requests", set.len());

        self.runtime.block_on(async {
            while let Some(joined) = set.join_next().await {
                match joined {
                    Ok((index, result)) => on_each(index, result),
                    Err(err) => {
                        debug!("request task failed: {err}");
                    }
                }
            }
        });
    }
}
