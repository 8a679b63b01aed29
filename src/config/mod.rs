//! Client configuration.
//!
//! [`Options`] is a typed structure whose fields can be set directly, or by option name through
//! [`Options::set`], which validates the dynamic value and reports the offending key.
use std::{net::IpAddr, num::NonZeroUsize, path::PathBuf, time::Duration};

use crate::headers::HeaderValue;

#[cfg(test)]
mod test;

const DEFAULT_USER_AGENT: &str = concat!("ferry/", env!("CARGO_PKG_VERSION"));
const DEFAULT_PER_HOST: NonZeroUsize = NonZeroUsize::new(8).unwrap();
const DEFAULT_IO_CHUNK: NonZeroUsize = NonZeroUsize::new(64 * 1024).unwrap();

/// Client options.
#[derive(Clone, Debug)]
pub struct Options {
    /// `keep-alive`, reuse connections across requests to the same authority.
    pub keep_alive: bool,
    /// `connect-timeout`, `None` waits for the operating system.
    pub connect_timeout: Option<Duration>,
    /// `transfer-timeout`, limit for a whole exchange once the socket is connected.
    pub transfer_timeout: Option<Duration>,
    /// `keep-alive-idle-timeout`, idle pooled connections older than this are not reused.
    pub keep_alive_idle_timeout: Duration,
    /// `follow-redirects`
    pub follow_redirects: bool,
    /// `auto-referer`, set `Referer` when following a redirect.
    pub auto_referer: bool,
    /// `max-connections`, `None` is unlimited.
    pub max_connections: Option<NonZeroUsize>,
    /// `max-connections-per-host`
    pub max_connections_per_host: NonZeroUsize,
    /// `continue-wait`, how long to wait for `100 Continue` before sending the body anyway.
    pub continue_wait: Duration,
    /// `buffer-response-body`, read spilled bodies back into memory.
    pub buffer_response_body: bool,
    /// `max-header-bytes`, `None` is unlimited.
    pub max_header_bytes: Option<usize>,
    /// `max-body-bytes`, `None` is unlimited.
    pub max_body_bytes: Option<u64>,
    /// `body-spill-threshold`, bodies larger than this are stored in a temporary file.
    pub body_spill_threshold: u64,
    /// `store-body`, when disabled body bytes are only reported to observers.
    pub store_body: bool,
    /// `bind-local-ip`
    pub bind_local_ip: Option<IpAddr>,
    /// `send-expect-continue`
    pub send_expect_continue: bool,
    /// `io-chunk-size`, read buffer size of a connection.
    pub io_chunk_size: NonZeroUsize,
    /// `auto-accept-encoding`, advertise and decode gzip.
    pub auto_accept_encoding: bool,
    /// `log-raw-reads`, log received bytes at trace level.
    pub log_raw_reads: bool,
    /// `log-raw-writes`, log sent bytes at trace level.
    pub log_raw_writes: bool,
    /// `tls-options`
    pub tls: TlsOptions,
    /// `user-agent`
    pub user_agent: HeaderValue,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            keep_alive: true,
            connect_timeout: Some(Duration::from_secs(15)),
            transfer_timeout: Some(Duration::from_secs(30)),
            keep_alive_idle_timeout: Duration::from_secs(30),
            follow_redirects: true,
            auto_referer: true,
            max_connections: None,
            max_connections_per_host: DEFAULT_PER_HOST,
            continue_wait: Duration::from_secs(3),
            buffer_response_body: true,
            max_header_bytes: None,
            max_body_bytes: None,
            body_spill_threshold: 2 * 1024 * 1024,
            store_body: true,
            bind_local_ip: None,
            send_expect_continue: true,
            io_chunk_size: DEFAULT_IO_CHUNK,
            auto_accept_encoding: true,
            log_raw_reads: false,
            log_raw_writes: false,
            tls: TlsOptions::default(),
            user_agent: HeaderValue::from_static(DEFAULT_USER_AGENT),
        }
    }
}

/// TLS options of `https` connections.
#[derive(Clone, Debug)]
pub struct TlsOptions {
    /// Verify the peer certificate chain and name.
    pub verify_peer: bool,
    /// PEM file of additional trusted root certificates.
    pub ca_file: Option<PathBuf>,
    /// PEM file holding a client certificate chain and its private key.
    pub local_cert: Option<PathBuf>,
    /// Send the server name indication extension.
    pub sni_enabled: bool,
    /// Name to verify and send as SNI instead of the URI host.
    pub server_name: Option<String>,
}

impl Default for TlsOptions {
    fn default() -> Self {
        Self {
            verify_peer: true,
            ca_file: None,
            local_cert: None,
            sni_enabled: true,
            server_name: None,
        }
    }
}

/// Dynamically typed option value, see [`Options::set`].
#[derive(Clone, Debug)]
pub enum OptionValue {
    Bool(bool),
    Int(i64),
    Str(String),
    Tls(TlsOptions),
}

/// Option error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("unknown option: {0}")]
    UnknownOption(String),
    #[error("invalid value for option {key}: expected {expected}")]
    InvalidValue { key: String, expected: &'static str },
}

// ===== Dynamic =====

impl Options {
    /// All option names accepted by [`Options::set`].
    pub const KEYS: &'static [&'static str] = &[
        "keep-alive",
        "connect-timeout",
        "transfer-timeout",
        "keep-alive-idle-timeout",
        "follow-redirects",
        "auto-referer",
        "max-connections",
        "max-connections-per-host",
        "continue-wait",
        "buffer-response-body",
        "max-header-bytes",
        "max-body-bytes",
        "body-spill-threshold",
        "store-body",
        "bind-local-ip",
        "send-expect-continue",
        "io-chunk-size",
        "auto-accept-encoding",
        "log-raw-reads",
        "log-raw-writes",
        "tls-options",
        "user-agent",
    ];

    /// Set an option by its name.
    ///
    /// Durations are whole seconds, where a value `<= 0` disables connect and transfer timeouts.
    /// Size limits accept `-1` as unlimited. Booleans also accept `0`/`1` and the strings
    /// `true`/`false`, `on`/`off`, and `yes`/`no`.
    ///
    /// ```rust
    /// use ferry::Options;
    ///
    /// let mut options = Options::default();
    /// options.set("keep-alive", false).unwrap();
    /// options.set("max-connections", -1).unwrap();
    /// assert!(options.set("max-connection", 1).is_err());
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownOption`] for unknown key, or [`ConfigError::InvalidValue`]
    /// if the value cannot be converted, in which case the option is left unchanged.
    pub fn set(&mut self, key: &str, value: impl Into<OptionValue>) -> Result<(), ConfigError> {
        let value = value.into();
        match key {
            "keep-alive" => self.keep_alive = value.to_bool(key)?,
            "connect-timeout" => self.connect_timeout = value.to_timeout(key)?,
            "transfer-timeout" => self.transfer_timeout = value.to_timeout(key)?,
            "keep-alive-idle-timeout" => self.keep_alive_idle_timeout = value.to_duration(key)?,
            "follow-redirects" => self.follow_redirects = value.to_bool(key)?,
            "auto-referer" => self.auto_referer = value.to_bool(key)?,
            "max-connections" => {
                self.max_connections = match value.to_int(key)? {
                    -1 => None,
                    n => Some(to_non_zero(key, n)?),
                }
            }
            "max-connections-per-host" => {
                self.max_connections_per_host = to_non_zero(key, value.to_int(key)?)?
            }
            "continue-wait" => self.continue_wait = value.to_duration(key)?,
            "buffer-response-body" => self.buffer_response_body = value.to_bool(key)?,
            "max-header-bytes" => self.max_header_bytes = value.to_limit(key)?,
            "max-body-bytes" => self.max_body_bytes = value.to_limit(key)?,
            "body-spill-threshold" => self.body_spill_threshold = value.to_unsigned(key)?,
            "store-body" => self.store_body = value.to_bool(key)?,
            "bind-local-ip" => {
                self.bind_local_ip = match value {
                    OptionValue::Str(ip) if ip.is_empty() => None,
                    OptionValue::Str(ip) => match ip.parse() {
                        Ok(ip) => Some(ip),
                        Err(_) => return Err(invalid(key, "an ip address")),
                    },
                    _ => return Err(invalid(key, "an ip address")),
                }
            }
            "send-expect-continue" => self.send_expect_continue = value.to_bool(key)?,
            "io-chunk-size" => self.io_chunk_size = to_non_zero(key, value.to_int(key)?)?,
            "auto-accept-encoding" => self.auto_accept_encoding = value.to_bool(key)?,
            "log-raw-reads" => self.log_raw_reads = value.to_bool(key)?,
            "log-raw-writes" => self.log_raw_writes = value.to_bool(key)?,
            "tls-options" => match value {
                OptionValue::Tls(tls) => self.tls = tls,
                _ => return Err(invalid(key, "tls options")),
            },
            "user-agent" => match value {
                OptionValue::Str(agent) if !agent.is_empty() => {
                    match HeaderValue::from_bytes(agent) {
                        Ok(agent) => self.user_agent = agent,
                        Err(_) => return Err(invalid(key, "a valid header value")),
                    }
                }
                _ => return Err(invalid(key, "a non-empty string")),
            },
            _ => return Err(ConfigError::UnknownOption(key.to_owned())),
        }
        Ok(())
    }

    /// Set multiple options, stopping at the first error.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`], options before it are already applied.
    pub fn set_all<I, K, V>(&mut self, options: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<OptionValue>,
    {
        for (key, value) in options {
            self.set(key.as_ref(), value)?;
        }
        Ok(())
    }
}

fn invalid(key: &str, expected: &'static str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_owned(),
        expected,
    }
}

fn to_non_zero(key: &str, value: i64) -> Result<NonZeroUsize, ConfigError> {
    usize::try_from(value)
        .ok()
        .and_then(NonZeroUsize::new)
        .ok_or_else(|| invalid(key, "a positive integer"))
}

impl OptionValue {
    fn to_bool(&self, key: &str) -> Result<bool, ConfigError> {
        match self {
            Self::Bool(b) => Ok(*b),
            Self::Int(0) => Ok(false),
            Self::Int(1) => Ok(true),
            Self::Str(s) => match s.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "on" | "yes" => Ok(true),
                "0" | "false" | "off" | "no" | "" => Ok(false),
                _ => Err(invalid(key, "a boolean")),
            },
            _ => Err(invalid(key, "a boolean")),
        }
    }

    fn to_int(&self, key: &str) -> Result<i64, ConfigError> {
        match self {
            Self::Int(n) => Ok(*n),
            Self::Str(s) => s.trim().parse().map_err(|_| invalid(key, "an integer")),
            _ => Err(invalid(key, "an integer")),
        }
    }

    fn to_unsigned(&self, key: &str) -> Result<u64, ConfigError> {
        u64::try_from(self.to_int(key)?).map_err(|_| invalid(key, "a non-negative integer"))
    }

    fn to_duration(&self, key: &str) -> Result<Duration, ConfigError> {
        Ok(Duration::from_secs(self.to_unsigned(key)?))
    }

    fn to_timeout(&self, key: &str) -> Result<Option<Duration>, ConfigError> {
        match self.to_int(key)? {
            ..=0 => Ok(None),
            secs => Ok(Some(Duration::from_secs(secs.unsigned_abs()))),
        }
    }

    fn to_limit<T: TryFrom<i64>>(&self, key: &str) -> Result<Option<T>, ConfigError> {
        match self.to_int(key)? {
            -1 => Ok(None),
            n => T::try_from(n)
                .map(Some)
                .map_err(|_| invalid(key, "a non-negative integer or -1")),
        }
    }
}

impl From<bool> for OptionValue {
    #[inline]
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i32> for OptionValue {
    #[inline]
    fn from(value: i32) -> Self {
        Self::Int(value.into())
    }
}

impl From<i64> for OptionValue {
    #[inline]
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<u32> for OptionValue {
    #[inline]
    fn from(value: u32) -> Self {
        Self::Int(value.into())
    }
}

impl From<&str> for OptionValue {
    #[inline]
    fn from(value: &str) -> Self {
        Self::Str(value.to_owned())
    }
}

impl From<String> for OptionValue {
    #[inline]
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<TlsOptions> for OptionValue {
    #[inline]
    fn from(value: TlsOptions) -> Self {
        Self::Tls(value)
    }
}
