use std::fmt;

use thiserror::Error;
use url::Url;

/// The ingestion path used when no explicit endpoint url is given.
pub const DEFAULT_INGEST_PATH: &str = "/v1/otlp/v1/metrics";

/// Raised when the transport target cannot be derived from the inputs.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Raised if the endpoint url cannot be parsed or has no host.
    #[error("invalid endpoint url `{given}`: {reason}")]
    InvalidEndpoint {
        /// The offending input, verbatim.
        given: String,
        /// Why it was rejected.
        reason: String,
    },
    /// Raised if neither an endpoint url nor a host is available.
    #[error("an endpoint url or a host is required")]
    MissingHost,
}

/// Controls how the host/port form decides between TLS and plaintext.
///
/// The explicit insecure flag always wins; this policy only decides what
/// happens when no flag is given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TlsPolicy {
    /// TLS unless explicitly disabled. The safe default.
    #[default]
    RequireExplicit,
    /// Additionally treat loopback hosts (`localhost`, `127.0.0.1`) as an
    /// implicit insecure signal.
    LoopbackInsecure,
}

/// The raw, user-supplied inputs the transport target is derived from.
///
/// Constructed once at startup and never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndpointInput {
    /// Full endpoint url. When non-empty it takes precedence over
    /// `host`/`port` and the TLS policy.
    pub endpoint: String,
    /// Target host for the host/port form.
    pub host: String,
    /// Optional port suffix for the host/port form.
    pub port: String,
    /// Explicit TLS-disable override (host/port form only).
    pub insecure: bool,
    /// TLS decision policy for the host/port form.
    pub tls_policy: TlsPolicy,
}

impl EndpointInput {
    /// Resolves these inputs into a [`TransportTarget`].
    ///
    /// Exactly one strategy applies per call: a non-empty `endpoint` url is
    /// authoritative; otherwise the host/port form is used with the
    /// configured TLS policy.
    pub fn resolve(&self) -> Result<TransportTarget, ConfigError> {
        if !self.endpoint.is_empty() {
            return self.resolve_from_url();
        }
        self.resolve_from_host()
    }

    fn resolve_from_url(&self) -> Result<TransportTarget, ConfigError> {
        let url = Url::parse(&self.endpoint).map_err(|err| ConfigError::InvalidEndpoint {
            given: self.endpoint.clone(),
            reason: err.to_string(),
        })?;
        let host = url
            .host_str()
            .ok_or_else(|| ConfigError::InvalidEndpoint {
                given: self.endpoint.clone(),
                reason: "url has no host".into(),
            })?;
        // The url crate drops a scheme-default port on access, so it is put
        // back here to keep the authority fully specified.
        let host_port = match url.port_or_known_default() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_owned(),
        };
        Ok(TransportTarget {
            host_port,
            // Passed through verbatim; the caller owns path correctness in
            // the url form.
            url_path: url.path().to_owned(),
            use_tls: url.scheme() != "http",
        })
    }

    fn resolve_from_host(&self) -> Result<TransportTarget, ConfigError> {
        if self.host.is_empty() {
            return Err(ConfigError::MissingHost);
        }
        let host_port = if self.port.is_empty() {
            self.host.clone()
        } else {
            format!("{}:{}", self.host, self.port)
        };
        let use_tls = if self.insecure {
            false
        } else {
            !(self.tls_policy == TlsPolicy::LoopbackInsecure && is_loopback(&self.host))
        };
        Ok(TransportTarget {
            host_port,
            url_path: DEFAULT_INGEST_PATH.to_owned(),
            use_tls,
        })
    }
}

/// A fully resolved transport target.
///
/// Invariants: `host_port` is never empty; `url_path` is
/// [`DEFAULT_INGEST_PATH`] unless derived from an explicit url; `use_tls` is
/// `false` only on an explicit signal (`http` scheme, insecure flag, or a
/// loopback host under [`TlsPolicy::LoopbackInsecure`]).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransportTarget {
    /// Host plus optional `:port` suffix.
    pub host_port: String,
    /// Url path of the ingestion endpoint.
    pub url_path: String,
    /// Whether to speak TLS to the target.
    pub use_tls: bool,
}

impl TransportTarget {
    /// The url scheme implied by the TLS flag.
    pub fn scheme(&self) -> &'static str {
        if self.use_tls {
            "https"
        } else {
            "http"
        }
    }
}

impl fmt::Display for TransportTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}{}", self.scheme(), self.host_port, self.url_path)
    }
}

fn is_loopback(host: &str) -> bool {
    host.eq_ignore_ascii_case("localhost") || host == "127.0.0.1"
}
