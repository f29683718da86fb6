use std::time::Duration;

use hostpipe_types::{AuthPolicy, EndpointInput, TlsPolicy};

/// Configuration for the agent.
///
/// Constructed once at startup (normally from command line flags) and passed
/// by reference to every component; no component keeps mutable global
/// configuration state.
///
/// # Examples
///
/// ```
/// let options = hostpipe_core::AgentOptions {
///     host: "metrics.example.com".into(),
///     port: "4000".into(),
///     ..Default::default()
/// };
/// assert_eq!(options.db, "public");
/// ```
#[derive(Debug, Clone)]
pub struct AgentOptions {
    /// Full endpoint url; when non-empty it takes precedence over
    /// `host`/`port`.
    pub endpoint: String,
    /// Target host of the metrics backend.
    pub host: String,
    /// Optional port of the backend HTTP endpoint.
    pub port: String,
    /// Name of the target database, sent verbatim in the selector header.
    pub db: String,
    /// Basic auth username.
    pub username: String,
    /// Basic auth password.
    pub password: String,
    /// Explicit TLS-disable override for the host/port form.
    pub insecure: bool,
    /// TLS decision policy for the host/port form.
    pub tls_policy: TlsPolicy,
    /// When the `Authorization` header is emitted.
    pub auth_policy: AuthPolicy,
    /// Deadline applied to the shutdown sequence on interrupt.
    pub shutdown_timeout: Duration,
}

impl AgentOptions {
    /// Creates new options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// The endpoint-resolution inputs carried by these options.
    pub fn endpoint_input(&self) -> EndpointInput {
        EndpointInput {
            endpoint: self.endpoint.clone(),
            host: self.host.clone(),
            port: self.port.clone(),
            insecure: self.insecure,
            tls_policy: self.tls_policy,
        }
    }
}

impl Default for AgentOptions {
    fn default() -> AgentOptions {
        AgentOptions {
            endpoint: String::new(),
            host: "localhost".into(),
            port: String::new(),
            db: "public".into(),
            username: String::new(),
            password: String::new(),
            insecure: false,
            tls_policy: TlsPolicy::default(),
            auth_policy: AuthPolicy::default(),
            shutdown_timeout: Duration::from_secs(10),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = AgentOptions::default();
        assert_eq!(options.host, "localhost");
        assert_eq!(options.db, "public");
        assert!(options.endpoint.is_empty());
        assert_eq!(options.tls_policy, TlsPolicy::RequireExplicit);
        assert_eq!(options.auth_policy, AuthPolicy::RequireBothCredentials);
        assert_eq!(options.shutdown_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_endpoint_input_carries_all_resolution_fields() {
        let options = AgentOptions {
            endpoint: "http://1.2.3.4:4000/v1/otlp/v1/metrics".into(),
            host: "h".into(),
            port: "4000".into(),
            insecure: true,
            tls_policy: TlsPolicy::LoopbackInsecure,
            ..Default::default()
        };
        let input = options.endpoint_input();
        assert_eq!(input.endpoint, options.endpoint);
        assert_eq!(input.host, "h");
        assert_eq!(input.port, "4000");
        assert!(input.insecure);
        assert_eq!(input.tls_policy, TlsPolicy::LoopbackInsecure);
    }
}
