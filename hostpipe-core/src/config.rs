use std::time::Duration;

use hostpipe_types::{ConfigError, HeaderSet, TransportTarget};

use crate::AgentOptions;

/// Timeout applied to each export request.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Interval between flushes of accumulated metric data.
pub const FLUSH_INTERVAL: Duration = Duration::from_secs(5);

/// The fully assembled exporter configuration.
///
/// Built once per process run and immutable afterwards. Any invalid input
/// has been rejected before this exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExporterConfig {
    /// Where the exporter connects.
    pub target: TransportTarget,
    /// Static headers sent with every request.
    pub headers: HeaderSet,
    /// Per-request timeout.
    pub request_timeout: Duration,
    /// Flush cadence of the periodic reader.
    pub flush_interval: Duration,
}

impl ExporterConfig {
    /// Composes a target and header set with the fixed timeout policy.
    pub fn assemble(target: TransportTarget, headers: HeaderSet) -> Self {
        ExporterConfig {
            target,
            headers,
            request_timeout: REQUEST_TIMEOUT,
            flush_interval: FLUSH_INTERVAL,
        }
    }

    /// Resolves and assembles the configuration carried by `options`.
    pub fn from_options(options: &AgentOptions) -> Result<Self, ConfigError> {
        let target = options.endpoint_input().resolve()?;
        let headers = HeaderSet::build(
            &options.db,
            &options.username,
            &options.password,
            options.auth_policy,
        );
        Ok(Self::assemble(target, headers))
    }

    /// The full url the exporter posts to.
    pub fn endpoint_url(&self) -> String {
        self.target.to_string()
    }
}

#[cfg(test)]
mod test {
    use hostpipe_types::{AuthPolicy, DATABASE_HEADER, DEFAULT_INGEST_PATH};

    use super::*;

    #[test]
    fn test_fixed_policy_constants() {
        let target = TransportTarget {
            host_port: "h:4000".into(),
            url_path: DEFAULT_INGEST_PATH.into(),
            use_tls: true,
        };
        let config = ExporterConfig::assemble(target, HeaderSet::default());
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.flush_interval, Duration::from_secs(5));
    }

    #[test]
    fn test_default_options_end_to_end() {
        let config = ExporterConfig::from_options(&AgentOptions::default()).unwrap();
        assert_eq!(config.target.host_port, "localhost");
        assert_eq!(config.target.url_path, DEFAULT_INGEST_PATH);
        // Default TLS policy assumes TLS without an explicit signal.
        assert!(config.target.use_tls);
        assert_eq!(config.headers.get(DATABASE_HEADER), Some("public"));
        assert_eq!(config.headers.len(), 1);
        assert_eq!(
            config.endpoint_url(),
            "https://localhost/v1/otlp/v1/metrics"
        );
    }

    #[test]
    fn test_explicit_url_with_credentials_end_to_end() {
        let options = AgentOptions {
            endpoint: "http://1.2.3.4:4000/v1/otlp/v1/metrics".into(),
            username: "a".into(),
            password: "b".into(),
            ..Default::default()
        };
        let config = ExporterConfig::from_options(&options).unwrap();
        assert_eq!(config.target.host_port, "1.2.3.4:4000");
        assert_eq!(config.target.url_path, "/v1/otlp/v1/metrics");
        assert!(!config.target.use_tls);
        assert_eq!(
            config.headers.get("Authorization"),
            Some("Basic YTpi") // base64("a:b")
        );
        assert_eq!(
            config.endpoint_url(),
            "http://1.2.3.4:4000/v1/otlp/v1/metrics"
        );
    }

    #[test]
    fn test_invalid_input_rejected_upstream() {
        let options = AgentOptions {
            host: String::new(),
            ..Default::default()
        };
        assert!(ExporterConfig::from_options(&options).is_err());
    }

    #[test]
    fn test_assembly_is_idempotent() {
        let options = AgentOptions {
            username: "a".into(),
            password: "b".into(),
            auth_policy: AuthPolicy::AlwaysEmit,
            ..Default::default()
        };
        assert_eq!(
            ExporterConfig::from_options(&options).unwrap(),
            ExporterConfig::from_options(&options).unwrap()
        );
    }
}
