use clap::Parser;
use hostpipe_core::{AgentOptions, AuthPolicy, TlsPolicy};

/// Command line interface of the agent.
#[derive(Parser, Debug)]
#[command(
    name = "hostpipe",
    version,
    about = "Export host metrics over OTLP/HTTP"
)]
pub struct Cli {
    /// The host address of the metrics backend. Ignored when --endpoint is
    /// given.
    #[arg(long, default_value = "localhost")]
    pub host: String,

    /// The port of the backend HTTP endpoint.
    #[arg(long, default_value = "")]
    pub port: String,

    /// The name of the target database.
    #[arg(long, default_value = "public")]
    pub db: String,

    /// The basic auth username.
    #[arg(long, default_value = "")]
    pub username: String,

    /// The basic auth password.
    #[arg(long, default_value = "")]
    pub password: String,

    /// Full OTLP/HTTP endpoint url; takes precedence over --host/--port.
    #[arg(long, default_value = "")]
    pub endpoint: String,

    /// Disable TLS for the host/port form.
    #[arg(long = "no-secure")]
    pub no_secure: bool,

    /// Treat localhost and 127.0.0.1 as an implicit insecure signal.
    #[arg(long)]
    pub loopback_insecure: bool,

    /// Always send the Authorization header, even with empty credentials.
    #[arg(long)]
    pub permissive_auth: bool,

    /// Increase log verbosity (-v: debug, -vv: trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Converts the parsed flags into immutable agent options.
    pub fn into_options(self) -> AgentOptions {
        AgentOptions {
            endpoint: self.endpoint,
            host: self.host,
            port: self.port,
            db: self.db,
            username: self.username,
            password: self.password,
            insecure: self.no_secure,
            tls_policy: if self.loopback_insecure {
                TlsPolicy::LoopbackInsecure
            } else {
                TlsPolicy::RequireExplicit
            },
            auth_policy: if self.permissive_auth {
                AuthPolicy::AlwaysEmit
            } else {
                AuthPolicy::RequireBothCredentials
            },
            ..AgentOptions::default()
        }
    }
}
