/// Service name reported in the exported resource.
pub const SERVICE_NAME: &str = "hostpipe";

/// Agent version reported in the exported resource.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
