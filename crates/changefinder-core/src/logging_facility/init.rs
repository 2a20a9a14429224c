//! Subscriber installation, selected by profile.

use std::str::FromStr;
use std::sync::Once;
use tracing_subscriber::{util::SubscriberInitExt, EnvFilter};

/// Where and how log events are written
///
/// Parsed from the CLI's `--log` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    Development,
    Production,
    Test,
}

impl FromStr for Profile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Profile::Development),
            "production" | "prod" => Ok(Profile::Production),
            "test" => Ok(Profile::Test),
            other => Err(format!("unknown logging profile: {}", other)),
        }
    }
}

static INIT_ONCE: Once = Once::new();

/// Filter from `RUST_LOG`, or `default` when it is unset or malformed
fn env_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// Install the process-wide subscriber for `profile`
///
/// Later calls are no-ops. Logs go to stderr so that attributed changes
/// on stdout stay machine-readable.
///
/// - **Development**: text, `changefinder=debug` (shows every rule firing)
/// - **Production**: JSON lines, `changefinder=info`
/// - **Test**: a bare registry; use `init_test_capture()` to capture events
pub fn init(profile: Profile) {
    INIT_ONCE.call_once(|| match profile {
        Profile::Development => tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(env_filter("changefinder=debug"))
            .init(),
        Profile::Production => tracing_subscriber::fmt()
            .json()
            .with_writer(std::io::stderr)
            .with_env_filter(env_filter("changefinder=info"))
            .init(),
        Profile::Test => tracing_subscriber::registry().init(),
    });
}
