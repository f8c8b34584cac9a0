//! Logging initialization module
//!
//! Provides a single initialization point for the logging facility.
//! All profiles write to stderr; stdout belongs to command output and to
//! the worker reply line.

use std::sync::Once;
use tracing_subscriber::{util::SubscriberInitExt, EnvFilter};

/// Logging profile configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    /// Human-readable output for development
    Development,
    /// JSON structured output for production
    Production,
    /// Warnings and errors only, used by worker processes
    Quiet,
    /// Test capture mode for deterministic testing
    Test,
}

impl Profile {
    fn default_directive(&self) -> &'static str {
        match self {
            Profile::Development => "almanac=debug",
            Profile::Production => "almanac=info",
            Profile::Quiet | Profile::Test => "warn",
        }
    }
}

static INIT_ONCE: Once = Once::new();

/// Initialize the logging facility with the profile's default level
///
/// # Profiles
///
/// - **Development**: Human-readable logs with debug level
/// - **Production**: JSON structured logs with info level
/// - **Quiet**: Human-readable warnings only
/// - **Test**: Capture mode for test assertions
pub fn init(profile: Profile) {
    init_with_level(profile, None);
}

/// Initialize the logging facility with an explicit default directive
///
/// `RUST_LOG` still takes precedence when set. Only the first call has any
/// effect.
pub fn init_with_level(profile: Profile, directive: Option<&str>) {
    INIT_ONCE.call_once(|| {
        let default = directive.unwrap_or(profile.default_directive()).to_string();
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
        match profile {
            Profile::Development | Profile::Quiet => {
                tracing_subscriber::fmt()
                    .with_writer(std::io::stderr)
                    .with_env_filter(filter)
                    .init();
            }
            Profile::Production => {
                tracing_subscriber::fmt()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_env_filter(filter)
                    .init();
            }
            Profile::Test => {
                // Test capture is initialized separately via init_test_capture()
                tracing_subscriber::registry().init();
            }
        }
    });
}
