pub mod config;
pub mod dump;
pub mod query;
pub mod worker;

use std::path::PathBuf;

use almanac_core::logging_facility::{init_with_level, Profile};
use almanac_core::AlmanacConfig;
use anyhow::Context;

pub const EXIT_FAILURE: u8 = 1;
/// Conventional status for a run stopped by SIGINT
pub const EXIT_CANCELLED: u8 = 130;

/// Options accepted by every command
#[derive(Debug, Clone, Default)]
pub struct GlobalArgs {
    pub config: Option<PathBuf>,
    pub verbose: u8,
}

impl GlobalArgs {
    pub fn config_path(&self) -> PathBuf {
        AlmanacConfig::resolve_path(self.config.as_deref())
    }

    pub fn load_config(&self) -> anyhow::Result<(PathBuf, AlmanacConfig)> {
        let path = self.config_path();
        let config = AlmanacConfig::load(&path)
            .with_context(|| format!("loading configuration from {}", path.display()))?;
        Ok((path, config))
    }
}

/// Log level for a `-v` count; `RUST_LOG` still wins
pub fn verbosity_directive(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "almanac=info",
        _ => "almanac=debug",
    }
}

pub fn init_logging(config: &AlmanacConfig, verbose: u8) {
    let profile = if config.logging.json {
        Profile::Production
    } else {
        Profile::Development
    };
    init_with_level(profile, Some(verbosity_directive(verbose)));
}
