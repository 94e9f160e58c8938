//! Configuration management for the project watch.
//!
//! Settings are merged from multiple sources with priority:
//! 1. Default values (hardcoded)
//! 2. Explicit config file passed to [`Settings::load`]
//! 3. File named by the `CONFIG_PATH` environment variable
//! 4. Environment variables (highest priority), e.g.
//!    `PROJECT__WATCH__BUFFER_SIZE=2000`
//!

mod watch;
pub use watch::*;


//---
use std::env;

use config::Config;
use config::Environment;
use config::File;
use serde::Deserialize;
use tracing::debug;

use crate::constants::CONFIG_ENV_PREFIX;
use crate::constants::CONFIG_ENV_SEPARATOR;
use crate::constants::CONFIG_PATH_ENV;
use crate::Result;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Settings {
    /// Per-watcher buffering and subscription defaults
    #[serde(default)]
    pub watch: WatchConfig,
}

impl Settings {
    /// Load configuration from multiple sources with priority:
    /// 1. Defaults
    /// 2. `config_path`, when given (must exist)
    /// 3. `CONFIG_PATH` file, when the variable is set
    /// 4. Environment variables
    ///
    /// The merged result is validated before it is returned.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut config = Config::builder();

        if let Some(path) = config_path {
            config = config.add_source(File::with_name(path).required(true));
        }

        if let Ok(path) = env::var(CONFIG_PATH_ENV) {
            config = config.add_source(File::with_name(&path));
        }

        config = config.add_source(
            Environment::with_prefix(CONFIG_ENV_PREFIX)
                .separator(CONFIG_ENV_SEPARATOR)
                .ignore_empty(true)
                .try_parsing(true),
        );

        let settings: Settings = config.build()?.try_deserialize()?;
        settings.validate()?;

        debug!(?settings, "settings loaded");
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        self.watch.validate()
    }
}
