//! Config loader: assembles sources in priority order and deserializes.

use crate::config::merge::defaults::builder_with_defaults;
use crate::config::sources::{environment, explicit_file, global_file};
use crate::config::ServiceConfig;
use crate::error::ServiceError;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Loads [`ServiceConfig`] from defaults, the global file, an explicit file
/// and the environment (lowest to highest priority).
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    global_file: Option<PathBuf>,
    explicit_file: Option<PathBuf>,
    use_env: bool,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self {
            global_file: global_file::global_config_path(),
            explicit_file: None,
            use_env: true,
        }
    }
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override (or disable) the global config file location.
    pub fn with_global_file(mut self, path: Option<PathBuf>) -> Self {
        self.global_file = path;
        self
    }

    pub fn with_file(mut self, path: Option<PathBuf>) -> Self {
        self.explicit_file = path;
        self
    }

    pub fn with_env(mut self, use_env: bool) -> Self {
        self.use_env = use_env;
        self
    }

    pub fn load(&self) -> Result<ServiceConfig, ServiceError> {
        let mut builder = builder_with_defaults()?;
        builder = global_file::add_to_builder(builder, self.global_file.as_deref())?;
        if let Some(path) = &self.explicit_file {
            builder = explicit_file::add_to_builder(builder, path)?;
        }
        if self.use_env {
            builder = environment::add_to_builder(builder);
        }
        let config: ServiceConfig = builder.build()?.try_deserialize()?;
        debug!(address = %config.server.address, engine = ?config.engine.kind, "Configuration loaded");
        Ok(config)
    }

    /// Load a single file on top of defaults, ignoring other sources.
    pub fn load_from_file(path: &Path) -> Result<ServiceConfig, ServiceError> {
        Self::new()
            .with_global_file(None)
            .with_env(false)
            .with_file(Some(path.to_path_buf()))
            .load()
    }
}
