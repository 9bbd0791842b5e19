//! Merge rules: defaults, override order, conflict handling.
//!
//! Sources are added lowest-priority first; later sources override earlier
//! ones key by key. Lists (such as simulated devices) are replaced whole.

use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with merge policy defaults applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError>
{
    Config::builder()
        .set_default("server.address", "0.0.0.0:50051")?
        .set_default("server.shutdown_grace_ms", 100)?
        .set_default("engine.kind", "simulated")?
        .set_default("logging.level", "info")?
        .set_default("logging.format", "text")?
        .set_default("logging.output", "stderr")
}
