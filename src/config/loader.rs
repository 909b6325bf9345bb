// Configuration loader
// Layers built-in defaults, an optional TOML file and environment variables

use anyhow::{bail, Context, Result};
use config::{Config, Environment, File, FileFormat};
use std::path::Path;

use super::settings::GatewayConfig;

/// Load configuration from an optional file plus the process environment
pub fn load_config(path: Option<&Path>) -> Result<GatewayConfig> {
    load_from_sources(path, Environment::default())
}

/// Load from explicit sources (tests inject a fake environment)
pub fn load_from_sources(path: Option<&Path>, env: Environment) -> Result<GatewayConfig> {
    let mut builder = Config::builder();

    if let Some(path) = path {
        if !path.exists() {
            bail!("Config file not found: {}", path.display());
        }
        builder = builder.add_source(File::from(path).format(FileFormat::Toml));
    }

    let settings = builder
        .add_source(env)
        .build()
        .context("Failed to assemble configuration")?;

    let config: GatewayConfig = settings
        .try_deserialize()
        .context("Failed to parse configuration")?;

    if config.api_key.is_empty() {
        bail!("api_key must not be empty");
    }

    Ok(config)
}
