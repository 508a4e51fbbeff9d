//! Configuration loader with environment variable support

use super::Config;
use crate::error::Result;
use config::{Environment, File};
use std::path::Path;

/// Prefix for environment overrides, e.g. `SUSTAIN__SERVER__PORT=8080`
pub const ENV_PREFIX: &str = "SUSTAIN";

/// Load configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let config = config::Config::builder()
        .add_source(File::from(path.as_ref()))
        .build()?;

    let cfg: Config = config.try_deserialize()?;
    Ok(cfg)
}

/// Load configuration from a TOML file with environment variable overrides
pub fn load_config_with_env<P: AsRef<Path>>(path: P) -> Result<Config> {
    let config = config::Config::builder()
        .add_source(File::from(path.as_ref()).required(false))
        .add_source(environment())
        .build()?;

    let cfg: Config = config.try_deserialize()?;
    Ok(cfg)
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .list_separator(",")
        .with_list_parse_key("server.allowed_origins")
        .with_list_parse_key("completion.allowed_models")
        .try_parsing(true)
}
