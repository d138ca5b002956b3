//! Facilities for reading runtime configuration values
use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use serde::Deserialize;
#[allow(unused_imports)]
use tracing::{debug, error, info, instrument, warn};

#[derive(Deserialize, Debug)]
#[serde(default)]
/// Reader configuration
pub struct Config {
    /// Where extracted parts are written
    pub output_path: String,
    /// Maximum number of parts to extract (extraction halts if reached)
    pub max_children: u32,
    /// Single part output limit (the part is skipped if size is exceeded)
    pub max_child_output_size: u64,
    /// Whether embedded messages are saved as standalone documents
    pub extract_embedded: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_path: ".".to_string(),
            max_children: 100,
            max_child_output_size: 64 * 1024 * 1024,
            extract_embedded: true,
        }
    }
}

impl Config {
    /// Loads the configuration from a `toml` file and environment
    pub fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let config: Self = Figment::new()
            .merge(Toml::file("msgreader.toml"))
            .merge(Env::prefixed("MSGREADER__").split("__"))
            .extract()
            .map_err(|err| {
                error!("Failed to validate configuration: {}", err);
                err
            })?;
        if config.max_child_output_size > i64::MAX as u64 {
            error!(
                "Value of max_child_output_size too large (must be strictly < {})",
                i64::MAX
            );
            return Err("Value of max_child_output_size too large".into());
        }
        if config.output_path.is_empty() {
            error!("Empty output_path");
            return Err("Empty output_path".into());
        }
        Ok(config)
    }
}
