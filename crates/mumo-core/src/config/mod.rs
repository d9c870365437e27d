//! Application configuration schemas.
//!
//! All configuration structs are deserialized via the `config` crate from
//! a single TOML or INI file, overlaid with `MUMO__`-prefixed environment
//! variables. Each sub-module represents a logical configuration section.

pub mod de;
pub mod logging;
pub mod module;
pub mod modules;
pub mod murmur;
pub mod transport;

use std::path::Path;

use serde::{Deserialize, Serialize};

pub use self::logging::LoggingConfig;
pub use self::module::ModuleConfig;
pub use self::modules::ModulesConfig;
pub use self::murmur::MurmurConfig;
pub use self::transport::TransportConfig;

use crate::error::AppError;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Module discovery and lifecycle settings.
    #[serde(default)]
    pub modules: ModulesConfig,
    /// Voice server connection settings.
    #[serde(default)]
    pub transport: TransportConfig,
    /// Which virtual servers to moderate.
    #[serde(default)]
    pub murmur: MurmurConfig,
    /// Logging settings.
    #[serde(default)]
    pub log: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from `path`, overlaid with `MUMO__*` environment variables.
    ///
    /// The file format is chosen from the extension (`.toml`, `.json`,
    /// `.yaml`); anything else is read as INI.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(file_source(path).required(true))
            .add_source(
                config::Environment::with_prefix("MUMO")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| {
                AppError::configuration(format!(
                    "Failed to build config from '{}': {e}",
                    path.display()
                ))
            })?;

        config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))
    }
}

/// Builds a `config` file source, picking the format from the extension.
pub(crate) fn file_source(
    path: &Path,
) -> config::File<config::FileSourceFile, config::FileFormat> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());

    let format = match extension.as_deref() {
        Some("toml") => config::FileFormat::Toml,
        Some("json") => config::FileFormat::Json,
        Some("yaml") | Some("yml") => config::FileFormat::Yaml,
        _ => config::FileFormat::Ini,
    };

    config::File::new(&path.to_string_lossy(), format)
}
