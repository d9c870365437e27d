//! Per-module configuration.
//!
//! Each enabled module has one configuration file in the modules
//! configuration directory. Modules deserialize the sections they care
//! about into their own serde structs.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;

use crate::error::AppError;
use crate::types::ServerId;

/// File extensions tried, in order, when looking up a module's configuration.
const EXTENSIONS: &[&str] = &["toml", "ini", "conf"];

/// A typed view over one module's configuration file.
#[derive(Debug, Clone)]
pub struct ModuleConfig {
    inner: config::Config,
    source: Option<PathBuf>,
}

impl ModuleConfig {
    /// A configuration with no sections. Every section lookup yields defaults.
    pub fn empty() -> Self {
        Self {
            inner: config::Config::default(),
            source: None,
        }
    }

    /// Build a configuration from a JSON object whose keys are section names.
    pub fn from_json(value: serde_json::Value) -> Result<Self, AppError> {
        let text = serde_json::to_string(&value)?;
        let inner = config::Config::builder()
            .add_source(config::File::from_str(&text, config::FileFormat::Json))
            .build()?;
        Ok(Self {
            inner,
            source: None,
        })
    }

    /// Load a configuration file. The format follows the extension; files
    /// without a known extension are read as INI.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let inner = config::Config::builder()
            .add_source(super::file_source(path).required(true))
            .build()
            .map_err(|e| {
                AppError::configuration(format!(
                    "Failed to read module config '{}': {e}",
                    path.display()
                ))
            })?;
        tracing::debug!(path = %path.display(), "Loaded module configuration");
        Ok(Self {
            inner,
            source: Some(path.to_path_buf()),
        })
    }

    /// Find the configuration file for module `name` inside `dir`.
    ///
    /// Tries `<name>.toml`, `<name>.ini`, `<name>.conf` and finally the bare
    /// `<name>`.
    pub fn locate(dir: &Path, name: &str) -> Option<PathBuf> {
        EXTENSIONS
            .iter()
            .map(|ext| dir.join(format!("{name}.{ext}")))
            .chain(std::iter::once(dir.join(name)))
            .find(|candidate| candidate.is_file())
    }

    /// Path the configuration was read from, if any.
    pub fn path(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Whether a section (or key) named `name` exists.
    pub fn has_section(&self, name: &str) -> bool {
        self.inner.get::<config::Value>(name).is_ok()
    }

    /// Deserialize section `name`. A missing section yields `T::default()`.
    pub fn section<T>(&self, name: &str) -> Result<T, AppError>
    where
        T: DeserializeOwned + Default,
    {
        match self.inner.get::<T>(name) {
            Ok(value) => Ok(value),
            Err(config::ConfigError::NotFound(_)) => Ok(T::default()),
            Err(e) => Err(AppError::configuration(format!(
                "Invalid section '{name}': {e}"
            ))),
        }
    }

    /// Deserialize the `server_<id>` section if present, otherwise `fallback`.
    pub fn server_section<T>(&self, server: ServerId, fallback: &str) -> Result<T, AppError>
    where
        T: DeserializeOwned + Default,
    {
        let specific = format!("server_{server}");
        if self.has_section(&specific) {
            self.section(&specific)
        } else {
            self.section(fallback)
        }
    }
}

impl Default for ModuleConfig {
    fn default() -> Self {
        Self::empty()
    }
}
