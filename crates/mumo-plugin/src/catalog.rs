//! Compiled-in module factories, looked up by module name.

use std::collections::BTreeMap;
use std::fmt;

use tracing::warn;

use mumo_core::config::ModuleConfig;
use mumo_core::result::AppResult;

use crate::module::Module;
use crate::remote::ModuleRemote;

/// Builds a module from its name, its facade and its configuration.
///
/// Runs on the manager thread. Subscriptions made through the facade are
/// applied after the factory returns.
pub type ModuleFactory = fn(&str, &mut ModuleRemote, ModuleConfig) -> AppResult<Box<dyn Module>>;

/// Name → factory table consulted before any dynamic import.
#[derive(Clone, Default)]
pub struct ModuleCatalog {
    factories: BTreeMap<String, ModuleFactory>,
}

impl ModuleCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `factory` under `name`, replacing an earlier one.
    pub fn register(&mut self, name: impl Into<String>, factory: ModuleFactory) -> &mut Self {
        let name = name.into();
        if self.factories.insert(name.clone(), factory).is_some() {
            warn!(module = %name, "Replaced module factory");
        }
        self
    }

    /// The factory registered under `name`.
    pub fn get(&self, name: &str) -> Option<ModuleFactory> {
        self.factories.get(name).copied()
    }

    /// Whether `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        self.factories.keys().cloned().collect()
    }
}

impl fmt::Debug for ModuleCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleCatalog")
            .field("modules", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}
