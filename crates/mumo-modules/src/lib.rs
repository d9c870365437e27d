//! Built-in moderator modules.
//!
//! - [`onjoin`] moves connecting users into a configured channel
//! - [`samplecontext`] demonstrates per-user context menu entries
//! - [`eventlog`] logs every callback it can subscribe to

pub mod eventlog;
pub mod onjoin;
pub mod samplecontext;

use mumo_plugin::catalog::ModuleCatalog;
use mumo_plugin::register_modules;

/// Register every built-in module under its configuration name.
pub fn register_builtin(catalog: &mut ModuleCatalog) {
    register_modules!(catalog, {
        "onjoin" => onjoin::create,
        "samplecontext" => samplecontext::create,
        "eventlog" => eventlog::create,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_builtin() {
        let mut catalog = ModuleCatalog::new();
        register_builtin(&mut catalog);
        for name in ["onjoin", "samplecontext", "eventlog"] {
            assert!(catalog.contains(name), "missing {name}");
        }
    }
}
