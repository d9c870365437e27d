//! Module discovery and dynamic import.
//!
//! Module names come from the configuration directory: every file
//! `<name>.toml`, `<name>.ini`, `<name>.conf` or `<name>` enables the module
//! `<name>`. Code for a name missing from the [`ModuleCatalog`] is imported
//! from a shared library when the `dynamic` feature is on.
//!
//! [`ModuleCatalog`]: crate::catalog::ModuleCatalog

use std::collections::BTreeSet;
use std::path::Path;

use mumo_core::error::AppError;
use mumo_core::result::AppResult;

/// Module names enabled in `cfg_dir`, sorted.
pub fn discover(cfg_dir: &Path) -> AppResult<Vec<String>> {
    let entries = std::fs::read_dir(cfg_dir).map_err(|e| {
        AppError::with_source(
            mumo_core::ErrorKind::ModuleImportFailed,
            format!("Module configuration directory '{}' is not readable", cfg_dir.display()),
            e,
        )
    })?;

    let mut names = BTreeSet::new();
    for entry in entries {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        if stem.starts_with('.') {
            continue;
        }
        let enabled = match path.extension().and_then(|e| e.to_str()) {
            None => true,
            Some(ext) => matches!(ext, "toml" | "ini" | "conf"),
        };
        if enabled {
            names.insert(stem.to_string());
        }
    }
    Ok(names.into_iter().collect())
}

#[cfg(feature = "dynamic")]
mod dynamic {
    use std::collections::HashMap;
    use std::path::{Path, PathBuf};

    use tracing::info;

    use mumo_core::error::AppError;
    use mumo_core::result::AppResult;

    use crate::catalog::ModuleFactory;

    /// Symbol a module library exports, see [`crate::declare_module`].
    #[allow(improper_ctypes_definitions)]
    pub type EntryPoint = unsafe extern "C" fn() -> ModuleFactory;

    const ENTRY_POINT: &[u8] = b"mumo_module_factory";

    /// Libraries opened for loaded modules, kept open while their code may run.
    #[derive(Debug, Default)]
    pub struct Imports {
        libraries: HashMap<String, libloading::Library>,
    }

    impl Imports {
        /// Open `<mod_dir>/<library>` for `name` and resolve its factory.
        pub fn import(&mut self, mod_dir: &Path, name: &str) -> AppResult<ModuleFactory> {
            if !self.libraries.contains_key(name) {
                let path = library_path(mod_dir, name)?;
                // SAFETY: module libraries are trusted code from the configured
                // module directory.
                let library = unsafe { libloading::Library::new(&path) }.map_err(|e| {
                    AppError::module_import_failed(format!(
                        "Failed to open module library '{}': {e}",
                        path.display()
                    ))
                })?;
                info!(module = %name, path = %path.display(), "Module library opened");
                self.libraries.insert(name.to_string(), library);
            }

            let library = self.libraries.get(name).ok_or_else(|| {
                AppError::internal(format!("Library of module '{name}' vanished"))
            })?;
            // SAFETY: the symbol is declared through `declare_module!`, which
            // fixes its signature to `EntryPoint`.
            let factory = unsafe {
                let entry: libloading::Symbol<EntryPoint> =
                    library.get(ENTRY_POINT).map_err(|e| {
                        AppError::module_import_failed(format!(
                            "Module '{name}' does not export 'mumo_module_factory': {e}"
                        ))
                    })?;
                entry()
            };
            Ok(factory)
        }

        /// Close the library of `name`. Only call once no code of it can run.
        pub fn release(&mut self, name: &str) {
            self.libraries.remove(name);
        }

        /// Number of open libraries.
        pub fn len(&self) -> usize {
            self.libraries.len()
        }
    }

    fn library_path(mod_dir: &Path, name: &str) -> AppResult<PathBuf> {
        if !mod_dir.is_dir() {
            return Err(AppError::module_import_failed(format!(
                "Module directory '{}' does not exist",
                mod_dir.display()
            )));
        }
        let candidates = [
            format!("lib{name}.so"),
            format!("lib{name}.dylib"),
            format!("{name}.dll"),
        ];
        candidates
            .iter()
            .map(|file| mod_dir.join(file))
            .find(|path| path.is_file())
            .ok_or_else(|| {
                AppError::module_import_failed(format!(
                    "No library for module '{name}' in '{}'",
                    mod_dir.display()
                ))
            })
    }
}

#[cfg(not(feature = "dynamic"))]
mod dynamic {
    use std::path::Path;

    use mumo_core::error::AppError;
    use mumo_core::result::AppResult;

    use crate::catalog::ModuleFactory;

    /// Stand-in import table when dynamic loading is disabled.
    #[derive(Debug, Default)]
    pub struct Imports;

    impl Imports {
        /// Always fails: only catalog modules are available.
        pub fn import(&mut self, mod_dir: &Path, name: &str) -> AppResult<ModuleFactory> {
            Err(AppError::module_import_failed(format!(
                "Module '{name}' is not compiled in and dynamic loading from '{}' is disabled",
                mod_dir.display()
            )))
        }

        /// Nothing to release.
        pub fn release(&mut self, _name: &str) {}

        /// Always zero.
        pub fn len(&self) -> usize {
            0
        }
    }
}

pub use dynamic::Imports;
#[cfg(feature = "dynamic")]
pub use dynamic::EntryPoint;
