//! Convenience macros for module development.

/// Export a module factory from a `cdylib` so the manager can load it with
/// the `dynamic` feature.
///
/// The library and the host must be built with the same compiler and the
/// same `mumo-plugin` version.
///
/// # Example
/// ```rust,ignore
/// fn create(name: &str, remote: &mut ModuleRemote, config: ModuleConfig) -> AppResult<Box<dyn Module>> {
///     Ok(Box::new(Greeter::new(name, config)?))
/// }
///
/// declare_module!(create);
/// ```
#[macro_export]
macro_rules! declare_module {
    ($factory:path) => {
        #[unsafe(no_mangle)]
        #[allow(improper_ctypes_definitions)]
        pub extern "C" fn mumo_module_factory() -> $crate::catalog::ModuleFactory {
            $factory
        }
    };
}

/// Register compiled-in modules in a catalog.
///
/// # Example
/// ```rust,ignore
/// let mut catalog = ModuleCatalog::new();
/// register_modules!(catalog, {
///     "onjoin" => onjoin::create,
///     "eventlog" => eventlog::create,
/// });
/// ```
#[macro_export]
macro_rules! register_modules {
    ($catalog:expr, { $($name:expr => $factory:path),* $(,)? }) => {{
        $(
            $catalog.register($name, $factory);
        )*
    }};
}
