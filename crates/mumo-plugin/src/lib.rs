//! # mumo-plugin
//!
//! Module framework for mumo. Provides:
//!
//! - The module manager actor with its subscription registries and
//!   loaded-module table ([`Manager`], [`ManagerHandle`])
//! - The module contract ([`Module`]) and the per-category callback traits
//! - The module facade ([`ModuleRemote`]) with per-module context menu routing
//! - A catalog of compiled-in modules and, with the `dynamic` feature,
//!   loading from shared libraries via `libloading`
//! - The transport bridge: listener forwarders and the connection watchdog

pub mod bridge;
pub mod catalog;
pub mod events;
pub mod handlers;
pub mod loader;
pub mod macros;
pub mod manager;
pub mod menu;
pub mod module;
pub mod prelude;
pub mod registry;
pub mod remote;

pub use bridge::ConnectionSupervisor;
pub use catalog::{ModuleCatalog, ModuleFactory};
pub use events::{ContextEvent, MetaEvent, ServerEvent};
pub use handlers::{ContextCallbacks, ContextMenuHandler, MetaCallbacks, ServerCallbacks};
pub use manager::{Manager, ManagerHandle, ModuleInfo};
pub use menu::ContextMenuState;
pub use module::{Module, ModuleHost, ModuleMailbox};
pub use registry::{Category, Subscription, SubscriptionRegistry};
pub use remote::ModuleRemote;
