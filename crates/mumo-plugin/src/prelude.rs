//! Prelude for module authors.

pub use std::sync::Arc;

pub use mumo_core::config::ModuleConfig;
pub use mumo_core::error::{AppError, ErrorKind};
pub use mumo_core::result::AppResult;
pub use mumo_core::types::{ActionId, ChannelId, HandlerKey, ServerId, ServerScope, SessionId};
pub use mumo_transport::{Channel, ContextMask, ContextTarget, MetaProxy, ServerProxy, TextMessage, User};

pub use crate::catalog::{ModuleCatalog, ModuleFactory};
pub use crate::handlers::{ContextCallbacks, ContextMenuHandler, MetaCallbacks, ServerCallbacks};
pub use crate::module::Module;
pub use crate::remote::ModuleRemote;

pub use crate::{declare_module, register_modules};
