//! # mumo-core
//!
//! Core crate for the mumo moderator. Contains the unified error system,
//! configuration schemas (application and per-module), and the typed
//! identifiers shared by the actor runtime, the transport boundary, and
//! the module manager.
//!
//! This crate has **no** internal dependencies on other mumo crates.

pub mod config;
pub mod error;
pub mod result;
pub mod types;

pub use error::{AppError, ErrorKind};
pub use result::AppResult;
