//! # UI ModKit - Lazy UI Module System
//!
//! A small crate for composing a user-interface application out of independently
//! developed modules, each optionally owning a root view-model.
//!
//! ## Features
//!
//! - **Capability split**: hosts enumerate, sort and reset modules through
//!   non-generic contracts; typed access is a downcast away
//! - **Lazy roots**: a module's root view-model is built on first read, cached,
//!   and explicitly invalidatable with `clear_root()`
//! - **Container wiring**: modules capture the [`ClientHub`] during registration
//!   and may resolve their root from it
//! - **Auto-discovery**: modules submit registrators via inventory
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ui_modkit::{ModuleInfo, RootViewModel, UiModuleBase};
//!
//! struct ShellRoot;
//! impl RootViewModel for ShellRoot {}
//!
//! let module = UiModuleBase::builder(ModuleInfo::new("shell", "Shell", 10))
//!     .factory(|| Ok(Arc::new(ShellRoot)))
//!     .build();
//! let root = module.root_view_model()?;
//! ```

pub use anyhow::Result;

// Re-export inventory for user convenience
pub use inventory;

pub mod client_hub;
pub mod context;
pub mod contracts;
pub mod module_base;
pub mod registry;

pub use client_hub::{ClientHub, ClientHubError};
pub use context::{ConfigProvider, ModuleCtx, ModuleCtxBuilder};
pub use contracts::{
    HostedModule, RegisterModule, RootLifecycle, RootModelType, RootViewModel, TypedUiModule,
    UiModule,
};
pub use module_base::{ModuleError, ModuleInfo, ModuleOverrides, UiModuleBase, UiModuleBuilder};
pub use registry::{ModuleRegistry, Registrator, RegistryBuilder, RegistryError};

#[cfg(test)]
mod tests;
