//! Generic module base: identity, lazy root view-model slot, registration hook.
//!
//! Slot states: `Empty --read--> Populated --read--> Populated --clear--> Empty`.
//! Construction runs under the slot lock, so concurrent first reads build once.
//! A construction strategy must not read its own module's root.

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::client_hub::ClientHub;
use crate::context::ModuleCtx;
use crate::contracts::{
    RegisterModule, RootLifecycle, RootModelType, RootViewModel, TypedUiModule, UiModule,
};

/// Identity and display metadata, fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub order: i32,
}

impl ModuleInfo {
    pub fn new(id: impl Into<String>, name: impl Into<String>, order: i32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            order,
        }
    }

    /// Apply a configuration section. The id is never overridden.
    pub fn with_overrides(mut self, overrides: &ModuleOverrides) -> Self {
        if let Some(name) = &overrides.name {
            self.name = name.clone();
        }
        if let Some(order) = overrides.order {
            self.order = order;
        }
        self
    }
}

/// Per-module configuration section (`modules.<id>` in the app config).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleOverrides {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub order: Option<i32>,
}

#[derive(Debug, thiserror::Error)]
pub enum ModuleError {
    #[error("module '{module}' resolves its root from the container, but was never registered")]
    ResolverNotCaptured { module: String },
}

type RootFactory<R> = Box<dyn Fn() -> anyhow::Result<Arc<R>> + Send + Sync>;
type RegisterHook<R> =
    Box<dyn Fn(&UiModuleBase<R>, &ModuleCtx) -> anyhow::Result<()> + Send + Sync>;

/// Generic module owning a lazily constructed root view-model of type `R`.
///
/// Without an explicit factory the root is resolved from the [`ClientHub`] captured by
/// [`RegisterModule::register_module`].
pub struct UiModuleBase<R: RootViewModel> {
    info: ModuleInfo,
    factory: Option<RootFactory<R>>,
    on_register: Option<RegisterHook<R>>,
    resolver: RwLock<Option<Arc<ClientHub>>>,
    slot: Mutex<Option<Arc<R>>>,
}

impl<R: RootViewModel> fmt::Debug for UiModuleBase<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UiModuleBase")
            .field("info", &self.info)
            .field("root_model_type", &RootModelType::of::<R>())
            .field("has_factory", &self.factory.is_some())
            .field("has_resolver", &self.has_resolver())
            // try_lock: the slot is held for the whole construction
            .field("has_root", &self.slot.try_lock().map(|s| s.is_some()))
            .finish()
    }
}

pub struct UiModuleBuilder<R: RootViewModel> {
    info: ModuleInfo,
    factory: Option<RootFactory<R>>,
    on_register: Option<RegisterHook<R>>,
}

impl<R: RootViewModel> UiModuleBuilder<R> {
    /// Explicit construction strategy for the root view-model.
    pub fn factory<F>(mut self, f: F) -> Self
    where
        F: Fn() -> anyhow::Result<Arc<R>> + Send + Sync + 'static,
    {
        self.factory = Some(Box::new(f));
        self
    }

    /// Extension point invoked by `register_module` after the container is captured.
    pub fn on_register<H>(mut self, hook: H) -> Self
    where
        H: Fn(&UiModuleBase<R>, &ModuleCtx) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.on_register = Some(Box::new(hook));
        self
    }

    pub fn build(self) -> UiModuleBase<R> {
        UiModuleBase {
            info: self.info,
            factory: self.factory,
            on_register: self.on_register,
            resolver: RwLock::new(None),
            slot: Mutex::new(None),
        }
    }
}

impl<R: RootViewModel> UiModuleBase<R> {
    pub fn builder(info: ModuleInfo) -> UiModuleBuilder<R> {
        UiModuleBuilder {
            info,
            factory: None,
            on_register: None,
        }
    }

    /// Module whose root is built by `factory`.
    pub fn with_factory<F>(info: ModuleInfo, factory: F) -> Self
    where
        F: Fn() -> anyhow::Result<Arc<R>> + Send + Sync + 'static,
    {
        Self::builder(info).factory(factory).build()
    }

    /// Module whose root is resolved from the container captured at registration.
    pub fn resolved(info: ModuleInfo) -> Self {
        Self::builder(info).build()
    }

    pub fn info(&self) -> &ModuleInfo {
        &self.info
    }

    /// Root view-model; built on first read, then the same instance until `clear_root`.
    ///
    /// A failed construction leaves the slot empty and the next read retries.
    pub fn root_view_model(&self) -> anyhow::Result<Arc<R>> {
        let mut slot = self.slot.lock();
        if let Some(root) = slot.as_ref() {
            return Ok(root.clone());
        }

        let root = self.construct_root()?;
        tracing::debug!(
            module = %self.info.id,
            root = RootModelType::of::<R>().short_name(),
            "root view-model constructed"
        );
        *slot = Some(root.clone());
        Ok(root)
    }

    /// Drop the cached root. The discarded instance is not torn down here.
    pub fn clear_root(&self) {
        if self.slot.lock().take().is_some() {
            tracing::debug!(module = %self.info.id, "root view-model cleared");
        }
    }

    pub fn has_root(&self) -> bool {
        self.slot.lock().is_some()
    }

    pub fn root_model_type(&self) -> RootModelType {
        RootModelType::of::<R>()
    }

    /// True once `register_module` captured the container.
    pub fn has_resolver(&self) -> bool {
        self.resolver.read().is_some()
    }

    fn construct_root(&self) -> anyhow::Result<Arc<R>> {
        if let Some(factory) = &self.factory {
            return factory();
        }

        let hub = self
            .resolver
            .read()
            .clone()
            .ok_or_else(|| ModuleError::ResolverNotCaptured {
                module: self.info.id.clone(),
            })?;
        Ok(hub.get::<R>()?)
    }
}

impl<R: RootViewModel> UiModule for UiModuleBase<R> {
    fn id(&self) -> &str {
        &self.info.id
    }

    fn name(&self) -> &str {
        &self.info.name
    }

    fn order(&self) -> i32 {
        self.info.order
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl<R: RootViewModel> RootLifecycle for UiModuleBase<R> {
    fn clear_root(&self) {
        UiModuleBase::clear_root(self);
    }

    fn has_root(&self) -> bool {
        UiModuleBase::has_root(self)
    }

    fn root_model_type(&self) -> RootModelType {
        RootModelType::of::<R>()
    }

    fn root_any(&self) -> anyhow::Result<Arc<dyn Any + Send + Sync>> {
        let root: Arc<R> = self.root_view_model()?;
        Ok(root)
    }
}

impl<R: RootViewModel> TypedUiModule<R> for UiModuleBase<R> {
    fn root_view_model(&self) -> anyhow::Result<Arc<R>> {
        UiModuleBase::root_view_model(self)
    }
}

impl<R: RootViewModel> RegisterModule for UiModuleBase<R> {
    /// Capture the container, then run the `on_register` hook. Hook errors propagate;
    /// the captured container stays in place.
    fn register_module(&self, ctx: &ModuleCtx) -> anyhow::Result<()> {
        *self.resolver.write() = Some(ctx.client_hub());
        tracing::debug!(module = %self.info.id, "container captured");

        if let Some(hook) = &self.on_register {
            hook(self, ctx)?;
        }
        Ok(())
    }
}
