use std::collections::HashSet;
use std::sync::Arc;

use thiserror::Error;

use crate::context::{ConfigProvider, ModuleCtx};
use crate::contracts::{HostedModule, RootModelType, RootViewModel};
use crate::module_base::{ModuleInfo, ModuleOverrides};

/// The function type submitted via `inventory::submit!`.
pub struct Registrator(pub fn(&mut RegistryBuilder));

inventory::collect!(Registrator);

/// Host-side view of the module set, sorted by `order` (stable).
pub struct ModuleRegistry {
    modules: Vec<Arc<dyn HostedModule>>,
}

impl std::fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ids: Vec<&str> = self.modules.iter().map(|m| m.id()).collect();
        f.debug_struct("ModuleRegistry")
            .field("modules", &ids)
            .finish()
    }
}

impl ModuleRegistry {
    /// Discover via inventory, have registrators fill the builder, then build & sort.
    pub fn discover_and_build(
        config: Option<Arc<dyn ConfigProvider>>,
    ) -> Result<Self, RegistryError> {
        let mut b = RegistryBuilder::default();
        if let Some(p) = config {
            b.set_config_provider(p);
        }
        for r in ::inventory::iter::<Registrator> {
            r.0(&mut b);
        }
        b.build()
    }

    pub fn modules(&self) -> &[Arc<dyn HostedModule>] {
        &self.modules
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Arc<dyn HostedModule>> {
        self.modules.iter().find(|m| m.id() == id)
    }

    /// Module `id`, if its root view-model is of type `R`.
    pub fn typed<R: RootViewModel>(&self, id: &str) -> Option<&Arc<dyn HostedModule>> {
        self.get(id)
            .filter(|m| m.root_model_type() == RootModelType::of::<R>())
    }

    /// Typed root read for callers that know the module's root type.
    pub fn root_view_model<R: RootViewModel>(&self, id: &str) -> Result<Arc<R>, RegistryError> {
        let module = self.get(id).ok_or_else(|| RegistryError::UnknownModule(id.to_string()))?;
        let expected = RootModelType::of::<R>();
        let actual = module.root_model_type();
        if actual != expected {
            return Err(RegistryError::TypeMismatch {
                module: id.to_string(),
                expected,
                actual,
            });
        }

        let root = module
            .root_any()
            .map_err(|source| RegistryError::Activate {
                module: id.to_string(),
                source,
            })?;
        root.downcast::<R>()
            .map_err(|_| RegistryError::RootTypeViolation {
                module: id.to_string(),
                expected,
            })
    }

    // ---- Ordered phases: register → activate → deactivate ----

    /// Register every module into the shared container, in order.
    pub fn run_register_phase(&self, base_ctx: &ModuleCtx) -> Result<(), RegistryError> {
        for m in &self.modules {
            let ctx = base_ctx.clone().for_module(m.id());
            m.register_module(&ctx)
                .map_err(|source| RegistryError::Register {
                    module: m.id().to_string(),
                    source,
                })?;
        }
        tracing::info!(modules = self.modules.len(), "register phase completed");
        Ok(())
    }

    /// Build (if needed) the root view-model of `id`.
    pub fn activate(&self, id: &str) -> Result<(), RegistryError> {
        let module = self.get(id).ok_or_else(|| RegistryError::UnknownModule(id.to_string()))?;
        module
            .ensure_root()
            .map_err(|source| RegistryError::Activate {
                module: id.to_string(),
                source,
            })?;
        tracing::info!(module = id, root = module.root_model_type().short_name(), "module activated");
        Ok(())
    }

    /// Release the cached root view-model of `id`.
    pub fn deactivate(&self, id: &str) -> Result<(), RegistryError> {
        let module = self.get(id).ok_or_else(|| RegistryError::UnknownModule(id.to_string()))?;
        module.clear_root();
        tracing::info!(module = id, "module deactivated");
        Ok(())
    }

    /// Release every cached root, last module first.
    pub fn clear_all(&self) {
        for m in self.modules.iter().rev() {
            m.clear_root();
        }
    }
}

/// Builder that registrators feed. Module ids must be unique and non-empty.
#[derive(Default)]
pub struct RegistryBuilder {
    modules: Vec<Arc<dyn HostedModule>>,
    config_provider: Option<Arc<dyn ConfigProvider>>,
}

impl RegistryBuilder {
    /// Source of `modules.<id>` sections consulted by `module_info`.
    pub fn set_config_provider(&mut self, p: Arc<dyn ConfigProvider>) {
        self.config_provider = Some(p);
    }

    pub fn register(&mut self, m: Arc<dyn HostedModule>) {
        self.modules.push(m);
    }

    /// `defaults` with the `modules.<id>` config section applied, if any.
    pub fn module_info(&self, defaults: ModuleInfo) -> ModuleInfo {
        let overrides = self
            .config_provider
            .as_ref()
            .and_then(|p| p.get_module_config(&defaults.id))
            .and_then(|v| match serde_json::from_value::<ModuleOverrides>(v.clone()) {
                Ok(o) => Some(o),
                Err(e) => {
                    tracing::warn!(module = %defaults.id, error = %e, "ignoring invalid module overrides");
                    None
                }
            });
        match overrides {
            Some(o) => defaults.with_overrides(&o),
            None => defaults,
        }
    }

    /// Validate and sort by `order`; ties keep registration order.
    pub fn build(self) -> Result<ModuleRegistry, RegistryError> {
        let mut errors = Vec::new();
        let mut seen = HashSet::new();
        for m in &self.modules {
            if m.id().trim().is_empty() {
                errors.push(format!("Module named '{}' has an empty id", m.name()));
            } else if !seen.insert(m.id().to_string()) {
                errors.push(format!("Module '{}' is already registered", m.id()));
            }
        }
        if !errors.is_empty() {
            return Err(RegistryError::InvalidRegistryConfiguration { errors });
        }

        let mut modules = self.modules;
        modules.sort_by_key(|m| m.order());

        tracing::debug!(
            order = ?modules.iter().map(|m| m.id()).collect::<Vec<_>>(),
            "module registry built"
        );
        Ok(ModuleRegistry { modules })
    }
}

/// Structured errors for the module registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("unknown module: {0}")]
    UnknownModule(String),

    #[error("module '{module}' has root type {actual}, not {expected}")]
    TypeMismatch {
        module: String,
        expected: RootModelType,
        actual: RootModelType,
    },

    #[error("module '{module}' produced a root that is not {expected}")]
    RootTypeViolation {
        module: String,
        expected: RootModelType,
    },

    #[error("registration failed for module '{module}'")]
    Register {
        module: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("activation failed for module '{module}'")]
    Activate {
        module: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("invalid registry configuration:\n{errors:#?}")]
    InvalidRegistryConfiguration { errors: Vec<String> },
}
