use serde::de::DeserializeOwned;
use std::sync::Arc;

use crate::client_hub::ClientHub;

/// Provider of module-specific configuration (raw JSON sections only).
pub trait ConfigProvider: Send + Sync {
    /// Returns raw JSON section for the module, if any.
    fn get_module_config(&self, module_id: &str) -> Option<&serde_json::Value>;
}

/// What a module sees while registering: the shared container and its own config section.
#[derive(Clone)]
pub struct ModuleCtx {
    pub(crate) config_provider: Option<Arc<dyn ConfigProvider>>,
    pub(crate) client_hub: Arc<ClientHub>,
    pub(crate) module_id: Option<Arc<str>>,
}

impl std::fmt::Debug for ModuleCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleCtx")
            .field("module_id", &self.module_id)
            .field("has_config", &self.config_provider.is_some())
            .field("client_hub", &self.client_hub)
            .finish()
    }
}

#[derive(Default)]
pub struct ModuleCtxBuilder {
    inner: ModuleCtx,
}

impl ModuleCtxBuilder {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with_config_provider(mut self, p: Arc<dyn ConfigProvider>) -> Self {
        self.inner.config_provider = Some(p);
        self
    }
    pub fn with_client_hub(mut self, hub: Arc<ClientHub>) -> Self {
        self.inner.client_hub = hub;
        self
    }
    pub fn build(self) -> ModuleCtx {
        self.inner
    }
}

impl Default for ModuleCtx {
    fn default() -> Self {
        Self {
            config_provider: None,
            client_hub: Arc::new(ClientHub::default()),
            module_id: None,
        }
    }
}

impl ModuleCtx {
    /// Scope context to a specific module id (used by the registry).
    pub(crate) fn for_module(mut self, id: &str) -> Self {
        self.module_id = Some(Arc::<str>::from(id));
        self
    }

    // ---- public read-only API for modules ----
    pub fn client_hub(&self) -> Arc<ClientHub> {
        self.client_hub.clone()
    }

    pub fn current_module(&self) -> Option<&str> {
        self.module_id.as_deref()
    }

    /// Best-effort: deserialize the module's config into `T`, fallback to `T::default()`
    /// if section is missing or invalid.
    pub fn module_config<T: DeserializeOwned + Default>(&self) -> T {
        match (&self.module_id, &self.config_provider) {
            (Some(id), Some(p)) => p
                .get_module_config(id)
                .and_then(|v| serde_json::from_value::<T>(v.clone()).ok())
                .unwrap_or_default(),
            _ => T::default(),
        }
    }

    /// Strict: deserialize the module's config into `T`, returning a pathful error on failure.
    pub fn module_config_required<T: DeserializeOwned>(&self) -> anyhow::Result<T> {
        let id = self
            .module_id
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("context is not scoped to a module"))?;

        let prov = self
            .config_provider
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("no ConfigProvider"))?;

        let val = prov
            .get_module_config(id)
            .ok_or_else(|| anyhow::anyhow!("missing module config: {id}"))?;

        serde_json::from_value(val.clone()).map_err(|e| anyhow::anyhow!("invalid {id} config: {e}"))
    }
}
