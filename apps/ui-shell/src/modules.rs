//! Built-in shell modules. Each submits a registrator; the host never names them directly.

use serde::Deserialize;
use std::sync::Arc;
use ui_modkit::{ModuleInfo, Registrator, RegistryBuilder, RootViewModel, UiModuleBase};

// ---- dashboard: explicit factory ----

#[derive(Debug)]
pub struct DashboardRoot {
    pub tiles: Vec<String>,
}

impl RootViewModel for DashboardRoot {}

fn register_dashboard(b: &mut RegistryBuilder) {
    let info = b.module_info(ModuleInfo::new("dashboard", "Dashboard", 10));
    let module = UiModuleBase::with_factory(info, || {
        Ok(Arc::new(DashboardRoot {
            tiles: vec!["Recent".into(), "Pinned".into(), "Activity".into()],
        }))
    });
    b.register(Arc::new(module));
}

// ---- reports: root resolved from the container, factory registered by the hook ----

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct ReportsConfig {
    page_size: usize,
}

impl Default for ReportsConfig {
    fn default() -> Self {
        Self { page_size: 25 }
    }
}

#[derive(Debug)]
pub struct ReportsRoot {
    pub page_size: usize,
}

impl RootViewModel for ReportsRoot {}

fn register_reports(b: &mut RegistryBuilder) {
    let info = b.module_info(ModuleInfo::new("reports", "Reports", 20));
    let module = UiModuleBase::<ReportsRoot>::builder(info)
        .on_register(|_, ctx| {
            let cfg: ReportsConfig = ctx.module_config();
            ctx.client_hub()
                .register_factory::<ReportsRoot, _>(move || {
                    Ok(Arc::new(ReportsRoot {
                        page_size: cfg.page_size,
                    }))
                });
            Ok(())
        })
        .build();
    b.register(Arc::new(module));
}

// ---- settings: hook registers a shared service the root depends on ----

/// Shared settings storage other modules may also resolve.
#[derive(Debug, Default)]
pub struct SettingsStore {
    pub theme: String,
}

#[derive(Debug)]
pub struct SettingsRoot {
    pub store: Arc<SettingsStore>,
}

impl RootViewModel for SettingsRoot {}

fn register_settings(b: &mut RegistryBuilder) {
    let info = b.module_info(ModuleInfo::new("settings", "Settings", 30));
    let module = UiModuleBase::<SettingsRoot>::builder(info)
        .on_register(|_, ctx| {
            let hub = ctx.client_hub();
            hub.register::<SettingsStore>(Arc::new(SettingsStore {
                theme: "light".into(),
            }));
            let inner = hub.clone();
            hub.register_factory::<SettingsRoot, _>(move || {
                Ok(Arc::new(SettingsRoot {
                    store: inner.get::<SettingsStore>()?,
                }))
            });
            Ok(())
        })
        .build();
    b.register(Arc::new(module));
}

ui_modkit::inventory::submit! { Registrator(register_dashboard) }
ui_modkit::inventory::submit! { Registrator(register_reports) }
ui_modkit::inventory::submit! { Registrator(register_settings) }

/// One-line description of an activated root, for the CLI.
pub fn describe_root(registry: &ui_modkit::ModuleRegistry, id: &str) -> Option<String> {
    if let Ok(r) = registry.root_view_model::<DashboardRoot>(id) {
        return Some(format!("tiles: {}", r.tiles.join(", ")));
    }
    if let Ok(r) = registry.root_view_model::<ReportsRoot>(id) {
        return Some(format!("page size: {}", r.page_size));
    }
    if let Ok(r) = registry.root_view_model::<SettingsRoot>(id) {
        return Some(format!("theme: {}", r.store.theme));
    }
    None
}
