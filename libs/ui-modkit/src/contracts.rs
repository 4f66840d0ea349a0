use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

/// Marker for objects a module may expose as its root view-model.
pub trait RootViewModel: Any + Send + Sync {}

/// Static type token of a root view-model.
///
/// Available without constructing anything; equal to the runtime type of whatever
/// the owning module's root read eventually yields.
#[derive(Clone, Copy)]
pub struct RootModelType {
    id: TypeId,
    name: &'static str,
}

impl RootModelType {
    #[inline]
    pub fn of<T: Any + ?Sized>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.id
    }

    /// Fully-qualified type name, for display only.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Short type name without the module path (`a::b::Root` -> `Root`).
    pub fn short_name(&self) -> &'static str {
        let base = self.name.split('<').next().unwrap_or(self.name);
        match base.rfind("::") {
            Some(pos) => &self.name[pos + 2..],
            None => self.name,
        }
    }

    /// True when `value` is an instance of exactly this type.
    pub fn matches(&self, value: &dyn Any) -> bool {
        value.type_id() == self.id
    }
}

impl PartialEq for RootModelType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for RootModelType {}

impl std::hash::Hash for RootModelType {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for RootModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for RootModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Identity and display metadata of a module. Pure queries, never construct the root.
pub trait UiModule: Send + Sync + 'static {
    /// Stable identifier, unique across the active module set.
    fn id(&self) -> &str;
    /// Display name; no uniqueness requirement.
    fn name(&self) -> &str;
    /// Sort key; hosts sort ascending.
    fn order(&self) -> i32;
    fn as_any(&self) -> &dyn Any;
}

/// Non-generic root lifecycle, so heterogeneous modules can be reset uniformly.
pub trait RootLifecycle: Send + Sync {
    /// Release the cached root view-model. Idempotent; never fails.
    fn clear_root(&self);

    /// Whether the root slot currently holds an instance.
    fn has_root(&self) -> bool;

    /// Type token of the root view-model; never triggers construction.
    fn root_model_type(&self) -> RootModelType;

    /// Type-erased root read; same memoised path and instance as the typed read.
    fn root_any(&self) -> anyhow::Result<Arc<dyn Any + Send + Sync>>;

    /// Populate the slot (if empty) through the same memoised path as a typed read.
    fn ensure_root(&self) -> anyhow::Result<()> {
        self.root_any().map(|_| ())
    }
}

/// Registration into the dependency container. Runs before the first root read.
pub trait RegisterModule: Send + Sync {
    fn register_module(&self, ctx: &crate::context::ModuleCtx) -> anyhow::Result<()>;
}

/// Typed access to a module's root view-model for callers that know `R`.
pub trait TypedUiModule<R: RootViewModel>: UiModule {
    /// Root view-model, constructed on first access and cached until cleared.
    fn root_view_model(&self) -> anyhow::Result<Arc<R>>;

    fn root_model_type(&self) -> RootModelType {
        RootModelType::of::<R>()
    }
}

/// Everything a host needs without knowing the root type.
pub trait HostedModule: UiModule + RootLifecycle + RegisterModule {}

impl<T> HostedModule for T where T: UiModule + RootLifecycle + RegisterModule {}
