//! Minimalistic, type-safe ClientHub: the resolution container modules register into.
//!
//! Design goals:
//! - Providers register an implementation once, either as a shared instance or as a factory.
//! - Consumers resolve by type (concrete or trait object): `get::<dyn my::Api>()`.
//! - Optional scopes (e.g., per window): `register_scoped / get_scoped`.
//!
//! Implementation details:
//! - Key = (type name, scope). We use `type_name::<T>()`, which works for `T = dyn Trait`.
//! - Shared values are `Arc<T>` stored as `Box<dyn Any + Send + Sync>` (downcast on read).
//! - Factories are `Arc<dyn Fn() -> anyhow::Result<Arc<T>>>` stored the same way and invoked
//!   outside the map lock, so a factory may resolve its own dependencies from the hub.
//!
//! Notes:
//! - Re-registering overwrites the previous entry; existing Arcs held by consumers remain valid.
//! - For testing, just register a stub under the same type.

use parking_lot::RwLock;
use std::{any::Any, collections::HashMap, fmt, sync::Arc};

/// Global scope constant.
pub const GLOBAL_SCOPE: &str = "global";

/// Stable type key — uses fully-qualified `type_name::<T>()`.
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct TypeKey(&'static str);

impl TypeKey {
    #[inline]
    fn of<T: ?Sized + 'static>() -> Self {
        TypeKey(std::any::type_name::<T>())
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Scope of a registration (`global`, `window-2`, ...).
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct ScopeKey(Arc<str>);

impl ScopeKey {
    #[inline]
    fn named(s: impl Into<Arc<str>>) -> Self {
        ScopeKey(s.into())
    }
}

impl fmt::Debug for ScopeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClientHubError {
    #[error("client not found: type={type_key:?}, scope={scope:?}")]
    NotFound { type_key: TypeKey, scope: ScopeKey },

    #[error("type mismatch in hub for type={type_key:?}, scope={scope:?}")]
    TypeMismatch { type_key: TypeKey, scope: ScopeKey },

    #[error("factory failed for type={type_key:?}, scope={scope:?}")]
    Factory {
        type_key: TypeKey,
        scope: ScopeKey,
        #[source]
        source: anyhow::Error,
    },
}

type Boxed = Box<dyn Any + Send + Sync>;

/// Factory producing a fresh `Arc<T>` on every resolve.
type Factory<T> = Arc<dyn Fn() -> anyhow::Result<Arc<T>> + Send + Sync>;

enum Entry {
    Shared(Boxed),
    Factory(Boxed),
}

/// Type-safe registry of clients keyed by (type, scope).
pub struct ClientHub {
    map: RwLock<HashMap<(TypeKey, ScopeKey), Entry>>,
}

impl ClientHub {
    #[inline]
    pub fn new() -> Self {
        Self {
            map: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for ClientHub {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ClientHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let r = self.map.read();
        let mut keys: Vec<_> = r.keys().map(|(t, s)| format!("{t:?}@{s:?}")).collect();
        keys.sort();
        f.debug_struct("ClientHub").field("entries", &keys).finish()
    }
}

impl ClientHub {
    /// Register a shared instance in the *global* scope under the type `T`.
    /// `T` can be a trait object like `dyn my_module::contract::MyApi`.
    pub fn register<T>(&self, client: Arc<T>)
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.register_scoped::<T>(GLOBAL_SCOPE, client);
    }

    /// Register a shared instance in a *named* scope under the type `T`.
    pub fn register_scoped<T>(&self, scope: impl Into<Arc<str>>, client: Arc<T>)
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let key = (TypeKey::of::<T>(), ScopeKey::named(scope));
        self.map.write().insert(key, Entry::Shared(Box::new(client)));
    }

    /// Register a factory in the *global* scope: every resolve of `T` builds a new instance.
    pub fn register_factory<T, F>(&self, factory: F)
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn() -> anyhow::Result<Arc<T>> + Send + Sync + 'static,
    {
        self.register_factory_scoped::<T, F>(GLOBAL_SCOPE, factory);
    }

    /// Register a factory in a *named* scope.
    pub fn register_factory_scoped<T, F>(&self, scope: impl Into<Arc<str>>, factory: F)
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn() -> anyhow::Result<Arc<T>> + Send + Sync + 'static,
    {
        let key = (TypeKey::of::<T>(), ScopeKey::named(scope));
        let factory: Factory<T> = Arc::new(factory);
        self.map
            .write()
            .insert(key, Entry::Factory(Box::new(factory)));
    }

    /// Resolve `T` from the *global* scope.
    pub fn get<T>(&self) -> Result<Arc<T>, ClientHubError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.get_scoped::<T>(GLOBAL_SCOPE)
    }

    /// Resolve `T` from a *named* scope.
    pub fn get_scoped<T>(&self, scope: impl Into<Arc<str>>) -> Result<Arc<T>, ClientHubError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let type_key = TypeKey::of::<T>();
        let scope_key = ScopeKey::named(scope);

        let factory = {
            let r = self.map.read();
            let entry = r
                .get(&(type_key.clone(), scope_key.clone()))
                .ok_or_else(|| ClientHubError::NotFound {
                    type_key: type_key.clone(),
                    scope: scope_key.clone(),
                })?;

            match entry {
                Entry::Shared(boxed) => {
                    return boxed.downcast_ref::<Arc<T>>().cloned().ok_or(
                        ClientHubError::TypeMismatch {
                            type_key,
                            scope: scope_key,
                        },
                    );
                }
                Entry::Factory(boxed) => match boxed.downcast_ref::<Factory<T>>() {
                    Some(f) => f.clone(),
                    None => {
                        return Err(ClientHubError::TypeMismatch {
                            type_key,
                            scope: scope_key,
                        })
                    }
                },
            }
        };

        // Lock released: the factory may resolve from this hub.
        factory().map_err(|source| ClientHubError::Factory {
            type_key,
            scope: scope_key,
            source,
        })
    }

    /// Whether anything is registered for `T` in the global scope.
    pub fn contains<T>(&self) -> bool
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let key = (TypeKey::of::<T>(), ScopeKey::named(GLOBAL_SCOPE));
        self.map.read().contains_key(&key)
    }

    /// Remove a shared client; returns it if it was present. Factories are removed but not returned.
    pub fn remove<T>(&self, scope: impl Into<Arc<str>>) -> Option<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let key = (TypeKey::of::<T>(), ScopeKey::named(scope));
        match self.map.write().remove(&key)? {
            Entry::Shared(boxed) => boxed.downcast::<Arc<T>>().ok().map(|b| *b),
            Entry::Factory(_) => None,
        }
    }

    /// Clear everything (useful in tests).
    pub fn clear(&self) {
        self.map.write().clear();
    }

    /// Introspection: total entries.
    pub fn len(&self) -> usize {
        self.map.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.read().is_empty()
    }
}
