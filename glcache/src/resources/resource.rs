use std::{any::Any, sync::Arc};

use crate::{error::ReloadError, object::ApiObject, resources::ResourceCache, util::typedefs::SsoString};

/// Upcast helper so cached resources can be downcast back to their concrete type.
///
/// Implemented for every eligible type, never implement it by hand.
pub trait AsAnyArc: Any + Send + Sync {
    fn as_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T: Any + Send + Sync> AsAnyArc for T {
    fn as_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// Something a [`ResourceCache`] can hold.
///
/// Resources are shared through `Arc`; the cache keeps one strong reference per
/// entry and treats an entry nobody else references as unused.
pub trait Resource: AsAnyArc {
    /// Key the resource is registered under, usually a path.
    fn origin(&self) -> &str;

    /// Whether the resource owns a usable handle. Only valid resources may be cached.
    fn is_valid(&self) -> bool;

    /// Further sources the resource is built from, watched alongside the origin.
    fn distributed_origins(&self) -> Vec<SsoString> {
        Vec::new()
    }

    fn can_be_reloaded(&self) -> bool {
        false
    }

    /// Refreshes the resource in place after `origin` changed.
    ///
    /// `cache` is the cache polling the resource; a reload may `manage` secondary
    /// resources in it. The cache lock is not held during the call.
    fn reload(&self, origin: &str, cache: &ResourceCache) -> Result<(), ReloadError> {
        let _ = (origin, cache);
        Ok(())
    }
}

impl<T: Send + Sync + 'static> Resource for ApiObject<T> {
    fn origin(&self) -> &str {
        ApiObject::origin(self)
    }

    fn is_valid(&self) -> bool {
        self.raw().is_valid()
    }
}
