use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use glcache::{util::typedefs::SsoString, ReloadError, Resource, ResourceCache, TextureObject};
use parking_lot::Mutex;

/// Reloadable resource that records how it was reloaded.
#[derive(Debug)]
pub struct TestResource {
    origin: SsoString,
    texture: Option<TextureObject>,
    reloadable: bool,
    distributed: Mutex<Vec<SsoString>>,
    /// Origin managed into the polling cache on every reload.
    dependency: Option<SsoString>,
    fail_reloads: AtomicBool,
    reloaded_from: Mutex<Vec<SsoString>>,
}

impl TestResource {
    pub fn new(origin: &str) -> Self {
        Self {
            origin: SsoString::from(origin),
            texture: None,
            reloadable: true,
            distributed: Mutex::new(Vec::new()),
            dependency: None,
            fail_reloads: AtomicBool::new(false),
            reloaded_from: Mutex::new(Vec::new()),
        }
    }

    pub fn with_texture(mut self, texture: TextureObject) -> Self {
        self.texture = Some(texture);
        self
    }

    pub fn with_distributed_origins(self, origins: &[&str]) -> Self {
        self.set_distributed_origins(origins);
        self
    }

    pub fn with_dependency(mut self, origin: &str) -> Self {
        self.dependency = Some(SsoString::from(origin));
        self
    }

    pub fn not_reloadable(mut self) -> Self {
        self.reloadable = false;
        self
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn set_distributed_origins(&self, origins: &[&str]) {
        *self.distributed.lock() = origins.iter().copied().map(SsoString::from).collect();
    }

    pub fn set_fail_reloads(&self, fail: bool) {
        self.fail_reloads.store(fail, Ordering::Release);
    }

    pub fn texture(&self) -> Option<&TextureObject> {
        self.texture.as_ref()
    }

    pub fn reload_count(&self) -> usize {
        self.reloaded_from.lock().len()
    }

    /// The changed origin passed to every successful reload, in order.
    pub fn reloaded_from(&self) -> Vec<String> {
        self.reloaded_from.lock().iter().map(ToString::to_string).collect()
    }
}

impl Resource for TestResource {
    fn origin(&self) -> &str {
        &self.origin
    }

    fn is_valid(&self) -> bool {
        self.texture.as_ref().map_or(true, |texture| texture.raw().is_valid())
    }

    fn distributed_origins(&self) -> Vec<SsoString> {
        self.distributed.lock().clone()
    }

    fn can_be_reloaded(&self) -> bool {
        self.reloadable
    }

    fn reload(&self, origin: &str, cache: &ResourceCache) -> Result<(), ReloadError> {
        if self.fail_reloads.load(Ordering::Acquire) {
            return Err(ReloadError::Decode {
                origin: SsoString::from(origin),
                reason: String::from("truncated file"),
            });
        }

        if let Some(ref dependency) = self.dependency {
            cache.manage(TestResource::new(dependency).not_reloadable().into_arc());
        }
        self.reloaded_from.lock().push(SsoString::from(origin));
        Ok(())
    }
}
