use std::sync::Arc;

use glcache::{
    util::recording::{BackendCall, RecordingBackend},
    BackendLimits, ContextOptions, GraphicsContext, MemorySource, ResourceCache, ResourceCacheOptions,
};

/// Routes `log` output through the test harness. Safe to call from every test.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A context on a [`RecordingBackend`], with the calls of the initial reset
/// already cleared.
pub fn context() -> GraphicsContext<RecordingBackend> {
    context_with_limits(BackendLimits {
        texture_units: 16,
        vertex_attributes: 16,
    })
}

pub fn context_with_limits(limits: BackendLimits) -> GraphicsContext<RecordingBackend> {
    init_logging();

    let mut ctx = GraphicsContext::new(RecordingBackend::with_limits(limits), &ContextOptions::default());
    ctx.state_mut().backend_mut().clear_calls();
    ctx
}

/// Drains the recorded calls, keeping only binding and toggle changes.
pub fn take_state_calls(ctx: &mut GraphicsContext<RecordingBackend>) -> Vec<BackendCall> {
    ctx.state_mut()
        .backend_mut()
        .take_calls()
        .into_iter()
        .filter(BackendCall::is_state_change)
        .collect()
}

/// A cache that is monitoring from the start, and the source it reads stamps from.
pub fn resource_cache(options: ResourceCacheOptions) -> (Arc<MemorySource>, Arc<ResourceCache>) {
    init_logging();

    let source = Arc::new(MemorySource::new());
    let cache = Arc::new(ResourceCache::new(
        Arc::clone(&source),
        ResourceCacheOptions {
            monitor_on_start: true,
            ..options
        },
    ));
    (source, cache)
}
