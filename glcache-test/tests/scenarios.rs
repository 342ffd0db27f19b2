//! End-to-end walkthroughs of the two caches.

use std::{sync::Arc, time::Duration};

use anyhow::Context;
use glcache::{
    types::{RawTextureHandle, TextureTarget},
    util::recording::BackendCall,
    ResourceCacheOptions,
};
use glcache_test::{context, resource_cache, take_state_calls, TestResource};

#[test]
fn texture_hot_reload() -> anyhow::Result<()> {
    let mut ctx = context();
    let (source, cache) = resource_cache(ResourceCacheOptions::default());

    source.set_stamp("tex/a.png", 100);
    let texture = TestResource::new("tex/a.png")
        .with_texture(ctx.create_texture("tex/a.png")?)
        .into_arc();
    cache.manage(texture.clone());

    source.set_stamp("tex/a.png", 200);
    assert_eq!(cache.update(Duration::from_millis(600)), 0);
    assert_eq!(cache.update(Duration::from_millis(600)), 1);
    assert_eq!(texture.reload_count(), 1);

    // The new stamp was recorded.
    assert_eq!(cache.update(Duration::from_secs(1)), 0);

    let found = cache.find_as::<TestResource>("tex/a.png").context("texture evicted")?;
    assert!(Arc::ptr_eq(&found, &texture));
    Ok(())
}

#[test]
fn deleted_texture_unbinds() {
    let mut ctx = context();
    let state = ctx.state_mut();
    let handle = RawTextureHandle::new(77);

    state.bind_texture(3, handle, TextureTarget::D2, false);
    state.texture_deleted(handle);
    assert_eq!(state.bound_texture(3).handle, RawTextureHandle::INVALID);

    take_state_calls(&mut ctx);
    assert!(ctx.state_mut().bind_texture(3, handle, TextureTarget::D2, false));
    assert_eq!(
        take_state_calls(&mut ctx),
        vec![BackendCall::BindTexture(TextureTarget::D2, handle)]
    );
}
