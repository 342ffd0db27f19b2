use std::{sync::Arc, thread, time::Duration};

use anyhow::Context;
use glcache::{FileSystemSource, ModificationSource, Resource, ResourceCacheOptions};
use glcache_test::{resource_cache, TestResource};

const POLL: Duration = Duration::from_secs(1);

#[test]
fn last_manage_wins() -> anyhow::Result<()> {
    let (_, cache) = resource_cache(ResourceCacheOptions::default());
    let first = TestResource::new("tex/a.png").into_arc();
    let second = TestResource::new("tex/a.png").into_arc();

    cache.manage(first.clone());
    cache.manage(second.clone());

    let found = cache.find_as::<TestResource>("tex/a.png").context("entry missing")?;
    assert!(Arc::ptr_eq(&found, &second));
    assert_eq!(cache.len(), 1);
    assert_eq!(Arc::strong_count(&first), 1);
    Ok(())
}

#[test]
fn flush_keeps_referenced_entries() {
    let (_, cache) = resource_cache(ResourceCacheOptions::default());
    let kept = TestResource::new("tex/kept.png").into_arc();
    cache.manage(kept.clone());
    cache.manage(TestResource::new("tex/unused.png").into_arc());
    cache.manage(TestResource::new("tex/also-unused.png").into_arc());

    assert_eq!(cache.flush(), 2);
    let origins: Vec<String> = cache.origins().iter().map(ToString::to_string).collect();
    assert_eq!(origins, ["tex/kept.png"]);
    assert_eq!(cache.flush(), 0);

    drop(kept);
    assert_eq!(cache.flush(), 1);
    assert!(cache.is_empty());
}

#[test]
fn discard_and_clear() {
    let (_, cache) = resource_cache(ResourceCacheOptions::default());
    let a = TestResource::new("a").into_arc();
    cache.manage(a.clone());
    cache.manage(TestResource::new("b").into_arc());
    cache.manage(TestResource::new("c").into_arc());

    assert!(cache.discard(&*a));
    assert!(!cache.discard(&*a));
    assert!(cache.discard_key("b"));
    assert!(cache.find("a").is_none());

    cache.clear();
    assert!(cache.is_empty());
    assert!(cache.find("c").is_none());
}

#[test]
fn unchanged_stamps_do_not_reload() {
    let (source, cache) = resource_cache(ResourceCacheOptions::default());
    source.set_stamp("tex/a.png", 100);
    let texture = TestResource::new("tex/a.png").into_arc();
    cache.manage(texture.clone());

    assert_eq!(cache.update(POLL), 0);
    assert_eq!(cache.update(POLL * 3), 0);
    assert_eq!(texture.reload_count(), 0);
}

#[test]
fn changed_stamp_reloads_once() {
    let (source, cache) = resource_cache(ResourceCacheOptions::default());
    source.set_stamp("tex/a.png", 100);
    let texture = TestResource::new("tex/a.png").into_arc();
    cache.manage(texture.clone());

    source.set_stamp("tex/a.png", 101);
    assert_eq!(cache.update(POLL), 1);
    assert_eq!(cache.update(POLL), 0);
    assert_eq!(texture.reloaded_from(), vec!["tex/a.png"]);
}

#[test]
fn unreadable_sources_are_ignored() {
    let (source, cache) = resource_cache(ResourceCacheOptions::default());
    source.set_stamp("tex/a.png", 100);
    let texture = TestResource::new("tex/a.png").into_arc();
    cache.manage(texture.clone());

    source.remove("tex/a.png");
    assert_eq!(cache.perform_update(), 0);

    // Coming back with the old stamp isn't a change either.
    source.set_stamp("tex/a.png", 100);
    assert_eq!(cache.perform_update(), 0);
    assert_eq!(texture.reload_count(), 0);
}

#[test]
fn failed_reload_retries_next_poll() {
    let (source, cache) = resource_cache(ResourceCacheOptions::default());
    source.set_stamp("shaders/lit.glsl", 1);
    let shader = TestResource::new("shaders/lit.glsl").into_arc();
    cache.manage(shader.clone());

    shader.set_fail_reloads(true);
    source.set_stamp("shaders/lit.glsl", 2);
    assert_eq!(cache.perform_update(), 0);
    assert_eq!(cache.perform_update(), 0);

    shader.set_fail_reloads(false);
    assert_eq!(cache.perform_update(), 1);
    assert_eq!(cache.perform_update(), 0);
    assert!(cache.find("shaders/lit.glsl").is_some());
}

#[test]
fn distributed_origins_trigger_reload() {
    let (source, cache) = resource_cache(ResourceCacheOptions::default());
    source.set_stamp("shaders/lit.program", 1);
    source.set_stamp("shaders/lit.vert", 1);
    source.set_stamp("shaders/lit.frag", 1);
    let program = TestResource::new("shaders/lit.program")
        .with_distributed_origins(&["shaders/lit.vert", "shaders/lit.frag"])
        .into_arc();
    cache.manage(program.clone());

    source.set_stamp("shaders/lit.frag", 2);
    assert_eq!(cache.perform_update(), 1);
    assert_eq!(program.reloaded_from(), vec!["shaders/lit.frag"]);

    // Includes picked up by a reload are watched from then on.
    program.set_distributed_origins(&["shaders/lit.vert", "shaders/common.glsl"]);
    source.set_stamp("shaders/lit.vert", 2);
    assert_eq!(cache.perform_update(), 1);

    source.set_stamp("shaders/common.glsl", 2);
    assert_eq!(cache.perform_update(), 1);
    assert_eq!(
        program.reloaded_from(),
        vec!["shaders/lit.frag", "shaders/lit.vert", "shaders/common.glsl"]
    );
}

#[test]
fn several_changes_reload_once() {
    let (source, cache) = resource_cache(ResourceCacheOptions::default());
    source.set_stamp("mesh.obj", 1);
    source.set_stamp("mesh.mtl", 1);
    let mesh = TestResource::new("mesh.obj")
        .with_distributed_origins(&["mesh.mtl"])
        .into_arc();
    cache.manage(mesh.clone());

    source.set_stamp("mesh.obj", 2);
    source.set_stamp("mesh.mtl", 2);
    assert_eq!(cache.perform_update(), 1);
    assert_eq!(mesh.reloaded_from(), vec!["mesh.obj"]);
}

#[test]
fn static_resources_are_not_polled() {
    let (source, cache) = resource_cache(ResourceCacheOptions::default());
    source.set_stamp("fonts/mono.ttf", 1);
    let font = TestResource::new("fonts/mono.ttf").not_reloadable().into_arc();
    assert!(!font.can_be_reloaded());
    cache.manage(font.clone());

    source.set_stamp("fonts/mono.ttf", 2);
    assert_eq!(cache.perform_update(), 0);
    assert_eq!(font.reload_count(), 0);
}

#[test]
fn monitoring_gates_polling() {
    let (source, cache) = resource_cache(ResourceCacheOptions {
        poll_interval: Duration::from_millis(500),
        ..Default::default()
    });
    source.set_stamp("tex/a.png", 1);
    let texture = TestResource::new("tex/a.png").into_arc();
    cache.manage(texture.clone());
    source.set_stamp("tex/a.png", 2);

    cache.stop_monitoring();
    assert!(!cache.is_monitoring());
    assert_eq!(cache.update(Duration::from_secs(10)), 0);

    cache.start_monitoring();
    assert_eq!(cache.update(Duration::from_millis(300)), 0);
    // Stopping drops the time accumulated so far.
    cache.stop_monitoring();
    cache.start_monitoring();
    assert_eq!(cache.update(Duration::from_millis(300)), 0);
    assert_eq!(cache.update(Duration::from_millis(200)), 1);
    assert_eq!(texture.reload_count(), 1);
}

#[test]
fn reload_may_manage_into_the_same_cache() {
    let (source, cache) = resource_cache(ResourceCacheOptions::default());
    source.set_stamp("materials/rock.mat", 1);
    cache.manage(
        TestResource::new("materials/rock.mat")
            .with_dependency("tex/rock.png")
            .into_arc(),
    );

    source.set_stamp("materials/rock.mat", 2);
    assert_eq!(cache.perform_update(), 1);
    assert!(cache.contains("tex/rock.png"));
}

#[test]
fn shared_between_threads() -> anyhow::Result<()> {
    let (source, cache) = resource_cache(ResourceCacheOptions::default());

    let loaders: Vec<_> = (0..4)
        .map(|loader| {
            let cache = Arc::clone(&cache);
            let source = Arc::clone(&source);
            thread::spawn(move || {
                for i in 0..64 {
                    let origin = format!("tex/{}-{}.png", loader, i);
                    source.set_stamp(&origin, 1);
                    let texture = TestResource::new(&origin).into_arc();
                    cache.manage(texture.clone());
                    assert!(cache.find(&origin).is_some());
                }
            })
        })
        .collect();
    for _ in 0..16 {
        cache.perform_update();
        cache.flush();
    }
    for loader in loaders {
        loader.join().ok().context("loader thread panicked")?;
    }

    // Everything still cached is unreferenced, one more flush empties the cache.
    cache.flush();
    assert!(cache.is_empty());
    Ok(())
}

#[test]
fn file_system_source_reads_mtime() -> anyhow::Result<()> {
    let dir = std::env::temp_dir().join(format!("glcache-test-{}", std::process::id()));
    std::fs::create_dir_all(&dir)?;
    std::fs::write(dir.join("a.txt"), b"hello")?;

    let source = FileSystemSource::new(dir.clone());
    assert!(source.modification_stamp("a.txt").is_some());
    assert!(source.modification_stamp("b.txt").is_none());

    std::fs::remove_dir_all(&dir)?;
    Ok(())
}
