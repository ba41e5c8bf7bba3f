mod helpers;

use std::collections::BTreeMap;

use app_keeper::config::{KEY_LEFT, KEY_LEGACY_BLOB, KEY_WIDTH, SHARED_GROUP};
use app_keeper::settings::legacy_blob_entry;
use app_keeper::{
    AppContext, AppManager, BinderState, Culture, Error, HostWindow, LifecycleBinder,
    ManagedPropertyRegistry, StorageMode, WindowState,
};
use serde_json::json;

use helpers::{context, FakeProcess, FakeWindow};

fn registry() -> ManagedPropertyRegistry<FakeWindow> {
    let mut registry = ManagedPropertyRegistry::new();
    registry.register("Count", |w: &FakeWindow| w.count, |w: &mut FakeWindow, v| w.count = v);
    registry
}

/// Runs one application session: load, let `during` act on the window, close.
fn session(
    ctx: &AppContext,
    mut window: FakeWindow,
    during: impl FnOnce(&mut FakeWindow, &mut LifecycleBinder),
) -> FakeWindow {
    let registry = registry();
    let mut binder = LifecycleBinder::new(ctx);
    binder.initialize(&window).unwrap();
    binder.on_loaded(&mut window, &registry).unwrap();
    during(&mut window, &mut binder);
    binder.on_closing(&window, &registry).unwrap();
    window
}

#[test]
fn geometry_and_properties_survive_restart() {
    let tmp = tempfile::tempdir().unwrap();
    let ctx = context(tmp.path(), StorageMode::PerUser);

    session(&ctx, FakeWindow::new(100.0, 100.0, 800.0, 600.0), |w, binder| {
        w.set_position(300.0, 200.0);
        binder.on_moved(&*w).unwrap();
        w.geometry.width = 1024.0;
        w.geometry.height = 700.0;
        binder.on_resized(&*w).unwrap();
        w.count = 9;
    });

    let restored = session(&ctx, FakeWindow::new(100.0, 100.0, 800.0, 600.0), |_, _| {});
    assert_eq!((restored.geometry.left, restored.geometry.top), (300.0, 200.0));
    assert_eq!((restored.geometry.width, restored.geometry.height), (1024.0, 700.0));
    assert_eq!(restored.count, 9);
}

#[test]
fn offscreen_window_is_pulled_back() {
    let tmp = tempfile::tempdir().unwrap();
    let ctx = context(tmp.path(), StorageMode::PerUser);
    let mut far_away = FakeWindow::new(5000.0, -3000.0, 800.0, 600.0);
    far_away.screen = None;
    session(&ctx, far_away, |_, _| {});

    let restored = session(&ctx, FakeWindow::new(100.0, 100.0, 800.0, 600.0), |_, _| {});
    let g = restored.geometry;
    assert_eq!((g.width, g.height), (800.0, 600.0));
    assert_eq!((g.left, g.top), (1120.0, 0.0));
    assert!(g.rect().intersects(&helpers::SCREEN));
}

#[test]
fn maximized_is_restored_but_minimized_is_not() {
    let tmp = tempfile::tempdir().unwrap();
    let ctx = context(tmp.path(), StorageMode::PerUser);

    session(&ctx, FakeWindow::new(100.0, 100.0, 800.0, 600.0), |w, binder| {
        w.set_window_state(WindowState::Maximized);
        binder.on_resized(&*w).unwrap();
    });
    session(&ctx, FakeWindow::new(100.0, 100.0, 800.0, 600.0), |w, binder| {
        assert_eq!(w.geometry.window_state, WindowState::Maximized);
        w.set_window_state(WindowState::Minimized);
        binder.on_resized(&*w).unwrap();
    });

    // Closing while minimized keeps the last non-minimized state.
    let again = session(&ctx, FakeWindow::new(100.0, 100.0, 800.0, 600.0), |_, _| {});
    assert_eq!(again.geometry.window_state, WindowState::Maximized);
}

#[test]
fn size_of_fixed_windows_is_left_alone() {
    let tmp = tempfile::tempdir().unwrap();
    let ctx = context(tmp.path(), StorageMode::PerUser);
    session(&ctx, FakeWindow::new(10.0, 20.0, 400.0, 300.0), |w, binder| {
        w.geometry.width = 640.0;
        binder.on_resized(&*w).unwrap();
    });

    let fixed = FakeWindow::new(100.0, 100.0, 400.0, 300.0).fixed_size();
    let restored = session(&ctx, fixed, |_, _| {});
    assert_eq!((restored.geometry.left, restored.geometry.top), (10.0, 20.0));
    assert_eq!(restored.geometry.width, 400.0);
}

#[test]
fn always_track_resize_restores_fixed_window_size() {
    let tmp = tempfile::tempdir().unwrap();
    let ctx = context(tmp.path(), StorageMode::PerUser);
    let registry = registry();

    let mut window = FakeWindow::new(0.0, 0.0, 400.0, 300.0).fixed_size();
    let mut binder = LifecycleBinder::new(&ctx);
    binder.set_always_track_resize(true);
    binder.initialize(&window).unwrap();
    assert!(binder.is_tracking_size());
    binder.on_loaded(&mut window, &registry).unwrap();
    window.geometry.width = 500.0;
    binder.on_resized(&window).unwrap();
    binder.on_closing(&window, &registry).unwrap();

    let mut next = FakeWindow::new(0.0, 0.0, 400.0, 300.0).fixed_size();
    let mut binder = LifecycleBinder::new(&ctx);
    binder.set_always_track_resize(true);
    binder.initialize(&next).unwrap();
    binder.on_loaded(&mut next, &registry).unwrap();
    assert_eq!(next.geometry.width, 500.0);
}

#[test]
fn invalid_stored_size_resets_to_host_geometry() {
    let tmp = tempfile::tempdir().unwrap();
    let ctx = context(tmp.path(), StorageMode::PerUser);
    let registry = registry();

    let mut binder = LifecycleBinder::new(&ctx);
    let mut window = FakeWindow::new(50.0, 60.0, 800.0, 600.0);
    binder.initialize(&window).unwrap();
    binder.settings_mut().set_as(KEY_LEFT, &500.0).unwrap();
    binder.settings_mut().set_as(KEY_WIDTH, &0.0).unwrap();
    binder.settings_mut().save().unwrap();

    binder.on_loaded(&mut window, &registry).unwrap();
    assert_eq!((window.geometry.left, window.geometry.top), (50.0, 60.0));
    assert_eq!(window.geometry.width, 800.0);
    assert!(!binder.settings().contains(KEY_LEFT));
    assert!(!binder.settings().contains(KEY_WIDTH));
}

#[test]
fn small_fixed_window_loads_with_empty_store() {
    let tmp = tempfile::tempdir().unwrap();
    let ctx = context(tmp.path(), StorageMode::PerUser);
    let restored = session(
        &ctx,
        FakeWindow::new(100.0, 100.0, 100.0, 60.0).fixed_size(),
        |_, _| {},
    );
    assert_eq!((restored.geometry.left, restored.geometry.top), (100.0, 100.0));
    assert_eq!((restored.geometry.width, restored.geometry.height), (100.0, 60.0));

    let small = session(&ctx, FakeWindow::new(0.0, 0.0, 90.0, 40.0), |_, _| {});
    assert_eq!((small.geometry.width, small.geometry.height), (90.0, 40.0));
}

#[test]
fn rejected_size_after_reset_is_reported() {
    let tmp = tempfile::tempdir().unwrap();
    let ctx = context(tmp.path(), StorageMode::PerUser);
    let mut window = FakeWindow::new(50.0, 60.0, 800.0, 600.0);
    window.reject_size = true;
    let mut binder = LifecycleBinder::new(&ctx);
    binder.initialize(&window).unwrap();

    let err = binder.on_loaded(&mut window, &registry()).unwrap_err();
    assert!(matches!(err, Error::InvalidGeometry(_)));
}

#[test]
fn events_before_initialize_are_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    let ctx = context(tmp.path(), StorageMode::PerUser);
    let mut window = FakeWindow::new(0.0, 0.0, 800.0, 600.0);
    let mut binder = LifecycleBinder::new(&ctx);
    assert_eq!(binder.state(), BinderState::NotInitialized);

    assert!(matches!(
        binder.on_loaded(&mut window, &registry()),
        Err(Error::NotInitialized)
    ));
    assert!(matches!(binder.on_moved(&window), Err(Error::NotInitialized)));

    binder.initialize(&window).unwrap();
    binder.initialize(&window).unwrap();
    assert_eq!(binder.state(), BinderState::Bound);
}

#[test]
fn settings_of_older_version_are_imported_once() {
    let tmp = tempfile::tempdir().unwrap();
    let old = helpers::context_with_version(tmp.path(), StorageMode::PerUser, "0.9.0");
    session(&old, FakeWindow::new(100.0, 100.0, 800.0, 600.0), |w, binder| {
        w.set_position(222.0, 111.0);
        binder.on_moved(&*w).unwrap();
        w.count = 5;
    });

    let ctx = context(tmp.path(), StorageMode::PerUser);
    let restored = session(&ctx, FakeWindow::new(0.0, 0.0, 800.0, 600.0), |_, _| {});
    assert_eq!((restored.geometry.left, restored.geometry.top), (222.0, 111.0));
    assert_eq!(restored.count, 5);
}

#[test]
fn culture_change_saves_and_relaunches() {
    let tmp = tempfile::tempdir().unwrap();
    let ctx = context(tmp.path(), StorageMode::Portable);
    let registry = registry();
    let process = FakeProcess {
        args: vec!["--portable".into()],
        ..Default::default()
    };

    let mut window = FakeWindow::new(100.0, 100.0, 800.0, 600.0);
    let mut binder = LifecycleBinder::new(&ctx);
    binder.initialize(&window).unwrap();
    binder.on_loaded(&mut window, &registry).unwrap();
    window.count = 12;

    let german = Culture::parse("de-DE").unwrap();
    binder
        .change_culture(&window, &registry, &german, &process)
        .unwrap();

    let spawned = process.spawned.borrow();
    assert_eq!(spawned.len(), 1);
    assert_eq!(spawned[0].0, ctx.metadata().executable);
    assert_eq!(spawned[0].1, vec!["--portable".to_string()]);
    assert_eq!(*process.exits.borrow(), vec![0]);

    let mut next = FakeWindow::new(0.0, 0.0, 800.0, 600.0);
    let mut relaunched = LifecycleBinder::new(&ctx);
    relaunched.initialize(&next).unwrap();
    relaunched.on_loaded(&mut next, &registry).unwrap();
    assert_eq!(relaunched.culture(), Some(&german));
    assert_eq!(next.count, 12);
}

#[test]
fn failed_relaunch_is_reported_without_exiting() {
    let tmp = tempfile::tempdir().unwrap();
    let ctx = context(tmp.path(), StorageMode::PerUser);
    let process = FakeProcess {
        fail_spawn: true,
        ..Default::default()
    };
    let window = FakeWindow::new(100.0, 100.0, 800.0, 600.0);
    let mut binder = LifecycleBinder::new(&ctx);
    binder.initialize(&window).unwrap();

    let err = binder
        .change_culture(&window, &registry(), &Culture::parse("fr").unwrap(), &process)
        .unwrap_err();
    assert!(matches!(err, Error::RelaunchFailed { .. }));
    assert!(process.exits.borrow().is_empty());
}

#[test]
fn legacy_blob_of_older_version_is_migrated() {
    let tmp = tempfile::tempdir().unwrap();
    let old = helpers::context_with_version(tmp.path(), StorageMode::PerUser, "0.3.0");
    let mut shared = old.open_store(SHARED_GROUP);
    shared.define(legacy_blob_entry());
    let mut blob = BTreeMap::new();
    blob.insert("Count".to_string(), json!(3));
    shared.set_as(KEY_LEGACY_BLOB, &blob).unwrap();
    shared.save().unwrap();

    let ctx = context(tmp.path(), StorageMode::PerUser);
    let mut manager = AppManager::<FakeWindow>::new(ctx).unwrap();
    manager.add_managed_property("Count", |w: &FakeWindow| w.count, |w: &mut FakeWindow, v| w.count = v);
    let mut window = FakeWindow::new(100.0, 100.0, 800.0, 600.0);
    manager.initialize(&window).unwrap();
    manager.on_loaded(&mut window).unwrap();
    assert_eq!(window.count, 3);
}
