//! Module loading, starting, stopping and unloading through the manager.

mod common;

use std::fs;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::json;
use tempfile::TempDir;
use tracing::Level;

use mumo_core::config::{ModuleConfig, ModulesConfig};
use mumo_core::error::ErrorKind;
use mumo_core::types::{ServerId, ServerScope};
use mumo_plugin::{Category, Manager, ModuleCatalog, ServerEvent};
use mumo_transport::mock::MockMeta;
use mumo_transport::{MetaProxy, ServerProxy};

use common::{
    broken, capture_logs, entries, exploding, logged, manager, recorder, settle, spawn_recorder, wait_for,
};

fn names(mut list: Vec<String>) -> Vec<String> {
    list.sort();
    list
}

#[test]
fn test_stop_gives_up_on_slow_module() {
    capture_logs();
    let mut manager = manager(2);
    let handle = manager.handle();

    spawn_recorder(&handle, "slow-stop", json!({ "stop_delay_ms": 5000 }));
    spawn_recorder(&handle, "quick-stop", json!({}));

    let started = Instant::now();
    let stopped = handle.stop_modules(None, false).unwrap();
    assert!(started.elapsed() < Duration::from_secs(4));
    assert_eq!(names(stopped), vec!["quick-stop", "slow-stop"]);

    assert_eq!(entries("quick-stop"), vec!["on_start", "on_stop"]);
    assert!(!entries("slow-stop").contains(&"on_stop".to_string()));
    assert!(!logged(Level::WARN, &["slow-stop", "did not stop in time"]).is_empty());

    let quick = handle
        .list_modules()
        .unwrap()
        .into_iter()
        .find(|m| m.name == "quick-stop")
        .unwrap();
    assert!(!quick.running);

    manager.shutdown(false);
}

#[test]
fn test_load_from_config_directory() {
    capture_logs();
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("dir-alpha.toml"), "[recorder]\nall = true\n").unwrap();
    fs::write(dir.path().join("dir-ghost.toml"), "[ghost]\nvalue = 1\n").unwrap();
    fs::write(dir.path().join(".hidden.toml"), "").unwrap();

    let config = ModulesConfig {
        cfg_dir: dir.path().to_string_lossy().into_owned(),
        mod_dir: dir.path().join("lib").to_string_lossy().into_owned(),
        timeout: 2,
        ..ModulesConfig::default()
    };
    let mut catalog = ModuleCatalog::new();
    catalog.register("dir-alpha", recorder);

    let mut manager = Manager::new(config, catalog);
    manager.start().unwrap();
    let handle = manager.handle();

    // The ghost module has a configuration but no code anywhere.
    let loaded = handle.load_modules(None).unwrap();
    assert_eq!(loaded, vec!["dir-alpha"]);
    assert!(!logged(Level::ERROR, &["dir-ghost", "Failed to load module"]).is_empty());

    // Loading again leaves the running instance alone.
    assert_eq!(handle.load_modules(Some(vec!["dir-alpha".into()])).unwrap(), vec!["dir-alpha"]);
    assert_eq!(handle.list_modules().unwrap().len(), 1);

    let subscriptions = handle.list_subscriptions(Category::Server).unwrap();
    assert!(subscriptions
        .iter()
        .any(|s| s.module == "dir-alpha" && s.scope == ServerScope::All));

    manager.shutdown(false);
}

#[test]
fn test_load_without_config_fails() {
    capture_logs();
    let dir = TempDir::new().unwrap();
    let config = ModulesConfig {
        cfg_dir: dir.path().to_string_lossy().into_owned(),
        ..ModulesConfig::default()
    };
    let mut manager = Manager::new(config, ModuleCatalog::new());
    manager.start().unwrap();

    let err = manager.handle().load_module("nowhere").unwrap_err();
    assert_eq!(err.kind, ErrorKind::ModuleConfigNotFound);

    manager.shutdown(false);
}

#[test]
fn test_failing_constructors_are_reported() {
    capture_logs();
    let mut manager = manager(2);
    let handle = manager.handle();

    let err = handle
        .load_module_with("broken-m", broken, ModuleConfig::empty())
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::ModuleInitFailed);
    assert!(err.message.contains("missing dependency"));

    let err = handle
        .load_module_with("exploding-m", exploding, ModuleConfig::empty())
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::ModuleInitFailed);
    assert!(err.message.contains("constructor exploded"));

    // The manager thread survived the panic.
    assert!(handle.list_modules().unwrap().is_empty());

    manager.shutdown(false);
}

#[test]
fn test_start_stop_restart_order() {
    capture_logs();
    let mut manager = manager(2);
    let handle = manager.handle();
    let meta: Arc<dyn MetaProxy> = Arc::new(MockMeta::with_servers(1));

    spawn_recorder(&handle, "cycle-m", json!({}));
    settle(&handle, Arc::clone(&meta), "cycle-m");

    assert_eq!(handle.stop_modules(Some(vec!["cycle-m".into()]), false).unwrap(), vec!["cycle-m"]);
    assert_eq!(handle.start_modules(Some(vec!["cycle-m".into()])).unwrap(), vec!["cycle-m"]);
    settle(&handle, meta, "cycle-m");

    assert_eq!(
        entries("cycle-m"),
        vec!["on_start", "connected", "on_stop", "on_start", "connected"]
    );

    // Unknown names are skipped, not errors.
    assert!(handle.start_modules(Some(vec!["nobody".into()])).unwrap().is_empty());

    manager.shutdown(false);
}

#[test]
fn test_unload_drops_subscriptions_and_menus() {
    capture_logs();
    let mut manager = manager(2);
    let handle = manager.handle();
    let meta = Arc::new(MockMeta::new());
    let mock = meta.add_server(ServerId(3));
    let server: Arc<dyn ServerProxy> = Arc::clone(&mock) as Arc<dyn ServerProxy>;

    spawn_recorder(&handle, "unload-m", json!({ "all": true, "menu_action": "unload-poke" }));
    let user = mock.connect_user("hank");
    handle.announce_server(Arc::clone(&server), ServerEvent::UserConnected(user.clone()));
    assert!(wait_for(|| entries("unload-m").contains(&"menu_added:hank".to_string())));
    assert_eq!(handle.context_callback_count().unwrap(), 1);
    assert_eq!(mock.context_callback_ids().len(), 1);

    assert_eq!(handle.unload_modules(Some(vec!["unload-m".into()])).unwrap(), vec!["unload-m"]);

    assert!(handle.list_modules().unwrap().is_empty());
    for category in [Category::Meta, Category::Server, Category::Context] {
        assert!(handle.list_subscriptions(category).unwrap().is_empty());
    }
    assert_eq!(handle.context_callback_count().unwrap(), 0);
    assert!(mock.context_callback_ids().is_empty());

    manager.shutdown(false);
}
