//! Integration tests for the per-device engine cache.

mod common;

use engine_launcher::cache::builder::BuildInvoker;
use engine_launcher::cache::engine::{EngineCache, EngineError, EnsureOutcome};
use engine_launcher::gpu::Device;
use tempfile::TempDir;

use common::{test_config, FakeRunner};

fn rtx_3090() -> Device {
    Device::new(0, "RTX 3090", "24576 MiB")
}

#[tokio::test]
async fn test_cache_hit_restores_without_building() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(tmp.path());
    let cache = EngineCache::new(&config.engine);

    std::fs::write(tmp.path().join("unet_work_RTX_3090.engine"), b"cached-3090").unwrap();
    std::fs::write(cache.active_path(), b"stale-engine").unwrap();

    let runner = FakeRunner::with_report("");
    let builder = BuildInvoker::new(&runner, config.build.to_spec(), &config.device_env_var);

    let outcome = cache.ensure(&rtx_3090(), &builder).await.unwrap();

    assert!(matches!(outcome, EnsureOutcome::Restored { .. }));
    assert!(runner.builds().is_empty());
    assert_eq!(std::fs::read(cache.active_path()).unwrap(), b"cached-3090");

    // Restoring again changes nothing.
    cache.ensure(&rtx_3090(), &builder).await.unwrap();
    assert!(runner.builds().is_empty());
    assert_eq!(std::fs::read(cache.active_path()).unwrap(), b"cached-3090");
}

#[tokio::test]
async fn test_cache_miss_builds_then_hits() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(tmp.path());
    let cache = EngineCache::new(&config.engine);

    let runner = FakeRunner::with_report("")
        .building(0, Some((cache.active_path(), b"fresh-engine".to_vec())));
    let builder = BuildInvoker::new(&runner, config.build.to_spec(), &config.device_env_var);
    let device = rtx_3090();

    let first = cache.ensure(&device, &builder).await.unwrap();
    assert_eq!(
        first,
        EnsureOutcome::Built {
            cache_path: tmp.path().join("unet_work_RTX_3090.engine")
        }
    );
    assert_eq!(runner.builds().len(), 1);
    assert_eq!(
        std::fs::read(first.cache_path()).unwrap(),
        std::fs::read(cache.active_path()).unwrap()
    );

    let second = cache.ensure(&device, &builder).await.unwrap();
    assert!(matches!(second, EnsureOutcome::Restored { .. }));
    assert_eq!(runner.builds().len(), 1);
}

#[tokio::test]
async fn test_same_name_shares_cache_entry() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(tmp.path());
    let cache = EngineCache::new(&config.engine);

    let runner = FakeRunner::with_report("")
        .building(0, Some((cache.active_path(), b"gtx-1070".to_vec())));
    let builder = BuildInvoker::new(&runner, config.build.to_spec(), &config.device_env_var);

    cache
        .ensure(&Device::new(0, "GTX 1070", "8192 MiB"), &builder)
        .await
        .unwrap();
    let outcome = cache
        .ensure(&Device::new(1, "GTX 1070", "8192 MiB"), &builder)
        .await
        .unwrap();

    assert!(matches!(outcome, EnsureOutcome::Restored { .. }));
    assert_eq!(runner.builds().len(), 1);
}

#[tokio::test]
async fn test_build_failure_is_not_retried() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(tmp.path());
    let cache = EngineCache::new(&config.engine);

    let runner = FakeRunner::with_report("").building(1, None);
    let builder = BuildInvoker::new(&runner, config.build.to_spec(), &config.device_env_var);

    let err = cache.ensure(&rtx_3090(), &builder).await.unwrap_err();

    assert!(matches!(err, EngineError::BuildFailed { code: Some(1) }));
    assert_eq!(runner.builds().len(), 1);
    assert!(!cache.is_cached(&rtx_3090()).await);
}

#[tokio::test]
async fn test_build_without_output() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(tmp.path());
    let cache = EngineCache::new(&config.engine);

    let runner = FakeRunner::with_report("").building(0, None);
    let builder = BuildInvoker::new(&runner, config.build.to_spec(), &config.device_env_var);

    let err = cache.ensure(&rtx_3090(), &builder).await.unwrap_err();

    match err {
        EngineError::BuildOutputMissing(path) => assert_eq!(path, cache.active_path()),
        other => panic!("unexpected error: {other}"),
    }
    assert!(!cache.cache_path(&rtx_3090()).exists());
}

#[tokio::test]
async fn test_build_is_scoped_to_device() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(tmp.path());
    let cache = EngineCache::new(&config.engine);

    let runner = FakeRunner::with_report("")
        .building(0, Some((cache.active_path(), b"engine".to_vec())));
    let builder = BuildInvoker::new(&runner, config.build.to_spec(), &config.device_env_var);

    cache
        .ensure(&Device::new(3, "Tesla T4", "15360 MiB"), &builder)
        .await
        .unwrap();

    let builds = runner.builds();
    assert_eq!(builds[0].program, "build-engine");
    assert!(builds[0].args.is_empty());
    assert_eq!(builds[0].env_value("CUDA_VISIBLE_DEVICES"), Some("3"));
}
