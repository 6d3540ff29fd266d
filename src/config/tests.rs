use super::*;
use crate::error::ConfigError;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_config_loads_defaults() {
    let config = LazyparConfig::load().expect("Should load default config");

    assert_eq!(config.pool.cores, WorkerCount::Auto);
    assert!(!config.pool.use_threads);
    assert_eq!(config.pool.threads, 1);
    assert_eq!(config.progress.style, ProgressDisplay::Line);
    assert_eq!(config.progress.width, 100);
}

#[test]
fn test_custom_config_loading() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("custom.toml");
    fs::write(
        &path,
        r#"
[pool]
cores = 3

[progress]
style = "bar"
"#,
    )
    .unwrap();

    let config = LazyparConfig::load_with_custom_config(path.to_str()).unwrap();
    assert_eq!(config.pool.cores, WorkerCount::Explicit(3));
    assert_eq!(config.progress.style, ProgressDisplay::Bar);
    // Untouched keys keep their defaults
    assert_eq!(config.progress.width, 100);
}

#[test]
fn test_custom_json_config_loading() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("custom.json");
    fs::write(&path, r#"{ "pool": { "use_threads": true, "threads": 6 } }"#).unwrap();

    let config = LazyparConfig::load_with_custom_config(path.to_str()).unwrap();
    assert!(config.pool.use_threads);
    assert_eq!(config.pool.threads, 6);
}

#[test]
fn test_missing_custom_config_falls_back_to_defaults() {
    let config = LazyparConfig::load_with_custom_config(Some("non_existent.toml"));
    assert!(config.is_ok(), "Should handle missing custom config gracefully");
    assert_eq!(config.unwrap(), LazyparConfig::default());
}

#[test]
fn test_negative_cores_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("bad.toml");
    fs::write(&path, "[pool]\ncores = -2\n").unwrap();

    assert!(LazyparConfig::load_with_custom_config(path.to_str()).is_err());
}

#[test]
fn test_worker_count_parsing() {
    assert_eq!("auto".parse::<WorkerCount>().unwrap(), WorkerCount::Auto);
    assert_eq!("AUTO".parse::<WorkerCount>().unwrap(), WorkerCount::Auto);
    assert_eq!("4".parse::<WorkerCount>().unwrap(), WorkerCount::Explicit(4));
    assert_eq!(
        "many".parse::<WorkerCount>(),
        Err(ConfigError::InvalidWorkerCount {
            field: "cores",
            value: "many".to_string()
        })
    );
    assert_eq!(WorkerCount::Explicit(8).to_string(), "8");
    assert_eq!(WorkerCount::Auto.to_string(), "auto");
}

#[test]
fn test_auto_resolves_to_detected_cores() {
    let resolved = PoolConfig::default().resolve(|| 12).unwrap();
    assert_eq!(
        resolved,
        ResolvedPool {
            mode: PoolMode::Process,
            workers: 12
        }
    );

    let resolved = PoolConfig::default().resolve(num_cpus::get).unwrap();
    assert!(resolved.workers > 0);
}

#[test]
fn test_zero_cores_rejected() {
    let err = PoolConfig::processes(WorkerCount::Explicit(0))
        .resolve(|| 4)
        .unwrap_err();
    assert!(matches!(
        err,
        ConfigError::InvalidWorkerCount { field: "cores", .. }
    ));
}

#[test]
fn test_threads_take_precedence_over_cores() {
    let pool = PoolConfig {
        cores: WorkerCount::Explicit(16),
        use_threads: true,
        threads: 3,
    };
    let resolved = pool
        .resolve(|| panic!("core detection must not run in thread mode"))
        .unwrap();
    assert_eq!(resolved.mode, PoolMode::Thread);
    assert_eq!(resolved.workers, 3);

    // An invalid `cores` is ignored when threads are used
    let pool = PoolConfig {
        cores: WorkerCount::Explicit(0),
        use_threads: true,
        threads: 2,
    };
    assert!(pool.resolve(|| 4).is_ok());
}

#[test]
fn test_zero_threads_rejected() {
    let err = PoolConfig::threads(0).resolve(|| 4).unwrap_err();
    assert!(matches!(
        err,
        ConfigError::InvalidWorkerCount {
            field: "threads",
            ..
        }
    ));
}
