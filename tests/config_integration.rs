//! Configuration files, profiles and validation through the public API

use sentinel_rag::config::Config;
use sentinel_rag::SentinelError;
use tempfile::TempDir;

#[test]
fn test_profile_applied_on_top_of_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("config.toml");

    let mut config = Config::default();
    config.embedding.provider = "fastembed".to_string();
    config.save(&path).unwrap();

    let loaded = Config::load_with_profile(&path, "offline").unwrap();
    assert_eq!(loaded.embedding.provider, "hashing");
    assert!(!loaded.features.hifi_enabled);
    assert!(!loaded.features.hgmem_enabled);
    assert!(loaded.features.ragpart_enabled);
}

#[test]
fn test_invalid_file_reports_every_problem() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("config.toml");
    std::fs::write(
        &path,
        "[_meta]\nschema_version = \"1.0.0\"\n\n\
         [retrieval]\npartitions = 2\ncombination_size = 3\nsuspicion_threshold = 1.5\n",
    )
    .unwrap();

    match Config::load(&path) {
        Err(SentinelError::ConfigValidation { errors }) => {
            let paths: Vec<&str> = errors.iter().map(|e| e.path.as_str()).collect();
            assert!(paths.contains(&"retrieval.combination_size"));
            assert!(paths.contains(&"retrieval.suspicion_threshold"));
        }
        other => panic!("expected validation failure, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_malformed_toml() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("config.toml");
    std::fs::write(&path, "[_meta\nschema_version = ").unwrap();

    assert!(matches!(Config::load(&path), Err(SentinelError::Toml(_))));
}

#[test]
fn test_default_config_survives_round_trip() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("nested").join("config.toml");
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();

    Config::default().save(&path).unwrap();
    let loaded = Config::load(&path).unwrap();

    assert_eq!(loaded.meta.schema_version, "1.0.0");
    assert!(loaded.profiles.contains_key("fast"));
    assert!(loaded.profiles.contains_key("offline"));
    assert_eq!(loaded.orchestrator.request_timeout_secs, 120);
    assert_eq!(loaded.memory.merge_similarity_threshold, 0.7);
}
