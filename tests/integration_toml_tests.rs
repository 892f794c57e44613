//! Integration tests for the TOML configuration system.
//!
//! These verify that `ares.toml`-shaped configuration loads, validates,
//! and exposes its values through `AresConfigManager` end-to-end.

use ares::utils::toml_config::{AresConfig, AresConfigManager, ConfigError, RagConfig};

/// Test helper: a minimal valid configuration.
fn create_test_config() -> AresConfig {
    use ares::utils::toml_config::{AuthConfig, DatabaseConfig, ServerConfig};

    // SAFETY: tests run single-threaded for env var safety.
    unsafe {
        std::env::set_var("TEST_JWT_SECRET", "test-jwt-secret-at-least-32-chars");
        std::env::set_var("TEST_API_KEY", "test-api-key");
    }

    AresConfig {
        server: ServerConfig::default(),
        auth: AuthConfig {
            jwt_secret_env: "TEST_JWT_SECRET".to_string(),
            jwt_access_expiry: 900,
            jwt_refresh_expiry: 604800,
            api_key_env: "TEST_API_KEY".to_string(),
        },
        database: DatabaseConfig::default(),
        rag: RagConfig {
            chunk_size: 500,
            chunk_overlap: 100,
            ..RagConfig::default()
        },
    }
}

#[test]
fn test_config_creation_and_validation() {
    let config = create_test_config();
    let result = config.validate();
    assert!(result.is_ok(), "Config validation failed: {:?}", result);
}

#[test]
fn test_config_rejects_missing_env_var() {
    let mut config = create_test_config();
    config.auth.jwt_secret_env = "DEFINITELY_NOT_SET_ENV_VAR".to_string();

    let result = config.validate();
    assert!(matches!(result, Err(ConfigError::MissingEnvVar(_))));
}

#[test]
fn test_config_rejects_overlap_larger_than_chunk_size() {
    let mut config = create_test_config();
    config.rag.chunk_size = 100;
    config.rag.chunk_overlap = 100;

    let result = config.validate();
    assert!(matches!(result, Err(ConfigError::ValidationError(_))));
}

#[test]
fn test_config_manager_access() {
    let config = create_test_config();
    let manager = AresConfigManager::from_config(config.clone());

    let loaded = manager.config();

    assert_eq!(loaded.server.host, config.server.host);
    assert_eq!(loaded.server.port, config.server.port);
    assert_eq!(loaded.rag.chunk_size, 500);
}

#[test]
fn test_jwt_and_api_key_resolution() {
    let config = create_test_config();

    assert_eq!(config.jwt_secret().unwrap(), "test-jwt-secret-at-least-32-chars");
    assert_eq!(config.api_key().unwrap(), "test-api-key");
}

#[test]
fn test_toml_round_trip_matches_defaults() {
    let content = r#"
[server]
[auth]
jwt_secret_env = "TEST_JWT_SECRET"
api_key_env = "TEST_API_KEY"
[database]
[rag]
embedding_model = "BAAI/bge-small-en-v1.5"
"#;

    let config: AresConfig = toml::from_str(content).expect("valid TOML");
    assert_eq!(config.server.port, 3000);
    assert_eq!(config.rag.chunk_size, 1000);
    assert_eq!(config.rag.embedding_model, "BAAI/bge-small-en-v1.5");
}
