use crate::config::{load_config, Config};
use crate::db::Device;
use chrono::Utc;

/// Check if a test is enabled via environment variable
fn is_test_enabled(env_var: &str) -> bool {
    std::env::var(env_var)
        .map(|v| v.to_lowercase() == "true")
        .unwrap_or(false)
}

/// Check if database integration tests are enabled
pub fn is_db_enabled() -> bool {
    is_test_enabled("ENABLE_DB_TESTS")
}

/// Check if S3 integration tests are enabled
pub fn is_s3_enabled() -> bool {
    is_test_enabled("ENABLE_S3_TESTS")
}

/// Load test configuration from config.toml
pub fn load_test_config() -> Result<Config, anyhow::Error> {
    let config_path = "config.toml";

    load_config(config_path).map_err(|e| anyhow::anyhow!("Failed to load config.toml: {}", e))
}

/// Creates an active test device with the given id and serial
pub fn create_test_device(id: i64, serial: &str) -> Device {
    Device {
        id,
        name: format!("Device {}", serial),
        serial_number: serial.to_string(),
        device_type: 0,
        is_active: true,
        created_at: Utc::now(),
    }
}
