// Unit tests for config directory resolution

use crate::settings::{DEFAULT_CONFIG_DIR, config_dir_from};

use std::path::PathBuf;

/// **VALUE**: Verifies the env value picks the config directory, with `.` as fallback.
///
/// **BUG THIS CATCHES**: Would catch treating an empty variable as a real
/// path, which would look for `/coordinator.json` at the filesystem root.
#[test]
fn given_env_values_when_resolving_config_dir_then_falls_back_to_current_dir() {
    assert_eq!(
        config_dir_from(Some("/etc/ws-coordinator".to_string())),
        PathBuf::from("/etc/ws-coordinator")
    );
    assert_eq!(config_dir_from(None), PathBuf::from(DEFAULT_CONFIG_DIR));
    assert_eq!(config_dir_from(Some(String::new())), PathBuf::from("."));
    assert_eq!(config_dir_from(Some("  ".to_string())), PathBuf::from("."));
}
