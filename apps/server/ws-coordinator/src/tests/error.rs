// Unit tests for error module
// Tests conversion from core errors and display formatting

use crate::error::CoordinatorAppError;

use coordinator_core::error::{ConfigError, CoreError};

/// **VALUE**: Verifies core failures surface as startup errors with their message intact.
///
/// **WHY THIS MATTERS**: The process exits with this error; the operator only
/// sees what the Display text carries.
///
/// **BUG THIS CATCHES**: Would catch a conversion that drops the inner message,
/// leaving "Startup Error" with no hint of which value was wrong.
#[test]
fn given_core_config_error_when_converted_then_startup_error_keeps_message() {
    // GIVEN: A validation failure from the core crate
    let core = CoreError::from(ConfigError::validation("registry.capacity must be at least 1"));

    // WHEN: Converting to the app error
    let err = CoordinatorAppError::from(core);

    // THEN: Startup variant carrying the original reason and a location
    let text = err.to_string();
    assert!(matches!(err, CoordinatorAppError::Startup { .. }));
    assert!(text.contains("registry.capacity must be at least 1"));
    assert!(text.contains(".rs:"), "Display should include source location");
}
