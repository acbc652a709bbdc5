use crate::ErrorLocation;

use std::panic::Location;

/// **VALUE**: Verifies that `ErrorLocation::from()` captures file, line, and column.
///
/// **WHY THIS MATTERS**: Every coordinator error (bind failures, command write failures,
/// config validation) prints its location. A wrong location sends the operator to the
/// wrong line.
///
/// **BUG THIS CATCHES**: Would catch if file or line extraction from `Location` breaks.
#[test]
fn given_panic_location_when_error_location_created_then_captures_file_line_column() {
    // GIVEN: The location of this very line
    let location = ErrorLocation::from(Location::caller());
    let expected_line = line!() - 1;

    // THEN: File, line, and column are all captured
    assert!(
        location.file.contains("error_location.rs"),
        "Should capture file path"
    );
    assert_eq!(location.line, expected_line, "Should capture correct line");
    assert!(location.column > 0, "Should capture column number");
}

/// **VALUE**: Verifies that `ErrorLocation::caller()` reports the call site, not itself.
///
/// **BUG THIS CATCHES**: Would catch if `#[track_caller]` is dropped from `caller()`,
/// which would make every error point into `error_location.rs` in the common crate.
#[test]
fn given_track_caller_helper_when_called_twice_then_lines_differ() {
    // GIVEN: A helper that forwards the caller location
    #[track_caller]
    fn capture() -> ErrorLocation {
        ErrorLocation::caller()
    }

    // WHEN: Capturing from two consecutive lines
    let first = capture();
    let second = capture();

    // THEN: Same file, sequential lines
    assert_eq!(first.file, second.file);
    assert_eq!(first.line + 1, second.line, "Lines should be sequential");
    assert!(first.file.ends_with("tests/error_location.rs"));
}

/// **VALUE**: Verifies the bracketed `[file:line:column]` display format.
///
/// **WHY THIS MATTERS**: Log lines are grepped by this format when tracing an eviction
/// or drain failure back to code.
#[test]
fn given_error_location_when_formatted_then_produces_bracketed_format() {
    // GIVEN: A fixed location
    let location = ErrorLocation {
        file: "src/eviction/mod.rs",
        line: 42,
        column: 7,
    };

    // WHEN: Formatting
    let formatted = location.to_string();

    // THEN: Exactly the bracketed triple
    assert_eq!(formatted, "[src/eviction/mod.rs:42:7]");
}
