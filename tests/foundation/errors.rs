//! Integration tests for Error types
//!
//! Tests error construction, display, context, and error kinds.

use stratum_foundation::{Error, ErrorKind, Id};

// =============================================================================
// Error Construction
// =============================================================================

#[test]
fn error_not_alive() {
    let id = Id::entity(300, 4);
    let err = Error::not_alive(id);
    assert_eq!(err.kind, ErrorKind::NotAlive(id));
    assert!(err.is_not_alive());
    assert!(format!("{err}").contains("300"));
}

#[test]
fn error_too_many_arguments() {
    let err = Error::too_many_arguments(4, 9);
    assert!(matches!(
        err.kind,
        ErrorKind::TooManyArguments { max: 4, actual: 9 }
    ));
}

#[test]
fn error_invalid_query() {
    let err = Error::invalid_query("conflicting terms");
    assert!(matches!(err.kind, ErrorKind::InvalidQuery(ref msg) if msg == "conflicting terms"));
    assert!(format!("{err}").contains("conflicting terms"));
}

#[test]
fn error_limits() {
    let err = Error::new(ErrorKind::ComponentLimit { limit: 256 });
    assert!(format!("{err}").contains("256"));
    let err = Error::new(ErrorKind::CapacityExceeded { limit: 10 });
    assert!(!err.is_not_alive());
}

// =============================================================================
// Context
// =============================================================================

#[test]
fn context_is_optional() {
    let err = Error::internal("broken");
    assert!(err.context.is_none());

    let err = err.with_context("moving row");
    assert_eq!(err.context.as_deref(), Some("moving row"));
}

#[test]
fn errors_are_std_errors() {
    fn takes_error(_: &dyn std::error::Error) {}
    takes_error(&Error::invalid_id(Id::NULL));
}
