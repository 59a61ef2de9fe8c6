//! Tests for global subscriber installation

use typedig_utils::{init_logging_with_level, LogFormat, LogLevel, LoggingError};

#[test]
fn test_second_initialization_is_rejected()
{
    init_logging_with_level(LogLevel::Debug, LogFormat::Pretty).unwrap();
    tracing::debug!("subscriber installed");

    let err = init_logging_with_level(LogLevel::Info, LogFormat::Json).unwrap_err();
    assert!(matches!(err, LoggingError::InitializationFailed(_)));
}
