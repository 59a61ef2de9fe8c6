//! Tests for error handling

use std::path::PathBuf;

use typedig_core::error::{TypedigError, TypedigResult};

#[test]
fn test_file_not_found_display()
{
    let error = TypedigError::FileNotFound(PathBuf::from("/tmp/game.pdb"));
    let message = format!("{}", error);
    assert!(message.contains("File not found"));
    assert!(message.contains("game.pdb"));
}

#[test]
fn test_not_this_format_display()
{
    let error = TypedigError::NotThisFormat("DWARF");
    assert_eq!(error.to_string(), "Not a DWARF file");
    assert!(error.is_probe_miss());
}

#[test]
fn test_unsupported_version_is_probe_miss()
{
    let error = TypedigError::UnsupportedVersion {
        format: "PDB",
        details: "program database 2.00".to_string(),
    };
    assert!(error.is_probe_miss());
    assert!(error.to_string().contains("2.00"));
}

#[test]
fn test_missing_debug_info_display()
{
    let error = TypedigError::MissingDebugInfo {
        format: "ELF",
        details: "no defined symbols".to_string(),
    };
    let message = error.to_string();
    assert!(message.contains("ELF"));
    assert!(message.contains("no defined symbols"));
    assert!(!error.is_probe_miss());
}

#[test]
fn test_io_error_conversion()
{
    let io = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "short read");
    let error: TypedigError = io.into();
    assert!(matches!(error, TypedigError::Io(_)));
}

#[test]
fn test_result_type()
{
    // Test that Result type is properly aliased
    let _result: TypedigResult<()> = Ok(());
    let _error_result: TypedigResult<()> = Err(TypedigError::Malformed("bad field list".to_string()));
}
