//! # Error Types
//!
//! Error handling for loading debug metadata and walking it.
//!
//! We use `thiserror` to automatically generate `Error` trait implementations
//! and nice error messages.
//!
//! Only conditions that stop a whole source from being used are errors. A type
//! that cannot be found is an absent result (`Option::None`), and malformed
//! members inside an otherwise valid file are logged and skipped by the walkers.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for typedig operations
///
/// ## Error Categories
///
/// 1. **Probe errors**: NotThisFormat, UnsupportedVersion (expected while trying
///    each loader in turn)
/// 2. **Content errors**: MissingDebugInfo (the container is fine but carries no
///    usable metadata), Malformed
/// 3. **I/O errors**: FileNotFound, Io
#[derive(Error, Debug)]
pub enum TypedigError
{
    /// The input file could not be opened
    ///
    /// Fatal: the caller gets this before any format is probed.
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// The file's magic/header does not belong to the probed format
    ///
    /// This is expected while probing and is not reported to users unless
    /// every format rejects the file.
    #[error("Not a {0} file")]
    NotThisFormat(&'static str),

    /// The header was recognized but its version is not handled
    #[error("Unsupported {format} version: {details}")]
    UnsupportedVersion
    {
        /// Format that recognized the header
        format: &'static str,
        /// What was found
        details: String,
    },

    /// The container is valid but lacks the metadata this loader needs
    ///
    /// Triggers fallback to a lower-fidelity format (DWARF → ELF symbols).
    #[error("{format} file does not contain debug information: {details}")]
    MissingDebugInfo
    {
        /// Format whose metadata is missing
        format: &'static str,
        /// Which section/stream was missing
        details: String,
    },

    /// Unexpected malformed input inside an accepted container
    #[error("Malformed debug metadata: {0}")]
    Malformed(String),

    /// I/O error while reading the input file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TypedigError
{
    /// Whether this error only means "try the next format".
    pub fn is_probe_miss(&self) -> bool
    {
        matches!(self, TypedigError::NotThisFormat(_) | TypedigError::UnsupportedVersion { .. })
    }
}

/// Convenience type alias for `Result<T, TypedigError>`
///
/// ```rust
/// use typedig_core::error::TypedigResult;
/// fn foo() -> TypedigResult<()>
/// {
///     Ok(())
/// }
/// ```
pub type TypedigResult<T> = std::result::Result<T, TypedigError>;

/// Map a gimli DWARF error to a `TypedigError` with context.
///
/// ## Parameters
///
/// - `context`: A description of what operation was being performed (e.g., "reading DW_AT_name")
/// - `err`: The gimli error that occurred
pub(crate) fn map_dwarf_error(context: &str, err: gimli::Error) -> TypedigError
{
    TypedigError::Malformed(format!("{context}: {err}"))
}

/// Map a pdb crate error to a `TypedigError` with context.
pub(crate) fn map_pdb_error(context: &str, err: pdb::Error) -> TypedigError
{
    match err {
        pdb::Error::UnrecognizedFileFormat => TypedigError::NotThisFormat("PDB"),
        pdb::Error::StreamNotFound(_) => TypedigError::MissingDebugInfo {
            format: "PDB",
            details: format!("{context}: {err}"),
        },
        other => TypedigError::Malformed(format!("{context}: {other}")),
    }
}
