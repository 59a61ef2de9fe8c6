//! # Sources
//!
//! The query contract every loaded format implements, and format probing.
//!
//! A file is probed once, in the order PDB → DWARF → ELF symbols. The first
//! loader that accepts it decides the variant of [`DebugSource`]; every later
//! query dispatches on that variant without re-checking the file.

use std::fmt;
use std::path::Path;

use tracing::{debug, info, info_span};

use crate::dwarf::DwarfSource;
use crate::elf::ElfSource;
use crate::error::{TypedigError, TypedigResult};
use crate::image::read_file;
use crate::options::LoadOptions;
use crate::pdb::PdbSource;
use crate::types::{Field, Type};

/// Which evidence a source reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceFormat
{
    /// Program database type and symbol streams.
    Pdb,
    /// DWARF debug-info tree inside an ELF file.
    Dwarf,
    /// ELF symbol tables only.
    ElfSymbols,
}

impl fmt::Display for SourceFormat
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        let label = match self {
            SourceFormat::Pdb => "PDB",
            SourceFormat::Dwarf => "DWARF",
            SourceFormat::ElfSymbols => "ELF symbols",
        };
        write!(f, "{label}")
    }
}

/// Queries over one loaded file.
///
/// Every lookup builds a fresh [`Type`]; nothing is cached between calls and
/// implementations only read shared state, so lookups may run concurrently.
pub trait TypeSource
{
    fn format(&self) -> SourceFormat;

    /// Reconstruct `name`, or `None` if the source does not describe it.
    fn get_type(&self, name: &str) -> Option<Type>;

    /// [`TypeSource::get_type`] for each name, in input order, skipping names
    /// that resolve to nothing.
    fn get_types<S: AsRef<str>>(&self, names: &[S]) -> Vec<Type>
    where
        Self: Sized,
    {
        names.iter().filter_map(|name| self.get_type(name.as_ref())).collect()
    }

    /// Sorted, deduplicated names of every class the source identifies, and of
    /// structs too when `include_structs` is set.
    fn get_types_list(&self, include_structs: bool) -> Vec<String>;

    /// Static data not attached to any class.
    fn get_all_global_variables(&self) -> Vec<Field>;
}

/// A loaded file, tagged with the format that accepted it.
#[derive(Debug)]
pub enum DebugSource
{
    Pdb(PdbSource),
    Dwarf(DwarfSource),
    ElfSymbols(ElfSource),
}

impl DebugSource
{
    /// Probe `path` with every loader and keep the first that accepts it.
    pub fn open(path: impl AsRef<Path>, options: &LoadOptions) -> TypedigResult<Self>
    {
        let path = path.as_ref();
        let _span = info_span!("open", path = %path.display()).entered();
        let data = read_file(path)?;
        Self::from_bytes(&data, options)
    }

    /// Probe an in-memory file with every loader.
    ///
    /// When all of them fail the most informative error wins: missing debug
    /// information first, then the PDB or DWARF rejection.
    pub fn from_bytes(data: &[u8], options: &LoadOptions) -> TypedigResult<Self>
    {
        let pdb_err = match PdbSource::parse(data.to_vec(), options) {
            Ok(source) => return Ok(Self::loaded(DebugSource::Pdb(source))),
            Err(err) => {
                debug!(%err, "not loadable as PDB");
                err
            }
        };

        let dwarf_err = match DwarfSource::parse(data, options) {
            Ok(source) => return Ok(Self::loaded(DebugSource::Dwarf(source))),
            Err(err) => {
                debug!(%err, "not loadable as DWARF");
                err
            }
        };

        let elf_err = match ElfSource::parse(data, options) {
            Ok(source) => return Ok(Self::loaded(DebugSource::ElfSymbols(source))),
            Err(err) => {
                debug!(%err, "not loadable as ELF symbols");
                err
            }
        };

        Err(most_informative(pdb_err, dwarf_err, elf_err))
    }

    fn loaded(source: Self) -> Self
    {
        info!(format = %source.format(), "debug source loaded");
        source
    }
}

fn most_informative(pdb_err: TypedigError, dwarf_err: TypedigError, elf_err: TypedigError) -> TypedigError
{
    if matches!(elf_err, TypedigError::MissingDebugInfo { .. }) {
        return elf_err;
    }
    if matches!(dwarf_err, TypedigError::MissingDebugInfo { .. }) {
        return dwarf_err;
    }
    if !matches!(pdb_err, TypedigError::NotThisFormat(_)) {
        return pdb_err;
    }
    if !matches!(dwarf_err, TypedigError::NotThisFormat(_)) {
        return dwarf_err;
    }
    pdb_err
}

impl TypeSource for DebugSource
{
    fn format(&self) -> SourceFormat
    {
        match self {
            DebugSource::Pdb(source) => source.format(),
            DebugSource::Dwarf(source) => source.format(),
            DebugSource::ElfSymbols(source) => source.format(),
        }
    }

    fn get_type(&self, name: &str) -> Option<Type>
    {
        match self {
            DebugSource::Pdb(source) => source.get_type(name),
            DebugSource::Dwarf(source) => source.get_type(name),
            DebugSource::ElfSymbols(source) => source.get_type(name),
        }
    }

    fn get_types_list(&self, include_structs: bool) -> Vec<String>
    {
        match self {
            DebugSource::Pdb(source) => source.get_types_list(include_structs),
            DebugSource::Dwarf(source) => source.get_types_list(include_structs),
            DebugSource::ElfSymbols(source) => source.get_types_list(include_structs),
        }
    }

    fn get_all_global_variables(&self) -> Vec<Field>
    {
        match self {
            DebugSource::Pdb(source) => source.get_all_global_variables(),
            DebugSource::Dwarf(source) => source.get_all_global_variables(),
            DebugSource::ElfSymbols(source) => source.get_all_global_variables(),
        }
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    fn missing(format: &'static str) -> TypedigError
    {
        TypedigError::MissingDebugInfo {
            format,
            details: "no section".to_string(),
        }
    }

    #[test]
    fn test_missing_debug_info_beats_format_rejection()
    {
        let err = most_informative(
            TypedigError::NotThisFormat("PDB"),
            missing("DWARF"),
            TypedigError::NotThisFormat("ELF"),
        );
        assert!(matches!(err, TypedigError::MissingDebugInfo { format: "DWARF", .. }));

        let err = most_informative(TypedigError::NotThisFormat("PDB"), missing("DWARF"), missing("ELF"));
        assert!(matches!(err, TypedigError::MissingDebugInfo { format: "ELF", .. }));
    }

    #[test]
    fn test_unsupported_pdb_version_is_reported()
    {
        let err = most_informative(
            TypedigError::UnsupportedVersion {
                format: "PDB",
                details: "2.00".to_string(),
            },
            TypedigError::NotThisFormat("DWARF"),
            TypedigError::NotThisFormat("ELF"),
        );
        assert!(matches!(err, TypedigError::UnsupportedVersion { format: "PDB", .. }));
    }

    #[test]
    fn test_plain_junk_is_not_a_pdb()
    {
        let err = most_informative(
            TypedigError::NotThisFormat("PDB"),
            TypedigError::NotThisFormat("DWARF"),
            TypedigError::NotThisFormat("ELF"),
        );
        assert!(matches!(err, TypedigError::NotThisFormat("PDB")));
    }

    #[test]
    fn test_format_labels()
    {
        assert_eq!(SourceFormat::Pdb.to_string(), "PDB");
        assert_eq!(SourceFormat::ElfSymbols.to_string(), "ELF symbols");
    }
}
