//! # DWARF
//!
//! Loader for ELF files carrying a `.debug_info` tree.
//!
//! Section bytes are copied out of the ELF container at load time and the
//! `gimli::Dwarf` view over them is built lazily on first query. Every query
//! then parses the unit headers afresh and walks them with a
//! [`walker::DwarfWalker`].

pub mod walker;

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use gimli::{Dwarf, EndianArcSlice, RunTimeEndian, SectionId};
use object::{Object, ObjectSection};
use once_cell::sync::OnceCell;
use tracing::{info, warn};

use crate::error::{map_dwarf_error, TypedigError, TypedigResult};
use crate::image::{is_elf, read_file};
use crate::options::LoadOptions;
use crate::source::{SourceFormat, TypeSource};
use crate::types::{Field, Type};
use walker::DwarfWalker;

pub(crate) type OwnedReader = EndianArcSlice<RunTimeEndian>;
pub(crate) type OwnedDwarf = Dwarf<OwnedReader>;

/// Sections the walker may need.
const DWARF_SECTIONS: &[SectionId] = &[
    SectionId::DebugAbbrev,
    SectionId::DebugAddr,
    SectionId::DebugInfo,
    SectionId::DebugLineStr,
    SectionId::DebugRanges,
    SectionId::DebugRngLists,
    SectionId::DebugStr,
    SectionId::DebugStrOffsets,
    SectionId::DebugTypes,
];

/// DWARF metadata of one ELF file.
pub struct DwarfSource
{
    endian: RunTimeEndian,
    sections: HashMap<SectionId, Arc<[u8]>>,
    dwarf_cache: OnceCell<OwnedDwarf>,
}

impl fmt::Debug for DwarfSource
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_struct("DwarfSource")
            .field("endian", &self.endian)
            .field("sections", &self.sections.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl DwarfSource
{
    /// Load the DWARF sections of the ELF file at `path`.
    pub fn load(path: impl AsRef<Path>, options: &LoadOptions) -> TypedigResult<Self>
    {
        let data = read_file(path.as_ref())?;
        Self::parse(&data, options)
    }

    /// Load from in-memory ELF bytes.
    pub fn parse(data: &[u8], _options: &LoadOptions) -> TypedigResult<Self>
    {
        if !is_elf(data) {
            return Err(TypedigError::NotThisFormat("DWARF"));
        }
        let file = object::File::parse(data).map_err(|err| TypedigError::UnsupportedVersion {
            format: "ELF",
            details: err.to_string(),
        })?;

        let endian = if file.is_little_endian() {
            RunTimeEndian::Little
        } else {
            RunTimeEndian::Big
        };

        let mut sections = HashMap::new();
        for id in DWARF_SECTIONS {
            let Some(section) = file.section_by_name(id.name()) else {
                continue;
            };
            let bytes = section
                .uncompressed_data()
                .map_err(|err| TypedigError::Malformed(format!("failed to read {}: {err}", id.name())))?;
            let bytes = match bytes {
                Cow::Borrowed(bytes) => Arc::<[u8]>::from(bytes),
                Cow::Owned(vec) => vec.into(),
            };
            sections.insert(*id, bytes);
        }

        if sections.get(&SectionId::DebugInfo).map_or(true, |info| info.is_empty()) {
            return Err(TypedigError::MissingDebugInfo {
                format: "DWARF",
                details: "required .debug_info section missing".to_string(),
            });
        }

        info!(sections = sections.len(), "DWARF sections loaded");
        Ok(Self {
            endian,
            sections,
            dwarf_cache: OnceCell::new(),
        })
    }

    /// Build a source from raw section contents.
    pub fn from_sections(sections: impl IntoIterator<Item = (SectionId, Vec<u8>)>, endian: RunTimeEndian) -> Self
    {
        Self {
            endian,
            sections: sections
                .into_iter()
                .map(|(id, bytes)| (id, Arc::<[u8]>::from(bytes)))
                .collect(),
            dwarf_cache: OnceCell::new(),
        }
    }

    fn dwarf(&self) -> TypedigResult<&OwnedDwarf>
    {
        self.dwarf_cache.get_or_try_init(|| {
            Dwarf::load(|section| Ok::<_, gimli::Error>(self.section_reader(section)))
                .map_err(|err| map_dwarf_error("loading DWARF sections", err))
        })
    }

    fn section_reader(&self, id: SectionId) -> OwnedReader
    {
        let data = self
            .sections
            .get(&id)
            .cloned()
            .unwrap_or_else(|| Arc::<[u8]>::from(Vec::new()));
        EndianArcSlice::new(data, self.endian)
    }

    fn walker(&self) -> Option<DwarfWalker<'_>>
    {
        let walker = self.dwarf().and_then(DwarfWalker::new);
        match walker {
            Ok(walker) => Some(walker),
            Err(err) => {
                warn!(%err, "unreadable DWARF units");
                None
            }
        }
    }
}

impl TypeSource for DwarfSource
{
    fn format(&self) -> SourceFormat
    {
        SourceFormat::Dwarf
    }

    fn get_type(&self, name: &str) -> Option<Type>
    {
        let walker = self.walker()?;
        match walker.get_type(name) {
            Ok(ty) => ty,
            Err(err) => {
                warn!(name, %err, "DWARF lookup aborted");
                None
            }
        }
    }

    fn get_types_list(&self, include_structs: bool) -> Vec<String>
    {
        self.walker()
            .map(|walker| walker.type_names(include_structs))
            .unwrap_or_default()
    }

    fn get_all_global_variables(&self) -> Vec<Field>
    {
        self.walker()
            .map(|walker| walker.global_variables())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_rejects_non_elf()
    {
        let err = DwarfSource::parse(b"MZ\x90\x00", &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, TypedigError::NotThisFormat("DWARF")));
    }

    #[test]
    fn test_broken_elf_header_is_unsupported()
    {
        let err = DwarfSource::parse(b"\x7fELF\x09\x09", &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, TypedigError::UnsupportedVersion { format: "ELF", .. }));
    }

    #[test]
    fn test_empty_sections_find_nothing()
    {
        let source = DwarfSource::from_sections(Vec::new(), RunTimeEndian::Little);
        assert!(source.get_type("Shape").is_none());
        assert!(source.get_types_list(true).is_empty());
    }
}
