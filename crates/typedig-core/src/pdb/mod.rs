//! # PDB
//!
//! Program database loader and walker.
//!
//! The file is opened with the `pdb` crate and snapshotted into [`PdbTables`]
//! at load time. Lookups then walk the snapshot:
//!
//! 1. the last complete class/struct record with the requested name,
//! 2. its field list (bases, methods, nested types, data members),
//! 3. the procedures whose member function type belongs to that class, merged
//!    into the declared methods by name and argument types.

pub mod records;
pub mod walker;

use std::io::Cursor;
use std::path::Path;

use pdb::PDB;
use tracing::info;

pub use ::pdb::{Indirection, PrimitiveKind, PrimitiveType};
pub use records::{DataSymbol, FieldEntry, MethodEntry, PdbTables, PdbType, ProcedureSymbol, Record, RecordKind};

use crate::error::{map_pdb_error, TypedigError, TypedigResult};
use crate::image::{read_file, PDB2_MAGIC, PDB7_MAGIC};
use crate::options::LoadOptions;
use crate::source::{SourceFormat, TypeSource};
use crate::types::{Field, Type};

/// A loaded program database.
#[derive(Debug, Clone)]
pub struct PdbSource
{
    tables: PdbTables,
}

impl PdbSource
{
    /// Open and snapshot the PDB at `path`.
    pub fn load(path: impl AsRef<Path>, options: &LoadOptions) -> TypedigResult<Self>
    {
        let data = read_file(path.as_ref())?;
        Self::parse(data.to_vec(), options)
    }

    /// Parse an in-memory PDB.
    pub fn parse(data: Vec<u8>, options: &LoadOptions) -> TypedigResult<Self>
    {
        if data.starts_with(PDB2_MAGIC) {
            return Err(TypedigError::UnsupportedVersion {
                format: "PDB",
                details: "program database 2.00".to_string(),
            });
        }
        if !data.starts_with(PDB7_MAGIC) {
            return Err(TypedigError::NotThisFormat("PDB"));
        }

        let mut pdb = PDB::open(Cursor::new(data)).map_err(|err| map_pdb_error("opening PDB", err))?;
        let mut tables = records::read_tables(&mut pdb, options.image_base)?;
        apply_word_size(&mut tables, options);
        info!(
            records = tables.records.len(),
            procedures = tables.procedures.len(),
            globals = tables.globals.len(),
            "PDB loaded"
        );
        Ok(Self { tables })
    }

    /// Wrap an already extracted record table.
    pub fn from_parts(tables: PdbTables) -> Self
    {
        Self { tables }
    }

    pub fn tables(&self) -> &PdbTables
    {
        &self.tables
    }
}

/// An explicit word size overrides the one implied by the machine type.
fn apply_word_size(tables: &mut PdbTables, options: &LoadOptions)
{
    if let Some(word_size) = options.word_size {
        tables.pointer_size = word_size.bytes();
    }
}

impl TypeSource for PdbSource
{
    fn format(&self) -> SourceFormat
    {
        SourceFormat::Pdb
    }

    fn get_type(&self, name: &str) -> Option<Type>
    {
        walker::build_type(&self.tables, name)
    }

    fn get_types_list(&self, include_structs: bool) -> Vec<String>
    {
        walker::type_names(&self.tables, include_structs)
    }

    fn get_all_global_variables(&self) -> Vec<Field>
    {
        walker::global_variables(&self.tables)
    }
}
