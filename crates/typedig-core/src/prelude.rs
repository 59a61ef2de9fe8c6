//! Common module for library exports

pub use crate::dwarf::DwarfSource;
pub use crate::elf::{ElfSource, ElfSymbol, ElfSymbolKind};
pub use crate::error::{TypedigError, TypedigResult};
pub use crate::options::{LoadOptions, WordSize};
pub use crate::pdb::{PdbSource, PdbTables};
pub use crate::source::{DebugSource, SourceFormat, TypeSource};
pub use crate::types::{Accessibility, Argument, CallingConvention, Field, Method, Type, TypePtr};
