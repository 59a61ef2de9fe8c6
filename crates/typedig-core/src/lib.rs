//! # typedig-core
//!
//! Reconstructs C++ class declarations from compiler-emitted debug metadata.
//!
//! Three evidence sources are supported, from richest to poorest:
//! - **PDB**: CodeView type records plus the procedure and data symbols of a
//!   program database
//! - **DWARF**: the `.debug_info` tree of an ELF file
//! - **ELF symbols**: mangled names in `.symtab`/`.dynsym` of a stripped binary
//!
//! Every source produces the same normalized [`Type`] model. Declared method
//! skeletons are reconciled with out-of-line definitions so that methods carry
//! addresses and full argument lists where the format allows it.
//!
//! ## Example
//!
//! ```rust,no_run
//! use typedig_core::prelude::*;
//!
//! let source = DebugSource::open("game.pdb", &LoadOptions::default())?;
//! if let Some(shape) = source.get_type("Shape") {
//!     for method in &shape.all_methods {
//!         println!("{} @ {:#x}", method.name, method.address);
//!     }
//! }
//! # Ok::<(), typedig_core::TypedigError>(())
//! ```

pub mod demangle;
pub mod dwarf;
pub mod elf;
pub mod error;
pub mod image;
pub mod merge;
pub mod options;
pub mod pdb;
pub mod prelude;
pub mod resolve;
pub mod source;
pub mod types;

pub use dwarf::DwarfSource;
pub use elf::{ElfSource, ElfSymbol, ElfSymbolKind};
// Re-export commonly used types
pub use error::{TypedigError, TypedigResult};
pub use options::{LoadOptions, WordSize};
pub use crate::pdb::PdbSource;
pub use source::{DebugSource, SourceFormat, TypeSource};
pub use types::{Accessibility, Argument, CallingConvention, Field, Method, Type, TypePtr};
