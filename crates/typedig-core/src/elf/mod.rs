//! # ELF symbols
//!
//! Fallback source for stripped binaries: classes are reconstructed from the
//! mangled names in the symbol table alone.
//!
//! Function symbols become fully defined methods (address and demangled
//! parameter types), object symbols become static fields whose type is guessed
//! from their size. Nothing else about the class is recoverable.

pub mod walker;

use std::path::Path;

use object::{Object, ObjectSymbol, SymbolKind};
use tracing::info;

use crate::error::{TypedigError, TypedigResult};
use crate::image::{is_elf, read_file};
use crate::options::{LoadOptions, WordSize};
use crate::source::{SourceFormat, TypeSource};
use crate::types::{Field, Type};

/// What a symbol refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElfSymbolKind
{
    Function,
    Object,
}

/// One defined symbol, as read from `.symtab` or `.dynsym`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElfSymbol
{
    /// Raw (mangled) name.
    pub name: String,
    pub address: u64,
    pub size: u64,
    pub kind: ElfSymbolKind,
}

impl ElfSymbol
{
    pub fn function(name: impl Into<String>, address: u64) -> Self
    {
        Self {
            name: name.into(),
            address,
            size: 0,
            kind: ElfSymbolKind::Function,
        }
    }

    pub fn object(name: impl Into<String>, address: u64, size: u64) -> Self
    {
        Self {
            name: name.into(),
            address,
            size,
            kind: ElfSymbolKind::Object,
        }
    }
}

/// Symbol table of one ELF file.
#[derive(Debug, Clone)]
pub struct ElfSource
{
    symbols: Vec<ElfSymbol>,
    word_size: WordSize,
}

impl ElfSource
{
    pub fn load(path: impl AsRef<Path>, options: &LoadOptions) -> TypedigResult<Self>
    {
        let data = read_file(path.as_ref())?;
        Self::parse(&data, options)
    }

    /// Read the static symbol table, falling back to the dynamic one.
    pub fn parse(data: &[u8], options: &LoadOptions) -> TypedigResult<Self>
    {
        if !is_elf(data) {
            return Err(TypedigError::NotThisFormat("ELF"));
        }
        let file = object::File::parse(data).map_err(|err| TypedigError::UnsupportedVersion {
            format: "ELF",
            details: err.to_string(),
        })?;

        let mut symbols = collect_symbols(file.symbols());
        if symbols.is_empty() {
            symbols = collect_symbols(file.dynamic_symbols());
        }
        if symbols.is_empty() {
            return Err(TypedigError::MissingDebugInfo {
                format: "ELF",
                details: "no defined symbols in .symtab or .dynsym".to_string(),
            });
        }

        let word_size = options
            .word_size
            .unwrap_or_else(|| WordSize::from_is_64(file.is_64()));
        info!(symbols = symbols.len(), ?word_size, "ELF symbols loaded");
        Ok(Self::from_symbols(symbols, word_size))
    }

    pub fn from_symbols(symbols: Vec<ElfSymbol>, word_size: WordSize) -> Self
    {
        Self { symbols, word_size }
    }

    pub fn symbols(&self) -> &[ElfSymbol]
    {
        &self.symbols
    }

    pub fn word_size(&self) -> WordSize
    {
        self.word_size
    }
}

fn collect_symbols<'data, I, S>(symbols: I) -> Vec<ElfSymbol>
where
    I: Iterator<Item = S>,
    S: ObjectSymbol<'data>,
{
    symbols
        .filter(|symbol| !symbol.is_undefined())
        .filter_map(|symbol| {
            let kind = match symbol.kind() {
                SymbolKind::Text => ElfSymbolKind::Function,
                SymbolKind::Data => ElfSymbolKind::Object,
                _ => return None,
            };
            let name = symbol.name().ok().filter(|name| !name.is_empty())?;
            Some(ElfSymbol {
                name: name.to_string(),
                address: symbol.address(),
                size: symbol.size(),
                kind,
            })
        })
        .collect()
}

impl TypeSource for ElfSource
{
    fn format(&self) -> SourceFormat
    {
        SourceFormat::ElfSymbols
    }

    fn get_type(&self, name: &str) -> Option<Type>
    {
        walker::build_type(&self.symbols, self.word_size, name)
    }

    fn get_types_list(&self, _include_structs: bool) -> Vec<String>
    {
        walker::type_names(&self.symbols)
    }

    fn get_all_global_variables(&self) -> Vec<Field>
    {
        walker::global_variables(&self.symbols, self.word_size)
    }
}
