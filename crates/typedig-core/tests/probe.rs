//! Format probing through `DebugSource::open` and `DebugSource::from_bytes`

use std::io::Write;

use object::write::{Object as ObjectFile, Symbol, SymbolSection};
use object::{Architecture, BinaryFormat, Endianness, SectionKind, SymbolFlags, SymbolKind, SymbolScope};
use tempfile::NamedTempFile;
use typedig_core::{DebugSource, LoadOptions, SourceFormat, TypeSource, TypedigError};

fn write_temp(bytes: &[u8]) -> NamedTempFile
{
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(bytes).unwrap();
    file.flush().unwrap();
    file
}

fn stripped_elf(with_symbol: bool) -> Vec<u8>
{
    let mut obj = ObjectFile::new(BinaryFormat::Elf, Architecture::X86_64, Endianness::Little);
    let text = obj.add_section(Vec::new(), b".text".to_vec(), SectionKind::Text);
    obj.append_section_data(text, &[0xc3; 64], 16);
    if with_symbol {
        obj.add_symbol(Symbol {
            name: b"_ZN5Shape4areaEv".to_vec(),
            value: 0x10,
            size: 8,
            kind: SymbolKind::Text,
            scope: SymbolScope::Linkage,
            weak: false,
            section: SymbolSection::Section(text),
            flags: SymbolFlags::None,
        });
    }
    obj.write().unwrap()
}

#[test]
fn test_missing_file()
{
    let err = DebugSource::open("/no/such/file.pdb", &LoadOptions::default()).unwrap_err();
    assert!(matches!(err, TypedigError::FileNotFound(_)));
}

#[test]
fn test_junk_is_rejected()
{
    let file = write_temp(b"certainly not debug information");
    let err = DebugSource::open(file.path(), &LoadOptions::default()).unwrap_err();
    assert!(matches!(err, TypedigError::NotThisFormat(_)));
    assert!(err.is_probe_miss());
}

#[test]
fn test_elf_without_dwarf_falls_back_to_symbols()
{
    let file = write_temp(&stripped_elf(true));
    let source = DebugSource::open(file.path(), &LoadOptions::default()).unwrap();
    assert_eq!(source.format(), SourceFormat::ElfSymbols);

    let shape = source.get_type("Shape").unwrap();
    assert_eq!(shape.all_methods[0].name, "area");
    assert!(source.get_type("DoesNotExist").is_none());
}

#[test]
fn test_elf_without_anything_reports_missing_debug_info()
{
    let file = write_temp(&stripped_elf(false));
    let err = DebugSource::open(file.path(), &LoadOptions::default()).unwrap_err();
    assert!(matches!(err, TypedigError::MissingDebugInfo { .. }));
}

#[test]
fn test_probe_in_memory_bytes()
{
    let source = DebugSource::from_bytes(&stripped_elf(true), &LoadOptions::default()).unwrap();
    assert_eq!(source.format(), SourceFormat::ElfSymbols);
    assert_eq!(source.get_types_list(false), Vec::<String>::new());

    let err = DebugSource::from_bytes(b"\x7fELF", &LoadOptions::default()).unwrap_err();
    assert!(!matches!(err, TypedigError::FileNotFound(_)));
}
