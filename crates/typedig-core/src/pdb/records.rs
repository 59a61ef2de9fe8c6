//! Closed record table extracted from a PDB.
//!
//! The `pdb` crate hands out borrowed, lazily parsed records. The walker works
//! on an owned snapshot instead: every type record the walker cares about is
//! converted once into a [`Record`], and the procedure and global data symbols
//! are collected with their absolute addresses.

use std::collections::BTreeMap;

use pdb::{
    ClassKind, FallibleIterator, PointerMode, PrimitiveKind, PrimitiveType, Source, SymbolData, TypeData, TypeIndex,
    PDB,
};
use tracing::{debug, warn};

use crate::error::{map_pdb_error, TypedigResult};
use crate::resolve::{TypeGraph, TypeNode, MAX_TYPE_REF_DEPTH};

/// Type indices below this value encode primitives directly.
pub const FIRST_RECORD_INDEX: u32 = 0x1000;

/// Kind of a class-like record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind
{
    Class,
    Struct,
    Interface,
    Union,
}

/// A method declaration inside a field list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodEntry
{
    /// Index of the member function record.
    pub method_type: u32,
    /// Slot offset for introducing virtual methods.
    pub vtable_offset: Option<u32>,
    /// Method properties mark it virtual, pure or introducing.
    pub is_virtual: bool,
}

/// One entry of a field list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldEntry
{
    BaseClass
    {
        base: u32,
    },
    Method
    {
        name: String,
        entry: MethodEntry,
    },
    OverloadedMethod
    {
        name: String,
        method_list: u32,
    },
    Nested
    {
        name: String,
        nested_type: u32,
    },
    Member
    {
        name: String,
        field_type: u32,
        offset: u64,
    },
    StaticMember
    {
        name: String,
        field_type: u32,
    },
}

/// The record kinds the walkers understand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record
{
    /// A built-in type, as decoded from an index below [`FIRST_RECORD_INDEX`].
    Primitive(PrimitiveType),
    Pointer
    {
        underlying: u32,
        reference: bool,
    },
    Modifier
    {
        underlying: u32,
        constant: bool,
    },
    Array
    {
        element: u32,
        /// Total size in bytes, as stored in the record.
        byte_size: u64,
    },
    Bitfield
    {
        underlying: u32,
    },
    Class
    {
        kind: RecordKind,
        name: String,
        fields: Option<u32>,
        forward: bool,
        size: u64,
    },
    Enumeration
    {
        name: String,
        underlying: u32,
        forward: bool,
    },
    MemberFunction
    {
        return_type: u32,
        class: u32,
        this_pointer: Option<u32>,
        arguments: u32,
        calling_convention: u8,
    },
    ArgumentList(Vec<u32>),
    FieldList
    {
        fields: Vec<FieldEntry>,
        continuation: Option<u32>,
    },
    MethodList(Vec<MethodEntry>),
}

/// A function body from a module symbol stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcedureSymbol
{
    /// Undecorated, qualified name (`Shape::area`).
    pub name: String,
    pub type_index: u32,
    pub address: u64,
    /// Names of the parameter locals, `this` included.
    pub parameter_names: Vec<String>,
}

/// A global data symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSymbol
{
    pub name: String,
    pub type_index: u32,
    pub address: u64,
}

/// Handle into a [`PdbTables`] snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PdbType
{
    /// A type index, primitive or record.
    Index(u32),
    /// The pointee of a primitive pointer.
    Primitive(PrimitiveKind),
}

impl From<u32> for PdbType
{
    fn from(index: u32) -> Self
    {
        PdbType::Index(index)
    }
}

/// Owned snapshot of the PDB streams the walker reads.
#[derive(Debug, Clone, Default)]
pub struct PdbTables
{
    /// Type records keyed by index, in stream order.
    pub records: BTreeMap<u32, Record>,
    /// Function bodies from every module, in module order.
    pub procedures: Vec<ProcedureSymbol>,
    /// Global data symbols.
    pub globals: Vec<DataSymbol>,
    /// Size of a pointer on the target machine.
    pub pointer_size: u64,
}

impl PdbTables
{
    pub fn new(pointer_size: u64) -> Self
    {
        Self {
            pointer_size,
            ..Self::default()
        }
    }

    pub fn insert(&mut self, index: u32, record: Record) -> &mut Self
    {
        self.records.insert(index, record);
        self
    }

    pub fn record(&self, index: u32) -> Option<&Record>
    {
        self.records.get(&index)
    }

    /// The built-in type behind `index`, if it is one.
    pub fn primitive(&self, index: u32) -> Option<PrimitiveType>
    {
        match self.record(index)? {
            Record::Primitive(primitive) => Some(*primitive),
            _ => None,
        }
    }

    /// Whether `index` is the plain (non-pointer) primitive `kind`.
    pub fn is_primitive(&self, index: u32, kind: PrimitiveKind) -> bool
    {
        self.primitive(index)
            .is_some_and(|primitive| primitive.kind == kind && primitive.indirection.is_none())
    }

    /// Name of a class, union or enum record.
    pub fn type_name(&self, index: u32) -> Option<&str>
    {
        match self.record(index)? {
            Record::Class { name, .. } | Record::Enumeration { name, .. } => Some(name),
            _ => None,
        }
    }

    /// The last complete class, union or enum record named `name`.
    pub fn complete_record(&self, name: &str) -> Option<u32>
    {
        self.records
            .iter()
            .filter(|(_, record)| match record {
                Record::Class {
                    name: record_name,
                    forward: false,
                    ..
                }
                | Record::Enumeration {
                    name: record_name,
                    forward: false,
                    ..
                } => record_name == name,
                _ => false,
            })
            .map(|(index, _)| *index)
            .last()
    }

    /// Entries of a field list, following continuation records.
    pub fn field_entries(&self, index: Option<u32>) -> Vec<&FieldEntry>
    {
        let mut entries = Vec::new();
        let mut next = index;
        let mut links = 0;
        while let Some(current) = next {
            let Some(Record::FieldList { fields, continuation }) = self.record(current) else {
                break;
            };
            entries.extend(fields.iter());
            next = *continuation;
            links += 1;
            if links > MAX_TYPE_REF_DEPTH * MAX_TYPE_REF_DEPTH {
                warn!(index = current, "field list continuation chain does not end");
                break;
            }
        }
        entries
    }

    /// Size in bytes of the type behind `index`, 0 if unknown.
    ///
    /// Forward references are sized through the complete record of the same
    /// name.
    pub fn size_of(&self, index: u32) -> u64
    {
        self.size_of_depth(index, 0)
    }

    fn size_of_depth(&self, index: u32, depth: usize) -> u64
    {
        if depth >= MAX_TYPE_REF_DEPTH {
            return 0;
        }

        match self.record(index) {
            Some(Record::Primitive(primitive)) => match primitive.indirection {
                Some(_) => self.pointer_size,
                None => primitive_size(primitive.kind),
            },
            Some(Record::Pointer { .. }) => self.pointer_size,
            Some(Record::Modifier { underlying, .. } | Record::Bitfield { underlying }) => {
                self.size_of_depth(*underlying, depth + 1)
            }
            Some(
                Record::Class {
                    name, forward: true, ..
                }
                | Record::Enumeration {
                    name, forward: true, ..
                },
            ) => match self.complete_record(name) {
                Some(complete) if complete != index => self.size_of_depth(complete, depth + 1),
                _ => 0,
            },
            Some(Record::Enumeration { underlying, .. }) => self.size_of_depth(*underlying, depth + 1),
            Some(Record::Array { byte_size, .. }) => *byte_size,
            Some(Record::Class { size, .. }) => *size,
            _ => 0,
        }
    }
}

impl TypeGraph for PdbTables
{
    type Handle = PdbType;

    fn node(&self, handle: PdbType) -> TypedigResult<TypeNode<PdbType>>
    {
        let index = match handle {
            PdbType::Index(index) => index,
            PdbType::Primitive(kind) => return Ok(TypeNode::Base(primitive_name(kind).to_string())),
        };

        let node = match self.record(index) {
            Some(Record::Primitive(primitive)) => match primitive.indirection {
                Some(_) => TypeNode::Pointer(Some(PdbType::Primitive(primitive.kind))),
                None => TypeNode::Base(primitive_name(primitive.kind).to_string()),
            },
            Some(Record::Pointer { underlying, reference }) => {
                let target = Some(PdbType::Index(*underlying));
                if *reference {
                    TypeNode::Reference(target)
                } else {
                    TypeNode::Pointer(target)
                }
            }
            Some(Record::Modifier { underlying, constant }) => {
                let target = Some(PdbType::Index(*underlying));
                if *constant {
                    TypeNode::Const(target)
                } else {
                    TypeNode::Transparent(target)
                }
            }
            Some(Record::Array { element, byte_size }) => {
                let element_size = self.size_of(*element);
                TypeNode::Array {
                    element: Some(PdbType::Index(*element)),
                    length: byte_size.checked_div(element_size),
                }
            }
            Some(Record::Bitfield { underlying }) => TypeNode::Transparent(Some(PdbType::Index(*underlying))),
            Some(Record::Class { name, .. } | Record::Enumeration { name, .. }) => TypeNode::Named(name.clone()),
            _ => TypeNode::Unknown,
        };
        Ok(node)
    }
}

/// C++ spelling of a primitive kind.
pub fn primitive_name(kind: PrimitiveKind) -> &'static str
{
    match kind {
        PrimitiveKind::NoType | PrimitiveKind::Void => "void",
        PrimitiveKind::HRESULT => "HRESULT",
        PrimitiveKind::Char | PrimitiveKind::RChar => "char",
        PrimitiveKind::I8 => "signed char",
        PrimitiveKind::UChar | PrimitiveKind::U8 => "unsigned char",
        PrimitiveKind::WChar => "wchar_t",
        PrimitiveKind::RChar16 => "char16_t",
        PrimitiveKind::RChar32 => "char32_t",
        PrimitiveKind::Short | PrimitiveKind::I16 => "short",
        PrimitiveKind::UShort | PrimitiveKind::U16 => "unsigned short",
        PrimitiveKind::Long => "long",
        PrimitiveKind::ULong => "unsigned long",
        PrimitiveKind::I32 => "int",
        PrimitiveKind::U32 => "unsigned int",
        PrimitiveKind::Quad | PrimitiveKind::I64 => "__int64",
        PrimitiveKind::UQuad | PrimitiveKind::U64 => "unsigned __int64",
        PrimitiveKind::Octa | PrimitiveKind::I128 => "__int128",
        PrimitiveKind::UOcta | PrimitiveKind::U128 => "unsigned __int128",
        PrimitiveKind::F16 => "__half",
        PrimitiveKind::F32 | PrimitiveKind::F32PP => "float",
        PrimitiveKind::F64 => "double",
        PrimitiveKind::F80 => "long double",
        PrimitiveKind::F128 => "__float128",
        PrimitiveKind::Bool8 | PrimitiveKind::Bool16 | PrimitiveKind::Bool32 | PrimitiveKind::Bool64 => "bool",
        _ => "unknown",
    }
}

fn primitive_size(kind: PrimitiveKind) -> u64
{
    match kind {
        PrimitiveKind::Char
        | PrimitiveKind::UChar
        | PrimitiveKind::RChar
        | PrimitiveKind::I8
        | PrimitiveKind::U8
        | PrimitiveKind::Bool8 => 1,
        PrimitiveKind::WChar
        | PrimitiveKind::RChar16
        | PrimitiveKind::Short
        | PrimitiveKind::UShort
        | PrimitiveKind::I16
        | PrimitiveKind::U16
        | PrimitiveKind::F16
        | PrimitiveKind::Bool16 => 2,
        PrimitiveKind::RChar32
        | PrimitiveKind::Long
        | PrimitiveKind::ULong
        | PrimitiveKind::I32
        | PrimitiveKind::U32
        | PrimitiveKind::F32
        | PrimitiveKind::F32PP
        | PrimitiveKind::Bool32
        | PrimitiveKind::HRESULT => 4,
        PrimitiveKind::F48 => 6,
        PrimitiveKind::Quad
        | PrimitiveKind::UQuad
        | PrimitiveKind::I64
        | PrimitiveKind::U64
        | PrimitiveKind::F64
        | PrimitiveKind::Bool64
        | PrimitiveKind::Complex32 => 8,
        PrimitiveKind::F80 => 10,
        PrimitiveKind::Octa
        | PrimitiveKind::UOcta
        | PrimitiveKind::I128
        | PrimitiveKind::U128
        | PrimitiveKind::F128
        | PrimitiveKind::Complex64 => 16,
        PrimitiveKind::Complex80 => 20,
        PrimitiveKind::Complex128 => 32,
        _ => 0,
    }
}

fn method_entry(attributes: pdb::FieldAttributes, method_type: pdb::TypeIndex, vtable_offset: Option<u32>) -> MethodEntry
{
    MethodEntry {
        method_type: method_type.0,
        vtable_offset,
        is_virtual: attributes.is_virtual() || attributes.is_pure_virtual() || attributes.is_intro_virtual(),
    }
}

fn field_entry(data: &TypeData<'_>) -> Option<FieldEntry>
{
    let entry = match data {
        TypeData::BaseClass(base) => FieldEntry::BaseClass {
            base: base.base_class.0,
        },
        TypeData::VirtualBaseClass(base) => FieldEntry::BaseClass {
            base: base.base_class.0,
        },
        TypeData::Method(method) => FieldEntry::Method {
            name: method.name.to_string().into_owned(),
            entry: method_entry(method.attributes, method.method_type, method.vtable_offset),
        },
        TypeData::OverloadedMethod(method) => FieldEntry::OverloadedMethod {
            name: method.name.to_string().into_owned(),
            method_list: method.method_list.0,
        },
        TypeData::Nested(nested) => FieldEntry::Nested {
            name: nested.name.to_string().into_owned(),
            nested_type: nested.nested_type.0,
        },
        TypeData::Member(member) => FieldEntry::Member {
            name: member.name.to_string().into_owned(),
            field_type: member.field_type.0,
            offset: member.offset,
        },
        TypeData::StaticMember(member) => FieldEntry::StaticMember {
            name: member.name.to_string().into_owned(),
            field_type: member.field_type.0,
        },
        _ => return None,
    };
    Some(entry)
}

/// Convert a parsed type record, `None` for kinds the walker ignores.
fn convert(data: &TypeData<'_>) -> Option<Record>
{
    let record = match data {
        TypeData::Primitive(primitive) => Record::Primitive(*primitive),
        TypeData::Pointer(pointer) => Record::Pointer {
            underlying: pointer.underlying_type.0,
            reference: matches!(
                pointer.attributes.pointer_mode(),
                PointerMode::LValueReference | PointerMode::RValueReference
            ),
        },
        TypeData::Modifier(modifier) => Record::Modifier {
            underlying: modifier.underlying_type.0,
            constant: modifier.constant,
        },
        TypeData::Array(array) => Record::Array {
            element: array.element_type.0,
            byte_size: array.dimensions.first().copied().map_or(0, u64::from),
        },
        TypeData::Bitfield(bitfield) => Record::Bitfield {
            underlying: bitfield.underlying_type.0,
        },
        TypeData::Class(class) => Record::Class {
            kind: match class.kind {
                ClassKind::Class => RecordKind::Class,
                ClassKind::Struct => RecordKind::Struct,
                ClassKind::Interface => RecordKind::Interface,
            },
            name: class.name.to_string().into_owned(),
            fields: class.fields.map(|index| index.0),
            forward: class.properties.forward_reference(),
            size: class.size,
        },
        TypeData::Union(union) => Record::Class {
            kind: RecordKind::Union,
            name: union.name.to_string().into_owned(),
            fields: Some(union.fields.0),
            forward: union.properties.forward_reference(),
            size: union.size,
        },
        TypeData::Enumeration(enumeration) => Record::Enumeration {
            name: enumeration.name.to_string().into_owned(),
            underlying: enumeration.underlying_type.0,
            forward: enumeration.properties.forward_reference(),
        },
        TypeData::MemberFunction(function) => Record::MemberFunction {
            return_type: function.return_type.0,
            class: function.class_type.0,
            this_pointer: function.this_pointer_type.map(|index| index.0),
            arguments: function.argument_list.0,
            calling_convention: function.attributes.calling_convention(),
        },
        TypeData::ArgumentList(list) => Record::ArgumentList(list.arguments.iter().map(|index| index.0).collect()),
        TypeData::FieldList(list) => Record::FieldList {
            fields: list.fields.iter().filter_map(field_entry).collect(),
            continuation: list.continuation.map(|index| index.0),
        },
        TypeData::MethodList(list) => Record::MethodList(
            list.methods
                .iter()
                .map(|method| method_entry(method.attributes, method.method_type, method.vtable_offset))
                .collect(),
        ),
        _ => return None,
    };
    Some(record)
}

/// Parameter names seen inside one procedure's symbol range.
///
/// MSVC describes parameters with `S_LOCAL` records flagged as parameters, or,
/// in older and optimized builds, with register and register-relative records
/// that list the parameters first and the locals after them.
#[derive(Debug, Default)]
struct ProcedureScope
{
    end: Option<pdb::SymbolIndex>,
    /// End of the nested block being skipped.
    block_end: Option<pdb::SymbolIndex>,
    locals: Vec<String>,
    registers: Vec<String>,
    frame_relative: Vec<String>,
}

impl ProcedureScope
{
    fn open(end: pdb::SymbolIndex) -> Self
    {
        Self {
            end: Some(end),
            ..Self::default()
        }
    }

    fn is_open(&self) -> bool
    {
        self.end.is_some()
    }

    fn closes_at(&self, index: pdb::SymbolIndex) -> bool
    {
        self.end.is_some_and(|end| index >= end)
    }

    fn observe(&mut self, index: pdb::SymbolIndex, data: &SymbolData<'_>)
    {
        if !self.is_open() {
            return;
        }
        if self.block_end.is_some_and(|end| index < end) {
            return;
        }
        self.block_end = None;

        match data {
            SymbolData::Block(block) => self.block_end = Some(block.end),
            SymbolData::Local(local) if local.flags.isparam => {
                self.locals.push(local.name.to_string().into_owned());
            }
            SymbolData::RegisterVariable(register) => {
                self.registers.push(register.name.to_string().into_owned());
            }
            SymbolData::RegisterRelative(relative) if relative.offset >= 0 => {
                self.frame_relative.push(relative.name.to_string().into_owned());
            }
            _ => {}
        }
    }

    fn finish(self) -> Vec<String>
    {
        [self.locals, self.registers, self.frame_relative]
            .into_iter()
            .find(|names| !names.is_empty())
            .unwrap_or_default()
    }
}

/// Hand the names collected in `scope` to the procedure that opened it.
fn close_scope(scope: &mut ProcedureScope, procedures: &mut [ProcedureSymbol])
{
    let names = std::mem::take(scope).finish();
    if let Some(procedure) = procedures.last_mut() {
        if !names.is_empty() {
            procedure.parameter_names = names;
        }
    }
}

/// Read the type stream, module procedures and global data of `pdb`.
pub fn read_tables<'s, S: Source<'s> + 's>(pdb: &mut PDB<'s, S>, image_base: u64) -> TypedigResult<PdbTables>
{
    let dbi = pdb
        .debug_information()
        .map_err(|err| map_pdb_error("reading debug information", err))?;
    let pointer_size = match dbi.machine_type() {
        Ok(pdb::MachineType::Amd64 | pdb::MachineType::Arm64 | pdb::MachineType::Ia64) => 8,
        _ => 4,
    };
    let mut tables = PdbTables::new(pointer_size);

    let type_information = pdb
        .type_information()
        .map_err(|err| map_pdb_error("reading type information", err))?;
    // Primitives are not stored in the stream; the finder decodes their indices.
    let finder = type_information.finder();
    for index in 0..FIRST_RECORD_INDEX {
        if let Ok(TypeData::Primitive(primitive)) = finder.find(TypeIndex(index)).and_then(|item| item.parse()) {
            tables.records.insert(index, Record::Primitive(primitive));
        }
    }

    let mut types = type_information.iter();
    loop {
        let item = match types.next() {
            Ok(Some(item)) => item,
            Ok(None) => break,
            Err(err) => {
                warn!(%err, "type stream ends early");
                break;
            }
        };
        match item.parse() {
            Ok(data) => {
                if let Some(record) = convert(&data) {
                    tables.records.insert(item.index().0, record);
                }
            }
            Err(err) => debug!(index = item.index().0, %err, "skipping unparsable type record"),
        }
    }

    let address_map = pdb
        .address_map()
        .map_err(|err| map_pdb_error("reading address map", err))?;
    let absolute = |offset: pdb::PdbInternalSectionOffset| offset.to_rva(&address_map).map(|rva| image_base + u64::from(rva.0));

    let mut modules = dbi.modules().map_err(|err| map_pdb_error("reading module list", err))?;
    while let Some(module) = modules.next().map_err(|err| map_pdb_error("reading module list", err))? {
        let info = match pdb.module_info(&module) {
            Ok(Some(info)) => info,
            Ok(None) => continue,
            Err(err) => {
                debug!(module = %module.module_name(), %err, "skipping module");
                continue;
            }
        };
        let mut symbols = info.symbols().map_err(|err| map_pdb_error("reading module symbols", err))?;

        let mut scope = ProcedureScope::default();
        while let Some(symbol) = symbols.next().map_err(|err| map_pdb_error("reading module symbols", err))? {
            if scope.closes_at(symbol.index()) {
                close_scope(&mut scope, &mut tables.procedures);
            }
            match symbol.parse() {
                Ok(SymbolData::Procedure(procedure)) => {
                    if scope.is_open() {
                        close_scope(&mut scope, &mut tables.procedures);
                    }
                    let Some(address) = absolute(procedure.offset) else {
                        debug!(name = %procedure.name, "procedure without an address");
                        continue;
                    };
                    tables.procedures.push(ProcedureSymbol {
                        name: procedure.name.to_string().into_owned(),
                        type_index: procedure.type_index.0,
                        address,
                        parameter_names: Vec::new(),
                    });
                    scope = ProcedureScope::open(procedure.end);
                }
                Ok(data) => scope.observe(symbol.index(), &data),
                Err(_) => {}
            }
        }
        if scope.is_open() {
            close_scope(&mut scope, &mut tables.procedures);
        }
    }

    let global_symbols = pdb
        .global_symbols()
        .map_err(|err| map_pdb_error("reading global symbols", err))?;
    let mut globals = global_symbols.iter();
    while let Some(symbol) = globals.next().map_err(|err| map_pdb_error("reading global symbols", err))? {
        if let Ok(SymbolData::Data(data)) = symbol.parse() {
            let Some(address) = absolute(data.offset) else {
                continue;
            };
            tables.globals.push(DataSymbol {
                name: data.name.to_string().into_owned(),
                type_index: data.type_index.0,
                address,
            });
        }
    }

    Ok(tables)
}

#[cfg(test)]
mod tests
{
    use pdb::{Indirection, RawString, Register, RegisterRelativeSymbol, RegisterVariableSymbol, SymbolIndex};

    use super::*;
    use crate::resolve::{resolve_type_ptr, DependentTypes};
    use crate::types::TypePtr;

    fn primitive(kind: PrimitiveKind, indirection: Option<Indirection>) -> Record
    {
        Record::Primitive(PrimitiveType { kind, indirection })
    }

    fn resolve(tables: &PdbTables, index: u32) -> TypePtr
    {
        resolve_type_ptr(tables, PdbType::Index(index), &mut DependentTypes::new())
    }

    #[test]
    fn test_primitive_records()
    {
        let mut tables = PdbTables::new(8);
        tables
            .insert(0x74, primitive(PrimitiveKind::I32, None))
            .insert(0x620, primitive(PrimitiveKind::UChar, Some(Indirection::Near64)))
            .insert(0x41, primitive(PrimitiveKind::F64, None));

        assert_eq!(resolve(&tables, 0x74), TypePtr::base("int"));
        assert_eq!(resolve(&tables, 0x620), TypePtr::base("unsigned char").pointer());
        assert_eq!(resolve(&tables, 0x41), TypePtr::base("double"));
        assert_eq!(tables.size_of(0x620), 8);
        assert_eq!(tables.size_of(0x41), 8);
        assert!(tables.is_primitive(0x74, PrimitiveKind::I32));
        assert!(!tables.is_primitive(0x620, PrimitiveKind::UChar));
    }

    #[test]
    fn test_unknown_index_resolves_to_nothing_named()
    {
        let tables = PdbTables::new(4);
        let mut deps = DependentTypes::new();
        resolve_type_ptr(&tables, PdbType::Index(0x9999), &mut deps);
        assert!(deps.is_empty());
        assert_eq!(tables.size_of(0x9999), 0);
    }

    #[test]
    fn test_array_length_from_byte_size()
    {
        let mut tables = PdbTables::new(8);
        tables
            .insert(0x74, primitive(PrimitiveKind::I32, None))
            .insert(0x1000, Record::Array {
                element: 0x74,
                byte_size: 40,
            })
            .insert(0x1001, Record::Modifier {
                underlying: 0x1000,
                constant: true,
            });

        assert_eq!(resolve(&tables, 0x1001), TypePtr::base("int").array(10).constant());
    }

    #[test]
    fn test_array_of_forward_declared_class()
    {
        let mut tables = PdbTables::new(8);
        tables
            .insert(0x1000, Record::Class {
                kind: RecordKind::Struct,
                name: "Point".to_string(),
                fields: None,
                forward: true,
                size: 0,
            })
            .insert(0x1001, Record::Array {
                element: 0x1000,
                byte_size: 32,
            })
            .insert(0x1002, Record::Class {
                kind: RecordKind::Struct,
                name: "Point".to_string(),
                fields: None,
                forward: false,
                size: 8,
            });

        assert_eq!(tables.size_of(0x1000), 8);
        assert_eq!(resolve(&tables, 0x1001), TypePtr::named("Point").array(4));
    }

    #[test]
    fn test_array_of_unsized_element_has_no_length()
    {
        let mut tables = PdbTables::new(8);
        tables
            .insert(0x1000, Record::Class {
                kind: RecordKind::Class,
                name: "Opaque".to_string(),
                fields: None,
                forward: true,
                size: 0,
            })
            .insert(0x1001, Record::Array {
                element: 0x1000,
                byte_size: 32,
            });

        let ptr = resolve(&tables, 0x1001);
        assert!(ptr.is_array);
        assert_eq!(ptr.base_name, "Opaque");
    }

    #[test]
    fn test_forward_enum_sized_by_definition()
    {
        let mut tables = PdbTables::new(4);
        tables
            .insert(0x11, primitive(PrimitiveKind::Short, None))
            .insert(0x1000, Record::Enumeration {
                name: "Mode".to_string(),
                underlying: 0x74,
                forward: true,
            })
            .insert(0x1001, Record::Enumeration {
                name: "Mode".to_string(),
                underlying: 0x11,
                forward: false,
            });

        assert_eq!(tables.size_of(0x1000), 2);
        assert_eq!(tables.complete_record("Mode"), Some(0x1001));
    }

    #[test]
    fn test_reference_to_class()
    {
        let mut tables = PdbTables::new(4);
        tables
            .insert(0x1000, Record::Class {
                kind: RecordKind::Class,
                name: "Bar".to_string(),
                fields: None,
                forward: true,
                size: 0,
            })
            .insert(0x1001, Record::Pointer {
                underlying: 0x1000,
                reference: true,
            });

        let mut deps = DependentTypes::new();
        let ptr = resolve_type_ptr(&tables, PdbType::Index(0x1001), &mut deps);
        assert_eq!(ptr, TypePtr::named("Bar").reference());
        assert_eq!(deps.finish(), vec!["Bar".to_string()]);
    }

    #[test]
    fn test_field_list_continuation()
    {
        let mut tables = PdbTables::new(4);
        tables
            .insert(0x1000, Record::FieldList {
                fields: vec![FieldEntry::Member {
                    name: "a".to_string(),
                    field_type: 0x74,
                    offset: 0,
                }],
                continuation: Some(0x1001),
            })
            .insert(0x1001, Record::FieldList {
                fields: vec![FieldEntry::Member {
                    name: "b".to_string(),
                    field_type: 0x74,
                    offset: 4,
                }],
                continuation: None,
            });

        let names: Vec<_> = tables
            .field_entries(Some(0x1000))
            .into_iter()
            .filter_map(|entry| match entry {
                FieldEntry::Member { name, .. } => Some(name.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(names, ["a", "b"]);
    }

    fn frame_relative(name: &'static str, offset: i32) -> SymbolData<'static>
    {
        SymbolData::RegisterRelative(RegisterRelativeSymbol {
            offset,
            type_index: TypeIndex(0x74),
            register: Register(335),
            name: RawString::from(name),
        })
    }

    #[test]
    fn test_parameters_from_frame_relative_symbols()
    {
        let mut scope = ProcedureScope::open(SymbolIndex(0x200));
        scope.observe(SymbolIndex(0x110), &frame_relative("this", 8));
        scope.observe(SymbolIndex(0x120), &frame_relative("count", 16));
        scope.observe(SymbolIndex(0x130), &frame_relative("scratch", -4));

        assert!(!scope.closes_at(SymbolIndex(0x140)));
        assert!(scope.closes_at(SymbolIndex(0x200)));
        assert_eq!(scope.finish(), ["this", "count"]);
    }

    #[test]
    fn test_register_parameters_win_over_frame_relative()
    {
        let mut scope = ProcedureScope::open(SymbolIndex(0x200));
        scope.observe(SymbolIndex(0x110), &frame_relative("spill", 8));
        scope.observe(
            SymbolIndex(0x120),
            &SymbolData::RegisterVariable(RegisterVariableSymbol {
                type_index: TypeIndex(0x74),
                register: Register(18),
                name: RawString::from("value"),
            }),
        );
        assert_eq!(scope.finish(), ["value"]);
    }

    #[test]
    fn test_closed_scope_ignores_symbols()
    {
        let mut scope = ProcedureScope::default();
        scope.observe(SymbolIndex(0x10), &frame_relative("stray", 8));
        assert!(!scope.is_open());
        assert!(scope.finish().is_empty());
    }

    #[test]
    fn test_nested_block_locals_are_skipped()
    {
        let mut scope = ProcedureScope::open(SymbolIndex(0x300));
        scope.observe(SymbolIndex(0x110), &frame_relative("size", 16));
        scope.observe(
            SymbolIndex(0x120),
            &SymbolData::Block(pdb::BlockSymbol {
                parent: SymbolIndex(0x100),
                end: SymbolIndex(0x180),
                len: 4,
                offset: pdb::PdbInternalSectionOffset { offset: 0, section: 1 },
                name: RawString::from(""),
            }),
        );
        scope.observe(SymbolIndex(0x130), &frame_relative("inner", 24));
        scope.observe(SymbolIndex(0x190), &frame_relative("after", 32));
        assert_eq!(scope.finish(), ["size", "after"]);
    }
}
