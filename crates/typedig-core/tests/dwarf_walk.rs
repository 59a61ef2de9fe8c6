//! DWARF walker tests over debug info synthesized with `gimli::write`

use gimli::write::{Address, AttributeValue, DwarfUnit, EndianVec, Expression, Sections, UnitEntryId};
use gimli::{constants, DwAt, DwTag, Encoding, Format, LittleEndian, RunTimeEndian, SectionId};
use pretty_assertions::assert_eq;
use typedig_core::{Accessibility, DwarfSource, TypePtr, TypeSource};
use typedig_utils::{init_logging_from_config, LogConfig, LogFormat, LogLevel};

/// A single compilation unit under construction.
struct Fixture
{
    unit: DwarfUnit,
}

impl Fixture
{
    fn new() -> Self
    {
        let encoding = Encoding {
            format: Format::Dwarf32,
            version: 4,
            address_size: 8,
        };
        Self {
            unit: DwarfUnit::new(encoding),
        }
    }

    fn root(&self) -> UnitEntryId
    {
        self.unit.unit.root()
    }

    fn add(&mut self, parent: UnitEntryId, tag: DwTag, attrs: Vec<(DwAt, AttributeValue)>) -> UnitEntryId
    {
        let id = self.unit.unit.add(parent, tag);
        let entry = self.unit.unit.get_mut(id);
        for (name, value) in attrs {
            entry.set(name, value);
        }
        id
    }

    fn finish(mut self) -> DwarfSource
    {
        let mut sections = Sections::new(EndianVec::new(LittleEndian));
        self.unit.write(&mut sections).unwrap();

        let mut raw: Vec<(SectionId, Vec<u8>)> = Vec::new();
        sections
            .for_each(|id, data| {
                raw.push((id, data.slice().to_vec()));
                Ok::<_, gimli::Error>(())
            })
            .unwrap();
        DwarfSource::from_sections(raw, RunTimeEndian::Little)
    }
}

fn name(value: &str) -> (DwAt, AttributeValue)
{
    (constants::DW_AT_name, AttributeValue::String(value.as_bytes().to_vec()))
}

fn linkage(value: &str) -> (DwAt, AttributeValue)
{
    (constants::DW_AT_linkage_name, AttributeValue::String(value.as_bytes().to_vec()))
}

fn type_of(id: UnitEntryId) -> (DwAt, AttributeValue)
{
    (constants::DW_AT_type, AttributeValue::UnitRef(id))
}

fn flag(attr: DwAt) -> (DwAt, AttributeValue)
{
    (attr, AttributeValue::Flag(true))
}

fn access(value: constants::DwAccess) -> (DwAt, AttributeValue)
{
    (constants::DW_AT_accessibility, AttributeValue::Accessibility(value))
}

fn location(address: u64) -> (DwAt, AttributeValue)
{
    let mut expression = Expression::new();
    expression.op_addr(Address::Constant(address));
    (constants::DW_AT_location, AttributeValue::Exprloc(expression))
}

fn base_type(fixture: &mut Fixture, type_name: &str, size: u8) -> UnitEntryId
{
    let root = fixture.root();
    fixture.add(root, constants::DW_TAG_base_type, vec![
        name(type_name),
        (constants::DW_AT_byte_size, AttributeValue::Data1(size)),
    ])
}

/// The artificial object pointer every member function carries.
fn object_parameter(fixture: &mut Fixture, function: UnitEntryId, pointer: UnitEntryId)
{
    fixture.add(function, constants::DW_TAG_formal_parameter, vec![
        type_of(pointer),
        flag(constants::DW_AT_artificial),
    ]);
}

/// `class Shape : Object` with a virtual `area`, an out-of-line `scale(int)`,
/// a static `count` defined at 0x2000 and a private `origin`.
fn shape_source() -> DwarfSource
{
    let mut fixture = Fixture::new();
    let root = fixture.root();
    let int = base_type(&mut fixture, "int", 4);
    let double = base_type(&mut fixture, "double", 8);

    let object = fixture.add(root, constants::DW_TAG_class_type, vec![name("Object")]);
    let shape = fixture.add(root, constants::DW_TAG_class_type, vec![name("Shape")]);
    let shape_ptr = fixture.add(root, constants::DW_TAG_pointer_type, vec![type_of(shape)]);

    fixture.add(shape, constants::DW_TAG_inheritance, vec![type_of(object)]);
    let count = fixture.add(shape, constants::DW_TAG_member, vec![
        name("count"),
        type_of(int),
        flag(constants::DW_AT_external),
        flag(constants::DW_AT_declaration),
        access(constants::DW_ACCESS_public),
    ]);
    fixture.add(shape, constants::DW_TAG_member, vec![
        name("origin"),
        type_of(int),
        (constants::DW_AT_data_member_location, AttributeValue::Udata(8)),
        access(constants::DW_ACCESS_private),
    ]);

    let mut slot = Expression::new();
    slot.op_constu(0);
    let area = fixture.add(shape, constants::DW_TAG_subprogram, vec![
        name("area"),
        linkage("_ZN5Shape4areaEv"),
        type_of(double),
        (constants::DW_AT_virtuality, AttributeValue::Virtuality(constants::DW_VIRTUALITY_virtual)),
        (constants::DW_AT_vtable_elem_location, AttributeValue::Exprloc(slot)),
        access(constants::DW_ACCESS_public),
        flag(constants::DW_AT_declaration),
    ]);
    object_parameter(&mut fixture, area, shape_ptr);

    let scale = fixture.add(shape, constants::DW_TAG_subprogram, vec![
        name("scale"),
        linkage("_ZN5Shape5scaleEi"),
        access(constants::DW_ACCESS_public),
        flag(constants::DW_AT_declaration),
    ]);
    object_parameter(&mut fixture, scale, shape_ptr);
    fixture.add(scale, constants::DW_TAG_formal_parameter, vec![type_of(int)]);

    let constructor = fixture.add(shape, constants::DW_TAG_subprogram, vec![
        name("Shape"),
        linkage("_ZN5ShapeC2Ev"),
        flag(constants::DW_AT_artificial),
        flag(constants::DW_AT_declaration),
    ]);
    object_parameter(&mut fixture, constructor, shape_ptr);

    let body = fixture.add(root, constants::DW_TAG_subprogram, vec![
        (constants::DW_AT_specification, AttributeValue::UnitRef(scale)),
        (constants::DW_AT_low_pc, AttributeValue::Address(Address::Constant(0x1400))),
    ]);
    fixture.add(body, constants::DW_TAG_formal_parameter, vec![
        name("this"),
        type_of(shape_ptr),
        flag(constants::DW_AT_artificial),
    ]);
    fixture.add(body, constants::DW_TAG_formal_parameter, vec![name("factor"), type_of(int)]);

    fixture.add(root, constants::DW_TAG_variable, vec![
        (constants::DW_AT_specification, AttributeValue::UnitRef(count)),
        location(0x2000),
    ]);
    fixture.add(root, constants::DW_TAG_variable, vec![name("g_ticks"), type_of(int), location(0x3000)]);

    let geo = fixture.add(root, constants::DW_TAG_namespace, vec![name("geo")]);
    fixture.add(geo, constants::DW_TAG_class_type, vec![name("Circle")]);
    fixture.add(geo, constants::DW_TAG_structure_type, vec![name("Point")]);
    fixture.add(root, constants::DW_TAG_class_type, vec![
        name("Opaque"),
        flag(constants::DW_AT_declaration),
    ]);

    fixture.finish()
}

#[test]
fn test_shape_end_to_end()
{
    let shape = shape_source().get_type("Shape").unwrap();

    assert_eq!(shape.primary_base(), Some("Object"));

    let count = shape.field("count").unwrap();
    assert!(count.is_static);
    assert_eq!(count.address, 0x2000);
    assert_eq!(count.offset, 0);
    assert_eq!(count.accessibility, Accessibility::Public);

    let origin = shape.field("origin").unwrap();
    assert!(!origin.is_static);
    assert_eq!(origin.offset, 8);
    assert_eq!(origin.accessibility, Accessibility::Private);

    let names: Vec<&str> = shape.all_methods.iter().map(|method| method.name.as_str()).collect();
    assert_eq!(names, ["area", "scale", "Shape"]);

    let area = &shape.all_methods[0];
    assert_eq!(area.return_type, TypePtr::base("double"));
    assert!(area.is_virtual);
    assert_eq!(area.vftable_offset, 0);
    assert!(!area.is_static);
    assert!(area.args.is_empty());

    let constructor = &shape.all_methods[2];
    assert!(constructor.return_type.is_none());
    assert!(constructor.is_compiler_generated);

    assert_eq!(shape.dependent_types, ["Object"]);
}

#[test]
fn test_out_of_line_body_supplies_arguments_and_address()
{
    let shape = shape_source().get_type("Shape").unwrap();

    let scale: Vec<_> = shape.methods_named("scale").collect();
    assert_eq!(scale.len(), 1);
    assert_eq!(scale[0].args.len(), 1);
    assert_eq!(scale[0].args[0].name, "factor");
    assert_eq!(scale[0].args[0].ty, TypePtr::base("int"));
    assert_eq!(scale[0].address, 0x1400);

    assert_eq!(shape.fully_defined_methods.len(), 1);
    assert_eq!(shape.fully_defined_methods[0].name, "scale");
}

#[test]
fn test_linkage_name_merge_without_duplicates()
{
    let mut fixture = Fixture::new();
    let root = fixture.root();
    let int = base_type(&mut fixture, "int", 4);
    let class = fixture.add(root, constants::DW_TAG_class_type, vec![name("A")]);
    let class_ptr = fixture.add(root, constants::DW_TAG_pointer_type, vec![type_of(class)]);
    let foo = fixture.add(class, constants::DW_TAG_subprogram, vec![
        name("foo"),
        linkage("_ZN1A3fooEi"),
        flag(constants::DW_AT_declaration),
    ]);
    object_parameter(&mut fixture, foo, class_ptr);
    let body = fixture.add(root, constants::DW_TAG_subprogram, vec![(
        constants::DW_AT_specification,
        AttributeValue::UnitRef(foo),
    )]);
    object_parameter(&mut fixture, body, class_ptr);
    fixture.add(body, constants::DW_TAG_formal_parameter, vec![name("value"), type_of(int)]);

    let a = fixture.finish().get_type("A").unwrap();
    assert_eq!(a.all_methods.len(), 1);
    assert_eq!(a.all_methods[0].args.len(), 1);
    assert_eq!(a.all_methods[0].args[0].name, "value");
    assert_eq!(a.all_methods[0].address, 0);
    assert!(a.fully_defined_methods.is_empty());
}

#[test]
fn test_qualifier_chain_flattens()
{
    let mut fixture = Fixture::new();
    let root = fixture.root();
    let int = base_type(&mut fixture, "int", 4);
    let array = fixture.add(root, constants::DW_TAG_array_type, vec![type_of(int)]);
    fixture.add(array, constants::DW_TAG_subrange_type, vec![(
        constants::DW_AT_upper_bound,
        AttributeValue::Udata(3),
    )]);
    let constant = fixture.add(root, constants::DW_TAG_const_type, vec![type_of(array)]);
    let pointer = fixture.add(root, constants::DW_TAG_pointer_type, vec![type_of(constant)]);
    let other = fixture.add(root, constants::DW_TAG_structure_type, vec![name("Other")]);

    let table = fixture.add(root, constants::DW_TAG_structure_type, vec![name("Table")]);
    fixture.add(table, constants::DW_TAG_member, vec![name("rows"), type_of(pointer)]);
    for field in ["first", "second", "third"] {
        fixture.add(table, constants::DW_TAG_member, vec![name(field), type_of(other)]);
    }

    let table = fixture.finish().get_type("Table").unwrap();
    let rows = &table.field("rows").unwrap().ty;
    assert!(rows.is_pointer);
    assert!(rows.is_constant);
    assert!(rows.is_array);
    assert_eq!(rows.array_size, 4);
    assert_eq!(rows.base_name, "int");
    assert!(rows.is_base_type);

    let first = &table.field("first").unwrap().ty;
    assert_eq!(*first, TypePtr::named("Other"));
    assert_eq!(table.dependent_types, ["Other"]);
}

#[test]
fn test_missing_type_is_absent()
{
    let source = shape_source();
    assert!(source.get_type("DoesNotExist").is_none());
    assert!(source.get_type("Opaque").is_none());
}

#[test]
fn test_qualified_lookup()
{
    let source = shape_source();
    assert_eq!(source.get_type("geo::Circle").unwrap().name, "geo::Circle");
    assert!(source.get_type("Circle").is_some());
}

#[test]
fn test_type_list_is_scope_qualified()
{
    let source = shape_source();
    assert_eq!(source.get_types_list(false), ["Object", "Shape", "geo::Circle"]);
    assert_eq!(source.get_types_list(true), ["Object", "Shape", "geo::Circle", "geo::Point"]);
}

#[test]
fn test_globals_exclude_static_member_definitions()
{
    let globals = shape_source().get_all_global_variables();
    assert_eq!(globals.len(), 1);
    assert_eq!(globals[0].name, "g_ticks");
    assert_eq!(globals[0].address, 0x3000);
    assert_eq!(globals[0].ty, TypePtr::base("int"));
}

#[test]
fn test_walk_under_trace_logging()
{
    let log_dir = tempfile::tempdir().unwrap();
    let config = LogConfig {
        level: LogLevel::Trace,
        format: LogFormat::Json,
        file: Some(log_dir.path().join("walk.log")),
        ..LogConfig::default()
    };
    let guard = init_logging_from_config(&config).unwrap();
    assert!(guard.is_some());

    let source = shape_source();
    assert!(source.get_type("Shape").is_some());
    assert!(source.get_type("Missing").is_none());
    tracing::info!("walk finished");

    drop(guard);
    assert_eq!(std::fs::read_dir(log_dir.path()).unwrap().count(), 1);
}
