//! Tests for the normalized type model

use typedig_core::types::{strip_self_arg, synthetic_arg_name};
use typedig_core::{Accessibility, Argument, CallingConvention, Field, Method, Type, TypePtr};

#[test]
fn test_type_ptr_display()
{
    assert_eq!(TypePtr::base("char").constant().pointer().to_string(), "const char*");
    assert_eq!(TypePtr::named("Shader").reference().to_string(), "Shader&");
}

#[test]
fn test_type_ptr_dependency()
{
    assert!(TypePtr::named("Shape").is_dependent());
    assert!(!TypePtr::base("int").is_dependent());
    assert!(!TypePtr::none().is_dependent());
    assert!(TypePtr::none().is_none());
}

#[test]
fn test_stub_types()
{
    let stub = Type::stub("Object");
    assert!(stub.is_stub());
    assert_eq!(stub.name, "Object");

    let mut full = Type::new("ns::Shape");
    full.fields.push(Field::instance("x", TypePtr::base("int"), 0));
    assert!(!full.is_stub());
    assert_eq!(full.short_name(), "Shape");
}

#[test]
fn test_method_defaults()
{
    let method = Method::new("area", TypePtr::base("double"));
    assert_eq!(method.address, 0);
    assert_eq!(method.vftable_offset, -1);
    assert!(!method.is_virtual);
    assert_eq!(method.calling_convention, CallingConvention::Default);
    assert_eq!(method.accessibility, Accessibility::None);
}

#[test]
fn test_structor_rule()
{
    let mut constructor = Method::new("Shape", TypePtr::base("int"));
    constructor.apply_structor_rule("geo::Shape");
    assert!(constructor.return_type.is_none());

    let mut destructor = Method::new("~Shape", TypePtr::base("void"));
    destructor.apply_structor_rule("Shape");
    assert!(destructor.return_type.is_none());

    let mut area = Method::new("area", TypePtr::base("double"));
    area.apply_structor_rule("Shape");
    assert_eq!(area.return_type, TypePtr::base("double"));
}

#[test]
fn test_self_argument_is_stripped()
{
    let args = vec![
        Argument::new("this", TypePtr::named("Shape").pointer()),
        Argument::new(synthetic_arg_name(1), TypePtr::base("int")),
    ];
    let explicit = strip_self_arg(&args);
    assert_eq!(explicit.len(), 1);
    assert_eq!(explicit[0].name, "arg1");
}

#[test]
fn test_calling_convention_keywords()
{
    assert_eq!(CallingConvention::from_codeview(0x0b).to_string(), "__thiscall");
    assert_eq!(CallingConvention::from_codeview(0x01), CallingConvention::Cdecl);
    assert_eq!(CallingConvention::from_codeview(0x07).keyword(), "__stdcall");
    assert_eq!(CallingConvention::from_codeview(0x40), CallingConvention::Other(0x40));
}

#[test]
fn test_accessibility_from_dwarf()
{
    assert_eq!(Accessibility::from_dwarf(2), Accessibility::Protected);
    assert_eq!(Accessibility::from_dwarf(9), Accessibility::None);
    assert_eq!(Accessibility::Private.to_string(), "private");
}
