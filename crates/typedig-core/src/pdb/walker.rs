//! PDB walker: `locate declaration → field skeleton → global functions`.

use pdb::PrimitiveKind;
use tracing::{debug, debug_span, trace};

use super::records::{FieldEntry, MethodEntry, PdbTables, PdbType, Record, RecordKind};
use crate::merge::merge_definitions;
use crate::resolve::{resolve_type_ptr, DependentTypes};
use crate::types::{synthetic_arg_name, Accessibility, Argument, CallingConvention, Field, Method, Type, TypePtr};

/// How deep nested type definitions are expanded.
pub const MAX_NESTED_DEPTH: usize = 8;

/// Helper methods MSVC emits into class records on its own.
const MSVC_HELPER_METHODS: &[&str] = &[
    "__vbaseDtor",
    "__vecDelDtor",
    "__dflt_ctor_closure",
    "__delDtor",
    "__vec_ctor",
    "__vec_dtor",
    "__vec_ctor_vb",
    "__ehvec_ctor",
    "__ehvec_dtor",
    "__ehvec_ctor_vb",
    "__copy_ctor_closure",
    "__local_vftable_ctor_closure",
    "__placement_delete_closure",
    "__placement_arrayDelete_closure",
    "__man_vec_ctor",
    "__man_vec_dtor",
    "__ehvec_copy_ctor",
    "__ehvec_copy_ctor_vb",
];

/// Whether `name` (bare or qualified) is one of MSVC's generated helpers.
pub fn is_compiler_generated_name(name: &str) -> bool
{
    let member = name.rsplit("::").next().unwrap_or(name);
    MSVC_HELPER_METHODS.contains(&member)
}

/// A class/struct record picked for a lookup.
#[derive(Debug, Clone, Copy)]
struct Declaration
{
    index: u32,
    fields: Option<u32>,
}

/// Build the full model of `name`, or `None` if no class/struct has that name.
pub fn build_type(tables: &PdbTables, name: &str) -> Option<Type>
{
    build_type_at_depth(tables, name, 0)
}

fn build_type_at_depth(tables: &PdbTables, name: &str, depth: usize) -> Option<Type>
{
    let _span = debug_span!("pdb_type", name).entered();
    let declaration = locate_declaration(tables, name)?;
    trace!(index = declaration.index, "declaration located");

    let mut deps = DependentTypes::new();
    let mut ty = Type::new(name);
    build_field_skeleton(tables, declaration, &mut ty, &mut deps, depth);
    attach_static_addresses(tables, &mut ty);

    let definitions = scan_global_functions(tables, name, &mut deps);
    merge_definitions(&mut ty, definitions);

    let mut dependents = deps.finish();
    dependents.retain(|dependent| dependent != name);
    ty.dependent_types = dependents;
    Some(ty)
}

/// The last complete class/struct record named `name`.
fn locate_declaration(tables: &PdbTables, name: &str) -> Option<Declaration>
{
    tables
        .records
        .iter()
        .filter_map(|(index, record)| match record {
            Record::Class {
                kind: RecordKind::Class | RecordKind::Struct | RecordKind::Interface,
                name: record_name,
                fields,
                forward: false,
                ..
            } if record_name == name => Some(Declaration {
                index: *index,
                fields: *fields,
            }),
            _ => None,
        })
        .last()
}

fn build_field_skeleton(tables: &PdbTables, declaration: Declaration, ty: &mut Type, deps: &mut DependentTypes, depth: usize)
{
    for entry in tables.field_entries(declaration.fields) {
        match entry {
            FieldEntry::BaseClass { base } => match tables.type_name(*base) {
                Some(base_name) => {
                    deps.add(base_name);
                    ty.base_types.push(Type::stub(base_name));
                }
                None => debug!(index = base, "base class record has no name"),
            },
            FieldEntry::Method { name, entry } => {
                let method = skeleton_method(tables, name, entry, &ty.name, deps);
                ty.all_methods.push(method);
            }
            FieldEntry::OverloadedMethod { name, method_list } => match tables.record(*method_list) {
                Some(Record::MethodList(entries)) => {
                    for entry in entries {
                        let method = skeleton_method(tables, name, entry, &ty.name, deps);
                        ty.all_methods.push(method);
                    }
                }
                _ => debug!(method = %name, index = method_list, "overload set without a method list"),
            },
            FieldEntry::Nested { name, .. } => {
                let nested = nested_type(tables, &ty.name, name, depth);
                ty.nested_types.push(nested);
            }
            FieldEntry::Member {
                name,
                field_type,
                offset,
            } => {
                let field_ty = resolve_type_ptr(tables, PdbType::Index(*field_type), deps);
                ty.fields
                    .push(Field::instance(name.clone(), field_ty, *offset).with_accessibility(Accessibility::Public));
            }
            FieldEntry::StaticMember { name, field_type } => {
                let field_ty = resolve_type_ptr(tables, PdbType::Index(*field_type), deps);
                ty.fields
                    .push(Field::static_at(name.clone(), field_ty, 0).with_accessibility(Accessibility::Public));
            }
        }
    }
}

/// Expand `Outer::Inner`, falling back to a stub.
fn nested_type(tables: &PdbTables, outer: &str, name: &str, depth: usize) -> Type
{
    let qualified = format!("{outer}::{name}");
    let expanded = if depth < MAX_NESTED_DEPTH {
        build_type_at_depth(tables, &qualified, depth + 1)
    } else {
        debug!(nested = %qualified, "nested type depth limit reached");
        None
    };

    match expanded {
        Some(mut nested) => {
            nested.name = name.to_string();
            nested
        }
        None => Type::stub(name),
    }
}

/// Argument list of a function record: arguments plus whether it is variadic.
fn argument_list(tables: &PdbTables, index: u32, deps: &mut DependentTypes) -> (Vec<Argument>, bool)
{
    let Some(Record::ArgumentList(items)) = tables.record(index) else {
        debug!(index, "function without an argument list");
        return (Vec::new(), false);
    };

    let mut items = items.as_slice();
    let mut variadic = false;
    if let Some((&last, rest)) = items.split_last() {
        if tables.is_primitive(last, PrimitiveKind::NoType) {
            variadic = true;
            items = rest;
        }
    }
    if let [only] = items {
        if tables.is_primitive(*only, PrimitiveKind::Void) {
            items = &[];
        }
    }

    let args = items
        .iter()
        .enumerate()
        .map(|(position, item)| {
            Argument::new(synthetic_arg_name(position + 1), resolve_type_ptr(tables, PdbType::Index(*item), deps))
        })
        .collect();
    (args, variadic)
}

fn skeleton_method(tables: &PdbTables, name: &str, entry: &MethodEntry, type_name: &str, deps: &mut DependentTypes) -> Method
{
    let mut method = Method::new(name, TypePtr::none());
    method.accessibility = Accessibility::Public;
    method.is_virtual = entry.is_virtual || entry.vtable_offset.is_some();
    method.vftable_offset = entry.vtable_offset.map_or(-1, i64::from);
    method.is_compiler_generated = is_compiler_generated_name(name);

    match tables.record(entry.method_type) {
        Some(Record::MemberFunction {
            return_type,
            this_pointer,
            arguments,
            calling_convention,
            ..
        }) => {
            method.return_type = resolve_type_ptr(tables, PdbType::Index(*return_type), deps);
            method.calling_convention = CallingConvention::from_codeview(*calling_convention);
            method.is_static = this_pointer.is_none();
            let (args, variadic) = argument_list(tables, *arguments, deps);
            method.args = args;
            method.is_variadic = variadic;
        }
        _ => debug!(method = %name, index = entry.method_type, "method without a member function record"),
    }

    method.apply_structor_rule(type_name);
    method
}

/// Fill static field addresses from `Type::field` global data symbols.
fn attach_static_addresses(tables: &PdbTables, ty: &mut Type)
{
    for field in ty.fields.iter_mut().filter(|field| field.is_static && field.address == 0) {
        let qualified = format!("{}::{}", ty.name, field.name);
        if let Some(global) = tables.globals.iter().find(|global| global.name == qualified) {
            field.address = global.address;
        }
    }
}

/// Full methods for every procedure whose owning class is `type_name`.
fn scan_global_functions(tables: &PdbTables, type_name: &str, deps: &mut DependentTypes) -> Vec<Method>
{
    let mut definitions = Vec::new();
    for procedure in &tables.procedures {
        let Some(Record::MemberFunction {
            return_type,
            class,
            this_pointer,
            arguments,
            calling_convention,
        }) = tables.record(procedure.type_index)
        else {
            continue;
        };
        if tables.type_name(*class) != Some(type_name) {
            continue;
        }

        let return_type = resolve_type_ptr(tables, PdbType::Index(*return_type), deps);
        let mut method = Method::new(procedure.name.clone(), return_type);
        method.mangled_name = procedure.name.clone();
        method.address = procedure.address;
        method.accessibility = Accessibility::Public;
        method.calling_convention = CallingConvention::from_codeview(*calling_convention);
        method.is_static = this_pointer.is_none();
        method.is_compiler_generated = is_compiler_generated_name(&procedure.name);

        let mut names = procedure.parameter_names.as_slice();
        if let Some(this_pointer) = this_pointer {
            method.args.push(Argument::new("this", resolve_type_ptr(tables, PdbType::Index(*this_pointer), deps)));
            if names.first().is_some_and(|first| first == "this") {
                names = &names[1..];
            }
        }

        let (args, variadic) = argument_list(tables, *arguments, deps);
        method.is_variadic = variadic;
        for (position, mut arg) in args.into_iter().enumerate() {
            if let Some(name) = names.get(position).filter(|name| !name.is_empty()) {
                arg.name = name.clone();
            }
            method.args.push(arg);
        }

        trace!(procedure = %procedure.name, address = procedure.address, "global function of type");
        definitions.push(method);
    }
    definitions
}

/// Names of complete class (and, optionally, struct) records.
pub fn type_names(tables: &PdbTables, include_structs: bool) -> Vec<String>
{
    let mut names: Vec<String> = tables
        .records
        .values()
        .filter_map(|record| match record {
            Record::Class {
                kind,
                name,
                forward: false,
                ..
            } if !name.is_empty() && !name.starts_with('<') => {
                let wanted = match kind {
                    RecordKind::Class | RecordKind::Interface => true,
                    RecordKind::Struct => include_structs,
                    RecordKind::Union => false,
                };
                wanted.then(|| name.clone())
            }
            _ => None,
        })
        .collect();
    names.sort();
    names.dedup();
    names
}

/// Global data symbols that are not static members of a known class.
pub fn global_variables(tables: &PdbTables) -> Vec<Field>
{
    tables
        .globals
        .iter()
        .filter(|global| {
            let owner = global.name.rsplit_once("::").map(|(owner, _)| owner);
            owner.map_or(true, |owner| locate_declaration(tables, owner).is_none())
        })
        .map(|global| {
            let ty = resolve_type_ptr(tables, PdbType::Index(global.type_index), &mut DependentTypes::new());
            Field::static_at(global.name.clone(), ty, global.address)
        })
        .collect()
}
