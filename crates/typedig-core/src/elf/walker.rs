//! Class reconstruction from mangled symbol names.

use std::collections::HashSet;

use tracing::{debug_span, trace};

use super::{ElfSymbol, ElfSymbolKind};
use crate::demangle::{
    demangle_symbol, is_type_info_symbol, normalize_type_name, parse_demangled, parse_symbol, thunk_target,
    type_ptr_from_text, DemangledSymbol,
};
use crate::options::WordSize;
use crate::resolve::DependentTypes;
use crate::types::{synthetic_arg_name, Accessibility, Argument, Field, Method, Type, TypePtr};

/// Return type assumed when a mangled name does not encode one.
///
/// Itanium names only carry return types for template instantiations.
const DEFAULT_RETURN_TYPE: &str = "int";

/// Build `name` from every symbol whose owner is exactly `name`.
pub fn build_type(symbols: &[ElfSymbol], word_size: WordSize, name: &str) -> Option<Type>
{
    let _span = debug_span!("elf_type", name).entered();
    let mut ty = Type::new(name);
    let mut deps = DependentTypes::new();
    let mut seen_addresses = HashSet::new();
    let mut found = false;
    let virtual_methods = thunked_methods(symbols, name);

    for symbol in symbols {
        let Some(parsed) = parse_symbol(&symbol.name) else {
            continue;
        };
        if parsed.is_special || parsed.owner.as_deref() != Some(name) {
            continue;
        }
        found = true;

        match symbol.kind {
            ElfSymbolKind::Function => {
                if !seen_addresses.insert(symbol.address) {
                    trace!(symbol = %symbol.name, address = symbol.address, "alias of an earlier method");
                    continue;
                }
                let mut method = symbol_method(symbol, &parsed, name, &mut deps);
                method.is_virtual = virtual_methods.contains(&(parsed.member.clone(), parsed.params.clone()));
                ty.fully_defined_methods.push(method.clone());
                ty.all_methods.push(method);
            }
            ElfSymbolKind::Object => {
                if ty.field(&parsed.member).is_some() {
                    continue;
                }
                ty.fields.push(
                    Field::static_at(parsed.member.clone(), type_for_size(symbol.size, word_size), symbol.address)
                        .with_accessibility(Accessibility::Public),
                );
            }
        }
    }

    if !found {
        return None;
    }
    let mut dependents = deps.finish();
    dependents.retain(|dependent| dependent != name);
    ty.dependent_types = dependents;
    Some(ty)
}

fn symbol_method(symbol: &ElfSymbol, parsed: &DemangledSymbol, type_name: &str, deps: &mut DependentTypes) -> Method
{
    let return_type = match parsed.return_type.as_deref() {
        Some(text) => type_ptr_from_text(text, deps),
        None => TypePtr::base(DEFAULT_RETURN_TYPE),
    };

    let mut method = Method::new(parsed.member.clone(), return_type);
    method.mangled_name = symbol.name.clone();
    method.address = symbol.address;
    method.accessibility = Accessibility::Public;

    for param in parsed.params.iter().flatten() {
        if param == "..." {
            method.is_variadic = true;
            continue;
        }
        let position = method.args.len() + 1;
        method
            .args
            .push(Argument::new(synthetic_arg_name(position), type_ptr_from_text(param, deps)));
    }

    method.apply_structor_rule(type_name);
    method
}

/// Member names and parameter lists of `type_name` methods reached through thunks.
fn thunked_methods(symbols: &[ElfSymbol], type_name: &str) -> HashSet<(String, Option<Vec<String>>)>
{
    symbols
        .iter()
        .filter(|symbol| symbol.kind == ElfSymbolKind::Function && symbol.name.starts_with("_ZT"))
        .filter_map(|symbol| thunk_target(&symbol.name))
        .filter(|target| target.owner.as_deref() == Some(type_name))
        .map(|target| (target.member, target.params))
        .collect()
}

/// Best-effort type of a data symbol from its size alone.
pub fn type_for_size(size: u64, word_size: WordSize) -> TypePtr
{
    match size {
        1 => TypePtr::base("char"),
        2 => TypePtr::base("short"),
        4 => TypePtr::base("int"),
        8 if word_size == WordSize::Bits64 => TypePtr::base("long"),
        8 => TypePtr::base("double"),
        _ => TypePtr::unknown(),
    }
}

/// Classes named by run-time type information symbols.
pub fn type_names(symbols: &[ElfSymbol]) -> Vec<String>
{
    let mut names: Vec<String> = symbols
        .iter()
        .filter(|symbol| is_type_info_symbol(&symbol.name))
        .map(|symbol| normalize_type_name(&symbol.name))
        .filter(|name| !name.is_empty())
        .collect();
    names.sort();
    names.dedup();
    names
}

/// Data symbols with an address, unmangled or nested-name mangled.
pub fn global_variables(symbols: &[ElfSymbol], word_size: WordSize) -> Vec<Field>
{
    symbols
        .iter()
        .filter(|symbol| symbol.kind == ElfSymbolKind::Object && symbol.address != 0)
        .filter(|symbol| !symbol.name.starts_with("_ZT"))
        .filter(|symbol| !symbol.name.starts_with("_Z") || symbol.name.starts_with("_ZN"))
        .map(|symbol| {
            let name = demangle_symbol(&symbol.name)
                .map(|text| parse_demangled(&text).qualified)
                .unwrap_or_else(|| symbol.name.clone());
            Field::static_at(name, type_for_size(symbol.size, word_size), symbol.address)
        })
        .collect()
}
