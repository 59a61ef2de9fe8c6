//! # Definition Merger
//!
//! Attaches out-of-line definition data (addresses, full argument lists,
//! calling conventions) to the signature-only methods a walker produced from
//! class declarations.
//!
//! The two sides share no identifier, so correlation is structural:
//!
//! - **PDB**: [`merge_definitions`] matches on the unqualified name plus an
//!   element-wise comparison of the explicit argument types.
//! - **DWARF**: [`merge_by_linkage`] matches on the linkage name read through a
//!   `DW_AT_specification` back-reference, which is exact.

use tracing::trace;

use crate::types::{strip_self_arg, Argument, Method, Type};

/// `Shape::area` → `area` when `type_name` is `Shape`.
///
/// Names qualified by some other scope are returned unchanged.
pub fn strip_type_qualifier<'a>(name: &'a str, type_name: &str) -> &'a str
{
    name.strip_prefix(type_name)
        .and_then(|rest| rest.strip_prefix("::"))
        .unwrap_or(name)
}

/// Whether two argument lists agree in arity and element types, ignoring a
/// leading implicit object argument on either side.
pub fn arguments_match(declared: &[Argument], defined: &[Argument]) -> bool
{
    let declared = strip_self_arg(declared);
    let defined = strip_self_arg(defined);
    declared.len() == defined.len() && declared.iter().zip(defined).all(|(left, right)| left.ty == right.ty)
}

/// Merge global function definitions of `ty` into its skeleton methods.
///
/// Every definition ends up in `fully_defined_methods`. A definition that
/// matches a skeleton updates that skeleton in place, keeping its declaration
/// order; one that matches nothing is appended to `all_methods`. When several
/// skeletons share a name the first one whose arguments match wins, so
/// overloads with identical explicit argument types all land on the first.
pub fn merge_definitions(ty: &mut Type, definitions: Vec<Method>)
{
    for mut definition in definitions {
        definition.name = strip_type_qualifier(&definition.name, &ty.name).to_string();
        definition.apply_structor_rule(&ty.name);
        definition.args = strip_self_arg(&definition.args).to_vec();

        let skeleton = ty
            .all_methods
            .iter_mut()
            .find(|method| method.name == definition.name && arguments_match(&method.args, &definition.args));

        match skeleton {
            Some(skeleton) => {
                trace!(method = %definition.name, address = definition.address, "merged definition into declaration");
                skeleton.address = definition.address;
                skeleton.args = definition.args;
                skeleton.is_static = definition.is_static;
                skeleton.calling_convention = definition.calling_convention;
                skeleton.is_variadic |= definition.is_variadic;
                if skeleton.mangled_name.is_empty() {
                    skeleton.mangled_name = definition.mangled_name;
                }
                ty.fully_defined_methods.push(skeleton.clone());
            }
            None => {
                trace!(method = %definition.name, address = definition.address, "definition without declaration");
                ty.fully_defined_methods.push(definition.clone());
                ty.all_methods.push(definition);
            }
        }
    }
}

/// An out-of-line body that refers back to its declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkedDefinition
{
    /// Linkage name read from the referenced declaration.
    pub linkage_name: String,
    /// Parameters of the body, artificial ones excluded.
    pub args: Vec<Argument>,
    /// Entry address of the body, 0 if it has none.
    pub address: u64,
}

/// Merge out-of-line bodies into skeletons by linkage name.
///
/// The body's parameters replace the declared ones. Bodies whose linkage name
/// matches no skeleton are dropped and unmatched skeletons stay as declared.
pub fn merge_by_linkage(ty: &mut Type, definitions: Vec<LinkedDefinition>)
{
    for definition in definitions {
        if definition.linkage_name.is_empty() {
            continue;
        }

        let Some(method) = ty
            .all_methods
            .iter_mut()
            .find(|method| method.mangled_name == definition.linkage_name)
        else {
            trace!(linkage = %definition.linkage_name, "no declaration for out-of-line body");
            continue;
        };

        method.args = definition.args;
        if definition.address != 0 && method.address == 0 {
            method.address = definition.address;
            ty.fully_defined_methods.push(method.clone());
        }
    }
}
