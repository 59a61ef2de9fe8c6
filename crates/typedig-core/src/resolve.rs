//! TypePtr resolution shared by every walker.
//!
//! Each format exposes its type metadata as a [`TypeGraph`]: a handle maps to
//! one [`TypeNode`], a closed set of record kinds. [`resolve_type_ptr`] peels
//! qualifier nodes until it reaches a base or named type and records every
//! named class it lands on in the caller's [`DependentTypes`].

use std::collections::HashMap;
use std::hash::Hash;

use tracing::debug;

use crate::error::TypedigResult;
use crate::types::TypePtr;

/// Recursion guard for qualifier chains (and cyclic malformed input).
pub const MAX_TYPE_REF_DEPTH: usize = 32;

/// One layer of a type reference.
///
/// `None` targets mean `void` (a pointer without a pointee type, for example).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeNode<H>
{
    /// Built-in type such as `int` or `unsigned char`.
    Base(String),
    /// Class, struct, union or enum, referenced by name only.
    Named(String),
    Pointer(Option<H>),
    Reference(Option<H>),
    Const(Option<H>),
    Array
    {
        element: Option<H>,
        /// Element count, if the bound is known.
        length: Option<u64>,
    },
    /// A layer that carries no qualifier we model (volatile, restrict, ...).
    Transparent(Option<H>),
    /// Anything the walker cannot describe.
    Unknown,
}

/// A format's type metadata, addressed by handles.
pub trait TypeGraph
{
    type Handle: Copy + std::fmt::Debug;

    /// Read the node behind `handle`.
    fn node(&self, handle: Self::Handle) -> TypedigResult<TypeNode<Self::Handle>>;
}

impl<H> TypeGraph for HashMap<H, TypeNode<H>>
where
    H: Copy + Eq + Hash + std::fmt::Debug,
{
    type Handle = H;

    fn node(&self, handle: H) -> TypedigResult<TypeNode<H>>
    {
        Ok(self.get(&handle).cloned().unwrap_or(TypeNode::Unknown))
    }
}

/// Per-lookup accumulator of dependent class names.
///
/// One is created for every `get_type` call and threaded through the walk, so
/// concurrent lookups never share it.
#[derive(Debug, Clone, Default)]
pub struct DependentTypes
{
    names: Vec<String>,
}

impl DependentTypes
{
    pub fn new() -> Self
    {
        Self::default()
    }

    pub fn add(&mut self, name: impl Into<String>)
    {
        let name = name.into();
        if !name.is_empty() {
            self.names.push(name);
        }
    }

    /// Record the class named by `ty`, if any.
    pub fn add_from(&mut self, ty: &TypePtr)
    {
        if ty.is_dependent() {
            self.names.push(ty.base_name.clone());
        }
    }

    pub fn len(&self) -> usize
    {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.names.is_empty()
    }

    /// Sorted, deduplicated names.
    pub fn finish(mut self) -> Vec<String>
    {
        self.names.sort();
        self.names.dedup();
        self.names
    }
}

/// Resolve `handle` into a flattened qualifier chain.
pub fn resolve_type_ptr<G: TypeGraph>(graph: &G, handle: G::Handle, deps: &mut DependentTypes) -> TypePtr
{
    let mut ptr = TypePtr::default();
    resolve_layer(graph, Some(handle), &mut ptr, deps, 0);
    ptr
}

/// Like [`resolve_type_ptr`], with `None` meaning `void`.
pub fn resolve_optional<G: TypeGraph>(graph: &G, handle: Option<G::Handle>, deps: &mut DependentTypes) -> TypePtr
{
    let mut ptr = TypePtr::default();
    resolve_layer(graph, handle, &mut ptr, deps, 0);
    ptr
}

fn resolve_layer<G: TypeGraph>(
    graph: &G,
    handle: Option<G::Handle>,
    ptr: &mut TypePtr,
    deps: &mut DependentTypes,
    depth: usize,
)
{
    let Some(handle) = handle else {
        ptr.base_name = "void".to_string();
        ptr.is_base_type = true;
        return;
    };

    if depth >= MAX_TYPE_REF_DEPTH {
        debug!(?handle, "type reference chain too deep");
        mark_unknown(ptr);
        return;
    }

    let node = match graph.node(handle) {
        Ok(node) => node,
        Err(err) => {
            debug!(?handle, %err, "unreadable type reference");
            mark_unknown(ptr);
            return;
        }
    };

    match node {
        TypeNode::Base(name) => {
            ptr.base_name = name;
            ptr.is_base_type = true;
        }
        TypeNode::Named(name) => {
            deps.add(name.clone());
            ptr.base_name = name;
            ptr.is_base_type = false;
        }
        TypeNode::Pointer(next) => {
            ptr.is_pointer = true;
            resolve_layer(graph, next, ptr, deps, depth + 1);
        }
        TypeNode::Reference(next) => {
            ptr.is_reference = true;
            resolve_layer(graph, next, ptr, deps, depth + 1);
        }
        TypeNode::Const(next) => {
            ptr.is_constant = true;
            resolve_layer(graph, next, ptr, deps, depth + 1);
        }
        TypeNode::Array { element, length } => {
            // The outermost bound wins for multi-dimensional arrays.
            if !ptr.is_array {
                ptr.array_size = length.unwrap_or(0);
            }
            ptr.is_array = true;
            resolve_layer(graph, element, ptr, deps, depth + 1);
        }
        TypeNode::Transparent(next) => resolve_layer(graph, next, ptr, deps, depth + 1),
        TypeNode::Unknown => mark_unknown(ptr),
    }
}

fn mark_unknown(ptr: &mut TypePtr)
{
    let unknown = TypePtr::unknown();
    ptr.base_name = unknown.base_name;
    ptr.is_base_type = unknown.is_base_type;
}

#[cfg(test)]
mod tests
{
    use super::*;

    fn graph(nodes: &[(u32, TypeNode<u32>)]) -> HashMap<u32, TypeNode<u32>>
    {
        nodes.iter().cloned().collect()
    }

    #[test]
    fn test_pointer_to_const_array_of_int()
    {
        let graph = graph(&[
            (1, TypeNode::Pointer(Some(2))),
            (2, TypeNode::Const(Some(3))),
            (3, TypeNode::Array {
                element: Some(4),
                length: Some(8),
            }),
            (4, TypeNode::Base("int".to_string())),
        ]);
        let mut deps = DependentTypes::new();

        let ptr = resolve_type_ptr(&graph, 1, &mut deps);

        assert!(ptr.is_pointer);
        assert!(ptr.is_constant);
        assert!(ptr.is_array);
        assert!(!ptr.is_reference);
        assert_eq!(ptr.array_size, 8);
        assert_eq!(ptr.base_name, "int");
        assert!(ptr.is_base_type);
        assert!(deps.is_empty());
    }

    #[test]
    fn test_named_class_is_recorded_as_dependent()
    {
        let graph = graph(&[(7, TypeNode::Named("Bar".to_string()))]);
        let mut deps = DependentTypes::new();

        let ptr = resolve_type_ptr(&graph, 7, &mut deps);

        assert_eq!(ptr, TypePtr::named("Bar"));
        assert_eq!(deps.finish(), vec!["Bar".to_string()]);
    }

    #[test]
    fn test_array_without_bound_reports_zero()
    {
        let graph = graph(&[
            (1, TypeNode::Array {
                element: Some(2),
                length: None,
            }),
            (2, TypeNode::Base("char".to_string())),
        ]);
        let ptr = resolve_type_ptr(&graph, 1, &mut DependentTypes::new());
        assert!(ptr.is_array);
        assert_eq!(ptr.array_size, 0);
    }

    #[test]
    fn test_multi_level_pointers_flatten()
    {
        let graph = graph(&[
            (1, TypeNode::Pointer(Some(2))),
            (2, TypeNode::Pointer(Some(3))),
            (3, TypeNode::Base("int".to_string())),
        ]);
        let ptr = resolve_type_ptr(&graph, 1, &mut DependentTypes::new());
        assert_eq!(ptr, TypePtr::base("int").pointer());
    }

    #[test]
    fn test_void_pointer_and_cycles()
    {
        let graph = graph(&[
            (1, TypeNode::Pointer(None)),
            (2, TypeNode::Transparent(Some(3))),
            (3, TypeNode::Transparent(Some(2))),
        ]);
        let void_ptr = resolve_type_ptr(&graph, 1, &mut DependentTypes::new());
        assert_eq!(void_ptr, TypePtr::base("void").pointer());

        let looped = resolve_type_ptr(&graph, 2, &mut DependentTypes::new());
        assert_eq!(looped, TypePtr::unknown());
    }

    #[test]
    fn test_dependents_sorted_and_unique()
    {
        let mut deps = DependentTypes::new();
        for name in ["Zeta", "Alpha", "Zeta", "Zeta", "Alpha"] {
            deps.add(name);
        }
        deps.add("");
        assert_eq!(deps.finish(), vec!["Alpha".to_string(), "Zeta".to_string()]);
    }
}
