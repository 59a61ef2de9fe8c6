//! The reconstructed class/struct.

use super::{Field, Method};

/// A reconstructed class or struct.
///
/// A `Type` owns its fields, methods and nested types. Base classes are
/// name-only stubs (see [`Type::stub`]) and dependent types are plain names,
/// so the model is always a tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Type
{
    pub name: String,
    /// Base classes as stubs. Only the first one is meaningful downstream.
    pub base_types: Vec<Type>,
    /// Fields in declaration order.
    pub fields: Vec<Field>,
    /// Declared methods in declaration order, followed by newly discovered
    /// definitions.
    pub all_methods: Vec<Method>,
    /// Methods whose address was resolved by the merge step.
    pub fully_defined_methods: Vec<Method>,
    /// Sorted, deduplicated names of classes referenced by members.
    pub dependent_types: Vec<String>,
    /// Nested type definitions (PDB only).
    pub nested_types: Vec<Type>,
}

impl Type
{
    pub fn new(name: impl Into<String>) -> Self
    {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// A name-only stand-in for a base or dependent class.
    pub fn stub(name: impl Into<String>) -> Self
    {
        Self::new(name)
    }

    /// Whether only the name is populated.
    pub fn is_stub(&self) -> bool
    {
        self.base_types.is_empty()
            && self.fields.is_empty()
            && self.all_methods.is_empty()
            && self.nested_types.is_empty()
    }

    /// Name of the first base class, the only one renderers emit.
    pub fn primary_base(&self) -> Option<&str>
    {
        self.base_types.first().map(|base| base.name.as_str())
    }

    pub fn field(&self, name: &str) -> Option<&Field>
    {
        self.fields.iter().find(|field| field.name == name)
    }

    /// All methods called `name`, in model order.
    pub fn methods_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Method> + 'a
    {
        self.all_methods.iter().filter(move |method| method.name == name)
    }

    /// Last component of a qualified name (`Outer::Inner` → `Inner`).
    pub fn short_name(&self) -> &str
    {
        self.name.rsplit("::").next().unwrap_or(&self.name)
    }
}
