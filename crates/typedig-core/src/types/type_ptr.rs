//! Qualifier chain over a base type name.

use std::fmt;

/// A resolved reference to a type: a base name plus the qualifiers found on
/// the way to it.
///
/// Qualifiers are flattened into single booleans, so `int**` and `int*` both
/// resolve to `is_pointer = true`. A `TypePtr` never points at another
/// [`Type`](super::Type); it only carries the name, which keeps the model
/// acyclic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct TypePtr
{
    /// Name of the innermost type (`int`, `Shape`, `std::string`).
    ///
    /// An empty name means "no type" and is used for constructor and
    /// destructor return types.
    pub base_name: String,
    pub is_pointer: bool,
    pub is_reference: bool,
    pub is_constant: bool,
    pub is_array: bool,
    /// Element count when `is_array` is set, 0 when the bound is unknown.
    pub array_size: u64,
    /// `true` for built-in types, `false` for a dependent class reference.
    pub is_base_type: bool,
}

impl TypePtr
{
    /// Built-in type with no qualifiers.
    pub fn base(name: impl Into<String>) -> Self
    {
        Self {
            base_name: name.into(),
            is_base_type: true,
            ..Self::default()
        }
    }

    /// Unqualified reference to a named class/struct/enum.
    pub fn named(name: impl Into<String>) -> Self
    {
        Self {
            base_name: name.into(),
            ..Self::default()
        }
    }

    /// The empty return type of constructors and destructors.
    pub fn none() -> Self
    {
        Self::default()
    }

    /// Placeholder for a type reference that could not be resolved.
    pub fn unknown() -> Self
    {
        Self::base("unknown")
    }

    pub fn pointer(mut self) -> Self
    {
        self.is_pointer = true;
        self
    }

    pub fn reference(mut self) -> Self
    {
        self.is_reference = true;
        self
    }

    pub fn constant(mut self) -> Self
    {
        self.is_constant = true;
        self
    }

    pub fn array(mut self, size: u64) -> Self
    {
        self.is_array = true;
        self.array_size = size;
        self
    }

    /// `true` for the empty constructor/destructor return type.
    pub fn is_none(&self) -> bool
    {
        self.base_name.is_empty()
    }

    /// Whether this reference names a class that a renderer must declare.
    pub fn is_dependent(&self) -> bool
    {
        !self.is_base_type && !self.base_name.is_empty()
    }
}

impl fmt::Display for TypePtr
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        if self.is_constant {
            write!(f, "const ")?;
        }
        write!(f, "{}", self.base_name)?;
        if self.is_pointer {
            write!(f, "*")?;
        }
        if self.is_reference {
            write!(f, "&")?;
        }
        if self.is_array {
            if self.array_size > 0 {
                write!(f, "[{}]", self.array_size)?;
            } else {
                write!(f, "[]")?;
            }
        }
        Ok(())
    }
}
