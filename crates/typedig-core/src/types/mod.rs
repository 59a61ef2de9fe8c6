//! # Types
//!
//! The normalized model every walker populates.
//!
//! Ownership is strictly tree-shaped: a [`Type`] owns its fields and methods,
//! methods own their arguments, and references to other classes (bases,
//! dependents) are by name only.

pub mod class;
pub mod member;
pub mod type_ptr;

// Re-export all public types
pub use class::Type;
pub use member::{strip_self_arg, synthetic_arg_name, Accessibility, Argument, CallingConvention, Field, Method};
pub use type_ptr::TypePtr;
