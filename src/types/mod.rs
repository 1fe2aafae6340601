//! Type lattice and classpath hierarchy.
//!
//! Everything type inference knows about a value is expressed as an
//! [`ArgType`]: a point in a lattice that starts at "any kind at all" and
//! narrows towards concrete primitives, classes, arrays and generics. The
//! lattice operations live on [`ArgType`] itself; hierarchy questions about
//! resolved classes are answered by the shared, immutable [`ClasspathIndex`]
//! behind the [`TypeHierarchy`] trait.
//!
//! # Key Types
//!
//! - [`ArgType`] - A type bound with monotone [`ArgType::merge`]
//! - [`Kind`] / [`KindSet`] - Primitive kinds and admissible-kind sets
//! - [`ClasspathBuilder`] / [`ClasspathIndex`] - Build-once, share-everywhere
//!   class hierarchy
//! - [`TypeHierarchy`] - The seam tests can stub

mod arg_type;
mod classpath;
mod primitive;

pub use arg_type::ArgType;
pub use classpath::{ClasspathBuilder, ClasspathIndex, TypeHierarchy};
pub use primitive::{Kind, KindSet};

/// Fully qualified name of the root class.
pub const OBJECT_CLASS: &str = "java.lang.Object";
/// Fully qualified name of the string class.
pub const STRING_CLASS: &str = "java.lang.String";
/// Fully qualified name of the class type.
pub const CLASS_CLASS: &str = "java.lang.Class";
/// Fully qualified name of the throwable root.
pub const THROWABLE_CLASS: &str = "java.lang.Throwable";
