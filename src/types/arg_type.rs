//! The type lattice over register values.
//!
//! [`ArgType`] ranges from a fully unknown set of primitive kinds, through
//! narrowed kind sets, down to concrete primitives and fully resolved
//! object, array and generic types. Inference walks this lattice strictly
//! downwards: [`ArgType::merge`] only ever produces a type at least as
//! specific as both inputs, which is what guarantees the fixed point in
//! [`crate::typeinf`] terminates.

use crate::types::{classpath::TypeHierarchy, Kind, KindSet, OBJECT_CLASS};

/// A type bound for one register value.
///
/// The lattice ordering, from least to most specific:
///
/// 1. [`ArgType::Unknown`] with many admissible kinds,
/// 2. [`ArgType::Unknown`] with fewer kinds,
/// 3. concrete types: [`ArgType::Primitive`], [`ArgType::Object`],
///    [`ArgType::Array`], [`ArgType::Generic`].
///
/// # Merge semantics
///
/// [`ArgType::merge`] is commutative and idempotent. Kind sets merge by
/// intersection and an empty intersection is a conflict (`None`). Two
/// resolved object types merge to their nearest common ancestor in the
/// classpath hierarchy, falling back to `java.lang.Object` when unrelated.
/// A primitive never merges with a reference type.
///
/// # Examples
///
/// ```rust,ignore
/// use codelift::types::{ArgType, ClasspathBuilder};
///
/// let clsp = ClasspathBuilder::new().build();
/// let narrow = ArgType::NARROW_NUMBERS;
/// let merged = narrow.merge(&ArgType::INT, &clsp);
/// assert_eq!(merged, Some(ArgType::INT));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ArgType {
    /// Not yet resolved; any kind in the set is still admissible.
    Unknown(KindSet),
    /// A concrete primitive type.
    Primitive(Kind),
    /// A resolved object type, by fully qualified class name.
    Object(String),
    /// An array with the given element type.
    Array(Box<ArgType>),
    /// A generic object type with resolved type arguments.
    Generic {
        /// Fully qualified name of the base class.
        object: String,
        /// Type arguments, in declaration order.
        args: Vec<ArgType>,
    },
}

impl ArgType {
    /// Completely unknown value.
    pub const UNKNOWN: ArgType = ArgType::Unknown(KindSet::ALL);
    /// Unknown value in a narrow register slot, references included.
    pub const NARROW: ArgType = ArgType::Unknown(KindSet::NARROW);
    /// Unknown narrow value that is not a reference.
    pub const NARROW_NUMBERS: ArgType = ArgType::Unknown(KindSet::NARROW_NUMBERS);
    /// Unknown 64-bit value.
    pub const WIDE: ArgType = ArgType::Unknown(KindSet::WIDE);
    /// Some reference type, class not yet known.
    pub const UNKNOWN_OBJECT: ArgType = ArgType::Unknown(KindSet::REFS);

    /// `int`
    pub const INT: ArgType = ArgType::Primitive(Kind::Int);
    /// `boolean`
    pub const BOOLEAN: ArgType = ArgType::Primitive(Kind::Boolean);
    /// `byte`
    pub const BYTE: ArgType = ArgType::Primitive(Kind::Byte);
    /// `short`
    pub const SHORT: ArgType = ArgType::Primitive(Kind::Short);
    /// `char`
    pub const CHAR: ArgType = ArgType::Primitive(Kind::Char);
    /// `float`
    pub const FLOAT: ArgType = ArgType::Primitive(Kind::Float);
    /// `long`
    pub const LONG: ArgType = ArgType::Primitive(Kind::Long);
    /// `double`
    pub const DOUBLE: ArgType = ArgType::Primitive(Kind::Double);
    /// `void`, only meaningful as a return type.
    pub const VOID: ArgType = ArgType::Primitive(Kind::Void);

    /// A resolved object type.
    #[must_use]
    pub fn object(name: impl Into<String>) -> ArgType {
        ArgType::Object(name.into())
    }

    /// An array of `element`.
    #[must_use]
    pub fn array(element: ArgType) -> ArgType {
        ArgType::Array(Box::new(element))
    }

    /// A generic object type with type arguments.
    #[must_use]
    pub fn generic(object: impl Into<String>, args: Vec<ArgType>) -> ArgType {
        ArgType::Generic {
            object: object.into(),
            args,
        }
    }

    /// Returns `true` while the value has more than one admissible shape.
    #[must_use]
    pub fn is_unknown(&self) -> bool {
        matches!(self, ArgType::Unknown(_))
    }

    /// Returns `true` for a concrete primitive.
    #[must_use]
    pub fn is_primitive(&self) -> bool {
        matches!(self, ArgType::Primitive(_))
    }

    /// Returns `true` for resolved object and generic types.
    #[must_use]
    pub fn is_object(&self) -> bool {
        matches!(self, ArgType::Object(_) | ArgType::Generic { .. })
    }

    /// Returns `true` for array types.
    #[must_use]
    pub fn is_array(&self) -> bool {
        matches!(self, ArgType::Array(_))
    }

    /// Returns `true` when the type is fully resolved, arrays recursively.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        match self {
            ArgType::Unknown(_) => false,
            ArgType::Primitive(_) | ArgType::Object(_) | ArgType::Generic { .. } => true,
            ArgType::Array(element) => element.is_resolved(),
        }
    }

    /// Returns `true` when the value occupies a 64-bit slot.
    #[must_use]
    pub fn is_wide(&self) -> bool {
        match self {
            ArgType::Primitive(kind) => kind.is_wide(),
            ArgType::Unknown(set) => !set.is_empty() && KindSet::WIDE.contains(*set),
            _ => false,
        }
    }

    /// The set of kinds this type still admits.
    #[must_use]
    pub fn kind_set(&self) -> KindSet {
        match self {
            ArgType::Unknown(set) => *set,
            ArgType::Primitive(Kind::Void) => KindSet::empty(),
            ArgType::Primitive(kind) => KindSet::of(*kind),
            ArgType::Object(_) | ArgType::Generic { .. } => KindSet::OBJECT,
            ArgType::Array(_) => KindSet::ARRAY,
        }
    }

    /// Returns `true` when `kind` is still admissible for this type.
    #[must_use]
    pub fn contains_kind(&self, kind: Kind) -> bool {
        self.kind_set().contains(KindSet::of(kind))
    }

    /// The base class name for object and generic types.
    #[must_use]
    pub fn object_name(&self) -> Option<&str> {
        match self {
            ArgType::Object(name) => Some(name),
            ArgType::Generic { object, .. } => Some(object),
            _ => None,
        }
    }

    /// Merges two type bounds into their most specific common bound.
    ///
    /// Returns `None` when the bounds conflict: disjoint kind sets, a
    /// primitive against a reference, or incompatible array/generic shapes.
    /// Callers treat `None` as a per-variable conflict, not a hard failure.
    ///
    /// The operation is commutative and idempotent, and monotone with
    /// respect to the lattice order: repeated merges of the same inputs
    /// never move back towards "less specific".
    ///
    /// # Arguments
    ///
    /// * `other` - The bound to merge with
    /// * `clsp` - Classpath hierarchy for nearest-common-ancestor queries
    #[must_use]
    pub fn merge(&self, other: &ArgType, clsp: &dyn TypeHierarchy) -> Option<ArgType> {
        if self == other {
            return Some(self.clone());
        }
        match (self, other) {
            (ArgType::Unknown(a), ArgType::Unknown(b)) => {
                let joined = *a & *b;
                if joined.is_empty() {
                    return None;
                }
                // A singleton value kind is a resolved primitive; singleton
                // reference bits stay unknown until a class is seen.
                match joined.single() {
                    Some(kind) if !matches!(kind, Kind::Object | Kind::Array) => {
                        Some(ArgType::Primitive(kind))
                    }
                    _ => Some(ArgType::Unknown(joined)),
                }
            }
            (ArgType::Unknown(set), concrete) | (concrete, ArgType::Unknown(set)) => {
                match concrete {
                    ArgType::Primitive(kind) => {
                        if *kind != Kind::Void && set.contains(KindSet::of(*kind)) {
                            Some(concrete.clone())
                        } else {
                            None
                        }
                    }
                    ArgType::Object(_) | ArgType::Generic { .. } => {
                        if set.contains(KindSet::OBJECT) {
                            Some(concrete.clone())
                        } else {
                            None
                        }
                    }
                    ArgType::Array(_) => {
                        if set.intersects(KindSet::REFS) {
                            Some(concrete.clone())
                        } else {
                            None
                        }
                    }
                    ArgType::Unknown(_) => unreachable!("handled above"),
                }
            }
            (ArgType::Primitive(a), ArgType::Primitive(b)) => {
                if a == b {
                    Some(self.clone())
                } else {
                    None
                }
            }
            (ArgType::Primitive(_), _) | (_, ArgType::Primitive(_)) => None,
            (ArgType::Object(a), ArgType::Object(b)) => Some(merge_objects(a, b, None, clsp)),
            (ArgType::Object(name), generic @ ArgType::Generic { object, .. })
            | (generic @ ArgType::Generic { object, .. }, ArgType::Object(name)) => {
                Some(merge_objects(name, object, Some(generic), clsp))
            }
            (
                ArgType::Generic { object: a, args: xs },
                ArgType::Generic { object: b, args: ys },
            ) => {
                if a == b {
                    if xs.len() != ys.len() {
                        return None;
                    }
                    let mut merged = Vec::with_capacity(xs.len());
                    for (x, y) in xs.iter().zip(ys) {
                        merged.push(x.merge(y, clsp)?);
                    }
                    Some(ArgType::generic(a.clone(), merged))
                } else {
                    Some(ArgType::object(
                        clsp.common_ancestor(a, b)
                            .unwrap_or_else(|| OBJECT_CLASS.to_string()),
                    ))
                }
            }
            (ArgType::Array(a), ArgType::Array(b)) => {
                let element = a.merge(b, clsp)?;
                Some(ArgType::array(element))
            }
            (ArgType::Array(_), obj) | (obj, ArgType::Array(_)) => {
                // Arrays only share java.lang.Object with non-array references.
                if obj.object_name() == Some(OBJECT_CLASS) {
                    Some(ArgType::object(OBJECT_CLASS))
                } else {
                    None
                }
            }
        }
    }

    /// Returns `true` when the two bounds can describe the same value.
    #[must_use]
    pub fn is_compatible(&self, other: &ArgType, clsp: &dyn TypeHierarchy) -> bool {
        self.merge(other, clsp).is_some()
    }

    /// Collapses a still-unknown bound to its best concrete pick.
    ///
    /// Used after inference reaches its fixed point without fully resolving
    /// a variable: code generation needs *a* type, so the remaining kind set
    /// resolves to its canonical member and reference bits resolve to
    /// `java.lang.Object`. Resolved types are returned unchanged.
    #[must_use]
    pub fn select_canonical(&self) -> ArgType {
        match self {
            ArgType::Unknown(set) => match set.canonical() {
                Some(Kind::Object) => ArgType::object(OBJECT_CLASS),
                Some(Kind::Array) => ArgType::array(ArgType::object(OBJECT_CLASS)),
                Some(kind) => ArgType::Primitive(kind),
                None => ArgType::object(OBJECT_CLASS),
            },
            ArgType::Array(element) => ArgType::array(element.select_canonical()),
            resolved => resolved.clone(),
        }
    }
}

/// Merge of two resolved class names, preferring generic information when
/// one side carries it and the bases agree.
fn merge_objects(
    a: &str,
    b: &str,
    generic: Option<&ArgType>,
    clsp: &dyn TypeHierarchy,
) -> ArgType {
    if a == b {
        return generic.cloned().unwrap_or_else(|| ArgType::object(a));
    }
    if a == OBJECT_CLASS {
        return generic
            .filter(|g| g.object_name() == Some(b))
            .cloned()
            .unwrap_or_else(|| ArgType::object(b));
    }
    if b == OBJECT_CLASS {
        return generic
            .filter(|g| g.object_name() == Some(a))
            .cloned()
            .unwrap_or_else(|| ArgType::object(a));
    }
    ArgType::object(
        clsp.common_ancestor(a, b)
            .unwrap_or_else(|| OBJECT_CLASS.to_string()),
    )
}

impl std::fmt::Display for ArgType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArgType::Unknown(set) if *set == KindSet::ALL => write!(f, "?"),
            ArgType::Unknown(set) => write!(f, "?{set}"),
            ArgType::Primitive(kind) => write!(f, "{kind}"),
            ArgType::Object(name) => f.write_str(name),
            ArgType::Array(element) => write!(f, "{element}[]"),
            ArgType::Generic { object, args } => {
                write!(f, "{object}<")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ">")
            }
        }
    }
}
