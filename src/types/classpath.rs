//! Classpath type-hierarchy index.
//!
//! Object-type merges need to answer "is X a subtype of Y" and "what is the
//! nearest common supertype of X and Y". Those answers come from a classpath
//! index built once by the embedding front-end and then shared read-only
//! across every parallel pipeline invocation.
//!
//! Classes never registered with the builder are treated as direct subclasses
//! of `java.lang.Object`: an incomplete classpath degrades merge precision,
//! never correctness.

use std::collections::{HashSet, VecDeque};

use dashmap::{mapref::entry::Entry, DashMap};

use crate::types::OBJECT_CLASS;

/// Hierarchy queries needed by [`crate::types::ArgType::merge`].
///
/// [`ClasspathIndex`] is the production implementation; tests may substitute
/// a stub.
pub trait TypeHierarchy: Sync {
    /// Returns `true` when `sub` is `sup` or a transitive subtype of it.
    fn is_subtype(&self, sub: &str, sup: &str) -> bool;

    /// Nearest common supertype of `a` and `b`.
    ///
    /// Returns `None` only when the implementation cannot produce any
    /// answer; `java.lang.Object` is the expected fallback for unrelated
    /// types.
    fn common_ancestor(&self, a: &str, b: &str) -> Option<String>;
}

/// Supertype links for one registered class.
#[derive(Debug, Clone)]
struct ClassEntry {
    superclass: Option<String>,
    interfaces: Vec<String>,
}

/// Collects class hierarchy declarations before the index is frozen.
///
/// Registration is safe from multiple threads so a front-end can feed the
/// builder while parsing class files in parallel. [`ClasspathBuilder::build`]
/// consumes the builder and produces the immutable [`ClasspathIndex`].
///
/// # Examples
///
/// ```rust,ignore
/// use codelift::types::ClasspathBuilder;
///
/// let builder = ClasspathBuilder::new();
/// builder.add_class("java.lang.Exception", Some("java.lang.Throwable"), &[]);
/// builder.add_class("java.io.IOException", Some("java.lang.Exception"), &[]);
/// let clsp = builder.build();
/// assert!(clsp.is_subtype("java.io.IOException", "java.lang.Throwable"));
/// ```
#[derive(Debug, Default)]
pub struct ClasspathBuilder {
    classes: DashMap<String, ClassEntry>,
}

impl ClasspathBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        ClasspathBuilder {
            classes: DashMap::new(),
        }
    }

    /// Registers a class with its direct superclass and interfaces.
    ///
    /// A `superclass` of `None` means the class extends `java.lang.Object`
    /// directly (or is an interface). The first registration of a name wins;
    /// returns `false` when the name was already present.
    pub fn add_class(
        &self,
        name: impl Into<String>,
        superclass: Option<&str>,
        interfaces: &[&str],
    ) -> bool {
        let name = name.into();
        if name == OBJECT_CLASS {
            return false;
        }
        let entry = ClassEntry {
            superclass: superclass.map(str::to_string),
            interfaces: interfaces.iter().map(|i| (*i).to_string()).collect(),
        };
        match self.classes.entry(name) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(entry);
                true
            }
        }
    }

    /// Number of classes registered so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Returns `true` if no class has been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Freezes the collected declarations into a shareable index.
    #[must_use]
    pub fn build(self) -> ClasspathIndex {
        ClasspathIndex {
            classes: self.classes,
        }
    }
}

/// Immutable classpath hierarchy, shared read-only across pipeline runs.
///
/// Built once via [`ClasspathBuilder`]; exposes no mutation. All queries
/// tolerate cycles in malformed hierarchies by tracking visited classes.
#[derive(Debug, Default)]
pub struct ClasspathIndex {
    classes: DashMap<String, ClassEntry>,
}

impl ClasspathIndex {
    /// An index with no registered classes.
    ///
    /// Every object merge then falls back to `java.lang.Object`, which is a
    /// valid (if imprecise) hierarchy.
    #[must_use]
    pub fn empty() -> Self {
        ClasspathIndex::default()
    }

    /// Number of registered classes.
    #[must_use]
    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    /// Returns `true` when `name` was registered with the builder.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        name == OBJECT_CLASS || self.classes.contains_key(name)
    }

    /// Direct superclass of `name`, defaulting to `java.lang.Object`.
    ///
    /// Returns `None` for `java.lang.Object` itself.
    #[must_use]
    pub fn superclass(&self, name: &str) -> Option<String> {
        if name == OBJECT_CLASS {
            return None;
        }
        match self.classes.get(name) {
            Some(entry) => Some(
                entry
                    .superclass
                    .clone()
                    .unwrap_or_else(|| OBJECT_CLASS.to_string()),
            ),
            None => Some(OBJECT_CLASS.to_string()),
        }
    }

    /// Direct supertypes of `name`: superclass first, then interfaces.
    fn direct_supers(&self, name: &str) -> Vec<String> {
        if name == OBJECT_CLASS {
            return Vec::new();
        }
        match self.classes.get(name) {
            Some(entry) => {
                let mut supers = Vec::with_capacity(1 + entry.interfaces.len());
                supers.push(
                    entry
                        .superclass
                        .clone()
                        .unwrap_or_else(|| OBJECT_CLASS.to_string()),
                );
                supers.extend(entry.interfaces.iter().cloned());
                supers
            }
            None => vec![OBJECT_CLASS.to_string()],
        }
    }

    /// Every transitive supertype of `name`, including `name` itself.
    fn ancestor_set(&self, name: &str) -> HashSet<String> {
        let mut seen = HashSet::new();
        let mut queue = VecDeque::new();
        seen.insert(name.to_string());
        queue.push_back(name.to_string());
        while let Some(current) = queue.pop_front() {
            for sup in self.direct_supers(&current) {
                if seen.insert(sup.clone()) {
                    queue.push_back(sup);
                }
            }
        }
        seen
    }
}

impl TypeHierarchy for ClasspathIndex {
    fn is_subtype(&self, sub: &str, sup: &str) -> bool {
        if sub == sup || sup == OBJECT_CLASS {
            return true;
        }
        let mut seen = HashSet::new();
        let mut queue = VecDeque::new();
        seen.insert(sub.to_string());
        queue.push_back(sub.to_string());
        while let Some(current) = queue.pop_front() {
            for parent in self.direct_supers(&current) {
                if parent == sup {
                    return true;
                }
                if seen.insert(parent.clone()) {
                    queue.push_back(parent);
                }
            }
        }
        false
    }

    fn common_ancestor(&self, a: &str, b: &str) -> Option<String> {
        if a == b {
            return Some(a.to_string());
        }
        if a == OBJECT_CLASS || b == OBJECT_CLASS {
            return Some(OBJECT_CLASS.to_string());
        }
        let ancestors = self.ancestor_set(a);
        // Breadth-first from b: the first hit is the nearest supertype,
        // with superclasses ranked before interfaces within a layer.
        let mut seen = HashSet::new();
        let mut queue = VecDeque::new();
        seen.insert(b.to_string());
        queue.push_back(b.to_string());
        while let Some(current) = queue.pop_front() {
            if ancestors.contains(&current) {
                return Some(current);
            }
            for parent in self.direct_supers(&current) {
                if seen.insert(parent.clone()) {
                    queue.push_back(parent);
                }
            }
        }
        Some(OBJECT_CLASS.to_string())
    }
}
