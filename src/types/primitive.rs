//! Primitive kinds and kind sets for the ambiguous type lattice.
//!
//! Register-based bytecode does not tag most values with a concrete type: a
//! 32-bit register may hold an `int`, a `float`, a `boolean` or an object
//! reference, and only the surrounding instructions disambiguate. The lattice
//! therefore tracks a *set* of still-admissible kinds per value and narrows it
//! by intersection as evidence accumulates. Object and array references are
//! members of the kind space for exactly this reason: a zero constant may turn
//! out to be `null`.

use bitflags::bitflags;
use strum::{EnumCount, EnumIter};

/// One concrete kind a register value can resolve to.
///
/// `Object` and `Array` stand for "some reference type" and "some array type";
/// the concrete class or element type lives in [`crate::types::ArgType`] once
/// known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, EnumCount)]
pub enum Kind {
    /// `boolean`
    Boolean,
    /// `char`
    Char,
    /// `byte`
    Byte,
    /// `short`
    Short,
    /// `int`
    Int,
    /// `float`
    Float,
    /// `long`
    Long,
    /// `double`
    Double,
    /// Any reference type.
    Object,
    /// Any array type.
    Array,
    /// `void`, only valid as a method return kind.
    Void,
}

impl Kind {
    /// Returns `true` for kinds stored in a single narrow register slot.
    #[must_use]
    pub const fn is_narrow(self) -> bool {
        !matches!(self, Kind::Long | Kind::Double | Kind::Void)
    }

    /// Returns `true` for the two 64-bit kinds.
    #[must_use]
    pub const fn is_wide(self) -> bool {
        matches!(self, Kind::Long | Kind::Double)
    }

    /// The Java source spelling of this kind.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Kind::Boolean => "boolean",
            Kind::Char => "char",
            Kind::Byte => "byte",
            Kind::Short => "short",
            Kind::Int => "int",
            Kind::Float => "float",
            Kind::Long => "long",
            Kind::Double => "double",
            Kind::Object => "object",
            Kind::Array => "array",
            Kind::Void => "void",
        }
    }
}

impl std::fmt::Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

bitflags! {
    /// A set of still-admissible [`Kind`]s for a not-yet-resolved value.
    ///
    /// Merging two sets is plain intersection; an empty intersection means the
    /// two values cannot be the same variable (a type conflict). `Void` is
    /// deliberately not part of any composite set.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct KindSet: u16 {
        /// `boolean` is admissible.
        const BOOLEAN = 1 << 0;
        /// `char` is admissible.
        const CHAR = 1 << 1;
        /// `byte` is admissible.
        const BYTE = 1 << 2;
        /// `short` is admissible.
        const SHORT = 1 << 3;
        /// `int` is admissible.
        const INT = 1 << 4;
        /// `float` is admissible.
        const FLOAT = 1 << 5;
        /// `long` is admissible.
        const LONG = 1 << 6;
        /// `double` is admissible.
        const DOUBLE = 1 << 7;
        /// Some reference type is admissible.
        const OBJECT = 1 << 8;
        /// Some array type is admissible.
        const ARRAY = 1 << 9;

        /// Every kind a register can hold: the completely unknown value.
        const ALL = Self::BOOLEAN.bits() | Self::CHAR.bits() | Self::BYTE.bits()
            | Self::SHORT.bits() | Self::INT.bits() | Self::FLOAT.bits()
            | Self::LONG.bits() | Self::DOUBLE.bits()
            | Self::OBJECT.bits() | Self::ARRAY.bits();

        /// Kinds that fit a single narrow register slot, references included.
        const NARROW = Self::BOOLEAN.bits() | Self::CHAR.bits() | Self::BYTE.bits()
            | Self::SHORT.bits() | Self::INT.bits() | Self::FLOAT.bits()
            | Self::OBJECT.bits() | Self::ARRAY.bits();

        /// Narrow value kinds without references: result of 32-bit arithmetic
        /// or comparison whose exact kind is still open.
        const NARROW_NUMBERS = Self::BOOLEAN.bits() | Self::CHAR.bits() | Self::BYTE.bits()
            | Self::SHORT.bits() | Self::INT.bits() | Self::FLOAT.bits();

        /// The two 64-bit kinds.
        const WIDE = Self::LONG.bits() | Self::DOUBLE.bits();

        /// Reference kinds only.
        const REFS = Self::OBJECT.bits() | Self::ARRAY.bits();
    }
}

impl KindSet {
    /// The singleton set for one kind.
    ///
    /// # Panics
    ///
    /// Panics on [`Kind::Void`], which has no set representation.
    #[must_use]
    pub fn of(kind: Kind) -> KindSet {
        match kind {
            Kind::Boolean => KindSet::BOOLEAN,
            Kind::Char => KindSet::CHAR,
            Kind::Byte => KindSet::BYTE,
            Kind::Short => KindSet::SHORT,
            Kind::Int => KindSet::INT,
            Kind::Float => KindSet::FLOAT,
            Kind::Long => KindSet::LONG,
            Kind::Double => KindSet::DOUBLE,
            Kind::Object => KindSet::OBJECT,
            Kind::Array => KindSet::ARRAY,
            Kind::Void => panic!("void has no kind-set representation"),
        }
    }

    /// The single kind left in this set, if exactly one remains.
    #[must_use]
    pub fn single(self) -> Option<Kind> {
        if self.bits().count_ones() != 1 {
            return None;
        }
        Some(match self {
            KindSet::BOOLEAN => Kind::Boolean,
            KindSet::CHAR => Kind::Char,
            KindSet::BYTE => Kind::Byte,
            KindSet::SHORT => Kind::Short,
            KindSet::INT => Kind::Int,
            KindSet::FLOAT => Kind::Float,
            KindSet::LONG => Kind::Long,
            KindSet::DOUBLE => Kind::Double,
            KindSet::OBJECT => Kind::Object,
            KindSet::ARRAY => Kind::Array,
            _ => unreachable!(),
        })
    }

    /// Preferred concrete kind when a set never narrows to one member.
    ///
    /// `int` wins among the numeric kinds, matching the default literal type
    /// of the source language. Reference bits take priority so a maybe-null
    /// value resolves to an object rather than a number.
    #[must_use]
    pub fn canonical(self) -> Option<Kind> {
        const ORDER: [(KindSet, Kind); 10] = [
            (KindSet::OBJECT, Kind::Object),
            (KindSet::ARRAY, Kind::Array),
            (KindSet::INT, Kind::Int),
            (KindSet::BOOLEAN, Kind::Boolean),
            (KindSet::BYTE, Kind::Byte),
            (KindSet::SHORT, Kind::Short),
            (KindSet::CHAR, Kind::Char),
            (KindSet::FLOAT, Kind::Float),
            (KindSet::LONG, Kind::Long),
            (KindSet::DOUBLE, Kind::Double),
        ];
        ORDER
            .iter()
            .find(|(bit, _)| self.contains(*bit))
            .map(|&(_, kind)| kind)
    }
}

impl std::fmt::Display for KindSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{")?;
        let mut first = true;
        for (set, kind) in [
            (KindSet::BOOLEAN, Kind::Boolean),
            (KindSet::CHAR, Kind::Char),
            (KindSet::BYTE, Kind::Byte),
            (KindSet::SHORT, Kind::Short),
            (KindSet::INT, Kind::Int),
            (KindSet::FLOAT, Kind::Float),
            (KindSet::LONG, Kind::Long),
            (KindSet::DOUBLE, Kind::Double),
            (KindSet::OBJECT, Kind::Object),
            (KindSet::ARRAY, Kind::Array),
        ] {
            if self.contains(set) {
                if !first {
                    write!(f, ", ")?;
                }
                write!(f, "{kind}")?;
                first = false;
            }
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn singleton_roundtrip() {
        for kind in Kind::iter() {
            if kind == Kind::Void {
                continue;
            }
            assert_eq!(KindSet::of(kind).single(), Some(kind));
        }
    }

    #[test]
    fn composite_sets_have_no_single() {
        assert_eq!(KindSet::NARROW.single(), None);
        assert_eq!(KindSet::WIDE.single(), None);
        assert_eq!(KindSet::empty().single(), None);
    }

    #[test]
    fn all_covers_every_kind() {
        for kind in Kind::iter() {
            if kind == Kind::Void {
                continue;
            }
            assert!(KindSet::ALL.contains(KindSet::of(kind)), "{kind} missing");
        }
    }

    #[test]
    fn canonical_prefers_refs_then_int() {
        assert_eq!(KindSet::ALL.canonical(), Some(Kind::Object));
        assert_eq!(KindSet::NARROW_NUMBERS.canonical(), Some(Kind::Int));
        assert_eq!(
            (KindSet::BOOLEAN | KindSet::CHAR).canonical(),
            Some(Kind::Boolean)
        );
        assert_eq!(KindSet::WIDE.canonical(), Some(Kind::Long));
        assert_eq!(KindSet::empty().canonical(), None);
    }

    #[test]
    fn display_lists_members() {
        let set = KindSet::INT | KindSet::FLOAT;
        assert_eq!(set.to_string(), "{int, float}");
    }
}
