//! Item kinds and type masks
//!
//! `Kind` is the discriminant of an [`Item`](crate::Item). `TypeMask` is the
//! set form used by parameter requests: a native asks for "parameter 2 as a
//! numeric" with `TypeMask::NUMERIC` and gets the item back only when its
//! kind is in the mask.

use bitflags::bitflags;
use std::fmt;

/// Discriminant of an item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Kind {
    Nil,
    Logical,
    /// 32-bit integer (fixed width class)
    Integer,
    /// 64-bit integer (wide class)
    Long,
    Double,
    Date,
    String,
    Array,
    Hash,
    Object,
    Block,
    Pointer,
    ByRef,
}

impl Kind {
    /// The single-letter type code the VM reports for this kind
    ///
    /// Both integer widths and doubles report `N`; a by-reference cell
    /// has no letter of its own and reports `U`.
    pub fn letter(self) -> &'static str {
        match self {
            Kind::Nil | Kind::ByRef => "U",
            Kind::Logical => "L",
            Kind::Integer | Kind::Long | Kind::Double => "N",
            Kind::Date => "D",
            Kind::String => "C",
            Kind::Array => "A",
            Kind::Hash => "H",
            Kind::Object => "O",
            Kind::Block => "B",
            Kind::Pointer => "P",
        }
    }

    /// The mask bit for this kind
    pub fn mask(self) -> TypeMask {
        match self {
            Kind::Nil => TypeMask::NIL,
            Kind::Logical => TypeMask::LOGICAL,
            Kind::Integer => TypeMask::INTEGER,
            Kind::Long => TypeMask::LONG,
            Kind::Double => TypeMask::DOUBLE,
            Kind::Date => TypeMask::DATE,
            Kind::String => TypeMask::STRING,
            Kind::Array => TypeMask::ARRAY,
            Kind::Hash => TypeMask::HASH,
            Kind::Object => TypeMask::OBJECT,
            Kind::Block => TypeMask::BLOCK,
            Kind::Pointer => TypeMask::POINTER,
            Kind::ByRef => TypeMask::BYREF,
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, Kind::Integer | Kind::Long | Kind::Double)
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Kind::Nil => "nil",
            Kind::Logical => "logical",
            Kind::Integer => "integer",
            Kind::Long => "long",
            Kind::Double => "double",
            Kind::Date => "date",
            Kind::String => "string",
            Kind::Array => "array",
            Kind::Hash => "hash",
            Kind::Object => "object",
            Kind::Block => "block",
            Kind::Pointer => "pointer",
            Kind::ByRef => "byref",
        };
        f.write_str(name)
    }
}

bitflags! {
    /// Set of kinds accepted by a parameter request
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TypeMask: u32 {
        const NIL = 1 << 0;
        const LOGICAL = 1 << 1;
        const INTEGER = 1 << 2;
        const LONG = 1 << 3;
        const DOUBLE = 1 << 4;
        const DATE = 1 << 5;
        const STRING = 1 << 6;
        const ARRAY = 1 << 7;
        const HASH = 1 << 8;
        const OBJECT = 1 << 9;
        const BLOCK = 1 << 10;
        const POINTER = 1 << 11;
        const BYREF = 1 << 12;

        const NUMINT = Self::INTEGER.bits() | Self::LONG.bits();
        const NUMERIC = Self::NUMINT.bits() | Self::DOUBLE.bits();
        /// Every kind except by-reference cells
        const ANY = Self::NIL.bits()
            | Self::LOGICAL.bits()
            | Self::NUMERIC.bits()
            | Self::DATE.bits()
            | Self::STRING.bits()
            | Self::ARRAY.bits()
            | Self::HASH.bits()
            | Self::OBJECT.bits()
            | Self::BLOCK.bits()
            | Self::POINTER.bits();
    }
}

impl TypeMask {
    pub fn accepts(self, kind: Kind) -> bool {
        self.contains(kind.mask())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_mask_accepts_both_widths_and_double() {
        assert!(TypeMask::NUMERIC.accepts(Kind::Integer));
        assert!(TypeMask::NUMERIC.accepts(Kind::Long));
        assert!(TypeMask::NUMERIC.accepts(Kind::Double));
        assert!(!TypeMask::NUMERIC.accepts(Kind::String));
        assert!(!TypeMask::NUMINT.accepts(Kind::Double));
    }

    #[test]
    fn test_any_excludes_byref() {
        assert!(TypeMask::ANY.accepts(Kind::Nil));
        assert!(TypeMask::ANY.accepts(Kind::Block));
        assert!(!TypeMask::ANY.accepts(Kind::ByRef));
    }

    #[test]
    fn test_letters() {
        assert_eq!(Kind::Long.letter(), "N");
        assert_eq!(Kind::String.letter(), "C");
        assert_eq!(Kind::Nil.letter(), "U");
        assert_eq!(Kind::Hash.letter(), "H");
    }
}
