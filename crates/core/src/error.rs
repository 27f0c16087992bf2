//! Item layer errors
//!
//! Only structural failures live here: out-of-range positions and unusable
//! hash keys. A dead by-reference cell reads as NIL rather than failing. A
//! parameter of the wrong kind is not an error at this layer; accessors
//! report it as `None`.

use crate::kind::Kind;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemError {
    /// 1-based position outside `1..=len`
    OutOfBounds { index: usize, len: usize },
    /// Hash keys must be strings, numbers, dates or pointers
    InvalidHashKey(Kind),
}

impl fmt::Display for ItemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemError::OutOfBounds { index, len } => {
                write!(f, "bound error: index {} outside 1..={}", index, len)
            }
            ItemError::InvalidHashKey(kind) => {
                write!(f, "invalid hash key: {} cannot be used as a key", kind)
            }
        }
    }
}

impl std::error::Error for ItemError {}

pub type ItemResult<T> = Result<T, ItemError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = ItemError::OutOfBounds { index: 4, len: 3 };
        assert_eq!(err.to_string(), "bound error: index 4 outside 1..=3");
        let err = ItemError::InvalidHashKey(Kind::Array);
        assert!(err.to_string().starts_with("invalid hash key"));
    }
}
