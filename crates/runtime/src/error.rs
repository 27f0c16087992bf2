//! Runtime errors
//!
//! Every failure of the invocation engine surfaces as a `RuntimeError`
//! returned through `Result`. There is no out-of-band error state: a failed
//! inner call unwinds the native call chain with `?`, and the frame guards
//! restore every outer frame on the way out.

use itembridge_core::{ErrorObject, ItemError, Kind, Symbol};
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeError {
    /// No symbol with this name
    SymbolNotFound(String),
    /// Handle that does not belong to this symbol table
    InvalidSymbol(Symbol),
    /// Symbol exists but names a message or class member, not a function
    NotAFunction(String),
    /// A native was called with fewer parameters than it needs
    ArityMismatch {
        name: String,
        expected: usize,
        found: usize,
    },
    CallDepthExceeded {
        limit: usize,
    },
    Item(ItemError),
    TypeMismatch {
        expected: Kind,
        found: Kind,
    },
    /// A severe error object no handler resolved
    Unhandled(Box<ErrorObject>),
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeError::SymbolNotFound(name) => write!(f, "symbol not found: {}", name),
            RuntimeError::InvalidSymbol(sym) => write!(f, "invalid symbol handle {}", sym),
            RuntimeError::NotAFunction(name) => {
                write!(f, "{} is a message, not a function", name)
            }
            RuntimeError::ArityMismatch {
                name,
                expected,
                found,
            } => write!(
                f,
                "{}: expected at least {} parameters, got {}",
                name, expected, found
            ),
            RuntimeError::CallDepthExceeded { limit } => {
                write!(f, "call depth limit of {} exceeded", limit)
            }
            RuntimeError::Item(e) => write!(f, "{}", e),
            RuntimeError::TypeMismatch { expected, found } => {
                write!(f, "type mismatch: expected {}, found {}", expected, found)
            }
            RuntimeError::Unhandled(err) => write!(f, "unhandled error: {}", err),
        }
    }
}

impl std::error::Error for RuntimeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RuntimeError::Item(e) => Some(e),
            RuntimeError::Unhandled(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

impl From<ItemError> for RuntimeError {
    fn from(e: ItemError) -> Self {
        RuntimeError::Item(e)
    }
}

impl From<ErrorObject> for RuntimeError {
    fn from(e: ErrorObject) -> Self {
        RuntimeError::Unhandled(Box::new(e))
    }
}
