//! Symbol handles
//!
//! A `Symbol` identifies an invocable target (function, method, block code)
//! in the runtime's symbol table. It lives in the core crate because block
//! items carry the symbol of their code.

use std::fmt;

/// Opaque handle of a symbol table entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(u32);

impl Symbol {
    pub const fn from_index(index: u32) -> Self {
        Symbol(index)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
