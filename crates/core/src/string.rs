//! Length-carrying byte strings
//!
//! The VM's strings are byte buffers with an explicit length. They are not
//! required to be valid UTF-8 and may contain NUL bytes, so `ItemString`
//! wraps a `Vec<u8>` rather than a `String`.

use std::borrow::Cow;
use std::fmt;

/// String payload of an item
#[derive(Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemString {
    bytes: Vec<u8>,
}

impl ItemString {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Text view, replacing invalid UTF-8 sequences
    pub fn to_str_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes)
    }

    /// Bytes up to the first NUL
    ///
    /// Only for legacy interop that treats strings as NUL-terminated; every
    /// other operation uses the explicit length.
    pub fn c_str(&self) -> &[u8] {
        match self.bytes.iter().position(|&b| b == 0) {
            Some(end) => &self.bytes[..end],
            None => &self.bytes,
        }
    }

    /// ASCII upper-case copy (the VM's case folding for names and hash keys)
    pub fn to_ascii_uppercase(&self) -> ItemString {
        ItemString {
            bytes: self.bytes.to_ascii_uppercase(),
        }
    }

    pub fn push_bytes(&mut self, bytes: &[u8]) {
        self.bytes.extend_from_slice(bytes);
    }
}

impl fmt::Debug for ItemString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.to_str_lossy())
    }
}

impl fmt::Display for ItemString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_str_lossy())
    }
}

impl From<&str> for ItemString {
    fn from(s: &str) -> Self {
        Self::from_bytes(s.as_bytes())
    }
}

impl From<String> for ItemString {
    fn from(s: String) -> Self {
        Self::from_bytes(s.into_bytes())
    }
}

impl From<&[u8]> for ItemString {
    fn from(b: &[u8]) -> Self {
        Self::from_bytes(b)
    }
}

impl From<Vec<u8>> for ItemString {
    fn from(b: Vec<u8>) -> Self {
        Self::from_bytes(b)
    }
}
