//! Structured error objects
//!
//! An `ErrorObject` is the record native code fills in before raising an
//! error through the VM's handler chain. Each field is set independently;
//! the handler inspects them to decide whether to retry, default, substitute
//! a value or propagate.
//!
//! ```ignore
//! let mut err = ErrorObject::new()
//!     .with_subsystem("BASE")
//!     .with_gen_code(GEN_NOMETHOD)
//!     .with_description("No exported method")
//!     .with_flags(ErrorFlags::CAN_DEFAULT | ErrorFlags::CAN_RETRY)
//!     .with_retries(5);
//! ```
//!
//! Raising lives in the runtime (`Context::launch`); this type is only the
//! record and its bookkeeping.

use bitflags::bitflags;
use std::fmt;

/// Generic code for "no exported method"
pub const GEN_NOMETHOD: u32 = 13;
/// Subcode the VM reports for an unknown message
pub const SUBCODE_NOMETHOD: u32 = 1004;
/// Retry budget of the "no exported method" error
pub const NOMETHOD_RETRIES: u32 = 3;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    WhoCares,
    Warning,
    #[default]
    Error,
    Catastrophic,
}

impl Severity {
    /// Numeric level 0..=3; out-of-range levels clamp to `Catastrophic`
    pub fn from_level(level: u32) -> Self {
        match level {
            0 => Severity::WhoCares,
            1 => Severity::Warning,
            2 => Severity::Error,
            _ => Severity::Catastrophic,
        }
    }

    pub fn level(self) -> u32 {
        self as u32
    }

    /// Whether an unhandled error of this severity terminates the raising chain
    pub fn is_severe(self) -> bool {
        self >= Severity::Error
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Severity::WhoCares => "whocares",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Catastrophic => "catastrophic",
        };
        f.write_str(name)
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct ErrorFlags: u32 {
        const CAN_RETRY = 1 << 0;
        const CAN_SUBSTITUTE = 1 << 1;
        const CAN_DEFAULT = 1 << 2;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorObject {
    subsystem: String,
    gen_code: u32,
    sub_code: u32,
    description: String,
    operation: String,
    severity: Severity,
    flags: ErrorFlags,
    retries: u32,
    tries: u32,
}

impl ErrorObject {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subsystem(&self) -> &str {
        &self.subsystem
    }

    pub fn gen_code(&self) -> u32 {
        self.gen_code
    }

    pub fn sub_code(&self) -> u32 {
        self.sub_code
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn flags(&self) -> ErrorFlags {
        self.flags
    }

    /// Retry budget
    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// How many times a handler has been consulted so far
    pub fn tries(&self) -> u32 {
        self.tries
    }

    pub fn set_subsystem(&mut self, subsystem: impl Into<String>) {
        self.subsystem = subsystem.into();
    }

    pub fn set_gen_code(&mut self, code: u32) {
        self.gen_code = code;
    }

    pub fn set_sub_code(&mut self, code: u32) {
        self.sub_code = code;
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    pub fn set_operation(&mut self, operation: impl Into<String>) {
        self.operation = operation.into();
    }

    pub fn set_severity(&mut self, severity: Severity) {
        self.severity = severity;
    }

    pub fn set_flags(&mut self, flags: ErrorFlags) {
        self.flags = flags;
    }

    pub fn set_retries(&mut self, retries: u32) {
        self.retries = retries;
    }

    pub fn with_subsystem(mut self, subsystem: impl Into<String>) -> Self {
        self.set_subsystem(subsystem);
        self
    }

    pub fn with_gen_code(mut self, code: u32) -> Self {
        self.gen_code = code;
        self
    }

    pub fn with_sub_code(mut self, code: u32) -> Self {
        self.sub_code = code;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.set_description(description);
        self
    }

    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.set_operation(operation);
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_flags(mut self, flags: ErrorFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Record one handler consultation
    pub fn record_try(&mut self) {
        self.tries = self.tries.saturating_add(1);
    }

    /// Retrying needs `CAN_RETRY` and an unspent budget
    pub fn can_retry(&self) -> bool {
        self.flags.contains(ErrorFlags::CAN_RETRY) && self.tries < self.retries
    }

    pub fn can_default(&self) -> bool {
        self.flags.contains(ErrorFlags::CAN_DEFAULT)
    }

    pub fn can_substitute(&self) -> bool {
        self.flags.contains(ErrorFlags::CAN_SUBSTITUTE)
    }
}

impl fmt::Display for ErrorObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let subsystem = if self.subsystem.is_empty() {
            "???"
        } else {
            &self.subsystem
        };
        write!(f, "{}/{}", subsystem, self.sub_code)?;
        if !self.description.is_empty() {
            write!(f, " {}", self.description)?;
        }
        if !self.operation.is_empty() {
            write!(f, ": {}", self.operation)?;
        }
        Ok(())
    }
}

impl std::error::Error for ErrorObject {}
