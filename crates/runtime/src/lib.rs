//! itembridge runtime: calling into the VM from native code
//!
//! Key design principles:
//! - SymbolTable: built once, shared read-only (`Arc`) by every thread
//! - Context: per-thread call stack, return slot and handler chain; `!Send`
//! - Invocation: Begin → Receiver → Arguments → Dispatch → Result → End,
//!   with frames restored on every exit path
//! - Natives: `Fn(&mut Context, &Params) -> Result<(), RuntimeError>`

pub mod closures;
pub mod config;
pub mod error;
pub mod errors;
pub mod invoke;
pub mod log;
pub mod params;
pub mod stack;
pub mod stdlib;
pub mod symbol;

pub use closures::{EvalInfo, eval_block, eval_block0, eval_block1, eval_block2};
pub use config::{BridgeConfig, ConfigError};
pub use error::RuntimeError;
pub use errors::{ErrorHandler, HandlerDecision, LaunchOutcome, Retried};
pub use invoke::{Call, Context, Dispatch, PendingCall, Receiver};
pub use log::{FileStorage, LogWriter, OpenMode, StdStorage};
pub use params::Params;
pub use symbol::{
    CaseMode, ClassDef, EVAL, EVAL_NAME, NativeFn, SymbolTable, SymbolTableBuilder, Target,
};

// Item layer types every native touches
pub use itembridge_core::{
    Array, Block, ErrorFlags, ErrorObject, Hash, HashFlags, Item, Severity, Slot, Symbol, TypeMask,
};
