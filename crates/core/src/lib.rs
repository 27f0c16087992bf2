//! itembridge core: the values exchanged between native code and the VM
//!
//! Key design principles:
//! - Item: closed tagged union over every VM kind; typed access never
//!   reinterprets a payload under the wrong tag
//! - Containers (Array, Hash, Object) are shared handles, like the VM's own
//!   reference semantics
//! - By-reference cells are weak views of caller-owned slots
//!
//! # Modules
//!
//! - `item`: Item enum, blocks, objects, slots and by-reference cells
//! - `kind`: Kind discriminant and TypeMask parameter masks
//! - `array`: 1-based arrays
//! - `hash`: associative arrays with case/order flags
//! - `string`: explicit-length byte strings
//! - `date`: Julian-day dates and the `YYYYMMDD` form
//! - `symbol`: handles of symbol table entries
//! - `error`: item layer errors
//! - `error_object`: structured error records raised through the VM
//! - `text`: item to text conversion
//! - `snapshot`: serde/bincode snapshots of data items

pub mod array;
pub mod date;
pub mod error;
pub mod error_object;
pub mod hash;
pub mod item;
pub mod kind;
pub mod snapshot;
pub mod string;
pub mod symbol;
pub mod text;

pub use array::Array;
pub use date::Date;
pub use error::{ItemError, ItemResult};
pub use error_object::{ErrorFlags, ErrorObject, Severity};
pub use hash::{Hash, HashFlags};
pub use item::{ArrayRef, Block, HashRef, Item, ItemRef, Object, ObjectRef, Put, Slot, put_into};
pub use kind::{Kind, TypeMask};
pub use string::ItemString;
pub use symbol::Symbol;
pub use text::{TextConfig, item_to_text, val_to_str};

// Snapshot types (for persistence/exchange with external systems)
pub use snapshot::{SnapshotError, TypedItem};
