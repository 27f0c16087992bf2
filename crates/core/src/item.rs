//! Item: the tagged dynamic value exchanged across the native/VM boundary
//!
//! Every value the VM hands to native code, and every value native code
//! hands back, is an `Item`. The enum is closed: consumers match on it, and
//! typed accessors return `None` when the item holds a different kind, so a
//! payload is never read under the wrong tag.
//!
//! # Ownership
//!
//! Scalars and strings are plain owned data. Arrays, hashes, objects and
//! blocks are reference-counted handles: cloning an item that holds an
//! array aliases the same array, which is how the VM shares containers
//! between variables. Dropping the last handle releases the container and
//! everything in it.
//!
//! By-reference cells are the exception to ownership. A [`Slot`] is a
//! caller-owned storage cell; [`Slot::by_ref`] produces an [`ItemRef`], a
//! weak view that can read and write the slot but never keeps it alive.
//! Containers never hold by-reference cells: storing one stores the value
//! it currently refers to.

use crate::array::Array;
use crate::date::Date;
use crate::hash::{Hash, HashFlags};
use crate::kind::{Kind, TypeMask};
use crate::string::ItemString;
use crate::symbol::Symbol;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

pub type ArrayRef = Rc<RefCell<Array>>;
pub type HashRef = Rc<RefCell<Hash>>;
pub type ObjectRef = Rc<RefCell<Object>>;

/// Item: one dynamically typed VM value
///
/// Equality is structural and kind-sensitive: `Integer(5)` and `Long(5)`
/// are different items. Use [`Item::to_f64`] / [`Item::to_i64`] to compare
/// numbers across widths.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Item {
    /// Absence of a value; also the VM's "no return value" sentinel
    #[default]
    Nil,

    Logical(bool),

    /// Fixed-width (32-bit) integer
    Integer(i32),

    /// Wide (64-bit) integer
    Long(i64),

    /// IEEE 754 double
    Double(f64),

    Date(Date),

    /// Length-carrying byte string
    String(ItemString),

    /// Shared handle to a 1-based array
    Array(ArrayRef),

    /// Shared handle to an associative array
    Hash(HashRef),

    /// Shared handle to a class instance
    Object(ObjectRef),

    /// Code block (closure): code symbol plus captured environment
    Block(Rc<Block>),

    /// Opaque host pointer; never dereferenced by the bridge
    Pointer(usize),

    /// Non-owning view of a caller's slot (output parameters)
    ByRef(ItemRef),
}

/// Code block payload
///
/// The code itself lives in the symbol table; the block only records which
/// symbol runs it and the values it captured when it was created.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    code: Symbol,
    env: Box<[Item]>,
}

impl Block {
    pub fn new(code: Symbol, env: Vec<Item>) -> Self {
        let env: Vec<Item> = env.into_iter().map(Item::deref_value).collect();
        Block {
            code,
            env: env.into_boxed_slice(),
        }
    }

    pub fn code(&self) -> Symbol {
        self.code
    }

    /// Captured values, in capture order
    pub fn env(&self) -> &[Item] {
        &self.env
    }
}

/// Class instance payload: class name plus instance variables
#[derive(Debug, Clone, PartialEq)]
pub struct Object {
    class: String,
    fields: Array,
}

impl Object {
    /// New instance with `field_count` Nil instance variables
    ///
    /// Class names are kept upper-case, the way the VM stores them.
    pub fn new(class: &str, field_count: usize) -> Self {
        Object {
            class: class.to_ascii_uppercase(),
            fields: Array::new(field_count),
        }
    }

    pub fn class_name(&self) -> &str {
        &self.class
    }

    pub fn fields(&self) -> &Array {
        &self.fields
    }

    pub fn fields_mut(&mut self) -> &mut Array {
        &mut self.fields
    }
}

/// Caller-owned storage cell that can be passed by reference
#[derive(Debug, Clone, Default)]
pub struct Slot(Rc<RefCell<Item>>);

impl Slot {
    pub fn new(item: impl Into<Item>) -> Self {
        Slot(Rc::new(RefCell::new(item.into().deref_value())))
    }

    /// Current value (a copy; containers stay shared)
    pub fn get(&self) -> Item {
        self.0.borrow().clone()
    }

    pub fn set(&self, item: impl Into<Item>) {
        let item = item.into().deref_value();
        *self.0.borrow_mut() = item;
    }

    pub fn kind(&self) -> Kind {
        self.0.borrow().kind()
    }

    /// By-reference cell viewing this slot
    pub fn by_ref(&self) -> Item {
        Item::ByRef(ItemRef(Rc::downgrade(&self.0)))
    }
}

/// Weak view of a [`Slot`]
#[derive(Debug, Clone)]
pub struct ItemRef(Weak<RefCell<Item>>);

impl ItemRef {
    /// Value of the viewed slot, or `None` if the slot is gone
    pub fn get(&self) -> Option<Item> {
        self.0.upgrade().map(|cell| cell.borrow().clone())
    }

    /// Write through to the slot; `false` if the slot is gone
    pub fn put(&self, item: impl Into<Item>) -> bool {
        let item = item.into().deref_value();
        match self.0.upgrade() {
            Some(cell) => {
                *cell.borrow_mut() = item;
                true
            }
            None => false,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }
}

// Two views are equal when they view the same slot
impl PartialEq for ItemRef {
    fn eq(&self, other: &Self) -> bool {
        Weak::ptr_eq(&self.0, &other.0)
    }
}

/// Result of [`put_into`]: which of the two modes ran
#[derive(Debug)]
pub enum Put<'a> {
    /// An existing item was overwritten in place
    Updated(&'a mut Item),
    /// No target was given; a fresh item was allocated
    Created(Item),
}

impl Put<'_> {
    pub fn is_created(&self) -> bool {
        matches!(self, Put::Created(_))
    }
}

/// "Mutate or create": overwrite `target` if there is one, otherwise
/// allocate a new item holding `value`
pub fn put_into(target: Option<&mut Item>, value: impl Into<Item>) -> Put<'_> {
    match target {
        Some(item) => {
            item.put(value);
            Put::Updated(item)
        }
        None => Put::Created(value.into().deref_value()),
    }
}

impl Item {
    // ---- construction ----

    pub fn logical(b: bool) -> Self {
        Item::Logical(b)
    }

    pub fn integer(n: i32) -> Self {
        Item::Integer(n)
    }

    pub fn long(n: i64) -> Self {
        Item::Long(n)
    }

    /// Smallest integer width that holds `n`
    pub fn integer_fit(n: i64) -> Self {
        match i32::try_from(n) {
            Ok(small) => Item::Integer(small),
            Err(_) => Item::Long(n),
        }
    }

    pub fn double(d: f64) -> Self {
        Item::Double(d)
    }

    pub fn string(s: impl Into<ItemString>) -> Self {
        Item::String(s.into())
    }

    pub fn date(d: Date) -> Self {
        Item::Date(d)
    }

    /// Date from its `YYYYMMDD` form
    pub fn date_str(yyyymmdd: &str) -> Self {
        Item::Date(Date::from_yyyymmdd(yyyymmdd.as_bytes()))
    }

    pub fn pointer(p: usize) -> Self {
        Item::Pointer(p)
    }

    pub fn array(array: Array) -> Self {
        Item::Array(Rc::new(RefCell::new(array)))
    }

    /// Array of `len` Nil elements
    pub fn new_array(len: usize) -> Self {
        Item::array(Array::new(len))
    }

    pub fn hash(hash: Hash) -> Self {
        Item::Hash(Rc::new(RefCell::new(hash)))
    }

    pub fn new_hash(flags: HashFlags) -> Self {
        Item::hash(Hash::new(flags))
    }

    pub fn object(object: Object) -> Self {
        Item::Object(Rc::new(RefCell::new(object)))
    }

    pub fn block(block: Block) -> Self {
        Item::Block(Rc::new(block))
    }

    /// Fresh item holding `value` (the "create" half of put)
    pub fn put_new(value: impl Into<Item>) -> Self {
        value.into().deref_value()
    }

    // ---- kind ----

    pub fn kind(&self) -> Kind {
        match self {
            Item::Nil => Kind::Nil,
            Item::Logical(_) => Kind::Logical,
            Item::Integer(_) => Kind::Integer,
            Item::Long(_) => Kind::Long,
            Item::Double(_) => Kind::Double,
            Item::Date(_) => Kind::Date,
            Item::String(_) => Kind::String,
            Item::Array(_) => Kind::Array,
            Item::Hash(_) => Kind::Hash,
            Item::Object(_) => Kind::Object,
            Item::Block(_) => Kind::Block,
            Item::Pointer(_) => Kind::Pointer,
            Item::ByRef(_) => Kind::ByRef,
        }
    }

    /// Single-letter type code (`N`, `C`, `A`, ...)
    pub fn type_letter(&self) -> &'static str {
        self.kind().letter()
    }

    pub fn matches(&self, mask: TypeMask) -> bool {
        mask.accepts(self.kind())
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Item::Nil)
    }

    pub fn is_numeric(&self) -> bool {
        self.kind().is_numeric()
    }

    pub fn is_by_ref(&self) -> bool {
        matches!(self, Item::ByRef(_))
    }

    // ---- typed access: None on kind mismatch ----

    pub fn as_logical(&self) -> Option<bool> {
        match self {
            Item::Logical(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i32> {
        match self {
            Item::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_long(&self) -> Option<i64> {
        match self {
            Item::Long(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match self {
            Item::Double(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<Date> {
        match self {
            Item::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&ItemString> {
        match self {
            Item::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_str_bytes(&self) -> Option<&[u8]> {
        self.as_string().map(ItemString::as_bytes)
    }

    pub fn as_array(&self) -> Option<&ArrayRef> {
        match self {
            Item::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_hash(&self) -> Option<&HashRef> {
        match self {
            Item::Hash(h) => Some(h),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Item::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_block(&self) -> Option<&Rc<Block>> {
        match self {
            Item::Block(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_pointer(&self) -> Option<usize> {
        match self {
            Item::Pointer(p) => Some(*p),
            _ => None,
        }
    }

    pub fn as_ref(&self) -> Option<&ItemRef> {
        match self {
            Item::ByRef(r) => Some(r),
            _ => None,
        }
    }

    // ---- explicit, lossy numeric conversions ----

    /// Any numeric kind widened to f64
    pub fn to_f64(&self) -> Option<f64> {
        match self {
            Item::Integer(n) => Some(f64::from(*n)),
            Item::Long(n) => Some(*n as f64),
            Item::Double(d) => Some(*d),
            _ => None,
        }
    }

    /// Any numeric kind as i64; doubles truncate toward zero (saturating)
    pub fn to_i64(&self) -> Option<i64> {
        match self {
            Item::Integer(n) => Some(i64::from(*n)),
            Item::Long(n) => Some(*n),
            Item::Double(d) => Some(*d as i64),
            _ => None,
        }
    }

    /// Any numeric kind as i32; truncates and saturates
    pub fn to_i32(&self) -> Option<i32> {
        match self {
            Item::Integer(n) => Some(*n),
            Item::Long(n) => Some((*n).clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32),
            Item::Double(d) => Some(*d as i32),
            _ => None,
        }
    }

    // ---- in-place update ----

    /// Overwrite kind and payload in place
    ///
    /// On a by-reference cell this writes through to the viewed slot, which
    /// is how output parameters are filled. Writing through a dead cell is
    /// a no-op.
    pub fn put(&mut self, value: impl Into<Item>) {
        let value = value.into().deref_value();
        match self {
            Item::ByRef(r) => {
                r.put(value);
            }
            other => *other = value,
        }
    }

    /// Resolve a by-reference cell to the value it views
    ///
    /// A dead cell resolves to Nil; every other item is returned unchanged.
    pub fn deref_value(self) -> Item {
        match self {
            Item::ByRef(r) => r.get().unwrap_or_default(),
            other => other,
        }
    }

    /// Borrowing form of [`Item::deref_value`]
    pub fn value(&self) -> Item {
        self.clone().deref_value()
    }
}

impl From<bool> for Item {
    fn from(b: bool) -> Self {
        Item::Logical(b)
    }
}

impl From<i32> for Item {
    fn from(n: i32) -> Self {
        Item::Integer(n)
    }
}

impl From<i64> for Item {
    fn from(n: i64) -> Self {
        Item::Long(n)
    }
}

impl From<f64> for Item {
    fn from(d: f64) -> Self {
        Item::Double(d)
    }
}

impl From<&str> for Item {
    fn from(s: &str) -> Self {
        Item::String(s.into())
    }
}

impl From<String> for Item {
    fn from(s: String) -> Self {
        Item::String(s.into())
    }
}

impl From<ItemString> for Item {
    fn from(s: ItemString) -> Self {
        Item::String(s)
    }
}

impl From<Date> for Item {
    fn from(d: Date) -> Self {
        Item::Date(d)
    }
}

impl From<Array> for Item {
    fn from(a: Array) -> Self {
        Item::array(a)
    }
}

impl From<Hash> for Item {
    fn from(h: Hash) -> Self {
        Item::hash(h)
    }
}

impl From<Object> for Item {
    fn from(o: Object) -> Self {
        Item::object(o)
    }
}

impl From<Block> for Item {
    fn from(b: Block) -> Self {
        Item::block(b)
    }
}

impl<T: Into<Item>> From<Option<T>> for Item {
    fn from(value: Option<T>) -> Self {
        value.map_or(Item::Nil, Into::into)
    }
}
