//! Parameter access for natives
//!
//! A native receives its arguments as `&Params`. Positions are 1-based, as
//! in the VM. Asking for a parameter that is missing or of another kind
//! yields `None` (or the documented default for the scalar shortcuts);
//! it is never an error at this layer.
//!
//! Arguments passed by reference arrive as by-reference cells. The value
//! accessors read through them transparently; `param_ref` and `stor` are
//! the only ways to reach the caller's slot itself.

use itembridge_core::{Block, Date, Item, ItemRef, ItemString, TypeMask};
use std::rc::Rc;

#[derive(Debug, Clone, Default)]
pub struct Params {
    receiver: Item,
    args: Vec<Item>,
}

impl Params {
    pub fn new(receiver: Item, args: Vec<Item>) -> Self {
        Params { receiver, args }
    }

    /// Number of arguments passed
    pub fn count(&self) -> usize {
        self.args.len()
    }

    fn raw(&self, n: usize) -> Option<&Item> {
        n.checked_sub(1).and_then(|i| self.args.get(i))
    }

    /// Parameter `n` if its kind is in `mask`; by-reference cells are read through
    pub fn param(&self, n: usize, mask: TypeMask) -> Option<Item> {
        let item = self.raw(n)?.value();
        item.matches(mask).then_some(item)
    }

    /// The caller's slot behind parameter `n`, if it was passed by reference
    pub fn param_ref(&self, n: usize) -> Option<ItemRef> {
        self.raw(n)?.as_ref().cloned()
    }

    pub fn is_by_ref(&self, n: usize) -> bool {
        self.raw(n).is_some_and(Item::is_by_ref)
    }

    /// Copy of parameter `n`; Nil when absent
    pub fn item_param(&self, n: usize) -> Item {
        self.raw(n).map(Item::value).unwrap_or_default()
    }

    /// Receiver of a message send; Nil for a plain function call
    pub fn self_item(&self) -> &Item {
        &self.receiver
    }

    /// The block being evaluated, when running as block code
    pub fn block(&self) -> Option<&Rc<Block>> {
        self.receiver.as_block()
    }

    pub fn args(&self) -> &[Item] {
        &self.args
    }

    // Extend-system shortcuts

    /// String parameter as text; `None` when not a string
    pub fn parc(&self, n: usize) -> Option<String> {
        self.param(n, TypeMask::STRING)
            .and_then(|item| item.as_string().map(|s| s.to_str_lossy().into_owned()))
    }

    /// String parameter as raw bytes
    pub fn par_bytes(&self, n: usize) -> Option<ItemString> {
        self.param(n, TypeMask::STRING)
            .and_then(|item| item.as_string().cloned())
    }

    /// Length of a string parameter; 0 when not a string
    pub fn parclen(&self, n: usize) -> usize {
        self.par_bytes(n).map_or(0, |s| s.len())
    }

    /// Numeric parameter as i32; 0 when not numeric
    pub fn parni(&self, n: usize) -> i32 {
        self.parnidef(n, 0)
    }

    /// Numeric parameter as i64; 0 when not numeric
    pub fn parnint(&self, n: usize) -> i64 {
        self.param(n, TypeMask::NUMERIC)
            .and_then(|item| item.to_i64())
            .unwrap_or(0)
    }

    /// Numeric parameter as f64; 0.0 when not numeric
    pub fn parnd(&self, n: usize) -> f64 {
        self.param(n, TypeMask::NUMERIC)
            .and_then(|item| item.to_f64())
            .unwrap_or(0.0)
    }

    /// Logical parameter; false when not logical
    pub fn parl(&self, n: usize) -> bool {
        self.parldef(n, false)
    }

    /// Date parameter as `YYYYMMDD`; eight spaces when not a date
    pub fn pards(&self, n: usize) -> String {
        self.param(n, TypeMask::DATE)
            .and_then(|item| item.as_date())
            .unwrap_or(Date::EMPTY)
            .to_yyyymmdd()
    }

    pub fn parptr(&self, n: usize) -> Option<usize> {
        self.param(n, TypeMask::POINTER)
            .and_then(|item| item.as_pointer())
    }

    pub fn parnidef(&self, n: usize, default: i32) -> i32 {
        self.param(n, TypeMask::NUMERIC)
            .and_then(|item| item.to_i32())
            .unwrap_or(default)
    }

    pub fn parldef(&self, n: usize, default: bool) -> bool {
        self.param(n, TypeMask::LOGICAL)
            .and_then(|item| item.as_logical())
            .unwrap_or(default)
    }

    /// Write `value` into the caller's slot behind parameter `n`
    ///
    /// Returns `false` when the parameter was not passed by reference or
    /// the caller's slot is gone.
    pub fn stor(&self, n: usize, value: impl Into<Item>) -> bool {
        match self.param_ref(n) {
            Some(cell) => cell.put(value),
            None => false,
        }
    }
}
