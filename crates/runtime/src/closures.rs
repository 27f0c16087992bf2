//! Block (closure) evaluation from native code
//!
//! Two idioms, same result for the same block and arguments:
//!
//! - Explicit context: build an [`EvalInfo`] from the block, add parameters
//!   one at a time, launch it (any number of times). Dropping the
//!   `EvalInfo` releases the parameter copies it holds.
//! - Shortcuts: [`eval_block0`], [`eval_block1`], [`eval_block2`] and the
//!   variadic [`eval_block`].
//!
//! Both send the reserved `EVAL` message to the block. The block code runs
//! with the block as its receiver and reads captured values through
//! `Params::block()`.

use crate::error::RuntimeError;
use crate::invoke::{Call, Context};
use crate::symbol::EVAL;
use itembridge_core::{Item, Kind};

/// Maximum number of parameters an evaluation context accepts
pub const MAX_EVAL_PARAMS: usize = 255;

#[derive(Debug, Clone)]
pub struct EvalInfo {
    block: Item,
    params: Vec<Item>,
}

impl EvalInfo {
    /// Evaluation context for `block`; `None` if the item is not a block
    pub fn new(block: &Item) -> Option<Self> {
        let block = block.value();
        block.as_block()?;
        Some(EvalInfo {
            block,
            params: Vec::new(),
        })
    }

    /// Add a copy of `item` as the next parameter
    ///
    /// Returns `false` once the context is full.
    pub fn put_param(&mut self, item: &Item) -> bool {
        if self.params.len() >= MAX_EVAL_PARAMS {
            return false;
        }
        self.params.push(item.value());
        true
    }

    pub fn param_count(&self) -> usize {
        self.params.len()
    }

    pub fn launch(&self, ctx: &mut Context) -> Result<Item, RuntimeError> {
        ctx.invoke(Call::method(EVAL, self.block.clone()).args(self.params.iter().cloned()))
    }
}

/// Evaluate `block` with `args`
pub fn eval_block(ctx: &mut Context, block: &Item, args: &[Item]) -> Result<Item, RuntimeError> {
    let block = block.value();
    if block.as_block().is_none() {
        return Err(RuntimeError::TypeMismatch {
            expected: Kind::Block,
            found: block.kind(),
        });
    }
    ctx.invoke(Call::method(EVAL, block).args(args.iter().map(Item::value)))
}

pub fn eval_block0(ctx: &mut Context, block: &Item) -> Result<Item, RuntimeError> {
    eval_block(ctx, block, &[])
}

pub fn eval_block1(ctx: &mut Context, block: &Item, a: &Item) -> Result<Item, RuntimeError> {
    eval_block(ctx, block, std::slice::from_ref(a))
}

pub fn eval_block2(
    ctx: &mut Context,
    block: &Item,
    a: &Item,
    b: &Item,
) -> Result<Item, RuntimeError> {
    eval_block(ctx, block, &[a.clone(), b.clone()])
}
