//! Block evaluation from native code
//!
//! The explicit evaluation context and the shortcuts must agree, and both
//! must agree with calling the reserved EVAL symbol directly.

mod common;

use common::bridge;
use itembridge_core::{Array, Block, Kind, Slot};
use itembridge_runtime::{
    Call, Context, EVAL, EvalInfo, Item, RuntimeError, SymbolTable, eval_block,
    eval_block1, eval_block2,
};
use proptest::prelude::*;

#[test]
fn test_explicit_context_and_shortcut_agree() {
    let bridge = bridge();
    let mut ctx = bridge.context();
    let block = bridge.mul_add_block(100);

    let mut info = EvalInfo::new(&block).unwrap();
    info.put_param(&Item::Integer(6));
    info.put_param(&Item::Integer(7));
    assert_eq!(info.param_count(), 2);
    let explicit = info.launch(&mut ctx).unwrap();
    drop(info);

    let shortcut = eval_block2(&mut ctx, &block, &Item::Integer(6), &Item::Integer(7)).unwrap();
    let variadic = eval_block(&mut ctx, &block, &[Item::Integer(6), Item::Integer(7)]).unwrap();

    assert_eq!(explicit, Item::Double(142.0));
    assert_eq!(shortcut, explicit);
    assert_eq!(variadic, explicit);
    assert_eq!(ctx.depth(), 0);
}

#[test]
fn test_eval_symbol_as_function_takes_block_first() {
    let bridge = bridge();
    let mut ctx = bridge.context();
    let block = bridge.mul_add_block(1);

    let result = ctx
        .invoke(Call::function(EVAL).arg(block.clone()).arg(2).arg(3))
        .unwrap();
    assert_eq!(result, eval_block2(&mut ctx, &block, &Item::Integer(2), &Item::Integer(3)).unwrap());

    assert_eq!(
        ctx.call("EVAL", vec![Item::Integer(1)]),
        Err(RuntimeError::TypeMismatch {
            expected: Kind::Block,
            found: Kind::Integer,
        })
    );
}

#[test]
fn test_params_are_copied_when_added() {
    let bridge = bridge();
    let mut ctx = bridge.context();
    let block = bridge.mul_add_block(0);
    let slot = Slot::new(Item::Integer(2));

    let mut info = EvalInfo::new(&block).unwrap();
    info.put_param(&slot.by_ref());
    info.put_param(&Item::Integer(10));
    slot.set(Item::Integer(5));

    assert_eq!(info.launch(&mut ctx).unwrap(), Item::Double(20.0));
}

#[test]
fn test_block_shares_captured_container() {
    let mut builder = SymbolTable::builder();
    let collect = builder.block_code(|ctx, p| {
        let captured = p.block().and_then(|b| b.env().first().cloned());
        if let Some(array) = captured.as_ref().and_then(Item::as_array) {
            array.borrow_mut().append(p.item_param(1));
        }
        ctx.ret(p.item_param(1));
        Ok(())
    });
    let mut ctx = Context::new(builder.build());

    let seen = Item::array(Array::new(0));
    // a by-reference cell is resolved when captured; containers stay shared
    let slot = Slot::new(seen.clone());
    let block = Item::block(Block::new(collect, vec![slot.by_ref()]));
    assert!(!block.as_block().unwrap().env()[0].is_by_ref());

    for n in 1..=4 {
        eval_block1(&mut ctx, &block, &Item::Integer(n)).unwrap();
    }
    let seen = seen.as_array().unwrap().borrow().as_slice().to_vec();
    assert_eq!(
        seen,
        vec![Item::Integer(1), Item::Integer(2), Item::Integer(3), Item::Integer(4)]
    );
}

proptest! {
    #[test]
    fn prop_explicit_matches_shortcut(base in -1000i32..1000, a in -1000i32..1000, b in -1000i32..1000) {
        let bridge = bridge();
        let mut ctx = bridge.context();
        let block = bridge.mul_add_block(base);
        let (a, b) = (Item::Integer(a), Item::Integer(b));

        let mut info = EvalInfo::new(&block).unwrap();
        info.put_param(&a);
        info.put_param(&b);
        let explicit = info.launch(&mut ctx).unwrap();
        let shortcut = eval_block2(&mut ctx, &block, &a, &b).unwrap();
        prop_assert_eq!(explicit, shortcut);
    }
}
