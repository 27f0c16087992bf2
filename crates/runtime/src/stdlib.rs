//! Bridge standard natives
//!
//! A small set of natives every table gets from [`install`]:
//!
//! | Name | Parameters | Result |
//! |------|------------|--------|
//! | `LEN` | string, array or hash | length, 0 for anything else |
//! | `VALTYPE` | any | one-letter type code |
//! | `VALTOSTR` | any | text conversion |
//! | `AADD` | array, value | the appended value |
//! | `ASIZE` | array, length | the array |
//! | `HSET` | hash, key, value | the value |
//! | `HGET` | hash, key | the value, NIL when absent |
//! | `HDEL` | hash, key | `.T.` when the key was present |
//! | `WRITELOG` | file, create, values... | `.T.` on success |
//! | `LOADLOG` | file | file content, `""` on failure |
//!
//! `EVAL` is the reserved block-evaluation symbol present in every table.

use crate::error::RuntimeError;
use crate::invoke::Context;
use crate::params::Params;
use crate::symbol::{SymbolTable, SymbolTableBuilder};
use itembridge_core::{Item, TypeMask, val_to_str};
use std::sync::Arc;
use tracing::warn;

/// Names of the natives registered by [`install`]
pub const NATIVES: &[&str] = &[
    "LEN", "VALTYPE", "VALTOSTR", "AADD", "ASIZE", "HSET", "HGET", "HDEL", "WRITELOG",
    "LOADLOG",
];

/// Register the standard natives
pub fn install(builder: SymbolTableBuilder) -> SymbolTableBuilder {
    builder
        .function("LEN", len)
        .function("VALTYPE", valtype)
        .function("VALTOSTR", valtostr)
        .function("AADD", aadd)
        .function("ASIZE", asize)
        .function("HSET", hset)
        .function("HGET", hget)
        .function("HDEL", hdel)
        .function("WRITELOG", writelog)
        .function("LOADLOG", loadlog)
}

/// Table holding only the standard natives
pub fn table() -> Arc<SymbolTable> {
    install(SymbolTable::builder()).build()
}

fn require(name: &str, params: &Params, expected: usize) -> Result<(), RuntimeError> {
    if params.count() < expected {
        return Err(RuntimeError::ArityMismatch {
            name: name.to_string(),
            expected,
            found: params.count(),
        });
    }
    Ok(())
}

fn len(ctx: &mut Context, p: &Params) -> Result<(), RuntimeError> {
    let item = p.item_param(1);
    let n = match &item {
        Item::String(s) => s.len(),
        Item::Array(a) => a.borrow().len(),
        Item::Hash(h) => h.borrow().len(),
        _ => 0,
    };
    ctx.ret(Item::integer_fit(n as i64));
    Ok(())
}

fn valtype(ctx: &mut Context, p: &Params) -> Result<(), RuntimeError> {
    ctx.ret(p.item_param(1).type_letter());
    Ok(())
}

fn valtostr(ctx: &mut Context, p: &Params) -> Result<(), RuntimeError> {
    ctx.ret(val_to_str(&p.item_param(1)));
    Ok(())
}

fn aadd(ctx: &mut Context, p: &Params) -> Result<(), RuntimeError> {
    require("AADD", p, 2)?;
    let value = p.item_param(2);
    if let Some(array) = p.param(1, TypeMask::ARRAY).as_ref().and_then(Item::as_array) {
        array.borrow_mut().append(value.clone());
    }
    ctx.ret(value);
    Ok(())
}

fn asize(ctx: &mut Context, p: &Params) -> Result<(), RuntimeError> {
    require("ASIZE", p, 2)?;
    let item = p.param(1, TypeMask::ARRAY).unwrap_or_default();
    if let Some(array) = item.as_array() {
        let len = usize::try_from(p.parnint(2)).unwrap_or(0);
        array.borrow_mut().resize(len);
    }
    ctx.ret(item);
    Ok(())
}

fn hset(ctx: &mut Context, p: &Params) -> Result<(), RuntimeError> {
    require("HSET", p, 3)?;
    let value = p.item_param(3);
    if let Some(hash) = p.param(1, TypeMask::HASH).as_ref().and_then(Item::as_hash) {
        hash.borrow_mut().add(p.item_param(2), value.clone())?;
    }
    ctx.ret(value);
    Ok(())
}

fn hget(ctx: &mut Context, p: &Params) -> Result<(), RuntimeError> {
    require("HGET", p, 2)?;
    let value = p
        .param(1, TypeMask::HASH)
        .as_ref()
        .and_then(Item::as_hash)
        .and_then(|hash| hash.borrow().get(&p.item_param(2)).cloned())
        .unwrap_or_default();
    ctx.ret(value);
    Ok(())
}

fn hdel(ctx: &mut Context, p: &Params) -> Result<(), RuntimeError> {
    require("HDEL", p, 2)?;
    let removed = p
        .param(1, TypeMask::HASH)
        .as_ref()
        .and_then(Item::as_hash)
        .and_then(|hash| hash.borrow_mut().remove(&p.item_param(2)))
        .is_some();
    ctx.ret(removed);
    Ok(())
}

fn writelog(ctx: &mut Context, p: &Params) -> Result<(), RuntimeError> {
    let Some(file) = p.parc(1) else {
        ctx.ret(false);
        return Ok(());
    };
    let create = p.parl(2);
    let records: Vec<String> = p
        .args()
        .iter()
        .skip(2)
        .map(|item| val_to_str(&item.value()))
        .collect();

    let ok = match ctx.log_writer().write(&file, create, records.as_slice()) {
        Ok(()) => true,
        Err(e) => {
            warn!(file = %file, error = %e, "log write failed");
            false
        }
    };
    ctx.ret(ok);
    Ok(())
}

fn loadlog(ctx: &mut Context, p: &Params) -> Result<(), RuntimeError> {
    let content = match p.parc(1) {
        Some(file) => ctx.log_writer().load(&file).unwrap_or_else(|e| {
            warn!(file = %file, error = %e, "log load failed");
            Vec::new()
        }),
        None => Vec::new(),
    };
    ctx.ret(Item::string(content));
    Ok(())
}
