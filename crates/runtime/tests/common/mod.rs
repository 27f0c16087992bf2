//! Natives shared by the integration suites
//!
//! They mirror the classic extend-system samples: plain functions, outputs
//! through by-reference parameters, a class with a method, and block code.

#![allow(dead_code)]

use itembridge_core::date::is_leap_year;
use itembridge_runtime::{
    Block, ClassDef, Context, Item, Params, RuntimeError, Symbol, SymbolTable, TypeMask, stdlib,
};
use std::sync::Arc;

pub struct Bridge {
    pub table: Arc<SymbolTable>,
    /// Block code for `{|a, b| base + a * b }`, `base` captured at env[0]
    pub mul_add: Symbol,
}

impl Bridge {
    pub fn context(&self) -> Context {
        Context::new(Arc::clone(&self.table))
    }

    pub fn mul_add_block(&self, base: impl Into<Item>) -> Item {
        Item::block(Block::new(self.mul_add, vec![base.into()]))
    }
}

pub fn bridge() -> Bridge {
    let mut builder = stdlib::install(SymbolTable::builder())
        .function("SUMA", suma)
        .function("MI_ISLEAP", mi_isleap)
        .function("INTTOROMAN", int_to_roman)
        .function("CALCULA", calcula)
        .function("ASIGNAVARC", asigna_varc)
        .function("SUMA_Y_DOBLA", suma_y_dobla)
        .function("FALLA_DENTRO", falla_dentro)
        .function("RECURSE", recurse);

    builder.class(
        ClassDef::new("Persona")
            .data("Nombre")
            .data("Apellido")
            .data("Edad")
            .data("Sueldo")
            .method("CambiaDatos", cambia_datos),
    );

    let mul_add = builder.block_code(|ctx, p| {
        let base = p
            .block()
            .and_then(|b| b.env().first().and_then(Item::to_f64))
            .unwrap_or(0.0);
        ctx.ret(base + p.parnd(1) * p.parnd(2));
        Ok(())
    });

    Bridge {
        table: builder.build(),
        mul_add,
    }
}

fn suma(ctx: &mut Context, p: &Params) -> Result<(), RuntimeError> {
    ctx.ret(p.parnd(1) + p.parnd(2));
    Ok(())
}

fn mi_isleap(ctx: &mut Context, p: &Params) -> Result<(), RuntimeError> {
    let leap = p
        .param(1, TypeMask::NUMINT)
        .and_then(|year| year.to_i32())
        .is_some_and(|year| year > 0 && is_leap_year(year));
    ctx.ret(leap);
    Ok(())
}

fn int_to_roman(ctx: &mut Context, p: &Params) -> Result<(), RuntimeError> {
    const DIGITS: &[(i32, &str)] = &[
        (1000, "M"),
        (900, "CM"),
        (500, "D"),
        (400, "CD"),
        (100, "C"),
        (90, "XC"),
        (50, "L"),
        (40, "XL"),
        (10, "X"),
        (9, "IX"),
        (5, "V"),
        (4, "IV"),
        (1, "I"),
    ];

    let Some(mut n) = p.param(1, TypeMask::NUMINT).and_then(|n| n.to_i32()) else {
        return Ok(());
    };
    let mut roman = String::new();
    for &(value, digits) in DIGITS {
        while n >= value {
            roman.push_str(digits);
            n -= value;
        }
    }
    ctx.ret(roman);
    Ok(())
}

/// CALCULA(n1, n2, @sum, @diff, @prod, @quot)
fn calcula(_ctx: &mut Context, p: &Params) -> Result<(), RuntimeError> {
    let (Some(a), Some(b)) = (
        p.param(1, TypeMask::NUMINT).and_then(|n| n.to_i64()),
        p.param(2, TypeMask::NUMINT).and_then(|n| n.to_i64()),
    ) else {
        return Ok(());
    };
    p.stor(3, Item::integer_fit(a + b));
    p.stor(4, Item::integer_fit(a - b));
    p.stor(5, Item::integer_fit(a * b));
    p.stor(6, a as f64 / b as f64);
    Ok(())
}

/// ASIGNAVARC(@c, @n, @d, @l, aOut)
fn asigna_varc(_ctx: &mut Context, p: &Params) -> Result<(), RuntimeError> {
    p.stor(1, "Cadena asignada en C");
    p.stor(2, 100);
    p.stor(3, Item::date_str("20210517"));
    p.stor(4, true);

    if let Some(array) = p.param(5, TypeMask::ARRAY).as_ref().and_then(Item::as_array) {
        let mut array = array.borrow_mut();
        for n in 1..=4 {
            array.set(n, p.item_param(n))?;
        }
    }
    Ok(())
}

/// Calls SUMA, then doubles its result; checks its own slot survives the inner call
fn suma_y_dobla(ctx: &mut Context, p: &Params) -> Result<(), RuntimeError> {
    ctx.ret("pendiente");
    let inner = ctx.call("SUMA", p.args().to_vec())?;
    let own = ctx.ret_mut().map(|slot| slot.clone()).unwrap_or_default();
    if own != Item::from("pendiente") {
        ctx.ret(Item::Nil);
        return Ok(());
    }
    ctx.ret(inner.to_f64().unwrap_or(0.0) * 2.0);
    Ok(())
}

/// Fails inside a nested call
fn falla_dentro(ctx: &mut Context, _p: &Params) -> Result<(), RuntimeError> {
    ctx.call("NO_EXISTE", vec![])?;
    ctx.ret(true);
    Ok(())
}

fn recurse(ctx: &mut Context, p: &Params) -> Result<(), RuntimeError> {
    let n = p.parni(1);
    let result = if n > 0 {
        ctx.call("RECURSE", vec![Item::Integer(n - 1)])?
    } else {
        Item::Integer(ctx.depth() as i32)
    };
    ctx.ret(result);
    Ok(())
}

/// Persona:CambiaDatos(cNombre, cApellido, nEdad, nSueldo)
fn cambia_datos(ctx: &mut Context, p: &Params) -> Result<(), RuntimeError> {
    let receiver = p.self_item().clone();
    if let Some(object) = receiver.as_object() {
        let mut object = object.borrow_mut();
        let fields = object.fields_mut();
        for n in 1..=4 {
            fields.set(n, p.item_param(n))?;
        }
    }
    ctx.ret(receiver);
    Ok(())
}
