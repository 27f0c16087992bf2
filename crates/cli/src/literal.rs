//! Command-line literals
//!
//! `NIL`, `.T.`/`.F.` (also `.Y.`/`.N.`), integers, decimals and
//! `0dYYYYMMDD` dates parse to the matching item kind; anything else is
//! taken as a string.

use itembridge_core::{Date, Item};

pub fn parse(text: &str) -> Item {
    match text.to_ascii_uppercase().as_str() {
        "NIL" => return Item::Nil,
        ".T." | ".Y." => return Item::Logical(true),
        ".F." | ".N." => return Item::Logical(false),
        _ => {}
    }

    if let Some(digits) = text.strip_prefix("0d")
        && digits.len() == 8
        && digits.bytes().all(|b| b.is_ascii_digit())
    {
        let date = Date::from_yyyymmdd(digits.as_bytes());
        if !date.is_empty() {
            return Item::date(date);
        }
    }

    if let Ok(n) = text.parse::<i64>() {
        return Item::integer_fit(n);
    }
    if looks_decimal(text)
        && let Ok(d) = text.parse::<f64>()
    {
        return Item::Double(d);
    }
    Item::from(text)
}

// digits with one decimal point; rejects "inf", "NaN" and exponents
fn looks_decimal(text: &str) -> bool {
    let body = text.strip_prefix('-').unwrap_or(text);
    let mut dots = 0;
    let mut digits = 0;
    for b in body.bytes() {
        match b {
            b'.' => dots += 1,
            b'0'..=b'9' => digits += 1,
            _ => return false,
        }
    }
    dots == 1 && digits > 0
}
