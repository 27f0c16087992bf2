//! Item to text conversion
//!
//! Renders items the way the VM prints values:
//!
//! - Nil: `NIL`
//! - Logical: `.T.` / `.F.`
//! - Numbers: `42`, `3.5`, `2.0` (doubles always carry a decimal point)
//! - Date: `2021-05-17`, or `0d20210517` in literal mode
//! - String: raw text, or `"quoted"` in literal mode
//! - Array: `{1, "two", .T.}`
//! - Hash: `{"key" => 1, 2 => NIL}`, empty hash `{=>}`
//! - Object / Block / Pointer: `<object PERSONA>`, `<block>`, `0x1f`
//!
//! Container elements are always rendered in literal mode so nested strings
//! stay distinguishable from numbers.

use crate::item::Item;

/// Configuration for text output
#[derive(Debug, Clone)]
pub struct TextConfig {
    /// Quote strings and print dates as `0dYYYYMMDD`
    pub literal: bool,
    /// Containers nested deeper than this render as `...`
    pub max_depth: usize,
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            literal: false,
            max_depth: 16,
        }
    }
}

impl TextConfig {
    pub fn plain() -> Self {
        Self::default()
    }

    pub fn literal() -> Self {
        Self {
            literal: true,
            ..Self::default()
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

/// Format an item with the given configuration
pub fn item_to_text(item: &Item, config: &TextConfig) -> String {
    let mut buf = String::new();
    format_item(item, config.literal, config, 0, &mut buf);
    buf
}

/// Plain text form of an item
pub fn val_to_str(item: &Item) -> String {
    item_to_text(item, &TextConfig::plain())
}

fn format_item(item: &Item, literal: bool, config: &TextConfig, depth: usize, buf: &mut String) {
    match item {
        Item::Nil => buf.push_str("NIL"),
        Item::Logical(b) => buf.push_str(if *b { ".T." } else { ".F." }),
        Item::Integer(n) => buf.push_str(&n.to_string()),
        Item::Long(n) => buf.push_str(&n.to_string()),
        Item::Double(d) => {
            let s = d.to_string();
            buf.push_str(&s);
            if !s.contains('.') && d.is_finite() {
                buf.push_str(".0");
            }
        }
        Item::Date(d) if literal => {
            buf.push_str("0d");
            if d.is_empty() {
                buf.push_str("00000000");
            } else {
                buf.push_str(&d.to_yyyymmdd());
            }
        }
        Item::Date(d) => buf.push_str(&d.to_string()),
        Item::String(s) if literal => format_string(&s.to_str_lossy(), buf),
        Item::String(s) => buf.push_str(&s.to_str_lossy()),
        Item::Array(a) => {
            if depth >= config.max_depth {
                buf.push_str("...");
                return;
            }
            buf.push('{');
            for (i, element) in a.borrow().iter().enumerate() {
                if i > 0 {
                    buf.push_str(", ");
                }
                format_item(element, true, config, depth + 1, buf);
            }
            buf.push('}');
        }
        Item::Hash(h) => {
            if depth >= config.max_depth {
                buf.push_str("...");
                return;
            }
            let h = h.borrow();
            if h.is_empty() {
                buf.push_str("{=>}");
                return;
            }
            buf.push('{');
            for (i, (key, value)) in h.iter().enumerate() {
                if i > 0 {
                    buf.push_str(", ");
                }
                format_item(key, true, config, depth + 1, buf);
                buf.push_str(" => ");
                format_item(value, true, config, depth + 1, buf);
            }
            buf.push('}');
        }
        Item::Object(o) => {
            buf.push_str("<object ");
            buf.push_str(o.borrow().class_name());
            buf.push('>');
        }
        Item::Block(_) => buf.push_str("<block>"),
        Item::Pointer(p) => buf.push_str(&format!("0x{:x}", p)),
        Item::ByRef(r) => match r.get() {
            Some(value) => format_item(&value, literal, config, depth, buf),
            None => buf.push_str("NIL"),
        },
    }
}

fn format_string(s: &str, buf: &mut String) {
    buf.push('"');
    for c in s.chars() {
        match c {
            '"' => buf.push_str("\\\""),
            '\\' => buf.push_str("\\\\"),
            '\n' => buf.push_str("\\n"),
            '\r' => buf.push_str("\\r"),
            '\t' => buf.push_str("\\t"),
            c if c.is_control() => {
                buf.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => buf.push(c),
        }
    }
    buf.push('"');
}
