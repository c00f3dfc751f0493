//! Text form of values, as produced by `print`, `&` and `str()`.

use super::{HashKey, ObjectData, Variant};
use std::fmt::{self, Write};

/// Containers nested deeper than this print as `...`.
const MAX_DEPTH: usize = 64;

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_value(f, self, false, 0)
    }
}

/// Format a float the way scripts see it: `nan`, `inf`, `-inf`, otherwise
/// the shortest representation that round-trips.
pub fn format_float(value: f64) -> String {
    let mut out = String::new();
    // Writing to a String cannot fail.
    let _ = write_float(&mut out, value);
    out
}

fn write_float(out: &mut impl Write, value: f64) -> fmt::Result {
    if value.is_nan() {
        out.write_str("nan")
    } else if value.is_infinite() {
        out.write_str(if value > 0.0 { "inf" } else { "-inf" })
    } else {
        write!(out, "{value:?}")
    }
}

fn write_value(out: &mut impl Write, value: &Variant, quoted: bool, depth: usize) -> fmt::Result {
    match value {
        Variant::Null => out.write_str("null"),
        Variant::Boolean(b) => write!(out, "{b}"),
        Variant::Integer(i) => write!(out, "{i}"),
        Variant::Float(x) => write_float(out, *x),
        Variant::String(s) if quoted => write!(out, "\"{s}\""),
        Variant::String(s) => out.write_str(s),
        Variant::Alias(alias) => write_value(out, &alias.read(), quoted, depth),
        Variant::Object(handle) => {
            if depth >= MAX_DEPTH {
                return out.write_str("...");
            }
            write_data(out, &handle.data(), handle.class().name(), depth + 1)
        }
    }
}

fn write_key(out: &mut impl Write, key: &HashKey, depth: usize) -> fmt::Result {
    write_value(out, &key.to_variant(), true, depth)
}

fn write_data(out: &mut impl Write, data: &ObjectData, class_name: &str, depth: usize) -> fmt::Result {
    match data {
        ObjectData::List(items) => {
            out.write_char('[')?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.write_str(", ")?;
                }
                write_value(out, item, true, depth)?;
            }
            out.write_char(']')
        }
        ObjectData::Table(table) => {
            out.write_char('{')?;
            for (i, (key, value)) in table.iter().enumerate() {
                if i > 0 {
                    out.write_str(", ")?;
                }
                write_key(out, key, depth)?;
                out.write_str(": ")?;
                write_value(out, value, true, depth)?;
            }
            out.write_char('}')
        }
        ObjectData::Set(set) => {
            out.write_char('{')?;
            for (i, key) in set.iter().enumerate() {
                if i > 0 {
                    out.write_str(", ")?;
                }
                write_key(out, key, depth)?;
            }
            out.write_char('}')
        }
        ObjectData::Array(array) => {
            out.write_str("@[")?;
            for (i, x) in array.as_slice().iter().enumerate() {
                if i > 0 {
                    let sep = if array.cols() > 0 && i % array.cols() == 0 { "; " } else { ", " };
                    out.write_str(sep)?;
                }
                write_float(out, *x)?;
            }
            out.write_char(']')
        }
        ObjectData::Function(function) => write!(out, "<Function {}>", function.name()),
        ObjectData::Class(class) => write!(out, "<Class {}>", class.name()),
        ObjectData::Module(module) => write!(out, "<Module {}>", module.name),
        ObjectData::Iterator(_) => write!(out, "<{class_name}>"),
        ObjectData::Native(native) => out.write_str(&native.describe()),
    }
}
