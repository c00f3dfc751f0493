//! Conversions and introspection: `type`, `len`, `str`, `bool`, `int`,
//! `float`, and the initializers of the scalar classes.

use crate::helpers::Kinds;
use rill_runtime::value::usize_to_int;
use rill_runtime::{Error, Result, Runtime, Variant};

pub fn register(rt: &mut Runtime) -> Result<()> {
    let k = Kinds::of(rt);
    let object = std::slice::from_ref(&k.object);

    rt.add_global_function("type", |rt, args| Ok(Variant::from(rt.class_of(&args[0]).name())), object, 0)?;
    rt.add_global_function("len", |_, args| length(&args[0]), object, 0)?;
    rt.add_global_function("str", |_, args| Ok(Variant::from(args[0].to_string())), object, 0)?;
    rt.add_global_function("bool", |_, args| Ok(Variant::Boolean(args[0].is_truthy())), object, 0)?;
    rt.add_global_function("int", |_, args| to_integer(&args[0]).map(Variant::Integer), object, 0)?;
    rt.add_global_function("float", |_, args| to_float(&args[0]).map(Variant::Float), object, 0)?;

    for class in [&k.string, &k.list, &k.table, &k.set, &k.array] {
        rt.add_accessor(class, "length", |_, args| length(&args[0]), None);
    }

    rt.add_initializer(&k.boolean, |_, _| Ok(Variant::Boolean(false)), &[], 0)?;
    rt.add_initializer(&k.string, |_, _| Ok(Variant::from("")), &[], 0)?;
    rt.add_initializer(&k.integer, |_, _| Ok(Variant::Integer(0)), &[], 0)?;
    rt.add_initializer(&k.float, |_, _| Ok(Variant::Float(0.0)), &[], 0)?;
    Ok(())
}

/// Number of characters of a string or elements of a container.
pub fn length(value: &Variant) -> Result<Variant> {
    let value = value.resolve();
    if let Variant::String(text) = &value {
        return Ok(Variant::Integer(usize_to_int(text.chars().count())));
    }
    value
        .with_data(|data| data.len())
        .map(|n| Variant::Integer(usize_to_int(n)))
        .ok_or_else(|| Error::type_error(format!("a value of type {} has no length", value.type_name())))
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    reason = "range is checked before the conversion"
)]
pub fn to_integer(value: &Variant) -> Result<i64> {
    match value.resolve() {
        Variant::Integer(i) => Ok(i),
        Variant::Boolean(b) => Ok(i64::from(b)),
        Variant::Float(f) => {
            let t = f.trunc();
            if t >= i64::MIN as f64 && t < i64::MAX as f64 {
                Ok(t as i64)
            } else {
                Err(Error::range_error(format!("{f} cannot be converted to an integer")))
            }
        }
        Variant::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| Error::type_error(format!("cannot convert \"{s}\" to Integer"))),
        other => Err(Error::type_error(format!(
            "cannot convert a value of type {} to Integer",
            other.type_name()
        ))),
    }
}

#[allow(clippy::cast_precision_loss, reason = "integers widen to float")]
pub fn to_float(value: &Variant) -> Result<f64> {
    match value.resolve() {
        Variant::Float(f) => Ok(f),
        Variant::Integer(i) => Ok(i as f64),
        Variant::Boolean(b) => Ok(f64::from(u8::from(b))),
        Variant::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| Error::type_error(format!("cannot convert \"{s}\" to Float"))),
        other => Err(Error::type_error(format!(
            "cannot convert a value of type {} to Float",
            other.type_name()
        ))),
    }
}
