//! Numeric functions and constants.
//!
//! Unary functions accept a number and return a float, or an array and
//! apply element-wise. `abs`, `min` and `max` keep integers integral.

use crate::helpers::Kinds;
use rill_runtime::{Array, Error, Result, Runtime, Variant};
use std::rc::Rc;

const UNARY: &[(&str, fn(f64) -> f64)] = &[
    ("sqrt", f64::sqrt),
    ("exp", f64::exp),
    ("log", f64::ln),
    ("log10", f64::log10),
    ("log2", f64::log2),
    ("sin", f64::sin),
    ("cos", f64::cos),
    ("tan", f64::tan),
    ("asin", f64::asin),
    ("acos", f64::acos),
    ("atan", f64::atan),
    ("floor", f64::floor),
    ("ceil", f64::ceil),
    ("round", f64::round),
];

pub fn register(rt: &mut Runtime) -> Result<()> {
    let k = Kinds::of(rt);
    let number = &k.number;
    let integer = &k.integer;
    let array = &k.array;

    for &(name, f) in UNARY {
        rt.add_global_function(name, move |_, args| Ok(Variant::Float(f(args[0].to_number()?))), &[Rc::clone(number)], 0)?;
        rt.add_global_function(name, move |rt, args| map_array(rt, &args[0], f), &[Rc::clone(array)], 0)?;
    }

    rt.add_global_function(
        "atan2",
        |_, args| Ok(Variant::Float(args[0].to_number()?.atan2(args[1].to_number()?))),
        &[Rc::clone(number), Rc::clone(number)],
        0,
    )?;
    rt.add_global_function(
        "round",
        |_, args| Ok(Variant::Float(round_to(args[0].to_number()?, args[1].to_integer()?))),
        &[Rc::clone(number), Rc::clone(integer)],
        0,
    )?;

    rt.add_global_function(
        "abs",
        |_, args| {
            let i = args[0].to_integer()?;
            i.checked_abs()
                .map(Variant::Integer)
                .ok_or_else(|| Error::integer_overflow("abs"))
        },
        &[Rc::clone(integer)],
        0,
    )?;
    rt.add_global_function("abs", |_, args| Ok(Variant::Float(args[0].to_number()?.abs())), &[Rc::clone(number)], 0)?;
    rt.add_global_function("abs", |rt, args| map_array(rt, &args[0], f64::abs), &[Rc::clone(array)], 0)?;

    let pair = [Rc::clone(integer), Rc::clone(integer)];
    rt.add_global_function("min", |_, args| Ok(Variant::Integer(args[0].to_integer()?.min(args[1].to_integer()?))), &pair, 0)?;
    rt.add_global_function("max", |_, args| Ok(Variant::Integer(args[0].to_integer()?.max(args[1].to_integer()?))), &pair, 0)?;
    let pair = [Rc::clone(number), Rc::clone(number)];
    rt.add_global_function("min", |_, args| Ok(Variant::Float(args[0].to_number()?.min(args[1].to_number()?))), &pair, 0)?;
    rt.add_global_function("max", |_, args| Ok(Variant::Float(args[0].to_number()?.max(args[1].to_number()?))), &pair, 0)?;

    rt.add_global_function("random", |_, _| Ok(Variant::Float(fastrand::f64())), &[], 0)?;
    rt.add_global_function(
        "random",
        |_, args| {
            let n = args[0].to_integer()?;
            if n < 1 {
                return Err(Error::range_error(format!("random({n}): the upper bound must be positive")));
            }
            Ok(Variant::Integer(fastrand::i64(1..=n)))
        },
        &[Rc::clone(integer)],
        0,
    )?;

    rt.add_global("PI", Variant::Float(std::f64::consts::PI));
    rt.add_global("E", Variant::Float(std::f64::consts::E));
    rt.add_global("SQRT2", Variant::Float(std::f64::consts::SQRT_2));
    rt.add_global("PHI", Variant::Float(1.618_033_988_749_895));
    Ok(())
}

/// Round to `digits` decimal places; negative digits round to tens,
/// hundreds and so on.
pub fn round_to(x: f64, digits: i64) -> f64 {
    let digits = i32::try_from(digits.clamp(-308, 308)).unwrap_or(0);
    let scale = 10f64.powi(digits);
    (x * scale).round() / scale
}

fn map_array(rt: &mut Runtime, value: &Variant, f: fn(f64) -> f64) -> Result<Variant> {
    let array = value.to_array()?;
    let data = array.as_slice().iter().map(|&x| f(x)).collect();
    Ok(rt.new_array(Array::new(array.rows(), array.cols(), data)?))
}
