//! Numeric arrays: constructors, reductions and the `nrow`, `ncol`
//! accessors.

use crate::helpers::{count_arg, Kinds};
use rill_runtime::value::usize_to_int;
use rill_runtime::{Array, Error, Result, Runtime, Variant};
use std::rc::Rc;

pub fn register(rt: &mut Runtime) -> Result<()> {
    let k = Kinds::of(rt);
    let array = &k.array;
    let one = [Rc::clone(array)];
    let size = [Rc::clone(&k.integer)];
    let shape = [Rc::clone(&k.integer), Rc::clone(&k.integer)];

    for (name, fill) in [("zeros", 0.0), ("ones", 1.0)] {
        rt.add_global_function(name, move |rt, a| filled(rt, 1, count_arg(&a[0])?, fill), &size, 0)?;
        rt.add_global_function(
            name,
            move |rt, a| filled(rt, count_arg(&a[0])?, count_arg(&a[1])?, fill),
            &shape,
            0,
        )?;
    }
    rt.add_initializer(array, |rt, a| filled(rt, 1, count_arg(&a[0])?, 0.0), &size, 0)?;
    rt.add_initializer(array, |rt, a| filled(rt, count_arg(&a[0])?, count_arg(&a[1])?, 0.0), &shape, 0)?;

    rt.add_global_function("min", |_, a| extremum(&a[0], f64::min), &one, 0)?;
    rt.add_global_function("max", |_, a| extremum(&a[0], f64::max), &one, 0)?;
    rt.add_global_function(
        "transpose",
        |rt, a| {
            let source = a[0].to_array()?;
            let (rows, cols) = (source.rows(), source.cols());
            let mut result = Array::zeros(cols, rows)?;
            let data = source.as_slice();
            for (at, x) in result.as_mut_slice().iter_mut().enumerate() {
                let (i, j) = (at / rows, at % rows);
                *x = data[j * cols + i];
            }
            Ok(rt.new_array(result))
        },
        &one,
        0,
    )?;
    rt.add_global_function(
        "clear",
        |rt, a| {
            rt.with_array_mut(&a[0], |array| {
                array.as_mut_slice().fill(0.0);
                Ok(())
            })?;
            Ok(Variant::Null)
        },
        &one,
        0b1,
    )?;

    rt.add_accessor(array, "nrow", |_, a| Ok(Variant::Integer(usize_to_int(a[0].to_array()?.rows()))), None);
    rt.add_accessor(array, "ncol", |_, a| Ok(Variant::Integer(usize_to_int(a[0].to_array()?.cols()))), None);
    Ok(())
}

fn filled(rt: &mut Runtime, rows: usize, cols: usize, value: f64) -> Result<Variant> {
    let mut array = Array::zeros(rows, cols)?;
    array.as_mut_slice().fill(value);
    Ok(rt.new_array(array))
}

fn extremum(value: &Variant, pick: fn(f64, f64) -> f64) -> Result<Variant> {
    let array = value.to_array()?;
    array
        .as_slice()
        .iter()
        .copied()
        .reduce(pick)
        .map(Variant::Float)
        .ok_or_else(|| Error::range_error("the array is empty"))
}
