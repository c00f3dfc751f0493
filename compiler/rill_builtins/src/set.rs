//! Set functions.

use crate::helpers::Kinds;
use rill_runtime::{Error, HashKey, ObjectData, Result, Runtime, Set, Variant};
use std::rc::Rc;

pub fn register(rt: &mut Runtime) -> Result<()> {
    let k = Kinds::of(rt);
    let set = &k.set;
    let one = [Rc::clone(set)];
    let with_value = [Rc::clone(set), Rc::clone(&k.object)];
    let two_sets = [Rc::clone(set), Rc::clone(set)];

    rt.add_initializer(set, |rt, _| Ok(rt.new_set(Set::default())), &[], 0)?;

    rt.add_global_function(
        "contains",
        |_, a| {
            let key = HashKey::from_variant(&a[1])?;
            Ok(Variant::Boolean(elements(&a[0])?.contains(&key)))
        },
        &with_value,
        0,
    )?;
    rt.add_global_function("is_empty", |_, a| Ok(Variant::Boolean(elements(&a[0])?.is_empty())), &one, 0)?;
    rt.add_global_function(
        "insert",
        |rt, a| {
            let key = HashKey::from_variant(&a[1])?;
            rt.with_set_mut(&a[0], |s| Ok(s.insert(key)))?;
            Ok(Variant::Null)
        },
        &with_value,
        0b1,
    )?;
    rt.add_global_function(
        "remove",
        |rt, a| {
            let key = HashKey::from_variant(&a[1])?;
            rt.with_set_mut(&a[0], |s| Ok(s.shift_remove(&key)))?;
            Ok(Variant::Null)
        },
        &with_value,
        0b1,
    )?;
    rt.add_global_function(
        "clear",
        |rt, a| {
            rt.with_set_mut(&a[0], |s| {
                s.clear();
                Ok(())
            })?;
            Ok(Variant::Null)
        },
        &one,
        0b1,
    )?;
    rt.add_global_function(
        "intersect",
        |rt, a| {
            let (x, y) = (elements(&a[0])?, elements(&a[1])?);
            Ok(rt.new_set(x.intersection(&y).cloned().collect()))
        },
        &two_sets,
        0,
    )?;
    rt.add_global_function(
        "unite",
        |rt, a| {
            let (x, y) = (elements(&a[0])?, elements(&a[1])?);
            Ok(rt.new_set(x.union(&y).cloned().collect()))
        },
        &two_sets,
        0,
    )?;
    rt.add_global_function(
        "subtract",
        |rt, a| {
            let (x, y) = (elements(&a[0])?, elements(&a[1])?);
            Ok(rt.new_set(x.difference(&y).cloned().collect()))
        },
        &two_sets,
        0,
    )?;
    Ok(())
}

fn elements(value: &Variant) -> Result<Set> {
    value
        .with_data(|data| match data {
            ObjectData::Set(s) => Some(s.clone()),
            _ => None,
        })
        .ok_or_else(|| Error::expected_type("Set", &value.type_name()))
}
