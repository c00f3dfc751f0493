//! Table functions and the `keys`, `values` accessors.

use crate::helpers::Kinds;
use rill_runtime::{Error, HashKey, ObjectData, Result, Runtime, Table, Variant};
use std::rc::Rc;

pub fn register(rt: &mut Runtime) -> Result<()> {
    let k = Kinds::of(rt);
    let table = &k.table;
    let one = [Rc::clone(table)];
    let with_key = [Rc::clone(table), Rc::clone(&k.object)];

    rt.add_initializer(table, |rt, _| Ok(rt.new_table(Table::default())), &[], 0)?;

    rt.add_global_function(
        "contains",
        |_, a| {
            Ok(Variant::Boolean(lookup(&a[0], &a[1])?.is_some()))
        },
        &with_key,
        0,
    )?;
    rt.add_global_function("is_empty", |_, a| Ok(Variant::Boolean(a[0].to_table()?.is_empty())), &one, 0)?;
    rt.add_global_function("get", |_, a| get(&a[0], &a[1], Variant::Null), &with_key, 0)?;
    rt.add_global_function(
        "get",
        |_, a| get(&a[0], &a[1], a[2].resolve()),
        &[Rc::clone(table), Rc::clone(&k.object), Rc::clone(&k.object)],
        0,
    )?;
    rt.add_global_function(
        "clear",
        |rt, a| {
            rt.with_table_mut(&a[0], |t| {
                t.clear();
                Ok(())
            })?;
            Ok(Variant::Null)
        },
        &one,
        0b1,
    )?;
    rt.add_global_function(
        "remove",
        |rt, a| {
            let key = HashKey::from_variant(&a[1])?;
            rt.with_table_mut(&a[0], |t| Ok(t.shift_remove(&key)))?;
            Ok(Variant::Null)
        },
        &with_key,
        0b1,
    )?;

    rt.add_accessor(
        table,
        "keys",
        |rt, args| {
            let keys = args[0].to_table()?.keys().map(HashKey::to_variant).collect();
            Ok(rt.new_list(keys))
        },
        None,
    );
    rt.add_accessor(
        table,
        "values",
        |rt, args| {
            let values = args[0].to_table()?.into_values().collect();
            Ok(rt.new_list(values))
        },
        None,
    );
    Ok(())
}

fn get(table: &Variant, key: &Variant, default: Variant) -> Result<Variant> {
    Ok(lookup(table, key)?.unwrap_or(default))
}

fn lookup(table: &Variant, key: &Variant) -> Result<Option<Variant>> {
    let key = HashKey::from_variant(key)?;
    table
        .with_data(|data| match data {
            ObjectData::Table(t) => Some(t.get(&key).map(Variant::resolve)),
            _ => None,
        })
        .ok_or_else(|| Error::expected_type("Table", &table.type_name()))
}
