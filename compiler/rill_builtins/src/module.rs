//! The `Module` class: a named namespace whose members are fields.

use crate::helpers::Kinds;
use rill_runtime::{Error, ObjectData, Result, Runtime, Variant};
use std::rc::Rc;

pub fn register(rt: &mut Runtime) -> Result<()> {
    let k = Kinds::of(rt);
    let module = &k.module;

    rt.add_initializer(
        module,
        |rt, a| {
            let name = a[0].to_text()?;
            Ok(rt.new_module(&name))
        },
        &[Rc::clone(&k.string)],
        0,
    )?;
    rt.add_global_function(
        "contains",
        |_, a| {
            let key = a[1].to_text()?;
            let found = a[0].with_data(|data| match data {
                ObjectData::Module(m) => Some(m.contains(&key)),
                _ => None,
            });
            found
                .map(Variant::Boolean)
                .ok_or_else(|| Error::expected_type("Module", &a[0].type_name()))
        },
        &[Rc::clone(module), Rc::clone(&k.string)],
        0,
    )?;
    Ok(())
}
