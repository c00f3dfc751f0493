//! Indexing and field access.
//!
//! Reads resolve aliases. The `*_alias` forms turn the element into an
//! alias cell so a `ref` parameter or a `foreach ref` loop can write to it;
//! the `unique_*` forms return an element that may be mutated in place.
//! Both expect a container that was itself obtained through the unique
//! path.

use super::exec::{alias_slot, assign, unique_slot};
use super::Runtime;
use crate::error::{Error, Result};
use crate::value::{resolve_index, Alias, Array, HashKey, ObjectData, ScriptModule, Set, Table, Variant};
use std::rc::Rc;

impl Runtime {
    pub(super) fn get_index(&self, container: &Variant, indices: &[Variant]) -> Result<Variant> {
        let container = container.resolve();
        let handle = match &container {
            Variant::String(text) => return string_index(text, indices),
            Variant::Object(handle) => handle,
            other => return Err(not_indexable(other)),
        };
        let data = handle.data();
        match &*data {
            ObjectData::List(items) => {
                let at = resolve_index(single_integer(indices)?, items.len())?;
                Ok(items[at].resolve())
            }
            ObjectData::Table(table) => {
                let key = single_key(indices)?;
                table
                    .get(&key)
                    .map(Variant::resolve)
                    .ok_or_else(|| Error::key_not_found(&key.to_variant().to_string()))
            }
            ObjectData::Set(set) => Ok(Variant::Boolean(set.contains(&single_key(indices)?))),
            ObjectData::Array(array) => {
                let at = array.offset(&integers(indices)?)?;
                Ok(Variant::Float(array.as_slice()[at]))
            }
            ObjectData::Module(module) => module.get(&member_name(indices)?),
            _ => Err(not_indexable(&container)),
        }
    }

    pub(super) fn index_alias(&mut self, container: &Variant, indices: &[Variant]) -> Result<Rc<Alias>> {
        let container = container.resolve();
        let Variant::Object(handle) = &container else {
            return Err(not_referenceable(&container));
        };
        let mut data = handle.data_mut();
        match &mut *data {
            ObjectData::List(items) => {
                let at = resolve_index(single_integer(indices)?, items.len())?;
                Ok(alias_slot(&mut self.collector, &mut items[at]))
            }
            ObjectData::Table(table) => {
                let key = single_key(indices)?;
                let slot = table.entry(key).or_default();
                Ok(alias_slot(&mut self.collector, slot))
            }
            ObjectData::Module(module) => {
                let slot = module.members.entry(member_name(indices)?).or_default();
                Ok(alias_slot(&mut self.collector, slot))
            }
            _ => Err(not_referenceable(&container)),
        }
    }

    pub(super) fn unique_index(&mut self, container: &Variant, indices: &[Variant]) -> Result<Variant> {
        let container = container.resolve();
        let Variant::Object(handle) = &container else {
            return self.get_index(&container, indices);
        };
        // The element is moved out while it is made unique: it may be the
        // container itself.
        let taken = {
            let mut data = handle.data_mut();
            match &mut *data {
                ObjectData::List(items) => {
                    let at = resolve_index(single_integer(indices)?, items.len())?;
                    Some((std::mem::take(&mut items[at]), Slot::Position(at)))
                }
                ObjectData::Table(table) => {
                    let key = single_key(indices)?;
                    let Some(value) = table.get_mut(&key) else {
                        return Err(Error::key_not_found(&key.to_variant().to_string()));
                    };
                    Some((std::mem::take(value), Slot::Key(key)))
                }
                _ => None,
            }
        };
        let Some((mut element, put_back)) = taken else {
            return self.get_index(&container, indices);
        };
        let value = unique_slot(&mut self.collector, &mut element);
        put_back.store(handle, element);
        Ok(value)
    }

    pub(super) fn set_index(&mut self, container: &Variant, indices: &[Variant], value: Variant) -> Result<()> {
        let container = container.resolve();
        let value = value.into_resolved();
        let handle = match &container {
            Variant::Object(handle) => handle,
            Variant::String(_) => return Err(Error::type_error("strings cannot be modified")),
            other => return Err(not_indexable(other)),
        };
        let mut data = handle.data_mut();
        match &mut *data {
            ObjectData::List(items) => {
                let at = resolve_index(single_integer(indices)?, items.len())?;
                assign(&mut items[at], value);
            }
            ObjectData::Table(table) => {
                let key = single_key(indices)?;
                match table.get_mut(&key) {
                    Some(slot) => assign(slot, value),
                    None => {
                        table.insert(key, value);
                    }
                }
            }
            ObjectData::Set(set) => {
                let key = single_key(indices)?;
                if value.is_truthy() {
                    set.insert(key);
                } else {
                    set.shift_remove(&key);
                }
            }
            ObjectData::Array(array) => {
                let at = array.offset(&integers(indices)?)?;
                array.as_mut_slice()[at] = value.to_number()?;
            }
            ObjectData::Module(module) => set_member(module, &member_name(indices)?, value),
            _ => return Err(not_indexable(&container)),
        }
        Ok(())
    }

    /// Field read: an accessor, then a string key of a table or a module
    /// member, then a class member.
    pub(super) fn get_field(&mut self, object: &Variant, name: &Rc<str>) -> Result<Variant> {
        let object = object.resolve();
        let class = self.class_of(&object);
        if let Some(accessor) = class.accessor(name) {
            let mut args = [object];
            return Ok((accessor.getter)(self, &mut args[..])?.into_resolved());
        }

        let mut is_table = false;
        if let Variant::Object(handle) = &object {
            match &*handle.data() {
                ObjectData::Table(table) => {
                    if let Some(value) = table.get(&HashKey::String(Rc::clone(name))) {
                        return Ok(value.resolve());
                    }
                    is_table = true;
                }
                ObjectData::Class(described) => {
                    if let Some(member) = described.member(name) {
                        return Ok(member);
                    }
                }
                ObjectData::Module(module) => return module.get(name),
                _ => {}
            }
        }
        if let Some(member) = class.member(name) {
            return Ok(member);
        }
        if is_table {
            Err(Error::key_not_found(name))
        } else {
            Err(Error::name_error(format!(
                "a value of type {} has no member \"{name}\"",
                class.name()
            )))
        }
    }

    pub(super) fn field_alias(&mut self, object: &Variant, name: &Rc<str>) -> Result<Rc<Alias>> {
        let object = object.resolve();
        if let Variant::Object(handle) = &object {
            match &mut *handle.data_mut() {
                ObjectData::Table(table) => {
                    let slot = table.entry(HashKey::String(Rc::clone(name))).or_default();
                    return Ok(alias_slot(&mut self.collector, slot));
                }
                ObjectData::Module(module) => {
                    let slot = module.members.entry(Rc::clone(name)).or_default();
                    return Ok(alias_slot(&mut self.collector, slot));
                }
                _ => {}
            }
        }
        Err(not_referenceable(&object))
    }

    pub(super) fn unique_field(&mut self, object: &Variant, name: &Rc<str>) -> Result<Variant> {
        let object = object.resolve();
        let key = HashKey::String(Rc::clone(name));
        let taken = match &object {
            Variant::Object(handle) => match &mut *handle.data_mut() {
                ObjectData::Table(table) => Some((
                    table
                        .get_mut(&key)
                        .map(std::mem::take)
                        .ok_or_else(|| Error::key_not_found(name))?,
                    Slot::Key(key),
                )),
                ObjectData::Module(module) => {
                    if !module.contains(name) {
                        return Err(module.missing(name));
                    }
                    module
                        .members
                        .get_mut(name)
                        .map(|slot| (std::mem::take(slot), Slot::Member(Rc::clone(name))))
                }
                _ => None,
            },
            _ => None,
        };
        match (taken, &object) {
            (Some((mut element, put_back)), Variant::Object(handle)) => {
                let value = unique_slot(&mut self.collector, &mut element);
                put_back.store(handle, element);
                Ok(value)
            }
            _ => self.get_field(&object, name),
        }
    }

    /// Field write: an accessor setter, a string key of a table, or a
    /// module member.
    pub(super) fn set_field(&mut self, object: &Variant, name: &Rc<str>, value: Variant) -> Result<()> {
        let object = object.resolve();
        let value = value.into_resolved();
        let class = self.class_of(&object);
        if let Some(accessor) = class.accessor(name) {
            let Some(setter) = accessor.setter else {
                return Err(Error::reference_error(format!(
                    "field \"{name}\" of {} is read-only",
                    class.name()
                )));
            };
            let mut args = [object, value];
            setter(self, &mut args[..])?;
            return Ok(());
        }
        if let Variant::Object(handle) = &object {
            match &mut *handle.data_mut() {
                ObjectData::Table(table) => {
                    let key = HashKey::String(Rc::clone(name));
                    match table.get_mut(&key) {
                        Some(slot) => assign(slot, value),
                        None => {
                            table.insert(key, value);
                        }
                    }
                    return Ok(());
                }
                ObjectData::Module(module) => {
                    set_member(module, name, value);
                    return Ok(());
                }
                _ => {}
            }
        }
        Err(Error::type_error(format!(
            "cannot set field \"{name}\" on a value of type {}",
            class.name()
        )))
    }

    // -------------------------------------------------------------------------
    // Literals
    // -------------------------------------------------------------------------

    /// Build a table from alternating keys and values.
    pub(super) fn build_table(&mut self, values: Vec<Variant>) -> Result<Variant> {
        let mut table = Table::default();
        let mut values = values.into_iter();
        while let (Some(key), Some(value)) = (values.next(), values.next()) {
            table.insert(HashKey::from_variant(&key)?, value.into_resolved());
        }
        Ok(self.new_table(table))
    }

    pub(super) fn build_set(&mut self, values: &[Variant]) -> Result<Variant> {
        let set = values
            .iter()
            .map(HashKey::from_variant)
            .collect::<Result<Set>>()?;
        Ok(self.new_set(set))
    }

    pub(super) fn build_array(&mut self, rows: usize, cols: usize, values: &[Variant]) -> Result<Variant> {
        let data = values
            .iter()
            .map(Variant::to_number)
            .collect::<Result<Vec<f64>>>()?;
        Ok(self.new_array(Array::new(rows, cols, data)?))
    }
}

/// Where an element taken out of a container goes back.
enum Slot {
    Position(usize),
    Key(HashKey),
    Member(Rc<str>),
}

impl Slot {
    fn store(self, handle: &crate::value::Handle, value: Variant) {
        match (self, &mut *handle.data_mut()) {
            (Slot::Position(at), ObjectData::List(items)) => {
                if let Some(slot) = items.get_mut(at) {
                    *slot = value;
                }
            }
            (Slot::Key(key), ObjectData::Table(table)) => {
                table.insert(key, value);
            }
            (Slot::Member(name), ObjectData::Module(module)) => {
                module.members.insert(name, value);
            }
            _ => {}
        }
    }
}

/// Convert an index value: an integer, or a float with an integral value.
#[allow(clippy::cast_possible_truncation, reason = "integral floats convert exactly")]
fn integer_index(value: &Variant) -> Result<i64> {
    match value.resolve() {
        Variant::Integer(i) => Ok(i),
        Variant::Float(f) if f.fract() == 0.0 && f.abs() < 9.0e18 => Ok(f as i64),
        other => Err(Error::type_error(format!(
            "an index must be an integer, not a value of type {}",
            other.type_name()
        ))),
    }
}

fn integers(indices: &[Variant]) -> Result<Vec<i64>> {
    indices.iter().map(integer_index).collect()
}

fn single(indices: &[Variant]) -> Result<&Variant> {
    match indices {
        [index] => Ok(index),
        _ => Err(Error::index_error(format!(
            "expected 1 index, got {}",
            indices.len()
        ))),
    }
}

fn single_integer(indices: &[Variant]) -> Result<i64> {
    integer_index(single(indices)?)
}

fn single_key(indices: &[Variant]) -> Result<HashKey> {
    HashKey::from_variant(single(indices)?)
}

/// A module member named by a single string index.
fn member_name(indices: &[Variant]) -> Result<Rc<str>> {
    match single(indices)?.resolve() {
        Variant::String(name) => Ok(name),
        other => Err(Error::expected_type("String", &other.type_name())),
    }
}

fn set_member(module: &mut ScriptModule, name: &Rc<str>, value: Variant) {
    match module.members.get_mut(name) {
        Some(slot) => assign(slot, value),
        None => {
            module.members.insert(Rc::clone(name), value);
        }
    }
}

fn string_index(text: &str, indices: &[Variant]) -> Result<Variant> {
    let index = single_integer(indices)?;
    let len = text.chars().count();
    let at = resolve_index(index, len)?;
    text.chars()
        .nth(at)
        .map(|c| Variant::from(c.to_string()))
        .ok_or_else(|| Error::index_out_of_range(index, len))
}

#[cold]
fn not_indexable(value: &Variant) -> Error {
    Error::type_error(format!("a value of type {} cannot be indexed", value.type_name()))
}

#[cold]
fn not_referenceable(value: &Variant) -> Error {
    Error::reference_error(format!(
        "cannot reference an element of a value of type {}",
        value.type_name()
    ))
}
