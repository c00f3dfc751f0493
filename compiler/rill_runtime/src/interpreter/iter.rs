//! `foreach` iteration.
//!
//! An iterator object holds the collection and a position. `NextKey`
//! reads the key at the position; `NextValue` reads the value and
//! advances. Keys are 1-based positions for lists, arrays, sets and
//! strings, and the keys themselves for tables.

use super::exec::alias_slot;
use super::Runtime;
use crate::error::{Error, Result};
use crate::value::{usize_to_int, IterSource, IterState, ObjectData, Variant};
use std::rc::Rc;

impl Runtime {
    pub(super) fn new_iterator(&mut self, collection: &Variant, by_ref: bool) -> Result<Variant> {
        let source = match collection.resolve() {
            Variant::String(text) => IterSource::String(text),
            Variant::Object(handle) => {
                let iterable = matches!(
                    &*handle.data(),
                    ObjectData::List(_) | ObjectData::Table(_) | ObjectData::Set(_) | ObjectData::Array(_)
                );
                if !iterable {
                    return Err(not_iterable(&Variant::Object(handle)));
                }
                IterSource::Object(handle)
            }
            other => return Err(not_iterable(&other)),
        };
        if by_ref {
            let referenceable = match &source {
                IterSource::Object(handle) => {
                    matches!(&*handle.data(), ObjectData::List(_) | ObjectData::Table(_))
                }
                IterSource::String(_) => false,
            };
            if !referenceable {
                return Err(Error::reference_error(format!(
                    "cannot iterate by reference over a value of type {}",
                    collection.type_name()
                )));
            }
        }
        let class = Rc::clone(&self.classes.iterator);
        let state = IterState::new(source, by_ref);
        Ok(Variant::Object(self.new_object(&class, ObjectData::Iterator(state))))
    }

    /// The value at the iterator's position, after which it advances. In a
    /// by-reference loop the element becomes an alias.
    pub(super) fn next_value(&mut self, iterator: &Variant) -> Result<Variant> {
        let handle = iterator_handle(iterator)?;
        let mut data = handle.data_mut();
        let ObjectData::Iterator(state) = &mut *data else {
            return Err(Error::internal("expected an iterator"));
        };
        let value = match &state.source {
            IterSource::String(text) => {
                let next = text.get(state.pos..).and_then(|rest| rest.chars().next());
                match next {
                    Some(c) => {
                        state.pos += c.len_utf8();
                        Variant::from(c.to_string())
                    }
                    None => Variant::Null,
                }
            }
            IterSource::Object(source) => {
                let pos = state.pos;
                state.pos += 1;
                let mut source_data = source.data_mut();
                match &mut *source_data {
                    ObjectData::List(items) => match items.get_mut(pos) {
                        Some(slot) if state.by_ref => Variant::Alias(alias_slot(&mut self.collector, slot)),
                        Some(slot) => slot.resolve(),
                        None => Variant::Null,
                    },
                    ObjectData::Table(table) => match table.get_index_mut(pos) {
                        Some((_, slot)) if state.by_ref => Variant::Alias(alias_slot(&mut self.collector, slot)),
                        Some((_, slot)) => slot.resolve(),
                        None => Variant::Null,
                    },
                    ObjectData::Set(set) => set.get_index(pos).map_or(Variant::Null, |key| key.to_variant()),
                    ObjectData::Array(array) => array
                        .as_slice()
                        .get(pos)
                        .map_or(Variant::Null, |x| Variant::Float(*x)),
                    _ => Variant::Null,
                }
            }
        };
        state.count += 1;
        Ok(value)
    }
}

/// Whether the iterator has a value left.
pub(super) fn has_next(iterator: &Variant) -> Result<bool> {
    let handle = iterator_handle(iterator)?;
    let data = handle.data();
    let ObjectData::Iterator(state) = &*data else {
        return Err(Error::internal("expected an iterator"));
    };
    Ok(match &state.source {
        IterSource::String(text) => state.pos < text.len(),
        IterSource::Object(source) => source.data().len().is_some_and(|len| state.pos < len),
    })
}

/// The key at the iterator's position.
pub(super) fn current_key(iterator: &Variant) -> Result<Variant> {
    let handle = iterator_handle(iterator)?;
    let data = handle.data();
    let ObjectData::Iterator(state) = &*data else {
        return Err(Error::internal("expected an iterator"));
    };
    let position = Variant::Integer(usize_to_int(state.count + 1));
    Ok(match &state.source {
        IterSource::Object(source) => match &*source.data() {
            ObjectData::Table(table) => table
                .get_index(state.pos)
                .map_or(Variant::Null, |(key, _)| key.to_variant()),
            _ => position,
        },
        IterSource::String(_) => position,
    })
}

fn iterator_handle(iterator: &Variant) -> Result<&crate::value::Handle> {
    iterator
        .as_handle()
        .ok_or_else(|| Error::internal("expected an iterator"))
}

#[cold]
fn not_iterable(value: &Variant) -> Error {
    Error::type_error(format!("a value of type {} cannot be iterated", value.type_name()))
}
