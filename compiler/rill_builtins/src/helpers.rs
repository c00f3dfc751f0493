//! Argument handling shared by the builtin modules.

use rill_runtime::value::usize_to_int;
use rill_runtime::{Class, Error, ObjectData, Result, Runtime, Variant};
use std::rc::Rc;

/// The built-in classes, cloned once per module for building signatures.
pub(crate) struct Kinds {
    pub object: Rc<Class>,
    pub boolean: Rc<Class>,
    pub number: Rc<Class>,
    pub integer: Rc<Class>,
    pub float: Rc<Class>,
    pub string: Rc<Class>,
    pub list: Rc<Class>,
    pub table: Rc<Class>,
    pub set: Rc<Class>,
    pub array: Rc<Class>,
    pub regex: Rc<Class>,
    pub file: Rc<Class>,
    pub module: Rc<Class>,
}

impl Kinds {
    pub(crate) fn of(rt: &Runtime) -> Self {
        let c = rt.classes();
        Kinds {
            object: Rc::clone(&c.object),
            boolean: Rc::clone(&c.boolean),
            number: Rc::clone(&c.number),
            integer: Rc::clone(&c.integer),
            float: Rc::clone(&c.float),
            string: Rc::clone(&c.string),
            list: Rc::clone(&c.list),
            table: Rc::clone(&c.table),
            set: Rc::clone(&c.set),
            array: Rc::clone(&c.array),
            regex: Rc::clone(&c.regex),
            file: Rc::clone(&c.file),
            module: Rc::clone(&c.module),
        }
    }
}

/// Write `value` into the variable behind a by-reference argument.
pub(crate) fn store(target: &Variant, value: Variant) {
    if let Variant::Alias(alias) = target {
        alias.set(value);
    }
}

/// A count argument: a non-negative integer.
pub(crate) fn count_arg(value: &Variant) -> Result<usize> {
    let n = value.to_integer()?;
    usize::try_from(n).map_err(|_| Error::range_error(format!("expected a non-negative count, got {n}")))
}

/// Byte offset of the 1-based character position `pos` in `text`.
/// Negative positions count from the end. With `allow_end`, the position
/// just past the last character is accepted.
pub(crate) fn char_offset(text: &str, pos: i64, allow_end: bool) -> Result<usize> {
    let len = text.chars().count();
    let limit = if allow_end { len + 1 } else { len };
    let index = rill_runtime::value::resolve_index(pos, limit)?;
    Ok(text.char_indices().nth(index).map_or(text.len(), |(offset, _)| offset))
}

/// 1-based character position of a byte offset.
pub(crate) fn char_position(text: &str, offset: usize) -> i64 {
    usize_to_int(text[..offset].chars().count() + 1)
}

/// Run `f` on the host value of a native object such as a regex or a file.
pub(crate) fn with_native<T: 'static, R>(
    value: &Variant,
    expected: &str,
    f: impl FnOnce(&mut T) -> Result<R>,
) -> Result<R> {
    let value = value.resolve();
    let Some(handle) = value.as_handle() else {
        return Err(Error::expected_type(expected, &value.type_name()));
    };
    let mut data = handle.data_mut();
    match &mut *data {
        ObjectData::Native(native) => match native.as_any_mut().downcast_mut::<T>() {
            Some(inner) => f(inner),
            None => Err(Error::expected_type(expected, handle.class().name())),
        },
        _ => Err(Error::expected_type(expected, handle.class().name())),
    }
}
