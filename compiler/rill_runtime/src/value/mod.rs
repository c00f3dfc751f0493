//! The universal value type and its indirection cell.
//!
//! [`Variant`] is a closed sum type over the primitive kinds plus two
//! pointer kinds: [`Handle`] for boxed objects and [`Alias`] for shared
//! storage cells (reference parameters and captured variables).
//!
//! Containers behave as values: assigning a list copies it logically.
//! The copy is deferred until a shared container is about to be mutated,
//! see [`Runtime::unique_handle`](crate::Runtime::unique_handle).

mod display;
mod object;

pub use display::format_float;
pub use object::{
    resolve_index, Array, HashKey, IterSource, IterState, Members, NativeData, Object, ObjectData, ScriptModule, Set, Table,
};

use crate::error::{Error, Result};
use std::cell::{Cell, Ref, RefCell};
use std::cmp::Ordering;
use std::rc::Rc;

/// Shared owning reference to a boxed object.
pub type Handle = Rc<Object>;

#[derive(Clone, Debug, Default)]
pub enum Variant {
    #[default]
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(Rc<str>),
    Object(Handle),
    Alias(Rc<Alias>),
}

/// A storage cell shared by several variables.
///
/// An alias never contains another alias.
#[derive(Debug, Default)]
pub struct Alias {
    value: RefCell<Variant>,
    pub(crate) mark: Cell<u32>,
}

impl Alias {
    pub(crate) fn new(value: Variant) -> Self {
        Alias {
            value: RefCell::new(value.resolve()),
            mark: Cell::new(0),
        }
    }

    pub fn get(&self) -> Variant {
        self.value.borrow().clone()
    }

    pub fn read(&self) -> Ref<'_, Variant> {
        self.value.borrow()
    }

    pub fn set(&self, value: Variant) {
        let old = self.value.replace(value.resolve());
        drop(old);
    }

    pub(crate) fn take(&self) -> Variant {
        self.value.take()
    }
}

impl Variant {
    /// Follow one level of [`Alias`].
    #[inline]
    pub fn resolve(&self) -> Variant {
        match self {
            Variant::Alias(alias) => alias.get(),
            other => other.clone(),
        }
    }

    /// Consume `self`, following one level of [`Alias`].
    #[inline]
    pub fn into_resolved(self) -> Variant {
        match self {
            Variant::Alias(alias) => alias.get(),
            other => other,
        }
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        match self {
            Variant::Null => true,
            Variant::Alias(alias) => alias.read().is_null(),
            _ => false,
        }
    }

    #[inline]
    pub fn is_alias(&self) -> bool {
        matches!(self, Variant::Alias(_))
    }

    /// `null` and `false` are false, numbers are false when zero or NaN.
    pub fn is_truthy(&self) -> bool {
        match self {
            Variant::Null => false,
            Variant::Boolean(b) => *b,
            Variant::Integer(i) => *i != 0,
            Variant::Float(f) => !(*f == 0.0 || f.is_nan()),
            Variant::String(_) | Variant::Object(_) => true,
            Variant::Alias(alias) => alias.read().is_truthy(),
        }
    }

    /// Name of the value's class.
    pub fn type_name(&self) -> String {
        match self {
            Variant::Null => "Null".to_string(),
            Variant::Boolean(_) => "Boolean".to_string(),
            Variant::Integer(_) => "Integer".to_string(),
            Variant::Float(_) => "Float".to_string(),
            Variant::String(_) => "String".to_string(),
            Variant::Object(handle) => handle.class().name().to_string(),
            Variant::Alias(alias) => alias.read().type_name(),
        }
    }

    pub fn as_handle(&self) -> Option<&Handle> {
        match self {
            Variant::Object(handle) => Some(handle),
            _ => None,
        }
    }

    // -------------------------------------------------------------------------
    // Marshaling
    // -------------------------------------------------------------------------

    pub fn to_integer(&self) -> Result<i64> {
        match self.resolve() {
            Variant::Integer(i) => Ok(i),
            other => Err(Error::expected_type("Integer", &other.type_name())),
        }
    }

    pub fn to_float(&self) -> Result<f64> {
        match self.resolve() {
            Variant::Float(f) => Ok(f),
            other => Err(Error::expected_type("Float", &other.type_name())),
        }
    }

    /// Integer or float, widened to `f64`.
    #[allow(clippy::cast_precision_loss, reason = "numbers widen to float")]
    pub fn to_number(&self) -> Result<f64> {
        match self.resolve() {
            Variant::Integer(i) => Ok(i as f64),
            Variant::Float(f) => Ok(f),
            other => Err(Error::expected_type("Number", &other.type_name())),
        }
    }

    pub fn to_boolean(&self) -> Result<bool> {
        match self.resolve() {
            Variant::Boolean(b) => Ok(b),
            other => Err(Error::expected_type("Boolean", &other.type_name())),
        }
    }

    /// The text of a string value. Named `to_text` because `to_string`
    /// is the display form of any value.
    pub fn to_text(&self) -> Result<Rc<str>> {
        match self.resolve() {
            Variant::String(s) => Ok(s),
            other => Err(Error::expected_type("String", &other.type_name())),
        }
    }

    /// A copy of a list's items, resolved.
    pub fn to_list(&self) -> Result<Vec<Variant>> {
        self.with_data(|data| match data {
            ObjectData::List(items) => Some(items.iter().map(Variant::resolve).collect()),
            _ => None,
        })
        .ok_or_else(|| Error::expected_type("List", &self.type_name()))
    }

    /// A copy of a table's entries, resolved.
    pub fn to_table(&self) -> Result<Table> {
        self.with_data(|data| match data {
            ObjectData::Table(table) => Some(
                table
                    .iter()
                    .map(|(k, v)| (k.clone(), v.resolve()))
                    .collect(),
            ),
            _ => None,
        })
        .ok_or_else(|| Error::expected_type("Table", &self.type_name()))
    }

    pub fn to_array(&self) -> Result<Array> {
        self.with_data(|data| match data {
            ObjectData::Array(array) => Some(array.clone()),
            _ => None,
        })
        .ok_or_else(|| Error::expected_type("Array", &self.type_name()))
    }

    /// Run `f` on the object data behind this value, if it is an object.
    pub fn with_data<R>(&self, f: impl FnOnce(&ObjectData) -> Option<R>) -> Option<R> {
        match self {
            Variant::Object(handle) => f(&handle.data()),
            Variant::Alias(alias) => alias.read().with_data(f),
            _ => None,
        }
    }

    // -------------------------------------------------------------------------
    // Equality and ordering
    // -------------------------------------------------------------------------

    /// Structural equality for strings, numbers and containers; identity
    /// for every other object. Values of unrelated kinds are unequal.
    #[allow(clippy::cast_precision_loss, reason = "mixed comparisons widen to float")]
    pub fn equals(&self, other: &Variant) -> bool {
        match (self, other) {
            (Variant::Alias(a), _) => a.read().equals(other),
            (_, Variant::Alias(b)) => self.equals(&b.read()),
            (Variant::Null, Variant::Null) => true,
            (Variant::Boolean(a), Variant::Boolean(b)) => a == b,
            (Variant::Integer(a), Variant::Integer(b)) => a == b,
            (Variant::Float(a), Variant::Float(b)) => a == b,
            (Variant::Integer(a), Variant::Float(b)) | (Variant::Float(b), Variant::Integer(a)) => {
                *a as f64 == *b
            }
            (Variant::String(a), Variant::String(b)) => a == b,
            (Variant::Object(a), Variant::Object(b)) => {
                Rc::ptr_eq(a, b) || rill_stack::ensure_sufficient_stack(|| a.data_equals(b))
            }
            _ => false,
        }
    }

    /// Ordering between comparable values. `Ok(None)` means the values are
    /// comparable kinds but unordered (NaN).
    #[allow(clippy::cast_precision_loss, reason = "mixed comparisons widen to float")]
    pub fn compare(&self, other: &Variant) -> Result<Option<Ordering>> {
        match (self, other) {
            (Variant::Alias(a), _) => a.read().compare(other),
            (_, Variant::Alias(b)) => self.compare(&b.read()),
            (Variant::Integer(a), Variant::Integer(b)) => Ok(Some(a.cmp(b))),
            (Variant::Float(a), Variant::Float(b)) => Ok(a.partial_cmp(b)),
            (Variant::Integer(a), Variant::Float(b)) => Ok((*a as f64).partial_cmp(b)),
            (Variant::Float(a), Variant::Integer(b)) => Ok(a.partial_cmp(&(*b as f64))),
            (Variant::String(a), Variant::String(b)) => Ok(Some(a.cmp(b))),
            (Variant::Boolean(a), Variant::Boolean(b)) => Ok(Some(a.cmp(b))),
            (Variant::Object(a), Variant::Object(b)) => {
                let (da, db) = (a.data(), b.data());
                match (&*da, &*db) {
                    (ObjectData::List(x), ObjectData::List(y)) => {
                        rill_stack::ensure_sufficient_stack(|| compare_lists(x, y))
                    }
                    _ => Err(Error::invalid_operands("<=>", &self.type_name(), &other.type_name())),
                }
            }
            _ => Err(Error::invalid_operands("<=>", &self.type_name(), &other.type_name())),
        }
    }
}

fn compare_lists(x: &[Variant], y: &[Variant]) -> Result<Option<Ordering>> {
    for (a, b) in x.iter().zip(y) {
        match a.compare(b)? {
            Some(Ordering::Equal) => {}
            other => return Ok(other),
        }
    }
    Ok(Some(x.len().cmp(&y.len())))
}

impl From<bool> for Variant {
    fn from(b: bool) -> Self {
        Variant::Boolean(b)
    }
}

impl From<i64> for Variant {
    fn from(i: i64) -> Self {
        Variant::Integer(i)
    }
}

impl From<f64> for Variant {
    fn from(f: f64) -> Self {
        Variant::Float(f)
    }
}

impl From<&str> for Variant {
    fn from(s: &str) -> Self {
        Variant::String(Rc::from(s))
    }
}

impl From<String> for Variant {
    fn from(s: String) -> Self {
        Variant::String(Rc::from(s))
    }
}

impl From<Rc<str>> for Variant {
    fn from(s: Rc<str>) -> Self {
        Variant::String(s)
    }
}

impl From<Handle> for Variant {
    fn from(handle: Handle) -> Self {
        Variant::Object(handle)
    }
}

/// Convert a length or position to a script integer.
pub fn usize_to_int(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}
