//! Boxed objects.

use super::{Handle, Variant};
use crate::class::Class;
use crate::error::{Error, Result};
use crate::function::Function;
use indexmap::{IndexMap, IndexSet};
use rustc_hash::FxBuildHasher;
use std::any::Any;
use std::cell::{Cell, Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

pub type Table = IndexMap<HashKey, Variant, FxBuildHasher>;
pub type Set = IndexSet<HashKey, FxBuildHasher>;
pub type Members = IndexMap<Rc<str>, Variant, FxBuildHasher>;

/// A heap object: its class, a collector mark and its contents.
pub struct Object {
    class: Rc<Class>,
    pub(crate) mark: Cell<u32>,
    data: RefCell<ObjectData>,
}

impl Object {
    pub(crate) fn new(class: Rc<Class>, data: ObjectData) -> Self {
        Object {
            class,
            mark: Cell::new(0),
            data: RefCell::new(data),
        }
    }

    pub fn class(&self) -> &Rc<Class> {
        &self.class
    }

    pub fn data(&self) -> Ref<'_, ObjectData> {
        self.data.borrow()
    }

    pub fn data_mut(&self) -> RefMut<'_, ObjectData> {
        self.data.borrow_mut()
    }

    pub(crate) fn try_data(&self) -> Option<Ref<'_, ObjectData>> {
        self.data.try_borrow().ok()
    }

    pub(crate) fn try_data_mut(&self) -> Option<RefMut<'_, ObjectData>> {
        self.data.try_borrow_mut().ok()
    }

    /// Whether the object is a list, table, set or array.
    pub fn is_container(&self) -> bool {
        matches!(
            *self.data(),
            ObjectData::List(_) | ObjectData::Table(_) | ObjectData::Set(_) | ObjectData::Array(_)
        )
    }

    pub(crate) fn data_equals(&self, other: &Object) -> bool {
        let (a, b) = (self.data(), other.data());
        match (&*a, &*b) {
            (ObjectData::List(x), ObjectData::List(y)) => {
                x.len() == y.len() && x.iter().zip(y).all(|(a, b)| a.equals(b))
            }
            (ObjectData::Table(x), ObjectData::Table(y)) => {
                x.len() == y.len()
                    && x.iter()
                        .all(|(k, v)| y.get(k).is_some_and(|w| v.equals(w)))
            }
            (ObjectData::Set(x), ObjectData::Set(y)) => {
                x.len() == y.len() && x.iter().all(|k| y.contains(k))
            }
            (ObjectData::Array(x), ObjectData::Array(y)) => x == y,
            _ => false,
        }
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object")
            .field("class", &self.class.name())
            .finish_non_exhaustive()
    }
}

/// Contents of an [`Object`].
pub enum ObjectData {
    List(Vec<Variant>),
    Table(Table),
    Set(Set),
    Array(Array),
    Function(Function),
    Class(Rc<Class>),
    Iterator(IterState),
    Module(ScriptModule),
    /// Host data such as a compiled regex or an open file.
    Native(Box<dyn NativeData>),
}

impl ObjectData {
    /// Empty contents of the same kind; what the collector leaves behind.
    pub(crate) fn emptied(&self) -> Option<ObjectData> {
        Some(match self {
            ObjectData::List(_) => ObjectData::List(Vec::new()),
            ObjectData::Table(_) => ObjectData::Table(Table::default()),
            ObjectData::Set(_) => ObjectData::Set(Set::default()),
            ObjectData::Function(f) => ObjectData::Function(f.emptied()),
            ObjectData::Module(m) => ObjectData::Module(ScriptModule::new(Rc::clone(&m.name))),
            ObjectData::Array(_)
            | ObjectData::Class(_)
            | ObjectData::Iterator(_)
            | ObjectData::Native(_) => return None,
        })
    }

    /// Number of elements of a container.
    pub fn len(&self) -> Option<usize> {
        match self {
            ObjectData::List(items) => Some(items.len()),
            ObjectData::Table(table) => Some(table.len()),
            ObjectData::Set(set) => Some(set.len()),
            ObjectData::Array(array) => Some(array.len()),
            _ => None,
        }
    }
}

/// A named namespace created with `Module(name)`. Its members are read and
/// written as fields.
pub struct ScriptModule {
    pub name: Rc<str>,
    pub members: Members,
}

impl ScriptModule {
    pub fn new(name: Rc<str>) -> Self {
        ScriptModule {
            name,
            members: Members::default(),
        }
    }

    pub fn get(&self, key: &str) -> Result<Variant> {
        self.members
            .get(key)
            .map(Variant::resolve)
            .ok_or_else(|| self.missing(key))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.members.contains_key(key)
    }

    pub fn define(&mut self, key: &str, value: Variant) {
        self.members.insert(Rc::from(key), value.into_resolved());
    }

    #[cold]
    pub(crate) fn missing(&self, key: &str) -> Error {
        Error::index_error(format!("missing key in module \"{}\": \"{key}\"", self.name))
    }
}

/// Host data stored in an object.
pub trait NativeData: Any + fmt::Debug {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Display form, such as `<Regex "a+">`.
    fn describe(&self) -> String;
}

// -----------------------------------------------------------------------------
// Hash keys
// -----------------------------------------------------------------------------

/// A value usable as a table key or set element.
///
/// Floats with an integral value are stored as integers, so `t[1]` and
/// `t[1.0]` name the same entry.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum HashKey {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(u64),
    String(Rc<str>),
}

impl HashKey {
    #[allow(
        clippy::cast_possible_truncation,
        reason = "integral floats within range convert exactly"
    )]
    pub fn from_variant(value: &Variant) -> Result<Self> {
        Ok(match value {
            Variant::Null => HashKey::Null,
            Variant::Boolean(b) => HashKey::Boolean(*b),
            Variant::Integer(i) => HashKey::Integer(*i),
            Variant::Float(f) if f.fract() == 0.0 && f.abs() < 9.0e18 => {
                HashKey::Integer(*f as i64)
            }
            Variant::Float(f) => HashKey::Float(f.to_bits()),
            Variant::String(s) => HashKey::String(Rc::clone(s)),
            Variant::Alias(alias) => return HashKey::from_variant(&alias.read()),
            Variant::Object(handle) => {
                return Err(Error::type_error(format!(
                    "a value of type {} cannot be used as a key",
                    handle.class().name()
                )))
            }
        })
    }

    pub fn to_variant(&self) -> Variant {
        match self {
            HashKey::Null => Variant::Null,
            HashKey::Boolean(b) => Variant::Boolean(*b),
            HashKey::Integer(i) => Variant::Integer(*i),
            HashKey::Float(bits) => Variant::Float(f64::from_bits(*bits)),
            HashKey::String(s) => Variant::String(Rc::clone(s)),
        }
    }
}

// -----------------------------------------------------------------------------
// Arrays
// -----------------------------------------------------------------------------

/// Numeric matrix stored row-major. A one-dimensional array has one row.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Array {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl Array {
    pub fn new(rows: usize, cols: usize, data: Vec<f64>) -> Result<Self> {
        if rows.checked_mul(cols) != Some(data.len()) {
            return Err(Error::range_error(format!(
                "cannot build a {rows}x{cols} array from {} values",
                data.len()
            )));
        }
        Ok(Array { rows, cols, data })
    }

    pub fn zeros(rows: usize, cols: usize) -> Result<Self> {
        let len = rows
            .checked_mul(cols)
            .ok_or_else(|| Error::range_error("array dimensions are too large"))?;
        Ok(Array {
            rows,
            cols,
            data: vec![0.0; len],
        })
    }

    pub fn from_vec(data: Vec<f64>) -> Self {
        Array {
            rows: usize::from(!data.is_empty()),
            cols: data.len(),
            data,
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }

    /// Offset of a 1-based linear index, or of a 1-based row and column.
    pub fn offset(&self, indices: &[i64]) -> Result<usize> {
        match *indices {
            [i] => resolve_index(i, self.data.len()),
            [i, j] => {
                let row = resolve_index(i, self.rows)?;
                let col = resolve_index(j, self.cols)?;
                Ok(row * self.cols + col)
            }
            _ => Err(Error::index_error(format!(
                "arrays take 1 or 2 indices, got {}",
                indices.len()
            ))),
        }
    }
}

/// Convert a 1-based index (negative counts from the end) to an offset.
pub fn resolve_index(index: i64, len: usize) -> Result<usize> {
    let signed_len = super::usize_to_int(len);
    let offset = if index < 0 { signed_len + index } else { index - 1 };
    if index == 0 || offset < 0 || offset >= signed_len {
        return Err(Error::index_out_of_range(index, len));
    }
    usize::try_from(offset).map_err(|_| Error::index_out_of_range(index, len))
}

// -----------------------------------------------------------------------------
// Iterators
// -----------------------------------------------------------------------------

#[derive(Debug)]
pub enum IterSource {
    Object(Handle),
    String(Rc<str>),
}

/// State of a `foreach` loop.
#[derive(Debug)]
pub struct IterState {
    pub source: IterSource,
    /// Element position; a byte offset for strings.
    pub pos: usize,
    /// Number of elements produced so far.
    pub count: usize,
    pub by_ref: bool,
}

impl IterState {
    pub fn new(source: IterSource, by_ref: bool) -> Self {
        IterState {
            source,
            pos: 0,
            count: 0,
            by_ref,
        }
    }
}
