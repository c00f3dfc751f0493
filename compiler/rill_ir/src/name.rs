//! Interned text for identifiers and string literals.
//!
//! A runtime owns one [`StringInterner`]; the scanner interns every
//! identifier and literal through it, so the compiler's constant pools and
//! the global namespace end up sharing one allocation per distinct text.

use rustc_hash::FxHashSet;
use std::borrow::Borrow;
use std::cell::RefCell;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::rc::Rc;

/// Shared, immutable text produced by a [`StringInterner`].
///
/// Equality first compares pointers, then contents, so names coming from
/// different interners still compare correctly.
#[derive(Clone)]
pub struct Name(Rc<str>);

impl Name {
    /// Wrap text that did not go through an interner.
    pub fn new(text: &str) -> Self {
        Name(Rc::from(text))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The shared allocation, for storing in runtime values without copying.
    #[inline]
    pub fn as_rc(&self) -> &Rc<str> {
        &self.0
    }

    #[inline]
    pub fn into_rc(self) -> Rc<str> {
        self.0
    }
}

impl PartialEq for Name {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0) || self.0 == other.0
    }
}

impl Eq for Name {}

impl Hash for Name {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl Deref for Name {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Name {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", &*self.0)
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Name {
    fn from(text: &str) -> Self {
        Name::new(text)
    }
}

/// Single-threaded string interner.
///
/// Interior mutability lets the scanner intern through a shared reference
/// while the runtime keeps borrowing the interner elsewhere.
#[derive(Default)]
pub struct StringInterner {
    strings: RefCell<FxHashSet<Name>>,
}

impl StringInterner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the canonical [`Name`] for `text`, allocating it on first use.
    pub fn intern(&self, text: &str) -> Name {
        let mut strings = self.strings.borrow_mut();
        if let Some(name) = strings.get(text) {
            return name.clone();
        }
        let name = Name::new(text);
        strings.insert(name.clone());
        name
    }

    /// Look `text` up without interning it.
    pub fn get(&self, text: &str) -> Option<Name> {
        self.strings.borrow().get(text).cloned()
    }

    pub fn len(&self) -> usize {
        self.strings.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.borrow().is_empty()
    }
}

#[cfg(test)]
mod tests;
