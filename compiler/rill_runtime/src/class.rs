//! Run-time type descriptors.
//!
//! Every value has a [`Class`]. Classes form a single-inheritance tree
//! rooted at `Object`; each class stores its ancestors root-to-self, so the
//! distance to an ancestor is one bounds-checked lookup.

use crate::function::NativeCallback;
use crate::value::{Handle, Object, ObjectData, Variant};
use bitflags::bitflags;
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

bitflags! {
    /// Static properties of a class's instances.
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
    pub struct Capability: u8 {
        /// Instances may take part in reference cycles and are registered
        /// with the collector.
        const COLLECTABLE = 1;
        /// Instances wrap host data.
        const NATIVE = 1 << 1;
    }
}

impl Capability {
    /// Instances are reclaimed by reference counting alone.
    pub const ATOMIC: Capability = Capability::empty();
}

/// Getter and optional setter for a computed field.
#[derive(Clone)]
pub struct Accessor {
    pub getter: NativeCallback,
    pub setter: Option<NativeCallback>,
}

pub struct Class {
    name: Rc<str>,
    id: usize,
    depth: usize,
    /// Root-to-self; the last entry is the class itself.
    bases: Vec<Weak<Class>>,
    capability: Capability,
    members: RefCell<FxHashMap<Rc<str>, Variant>>,
    initializer: RefCell<Option<Handle>>,
    accessors: RefCell<FxHashMap<Rc<str>, Accessor>>,
}

impl Class {
    fn new(name: &str, id: usize, parent: Option<&Rc<Class>>, capability: Capability) -> Rc<Self> {
        Rc::new_cyclic(|this| {
            let mut bases = parent.map(|p| p.bases.clone()).unwrap_or_default();
            bases.push(this.clone());
            Class {
                name: Rc::from(name),
                id,
                depth: bases.len() - 1,
                bases,
                capability,
                members: RefCell::default(),
                initializer: RefCell::default(),
                accessors: RefCell::default(),
            }
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Inheritance depth; 0 for `Object`.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn capability(&self) -> Capability {
        self.capability
    }

    pub fn is_collectable(&self) -> bool {
        self.capability.contains(Capability::COLLECTABLE)
    }

    pub fn parent(&self) -> Option<Rc<Class>> {
        self.depth
            .checked_sub(1)
            .and_then(|d| self.bases.get(d))
            .and_then(Weak::upgrade)
    }

    /// Number of inheritance steps from `self` up to `base`, or `None` when
    /// `base` is not an ancestor.
    pub fn get_distance(&self, base: &Class) -> Option<usize> {
        let ancestor = self.bases.get(base.depth)?;
        std::ptr::eq(ancestor.as_ptr(), base).then(|| self.depth - base.depth)
    }

    pub fn inherits(&self, base: &Class) -> bool {
        self.get_distance(base).is_some()
    }

    /// Ancestors from self to the root.
    fn lineage(&self) -> impl Iterator<Item = Rc<Class>> + '_ {
        self.bases.iter().rev().filter_map(Weak::upgrade)
    }

    /// Look a member up in this class or its ancestors.
    pub fn member(&self, name: &str) -> Option<Variant> {
        if let Some(value) = self.members.borrow().get(name) {
            return Some(value.clone());
        }
        self.lineage()
            .skip(1)
            .find_map(|class| class.members.borrow().get(name).cloned())
    }

    pub fn own_member(&self, name: &str) -> Option<Variant> {
        self.members.borrow().get(name).cloned()
    }

    pub(crate) fn set_member(&self, name: Rc<str>, value: Variant) {
        let old = self.members.borrow_mut().insert(name, value);
        drop(old);
    }

    pub fn accessor(&self, name: &str) -> Option<Accessor> {
        if let Some(accessor) = self.accessors.borrow().get(name) {
            return Some(accessor.clone());
        }
        self.lineage()
            .skip(1)
            .find_map(|class| class.accessors.borrow().get(name).cloned())
    }

    pub(crate) fn set_accessor(&self, name: Rc<str>, accessor: Accessor) {
        self.accessors.borrow_mut().insert(name, accessor);
    }

    /// The initializer function, searched up the hierarchy.
    pub fn initializer(&self) -> Option<Handle> {
        if let Some(init) = self.initializer.borrow().as_ref() {
            return Some(Rc::clone(init));
        }
        self.lineage()
            .skip(1)
            .find_map(|class| class.initializer.borrow().clone())
    }

    pub(crate) fn set_initializer(&self, function: Handle) {
        *self.initializer.borrow_mut() = Some(function);
    }

    /// Values held by the class, for the collector.
    pub(crate) fn for_each_value(&self, mut f: impl FnMut(&Variant)) {
        for value in self.members.borrow().values() {
            f(value);
        }
        if let Some(init) = self.initializer.borrow().as_ref() {
            f(&Variant::Object(Rc::clone(init)));
        }
    }

    pub(crate) fn clear(&self) {
        let members = std::mem::take(&mut *self.members.borrow_mut());
        let init = self.initializer.borrow_mut().take();
        self.accessors.borrow_mut().clear();
        drop((members, init));
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Class")
            .field("name", &self.name)
            .field("depth", &self.depth)
            .finish_non_exhaustive()
    }
}

/// Every class known to a runtime, with the built-in ones by name.
pub struct ClassRegistry {
    pub object: Rc<Class>,
    pub null: Rc<Class>,
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
    pub function: Rc<Class>,
    pub class: Rc<Class>,
    pub module: Rc<Class>,
    pub iterator: Rc<Class>,
    /// Class objects, indexed by class id.
    objects: Vec<Handle>,
}

impl ClassRegistry {
    pub(crate) fn new() -> Self {
        let mut classes = Vec::new();
        let mut make = |name: &str, parent: Option<&Rc<Class>>, cap: Capability| {
            let class = Class::new(name, classes.len(), parent, cap);
            classes.push(Rc::clone(&class));
            class
        };
        let object = make("Object", None, Capability::ATOMIC);
        let null = make("Null", Some(&object), Capability::ATOMIC);
        let boolean = make("Boolean", Some(&object), Capability::ATOMIC);
        let number = make("Number", Some(&object), Capability::ATOMIC);
        let integer = make("Integer", Some(&number), Capability::ATOMIC);
        let float = make("Float", Some(&number), Capability::ATOMIC);
        let string = make("String", Some(&object), Capability::ATOMIC);
        let list = make("List", Some(&object), Capability::COLLECTABLE);
        let table = make("Table", Some(&object), Capability::COLLECTABLE);
        let set = make("Set", Some(&object), Capability::COLLECTABLE);
        let array = make("Array", Some(&object), Capability::ATOMIC);
        let regex = make("Regex", Some(&object), Capability::NATIVE);
        let file = make("File", Some(&object), Capability::NATIVE);
        let function = make("Function", Some(&object), Capability::COLLECTABLE);
        let class = make("Class", Some(&object), Capability::ATOMIC);
        let module = make("Module", Some(&object), Capability::COLLECTABLE);
        let iterator = make("Iterator", Some(&object), Capability::ATOMIC);

        let objects = classes
            .into_iter()
            .map(|c| Rc::new(Object::new(Rc::clone(&class), ObjectData::Class(c))))
            .collect();

        ClassRegistry {
            object,
            null,
            boolean,
            number,
            integer,
            float,
            string,
            list,
            table,
            set,
            array,
            regex,
            file,
            function,
            class,
            module,
            iterator,
            objects,
        }
    }

    /// Register a new class and return it with its class object.
    pub(crate) fn create(
        &mut self,
        name: &str,
        parent: &Rc<Class>,
        capability: Capability,
    ) -> (Rc<Class>, Handle) {
        let class = Class::new(name, self.objects.len(), Some(parent), capability);
        let object = Rc::new(Object::new(
            Rc::clone(&self.class),
            ObjectData::Class(Rc::clone(&class)),
        ));
        self.objects.push(Rc::clone(&object));
        (class, object)
    }

    /// The object that represents `class` in scripts.
    pub fn object_of(&self, class: &Class) -> Option<Handle> {
        self.objects.get(class.id).cloned()
    }

    /// Class objects in registration order.
    pub fn class_objects(&self) -> &[Handle] {
        &self.objects
    }

    /// Class of a value.
    pub fn class_of(&self, value: &Variant) -> Rc<Class> {
        Rc::clone(match value {
            Variant::Null => &self.null,
            Variant::Boolean(_) => &self.boolean,
            Variant::Integer(_) => &self.integer,
            Variant::Float(_) => &self.float,
            Variant::String(_) => &self.string,
            Variant::Object(handle) => handle.class(),
            Variant::Alias(alias) => return self.class_of(&alias.read()),
        })
    }

    /// Break the cycles between classes and the functions stored in them.
    pub(crate) fn clear(&self) {
        for object in &self.objects {
            if let ObjectData::Class(class) = &*object.data() {
                class.clear();
            }
        }
    }
}

#[cfg(test)]
mod tests;
