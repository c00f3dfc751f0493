//! Cycle collector.
//!
//! Reference counting reclaims everything except cycles. Objects of
//! collectable classes and alias cells are registered here as weak
//! entries; a collection marks everything reachable from the roots and
//! empties the rest, which breaks their cycles and lets counting free them.
//!
//! Roots are the globals, the operand stack, the active frames, the class
//! registry, and every registered object that is referenced from outside
//! the registered graph. The latter are found by counting the references
//! the graph holds to each entry: a strong count above that number means a
//! host or a native function still holds the value.

use crate::function::Closure;
use crate::value::{Alias, Handle, IterSource, ObjectData, Variant};
use crate::Runtime;
use rustc_hash::{FxHashMap, FxHashSet};
use std::rc::{Rc, Weak};

#[derive(Default)]
pub struct Collector {
    objects: Vec<Weak<crate::value::Object>>,
    aliases: Vec<Weak<Alias>>,
    gcmark: u32,
    /// Registrations since the last collection.
    pending: usize,
}

/// Outcome of one collection.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct CollectStats {
    /// Registered objects and aliases alive before the collection.
    pub tracked: usize,
    /// Entries whose contents were cleared.
    pub freed: usize,
}

impl Collector {
    pub(crate) fn track_object(&mut self, handle: &Handle) {
        self.objects.push(Rc::downgrade(handle));
        self.pending += 1;
    }

    pub(crate) fn track_alias(&mut self, alias: &Rc<Alias>) {
        self.aliases.push(Rc::downgrade(alias));
        self.pending += 1;
    }

    pub(crate) fn pending(&self) -> usize {
        self.pending
    }

    /// Registered entries that are still alive.
    pub fn tracked_count(&self) -> usize {
        self.objects.iter().filter(|w| w.strong_count() > 0).count()
            + self.aliases.iter().filter(|w| w.strong_count() > 0).count()
    }

    /// Clear every registered entry. Used when the runtime is dropped.
    pub(crate) fn release_all(&mut self) {
        let mut garbage = Vec::new();
        for handle in self.objects.drain(..).filter_map(|w| w.upgrade()) {
            take_contents(&handle, &mut garbage);
        }
        let values: Vec<Variant> = self
            .aliases
            .drain(..)
            .filter_map(|w| w.upgrade())
            .map(|alias| alias.take())
            .collect();
        drop(garbage);
        drop(values);
    }
}

/// Something a value points to that may hold further values.
enum Node<'a> {
    Object(&'a Handle),
    Alias(&'a Rc<Alias>),
}

fn node_of(value: &Variant) -> Option<Node<'_>> {
    match value {
        Variant::Object(handle) => Some(Node::Object(handle)),
        Variant::Alias(alias) => Some(Node::Alias(alias)),
        _ => None,
    }
}

/// Call `f` on every value directly held by an object.
fn for_each_child(handle: &Handle, mut f: impl FnMut(&Variant), mut closure: impl FnMut(&Rc<Closure>)) {
    // A native function may hold a mutable borrow while it calls back into
    // the runtime; such an object is treated as having no children.
    let Some(data) = handle.try_data() else {
        return;
    };
    match &*data {
        ObjectData::List(items) => items.iter().for_each(&mut f),
        ObjectData::Table(table) => table.values().for_each(&mut f),
        ObjectData::Function(function) => function.closures().iter().for_each(&mut closure),
        ObjectData::Class(class) => class.for_each_value(&mut f),
        ObjectData::Module(module) => module.members.values().for_each(&mut f),
        ObjectData::Iterator(state) => {
            if let IterSource::Object(source) = &state.source {
                f(&Variant::Object(Rc::clone(source)));
            }
        }
        ObjectData::Set(_) | ObjectData::Array(_) | ObjectData::Native(_) => {}
    }
}

fn take_contents(handle: &Handle, garbage: &mut Vec<ObjectData>) {
    if let Some(mut data) = handle.try_data_mut() {
        if let Some(empty) = data.emptied() {
            garbage.push(std::mem::replace(&mut *data, empty));
        }
    }
}

impl Runtime {
    /// Run a full collection.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn collect(&mut self) -> CollectStats {
        let collector = &mut self.collector;
        collector.pending = 0;
        collector.gcmark = if collector.gcmark == 1 { 2 } else { 1 };
        let mark = collector.gcmark;

        // Upgrading adds one strong reference per live entry.
        let objects: Vec<Handle> = collector.objects.iter().filter_map(Weak::upgrade).collect();
        let aliases: Vec<Rc<Alias>> = collector.aliases.iter().filter_map(Weak::upgrade).collect();
        let tracked = objects.len() + aliases.len();

        // References held inside the registered graph.
        let mut internal: FxHashMap<*const (), usize> = FxHashMap::default();
        let mut seen_closures: FxHashSet<*const Closure> = FxHashSet::default();
        {
            let mut count = |value: &Variant| match node_of(value) {
                Some(Node::Object(h)) => *internal.entry(Rc::as_ptr(h).cast()).or_default() += 1,
                Some(Node::Alias(a)) => *internal.entry(Rc::as_ptr(a).cast()).or_default() += 1,
                None => {}
            };
            let mut upvalues: Vec<Rc<Alias>> = Vec::new();
            for handle in &objects {
                for_each_child(handle, &mut count, |closure| {
                    if seen_closures.insert(Rc::as_ptr(closure)) {
                        upvalues.extend(closure.upvalues.iter().cloned());
                    }
                });
            }
            for alias in &aliases {
                count(&*alias.read());
            }
            for alias in &upvalues {
                *internal.entry(Rc::as_ptr(alias).cast()).or_default() += 1;
            }
        }

        let mut work: Vec<Variant> = Vec::new();
        let externally_held = |ptr: *const (), strong: usize| {
            strong.saturating_sub(1) > internal.get(&ptr).copied().unwrap_or(0)
        };
        for handle in &objects {
            if externally_held(Rc::as_ptr(handle).cast(), Rc::strong_count(handle)) {
                work.push(Variant::Object(Rc::clone(handle)));
            }
        }
        for alias in &aliases {
            if externally_held(Rc::as_ptr(alias).cast(), Rc::strong_count(alias)) {
                work.push(Variant::Alias(Rc::clone(alias)));
            }
        }
        work.extend(self.globals.values().cloned());
        work.extend(self.stack.iter().cloned());
        for frame in &self.frames {
            work.extend(frame.closure.upvalues.iter().map(|a| Variant::Alias(Rc::clone(a))));
        }
        work.extend(
            self.classes
                .class_objects()
                .iter()
                .map(|h| Variant::Object(Rc::clone(h))),
        );

        mark_all(work, mark);

        let mut garbage = Vec::new();
        let mut freed = 0;
        for handle in &objects {
            if handle.mark.get() != mark {
                take_contents(handle, &mut garbage);
                freed += 1;
            }
        }
        let mut dead_values = Vec::new();
        for alias in &aliases {
            if alias.mark.get() != mark {
                dead_values.push(alias.take());
                freed += 1;
            }
        }
        drop(objects);
        drop(aliases);
        drop(garbage);
        drop(dead_values);

        let collector = &mut self.collector;
        collector.objects.retain(|w| w.strong_count() > 0);
        collector.aliases.retain(|w| w.strong_count() > 0);

        tracing::debug!(freed, tracked, "collection finished");
        CollectStats { tracked, freed }
    }

    /// Collect and print `garbage collected: <freed>/<tracked> objects`.
    pub fn collect_and_report(&mut self) -> CollectStats {
        let stats = self.collect();
        let message = format!("garbage collected: {}/{} objects", stats.freed, stats.tracked);
        tracing::info!("{message}");
        self.print_handler().println(&message);
        stats
    }

    /// Collect if enough objects were registered since the last collection.
    pub(crate) fn maybe_collect(&mut self) {
        let threshold = self.config().gc_threshold;
        if threshold > 0 && self.collector.pending() >= threshold {
            self.collect();
        }
    }

    /// Registered objects and aliases still alive.
    pub fn tracked_count(&self) -> usize {
        self.collector.tracked_count()
    }
}

/// Mark everything reachable from `work` with `mark`.
fn mark_all(mut work: Vec<Variant>, mark: u32) {
    while let Some(value) = work.pop() {
        match node_of(&value) {
            Some(Node::Object(handle)) => {
                if handle.mark.replace(mark) == mark {
                    continue;
                }
                let mut closures: Vec<Rc<Closure>> = Vec::new();
                for_each_child(
                    handle,
                    |child| {
                        if node_of(child).is_some() {
                            work.push(child.clone());
                        }
                    },
                    |closure| closures.push(Rc::clone(closure)),
                );
                for closure in closures {
                    work.extend(closure.upvalues.iter().map(|a| Variant::Alias(Rc::clone(a))));
                }
            }
            Some(Node::Alias(alias)) => {
                if alias.mark.replace(mark) == mark {
                    continue;
                }
                let inner = alias.get();
                if node_of(&inner).is_some() {
                    work.push(inner);
                }
            }
            None => {}
        }
    }
}

#[cfg(test)]
mod tests;
