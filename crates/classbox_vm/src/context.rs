//! Isolation arena for loaded classes.
//!
//! Each context owns a private namespace map from internal class name to
//! loaded class, plus the static field state of everything loaded through
//! it. Two contexts never share state, even for classes declaring identical
//! names, which is what lets the same entry-point name be resubmitted and
//! re-executed without stale-state bleed-through or duplicate-definition
//! failures. Discarding a context is an ordinary drop and releases
//! everything reachable only through it.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use classbox_foundation::{Error, Result};

use crate::class::LoadedClass;
use crate::value::Value;

/// One execution's private class namespace and static state.
#[derive(Debug, Default)]
pub struct ExecutionContext {
    classes: HashMap<String, Rc<LoadedClass>>,
    statics: HashMap<(String, String), Value>,
    initialized: HashSet<String>,
    initializing: HashSet<String>,
}

impl ExecutionContext {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Admits a class into this context's namespace.
    ///
    /// # Errors
    /// Returns a load error if the context already holds a class with the
    /// same declared name.
    pub fn define(&mut self, class: LoadedClass) -> Result<Rc<LoadedClass>> {
        let name = class.name().to_string();
        if self.classes.contains_key(&name) {
            return Err(Error::load(format!("duplicate class definition: {name}")));
        }
        let class = Rc::new(class);
        self.classes.insert(name, Rc::clone(&class));
        Ok(class)
    }

    /// Looks up a class by internal name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Rc<LoadedClass>> {
        self.classes.get(name).cloned()
    }

    /// Returns true if the context holds a class with this name.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    /// Number of classes admitted.
    #[must_use]
    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    /// Reads a static field.
    #[must_use]
    pub fn get_static(&self, class: &str, field: &str) -> Option<Value> {
        self.statics
            .get(&(class.to_string(), field.to_string()))
            .cloned()
    }

    /// Writes a static field.
    pub fn set_static(&mut self, class: &str, field: &str, value: Value) {
        self.statics
            .insert((class.to_string(), field.to_string()), value);
    }

    /// Claims a class for initialization.
    ///
    /// Returns false if the class is already initialized or its initializer
    /// is on the call stack (recursion guard); returns true and records the
    /// in-progress state otherwise.
    pub fn begin_initialization(&mut self, name: &str) -> bool {
        if self.initialized.contains(name) || self.initializing.contains(name) {
            return false;
        }
        self.initializing.insert(name.to_string());
        true
    }

    /// Marks a class as fully initialized.
    pub fn finish_initialization(&mut self, name: &str) {
        self.initializing.remove(name);
        self.initialized.insert(name.to_string());
    }

    /// Returns true if the class initializer has completed.
    #[must_use]
    pub fn is_initialized(&self, name: &str) -> bool {
        self.initialized.contains(name)
    }
}
