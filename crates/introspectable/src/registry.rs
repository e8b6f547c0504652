//! Class Registry
//!
//! Resolves qualified class names to [`ClassRef`]s. Marshalled functional
//! references only carry class names; decoding them looks classes up here.

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::contract::InterfaceContract;
use crate::proxy::LazyInitialization;
use crate::types::{AnnotationMethods, ClassRef, ObjectMethods};

static GLOBAL: Lazy<ClassRegistry> = Lazy::new(ClassRegistry::new);

/// Name to class lookup
pub struct ClassRegistry {
    classes: RwLock<FxHashMap<String, ClassRef>>,
}

impl ClassRegistry {
    /// Create a registry holding only the built-in classes
    pub fn new() -> Self {
        let registry = Self {
            classes: RwLock::new(FxHashMap::default()),
        };
        registry.register(ObjectMethods::class());
        registry.register(AnnotationMethods::class());
        registry.register(LazyInitialization::contract());
        registry
    }

    /// Process-wide registry
    pub fn global() -> &'static ClassRegistry {
        &GLOBAL
    }

    /// Register a class under its name, returning the class it replaced
    pub fn register(&self, class: &ClassRef) -> Option<ClassRef> {
        let previous = self
            .classes
            .write()
            .insert(class.name().to_string(), class.clone());
        match &previous {
            Some(old) if old != class => {
                tracing::warn!(class = class.name(), "replaced registered class");
            }
            _ => {}
        }
        previous
    }

    /// Get a class by name
    pub fn lookup(&self, name: &str) -> Option<ClassRef> {
        self.classes.read().get(name).cloned()
    }

    /// Check if a class is registered
    pub fn contains(&self, name: &str) -> bool {
        self.classes.read().contains_key(name)
    }

    /// Contract of a registered interface or annotation
    pub fn contract(&self, name: &str) -> Option<InterfaceContract> {
        self.lookup(name)
            .filter(ClassRef::is_interface)
            .map(|class| InterfaceContract::of(&class))
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.classes.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Get the number of registered classes
    pub fn len(&self) -> usize {
        self.classes.read().len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.classes.read().is_empty()
    }
}

impl Default for ClassRegistry {
    fn default() -> Self {
        Self::new()
    }
}
