//! Functional Reference Introspection
//!
//! Closures carry no metadata in Rust, so a callable that wants to be
//! introspectable exposes a [`SerializedReference`] describing the member it
//! refers to. Introspection decodes that form, resolving class names through
//! a [`ClassRegistry`](crate::ClassRegistry), into a [`CallableDescriptor`]:
//!
//! | reference                | parameters                    | capturing type            |
//! |--------------------------|-------------------------------|---------------------------|
//! | static method            | the method's parameters       | declaring class           |
//! | unbound instance method  | receiver, then the parameters | declaring class           |
//! | bound instance method    | the method's parameters       | runtime type of receiver  |
//! | constructor              | the constructor's parameters  | constructed class         |
//! | lambda                   | body parameters past captures | class creating the lambda |
//!
//! Callables without a serialized form fail with
//! [`ReferenceError::UnresolvableReference`].

mod introspection;
mod serialized;
pub mod signature;

pub use introspection::{decode, introspect, introspect_in, CallableDescriptor, CallableKind};
pub use serialized::{ImplementationKind, SerializedReference};
pub use signature::{MethodSignature, SignatureError};

use crate::error::ReferenceError;
use crate::registry::ClassRegistry;
use crate::types::{ClassKind, ClassRef, MethodRef};
use crate::value::Value;

/// A callable that can describe what it refers to
pub trait FunctionalReference {
    /// Marshalled form; `None` for callables with no backing member
    fn serialized_form(&self) -> Option<SerializedReference>;

    /// Decode against the global registry
    fn introspect(&self) -> Result<CallableDescriptor, ReferenceError> {
        introspect(self)
    }

    /// Decode against `registry`
    fn introspect_in(&self, registry: &ClassRegistry) -> Result<CallableDescriptor, ReferenceError> {
        introspect_in(registry, self)
    }
}

impl FunctionalReference for SerializedReference {
    fn serialized_form(&self) -> Option<SerializedReference> {
        Some(self.clone())
    }
}

/// A closure paired with the member it refers to
///
/// ```ignore
/// let parse = Reference::of_static(&parse_method, |s: &str| s.parse::<i64>());
/// let descriptor = parse.introspect()?;
/// let value = (parse.get())("42");
/// ```
#[derive(Clone)]
pub struct Reference<F> {
    function: F,
    form: Option<SerializedReference>,
}

impl<F> Reference<F> {
    /// Reference to a static method
    pub fn of_static(method: &MethodRef, function: F) -> Self {
        Self::describing(ImplementationKind::Static, method, Vec::new(), function)
    }

    /// Unbound reference to an instance method
    pub fn of_instance(method: &MethodRef, function: F) -> Self {
        Self::describing(instance_kind(method), method, Vec::new(), function)
    }

    /// Reference to an instance method bound to `receiver`
    pub fn bound(method: &MethodRef, receiver: impl Into<Value>, function: F) -> Self {
        Self::describing(instance_kind(method), method, vec![receiver.into()], function)
    }

    /// Reference to a constructor
    pub fn of_constructor(constructor: &MethodRef, function: F) -> Self {
        Self::describing(ImplementationKind::NewInstance, constructor, Vec::new(), function)
    }

    /// Lambda created in `capturing_class` whose body is `body`
    pub fn lambda(
        capturing_class: &ClassRef,
        body: &MethodRef,
        captures: Vec<Value>,
        function: F,
    ) -> Self {
        Self {
            function,
            form: Some(SerializedReference::describe(
                ImplementationKind::Special,
                body,
                capturing_class,
                captures,
            )),
        }
    }

    /// Closure without any member behind it
    pub fn synthetic(function: F) -> Self {
        Self {
            function,
            form: None,
        }
    }

    /// Closure with an explicit marshalled form
    pub fn from_serialized(form: SerializedReference, function: F) -> Self {
        Self {
            function,
            form: Some(form),
        }
    }

    fn describing(
        kind: ImplementationKind,
        method: &MethodRef,
        captures: Vec<Value>,
        function: F,
    ) -> Self {
        Self {
            function,
            form: Some(SerializedReference::describe(
                kind,
                method,
                method.declaring_class(),
                captures,
            )),
        }
    }

    /// The closure
    pub fn get(&self) -> &F {
        &self.function
    }

    /// Take the closure
    pub fn into_inner(self) -> F {
        self.function
    }
}

fn instance_kind(method: &MethodRef) -> ImplementationKind {
    match method.declaring_class().kind() {
        ClassKind::Class => ImplementationKind::Virtual,
        ClassKind::Interface | ClassKind::Annotation => ImplementationKind::Interface,
    }
}

impl<F> FunctionalReference for Reference<F> {
    fn serialized_form(&self) -> Option<SerializedReference> {
        self.form.clone()
    }
}
