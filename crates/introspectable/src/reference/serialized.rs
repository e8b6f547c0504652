//! Marshalled form of functional references

use crate::types::{ClassRef, MethodRef};
use crate::value::Value;

use super::signature::MethodSignature;

/// How the implementation behind a reference is invoked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImplementationKind {
    /// Static method
    Static,
    /// Instance method of a class
    Virtual,
    /// Instance method of an interface
    Interface,
    /// Synthetic lambda body
    Special,
    /// Constructor
    NewInstance,
}

/// Name-based description of what a callable refers to.
///
/// Classes are referenced by name and resolved through a
/// [`ClassRegistry`](crate::ClassRegistry) when decoded; the implementation
/// signature uses the [`MethodSignature`] text form.
#[derive(Debug, Clone)]
pub struct SerializedReference {
    /// Class in which the reference was created
    pub capturing_class: String,
    /// Invocation kind of the implementation
    pub implementation_kind: ImplementationKind,
    /// Class declaring the implementation
    pub implementation_class: String,
    /// Implementation method name
    pub implementation_method: String,
    /// Implementation signature text
    pub implementation_signature: String,
    /// Values captured when the reference was created
    pub captured_arguments: Vec<Value>,
}

impl SerializedReference {
    /// Describe a reference to `method` created in `capturing_class`
    pub fn describe(
        kind: ImplementationKind,
        method: &MethodRef,
        capturing_class: &ClassRef,
        captured_arguments: Vec<Value>,
    ) -> Self {
        Self {
            capturing_class: capturing_class.name().to_string(),
            implementation_kind: kind,
            implementation_class: method.declaring_class().name().to_string(),
            implementation_method: method.name().to_string(),
            implementation_signature: MethodSignature::of(method).to_string(),
            captured_arguments,
        }
    }

    /// Number of captured values
    pub fn captured_argument_count(&self) -> usize {
        self.captured_arguments.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ClassBuilder, MethodDefinition, TypeInfo};

    #[test]
    fn test_describe() {
        let class = ClassBuilder::class("test.Text")
            .method(
                MethodDefinition::new("parse")
                    .as_static()
                    .parameter("text", TypeInfo::String)
                    .returns(TypeInfo::LONG),
            )
            .build();
        let parse = class.declared_method(0).unwrap();
        let form = SerializedReference::describe(ImplementationKind::Static, &parse, &class, vec![]);
        assert_eq!(form.implementation_class, "test.Text");
        assert_eq!(form.implementation_method, "parse");
        assert_eq!(form.implementation_signature, "(string) -> i64");
        assert_eq!(form.captured_argument_count(), 0);
    }
}
