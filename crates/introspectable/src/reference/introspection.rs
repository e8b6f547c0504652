//! Decoding marshalled references into callable descriptors

use std::mem;

use crate::error::ReferenceError;
use crate::registry::ClassRegistry;
use crate::types::{ClassRef, MethodKind, MethodRef, TypeInfo};
use crate::value::Value;

use super::serialized::{ImplementationKind, SerializedReference};
use super::signature::MethodSignature;
use super::FunctionalReference;

/// What a callable refers to
#[derive(Debug, Clone)]
pub enum CallableKind {
    /// Static method; parameters are the method's own
    Static,
    /// Unbound instance method; the receiver is the first parameter
    Instance,
    /// Instance method bound to a captured receiver
    Bound(Value),
    /// Constructor
    Constructor,
    /// Lambda with its captured values
    Lambda(Vec<Value>),
}

/// Reflectable metadata of a callable.
///
/// Two descriptors are equal when they describe the same kind of callable,
/// the same member (by identity) and the same capturing type; captured
/// values are not compared.
#[derive(Debug, Clone)]
pub struct CallableDescriptor {
    kind: CallableKind,
    member: MethodRef,
    capturing_type: TypeInfo,
}

impl CallableDescriptor {
    /// Kind of callable
    pub fn kind(&self) -> &CallableKind {
        &self.kind
    }

    /// Result type as declared
    pub fn result_type(&self) -> TypeInfo {
        self.member.return_type()
    }

    /// Parameter types as seen by callers of the reference
    pub fn parameter_types(&self) -> Vec<TypeInfo> {
        match &self.kind {
            CallableKind::Instance => {
                let mut types = vec![TypeInfo::class(self.member.declaring_class())];
                types.extend(self.member.parameter_types());
                types
            }
            CallableKind::Lambda(captures) => self
                .member
                .parameter_types()
                .into_iter()
                .skip(captures.len())
                .collect(),
            _ => self.member.parameter_types(),
        }
    }

    /// Number of parameters as seen by callers of the reference
    pub fn parameter_count(&self) -> usize {
        match &self.kind {
            CallableKind::Instance => self.member.parameter_count() + 1,
            CallableKind::Lambda(captures) => {
                self.member.parameter_count().saturating_sub(captures.len())
            }
            _ => self.member.parameter_count(),
        }
    }

    /// Parameter type by index
    pub fn parameter_type(&self, index: usize) -> Result<TypeInfo, ReferenceError> {
        let count = self.parameter_count();
        self.parameter_types()
            .into_iter()
            .nth(index)
            .ok_or(ReferenceError::ParameterOutOfRange { index, count })
    }

    /// Type owning the reference: the declaring class for static, unbound
    /// and constructor references, the runtime type of the receiver for bound
    /// references, the capturing class for lambdas
    pub fn capturing_type(&self) -> &TypeInfo {
        &self.capturing_type
    }

    /// Implementation member, whatever the kind
    pub fn referenced_member(&self) -> &MethodRef {
        &self.member
    }

    /// Referenced method; fails for constructors and lambdas
    pub fn referenced_method(&self) -> Result<&MethodRef, ReferenceError> {
        match self.kind {
            CallableKind::Static | CallableKind::Instance | CallableKind::Bound(_) => {
                Ok(&self.member)
            }
            CallableKind::Constructor | CallableKind::Lambda(_) => {
                Err(ReferenceError::NotAMethodReference)
            }
        }
    }

    /// Name of the referenced method
    pub fn referenced_method_name(&self) -> Result<&str, ReferenceError> {
        self.referenced_method().map(MethodRef::name)
    }

    /// Referenced constructor; fails for everything else
    pub fn referenced_constructor(&self) -> Result<&MethodRef, ReferenceError> {
        match self.kind {
            CallableKind::Constructor => Ok(&self.member),
            _ => Err(ReferenceError::NotAConstructorReference),
        }
    }

    /// Captured receiver of a bound reference
    pub fn bound_receiver(&self) -> Option<&Value> {
        match &self.kind {
            CallableKind::Bound(receiver) => Some(receiver),
            _ => None,
        }
    }

    /// Values captured by a lambda or bound reference
    pub fn captures(&self) -> &[Value] {
        match &self.kind {
            CallableKind::Bound(receiver) => std::slice::from_ref(receiver),
            CallableKind::Lambda(captures) => captures,
            _ => &[],
        }
    }
}

impl PartialEq for CallableDescriptor {
    fn eq(&self, other: &Self) -> bool {
        mem::discriminant(&self.kind) == mem::discriminant(&other.kind)
            && self.member == other.member
            && self.capturing_type == other.capturing_type
    }
}

/// Decode a reference, resolving classes through the global registry
pub fn introspect<R>(reference: &R) -> Result<CallableDescriptor, ReferenceError>
where
    R: FunctionalReference + ?Sized,
{
    introspect_in(ClassRegistry::global(), reference)
}

/// Decode a reference, resolving classes through `registry`
pub fn introspect_in<R>(
    registry: &ClassRegistry,
    reference: &R,
) -> Result<CallableDescriptor, ReferenceError>
where
    R: FunctionalReference + ?Sized,
{
    let form = reference.serialized_form().ok_or_else(|| {
        ReferenceError::UnresolvableReference(
            "callable carries no member reference".to_string(),
        )
    })?;
    decode(registry, &form)
}

fn unresolvable(message: String) -> ReferenceError {
    ReferenceError::UnresolvableReference(message)
}

fn lookup_class(registry: &ClassRegistry, name: &str) -> Result<ClassRef, ReferenceError> {
    registry
        .lookup(name)
        .ok_or_else(|| unresolvable(format!("unknown class {}", name)))
}

/// Decode a marshalled reference
pub fn decode(
    registry: &ClassRegistry,
    form: &SerializedReference,
) -> Result<CallableDescriptor, ReferenceError> {
    let class = lookup_class(registry, &form.implementation_class)?;
    let signature = MethodSignature::parse(&form.implementation_signature, registry).map_err(
        |err| {
            unresolvable(format!(
                "bad signature '{}': {}",
                form.implementation_signature, err
            ))
        },
    )?;
    let member = class
        .declared_methods_named(&form.implementation_method)
        .find(|m| signature.matches(m))
        .ok_or_else(|| {
            unresolvable(format!(
                "{} declares no {}{}",
                class.name(),
                form.implementation_method,
                signature
            ))
        })?;

    let require_kind = |expected: MethodKind| {
        if member.kind() == expected {
            Ok(())
        } else {
            Err(unresolvable(format!(
                "{} is not a {:?} method",
                member, expected
            )))
        }
    };

    let captures = &form.captured_arguments;
    let (kind, capturing_type) = match form.implementation_kind {
        ImplementationKind::Static => {
            require_kind(MethodKind::Static)?;
            if !captures.is_empty() {
                return Err(unresolvable(format!(
                    "static reference to {} captures {} value(s)",
                    member,
                    captures.len()
                )));
            }
            (CallableKind::Static, TypeInfo::class(&class))
        }
        ImplementationKind::Virtual | ImplementationKind::Interface => {
            require_kind(MethodKind::Instance)?;
            match captures.as_slice() {
                [] => (CallableKind::Instance, TypeInfo::class(&class)),
                [receiver] => {
                    if receiver.is_null() || !receiver.is_instance_of(&TypeInfo::class(&class)) {
                        return Err(unresolvable(format!(
                            "captured receiver of type {} does not implement {}",
                            receiver.type_name(),
                            class.name()
                        )));
                    }
                    (CallableKind::Bound(receiver.clone()), receiver.runtime_type())
                }
                _ => {
                    return Err(unresolvable(format!(
                        "member reference to {} captures {} values",
                        member,
                        captures.len()
                    )))
                }
            }
        }
        ImplementationKind::NewInstance => {
            require_kind(MethodKind::Constructor)?;
            (CallableKind::Constructor, TypeInfo::class(&class))
        }
        ImplementationKind::Special => {
            let capturing = lookup_class(registry, &form.capturing_class)?;
            (
                CallableKind::Lambda(captures.clone()),
                TypeInfo::class(&capturing),
            )
        }
    };

    tracing::debug!(
        member = %member,
        kind = ?form.implementation_kind,
        capturing_type = %capturing_type,
        "decoded functional reference"
    );

    Ok(CallableDescriptor {
        kind,
        member,
        capturing_type,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ClassBuilder, MethodDefinition};

    fn setup() -> (ClassRegistry, ClassRef) {
        let registry = ClassRegistry::new();
        let class = ClassBuilder::class("test.Util")
            .method(
                MethodDefinition::new("twice")
                    .as_static()
                    .parameter("x", TypeInfo::INT)
                    .returns(TypeInfo::INT),
            )
            .method(MethodDefinition::new("size").returns(TypeInfo::INT))
            .build();
        registry.register(&class);
        (registry, class)
    }

    fn form(kind: ImplementationKind, method: &MethodRef, captures: Vec<Value>) -> SerializedReference {
        SerializedReference::describe(kind, method, method.declaring_class(), captures)
    }

    #[test]
    fn test_decode_static() {
        let (registry, class) = setup();
        let twice = class.declared_method(0).unwrap();
        let descriptor = decode(&registry, &form(ImplementationKind::Static, &twice, vec![])).unwrap();
        assert_eq!(descriptor.referenced_method().unwrap(), &twice);
        assert_eq!(descriptor.parameter_types(), vec![TypeInfo::INT]);
        assert_eq!(descriptor.capturing_type(), &TypeInfo::class(&class));
    }

    #[test]
    fn test_kind_mismatch_is_unresolvable() {
        let (registry, class) = setup();
        let size = class.declared_method(1).unwrap();
        let err = decode(&registry, &form(ImplementationKind::Static, &size, vec![])).unwrap_err();
        assert!(matches!(err, ReferenceError::UnresolvableReference(_)));
    }

    #[test]
    fn test_too_many_captures() {
        let (registry, class) = setup();
        let size = class.declared_method(1).unwrap();
        let err = decode(
            &registry,
            &form(ImplementationKind::Virtual, &size, vec![Value::Null, Value::Null]),
        )
        .unwrap_err();
        assert!(matches!(err, ReferenceError::UnresolvableReference(_)));
    }

    #[test]
    fn test_unknown_class_and_signature() {
        let (registry, class) = setup();
        let twice = class.declared_method(0).unwrap();

        let mut missing_class = form(ImplementationKind::Static, &twice, vec![]);
        missing_class.implementation_class = "test.Gone".to_string();
        assert!(decode(&registry, &missing_class).is_err());

        let mut wrong_signature = form(ImplementationKind::Static, &twice, vec![]);
        wrong_signature.implementation_signature = "(i64) -> i32".to_string();
        assert!(decode(&registry, &wrong_signature).is_err());

        let mut garbage = form(ImplementationKind::Static, &twice, vec![]);
        garbage.implementation_signature = "i32".to_string();
        assert!(decode(&registry, &garbage).is_err());
    }

    #[test]
    fn test_parameter_out_of_range() {
        let (registry, class) = setup();
        let twice = class.declared_method(0).unwrap();
        let descriptor = decode(&registry, &form(ImplementationKind::Static, &twice, vec![])).unwrap();
        assert_eq!(
            descriptor.parameter_type(1),
            Err(ReferenceError::ParameterOutOfRange { index: 1, count: 1 })
        );
    }
}
