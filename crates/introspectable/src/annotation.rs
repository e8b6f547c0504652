//! Annotation Builder
//!
//! Builds immutable, value-semantic instances of annotation contracts on top
//! of the proxy engine.
//!
//! # Example
//!
//! ```ignore
//! let route = AnnotationBuilder::of(&route_annotation)?
//!     .with("path", "/users")?
//!     .with("methods", Value::string_array(&["GET", "POST"]))?
//!     .build()?;
//!
//! assert_eq!(route.call("path", &[])?, Value::from("/users"));
//! ```
//!
//! # Value semantics
//!
//! Built instances answer `equals`, `hash_code` and `to_string` from their
//! member values:
//!
//! - equal when the other object implements the same annotation contract and
//!   every member compares equal
//! - hash is the sum over members of `(127 * string_hash(name)) ^ hash(value)`
//! - text is `@{contract}({member}={value}, ...)` in declaration order
//!
//! The hash matches what natively constructed annotation objects compute
//! through [`annotation_hash_code`], so both kinds interoperate in hashed
//! collections.

use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use rustc_hash::FxHashMap;

use crate::config::IntrospectionConfig;
use crate::contract::{InterfaceContract, MemberInfo};
use crate::error::{AnnotationError, ProxyError};
use crate::extractor::ReferenceExtractor;
use crate::proxy::{HandlerResult, Invocation, InvocationHandler, ProxyBuilder};
use crate::types::{AnnotationMethods, ClassRef, MethodRef, ObjectMethods, TypeInfo};
use crate::value::{string_hash, ObjectRef, Value};

// ============================================================================
// Member selectors
// ============================================================================

/// Identifies one member of an annotation contract
pub trait MemberSelector {
    /// Find the selected member
    fn select<'c>(&self, contract: &'c InterfaceContract) -> Result<&'c MemberInfo, AnnotationError>;
}

fn unknown_member(contract: &InterfaceContract, member: impl Into<String>) -> AnnotationError {
    AnnotationError::UnknownMember {
        contract: contract.name().to_string(),
        member: member.into(),
    }
}

impl MemberSelector for str {
    fn select<'c>(&self, contract: &'c InterfaceContract) -> Result<&'c MemberInfo, AnnotationError> {
        contract
            .member(self)
            .ok_or_else(|| unknown_member(contract, self))
    }
}

impl MemberSelector for String {
    fn select<'c>(&self, contract: &'c InterfaceContract) -> Result<&'c MemberInfo, AnnotationError> {
        self.as_str().select(contract)
    }
}

impl MemberSelector for MethodRef {
    fn select<'c>(&self, contract: &'c InterfaceContract) -> Result<&'c MemberInfo, AnnotationError> {
        contract
            .member_for(self)
            .ok_or_else(|| unknown_member(contract, self.to_string()))
    }
}

impl<S: MemberSelector + ?Sized> MemberSelector for &S {
    fn select<'c>(&self, contract: &'c InterfaceContract) -> Result<&'c MemberInfo, AnnotationError> {
        (**self).select(contract)
    }
}

/// Selector naming a member by calling its accessor, see [`member`]
pub struct MemberExtractor<F>(F);

impl<F> MemberSelector for MemberExtractor<F>
where
    F: Fn(&ObjectRef) -> Result<Value, ProxyError>,
{
    fn select<'c>(&self, contract: &'c InterfaceContract) -> Result<&'c MemberInfo, AnnotationError> {
        let accessor = ReferenceExtractor::of(contract.class()).extract(&self.0)?;
        accessor.select(contract)
    }
}

/// Select the member whose accessor `f` calls
///
/// ```ignore
/// builder.with(member(|a| a.call("path", &[])), "/users")?
/// ```
pub fn member<F>(f: F) -> MemberExtractor<F>
where
    F: Fn(&ObjectRef) -> Result<Value, ProxyError>,
{
    MemberExtractor(f)
}

// ============================================================================
// AnnotationBuilder
// ============================================================================

/// Persistent builder for annotation instances.
///
/// Every assignment returns a new builder; the receiver is left unchanged and
/// can serve as a template for several instances.
#[derive(Clone)]
pub struct AnnotationBuilder {
    contract: InterfaceContract,
    values: Arc<FxHashMap<String, Value>>,
}

impl AnnotationBuilder {
    /// Start a builder without assignments.
    ///
    /// Fails if a member default does not fit the member's declared type.
    pub fn of(annotation: &ClassRef) -> Result<Self, AnnotationError> {
        if !annotation.is_annotation() {
            return Err(AnnotationError::NotAnAnnotation(annotation.name().to_string()));
        }
        let contract = InterfaceContract::of(annotation);
        for member in contract.members() {
            if let Some(default) = member.default_value() {
                if default.is_null() || !default.is_instance_of(member.value_type()) {
                    return Err(AnnotationError::TypeMismatch {
                        member: member.name().to_string(),
                        expected: member.value_type().to_string(),
                        found: default.type_name(),
                    });
                }
            }
        }
        Ok(Self {
            contract,
            values: Arc::new(FxHashMap::default()),
        })
    }

    /// Instance of a contract whose members all have defaults
    pub fn marker(annotation: &ClassRef) -> Result<ObjectRef, AnnotationError> {
        let builder = Self::of(annotation)?;
        let required: Vec<String> = builder
            .contract
            .required_members()
            .map(|m| m.name().to_string())
            .collect();
        if !required.is_empty() {
            return Err(AnnotationError::NonMarkerContract {
                contract: annotation.name().to_string(),
                members: required,
            });
        }
        builder.build()
    }

    /// Contract being built
    pub fn contract(&self) -> &InterfaceContract {
        &self.contract
    }

    /// Value assigned so far, defaults excluded
    pub fn assigned(&self, member: &str) -> Option<&Value> {
        self.values.get(member)
    }

    /// Assign a member, replacing an earlier assignment.
    ///
    /// Primitives widen to the member type and arrays are rebuilt with the
    /// member's element type.
    pub fn with<S>(&self, selector: S, value: impl Into<Value>) -> Result<Self, AnnotationError>
    where
        S: MemberSelector,
    {
        let member = selector.select(&self.contract)?;
        let value = value.into();
        let value = match value.convert_to(member.value_type()) {
            Some(converted) if !converted.is_null() => converted,
            _ => {
                return Err(AnnotationError::TypeMismatch {
                    member: member.name().to_string(),
                    expected: member.value_type().to_string(),
                    found: value.type_name(),
                })
            }
        };

        let mut values = (*self.values).clone();
        values.insert(member.name().to_string(), value);
        Ok(Self {
            contract: self.contract.clone(),
            values: Arc::new(values),
        })
    }

    /// Create the instance; fails listing every member still unassigned
    pub fn build(&self) -> Result<ObjectRef, AnnotationError> {
        let missing: Vec<String> = self
            .contract
            .required_members()
            .filter(|m| !self.values.contains_key(m.name()))
            .map(|m| m.name().to_string())
            .collect();
        if !missing.is_empty() {
            return Err(AnnotationError::MissingMember { members: missing });
        }

        let config = &IntrospectionConfig::current().annotation;
        let handler = AnnotationInvocationHandler {
            contract: self.contract.clone(),
            values: self.values.clone(),
            cache_hash_code: config.cache_hash_code,
            cache_representation: config.cache_representation,
            hash_code: OnceCell::new(),
            representation: OnceCell::new(),
        };
        let instance = ProxyBuilder::for_contract(self.contract.class())
            .with_handler(handler)
            .build()?;

        tracing::debug!(
            annotation = self.contract.name(),
            assigned = self.values.len(),
            "built annotation instance"
        );
        Ok(instance)
    }
}

impl fmt::Debug for AnnotationBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnnotationBuilder")
            .field("contract", &self.contract.name())
            .field("assigned", &self.values.len())
            .finish()
    }
}

// ============================================================================
// Hashing
// ============================================================================

/// Hash contribution of a member name
pub fn member_name_hash(name: &str) -> i32 {
    127i32.wrapping_mul(string_hash(name))
}

/// Annotation hash over `(member name, value)` pairs
pub fn annotation_hash_code<I, S>(members: I) -> Result<i32, ProxyError>
where
    I: IntoIterator<Item = (S, Value)>,
    S: AsRef<str>,
{
    let mut hash: i32 = 0;
    for (name, value) in members {
        hash = hash.wrapping_add(member_name_hash(name.as_ref()) ^ value.hash_code()?);
    }
    Ok(hash)
}

// ============================================================================
// Handler backing built instances
// ============================================================================

struct AnnotationInvocationHandler {
    contract: InterfaceContract,
    values: Arc<FxHashMap<String, Value>>,
    cache_hash_code: bool,
    cache_representation: bool,
    hash_code: OnceCell<i32>,
    representation: OnceCell<String>,
}

impl AnnotationInvocationHandler {
    fn value_of(&self, member: &MemberInfo) -> Value {
        self.values
            .get(member.name())
            .or_else(|| member.default_value())
            .cloned()
            .unwrap_or(Value::Null)
    }

    fn equals(&self, receiver: Option<&ObjectRef>, other: &Value) -> Result<bool, ProxyError> {
        let Value::Object(other) = other else {
            return Ok(false);
        };
        if receiver.is_some_and(|r| r.same_object(other)) {
            return Ok(true);
        }
        if !other.is_instance_of(AnnotationMethods::class()) {
            return Ok(false);
        }
        let other_type = other.invoke_method(AnnotationMethods::annotation_type(), Vec::new())?;
        if other_type != Value::from(self.contract.class()) {
            return Ok(false);
        }
        for member in self.contract.members() {
            let theirs = other.invoke_method(member.accessor(), Vec::new())?;
            if !self.value_of(member).equals(&theirs)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn compute_hash_code(&self) -> Result<i32, ProxyError> {
        annotation_hash_code(
            self.contract
                .members()
                .iter()
                .map(|m| (m.name(), self.value_of(m))),
        )
    }

    fn hash_code(&self) -> Result<i32, ProxyError> {
        if self.cache_hash_code {
            self.hash_code
                .get_or_try_init(|| self.compute_hash_code())
                .copied()
        } else {
            self.compute_hash_code()
        }
    }

    fn compute_representation(&self) -> String {
        let members: Vec<String> = self
            .contract
            .members()
            .iter()
            .map(|m| format!("{}={}", m.name(), self.value_of(m)))
            .collect();
        format!("@{}({})", self.contract.name(), members.join(", "))
    }

    fn representation(&self) -> String {
        if self.cache_representation {
            self.representation
                .get_or_init(|| self.compute_representation())
                .clone()
        } else {
            self.compute_representation()
        }
    }
}

impl InvocationHandler for AnnotationInvocationHandler {
    fn handle(&self, invocation: &Invocation) -> Result<HandlerResult, ProxyError> {
        let method = invocation.method();
        if method == ObjectMethods::equals() {
            let other = invocation.argument(0).unwrap_or(&Value::Null);
            return Ok(HandlerResult::resolved(
                self.equals(invocation.receiver(), other)?,
            ));
        }
        if method == ObjectMethods::hash_code() {
            return Ok(HandlerResult::resolved(self.hash_code()?));
        }
        if method == ObjectMethods::to_string() {
            return Ok(HandlerResult::resolved(self.representation()));
        }
        if method == AnnotationMethods::annotation_type() {
            return Ok(HandlerResult::resolved(TypeInfo::class(self.contract.class())));
        }
        match self.contract.member_for(method) {
            Some(member) => Ok(HandlerResult::Resolved(self.value_of(member))),
            None => Ok(HandlerResult::Declined),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ClassBuilder;

    fn range() -> ClassRef {
        ClassBuilder::annotation("test.Range")
            .member("min", TypeInfo::INT)
            .member_with_default("max", TypeInfo::INT, 100)
            .build()
    }

    #[test]
    fn test_member_name_hash() {
        assert_eq!(member_name_hash("value"), 127i32.wrapping_mul(111_972_721));
    }

    #[test]
    fn test_with_is_persistent() {
        let template = AnnotationBuilder::of(&range()).unwrap();
        let low = template.with("min", 1).unwrap();
        let high = template.with("min", 50).unwrap();
        assert!(template.assigned("min").is_none());
        assert_eq!(low.assigned("min"), Some(&Value::Int(1)));
        assert_eq!(high.assigned("min"), Some(&Value::Int(50)));
    }

    #[test]
    fn test_select_by_string_and_accessor() {
        let class = range();
        let builder = AnnotationBuilder::of(&class).unwrap();
        let by_string = builder.with(String::from("max"), 5).unwrap();
        assert_eq!(by_string.assigned("max"), Some(&Value::Int(5)));

        let accessor = class.declared_method(0).unwrap();
        let by_accessor = builder.with(&accessor, 3).unwrap();
        assert_eq!(by_accessor.assigned("min"), Some(&Value::Int(3)));
    }

    #[test]
    fn test_null_rejected() {
        let builder = AnnotationBuilder::of(&range()).unwrap();
        let err = builder.with("min", Value::Null).unwrap_err();
        assert!(matches!(err, AnnotationError::TypeMismatch { ref found, .. } if found == "null"));
    }

    #[test]
    fn test_assignment_widens_to_member_type() {
        let builder = AnnotationBuilder::of(&range()).unwrap();
        let widened = builder.with("min", Value::Short(3)).unwrap();
        assert_eq!(widened.assigned("min"), Some(&Value::Int(3)));
        assert!(builder.with("min", Value::Long(3)).is_err());
    }

    #[test]
    fn test_default_of_wrong_type_rejected() {
        let class = ClassBuilder::annotation("test.Label")
            .member_with_default("text", TypeInfo::String, 5)
            .build();
        let err = AnnotationBuilder::of(&class).unwrap_err();
        assert!(matches!(
            err,
            AnnotationError::TypeMismatch { ref member, ref found, .. } if member == "text" && found == "i32"
        ));
    }

    #[test]
    fn test_not_an_annotation() {
        let interface = ClassBuilder::interface("test.Iface").build();
        assert!(matches!(
            AnnotationBuilder::of(&interface),
            Err(AnnotationError::NotAnAnnotation(_))
        ));
    }

    #[test]
    fn test_default_used_for_unassigned_member() {
        let instance = AnnotationBuilder::of(&range())
            .unwrap()
            .with("min", 1)
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(instance.call("max", &[]).unwrap(), Value::Int(100));
        assert_eq!(
            instance.to_display_string().unwrap(),
            "@test.Range(min=1, max=100)"
        );
    }
}
