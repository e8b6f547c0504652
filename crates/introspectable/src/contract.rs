//! Interface contracts
//!
//! The member view of an interface or annotation type: which members an
//! implementation must supply, their declared value types and defaults.

use std::fmt;
use std::sync::Arc;

use crate::types::{ClassRef, MethodKind, MethodRef, TypeInfo};
use crate::value::Value;

/// One required member of a contract
#[derive(Debug, Clone)]
pub struct MemberInfo {
    name: String,
    value_type: TypeInfo,
    default: Option<Value>,
    accessor: MethodRef,
}

impl MemberInfo {
    /// Member name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared value type
    pub fn value_type(&self) -> &TypeInfo {
        &self.value_type
    }

    /// Default value, annotation members only
    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// Check if the member has a default
    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    /// Method answering this member
    pub fn accessor(&self) -> &MethodRef {
        &self.accessor
    }
}

/// Members of an interface or annotation type, in declaration order.
///
/// Annotation members are the zero-parameter methods of the annotation and
/// of the annotations it extends; a redeclared name keeps the nearest
/// declaration. Interface members are every instance method, inherited ones included.
#[derive(Clone)]
pub struct InterfaceContract {
    class: ClassRef,
    members: Arc<[MemberInfo]>,
}

impl InterfaceContract {
    /// Contract view of `class`
    pub fn of(class: &ClassRef) -> Self {
        let methods: Vec<MethodRef> = if class.is_annotation() {
            let mut accessors: Vec<MethodRef> = Vec::new();
            for method in class.all_methods() {
                if method.kind() == MethodKind::Instance
                    && method.parameter_count() == 0
                    && method.declaring_class().is_annotation()
                    && !accessors.iter().any(|a| a.name() == method.name())
                {
                    accessors.push(method);
                }
            }
            accessors
        } else {
            class
                .all_methods()
                .into_iter()
                .filter(|m| m.kind() == MethodKind::Instance)
                .collect()
        };

        let members = methods
            .into_iter()
            .map(|accessor| MemberInfo {
                name: accessor.name().to_string(),
                value_type: accessor.return_type(),
                default: accessor.default_value().cloned(),
                accessor,
            })
            .collect();

        Self {
            class: class.clone(),
            members,
        }
    }

    /// Contract type
    pub fn class(&self) -> &ClassRef {
        &self.class
    }

    /// Contract type name
    pub fn name(&self) -> &str {
        self.class.name()
    }

    /// Members in declaration order
    pub fn members(&self) -> &[MemberInfo] {
        &self.members
    }

    /// Member by name
    pub fn member(&self, name: &str) -> Option<&MemberInfo> {
        self.members.iter().find(|m| m.name == name)
    }

    /// Member answered by `accessor`
    pub fn member_for(&self, accessor: &MethodRef) -> Option<&MemberInfo> {
        self.members.iter().find(|m| &m.accessor == accessor)
    }

    /// Members without a default
    pub fn required_members(&self) -> impl Iterator<Item = &MemberInfo> {
        self.members.iter().filter(|m| m.default.is_none())
    }

    /// Check if every member has a default
    pub fn is_marker(&self) -> bool {
        self.required_members().next().is_none()
    }
}

impl fmt::Debug for InterfaceContract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterfaceContract")
            .field("class", &self.class)
            .field(
                "members",
                &self.members.iter().map(|m| m.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}
