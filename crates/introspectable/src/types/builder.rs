//! Builders for class and method declarations

use std::sync::Arc;

use rustc_hash::FxHashMap;

use super::{
    AnnotationMethods, ClassKind, ClassMetadata, ClassRef, MethodBody, MethodInfo, MethodKind,
    ParameterInfo, TypeInfo,
};
use crate::error::ProxyError;
use crate::value::{ObjectRef, Value};

/// Method declaration under construction
pub struct MethodDefinition {
    name: String,
    kind: MethodKind,
    parameters: Vec<(String, TypeInfo)>,
    return_type: TypeInfo,
    default_value: Option<Value>,
    synthetic: bool,
    body: Option<MethodBody>,
}

impl MethodDefinition {
    /// Instance method returning `()` with no parameters
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: MethodKind::Instance,
            parameters: Vec::new(),
            return_type: TypeInfo::VOID,
            default_value: None,
            synthetic: false,
            body: None,
        }
    }

    /// Constructor named `new`
    pub fn constructor() -> Self {
        let mut definition = Self::new("new");
        definition.kind = MethodKind::Constructor;
        definition
    }

    /// Make the method static
    pub fn as_static(mut self) -> Self {
        self.kind = MethodKind::Static;
        self
    }

    /// Append a parameter
    pub fn parameter(mut self, name: impl Into<String>, type_info: TypeInfo) -> Self {
        self.parameters.push((name.into(), type_info));
        self
    }

    /// Set the result type
    pub fn returns(mut self, type_info: TypeInfo) -> Self {
        self.return_type = type_info;
        self
    }

    /// Default for an annotation member
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    /// Mark as compiler generated
    pub fn synthetic(mut self) -> Self {
        self.synthetic = true;
        self
    }

    /// Attach an implementation
    pub fn implemented_by<F>(mut self, body: F) -> Self
    where
        F: Fn(Option<&ObjectRef>, &[Value]) -> Result<Value, ProxyError> + Send + Sync + 'static,
    {
        self.body = Some(Arc::new(body));
        self
    }

    fn into_info(self) -> MethodInfo {
        let parameters = self
            .parameters
            .into_iter()
            .enumerate()
            .map(|(index, (name, type_info))| ParameterInfo {
                name,
                type_info,
                index,
            })
            .collect();
        let default_value = self
            .default_value
            .map(|value| value.convert_to(&self.return_type).unwrap_or(value));
        MethodInfo {
            name: self.name,
            kind: self.kind,
            parameters,
            return_type: self.return_type,
            default_value,
            synthetic: self.synthetic,
            body: self.body,
        }
    }
}

/// Builder for class, interface and annotation declarations
///
/// ```ignore
/// let greeter = ClassBuilder::interface("demo.Greeter")
///     .method(
///         MethodDefinition::new("greet")
///             .parameter("name", TypeInfo::String)
///             .returns(TypeInfo::String),
///     )
///     .build();
/// ```
pub struct ClassBuilder {
    name: String,
    kind: ClassKind,
    supertypes: Vec<ClassRef>,
    methods: Vec<MethodDefinition>,
    synthetic: bool,
}

impl ClassBuilder {
    fn new(name: impl Into<String>, kind: ClassKind) -> Self {
        Self {
            name: name.into(),
            kind,
            supertypes: Vec::new(),
            methods: Vec::new(),
            synthetic: false,
        }
    }

    /// Start a concrete class
    pub fn class(name: impl Into<String>) -> Self {
        Self::new(name, ClassKind::Class)
    }

    /// Start an interface contract
    pub fn interface(name: impl Into<String>) -> Self {
        Self::new(name, ClassKind::Interface)
    }

    /// Start an annotation contract, extending the root `annotation` interface
    pub fn annotation(name: impl Into<String>) -> Self {
        let mut builder = Self::new(name, ClassKind::Annotation);
        builder.supertypes.push(AnnotationMethods::class().clone());
        builder
    }

    /// Add a direct supertype
    pub fn extends(mut self, supertype: &ClassRef) -> Self {
        if !self.supertypes.contains(supertype) {
            self.supertypes.push(supertype.clone());
        }
        self
    }

    /// Add a method declaration
    pub fn method(mut self, method: MethodDefinition) -> Self {
        self.methods.push(method);
        self
    }

    /// Add an annotation member without a default
    pub fn member(self, name: impl Into<String>, value_type: TypeInfo) -> Self {
        self.method(MethodDefinition::new(name).returns(value_type))
    }

    /// Add an annotation member with a default.
    ///
    /// The default is widened to `value_type` when the class is built; a
    /// default that still does not fit is rejected by `AnnotationBuilder::of`.
    pub fn member_with_default(
        self,
        name: impl Into<String>,
        value_type: TypeInfo,
        default: impl Into<Value>,
    ) -> Self {
        self.method(
            MethodDefinition::new(name)
                .returns(value_type)
                .default_value(default),
        )
    }

    /// Mark as generated at runtime
    pub fn synthetic(mut self) -> Self {
        self.synthetic = true;
        self
    }

    /// Finish the declaration
    pub fn build(self) -> ClassRef {
        let mut method_indices: FxHashMap<String, Vec<usize>> = FxHashMap::default();
        let methods: Vec<MethodInfo> = self
            .methods
            .into_iter()
            .enumerate()
            .map(|(index, definition)| {
                method_indices
                    .entry(definition.name.clone())
                    .or_default()
                    .push(index);
                definition.into_info()
            })
            .collect();

        ClassRef::from_metadata(ClassMetadata {
            name: self.name,
            kind: self.kind,
            supertypes: self.supertypes,
            methods,
            method_indices,
            synthetic: self.synthetic,
        })
    }
}
