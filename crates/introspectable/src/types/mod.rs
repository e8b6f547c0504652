//! Runtime Type Metadata
//!
//! Rust carries no reflection data at runtime, so every type that takes part
//! in proxying, annotation building or reference introspection is described
//! explicitly with the vocabulary in this module.
//!
//! ## Identity
//!
//! [`ClassRef`] and [`MethodRef`] compare by identity: two handles are equal
//! only when they point at the same declaration. Metadata obtained from a
//! [`ClassRegistry`](crate::ClassRegistry) lookup and metadata produced by
//! introspecting a functional reference can therefore be compared directly.
//!
//! ## Root types
//!
//! Every class is implicitly a subtype of the root `object` class, which
//! declares `equals`, `hash_code` and `to_string` (see [`ObjectMethods`]).
//! Annotation types additionally extend the root `annotation` interface and
//! its `annotation_type` accessor (see [`AnnotationMethods`]).

mod builder;

pub use builder::{ClassBuilder, MethodDefinition};

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;

use crate::error::ProxyError;
use crate::value::{ObjectRef, Value};

/// Primitive value types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    /// `bool`
    Boolean,
    /// `i8`
    Byte,
    /// `char`
    Char,
    /// `i16`
    Short,
    /// `i32`
    Int,
    /// `i64`
    Long,
    /// `f32`
    Float,
    /// `f64`
    Double,
    /// `()`, only valid as a result type
    Void,
}

impl Primitive {
    /// Textual name used in signatures
    pub fn name(self) -> &'static str {
        match self {
            Primitive::Boolean => "bool",
            Primitive::Byte => "i8",
            Primitive::Char => "char",
            Primitive::Short => "i16",
            Primitive::Int => "i32",
            Primitive::Long => "i64",
            Primitive::Float => "f32",
            Primitive::Double => "f64",
            Primitive::Void => "()",
        }
    }

    /// Parse a textual primitive name
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "bool" => Primitive::Boolean,
            "i8" => Primitive::Byte,
            "char" => Primitive::Char,
            "i16" => Primitive::Short,
            "i32" => Primitive::Int,
            "i64" => Primitive::Long,
            "f32" => Primitive::Float,
            "f64" => Primitive::Double,
            "()" => Primitive::Void,
            _ => return None,
        })
    }

    /// The value an uninitialized slot of this type holds
    pub fn zero_value(self) -> Value {
        match self {
            Primitive::Boolean => Value::Boolean(false),
            Primitive::Byte => Value::Byte(0),
            Primitive::Char => Value::Char('\0'),
            Primitive::Short => Value::Short(0),
            Primitive::Int => Value::Int(0),
            Primitive::Long => Value::Long(0),
            Primitive::Float => Value::Float(0.0),
            Primitive::Double => Value::Double(0.0),
            Primitive::Void => Value::Null,
        }
    }
}

/// Declared type of a parameter, result or annotation member
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeInfo {
    /// Primitive value type
    Primitive(Primitive),
    /// Immutable text
    String,
    /// Top type, accepts every value
    Any,
    /// A type token (the result of `annotation_type`)
    Type,
    /// Array with the given element type
    Array(Box<TypeInfo>),
    /// Class, interface or annotation type
    Class(ClassRef),
}

impl TypeInfo {
    /// `bool`
    pub const BOOLEAN: TypeInfo = TypeInfo::Primitive(Primitive::Boolean);
    /// `i8`
    pub const BYTE: TypeInfo = TypeInfo::Primitive(Primitive::Byte);
    /// `char`
    pub const CHAR: TypeInfo = TypeInfo::Primitive(Primitive::Char);
    /// `i16`
    pub const SHORT: TypeInfo = TypeInfo::Primitive(Primitive::Short);
    /// `i32`
    pub const INT: TypeInfo = TypeInfo::Primitive(Primitive::Int);
    /// `i64`
    pub const LONG: TypeInfo = TypeInfo::Primitive(Primitive::Long);
    /// `f32`
    pub const FLOAT: TypeInfo = TypeInfo::Primitive(Primitive::Float);
    /// `f64`
    pub const DOUBLE: TypeInfo = TypeInfo::Primitive(Primitive::Double);
    /// `()`
    pub const VOID: TypeInfo = TypeInfo::Primitive(Primitive::Void);

    /// Array type with the given element type
    pub fn array_of(element: TypeInfo) -> Self {
        TypeInfo::Array(Box::new(element))
    }

    /// Type of the given class
    pub fn class(class: &ClassRef) -> Self {
        TypeInfo::Class(class.clone())
    }

    /// Check if this is a primitive type
    pub fn is_primitive(&self) -> bool {
        matches!(self, TypeInfo::Primitive(_))
    }

    /// Element type for arrays
    pub fn element_type(&self) -> Option<&TypeInfo> {
        match self {
            TypeInfo::Array(element) => Some(element),
            _ => None,
        }
    }

    /// Check whether a slot of this type can hold values of `other`
    pub fn is_assignable_from(&self, other: &TypeInfo) -> bool {
        match (self, other) {
            (TypeInfo::Any, _) => true,
            (TypeInfo::Primitive(a), TypeInfo::Primitive(b)) => a == b,
            (TypeInfo::String, TypeInfo::String) => true,
            (TypeInfo::Type, TypeInfo::Type) => true,
            (TypeInfo::Array(a), TypeInfo::Array(b)) => {
                if a.is_primitive() || b.is_primitive() {
                    a == b
                } else {
                    a.is_assignable_from(b)
                }
            }
            (TypeInfo::Class(a), TypeInfo::Class(b)) => b.is_subtype_of(a),
            (TypeInfo::Class(a), _) => a.is_root(),
            _ => false,
        }
    }

    /// The value an uninitialized slot of this type holds
    pub fn zero_value(&self) -> Value {
        match self {
            TypeInfo::Primitive(primitive) => primitive.zero_value(),
            _ => Value::Null,
        }
    }
}

impl fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeInfo::Primitive(primitive) => f.write_str(primitive.name()),
            TypeInfo::String => f.write_str("string"),
            TypeInfo::Any => f.write_str("any"),
            TypeInfo::Type => f.write_str("type"),
            TypeInfo::Array(element) => write!(f, "[{}]", element),
            TypeInfo::Class(class) => f.write_str(class.name()),
        }
    }
}

/// Kind of a declared type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassKind {
    /// Concrete class, cannot be proxied
    Class,
    /// Interface contract
    Interface,
    /// Annotation contract
    Annotation,
}

/// Kind of a declared method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    /// Called on a receiver
    Instance,
    /// Called without a receiver
    Static,
    /// Creates an instance of the declaring class
    Constructor,
}

/// Implementation attached to a method declaration.
///
/// Receives the receiver (absent for static methods and constructors) and
/// the already verified arguments.
pub type MethodBody =
    Arc<dyn Fn(Option<&ObjectRef>, &[Value]) -> Result<Value, ProxyError> + Send + Sync>;

/// Parameter information
#[derive(Debug, Clone)]
pub struct ParameterInfo {
    /// Parameter name
    pub name: String,
    /// Parameter type info
    pub type_info: TypeInfo,
    /// Parameter index
    pub index: usize,
}

/// Method declaration
pub struct MethodInfo {
    name: String,
    kind: MethodKind,
    parameters: Vec<ParameterInfo>,
    return_type: TypeInfo,
    default_value: Option<Value>,
    synthetic: bool,
    body: Option<MethodBody>,
}

impl fmt::Debug for MethodInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodInfo")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("parameters", &self.parameters)
            .field("return_type", &self.return_type)
            .field("default_value", &self.default_value)
            .field("synthetic", &self.synthetic)
            .field("has_body", &self.body.is_some())
            .finish()
    }
}

/// Reflection metadata for a single declared type
#[derive(Debug)]
pub struct ClassMetadata {
    name: String,
    kind: ClassKind,
    supertypes: Vec<ClassRef>,
    methods: Vec<MethodInfo>,
    /// Method name to declaration indices (overloads share a name)
    method_indices: FxHashMap<String, Vec<usize>>,
    synthetic: bool,
}

/// Shared handle to class metadata, compared by identity
#[derive(Clone)]
pub struct ClassRef(Arc<ClassMetadata>);

impl ClassRef {
    fn from_metadata(metadata: ClassMetadata) -> Self {
        ClassRef(Arc::new(metadata))
    }

    /// Fully qualified name
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Declared kind
    pub fn kind(&self) -> ClassKind {
        self.0.kind
    }

    /// Interfaces and annotations can be proxied
    pub fn is_interface(&self) -> bool {
        matches!(self.0.kind, ClassKind::Interface | ClassKind::Annotation)
    }

    /// Check if this is an annotation type
    pub fn is_annotation(&self) -> bool {
        self.0.kind == ClassKind::Annotation
    }

    /// Generated at runtime (proxy classes)
    pub fn is_synthetic(&self) -> bool {
        self.0.synthetic
    }

    /// Direct supertypes in declaration order
    pub fn supertypes(&self) -> &[ClassRef] {
        &self.0.supertypes
    }

    /// Identity of the declaration, stable while any handle is alive
    pub fn id(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }

    /// Number of declared methods
    pub fn declared_method_count(&self) -> usize {
        self.0.methods.len()
    }

    /// Declared method by index
    pub fn declared_method(&self, index: usize) -> Option<MethodRef> {
        (index < self.0.methods.len()).then(|| MethodRef {
            owner: self.clone(),
            index,
        })
    }

    /// Methods declared directly on this type
    pub fn declared_methods(&self) -> impl Iterator<Item = MethodRef> + '_ {
        (0..self.0.methods.len()).map(move |index| MethodRef {
            owner: self.clone(),
            index,
        })
    }

    /// Declared methods with the given name
    pub fn declared_methods_named<'a>(
        &'a self,
        name: &str,
    ) -> impl Iterator<Item = MethodRef> + 'a {
        let indices = self
            .0
            .method_indices
            .get(name)
            .map(|v| v.as_slice())
            .unwrap_or(&[]);
        indices.iter().map(move |&index| MethodRef {
            owner: self.clone(),
            index,
        })
    }

    /// Check if a method with the name is declared here
    pub fn has_method(&self, name: &str) -> bool {
        self.0.method_indices.contains_key(name)
    }

    /// Declared and inherited methods, excluding the root `object` class.
    ///
    /// Own declarations come first, then supertypes depth-first in
    /// declaration order; every declaration appears once.
    pub fn all_methods(&self) -> Vec<MethodRef> {
        let mut seen = Vec::new();
        let mut methods = Vec::new();
        self.collect_methods(&mut seen, &mut methods);
        methods
    }

    fn collect_methods(&self, seen: &mut Vec<usize>, methods: &mut Vec<MethodRef>) {
        if seen.contains(&self.id()) {
            return;
        }
        seen.push(self.id());
        methods.extend(self.declared_methods());
        for supertype in self.supertypes() {
            supertype.collect_methods(seen, methods);
        }
    }

    /// Find a method by name and parameter count.
    ///
    /// Searches own declarations, then supertypes depth-first, then the root
    /// `object` class.
    pub fn find_method(&self, name: &str, arity: usize) -> Option<MethodRef> {
        self.find_declared_or_inherited(name, arity).or_else(|| {
            ObjectMethods::class()
                .declared_methods_named(name)
                .find(|m| m.parameter_count() == arity)
        })
    }

    fn find_declared_or_inherited(&self, name: &str, arity: usize) -> Option<MethodRef> {
        if let Some(method) = self
            .declared_methods_named(name)
            .find(|m| m.parameter_count() == arity)
        {
            return Some(method);
        }
        self.supertypes()
            .iter()
            .find_map(|s| s.find_declared_or_inherited(name, arity))
    }

    /// Check if this type is `other` or inherits from it
    pub fn is_subtype_of(&self, other: &ClassRef) -> bool {
        if self == other || other.is_root() {
            return true;
        }
        self.supertypes().iter().any(|s| s.is_subtype_of(other))
    }

    /// Check if this is the root `object` class
    pub fn is_root(&self) -> bool {
        self == ObjectMethods::class()
    }
}

impl PartialEq for ClassRef {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for ClassRef {}

impl Hash for ClassRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl fmt::Debug for ClassRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClassRef({})", self.0.name)
    }
}

impl fmt::Display for ClassRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.name)
    }
}

/// Handle to a declared method, compared by identity
#[derive(Clone)]
pub struct MethodRef {
    owner: ClassRef,
    index: usize,
}

impl MethodRef {
    fn info(&self) -> &MethodInfo {
        &self.owner.0.methods[self.index]
    }

    /// Method name
    pub fn name(&self) -> &str {
        &self.info().name
    }

    /// Method kind
    pub fn kind(&self) -> MethodKind {
        self.info().kind
    }

    /// Check if the method takes no receiver
    pub fn is_static(&self) -> bool {
        self.info().kind == MethodKind::Static
    }

    /// Check if the method is a constructor
    pub fn is_constructor(&self) -> bool {
        self.info().kind == MethodKind::Constructor
    }

    /// Compiler-generated body (lambda implementation)
    pub fn is_synthetic(&self) -> bool {
        self.info().synthetic
    }

    /// Type declaring this method
    pub fn declaring_class(&self) -> &ClassRef {
        &self.owner
    }

    /// Index within the declaring class
    pub fn index(&self) -> usize {
        self.index
    }

    /// Parameter infos
    pub fn parameters(&self) -> &[ParameterInfo] {
        &self.info().parameters
    }

    /// Parameter types in order
    pub fn parameter_types(&self) -> Vec<TypeInfo> {
        self.parameters().iter().map(|p| p.type_info.clone()).collect()
    }

    /// Number of parameters
    pub fn parameter_count(&self) -> usize {
        self.info().parameters.len()
    }

    /// Declared result type; constructors produce their declaring class
    pub fn return_type(&self) -> TypeInfo {
        match self.info().kind {
            MethodKind::Constructor => TypeInfo::Class(self.owner.clone()),
            _ => self.info().return_type.clone(),
        }
    }

    /// Default value of an annotation member
    pub fn default_value(&self) -> Option<&Value> {
        self.info().default_value.as_ref()
    }

    /// Attached implementation, if any
    pub fn body(&self) -> Option<&MethodBody> {
        self.info().body.as_ref()
    }
}

impl PartialEq for MethodRef {
    fn eq(&self, other: &Self) -> bool {
        self.owner == other.owner && self.index == other.index
    }
}

impl Eq for MethodRef {}

impl Hash for MethodRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.owner.hash(state);
        self.index.hash(state);
    }
}

impl fmt::Display for MethodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}(", self.owner.name(), self.name())?;
        for (i, parameter) in self.parameters().iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", parameter.type_info)?;
        }
        write!(f, ") -> {}", self.return_type())
    }
}

impl fmt::Debug for MethodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MethodRef({})", self)
    }
}

static OBJECT_CLASS: Lazy<ClassRef> = Lazy::new(|| {
    ClassBuilder::class("object")
        .method(
            MethodDefinition::new("equals")
                .parameter("other", TypeInfo::Any)
                .returns(TypeInfo::BOOLEAN),
        )
        .method(MethodDefinition::new("hash_code").returns(TypeInfo::INT))
        .method(MethodDefinition::new("to_string").returns(TypeInfo::String))
        .build()
});

static EQUALS: Lazy<MethodRef> = Lazy::new(|| root_method(&OBJECT_CLASS, "equals"));
static HASH_CODE: Lazy<MethodRef> = Lazy::new(|| root_method(&OBJECT_CLASS, "hash_code"));
static TO_STRING: Lazy<MethodRef> = Lazy::new(|| root_method(&OBJECT_CLASS, "to_string"));

static ANNOTATION_CLASS: Lazy<ClassRef> = Lazy::new(|| {
    ClassBuilder::interface("annotation")
        .method(MethodDefinition::new("annotation_type").returns(TypeInfo::Type))
        .build()
});

static ANNOTATION_TYPE: Lazy<MethodRef> =
    Lazy::new(|| root_method(&ANNOTATION_CLASS, "annotation_type"));

/// Method of a built-in class; built-in classes declare every name looked up
pub(crate) fn root_method(class: &ClassRef, name: &str) -> MethodRef {
    let index = class
        .declared_methods()
        .position(|m| m.name() == name)
        .unwrap_or_default();
    MethodRef {
        owner: class.clone(),
        index,
    }
}

/// Methods every object answers
pub struct ObjectMethods;

impl ObjectMethods {
    /// The root `object` class
    pub fn class() -> &'static ClassRef {
        &OBJECT_CLASS
    }

    /// `equals(any) -> bool`
    pub fn equals() -> &'static MethodRef {
        &EQUALS
    }

    /// `hash_code() -> i32`
    pub fn hash_code() -> &'static MethodRef {
        &HASH_CODE
    }

    /// `to_string() -> string`
    pub fn to_string() -> &'static MethodRef {
        &TO_STRING
    }

    /// Check if `method` is one of the root object methods
    pub fn is_object_method(method: &MethodRef) -> bool {
        method.declaring_class() == ObjectMethods::class()
    }
}

/// Methods every annotation answers
pub struct AnnotationMethods;

impl AnnotationMethods {
    /// The root `annotation` interface
    pub fn class() -> &'static ClassRef {
        &ANNOTATION_CLASS
    }

    /// `annotation_type() -> type`
    pub fn annotation_type() -> &'static MethodRef {
        &ANNOTATION_TYPE
    }
}
