//! Values exchanged with proxies, annotation members and method bodies
//!
//! Equality and hashing follow fixed rules so that annotation hash codes are
//! stable and comparable with natively constructed annotation objects:
//!
//! | value     | hash                                   |
//! |-----------|----------------------------------------|
//! | `bool`    | `1231` for true, `1237` for false      |
//! | `i8 i16 i32 char` | the numeric value              |
//! | `i64`     | `(v ^ (v >>> 32)) as i32`              |
//! | `f32`     | canonical bit pattern                  |
//! | `f64`     | canonical bits folded like `i64`       |
//! | `string`  | `31 * h + unit` over UTF-16 code units |
//! | array     | `31 * h + hash(e)` starting from `1`   |
//! | null      | `0`                                    |
//!
//! Floating point values compare by canonical bit pattern, so `NaN` equals
//! `NaN` and `0.0` differs from `-0.0`.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::error::ProxyError;
use crate::proxy::Invocation;
use crate::types::{ClassRef, MethodRef, ObjectMethods, Primitive, TypeInfo};

/// Runtime object participating in dynamic dispatch
pub trait Object: Send + Sync + 'static {
    /// Runtime class of this object
    fn class(&self) -> ClassRef;

    /// Execute an already verified invocation whose receiver is this object
    fn invoke(&self, invocation: &Invocation) -> Result<Value, ProxyError>;

    /// Downcast support
    fn as_any(&self) -> &dyn Any;

    /// Resolve a method by name and arity for [`ObjectRef::call`]
    fn resolve_method(&self, name: &str, arity: usize) -> Option<MethodRef> {
        self.class().find_method(name, arity)
    }
}

/// Shared handle to an [`Object`]
#[derive(Clone)]
pub struct ObjectRef(Arc<dyn Object>);

impl ObjectRef {
    /// Wrap an object
    pub fn new<O: Object>(object: O) -> Self {
        ObjectRef(Arc::new(object))
    }

    /// Runtime class
    pub fn class(&self) -> ClassRef {
        self.0.class()
    }

    /// Call a method by name, resolving it against the runtime class
    pub fn call(&self, name: &str, arguments: &[Value]) -> Result<Value, ProxyError> {
        let method = self
            .0
            .resolve_method(name, arguments.len())
            .ok_or_else(|| ProxyError::NoSuchMethod {
                class: self.class().name().to_string(),
                name: name.to_string(),
                arity: arguments.len(),
            })?;
        self.invoke_method(&method, arguments.to_vec())
    }

    /// Call a specific method with this object as the receiver
    pub fn invoke_method(
        &self,
        method: &MethodRef,
        arguments: Vec<Value>,
    ) -> Result<Value, ProxyError> {
        let invocation = Invocation::of(method.clone(), Some(self.clone()), arguments)?;
        self.dispatch(&invocation)
    }

    /// Hand a verified invocation to the object's implementation
    pub fn dispatch(&self, invocation: &Invocation) -> Result<Value, ProxyError> {
        self.0.invoke(invocation)
    }

    /// `equals` as answered by the object
    pub fn equals(&self, other: &Value) -> Result<bool, ProxyError> {
        match self.invoke_method(ObjectMethods::equals(), vec![other.clone()])? {
            Value::Boolean(b) => Ok(b),
            other => Err(unexpected_result("equals", &other)),
        }
    }

    /// `hash_code` as answered by the object
    pub fn hash_code(&self) -> Result<i32, ProxyError> {
        match self.invoke_method(ObjectMethods::hash_code(), Vec::new())? {
            Value::Int(h) => Ok(h),
            other => Err(unexpected_result("hash_code", &other)),
        }
    }

    /// `to_string` as answered by the object
    pub fn to_display_string(&self) -> Result<String, ProxyError> {
        match self.invoke_method(ObjectMethods::to_string(), Vec::new())? {
            Value::String(s) => Ok(s.to_string()),
            other => Err(unexpected_result("to_string", &other)),
        }
    }

    /// Check if the runtime class is a subtype of `class`
    pub fn is_instance_of(&self, class: &ClassRef) -> bool {
        self.class().is_subtype_of(class)
    }

    /// Check if both handles point at the same object
    pub fn same_object(&self, other: &ObjectRef) -> bool {
        self.address() == other.address()
    }

    /// Address of the shared object
    pub fn address(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }

    /// Identity hash derived from the address
    pub fn identity_hash(&self) -> i32 {
        fold_long(self.address() as i64)
    }

    /// Downcast to a concrete object type
    pub fn downcast_ref<T: Object>(&self) -> Option<&T> {
        self.0.as_any().downcast_ref::<T>()
    }
}

fn unexpected_result(method: &str, value: &Value) -> ProxyError {
    ProxyError::Failed(format!(
        "{} returned {} instead of the declared type",
        method,
        value.type_name()
    ))
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectRef({}@{:x})", self.class().name(), self.address())
    }
}

/// Array value with its declared element type
#[derive(Debug, Clone)]
pub struct ArrayValue {
    element_type: TypeInfo,
    items: Arc<[Value]>,
}

impl ArrayValue {
    /// Create an array
    pub fn new(element_type: TypeInfo, items: Vec<Value>) -> Self {
        Self {
            element_type,
            items: items.into(),
        }
    }

    /// Declared element type
    pub fn element_type(&self) -> &TypeInfo {
        &self.element_type
    }

    /// Elements
    pub fn items(&self) -> &[Value] {
        &self.items
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if the array has no elements
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Dynamically typed value
#[derive(Debug, Clone)]
pub enum Value {
    /// Absent reference
    Null,
    /// `bool`
    Boolean(bool),
    /// `i8`
    Byte(i8),
    /// `char`
    Char(char),
    /// `i16`
    Short(i16),
    /// `i32`
    Int(i32),
    /// `i64`
    Long(i64),
    /// `f32`
    Float(f32),
    /// `f64`
    Double(f64),
    /// `string`
    String(Arc<str>),
    /// Array of values
    Array(ArrayValue),
    /// Type token
    Type(TypeInfo),
    /// Object reference
    Object(ObjectRef),
}

impl Value {
    /// Build an array value
    pub fn array(element_type: TypeInfo, items: Vec<Value>) -> Self {
        Value::Array(ArrayValue::new(element_type, items))
    }

    /// Build a `[string]` value
    pub fn string_array<S: AsRef<str>>(items: &[S]) -> Self {
        Value::array(
            TypeInfo::String,
            items.iter().map(|s| Value::from(s.as_ref())).collect(),
        )
    }

    /// Check if the value is null
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Get as bool
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as i32
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Get as i64
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Long(l) => Some(*l),
            _ => None,
        }
    }

    /// Get as f64
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Double(d) => Some(*d),
            _ => None,
        }
    }

    /// Get as string slice
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get as array
    pub fn as_array(&self) -> Option<&ArrayValue> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Get as type token
    pub fn as_type(&self) -> Option<&TypeInfo> {
        match self {
            Value::Type(t) => Some(t),
            _ => None,
        }
    }

    /// Get as object
    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Runtime type; `null` reports `any`
    pub fn runtime_type(&self) -> TypeInfo {
        match self {
            Value::Null => TypeInfo::Any,
            Value::Boolean(_) => TypeInfo::BOOLEAN,
            Value::Byte(_) => TypeInfo::BYTE,
            Value::Char(_) => TypeInfo::CHAR,
            Value::Short(_) => TypeInfo::SHORT,
            Value::Int(_) => TypeInfo::INT,
            Value::Long(_) => TypeInfo::LONG,
            Value::Float(_) => TypeInfo::FLOAT,
            Value::Double(_) => TypeInfo::DOUBLE,
            Value::String(_) => TypeInfo::String,
            Value::Array(a) => TypeInfo::array_of(a.element_type.clone()),
            Value::Type(_) => TypeInfo::Type,
            Value::Object(o) => TypeInfo::Class(o.class()),
        }
    }

    /// Name of the runtime type for diagnostics
    pub fn type_name(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            other => other.runtime_type().to_string(),
        }
    }

    /// Check if a slot of type `type_info` can hold this value
    pub fn is_instance_of(&self, type_info: &TypeInfo) -> bool {
        match (self, type_info) {
            (_, TypeInfo::Any) => true,
            (Value::Null, t) => !t.is_primitive(),
            (Value::Boolean(_), TypeInfo::Primitive(Primitive::Boolean))
            | (Value::Byte(_), TypeInfo::Primitive(Primitive::Byte))
            | (Value::Char(_), TypeInfo::Primitive(Primitive::Char))
            | (Value::Short(_), TypeInfo::Primitive(Primitive::Short))
            | (Value::Int(_), TypeInfo::Primitive(Primitive::Int))
            | (Value::Long(_), TypeInfo::Primitive(Primitive::Long))
            | (Value::Float(_), TypeInfo::Primitive(Primitive::Float))
            | (Value::Double(_), TypeInfo::Primitive(Primitive::Double))
            | (Value::String(_), TypeInfo::String)
            | (Value::Type(_), TypeInfo::Type) => true,
            (Value::Array(a), TypeInfo::Array(element)) => {
                type_info.is_assignable_from(&TypeInfo::array_of(a.element_type.clone()))
                    || (!element.is_primitive()
                        && !a.element_type.is_primitive()
                        && a.items.iter().all(|item| item.is_instance_of(element)))
            }
            (Value::Object(o), TypeInfo::Class(class)) => o.is_instance_of(class),
            (_, TypeInfo::Class(class)) => class.is_root(),
            _ => false,
        }
    }

    /// This value converted for a slot of type `target`.
    ///
    /// Primitives widen to larger primitives and arrays take the slot's
    /// element type. `None` if the value cannot be stored there.
    pub fn convert_to(&self, target: &TypeInfo) -> Option<Value> {
        match (self, target) {
            (Value::Array(a), TypeInfo::Array(element)) if a.element_type != **element => {
                let items = a
                    .items
                    .iter()
                    .map(|item| item.convert_to(element))
                    .collect::<Option<Vec<_>>>()?;
                Some(Value::array((**element).clone(), items))
            }
            (_, TypeInfo::Primitive(primitive)) => self
                .widen(*primitive)
                .or_else(|| self.is_instance_of(target).then(|| self.clone())),
            _ => self.is_instance_of(target).then(|| self.clone()),
        }
    }

    fn widen(&self, target: Primitive) -> Option<Value> {
        let value = match (self, target) {
            (Value::Byte(v), Primitive::Short) => Value::Short(i16::from(*v)),
            (Value::Byte(v), Primitive::Int) => Value::Int(i32::from(*v)),
            (Value::Byte(v), Primitive::Long) => Value::Long(i64::from(*v)),
            (Value::Byte(v), Primitive::Float) => Value::Float(f32::from(*v)),
            (Value::Byte(v), Primitive::Double) => Value::Double(f64::from(*v)),
            (Value::Short(v), Primitive::Int) => Value::Int(i32::from(*v)),
            (Value::Short(v), Primitive::Long) => Value::Long(i64::from(*v)),
            (Value::Short(v), Primitive::Float) => Value::Float(f32::from(*v)),
            (Value::Short(v), Primitive::Double) => Value::Double(f64::from(*v)),
            (Value::Char(c), Primitive::Int) => Value::Int(*c as i32),
            (Value::Char(c), Primitive::Long) => Value::Long(i64::from(u32::from(*c))),
            (Value::Char(c), Primitive::Float) => Value::Float(u32::from(*c) as f32),
            (Value::Char(c), Primitive::Double) => Value::Double(f64::from(u32::from(*c))),
            (Value::Int(v), Primitive::Long) => Value::Long(i64::from(*v)),
            (Value::Int(v), Primitive::Float) => Value::Float(*v as f32),
            (Value::Int(v), Primitive::Double) => Value::Double(f64::from(*v)),
            (Value::Long(v), Primitive::Float) => Value::Float(*v as f32),
            (Value::Long(v), Primitive::Double) => Value::Double(*v as f64),
            (Value::Float(v), Primitive::Double) => Value::Double(f64::from(*v)),
            _ => return None,
        };
        Some(value)
    }

    /// Value equality; objects answer through their `equals`
    pub fn equals(&self, other: &Value) -> Result<bool, ProxyError> {
        Ok(match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Byte(a), Value::Byte(b)) => a == b,
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::Short(a), Value::Short(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Long(a), Value::Long(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => float_bits(*a) == float_bits(*b),
            (Value::Double(a), Value::Double(b)) => double_bits(*a) == double_bits(*b),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Type(a), Value::Type(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => {
                if a.element_type != b.element_type || a.len() != b.len() {
                    return Ok(false);
                }
                for (x, y) in a.items.iter().zip(b.items.iter()) {
                    if !x.equals(y)? {
                        return Ok(false);
                    }
                }
                true
            }
            (Value::Object(a), _) => a.equals(other)?,
            _ => false,
        })
    }

    /// Value hash; objects answer through their `hash_code`
    pub fn hash_code(&self) -> Result<i32, ProxyError> {
        Ok(match self {
            Value::Null => 0,
            Value::Boolean(true) => 1231,
            Value::Boolean(false) => 1237,
            Value::Byte(b) => i32::from(*b),
            Value::Char(c) => *c as i32,
            Value::Short(s) => i32::from(*s),
            Value::Int(i) => *i,
            Value::Long(l) => fold_long(*l),
            Value::Float(f) => float_bits(*f) as i32,
            Value::Double(d) => fold_long(double_bits(*d) as i64),
            Value::String(s) => string_hash(s),
            Value::Type(t) => string_hash(&t.to_string()),
            Value::Array(a) => {
                let mut hash: i32 = 1;
                for item in a.items.iter() {
                    hash = hash.wrapping_mul(31).wrapping_add(item.hash_code()?);
                }
                hash
            }
            Value::Object(o) => o.hash_code()?,
        })
    }
}

/// Polynomial string hash over UTF-16 code units
pub fn string_hash(s: &str) -> i32 {
    s.encode_utf16()
        .fold(0i32, |h, unit| h.wrapping_mul(31).wrapping_add(i32::from(unit)))
}

fn fold_long(v: i64) -> i32 {
    (v ^ ((v as u64) >> 32) as i64) as i32
}

fn float_bits(f: f32) -> u32 {
    if f.is_nan() {
        0x7fc0_0000
    } else {
        f.to_bits()
    }
}

fn double_bits(d: f64) -> u64 {
    if d.is_nan() {
        0x7ff8_0000_0000_0000
    } else {
        d.to_bits()
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other).unwrap_or(false)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Byte(b) => write!(f, "{}", b),
            Value::Char(c) => write!(f, "{}", c),
            Value::Short(s) => write!(f, "{}", s),
            Value::Int(i) => write!(f, "{}", i),
            Value::Long(l) => write!(f, "{}", l),
            Value::Float(x) => write!(f, "{:?}", x),
            Value::Double(x) => write!(f, "{:?}", x),
            Value::String(s) => write!(f, "{}", s),
            Value::Type(t) => write!(f, "{}", t),
            Value::Array(a) => {
                write!(f, "[")?;
                for (i, item) in a.items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Object(o) => match o.to_display_string() {
                Ok(s) => write!(f, "{}", s),
                Err(_) => write!(f, "{}@{:x}", o.class().name(), o.address()),
            },
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i8> for Value {
    fn from(b: i8) -> Self {
        Value::Byte(b)
    }
}

impl From<char> for Value {
    fn from(c: char) -> Self {
        Value::Char(c)
    }
}

impl From<i16> for Value {
    fn from(s: i16) -> Self {
        Value::Short(s)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i)
    }
}

impl From<i64> for Value {
    fn from(l: i64) -> Self {
        Value::Long(l)
    }
}

impl From<f32> for Value {
    fn from(x: f32) -> Self {
        Value::Float(x)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Double(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(Arc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(Arc::from(s))
    }
}

impl From<TypeInfo> for Value {
    fn from(t: TypeInfo) -> Self {
        Value::Type(t)
    }
}

impl From<&ClassRef> for Value {
    fn from(class: &ClassRef) -> Self {
        Value::Type(TypeInfo::Class(class.clone()))
    }
}

impl From<ObjectRef> for Value {
    fn from(o: ObjectRef) -> Self {
        Value::Object(o)
    }
}

impl From<ArrayValue> for Value {
    fn from(a: ArrayValue) -> Self {
        Value::Array(a)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}
