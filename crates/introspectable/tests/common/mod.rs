//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::any::Any;

use introspectable::{
    annotation_hash_code, AnnotationMethods, ClassBuilder, ClassRef, ClassRegistry, Invocation,
    MethodDefinition, Object, ObjectMethods, ObjectRef, ProxyError, TypeInfo, Value,
};

pub const DEFAULT_ONE: &str = "defaultOne";

/// Route library events to the test writer
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Annotation contracts used across suites
pub struct Annotations {
    pub marker: ClassRef,
    pub single: ClassRef,
    pub multiple: ClassRef,
    pub tagged: ClassRef,
}

impl Annotations {
    pub fn new() -> Self {
        let marker = ClassBuilder::annotation("fixtures.Marker").build();
        let single = ClassBuilder::annotation("fixtures.Single")
            .member("value", TypeInfo::String)
            .build();
        let multiple = ClassBuilder::annotation("fixtures.Multiple")
            .member_with_default("one", TypeInfo::String, DEFAULT_ONE)
            .member("two", TypeInfo::String)
            .member("three", TypeInfo::INT)
            .build();
        let tagged = ClassBuilder::annotation("fixtures.Tagged")
            .member("tags", TypeInfo::array_of(TypeInfo::String))
            .member_with_default("weights", TypeInfo::array_of(TypeInfo::INT), Value::array(TypeInfo::INT, vec![]))
            .build();
        Self {
            marker,
            single,
            multiple,
            tagged,
        }
    }
}

/// Annotation object implemented directly, the way annotations attached to
/// declarations are materialized
pub struct NativeAnnotation {
    class: ClassRef,
    annotation: ClassRef,
    values: Vec<(String, Value)>,
}

impl NativeAnnotation {
    pub fn create(annotation: &ClassRef, values: Vec<(&str, Value)>) -> ObjectRef {
        let class = ClassBuilder::class(format!("{}$Native", annotation.name()))
            .extends(annotation)
            .build();
        ObjectRef::new(NativeAnnotation {
            class,
            annotation: annotation.clone(),
            values: values
                .into_iter()
                .map(|(name, value)| (name.to_string(), value))
                .collect(),
        })
    }

    fn value(&self, name: &str) -> Option<&Value> {
        self.values.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }
}

impl Object for NativeAnnotation {
    fn class(&self) -> ClassRef {
        self.class.clone()
    }

    fn invoke(&self, invocation: &Invocation) -> Result<Value, ProxyError> {
        let method = invocation.method();
        if method == ObjectMethods::hash_code() {
            let hash = annotation_hash_code(self.values.iter().map(|(n, v)| (n.as_str(), v.clone())))?;
            return Ok(Value::Int(hash));
        }
        if method == ObjectMethods::equals() {
            let Some(Value::Object(other)) = invocation.argument(0) else {
                return Ok(Value::Boolean(false));
            };
            if !other.is_instance_of(AnnotationMethods::class())
                || other.call("annotation_type", &[])? != Value::from(&self.annotation)
            {
                return Ok(Value::Boolean(false));
            }
            for (name, value) in &self.values {
                if !value.equals(&other.call(name, &[])?)? {
                    return Ok(Value::Boolean(false));
                }
            }
            return Ok(Value::Boolean(true));
        }
        if method == ObjectMethods::to_string() {
            let members: Vec<String> = self
                .values
                .iter()
                .map(|(n, v)| format!("{}={}", n, v))
                .collect();
            return Ok(Value::from(format!(
                "@{}({})",
                self.annotation.name(),
                members.join(", ")
            )));
        }
        if method == AnnotationMethods::annotation_type() {
            return Ok(Value::from(&self.annotation));
        }
        self.value(method.name())
            .cloned()
            .ok_or_else(|| ProxyError::UnhandledInvocation(Box::new(invocation.clone())))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Classes backing functional reference suites
pub struct Library {
    pub registry: ClassRegistry,
    /// `fixtures.Clock` with static `now() -> i64` and `parse(string) -> i64`
    pub clock: ClassRef,
    /// `fixtures.Sized` interface with `size() -> i32`
    pub sized: ClassRef,
    /// `fixtures.Text` implementing `fixtures.Sized`
    pub text: ClassRef,
    /// `fixtures.Callers`, the class lambdas are created in
    pub callers: ClassRef,
}

impl Library {
    pub fn new() -> Self {
        let registry = ClassRegistry::new();
        let clock = ClassBuilder::class("fixtures.Clock")
            .method(
                MethodDefinition::new("now")
                    .as_static()
                    .returns(TypeInfo::LONG)
                    .implemented_by(|_, _| Ok(Value::Long(1_000))),
            )
            .method(
                MethodDefinition::new("parse")
                    .as_static()
                    .parameter("text", TypeInfo::String)
                    .returns(TypeInfo::LONG)
                    .implemented_by(|_, args| {
                        let text = args[0].as_str().unwrap_or_default();
                        text.parse::<i64>()
                            .map(Value::Long)
                            .map_err(|e| ProxyError::Failed(e.to_string()))
                    }),
            )
            .build();
        let sized = ClassBuilder::interface("fixtures.Sized")
            .method(MethodDefinition::new("size").returns(TypeInfo::INT))
            .build();
        let text = ClassBuilder::class("fixtures.Text")
            .extends(&sized)
            .method(MethodDefinition::constructor().parameter("content", TypeInfo::String))
            .method(
                MethodDefinition::new("concat")
                    .parameter("suffix", TypeInfo::String)
                    .returns(TypeInfo::String),
            )
            .build();
        let callers = ClassBuilder::class("fixtures.Callers")
            .method(
                MethodDefinition::new("lambda$greet$0")
                    .as_static()
                    .synthetic()
                    .parameter("greeting", TypeInfo::String)
                    .parameter("name", TypeInfo::String)
                    .returns(TypeInfo::String),
            )
            .build();

        for class in [&clock, &sized, &text, &callers] {
            registry.register(class);
        }
        Self {
            registry,
            clock,
            sized,
            text,
            callers,
        }
    }

    pub fn text_object(&self, content: &str) -> ObjectRef {
        ObjectRef::new(TextObject {
            class: self.text.clone(),
            content: content.to_string(),
        })
    }
}

/// Instance of `fixtures.Text`
pub struct TextObject {
    class: ClassRef,
    pub content: String,
}

impl Object for TextObject {
    fn class(&self) -> ClassRef {
        self.class.clone()
    }

    fn invoke(&self, invocation: &Invocation) -> Result<Value, ProxyError> {
        match invocation.method().name() {
            "size" => Ok(Value::Int(self.content.chars().count() as i32)),
            "concat" => {
                let suffix = invocation.argument(0).and_then(Value::as_str).unwrap_or_default();
                Ok(Value::from(format!("{}{}", self.content, suffix)))
            }
            "to_string" => Ok(Value::from(self.content.as_str())),
            "hash_code" => Ok(Value::Int(introspectable::string_hash(&self.content))),
            "equals" => Ok(Value::Boolean(matches!(
                invocation.argument(0),
                Some(Value::Object(o)) if o.downcast_ref::<TextObject>().is_some_and(|t| t.content == self.content)
            ))),
            _ => Err(ProxyError::UnhandledInvocation(Box::new(invocation.clone()))),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
