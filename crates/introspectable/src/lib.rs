//! Introspectable - runtime type metadata, dynamic proxies, annotation values
//! and functional reference introspection
//!
//! # Overview
//!
//! - [`types`]: explicit class and method metadata ([`ClassBuilder`],
//!   [`ClassRef`], [`MethodRef`]) standing in for runtime reflection
//! - [`proxy`]: objects implementing interface contracts whose calls are
//!   resolved by an ordered [`HandlerChain`]
//! - [`annotation`]: immutable annotation instances with value equality and
//!   the standard annotation hash
//! - [`reference`]: decoding closures that carry a [`SerializedReference`]
//!   into [`CallableDescriptor`]s
//!
//! # Example
//!
//! ```ignore
//! use introspectable::{AnnotationBuilder, ClassBuilder, TypeInfo, Value};
//!
//! let named = ClassBuilder::annotation("demo.Named")
//!     .member("value", TypeInfo::String)
//!     .build();
//!
//! let instance = AnnotationBuilder::of(&named)?.with("value", "alice")?.build()?;
//! assert_eq!(instance.call("value", &[])?, Value::from("alice"));
//! assert_eq!(instance.to_display_string()?, "@demo.Named(value=alice)");
//! ```
//!
//! # Logging
//!
//! Events are emitted through `tracing`; install a subscriber to see them.

#![warn(missing_docs)]

pub mod annotation;
pub mod config;
pub mod contract;
pub mod error;
pub mod extractor;
pub mod proxy;
pub mod reference;
pub mod registry;
pub mod types;
pub mod value;

pub use annotation::{
    annotation_hash_code, member, member_name_hash, AnnotationBuilder, MemberExtractor,
    MemberSelector,
};
pub use config::{AnnotationConfig, ConfigError, IntrospectionConfig, ProxyConfig};
pub use contract::{InterfaceContract, MemberInfo};
pub use error::{AnnotationError, ProxyError, ProxyResult, ReferenceError};
pub use extractor::ReferenceExtractor;
pub use proxy::{
    handler_chain_of, handler_fn, is_proxy, DirectInvoker, ForwardingHandler, HandlerChain,
    HandlerRef, HandlerResult, Invocation, InvocationHandler, InvocationHandlerBuilder, Invoker,
    LazyInitialization, NoopHandler, ProxyBuilder, StandardObjectHandler, SynthesizedInstance,
    TracingHandler, UnhandledInvocationHandler,
};
pub use reference::{
    introspect, introspect_in, CallableDescriptor, CallableKind, FunctionalReference,
    ImplementationKind, MethodSignature, Reference, SerializedReference, SignatureError,
};
pub use registry::ClassRegistry;
pub use types::{
    AnnotationMethods, ClassBuilder, ClassKind, ClassRef, MethodDefinition, MethodKind,
    MethodRef, ObjectMethods, ParameterInfo, Primitive, TypeInfo,
};
pub use value::{string_hash, ArrayValue, Object, ObjectRef, Value};
