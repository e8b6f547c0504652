//! Error types for proxies, annotation values and functional references

use crate::proxy::Invocation;

/// Result type for proxy operations
pub type ProxyResult<T> = Result<T, ProxyError>;

/// Failures raised while synthesizing or calling proxy instances
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProxyError {
    /// A proxy was requested without any contract to implement
    #[error("Cannot synthesize a proxy for an empty contract set")]
    EmptyContractSet,

    /// A contract handed to the proxy engine is a concrete class
    #[error("Type {0} is not an interface")]
    NotAnInterface(String),

    /// No handler in the chain resolved the invocation
    #[error("Unhandled invocation: {0}")]
    UnhandledInvocation(Box<Invocation>),

    /// Receiver or arguments do not fit the invoked method
    #[error("Illegal invocation: {0}")]
    IllegalInvocation(String),

    /// Method lookup by name failed
    #[error("No method {name} with {arity} parameter(s) on {class}")]
    NoSuchMethod {
        /// Class that was searched
        class: String,
        /// Requested method name
        name: String,
        /// Requested parameter count
        arity: usize,
    },

    /// A recording proxy saw no call at all
    #[error("Extractor for {0} did not invoke any method")]
    NoMethodRecorded(String),

    /// A handler or method body failed
    #[error("{0}")]
    Failed(String),
}

impl From<String> for ProxyError {
    fn from(s: String) -> Self {
        ProxyError::Failed(s)
    }
}

impl From<&str> for ProxyError {
    fn from(s: &str) -> Self {
        ProxyError::Failed(s.to_string())
    }
}

/// Failures raised by [`AnnotationBuilder`](crate::AnnotationBuilder)
#[derive(Debug, Clone, thiserror::Error)]
pub enum AnnotationError {
    /// The contract does not declare the selected member
    #[error("Annotation {contract} has no member '{member}'")]
    UnknownMember {
        /// Annotation type name
        contract: String,
        /// Selected member name
        member: String,
    },

    /// The assigned value does not fit the member's declared type
    #[error("Member '{member}' expects {expected}, got {found}")]
    TypeMismatch {
        /// Member name
        member: String,
        /// Declared member type
        expected: String,
        /// Runtime type of the rejected value
        found: String,
    },

    /// Some members without defaults were never assigned
    #[error("No value set for member(s) {}", format_members(.members))]
    MissingMember {
        /// Every unassigned member, in declaration order
        members: Vec<String>,
    },

    /// `marker` was used on a contract that needs assignments
    #[error("Annotation {contract} is not a marker, member(s) {} have no default", format_members(.members))]
    NonMarkerContract {
        /// Annotation type name
        contract: String,
        /// Members lacking a default
        members: Vec<String>,
    },

    /// The builder was started on something that is not an annotation type
    #[error("Type {0} is not an annotation")]
    NotAnAnnotation(String),

    /// Member discovery or instance synthesis failed
    #[error(transparent)]
    Proxy(#[from] ProxyError),
}

fn format_members(members: &[String]) -> String {
    members
        .iter()
        .map(|m| format!("'{}'", m))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Failures raised by functional reference introspection
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReferenceError {
    /// The callable carries no decodable member reference
    #[error("Unresolvable reference: {0}")]
    UnresolvableReference(String),

    /// `referenced_method` on a constructor reference or lambda
    #[error("Interface implementation is not a method reference")]
    NotAMethodReference,

    /// `referenced_constructor` on anything but a constructor reference
    #[error("Interface implementation is not a constructor reference")]
    NotAConstructorReference,

    /// Parameter index past the end of the parameter list
    #[error("Executable has no parameter with index {index} (count {count})")]
    ParameterOutOfRange {
        /// Requested index
        index: usize,
        /// Number of parameters
        count: usize,
    },
}
