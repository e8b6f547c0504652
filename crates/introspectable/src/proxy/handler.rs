//! Invocation handlers
//!
//! A handler inspects an [`Invocation`] and either resolves it with a value or
//! declines it so the next handler in the chain gets a chance.

use std::sync::Arc;

use crate::error::ProxyError;
use crate::types::ObjectMethods;
use crate::value::Value;

use super::Invocation;

// ============================================================================
// HandlerResult
// ============================================================================

/// Outcome of a single handler
#[derive(Debug, Clone)]
pub enum HandlerResult {
    /// The handler produced the call's result
    Resolved(Value),
    /// The handler does not apply to this invocation
    Declined,
}

impl HandlerResult {
    /// Resolve with a value
    #[inline]
    pub fn resolved(value: impl Into<Value>) -> Self {
        Self::Resolved(value.into())
    }

    /// Resolve with null
    #[inline]
    pub fn null() -> Self {
        Self::Resolved(Value::Null)
    }

    /// Check if the invocation was resolved
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }

    /// Resolved value, if any
    pub fn into_value(self) -> Option<Value> {
        match self {
            Self::Resolved(value) => Some(value),
            Self::Declined => None,
        }
    }
}

// ============================================================================
// InvocationHandler
// ============================================================================

/// Partial handler for calls made on a proxy instance
///
/// Handlers must be shareable across threads; a proxy instance may be called
/// from anywhere.
pub trait InvocationHandler: Send + Sync {
    /// Handle an invocation
    ///
    /// Returns `HandlerResult::Declined` if the handler does not apply.
    fn handle(&self, invocation: &Invocation) -> Result<HandlerResult, ProxyError>;
}

/// Shared handler reference
pub type HandlerRef = Arc<dyn InvocationHandler>;

impl<H: InvocationHandler + ?Sized> InvocationHandler for Arc<H> {
    fn handle(&self, invocation: &Invocation) -> Result<HandlerResult, ProxyError> {
        (**self).handle(invocation)
    }
}

/// Handler backed by a closure, see [`handler_fn`]
pub struct FnHandler<F>(F);

impl<F> InvocationHandler for FnHandler<F>
where
    F: Fn(&Invocation) -> Result<HandlerResult, ProxyError> + Send + Sync,
{
    fn handle(&self, invocation: &Invocation) -> Result<HandlerResult, ProxyError> {
        (self.0)(invocation)
    }
}

/// Create a handler from a closure
pub fn handler_fn<F>(f: F) -> FnHandler<F>
where
    F: Fn(&Invocation) -> Result<HandlerResult, ProxyError> + Send + Sync,
{
    FnHandler(f)
}

// ============================================================================
// Stock handlers
// ============================================================================

/// A no-op handler that declines every invocation
pub struct NoopHandler;

impl InvocationHandler for NoopHandler {
    fn handle(&self, _invocation: &Invocation) -> Result<HandlerResult, ProxyError> {
        Ok(HandlerResult::Declined)
    }
}

/// Fails every invocation with [`ProxyError::UnhandledInvocation`]
pub struct UnhandledInvocationHandler;

impl InvocationHandler for UnhandledInvocationHandler {
    fn handle(&self, invocation: &Invocation) -> Result<HandlerResult, ProxyError> {
        Err(ProxyError::UnhandledInvocation(Box::new(invocation.clone())))
    }
}

/// Identity semantics for `equals`, `hash_code` and `to_string`
///
/// Two proxies are equal only when they are the same instance; the hash is
/// derived from the instance address and the text is `{class}@{address}`.
pub struct StandardObjectHandler;

impl InvocationHandler for StandardObjectHandler {
    fn handle(&self, invocation: &Invocation) -> Result<HandlerResult, ProxyError> {
        let Some(receiver) = invocation.receiver() else {
            return Ok(HandlerResult::Declined);
        };
        let method = invocation.method();
        if method == ObjectMethods::equals() {
            let same = matches!(invocation.argument(0), Some(Value::Object(other)) if receiver.same_object(other));
            Ok(HandlerResult::resolved(same))
        } else if method == ObjectMethods::hash_code() {
            Ok(HandlerResult::resolved(receiver.identity_hash()))
        } else if method == ObjectMethods::to_string() {
            Ok(HandlerResult::resolved(format!(
                "{}@{:x}",
                receiver.class().name(),
                receiver.address()
            )))
        } else {
            Ok(HandlerResult::Declined)
        }
    }
}

/// Logs every invocation and declines it
pub struct TracingHandler {
    label: String,
}

impl TracingHandler {
    /// Create a tracing handler with a label included in every event
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

impl InvocationHandler for TracingHandler {
    fn handle(&self, invocation: &Invocation) -> Result<HandlerResult, ProxyError> {
        tracing::debug!(
            handler = %self.label,
            method = %invocation.method(),
            arguments = invocation.arguments().len(),
            "invocation intercepted"
        );
        Ok(HandlerResult::Declined)
    }
}
