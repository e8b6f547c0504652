//! Ordered handler chains

use std::fmt;
use std::sync::Arc;

use crate::error::ProxyError;
use crate::value::Value;

use super::handler::{HandlerRef, HandlerResult, InvocationHandler, UnhandledInvocationHandler};
use super::Invocation;

/// Ordered handlers plus a terminal fallback.
///
/// Resolution asks each handler in order and returns the first resolved
/// value. When every handler declines, the fallback runs; the default
/// fallback fails with [`ProxyError::UnhandledInvocation`].
///
/// Chains are values: every combinator returns a new chain and leaves the
/// original untouched.
#[derive(Clone)]
pub struct HandlerChain {
    handlers: Vec<HandlerRef>,
    fallback: HandlerRef,
}

impl HandlerChain {
    /// Empty chain with the unhandled-invocation fallback
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
            fallback: Arc::new(UnhandledInvocationHandler),
        }
    }

    /// Chain holding a single handler
    pub fn of(handler: impl InvocationHandler + 'static) -> Self {
        Self::new().with_handler(handler)
    }

    /// Append a handler
    pub fn with_handler(&self, handler: impl InvocationHandler + 'static) -> Self {
        self.with_shared_handler(Arc::new(handler))
    }

    /// Append an already shared handler
    pub fn with_shared_handler(&self, handler: HandlerRef) -> Self {
        let mut handlers = self.handlers.clone();
        handlers.push(handler);
        Self {
            handlers,
            fallback: self.fallback.clone(),
        }
    }

    /// Replace the terminal fallback
    pub fn with_fallback(&self, fallback: impl InvocationHandler + 'static) -> Self {
        Self {
            handlers: self.handlers.clone(),
            fallback: Arc::new(fallback),
        }
    }

    /// Handlers of `self` followed by handlers of `next`; the fallback of
    /// `next` becomes the fallback of the result
    pub fn then(&self, next: &HandlerChain) -> Self {
        let mut handlers = self.handlers.clone();
        handlers.extend(next.handlers.iter().cloned());
        Self {
            handlers,
            fallback: next.fallback.clone(),
        }
    }

    /// Number of handlers, excluding the fallback
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Check if no handler was added
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Resolve an invocation: handlers in order, then the fallback
    pub fn resolve(&self, invocation: &Invocation) -> Result<Value, ProxyError> {
        for (position, handler) in self.handlers.iter().enumerate() {
            if let HandlerResult::Resolved(value) = handler.handle(invocation)? {
                tracing::trace!(
                    method = %invocation.method(),
                    position,
                    "invocation resolved"
                );
                return Ok(value);
            }
        }
        match self.fallback.handle(invocation)? {
            HandlerResult::Resolved(value) => {
                tracing::trace!(method = %invocation.method(), "invocation resolved by fallback");
                Ok(value)
            }
            HandlerResult::Declined => Err(ProxyError::UnhandledInvocation(Box::new(
                invocation.clone(),
            ))),
        }
    }
}

impl Default for HandlerChain {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for HandlerChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerChain")
            .field("handlers", &self.handlers.len())
            .finish_non_exhaustive()
    }
}

/// A nested chain only consults its handlers; its fallback belongs to the
/// outermost chain doing the resolution
impl InvocationHandler for HandlerChain {
    fn handle(&self, invocation: &Invocation) -> Result<HandlerResult, ProxyError> {
        for handler in &self.handlers {
            let result = handler.handle(invocation)?;
            if result.is_resolved() {
                return Ok(result);
            }
        }
        Ok(HandlerResult::Declined)
    }
}
