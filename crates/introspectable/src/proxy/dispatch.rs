//! Method-keyed dispatch handlers

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::error::{ProxyError, ReferenceError};
use crate::reference::FunctionalReference;
use crate::registry::ClassRegistry;
use crate::types::{ClassRef, MethodRef};
use crate::value::ObjectRef;

use super::builder::ProxyBuilder;
use super::handler::{HandlerRef, HandlerResult, InvocationHandler, NoopHandler};
use super::Invocation;

/// Builds a handler that routes invocations to per-method handlers.
///
/// Bindings are keyed by method identity. Each `bind_*` call returns a new
/// builder, so partially configured builders can be shared.
#[derive(Clone)]
pub struct InvocationHandlerBuilder {
    bindings: Arc<FxHashMap<MethodRef, HandlerRef>>,
    fallback: HandlerRef,
}

impl InvocationHandlerBuilder {
    /// Builder without bindings; unbound methods are declined
    pub fn create() -> Self {
        Self {
            bindings: Arc::new(FxHashMap::default()),
            fallback: Arc::new(NoopHandler),
        }
    }

    /// Route `method` to `handler`, replacing an earlier binding
    pub fn bind_method(
        &self,
        method: &MethodRef,
        handler: impl InvocationHandler + 'static,
    ) -> Self {
        let mut bindings = (*self.bindings).clone();
        bindings.insert(method.clone(), Arc::new(handler));
        Self {
            bindings: Arc::new(bindings),
            fallback: self.fallback.clone(),
        }
    }

    /// Route the method a reference points at, resolving classes through the
    /// global registry
    pub fn bind_reference<R>(
        &self,
        reference: &R,
        handler: impl InvocationHandler + 'static,
    ) -> Result<Self, ReferenceError>
    where
        R: FunctionalReference + ?Sized,
    {
        self.bind_reference_in(ClassRegistry::global(), reference, handler)
    }

    /// Route the method a reference points at
    pub fn bind_reference_in<R>(
        &self,
        registry: &ClassRegistry,
        reference: &R,
        handler: impl InvocationHandler + 'static,
    ) -> Result<Self, ReferenceError>
    where
        R: FunctionalReference + ?Sized,
    {
        let descriptor = reference.introspect_in(registry)?;
        let method = descriptor.referenced_method()?;
        Ok(self.bind_method(method, handler))
    }

    /// Handler consulted for unbound methods
    pub fn with_fallback(&self, fallback: impl InvocationHandler + 'static) -> Self {
        Self {
            bindings: self.bindings.clone(),
            fallback: Arc::new(fallback),
        }
    }

    /// Number of bound methods
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Check if nothing is bound
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Freeze the bindings into a handler
    pub fn build(&self) -> DispatchingHandler {
        DispatchingHandler {
            bindings: self.bindings.clone(),
            fallback: self.fallback.clone(),
        }
    }

    /// Proxy for `contract` answered by the built handler
    pub fn instantiate(&self, contract: &ClassRef) -> Result<ObjectRef, ProxyError> {
        ProxyBuilder::for_contract(contract)
            .with_handler(self.build())
            .build()
    }
}

impl Default for InvocationHandlerBuilder {
    fn default() -> Self {
        Self::create()
    }
}

/// Handler routing by method identity
pub struct DispatchingHandler {
    bindings: Arc<FxHashMap<MethodRef, HandlerRef>>,
    fallback: HandlerRef,
}

impl InvocationHandler for DispatchingHandler {
    fn handle(&self, invocation: &Invocation) -> Result<HandlerResult, ProxyError> {
        match self.bindings.get(invocation.method()) {
            Some(handler) => handler.handle(invocation),
            None => self.fallback.handle(invocation),
        }
    }
}
