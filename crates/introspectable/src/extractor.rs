//! Method discovery by recording proxy
//!
//! Runs a closure against a proxy that records the first method invoked on it
//! and answers every call with the zero value of the method's result type.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::ProxyError;
use crate::proxy::{HandlerResult, Invocation, InvocationHandler, ProxyBuilder};
use crate::types::{ClassRef, MethodRef};
use crate::value::{ObjectRef, Value};

/// Discovers which method of a contract a closure calls
pub struct ReferenceExtractor {
    class: ClassRef,
}

impl ReferenceExtractor {
    /// Extractor for methods of `class`
    pub fn of(class: &ClassRef) -> Self {
        Self {
            class: class.clone(),
        }
    }

    /// Run `extractor` against a recording proxy and return the first method
    /// it invoked
    pub fn extract<F>(&self, extractor: F) -> Result<MethodRef, ProxyError>
    where
        F: FnOnce(&ObjectRef) -> Result<Value, ProxyError>,
    {
        let recorded = Arc::new(Mutex::new(None));
        let recorder = ProxyBuilder::for_contract(&self.class)
            .with_handler(RecordingHandler {
                recorded: recorded.clone(),
            })
            .build()?;

        let outcome = extractor(&recorder);
        let method = recorded.lock().take();
        match (method, outcome) {
            (Some(method), _) => {
                tracing::trace!(method = %method, "recorded method");
                Ok(method)
            }
            (None, Err(err)) => Err(err),
            (None, Ok(_)) => Err(ProxyError::NoMethodRecorded(self.class.name().to_string())),
        }
    }
}

struct RecordingHandler {
    recorded: Arc<Mutex<Option<MethodRef>>>,
}

impl InvocationHandler for RecordingHandler {
    fn handle(&self, invocation: &Invocation) -> Result<HandlerResult, ProxyError> {
        let method = invocation.method();
        let mut recorded = self.recorded.lock();
        if recorded.is_none() {
            *recorded = Some(method.clone());
        }
        Ok(HandlerResult::Resolved(method.return_type().zero_value()))
    }
}
