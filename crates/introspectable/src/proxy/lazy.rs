//! Lazily initialized proxies

use once_cell::sync::{Lazy, OnceCell};

use crate::error::ProxyError;
use crate::types::{root_method, ClassBuilder, ClassRef, MethodDefinition, MethodRef, TypeInfo};
use crate::value::{ObjectRef, Value};

use super::builder::ProxyBuilder;
use super::handler::{HandlerResult, InvocationHandler};
use super::Invocation;

static LAZY_PROXY: Lazy<ClassRef> = Lazy::new(|| {
    ClassBuilder::interface("lazy_proxy")
        .method(MethodDefinition::new("extract_instance").returns(TypeInfo::Any))
        .build()
});

static EXTRACT_INSTANCE: Lazy<MethodRef> =
    Lazy::new(|| root_method(&LAZY_PROXY, "extract_instance"));

/// Proxies that create their target on first use
pub struct LazyInitialization;

impl LazyInitialization {
    /// Extra contract every lazy proxy implements
    pub fn contract() -> &'static ClassRef {
        &LAZY_PROXY
    }

    /// `extract_instance() -> any`
    pub fn extract_instance_method() -> &'static MethodRef {
        &EXTRACT_INSTANCE
    }

    /// Proxy for `contract` whose calls go to the object `initializer`
    /// produces. The initializer runs at most once, on the first call; a
    /// failed initialization is retried on the next call.
    pub fn create_proxy<F>(contract: &ClassRef, initializer: F) -> Result<ObjectRef, ProxyError>
    where
        F: Fn() -> Result<ObjectRef, ProxyError> + Send + Sync + 'static,
    {
        ProxyBuilder::for_contracts([contract, Self::contract()])
            .with_handler(LazyInitializationHandler {
                initializer: Box::new(initializer),
                instance: OnceCell::new(),
            })
            .build()
    }

    /// The initialized target of a lazy proxy; `None` before the first call
    pub fn extract_instance(proxy: &ObjectRef) -> Result<Option<ObjectRef>, ProxyError> {
        if !proxy.is_instance_of(Self::contract()) {
            return Err(ProxyError::IllegalInvocation(format!(
                "{} is not a lazy proxy",
                proxy.class().name()
            )));
        }
        match proxy.invoke_method(Self::extract_instance_method(), Vec::new())? {
            Value::Object(instance) => Ok(Some(instance)),
            _ => Ok(None),
        }
    }
}

type Initializer = Box<dyn Fn() -> Result<ObjectRef, ProxyError> + Send + Sync>;

struct LazyInitializationHandler {
    initializer: Initializer,
    instance: OnceCell<ObjectRef>,
}

impl InvocationHandler for LazyInitializationHandler {
    fn handle(&self, invocation: &Invocation) -> Result<HandlerResult, ProxyError> {
        if invocation.method() == LazyInitialization::extract_instance_method() {
            return Ok(HandlerResult::resolved(self.instance.get().cloned()));
        }
        let target = self.instance.get_or_try_init(|| {
            tracing::debug!(method = %invocation.method(), "initializing lazy proxy target");
            (self.initializer)()
        })?;
        let forwarded = invocation.with_receiver(target.clone())?;
        Ok(HandlerResult::Resolved(forwarded.invoke()?))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::proxy::handler::handler_fn;
    use crate::types::ObjectMethods;

    fn sized() -> ClassRef {
        ClassBuilder::interface("test.Sized")
            .method(MethodDefinition::new("size").returns(TypeInfo::INT))
            .build()
    }

    fn target(contract: &ClassRef) -> ObjectRef {
        ProxyBuilder::for_contract(contract)
            .with_handler(handler_fn(|inv| {
                if inv.method().name() == "size" {
                    Ok(HandlerResult::resolved(3))
                } else {
                    Ok(HandlerResult::Declined)
                }
            }))
            .build()
            .unwrap()
    }

    #[test]
    fn test_initializes_once_on_first_call() {
        let contract = sized();
        let created = Arc::new(AtomicUsize::new(0));
        let counter = created.clone();
        let inner = contract.clone();
        let proxy = LazyInitialization::create_proxy(&contract, move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(target(&inner))
        })
        .unwrap();

        assert_eq!(created.load(Ordering::SeqCst), 0);
        assert!(LazyInitialization::extract_instance(&proxy).unwrap().is_none());

        assert_eq!(proxy.call("size", &[]).unwrap(), Value::Int(3));
        assert_eq!(proxy.call("size", &[]).unwrap(), Value::Int(3));
        assert_eq!(created.load(Ordering::SeqCst), 1);
        assert!(LazyInitialization::extract_instance(&proxy).unwrap().is_some());
        assert!(proxy.is_instance_of(&contract));
    }

    #[test]
    fn test_failed_initialization_propagates() {
        let contract = sized();
        let proxy =
            LazyInitialization::create_proxy(&contract, || Err("not available".into())).unwrap();
        let err = proxy.call("size", &[]).unwrap_err();
        assert_eq!(err.to_string(), "not available");
        assert!(LazyInitialization::extract_instance(&proxy).unwrap().is_none());
    }

    #[test]
    fn test_extract_instance_rejects_plain_proxy() {
        let plain = target(&sized());
        assert!(LazyInitialization::extract_instance(&plain).is_err());
        assert!(!ObjectMethods::is_object_method(
            LazyInitialization::extract_instance_method()
        ));
    }
}
