//! Proxy class synthesis and instance creation

use std::any::Any;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;

use crate::config::IntrospectionConfig;
use crate::error::ProxyError;
use crate::types::{ClassBuilder, ClassRef, MethodKind, MethodRef, ObjectMethods};
use crate::value::{Object, ObjectRef, Value};

use super::chain::HandlerChain;
use super::handler::{HandlerRef, InvocationHandler};
use super::Invocation;

/// Synthesized classes keyed by the identities of their ordered contracts.
///
/// Entries are never evicted. A cached class holds its contracts as
/// supertypes, so every contract set ever proxied stays alive for the life of
/// the process. Set `proxy.cache_classes = false` to synthesize a fresh class
/// per proxy instead.
static PROXY_CLASSES: Lazy<DashMap<Vec<usize>, Arc<ProxyClass>>> = Lazy::new(DashMap::new);

static NEXT_PROXY_ID: AtomicUsize = AtomicUsize::new(0);

/// Class synthesized for one contract set.
///
/// The class extends every contract. Its dispatch table maps each callable
/// `(name, arity)` to the declaration invocations report: root object
/// methods first, then contract methods in contract order, first
/// declaration wins.
#[derive(Debug)]
pub struct ProxyClass {
    class: ClassRef,
    dispatch: FxHashMap<(String, usize), MethodRef>,
}

impl ProxyClass {
    fn synthesize(contracts: &[ClassRef]) -> Self {
        let config = IntrospectionConfig::current();
        let id = NEXT_PROXY_ID.fetch_add(1, Ordering::Relaxed);
        let name = format!("{}{}", config.proxy.class_name_prefix, id);

        let mut builder = ClassBuilder::class(name).synthetic();
        for contract in contracts {
            builder = builder.extends(contract);
        }
        let class = builder.build();

        let mut dispatch = FxHashMap::default();
        let methods = ObjectMethods::class()
            .declared_methods()
            .chain(contracts.iter().flat_map(|c| c.all_methods()));
        for method in methods {
            if method.kind() != MethodKind::Instance {
                continue;
            }
            dispatch
                .entry((method.name().to_string(), method.parameter_count()))
                .or_insert(method);
        }

        tracing::debug!(
            class = class.name(),
            contracts = ?contracts.iter().map(ClassRef::name).collect::<Vec<_>>(),
            methods = dispatch.len(),
            "synthesized proxy class"
        );

        Self { class, dispatch }
    }

    /// The synthesized class
    pub fn class(&self) -> &ClassRef {
        &self.class
    }

    /// Implemented contracts, in order
    pub fn contracts(&self) -> &[ClassRef] {
        self.class.supertypes()
    }

    /// Dispatch table lookup
    pub fn method(&self, name: &str, arity: usize) -> Option<&MethodRef> {
        self.dispatch.get(&(name.to_string(), arity))
    }

    /// Number of dispatchable methods
    pub fn method_count(&self) -> usize {
        self.dispatch.len()
    }
}

fn proxy_class_for(contracts: &[ClassRef]) -> Arc<ProxyClass> {
    if !IntrospectionConfig::current().proxy.cache_classes {
        return Arc::new(ProxyClass::synthesize(contracts));
    }
    let key: Vec<usize> = contracts.iter().map(ClassRef::id).collect();
    if let Some(existing) = PROXY_CLASSES.get(&key) {
        tracing::trace!(class = existing.class.name(), "proxy class cache hit");
        return existing.value().clone();
    }
    PROXY_CLASSES
        .entry(key)
        .or_insert_with(|| Arc::new(ProxyClass::synthesize(contracts)))
        .value()
        .clone()
}

/// Instance of a synthesized proxy class.
///
/// Every call resolves through the instance's handler chain.
pub struct SynthesizedInstance {
    proxy_class: Arc<ProxyClass>,
    chain: HandlerChain,
}

impl SynthesizedInstance {
    /// Synthesized class shared by every instance with the same contracts
    pub fn proxy_class(&self) -> &Arc<ProxyClass> {
        &self.proxy_class
    }

    /// Implemented contracts
    pub fn contracts(&self) -> &[ClassRef] {
        self.proxy_class.contracts()
    }

    /// Handler chain answering calls
    pub fn chain(&self) -> &HandlerChain {
        &self.chain
    }
}

impl Object for SynthesizedInstance {
    fn class(&self) -> ClassRef {
        self.proxy_class.class.clone()
    }

    fn invoke(&self, invocation: &Invocation) -> Result<Value, ProxyError> {
        self.chain.resolve(invocation)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn resolve_method(&self, name: &str, arity: usize) -> Option<MethodRef> {
        self.proxy_class.method(name, arity).cloned()
    }
}

/// Check if an object is a synthesized proxy instance
pub fn is_proxy(object: &ObjectRef) -> bool {
    object.downcast_ref::<SynthesizedInstance>().is_some()
}

/// Handler chain of a proxy instance, `None` for other objects
pub fn handler_chain_of(object: &ObjectRef) -> Option<HandlerChain> {
    object
        .downcast_ref::<SynthesizedInstance>()
        .map(|instance| instance.chain.clone())
}

/// Builder for proxy instances
///
/// ```ignore
/// let greeter = ProxyBuilder::for_contract(&greeter_contract)
///     .with_handler(handler_fn(|invocation| {
///         Ok(HandlerResult::resolved(format!("hello {}", invocation.arguments()[0])))
///     }))
///     .build()?;
/// ```
#[derive(Clone, Default)]
pub struct ProxyBuilder {
    contracts: Vec<ClassRef>,
    chain: HandlerChain,
}

impl ProxyBuilder {
    /// Start with an ordered contract set
    pub fn for_contracts<'a>(contracts: impl IntoIterator<Item = &'a ClassRef>) -> Self {
        Self {
            contracts: contracts.into_iter().cloned().collect(),
            chain: HandlerChain::new(),
        }
    }

    /// Start with a single contract
    pub fn for_contract(contract: &ClassRef) -> Self {
        Self::for_contracts([contract])
    }

    /// Add another contract
    pub fn with_contract(&self, contract: &ClassRef) -> Self {
        let mut next = self.clone();
        next.contracts.push(contract.clone());
        next
    }

    /// Append a handler to the chain
    pub fn with_handler(&self, handler: impl InvocationHandler + 'static) -> Self {
        Self {
            contracts: self.contracts.clone(),
            chain: self.chain.with_handler(handler),
        }
    }

    /// Append a shared handler to the chain
    pub fn with_shared_handler(&self, handler: HandlerRef) -> Self {
        Self {
            contracts: self.contracts.clone(),
            chain: self.chain.with_shared_handler(handler),
        }
    }

    /// Append every handler of `chain`; its fallback replaces the current one
    pub fn with_chain(&self, chain: &HandlerChain) -> Self {
        Self {
            contracts: self.contracts.clone(),
            chain: self.chain.then(chain),
        }
    }

    /// Replace the fallback
    pub fn with_fallback(&self, fallback: impl InvocationHandler + 'static) -> Self {
        Self {
            contracts: self.contracts.clone(),
            chain: self.chain.with_fallback(fallback),
        }
    }

    /// Contracts collected so far
    pub fn contracts(&self) -> &[ClassRef] {
        &self.contracts
    }

    /// Create the instance
    pub fn build(&self) -> Result<ObjectRef, ProxyError> {
        if self.contracts.is_empty() {
            return Err(ProxyError::EmptyContractSet);
        }
        let mut contracts: Vec<ClassRef> = Vec::with_capacity(self.contracts.len());
        for contract in &self.contracts {
            if !contract.is_interface() {
                return Err(ProxyError::NotAnInterface(contract.name().to_string()));
            }
            if !contracts.contains(contract) {
                contracts.push(contract.clone());
            }
        }

        Ok(ObjectRef::new(SynthesizedInstance {
            proxy_class: proxy_class_for(&contracts),
            chain: self.chain.clone(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::handler::{handler_fn, HandlerResult, StandardObjectHandler};
    use crate::types::{MethodDefinition, TypeInfo};

    fn greeter() -> ClassRef {
        ClassBuilder::interface("test.Greeter")
            .method(
                MethodDefinition::new("greet")
                    .parameter("name", TypeInfo::String)
                    .returns(TypeInfo::String),
            )
            .build()
    }

    fn echo() -> impl InvocationHandler {
        handler_fn(|invocation| {
            if invocation.method().name() == "greet" {
                Ok(HandlerResult::resolved(format!(
                    "hello {}",
                    invocation.arguments()[0]
                )))
            } else {
                Ok(HandlerResult::Declined)
            }
        })
    }

    #[test]
    fn test_proxy_answers_contract_method() {
        let contract = greeter();
        let proxy = ProxyBuilder::for_contract(&contract)
            .with_handler(echo())
            .build()
            .unwrap();
        assert!(proxy.is_instance_of(&contract));
        assert!(is_proxy(&proxy));
        assert_eq!(
            proxy.call("greet", &[Value::from("world")]).unwrap(),
            Value::from("hello world")
        );
    }

    #[test]
    fn test_empty_contract_set_rejected() {
        let err = ProxyBuilder::for_contracts(std::iter::empty::<&ClassRef>())
            .build()
            .unwrap_err();
        assert!(matches!(err, ProxyError::EmptyContractSet));
    }

    #[test]
    fn test_concrete_class_rejected() {
        let class = ClassBuilder::class("test.Concrete").build();
        let err = ProxyBuilder::for_contract(&class).build().unwrap_err();
        assert!(matches!(err, ProxyError::NotAnInterface(name) if name == "test.Concrete"));
    }

    #[test]
    fn test_class_shared_per_contract_set() {
        let contract = greeter();
        let a = ProxyBuilder::for_contract(&contract).build().unwrap();
        let b = ProxyBuilder::for_contract(&contract)
            .with_contract(&contract)
            .with_handler(echo())
            .build()
            .unwrap();
        assert_eq!(a.class(), b.class());
        assert!(a.class().is_synthetic());

        let other = greeter();
        let c = ProxyBuilder::for_contract(&other).build().unwrap();
        assert_ne!(a.class(), c.class());
    }

    #[test]
    fn test_unhandled_method_fails() {
        let proxy = ProxyBuilder::for_contract(&greeter()).build().unwrap();
        let err = proxy.call("greet", &[Value::from("x")]).unwrap_err();
        assert!(matches!(err, ProxyError::UnhandledInvocation(_)));
    }

    #[test]
    fn test_unknown_method_lookup() {
        let proxy = ProxyBuilder::for_contract(&greeter()).build().unwrap();
        let err = proxy.call("wave", &[]).unwrap_err();
        assert!(matches!(err, ProxyError::NoSuchMethod { ref name, arity: 0, .. } if name == "wave"));
    }

    #[test]
    fn test_handler_chain_of() {
        let proxy = ProxyBuilder::for_contract(&greeter())
            .with_handler(StandardObjectHandler)
            .with_handler(echo())
            .build()
            .unwrap();
        assert_eq!(handler_chain_of(&proxy).map(|c| c.len()), Some(2));
        assert!(proxy.equals(&Value::Object(proxy.clone())).unwrap());
    }
}
