//! Integration tests for proxy synthesis and handler chains

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use common::{init_tracing, Library, TextObject};
use introspectable::{
    handler_chain_of, handler_fn, is_proxy, ClassBuilder, ClassRef, ForwardingHandler,
    HandlerChain, HandlerResult, InvocationHandlerBuilder, LazyInitialization, MethodDefinition,
    ObjectMethods, ProxyBuilder, ProxyError, Reference, StandardObjectHandler, TracingHandler,
    TypeInfo, Value,
};

fn named() -> ClassRef {
    ClassBuilder::interface("fixtures.Named")
        .method(MethodDefinition::new("name").returns(TypeInfo::String))
        .build()
}

fn counter() -> ClassRef {
    ClassBuilder::interface("fixtures.Counter")
        .method(MethodDefinition::new("count").returns(TypeInfo::INT))
        .method(
            MethodDefinition::new("add")
                .parameter("amount", TypeInfo::INT)
                .returns(TypeInfo::INT),
        )
        .build()
}

fn answering(name: &'static str, value: &'static str) -> impl introspectable::InvocationHandler {
    handler_fn(move |invocation| {
        if invocation.method().name() == name {
            Ok(HandlerResult::resolved(value))
        } else {
            Ok(HandlerResult::Declined)
        }
    })
}

// ============================================================================
// Synthesis
// ============================================================================

mod synthesis {
    use super::*;

    #[test]
    fn test_multiple_contracts() {
        init_tracing();
        let named = named();
        let counter = counter();
        let proxy = ProxyBuilder::for_contracts([&named, &counter])
            .with_handler(answering("name", "multi"))
            .with_handler(handler_fn(|invocation| match invocation.method().name() {
                "count" => Ok(HandlerResult::resolved(7)),
                "add" => {
                    let amount = invocation.argument(0).and_then(Value::as_i32).unwrap_or(0);
                    Ok(HandlerResult::resolved(7 + amount))
                }
                _ => Ok(HandlerResult::Declined),
            }))
            .build()
            .unwrap();

        assert!(proxy.is_instance_of(&named));
        assert!(proxy.is_instance_of(&counter));
        assert!(proxy.is_instance_of(ObjectMethods::class()));
        assert_eq!(proxy.class().supertypes(), &[named.clone(), counter.clone()]);
        assert_eq!(proxy.call("name", &[]).unwrap(), Value::from("multi"));
        assert_eq!(proxy.call("add", &[Value::Int(3)]).unwrap(), Value::Int(10));
    }

    #[test]
    fn test_contract_set_shares_class() {
        let named = named();
        let counter = counter();
        let first = ProxyBuilder::for_contracts([&named, &counter]).build().unwrap();
        let second = ProxyBuilder::for_contract(&named)
            .with_contract(&counter)
            .with_contract(&named)
            .build()
            .unwrap();
        let reordered = ProxyBuilder::for_contracts([&counter, &named]).build().unwrap();

        assert_eq!(first.class(), second.class());
        assert_ne!(first.class(), reordered.class());
        assert!(first.class().name().starts_with("$Proxy"));
    }

    #[test]
    fn test_illegal_arguments_rejected_before_handlers() {
        let counter = counter();
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let proxy = ProxyBuilder::for_contract(&counter)
            .with_handler(handler_fn(move |_| {
                seen.fetch_add(1, Ordering::SeqCst);
                Ok(HandlerResult::resolved(0))
            }))
            .build()
            .unwrap();

        let err = proxy.call("add", &[Value::from("three")]).unwrap_err();
        assert!(matches!(err, ProxyError::IllegalInvocation(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let err = proxy.call("missing", &[]).unwrap_err();
        assert!(matches!(err, ProxyError::NoSuchMethod { ref name, arity: 0, .. } if name == "missing"));
    }

    #[test]
    fn test_chain_is_recoverable_from_instance() {
        let named = named();
        let proxy = ProxyBuilder::for_contract(&named)
            .with_handler(answering("name", "x"))
            .build()
            .unwrap();
        let chain = handler_chain_of(&proxy).unwrap();
        assert_eq!(chain.len(), 1);

        let library = Library::new();
        let plain = library.text_object("plain");
        assert!(!is_proxy(&plain));
        assert!(handler_chain_of(&plain).is_none());
    }
}

// ============================================================================
// Handler chains
// ============================================================================

mod chains {
    use super::*;

    #[test]
    fn test_first_resolving_handler_wins() {
        let named = named();
        let proxy = ProxyBuilder::for_contract(&named)
            .with_handler(TracingHandler::new("audit"))
            .with_handler(answering("name", "first"))
            .with_handler(answering("name", "second"))
            .build()
            .unwrap();
        assert_eq!(proxy.call("name", &[]).unwrap(), Value::from("first"));
    }

    #[test]
    fn test_unhandled_invocation_carries_call() {
        let counter = counter();
        let proxy = ProxyBuilder::for_contract(&counter)
            .with_handler(answering("name", "never"))
            .build()
            .unwrap();
        let err = proxy.call("add", &[Value::Int(2)]).unwrap_err();
        match err {
            ProxyError::UnhandledInvocation(invocation) => {
                assert_eq!(invocation.method().name(), "add");
                assert_eq!(invocation.arguments(), &[Value::Int(2)]);
                assert!(invocation.receiver().is_some_and(|r| r.same_object(&proxy)));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_fallback_replaces_failure() {
        let named = named();
        let proxy = ProxyBuilder::for_contract(&named)
            .with_fallback(handler_fn(|_| Ok(HandlerResult::resolved("fallback"))))
            .build()
            .unwrap();
        assert_eq!(proxy.call("name", &[]).unwrap(), Value::from("fallback"));
    }

    #[test]
    fn test_standard_object_handler_gives_identity() {
        let named = named();
        let build = || {
            ProxyBuilder::for_contract(&named)
                .with_handler(StandardObjectHandler)
                .build()
                .unwrap()
        };
        let a = build();
        let b = build();

        assert!(a.equals(&Value::Object(a.clone())).unwrap());
        assert!(!a.equals(&Value::Object(b.clone())).unwrap());
        assert_eq!(a.hash_code().unwrap(), a.identity_hash());
        assert!(a
            .to_display_string()
            .unwrap()
            .starts_with(&format!("{}@", a.class().name())));
    }

    #[test]
    fn test_composed_chains_keep_order() {
        let named = named();
        let left = HandlerChain::of(TracingHandler::new("left"));
        let right = HandlerChain::of(answering("name", "right"))
            .with_fallback(handler_fn(|_| Ok(HandlerResult::resolved("rescued"))));
        let proxy = ProxyBuilder::for_contract(&named)
            .with_chain(&left.then(&right))
            .build()
            .unwrap();
        assert_eq!(proxy.call("name", &[]).unwrap(), Value::from("right"));
        assert_eq!(proxy.call("to_string", &[]).unwrap(), Value::from("rescued"));
    }

    #[test]
    fn test_handler_errors_propagate() {
        let named = named();
        let proxy = ProxyBuilder::for_contract(&named)
            .with_handler(handler_fn(|_| Err(ProxyError::Failed("broken".into()))))
            .with_handler(answering("name", "unreached"))
            .build()
            .unwrap();
        let err = proxy.call("name", &[]).unwrap_err();
        assert!(matches!(err, ProxyError::Failed(ref m) if m == "broken"));
    }
}

// ============================================================================
// Stock proxies
// ============================================================================

mod forwarding {
    use super::*;

    #[test]
    fn test_forwards_to_target() {
        let library = Library::new();
        let handler = Arc::new(ForwardingHandler::of(library.text_object("four")));
        let proxy = ProxyBuilder::for_contract(&library.sized)
            .with_shared_handler(handler.clone())
            .build()
            .unwrap();

        assert_eq!(proxy.call("size", &[]).unwrap(), Value::Int(4));
        assert_eq!(proxy.to_display_string().unwrap(), "four");

        let previous = handler.swap(library.text_object("sixsix"));
        assert_eq!(previous.downcast_ref::<TextObject>().unwrap().content, "four");
        assert_eq!(proxy.call("size", &[]).unwrap(), Value::Int(6));
    }
}

mod lazy {
    use super::*;

    #[test]
    fn test_initializes_on_first_call_only() {
        init_tracing();
        let library = Library::new();
        let created = Arc::new(AtomicUsize::new(0));
        let counter = created.clone();
        let target = library.text_object("lazy");
        let proxy = LazyInitialization::create_proxy(&library.sized, move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(target.clone())
        })
        .unwrap();

        assert!(proxy.is_instance_of(&library.sized));
        assert!(proxy.is_instance_of(LazyInitialization::contract()));
        assert!(LazyInitialization::extract_instance(&proxy).unwrap().is_none());
        assert_eq!(created.load(Ordering::SeqCst), 0);

        assert_eq!(proxy.call("size", &[]).unwrap(), Value::Int(4));
        assert_eq!(proxy.call("size", &[]).unwrap(), Value::Int(4));
        assert_eq!(created.load(Ordering::SeqCst), 1);

        let instance = LazyInitialization::extract_instance(&proxy).unwrap().unwrap();
        assert_eq!(instance.downcast_ref::<TextObject>().unwrap().content, "lazy");
    }

    #[test]
    fn test_failed_initialization_is_retried() {
        let library = Library::new();
        let attempts = Arc::new(AtomicUsize::new(0));
        let seen = attempts.clone();
        let target = library.text_object("ok");
        let proxy = LazyInitialization::create_proxy(&library.sized, move || {
            if seen.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(ProxyError::Failed("not yet".into()))
            } else {
                Ok(target.clone())
            }
        })
        .unwrap();

        assert!(proxy.call("size", &[]).is_err());
        assert_eq!(proxy.call("size", &[]).unwrap(), Value::Int(2));
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_extract_from_other_object_fails() {
        let library = Library::new();
        let err = LazyInitialization::extract_instance(&library.text_object("x")).unwrap_err();
        assert!(matches!(err, ProxyError::IllegalInvocation(_)));
    }
}

mod dispatch {
    use super::*;

    #[test]
    fn test_routes_by_method_identity() {
        let counter = counter();
        let count = counter.declared_method(0).unwrap();
        let add = counter.declared_method(1).unwrap();
        let proxy = InvocationHandlerBuilder::create()
            .bind_method(&count, handler_fn(|_| Ok(HandlerResult::resolved(1))))
            .bind_method(&add, handler_fn(|_| Ok(HandlerResult::resolved(2))))
            .instantiate(&counter)
            .unwrap();

        assert_eq!(proxy.call("count", &[]).unwrap(), Value::Int(1));
        assert_eq!(proxy.call("add", &[Value::Int(9)]).unwrap(), Value::Int(2));
        assert!(matches!(
            proxy.call("hash_code", &[]),
            Err(ProxyError::UnhandledInvocation(_))
        ));
    }

    #[test]
    fn test_bind_by_reference() {
        let library = Library::new();
        let size = library.sized.declared_method(0).unwrap();
        let reference = Reference::of_instance(&size, |_: &Value| 0);
        let builder = InvocationHandlerBuilder::create()
            .bind_reference_in(
                &library.registry,
                &reference,
                handler_fn(|_| Ok(HandlerResult::resolved(42))),
            )
            .unwrap();
        assert_eq!(builder.len(), 1);

        let proxy = builder.instantiate(&library.sized).unwrap();
        assert_eq!(proxy.call("size", &[]).unwrap(), Value::Int(42));
    }

    #[test]
    fn test_bind_by_constructor_reference_fails() {
        let library = Library::new();
        let constructor = library.text.declared_method(0).unwrap();
        let reference = Reference::of_constructor(&constructor, |s: String| s);
        let result = InvocationHandlerBuilder::create().bind_reference_in(
            &library.registry,
            &reference,
            handler_fn(|_| Ok(HandlerResult::null())),
        );
        assert!(matches!(
            result,
            Err(introspectable::ReferenceError::NotAMethodReference)
        ));
    }
}
