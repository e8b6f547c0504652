//! Dynamic Proxy Engine
//!
//! Synthesizes objects implementing one or more interface contracts at
//! runtime. Every call made on such an object becomes an [`Invocation`] and is
//! resolved by the instance's [`HandlerChain`]:
//!
//! ```text
//! proxy.call("name", args)
//!   -> dispatch table lookup (name, arity) on the synthesized class
//!   -> Invocation { method, receiver: proxy, arguments }
//!   -> handler 1 -> handler 2 -> ... -> fallback
//! ```
//!
//! One class is synthesized per distinct ordered contract set and shared by
//! every instance built for that set.

mod builder;
mod chain;
mod dispatch;
mod forwarding;
mod handler;
mod invocation;
mod lazy;

pub use builder::{handler_chain_of, is_proxy, ProxyBuilder, ProxyClass, SynthesizedInstance};
pub use chain::HandlerChain;
pub use dispatch::{DispatchingHandler, InvocationHandlerBuilder};
pub use forwarding::ForwardingHandler;
pub use handler::{
    handler_fn, FnHandler, HandlerRef, HandlerResult, InvocationHandler, NoopHandler,
    StandardObjectHandler, TracingHandler, UnhandledInvocationHandler,
};
pub use invocation::{DirectInvoker, Invocation, Invoker};
pub use lazy::LazyInitialization;
