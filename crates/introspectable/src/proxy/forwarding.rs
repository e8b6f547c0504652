//! Forwarding to a swappable target

use parking_lot::RwLock;

use crate::error::ProxyError;
use crate::value::ObjectRef;

use super::handler::{HandlerResult, InvocationHandler};
use super::Invocation;

/// Re-targets every invocation at the current target object.
///
/// The target can be swapped while proxies using this handler are live; each
/// call reads the target once, so a call never observes two targets.
pub struct ForwardingHandler {
    target: RwLock<ObjectRef>,
}

impl ForwardingHandler {
    /// Forward to `target`
    pub fn of(target: ObjectRef) -> Self {
        Self {
            target: RwLock::new(target),
        }
    }

    /// Current target
    pub fn target(&self) -> ObjectRef {
        self.target.read().clone()
    }

    /// Replace the target, returning the previous one
    pub fn swap(&self, target: ObjectRef) -> ObjectRef {
        std::mem::replace(&mut *self.target.write(), target)
    }
}

impl InvocationHandler for ForwardingHandler {
    fn handle(&self, invocation: &Invocation) -> Result<HandlerResult, ProxyError> {
        let target = self.target();
        let forwarded = invocation.with_receiver(target)?;
        Ok(HandlerResult::Resolved(forwarded.invoke()?))
    }
}
