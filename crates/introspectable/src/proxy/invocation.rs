//! Invocation records

use std::fmt;
use std::sync::Arc;

use crate::error::ProxyError;
use crate::types::{MethodKind, MethodRef};
use crate::value::{ObjectRef, Value};

/// A single call: the invoked method, its receiver and its arguments.
///
/// Construction through [`Invocation::of`] verifies that the receiver and the
/// arguments fit the method, so every invocation a handler observes is
/// callable as-is.
#[derive(Debug, Clone)]
pub struct Invocation {
    method: MethodRef,
    receiver: Option<ObjectRef>,
    arguments: Arc<[Value]>,
}

impl Invocation {
    /// Create a verified invocation
    pub fn of(
        method: MethodRef,
        receiver: Option<ObjectRef>,
        arguments: Vec<Value>,
    ) -> Result<Self, ProxyError> {
        verify_receiver(&method, receiver.as_ref())?;
        verify_arguments(&method, &arguments)?;
        Ok(Self {
            method,
            receiver,
            arguments: arguments.into(),
        })
    }

    /// Invoked method
    pub fn method(&self) -> &MethodRef {
        &self.method
    }

    /// Receiver; absent for static methods and constructors
    pub fn receiver(&self) -> Option<&ObjectRef> {
        self.receiver.as_ref()
    }

    /// Arguments in parameter order
    pub fn arguments(&self) -> &[Value] {
        &self.arguments
    }

    /// Argument by index
    pub fn argument(&self, index: usize) -> Option<&Value> {
        self.arguments.get(index)
    }

    /// Same call on another receiver
    pub fn with_receiver(&self, receiver: ObjectRef) -> Result<Self, ProxyError> {
        verify_receiver(&self.method, Some(&receiver))?;
        Ok(Self {
            method: self.method.clone(),
            receiver: Some(receiver),
            arguments: self.arguments.clone(),
        })
    }

    /// Same call with other arguments
    pub fn with_arguments(&self, arguments: Vec<Value>) -> Result<Self, ProxyError> {
        Self::of(self.method.clone(), self.receiver.clone(), arguments)
    }

    /// Same receiver and arguments applied to another method
    pub fn with_method(&self, method: MethodRef) -> Result<Self, ProxyError> {
        Self::of(method, self.receiver.clone(), self.arguments.to_vec())
    }

    /// Apply `f` to the parts of this invocation
    pub fn decompose<R>(&self, f: impl FnOnce(&MethodRef, Option<&ObjectRef>, &[Value]) -> R) -> R {
        f(&self.method, self.receiver.as_ref(), &self.arguments)
    }

    /// Hand the parts of this invocation to an [`Invoker`]
    pub fn proceed<I: Invoker + ?Sized>(&self, invoker: &I) -> Result<Value, ProxyError> {
        invoker.process(&self.method, self.receiver.as_ref(), &self.arguments)
    }

    /// Execute the call: the method body when one is attached, otherwise the
    /// receiver's own implementation
    pub fn invoke(&self) -> Result<Value, ProxyError> {
        self.proceed(&DirectInvoker)
    }
}

impl PartialEq for Invocation {
    fn eq(&self, other: &Self) -> bool {
        let same_receiver = match (&self.receiver, &other.receiver) {
            (Some(a), Some(b)) => a.same_object(b),
            (None, None) => true,
            _ => false,
        };
        self.method == other.method && same_receiver && self.arguments[..] == other.arguments[..]
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} with {} argument(s)", self.method, self.arguments.len())?;
        if let Some(receiver) = &self.receiver {
            write!(f, " on {}@{:x}", receiver.class().name(), receiver.address())?;
        }
        Ok(())
    }
}

fn verify_receiver(method: &MethodRef, receiver: Option<&ObjectRef>) -> Result<(), ProxyError> {
    match (method.kind(), receiver) {
        (MethodKind::Instance, Some(receiver)) => {
            if receiver.is_instance_of(method.declaring_class()) {
                Ok(())
            } else {
                Err(ProxyError::IllegalInvocation(format!(
                    "receiver of class {} cannot be used for {}",
                    receiver.class().name(),
                    method
                )))
            }
        }
        (MethodKind::Instance, None) => Err(ProxyError::IllegalInvocation(format!(
            "{} requires a receiver",
            method
        ))),
        (_, Some(_)) => Err(ProxyError::IllegalInvocation(format!(
            "{} does not take a receiver",
            method
        ))),
        (_, None) => Ok(()),
    }
}

fn verify_arguments(method: &MethodRef, arguments: &[Value]) -> Result<(), ProxyError> {
    if arguments.len() != method.parameter_count() {
        return Err(ProxyError::IllegalInvocation(format!(
            "{} expects {} argument(s), got {}",
            method,
            method.parameter_count(),
            arguments.len()
        )));
    }
    for (argument, parameter) in arguments.iter().zip(method.parameters()) {
        if !argument.is_instance_of(&parameter.type_info) {
            return Err(ProxyError::IllegalInvocation(format!(
                "argument '{}' of {} expects {}, got {}",
                parameter.name,
                method,
                parameter.type_info,
                argument.type_name()
            )));
        }
    }
    Ok(())
}

/// Processes the parts of an invocation
pub trait Invoker {
    /// Produce the call's result
    fn process(
        &self,
        method: &MethodRef,
        receiver: Option<&ObjectRef>,
        arguments: &[Value],
    ) -> Result<Value, ProxyError>;
}

impl<F> Invoker for F
where
    F: Fn(&MethodRef, Option<&ObjectRef>, &[Value]) -> Result<Value, ProxyError>,
{
    fn process(
        &self,
        method: &MethodRef,
        receiver: Option<&ObjectRef>,
        arguments: &[Value],
    ) -> Result<Value, ProxyError> {
        self(method, receiver, arguments)
    }
}

/// Calls the method body, or the receiver's implementation when the method
/// has none
pub struct DirectInvoker;

impl Invoker for DirectInvoker {
    fn process(
        &self,
        method: &MethodRef,
        receiver: Option<&ObjectRef>,
        arguments: &[Value],
    ) -> Result<Value, ProxyError> {
        if let Some(body) = method.body() {
            return body(receiver, arguments);
        }
        match receiver {
            Some(receiver) => {
                let invocation = Invocation {
                    method: method.clone(),
                    receiver: Some(receiver.clone()),
                    arguments: arguments.into(),
                };
                receiver.dispatch(&invocation)
            }
            None => Err(ProxyError::Failed(format!(
                "{} has no implementation",
                method
            ))),
        }
    }
}
