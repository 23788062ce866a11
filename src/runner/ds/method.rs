//! Method entries: one callable definition each.

use std::fmt;
use std::sync::Arc;

use crate::runner::dispatch::context::CallContext;
use crate::runner::ds::error::RuntimeError;
use crate::runner::ds::value::Value;

/// Function signature for compiled-in methods.
pub type NativeFn = fn(ctx: &mut CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError>;

/// Boxed closure body, used for script-compiled code and reflected host members.
pub type ClosureFn =
    dyn Fn(&mut CallContext<'_>, Vec<Value>) -> Result<Value, RuntimeError> + Send + Sync;

/// Declared arity of a method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arity {
    Fixed(usize),
    /// A variable tail after `n` required arguments.
    AtLeast(usize),
}

impl Arity {
    pub fn required(&self) -> usize {
        match self {
            Arity::Fixed(n) | Arity::AtLeast(n) => *n,
        }
    }

    pub fn accepts(&self, argc: usize) -> bool {
        match self {
            Arity::Fixed(n) => argc == *n,
            Arity::AtLeast(n) => argc >= *n,
        }
    }

    /// Whether `argc` arguments can be bound as a prefix, leaving the rest for later.
    pub fn accepts_prefix(&self, argc: usize) -> bool {
        argc < self.required()
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Fixed(n) => write!(f, "{}", n),
            Arity::AtLeast(n) => write!(f, "{}+", n),
        }
    }
}

/// Method body, either compiled-in or supplied by the embedder.
#[derive(Clone)]
pub enum MethodBody {
    /// Direct function pointer.
    Native(NativeFn),
    /// Closure supplied by the compiler layer or the host bridge.
    Closure(Arc<ClosureFn>),
}

impl MethodBody {
    pub fn call(&self, ctx: &mut CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
        match self {
            MethodBody::Native(f) => f(ctx, args),
            MethodBody::Closure(f) => f(ctx, args),
        }
    }
}

/// One callable definition. Entries are immutable and shared, so the same
/// function value may sit in several method tables at once.
pub struct MethodEntry {
    name: String,
    arity: Arity,
    body: MethodBody,
}

impl MethodEntry {
    pub fn new(name: impl Into<String>, arity: Arity, body: MethodBody) -> Arc<Self> {
        Arc::new(MethodEntry {
            name: name.into(),
            arity,
            body,
        })
    }

    pub fn native(name: impl Into<String>, arity: usize, f: NativeFn) -> Arc<Self> {
        Self::new(name, Arity::Fixed(arity), MethodBody::Native(f))
    }

    pub fn native_variadic(name: impl Into<String>, required: usize, f: NativeFn) -> Arc<Self> {
        Self::new(name, Arity::AtLeast(required), MethodBody::Native(f))
    }

    pub fn closure<F>(name: impl Into<String>, arity: usize, f: F) -> Arc<Self>
    where
        F: Fn(&mut CallContext<'_>, Vec<Value>) -> Result<Value, RuntimeError>
            + Send
            + Sync
            + 'static,
    {
        Self::new(name, Arity::Fixed(arity), MethodBody::Closure(Arc::new(f)))
    }

    pub fn closure_variadic<F>(name: impl Into<String>, required: usize, f: F) -> Arc<Self>
    where
        F: Fn(&mut CallContext<'_>, Vec<Value>) -> Result<Value, RuntimeError>
            + Send
            + Sync
            + 'static,
    {
        Self::new(
            name,
            Arity::AtLeast(required),
            MethodBody::Closure(Arc::new(f)),
        )
    }

    /// Same body under another name, for `obj.name = def ...` style assignment.
    pub fn renamed(&self, name: &str) -> Arc<Self> {
        Arc::new(MethodEntry {
            name: name.to_string(),
            arity: self.arity,
            body: self.body.clone(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arity(&self) -> Arity {
        self.arity
    }

    pub fn body(&self) -> &MethodBody {
        &self.body
    }
}

impl fmt::Debug for MethodEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MethodEntry({}/{})", self.name, self.arity)
    }
}
