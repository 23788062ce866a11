use crate::runner::api::Runtime;
use crate::runner::dispatch::resolver::MethodOwner;
use crate::runner::ds::error::RuntimeError;
use crate::runner::ds::value::Value;
use crate::runner::interop::host::HostRef;

/// Execution context handed to every method body.
///
/// Holds the bound receiver (`self`), the level the running method was found
/// at (for `super`), and the call-site postfix flag.
pub struct CallContext<'rt> {
    runtime: &'rt Runtime,
    receiver: Value,
    owner: MethodOwner,
    method_name: String,
    postfix: bool,
}

impl<'rt> CallContext<'rt> {
    pub fn new(
        runtime: &'rt Runtime,
        receiver: Value,
        owner: MethodOwner,
        method_name: impl Into<String>,
        postfix: bool,
    ) -> Self {
        CallContext {
            runtime,
            receiver,
            owner,
            method_name: method_name.into(),
            postfix,
        }
    }

    pub fn runtime(&self) -> &'rt Runtime {
        self.runtime
    }

    pub fn receiver(&self) -> &Value {
        &self.receiver
    }

    pub fn owner(&self) -> MethodOwner {
        self.owner
    }

    pub fn method_name(&self) -> &str {
        &self.method_name
    }

    /// True when a unary operator was written after its operand.
    pub fn is_postfix(&self) -> bool {
        self.postfix
    }

    /// `@name` on the receiver; unset reads as `nil`.
    pub fn ivar(&self, name: &str) -> Result<Value, RuntimeError> {
        self.runtime.ivar_get(&self.receiver, name)
    }

    pub fn set_ivar(&self, name: &str, value: Value) -> Result<(), RuntimeError> {
        self.runtime.ivar_set(&self.receiver, name, value)
    }

    /// `self.name(args)`.
    pub fn send_self(&self, name: &str, args: Vec<Value>) -> Result<Value, RuntimeError> {
        self.runtime.send(&self.receiver, name, args)
    }

    /// `super(args)`: the running method's name, resolved past the level
    /// that defines it.
    pub fn call_super(&self, args: Vec<Value>) -> Result<Value, RuntimeError> {
        self.runtime
            .send_super(&self.receiver, self.owner, &self.method_name, args)
    }

    /// `super.name(args)`.
    pub fn super_send(&self, name: &str, args: Vec<Value>) -> Result<Value, RuntimeError> {
        self.runtime
            .send_super(&self.receiver, self.owner, name, args)
    }

    /// Host value behind a boxed receiver.
    pub fn host(&self) -> Result<HostRef, RuntimeError> {
        self.runtime.host_of(&self.receiver).ok_or_else(|| {
            RuntimeError::TypeError(format!(
                "'{}' needs a host-backed receiver, got {}",
                self.method_name,
                self.receiver.type_name()
            ))
        })
    }

    /// Run `f` against the receiver's host value downcast to `T`.
    pub fn with_host<T: 'static, R>(&self, f: impl FnOnce(&T) -> R) -> Result<R, RuntimeError> {
        let host = self.host()?;
        let value = host.downcast_ref::<T>().ok_or_else(|| {
            RuntimeError::HostError(format!(
                "receiver of '{}' is a {}",
                self.method_name,
                host.type_name()
            ))
        })?;
        Ok(f(value))
    }

    /// First argument as an integer, for arithmetic built-ins.
    pub fn integer_arg(&self, args: &[Value], index: usize) -> Result<i64, RuntimeError> {
        match args.get(index) {
            Some(Value::Integer(i)) => Ok(*i),
            Some(other) => Err(RuntimeError::TypeError(format!(
                "'{}' expects an integer argument, got {}",
                self.method_name,
                other.type_name()
            ))),
            None => Err(RuntimeError::arity(
                &self.method_name,
                args.len(),
                (index + 1).to_string(),
            )),
        }
    }
}
