//! Partial application.
//!
//! Calling a method with fewer arguments than it declares binds what was
//! given and yields a [`PartialApplication`]. Completing it runs the entry
//! against the captured receiver, so instance variables are read at
//! completion time, not at capture time.

use std::fmt;
use std::sync::Arc;

use tracing::trace;

use crate::runner::api::Runtime;
use crate::runner::dispatch::resolver::MethodOwner;
use crate::runner::ds::error::RuntimeError;
use crate::runner::ds::method::MethodEntry;
use crate::runner::ds::value::Value;

pub struct PartialApplication {
    entry: Arc<MethodEntry>,
    owner: MethodOwner,
    receiver: Value,
    bound: Vec<Value>,
}

impl PartialApplication {
    pub fn new(entry: Arc<MethodEntry>, owner: MethodOwner, receiver: Value, bound: Vec<Value>) -> Self {
        PartialApplication {
            entry,
            owner,
            receiver,
            bound,
        }
    }

    pub fn method_name(&self) -> &str {
        self.entry.name()
    }

    pub fn entry(&self) -> &Arc<MethodEntry> {
        &self.entry
    }

    pub fn receiver(&self) -> &Value {
        &self.receiver
    }

    pub fn bound(&self) -> &[Value] {
        &self.bound
    }

    /// Arguments still needed before the entry can run.
    pub fn remaining(&self) -> usize {
        self.entry.arity().required().saturating_sub(self.bound.len())
    }

    /// Append `args` to the bound prefix and run the entry.
    ///
    /// A total that is still short of the declared arity yields another
    /// partial application; any other total the entry rejects is an
    /// `ArityError`.
    pub fn complete(&self, runtime: &Runtime, args: Vec<Value>) -> Result<Value, RuntimeError> {
        let mut all = self.bound.clone();
        all.extend(args);
        let arity = self.entry.arity();
        if arity.accepts(all.len()) {
            trace!(method = %self.entry.name(), argc = all.len(), "completing partial application");
            return runtime.invoke_entry(
                self.entry.clone(),
                self.owner,
                self.receiver.clone(),
                all,
                false,
            );
        }
        if arity.accepts_prefix(all.len()) && all.len() > self.bound.len() {
            return Ok(Value::Partial(Arc::new(PartialApplication::new(
                self.entry.clone(),
                self.owner,
                self.receiver.clone(),
                all,
            ))));
        }
        Err(RuntimeError::arity(
            self.entry.name(),
            all.len(),
            arity.to_string(),
        ))
    }
}

impl fmt::Debug for PartialApplication {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PartialApplication({}, bound {}/{})",
            self.entry.name(),
            self.bound.len(),
            self.entry.arity()
        )
    }
}
