use thiserror::Error;

/// Failure outcomes of the object runtime.
///
/// These are ordinary values handed back to the embedding language, not
/// internal faults. [`Runtime::rescue`](crate::runner::api::Runtime::rescue)
/// turns any of them into `nil`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuntimeError {
    #[error("undefined method '{name}' for {receiver} with {arity} argument(s)")]
    NoMethodError {
        name: String,
        arity: usize,
        receiver: String,
    },

    #[error("wrong number of arguments for '{name}' (given {given}, expected {expected})")]
    ArityError {
        name: String,
        given: usize,
        expected: String,
    },

    #[error("class conflict for '{name}': {reason}")]
    ClassConflictError { name: String, reason: String },

    #[error("cannot include '{path}': {reason}")]
    ModuleIncludeError { path: String, reason: String },

    #[error("uninitialized constant {name}")]
    NameError { name: String },

    #[error("host type '{type_name}' cannot be boxed")]
    UnboxableTypeError { type_name: String },

    #[error("type error: {0}")]
    TypeError(String),

    #[error("divided by 0")]
    ZeroDivisionError,

    #[error("host error: {0}")]
    HostError(String),

    #[error("out of memory: instance limit of {limit} reached")]
    HeapExhausted { limit: usize },

    #[error("config error: {0}")]
    ConfigError(String),
}

impl RuntimeError {
    pub fn no_method(name: &str, arity: usize, receiver: impl Into<String>) -> Self {
        RuntimeError::NoMethodError {
            name: name.to_string(),
            arity,
            receiver: receiver.into(),
        }
    }

    pub fn arity(name: &str, given: usize, expected: impl Into<String>) -> Self {
        RuntimeError::ArityError {
            name: name.to_string(),
            given,
            expected: expected.into(),
        }
    }

    /// True for the resolution failures a script normally guards with `rescue`.
    pub fn is_dispatch_failure(&self) -> bool {
        matches!(
            self,
            RuntimeError::NoMethodError { .. } | RuntimeError::ArityError { .. }
        )
    }
}
