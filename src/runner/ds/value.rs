use std::fmt;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::runner::dispatch::partial::PartialApplication;
use crate::runner::ds::class::ClassId;
use crate::runner::ds::instance::InstanceId;
use crate::runner::ds::method::MethodEntry;
use crate::runner::interop::host::HostRef;

/// A runtime value as seen by method bodies and the embedding host.
#[derive(Clone)]
pub enum Value {
    Nil,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(NovaString),
    Symbol(String),
    Array(NovaArray),
    Object(InstanceId),
    Class(ClassId),
    /// An unbound method value, what a top-level `def` evaluates to.
    Function(Arc<MethodEntry>),
    Partial(Arc<PartialApplication>),
    /// A host object that has not been boxed yet.
    Foreign(HostRef),
}

impl Value {
    pub fn str(s: &str) -> Self {
        Value::String(NovaString::new(s))
    }

    pub fn symbol(s: &str) -> Self {
        Value::Symbol(s.trim_start_matches(':').to_string())
    }

    pub fn array(items: Vec<Value>) -> Self {
        Value::Array(NovaArray::new(items))
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Boolean(false))
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Name-like values: symbols and strings, as accepted by `undef_method :name`.
    pub fn as_name(&self) -> Option<String> {
        match self {
            Value::Symbol(s) => Some(s.to_string()),
            Value::String(s) => Some(s.to_string()),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Boolean(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Symbol(_) => "symbol",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Class(_) => "class",
            Value::Function(_) => "function",
            Value::Partial(_) => "partial function",
            Value::Foreign(_) => "host object",
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{}", s),
            Value::Symbol(s) => write!(f, ":{}", s),
            Value::Array(a) => {
                let items: Vec<String> = a.to_vec().iter().map(|v| v.to_string()).collect();
                write!(f, "[{}]", items.join(", "))
            }
            Value::Object(id) => write!(f, "#<object {}>", id.0),
            Value::Class(id) => write!(f, "#<class {}>", id.0),
            Value::Function(m) => write!(f, "#<function {}>", m.name()),
            Value::Partial(p) => write!(f, "#<partial {}>", p.method_name()),
            Value::Foreign(h) => write!(f, "#<host {}>", h.type_name()),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "Value::Nil"),
            Value::Boolean(b) => write!(f, "Value::Boolean({})", b),
            Value::Integer(i) => write!(f, "Value::Integer({})", i),
            Value::Float(n) => write!(f, "Value::Float({})", n),
            Value::String(s) => write!(f, "Value::String({:?})", s.to_string()),
            Value::Symbol(s) => write!(f, "Value::Symbol({})", s),
            Value::Array(a) => write!(f, "Value::Array({:?})", a.to_vec()),
            Value::Object(id) => write!(f, "Value::Object({})", id.0),
            Value::Class(id) => write!(f, "Value::Class({})", id.0),
            Value::Function(m) => write!(f, "Value::Function({})", m.name()),
            Value::Partial(p) => write!(f, "Value::Partial({})", p.method_name()),
            Value::Foreign(h) => write!(f, "Value::Foreign({})", h.type_name()),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Integer(a), Value::Float(b)) | (Value::Float(b), Value::Integer(a)) => {
                (*a as f64) == *b
            }
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Symbol(a), Value::Symbol(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            (Value::Class(a), Value::Class(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => Arc::ptr_eq(a, b),
            (Value::Partial(a), Value::Partial(b)) => Arc::ptr_eq(a, b),
            (Value::Foreign(a), Value::Foreign(b)) => a.identity() == b.identity(),
            _ => false,
        }
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::str(s)
    }
}

/// A mutable string buffer shared by every copy of the value (`x << 'a'`
/// appends in place).
#[derive(Clone)]
pub struct NovaString(Arc<RwLock<String>>);

impl NovaString {
    pub fn new(s: &str) -> Self {
        NovaString(Arc::new(RwLock::new(s.to_string())))
    }

    pub fn push_str(&self, s: &str) {
        self.0.write().push_str(s);
    }

    pub fn len(&self) -> usize {
        self.0.read().chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.0.read().is_empty()
    }

    pub fn same_buffer(&self, other: &NovaString) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Display for NovaString {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.read())
    }
}

impl PartialEq for NovaString {
    fn eq(&self, other: &Self) -> bool {
        self.same_buffer(other) || *self.0.read() == *other.0.read()
    }
}

/// A mutable array shared by every copy of the value.
#[derive(Clone)]
pub struct NovaArray(Arc<RwLock<Vec<Value>>>);

impl NovaArray {
    pub fn new(items: Vec<Value>) -> Self {
        NovaArray(Arc::new(RwLock::new(items)))
    }

    pub fn push(&self, value: Value) {
        self.0.write().push(value);
    }

    pub fn get(&self, index: i64) -> Option<Value> {
        let items = self.0.read();
        let len = items.len() as i64;
        let index = if index < 0 { len + index } else { index };
        if index < 0 || index >= len {
            None
        } else {
            items.get(index as usize).cloned()
        }
    }

    pub fn len(&self) -> usize {
        self.0.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.read().is_empty()
    }

    pub fn to_vec(&self) -> Vec<Value> {
        self.0.read().clone()
    }
}

impl PartialEq for NovaArray {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.to_vec() == other.to_vec()
    }
}
