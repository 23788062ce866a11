use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::runner::ds::value::Value;

/// Opaque name → value store used to pass classes and method values between
/// the host and the runtime.
#[derive(Debug, Default)]
pub struct Scope {
    bindings: RwLock<FxHashMap<String, Value>>,
}

impl Scope {
    pub fn new() -> Self {
        Scope::default()
    }

    pub fn get_variable(&self, name: &str) -> Option<Value> {
        self.bindings.read().get(name).cloned()
    }

    pub fn set_variable(&self, name: &str, value: Value) {
        self.bindings.write().insert(name.to_string(), value);
    }

    pub fn remove_variable(&self, name: &str) -> Option<Value> {
        self.bindings.write().remove(name)
    }

    pub fn contains_variable(&self, name: &str) -> bool {
        self.bindings.read().contains_key(name)
    }

    pub fn variable_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.bindings.read().keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_protocol() {
        let scope = Scope::new();
        scope.set_variable("test", Value::Integer(1));
        assert_eq!(scope.get_variable("test"), Some(Value::Integer(1)));
        assert_eq!(scope.remove_variable("test"), Some(Value::Integer(1)));
        assert!(!scope.contains_variable("test"));
        assert_eq!(scope.remove_variable("test"), None);
    }
}
