//! Uniform get/set/invoke surface for hosts holding runtime values.

use std::fmt;
use std::sync::Arc;

use crate::runner::api::Runtime;
use crate::runner::ds::class::ClassId;
use crate::runner::ds::error::RuntimeError;
use crate::runner::ds::instance::InstanceId;
use crate::runner::ds::method::MethodEntry;
use crate::runner::ds::value::Value;

/// A runtime value together with the runtime it belongs to.
#[derive(Clone)]
pub struct DynamicHandle {
    runtime: Runtime,
    value: Value,
}

impl DynamicHandle {
    pub fn new(runtime: Runtime, value: Value) -> Self {
        DynamicHandle { runtime, value }
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }

    pub fn instance_id(&self) -> Option<InstanceId> {
        match self.value {
            Value::Object(id) => Some(id),
            _ => None,
        }
    }

    /// Member read: host field, method, then instance variable.
    pub fn get(&self, name: &str) -> Result<Value, RuntimeError> {
        self.runtime.get_member(&self.value, name)
    }

    /// Member write; a function value defines a singleton method.
    pub fn set(&self, name: &str, value: Value) -> Result<(), RuntimeError> {
        self.runtime.set_member(&self.value, name, value)
    }

    pub fn invoke(&self, name: &str, args: Vec<Value>) -> Result<Value, RuntimeError> {
        self.runtime.send(&self.value, name, args)
    }

    /// Call the value itself: partials complete, classes instantiate.
    pub fn call(&self, args: Vec<Value>) -> Result<Value, RuntimeError> {
        self.runtime.call_value(&self.value, args)
    }

    pub fn class(&self) -> Result<ClassRef, RuntimeError> {
        let id = self.runtime.class_of(&self.value)?;
        Ok(ClassRef::new(self.runtime.clone(), id))
    }
}

impl PartialEq for DynamicHandle {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl fmt::Debug for DynamicHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DynamicHandle({:?})", self.value)
    }
}

/// Handle to a class or module.
#[derive(Clone)]
pub struct ClassRef {
    runtime: Runtime,
    id: ClassId,
}

impl ClassRef {
    pub fn new(runtime: Runtime, id: ClassId) -> Self {
        ClassRef { runtime, id }
    }

    pub fn id(&self) -> ClassId {
        self.id
    }

    pub fn value(&self) -> Value {
        Value::Class(self.id)
    }

    pub fn name(&self) -> String {
        self.runtime.class_name(self.id)
    }

    pub fn superclass(&self) -> Option<ClassRef> {
        self.runtime
            .superclass_of(self.id)
            .map(|s| ClassRef::new(self.runtime.clone(), s))
    }

    pub fn ancestor_names(&self) -> Vec<String> {
        self.runtime
            .ancestors(self.id)
            .into_iter()
            .map(|c| self.runtime.class_name(c))
            .collect()
    }

    pub fn instance_methods(&self) -> Vec<String> {
        self.runtime.instance_method_names(self.id)
    }

    pub fn new_instance(&self, args: Vec<Value>) -> Result<DynamicHandle, RuntimeError> {
        let value = self.runtime.instantiate(self.id, args)?;
        Ok(DynamicHandle::new(self.runtime.clone(), value))
    }

    pub fn define_method(&self, entry: Arc<MethodEntry>) -> Result<(), RuntimeError> {
        self.runtime.define_method(self.id, entry)
    }

    pub fn define_class_method(&self, entry: Arc<MethodEntry>) -> Result<(), RuntimeError> {
        self.runtime.define_class_method(self.id, entry)
    }

    pub fn undef_method(&self, name: &str) -> Result<(), RuntimeError> {
        self.runtime.undef_method(self.id, name)
    }

    pub fn remove_method(&self, name: &str) -> Result<(), RuntimeError> {
        self.runtime.remove_method(self.id, name)
    }

    pub fn include(&self, module: ClassId) -> Result<(), RuntimeError> {
        self.runtime.include_module(self.id, module)
    }

    /// Class-level member read: class method, then nested constant.
    pub fn get(&self, name: &str) -> Result<Value, RuntimeError> {
        self.runtime.get_member(&self.value(), name)
    }

    /// A function value becomes an instance method; a class value a nested constant.
    pub fn set(&self, name: &str, value: Value) -> Result<(), RuntimeError> {
        self.runtime.set_member(&self.value(), name, value)
    }

    pub fn invoke(&self, name: &str, args: Vec<Value>) -> Result<Value, RuntimeError> {
        self.runtime.send(&self.value(), name, args)
    }
}

impl PartialEq for ClassRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl fmt::Debug for ClassRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClassRef({} #{})", self.name(), self.id)
    }
}
