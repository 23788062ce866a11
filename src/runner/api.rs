//! The [`Runtime`] façade.
//!
//! A runtime owns the class registry, the instance heap, the box registry
//! and a globals [`Scope`]. Handles are cheap clones of one shared state and
//! can be moved across threads.
//!
//! Lock order is boxes, then classes, then the heap. Method bodies always run
//! with no runtime lock held.

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

use crate::runner::config::RuntimeConfig;
use crate::runner::dispatch::resolver::MethodOwner;
use crate::runner::ds::class::ClassId;
use crate::runner::ds::error::RuntimeError;
use crate::runner::ds::heap::{InstanceCell, ObjectHeap};
use crate::runner::ds::instance::InstanceId;
use crate::runner::ds::method::MethodEntry;
use crate::runner::ds::method_table::TableLookup;
use crate::runner::ds::registry::{BuiltinClasses, ClassRegistry, CONSTRUCTOR_NAME};
use crate::runner::ds::scope::Scope;
use crate::runner::ds::value::Value;
use crate::runner::interop::boxing::BoxRegistry;
use crate::runner::interop::handle::{ClassRef, DynamicHandle};
use crate::runner::interop::host::{HostRef, Reflect};
use crate::runner::std_lib::register_core_builtins;

struct RuntimeInner {
    config: RuntimeConfig,
    classes: RwLock<ClassRegistry>,
    heap: RwLock<ObjectHeap>,
    boxes: Mutex<BoxRegistry>,
    globals: Scope,
}

#[derive(Clone)]
pub struct Runtime {
    inner: Arc<RuntimeInner>,
}

impl Runtime {
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    /// Fresh runtime with the core classes registered. Logging is left to
    /// [`RuntimeConfig::init_logging`].
    pub fn with_config(config: RuntimeConfig) -> Self {
        let mut classes = ClassRegistry::new(&config.root_class_name);
        register_core_builtins(&mut classes);
        let heap = ObjectHeap::new(config.heap.clone());
        debug!(
            root = %config.root_class_name,
            classes = classes.len(),
            max_instances = ?config.heap.max_instances,
            "runtime initialised"
        );
        Runtime {
            inner: Arc::new(RuntimeInner {
                config,
                classes: RwLock::new(classes),
                heap: RwLock::new(heap),
                boxes: Mutex::new(BoxRegistry::new()),
                globals: Scope::new(),
            }),
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.inner.config
    }

    /// Top-level scope shared by every handle of this runtime.
    pub fn globals(&self) -> &Scope {
        &self.inner.globals
    }

    pub(crate) fn classes(&self) -> RwLockReadGuard<'_, ClassRegistry> {
        self.inner.classes.read()
    }

    pub(crate) fn classes_mut(&self) -> RwLockWriteGuard<'_, ClassRegistry> {
        self.inner.classes.write()
    }

    pub(crate) fn boxes(&self) -> MutexGuard<'_, BoxRegistry> {
        self.inner.boxes.lock()
    }

    pub(crate) fn instance(&self, id: InstanceId) -> Result<InstanceCell, RuntimeError> {
        self.inner
            .heap
            .read()
            .get(id)
            .ok_or_else(|| RuntimeError::TypeError(format!("no live instance #{}", id.0)))
    }

    pub(crate) fn allocate(&self, class: ClassId, host: Option<HostRef>) -> Result<InstanceId, RuntimeError> {
        self.inner.heap.write().allocate(class, host)
    }

    /// Instances allocated over the runtime's lifetime; they are never freed.
    pub fn instance_count(&self) -> usize {
        self.inner.heap.read().len()
    }

    // ---- classes and modules ------------------------------------------------

    pub fn root_class(&self) -> ClassId {
        self.classes().root()
    }

    pub fn builtins(&self) -> BuiltinClasses {
        *self.classes().builtins()
    }

    /// Handle-style view of `class` for host code.
    pub fn class_ref(&self, class: ClassId) -> ClassRef {
        ClassRef::new(self.clone(), class)
    }

    /// Define a top-level class, or reopen it if the name is taken.
    pub fn define_class(&self, name: &str, superclass: Option<ClassId>) -> Result<ClassId, RuntimeError> {
        self.classes_mut().define_class(name, superclass, None)
    }

    /// Define or reopen a class nested inside `namespace`.
    pub fn define_class_in(
        &self,
        namespace: ClassId,
        name: &str,
        superclass: Option<ClassId>,
    ) -> Result<ClassId, RuntimeError> {
        self.classes_mut()
            .define_class(name, superclass, Some(namespace))
    }

    /// Define a top-level module, or reopen it. A class of the same name is a
    /// ClassConflictError.
    pub fn define_module(&self, name: &str) -> Result<ClassId, RuntimeError> {
        self.classes_mut().define_module(name, None)
    }

    pub fn define_module_in(&self, namespace: ClassId, name: &str) -> Result<ClassId, RuntimeError> {
        self.classes_mut().define_module(name, Some(namespace))
    }

    /// `Class.new(superclass)`: a class bound to no name.
    pub fn define_anonymous_class(&self, superclass: Option<ClassId>) -> Result<ClassId, RuntimeError> {
        self.classes_mut().define_anonymous(superclass)
    }

    /// Build an unbound class straight from function values.
    ///
    /// Every value must be a [`Value::Function`]; constructors are installed
    /// under `new` whatever their own name.
    pub fn new_class(
        &self,
        name: &str,
        superclass: Option<ClassId>,
        constructors: Vec<Value>,
        instance_methods: Vec<Value>,
    ) -> Result<ClassId, RuntimeError> {
        let constructors = function_entries(constructors)?;
        let methods = function_entries(instance_methods)?;
        let mut classes = self.classes_mut();
        let class = classes.create_unbound(name, superclass)?;
        for entry in constructors {
            classes.add_method(class, renamed_entry(entry, CONSTRUCTOR_NAME))?;
        }
        for entry in methods {
            classes.add_method(class, entry)?;
        }
        Ok(class)
    }

    /// Resolve `A::B::C`, starting lexically from `namespace`.
    pub fn resolve_path(&self, path: &str, namespace: Option<ClassId>) -> Result<ClassId, RuntimeError> {
        self.classes().resolve_path(path, namespace)
    }

    /// Mix `module` into `class`. Including twice is a no-op; self-includes
    /// and cycles fail.
    pub fn include_module(&self, class: ClassId, module: ClassId) -> Result<(), RuntimeError> {
        self.classes_mut().include_module(class, module).map(|_| ())
    }

    /// `include Outer::Inner` written inside `class`.
    pub fn include_path(&self, class: ClassId, path: &str) -> Result<ClassId, RuntimeError> {
        self.classes_mut().include_path(class, path, Some(class))
    }

    /// Add an instance method, overriding the slot with the same name and
    /// arity. An entry named `new` becomes a constructor.
    ///
    /// Existing instances, boxes included, see the method on their next send.
    pub fn define_method(&self, class: ClassId, entry: Arc<MethodEntry>) -> Result<(), RuntimeError> {
        self.classes_mut().add_method(class, entry)
    }

    pub fn define_class_method(&self, class: ClassId, entry: Arc<MethodEntry>) -> Result<(), RuntimeError> {
        self.classes_mut().add_class_method(class, entry)
    }

    /// Hide every overload of `name` at `class`; lookup stops there instead of
    /// reaching ancestors.
    pub fn undef_method(&self, class: ClassId, name: &str) -> Result<(), RuntimeError> {
        self.classes_mut().undef_method(class, name).map(|_| ())
    }

    /// Delete the definitions at `class`, exposing any inherited one.
    pub fn remove_method(&self, class: ClassId, name: &str) -> Result<(), RuntimeError> {
        self.classes_mut().remove_method(class, name).map(|_| ())
    }

    pub fn class_name(&self, class: ClassId) -> String {
        self.classes().name_of(class)
    }

    pub fn superclass_of(&self, class: ClassId) -> Option<ClassId> {
        self.classes().get(class).and_then(|n| n.superclass)
    }

    /// `class` first, then each superclass, with mixins after their includer.
    pub fn ancestors(&self, class: ClassId) -> Vec<ClassId> {
        self.classes().ancestors(class)
    }

    /// Callable instance method names, inherited ones included.
    pub fn instance_method_names(&self, class: ClassId) -> Vec<String> {
        self.classes().instance_method_names(class)
    }

    /// Whether instances of `class` respond to `name`.
    pub fn method_defined(&self, class: ClassId, name: &str) -> bool {
        let classes = self.classes();
        for id in classes.ancestors(class) {
            if let Some(node) = classes.get(id) {
                if node.instance_methods.has_active(name) {
                    return true;
                }
                if node.instance_methods.is_undefined(name) {
                    return false;
                }
            }
        }
        false
    }

    /// Foreign values are boxed first and report their shadow class.
    pub fn class_of(&self, value: &Value) -> Result<ClassId, RuntimeError> {
        match self.receiver_of(value)? {
            Value::Object(id) => Ok(self.instance(id)?.read().class),
            Value::Class(_) => Ok(self.classes().builtins().class),
            other => self
                .classes()
                .builtin_class_of(&other)
                .ok_or_else(|| RuntimeError::TypeError(format!("{} has no class", other.type_name()))),
        }
    }

    pub fn is_a(&self, value: &Value, class: ClassId) -> Result<bool, RuntimeError> {
        let own = self.class_of(value)?;
        Ok(self.classes().is_kind_of(own, class))
    }

    // ---- instances ------------------------------------------------------------

    /// `Class(args)`: allocate and run the nearest constructor.
    ///
    /// Host-backed classes build their host value through the reflected
    /// constructor of their shadow ancestor. A shadow class without one
    /// instantiates to `nil`.
    pub fn instantiate(&self, class: ClassId, args: Vec<Value>) -> Result<Value, RuntimeError> {
        let argc = args.len();
        let (constructor, mismatched, shadow, class_name) = {
            let classes = self.classes();
            let node = classes.node(class)?;
            if node.is_module() {
                return Err(RuntimeError::no_method(
                    CONSTRUCTOR_NAME,
                    argc,
                    format!("module {}", node.name),
                ));
            }
            let mut found = None;
            let mut mismatched = Vec::new();
            for level in classes.superclass_chain(class) {
                let level_node = classes.node(level)?;
                if level_node.is_shadow() {
                    break;
                }
                match level_node.constructors.lookup(CONSTRUCTOR_NAME, argc, false) {
                    TableLookup::Exact(entry) => {
                        found = Some((entry, level));
                        break;
                    }
                    TableLookup::Mismatch(arities) => mismatched.extend(arities),
                    TableLookup::Blocked => break,
                    TableLookup::Partial(_) | TableLookup::Missing => {}
                }
            }
            (found, mismatched, classes.shadow_ancestor(class), node.name.to_string())
        };
        let host_constructor = shadow.and_then(|s| self.boxes().constructor(s));

        if let Some((entry, level)) = constructor {
            let host = match &host_constructor {
                Some(ctor) if ctor.arity.accepts(0) => Some(ctor.construct(Vec::new())?),
                _ => None,
            };
            let id = self.allocate_registered(class, host)?;
            let instance = Value::Object(id);
            self.invoke_entry(entry, MethodOwner::Constructor(level), instance.clone(), args, false)?;
            debug!(class = %class_name, instance = id.0, "instantiated");
            return Ok(instance);
        }

        if let Some(ctor) = host_constructor {
            if !ctor.arity.accepts(argc) {
                return Err(RuntimeError::arity(CONSTRUCTOR_NAME, argc, ctor.arity.to_string()));
            }
            let host = ctor.construct(args)?;
            let id = self.allocate_registered(class, Some(host))?;
            debug!(class = %class_name, instance = id.0, "instantiated host-backed object");
            return Ok(Value::Object(id));
        }

        if shadow.is_some() {
            debug!(class = %class_name, "host type has no constructor");
            return Ok(Value::Nil);
        }

        if argc == 0 {
            let id = self.allocate(class, None)?;
            return Ok(Value::Object(id));
        }

        if mismatched.is_empty() {
            Err(RuntimeError::no_method(
                CONSTRUCTOR_NAME,
                argc,
                format!("class {}", class_name),
            ))
        } else {
            let expected: Vec<String> = mismatched.iter().map(|a| a.to_string()).collect();
            Err(RuntimeError::arity(CONSTRUCTOR_NAME, argc, expected.join(" or ")))
        }
    }

    /// Allocate, registering the box when a host value is attached.
    fn allocate_registered(&self, class: ClassId, host: Option<HostRef>) -> Result<InstanceId, RuntimeError> {
        let id = self.allocate(class, host.clone())?;
        if let Some(host) = host {
            self.boxes().register(host, class, id);
        }
        Ok(id)
    }

    fn object_id(&self, value: &Value) -> Result<InstanceId, RuntimeError> {
        match self.receiver_of(value)? {
            Value::Object(id) => Ok(id),
            other => Err(RuntimeError::TypeError(format!(
                "{} has no instance state",
                other.type_name()
            ))),
        }
    }

    /// `@name` of an object; unset reads as `nil`.
    pub fn ivar_get(&self, value: &Value, name: &str) -> Result<Value, RuntimeError> {
        let id = self.object_id(value)?;
        let value = self.instance(id)?.read().ivar(name);
        Ok(value.unwrap_or(Value::Nil))
    }

    /// Set `@name`. Values without instance state are a TypeError.
    pub fn ivar_set(&self, value: &Value, name: &str, new_value: Value) -> Result<(), RuntimeError> {
        let id = self.object_id(value)?;
        self.instance(id)?.write().set_ivar(name, new_value);
        Ok(())
    }

    pub fn instance_variables(&self, value: &Value) -> Result<Vec<String>, RuntimeError> {
        let id = self.object_id(value)?;
        let names = self.instance(id)?.read().ivar_names();
        Ok(names)
    }

    /// Add a method to this one object, ahead of its class in lookup.
    pub fn define_singleton_method(&self, value: &Value, entry: Arc<MethodEntry>) -> Result<(), RuntimeError> {
        let id = self.object_id(value)?;
        let name = entry.name().to_string();
        self.instance(id)?.write().singleton_mut().methods.add(entry);
        debug!(instance = id.0, method = %name, "defined singleton method");
        Ok(())
    }

    /// Instance-level `undef_method`: hides the name in this object's
    /// singleton table only.
    pub fn undef_instance_method(&self, value: &Value, name: &str) -> Result<(), RuntimeError> {
        let id = self.object_id(value)?;
        let cell = self.instance(id)?;
        let mut object = cell.write();
        if let Some(singleton) = object.existing_singleton_mut() {
            let changed = singleton.methods.undef(name);
            debug!(instance = id.0, method = %name, changed, "undefined singleton method");
        }
        Ok(())
    }

    /// Instance-level `remove_method`: drops the singleton definition and
    /// detaches the name from the object's own class, so this object alone
    /// falls through to the inherited definition.
    pub fn remove_instance_method(&self, value: &Value, name: &str) -> Result<(), RuntimeError> {
        let id = self.object_id(value)?;
        let cell = self.instance(id)?;
        let mut object = cell.write();
        let singleton = object.singleton_mut();
        let removed = singleton.methods.remove(name);
        singleton.detached.insert(name.to_string());
        debug!(instance = id.0, method = %name, removed, "removed method from instance");
        Ok(())
    }

    pub fn singleton_method_names(&self, value: &Value) -> Result<Vec<String>, RuntimeError> {
        let id = self.object_id(value)?;
        let names = self
            .instance(id)?
            .read()
            .singleton()
            .map(|s| s.methods.method_names())
            .unwrap_or_default();
        Ok(names)
    }

    /// `class << value`.
    pub fn open_singleton_class(&self, value: &Value) -> Result<SingletonClass, RuntimeError> {
        let target = match self.receiver_of(value)? {
            Value::Object(id) => SingletonTarget::Instance(id),
            Value::Class(class) => SingletonTarget::Class(class),
            other => SingletonTarget::Builtin(self.class_of(&other)?),
        };
        Ok(SingletonClass {
            runtime: self.clone(),
            target,
        })
    }

    // ---- boxing ---------------------------------------------------------------

    /// Box a host value. Boxing the same allocation again returns the same
    /// object. With a scope, the shadow class is bound there under its
    /// exported name.
    pub fn box_value(&self, host: HostRef, scope: Option<&Scope>) -> Result<DynamicHandle, RuntimeError> {
        let mut boxes = self.boxes();
        let existing = boxes.lookup(host.identity());
        if let Some((class, id)) = existing {
            drop(boxes);
            if let Some(scope) = scope {
                self.bind_class_in(scope, class);
            }
            return Ok(DynamicHandle::new(self.clone(), Value::Object(id)));
        }

        // Heap stays locked from the limit check through the allocation.
        let shadow = boxes.shadow_class(host.type_id());
        let (class, id) = match shadow {
            Some(class) => {
                let id = self.inner.heap.write().allocate(class, Some(host.clone()))?;
                (class, id)
            }
            None => {
                let info = host.describe().ok_or_else(|| RuntimeError::UnboxableTypeError {
                    type_name: host.type_name().to_string(),
                })?;
                let mut classes = self.classes_mut();
                let mut heap = self.inner.heap.write();
                if !heap.can_allocate() {
                    return Err(heap_exhausted(&self.inner.config));
                }
                let class = boxes.install_shadow(&mut classes, &info)?;
                let id = heap.allocate(class, Some(host.clone()))?;
                (class, id)
            }
        };

        boxes.register(host, class, id);
        drop(boxes);

        if let Some(scope) = scope {
            self.bind_class_in(scope, class);
        }
        Ok(DynamicHandle::new(self.clone(), Value::Object(id)))
    }

    /// Shadow class already reflected for `T`, if any value or type of it
    /// has been boxed.
    pub fn shadow_class<T: Reflect>(&self) -> Option<ClassRef> {
        let shadow = self.boxes().shadow_class(std::any::TypeId::of::<T>());
        shadow.map(|class| ClassRef::new(self.clone(), class))
    }

    /// Shadow class for a host type, without boxing a value.
    pub fn box_type<T: Reflect>(&self) -> Result<ClassRef, RuntimeError> {
        let mut boxes = self.boxes();
        let shadow = boxes.shadow_class(std::any::TypeId::of::<T>());
        let class = match shadow {
            Some(class) => class,
            None => {
                let info = T::reflect();
                let mut classes = self.classes_mut();
                boxes.install_shadow(&mut classes, &info)?
            }
        };
        drop(boxes);
        Ok(ClassRef::new(self.clone(), class))
    }

    fn bind_class_in(&self, scope: &Scope, class: ClassId) {
        let name = self.class_name(class);
        scope.set_variable(&name, Value::Class(class));
    }

    /// Host value behind a boxed object or a raw foreign value.
    pub fn host_of(&self, value: &Value) -> Option<HostRef> {
        match value {
            Value::Foreign(host) => Some(host.clone()),
            Value::Object(id) => self
                .instance(*id)
                .ok()
                .and_then(|cell| cell.read().host().cloned()),
            _ => None,
        }
    }

    /// Wrap any value for member access from host code.
    pub fn handle(&self, value: Value) -> DynamicHandle {
        DynamicHandle::new(self.clone(), value)
    }

    /// Foreign values become their box; everything else passes through.
    pub(crate) fn receiver_of(&self, value: &Value) -> Result<Value, RuntimeError> {
        match value {
            Value::Foreign(host) => Ok(self.box_value(host.clone(), None)?.into_value()),
            other => Ok(other.clone()),
        }
    }

    // ---- recovery -------------------------------------------------------------

    /// `begin { ... } rescue * { nil }`: any error inside becomes `nil`.
    pub fn rescue<F>(&self, f: F) -> Value
    where
        F: FnOnce(&Runtime) -> Result<Value, RuntimeError>,
    {
        match f(self) {
            Ok(value) => value,
            Err(e) => {
                debug!(error = %e, "rescued runtime error");
                Value::Nil
            }
        }
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

fn heap_exhausted(config: &RuntimeConfig) -> RuntimeError {
    RuntimeError::HeapExhausted {
        limit: config.heap.max_instances.unwrap_or(usize::MAX),
    }
}

fn function_entries(values: Vec<Value>) -> Result<Vec<Arc<MethodEntry>>, RuntimeError> {
    values
        .into_iter()
        .map(|v| match v {
            Value::Function(entry) => Ok(entry),
            other => Err(RuntimeError::TypeError(format!(
                "expected a function, got {}",
                other.type_name()
            ))),
        })
        .collect()
}

/// Reuse the entry when the name already matches.
pub(crate) fn renamed_entry(entry: Arc<MethodEntry>, name: &str) -> Arc<MethodEntry> {
    if entry.name() == name {
        entry
    } else {
        entry.renamed(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SingletonTarget {
    Instance(InstanceId),
    /// Class-level table of a class.
    Class(ClassId),
    /// Values without identity open their built-in class.
    Builtin(ClassId),
}

/// Result of `class << value`: a table that accepts definitions.
#[derive(Clone)]
pub struct SingletonClass {
    runtime: Runtime,
    target: SingletonTarget,
}

impl SingletonClass {
    pub fn define_method(&self, entry: Arc<MethodEntry>) -> Result<(), RuntimeError> {
        match self.target {
            SingletonTarget::Instance(id) => self
                .runtime
                .define_singleton_method(&Value::Object(id), entry),
            SingletonTarget::Class(class) => self.runtime.define_class_method(class, entry),
            SingletonTarget::Builtin(class) => self.runtime.define_method(class, entry),
        }
    }

    /// Blocks lookup of `name` for everything this table serves.
    pub fn undef_method(&self, name: &str) -> Result<(), RuntimeError> {
        match self.target {
            SingletonTarget::Instance(id) => self
                .runtime
                .undef_instance_method(&Value::Object(id), name),
            SingletonTarget::Class(class) => {
                self.runtime.classes_mut().node_mut(class)?.class_methods.undef(name);
                Ok(())
            }
            SingletonTarget::Builtin(class) => self.runtime.undef_method(class, name),
        }
    }

    /// Deletes the definition from this table only.
    pub fn remove_method(&self, name: &str) -> Result<(), RuntimeError> {
        match self.target {
            SingletonTarget::Instance(id) => {
                let cell = self.runtime.instance(id)?;
                let mut object = cell.write();
                if let Some(singleton) = object.existing_singleton_mut() {
                    singleton.methods.remove(name);
                }
                Ok(())
            }
            SingletonTarget::Class(class) => {
                self.runtime.classes_mut().node_mut(class)?.class_methods.remove(name);
                Ok(())
            }
            SingletonTarget::Builtin(class) => self.runtime.remove_method(class, name),
        }
    }

    pub fn method_names(&self) -> Result<Vec<String>, RuntimeError> {
        match self.target {
            SingletonTarget::Instance(id) => self.runtime.singleton_method_names(&Value::Object(id)),
            SingletonTarget::Class(class) => Ok(self
                .runtime
                .classes()
                .node(class)?
                .class_methods
                .method_names()),
            SingletonTarget::Builtin(class) => {
                Ok(self.runtime.classes().node(class)?.instance_methods.method_names())
            }
        }
    }
}
