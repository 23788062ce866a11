//! Class arena and name bindings.
//!
//! Every class, module and shadow class lives here, addressed by [`ClassId`].
//! Superclass links, mixins and nested constants are all indices, so reopening
//! a class is just "look it up by name and mutate in place".

use std::any::TypeId;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use tracing::debug;
use uuid::Uuid;

use crate::runner::ds::class::{ClassId, ClassKind, ClassNode};
use crate::runner::ds::error::RuntimeError;
use crate::runner::ds::method::MethodEntry;
use crate::runner::ds::method_table::MethodTable;
use crate::runner::ds::value::Value;

/// Name under which constructors are defined.
pub const CONSTRUCTOR_NAME: &str = "new";

/// Classes every runtime starts with.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinClasses {
    pub object: ClassId,
    pub class: ClassId,
    pub nil: ClassId,
    pub boolean: ClassId,
    pub integer: ClassId,
    pub float: ClassId,
    pub string: ClassId,
    pub symbol: ClassId,
    pub array: ClassId,
    pub proc: ClassId,
}

#[derive(Debug)]
pub struct ClassRegistry {
    nodes: Vec<ClassNode>,
    /// Top-level bindings.
    globals: FxHashMap<String, ClassId>,
    builtins: BuiltinClasses,
}

impl ClassRegistry {
    /// Create a registry holding the root class and the built-in value classes.
    pub fn new(root_name: &str) -> Self {
        let mut registry = ClassRegistry {
            nodes: Vec::new(),
            globals: FxHashMap::default(),
            builtins: BuiltinClasses::default(),
        };
        let root = registry.allocate(root_name, ClassKind::Class, None, None, true);
        let mut builtin = |name: &str| registry.allocate(name, ClassKind::Class, Some(root), None, true);
        let builtins = BuiltinClasses {
            object: root,
            class: builtin("Class"),
            nil: builtin("NilClass"),
            boolean: builtin("Boolean"),
            integer: builtin("Integer"),
            float: builtin("Float"),
            string: builtin("String"),
            symbol: builtin("Symbol"),
            array: builtin("Array"),
            proc: builtin("Proc"),
        };
        registry.builtins = builtins;
        registry
    }

    /// The class every class without an explicit superclass descends from.
    pub fn root(&self) -> ClassId {
        self.builtins.object
    }

    pub fn builtins(&self) -> &BuiltinClasses {
        &self.builtins
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: ClassId) -> Option<&ClassNode> {
        self.nodes.get(id.0 as usize)
    }

    /// Like [`ClassRegistry::get`], but an unknown id is a NameError.
    pub fn node(&self, id: ClassId) -> Result<&ClassNode, RuntimeError> {
        self.nodes.get(id.0 as usize).ok_or_else(|| RuntimeError::NameError {
            name: format!("#<class {}>", id),
        })
    }

    pub fn node_mut(&mut self, id: ClassId) -> Result<&mut ClassNode, RuntimeError> {
        self.nodes
            .get_mut(id.0 as usize)
            .ok_or_else(|| RuntimeError::NameError {
                name: format!("#<class {}>", id),
            })
    }

    /// Display name; unknown ids render as `#<class N>`.
    pub fn name_of(&self, id: ClassId) -> String {
        self.get(id)
            .map(|n| n.name.to_string())
            .unwrap_or_else(|| format!("#<class {}>", id))
    }

    fn allocate(
        &mut self,
        name: &str,
        kind: ClassKind,
        superclass: Option<ClassId>,
        namespace: Option<ClassId>,
        bind: bool,
    ) -> ClassId {
        let id = ClassId(self.nodes.len() as u32);
        self.nodes
            .push(ClassNode::new(id, name, kind, superclass, namespace));
        if bind {
            match namespace.and_then(|ns| self.nodes.get_mut(ns.0 as usize)) {
                Some(outer) => {
                    outer.constants.insert(name.to_string(), id);
                }
                None => {
                    self.globals.insert(name.to_string(), id);
                }
            }
        }
        id
    }

    /// Bind `name` to `id` directly inside `namespace` (top level when `None`).
    pub fn bind_constant(
        &mut self,
        namespace: Option<ClassId>,
        name: &str,
        id: ClassId,
    ) -> Result<(), RuntimeError> {
        match namespace {
            Some(ns) => {
                self.node_mut(ns)?.constants.insert(name.to_string(), id);
            }
            None => {
                self.globals.insert(name.to_string(), id);
            }
        }
        Ok(())
    }

    /// Lexical name resolution starting at `namespace`.
    ///
    /// Each enclosing level is checked for nested constants and for the
    /// names (and constants) of the nodes it includes; top-level bindings
    /// come last.
    pub fn resolve_name(&self, name: &str, namespace: Option<ClassId>) -> Option<ClassId> {
        let mut current = namespace;
        while let Some(id) = current {
            let node = self.get(id)?;
            if let Some(found) = node.constants.get(name) {
                return Some(*found);
            }
            for included in node.included_modules.iter().rev() {
                if let Some(mixin) = self.get(*included) {
                    if mixin.name == name {
                        return Some(*included);
                    }
                    if let Some(found) = mixin.constants.get(name) {
                        return Some(*found);
                    }
                }
            }
            current = node.namespace;
        }
        self.globals.get(name).copied()
    }

    /// Resolve a `Outer::Inner` path. A leading `::` anchors at top level.
    pub fn resolve_path(&self, path: &str, namespace: Option<ClassId>) -> Result<ClassId, RuntimeError> {
        let not_found = || RuntimeError::NameError {
            name: path.to_string(),
        };
        let (anchored, rest) = match path.strip_prefix("::") {
            Some(rest) => (true, rest),
            None => (false, path),
        };
        let mut segments = rest.split("::").map(str::trim);
        let first = segments.next().filter(|s| !s.is_empty()).ok_or_else(not_found)?;
        let mut current = if anchored {
            self.globals.get(first).copied()
        } else {
            self.resolve_name(first, namespace)
        }
        .ok_or_else(not_found)?;
        for segment in segments {
            current = *self
                .node(current)?
                .constants
                .get(segment)
                .ok_or_else(not_found)?;
        }
        Ok(current)
    }

    /// Define or reopen a class.
    ///
    /// A name already reachable from `namespace` is reopened and returned
    /// unchanged. Supplying a superclass different from the existing one fails.
    pub fn define_class(
        &mut self,
        name: &str,
        superclass: Option<ClassId>,
        namespace: Option<ClassId>,
    ) -> Result<ClassId, RuntimeError> {
        if let Some(existing) = self.resolve_name(name, namespace) {
            let node = self.node(existing)?;
            if node.is_module() {
                return Err(RuntimeError::ClassConflictError {
                    name: name.to_string(),
                    reason: "already defined as a module".to_string(),
                });
            }
            if let Some(requested) = superclass {
                if node.superclass != Some(requested) {
                    return Err(RuntimeError::ClassConflictError {
                        name: name.to_string(),
                        reason: format!(
                            "superclass mismatch ({} given, {} expected)",
                            self.name_of(requested),
                            node.superclass
                                .map(|s| self.name_of(s))
                                .unwrap_or_else(|| "none".to_string())
                        ),
                    });
                }
            }
            debug!(class = %name, id = existing.0, "reopening class");
            return Ok(existing);
        }

        let superclass = match superclass {
            Some(s) => {
                if self.node(s)?.is_module() {
                    return Err(RuntimeError::ClassConflictError {
                        name: name.to_string(),
                        reason: format!("superclass {} is a module", self.name_of(s)),
                    });
                }
                s
            }
            None => self.root(),
        };
        let id = self.allocate(name, ClassKind::Class, Some(superclass), namespace, true);
        debug!(class = %name, id = id.0, superclass = superclass.0, "defined class");
        Ok(id)
    }

    /// Define or reopen a module.
    pub fn define_module(
        &mut self,
        name: &str,
        namespace: Option<ClassId>,
    ) -> Result<ClassId, RuntimeError> {
        if let Some(existing) = self.resolve_name(name, namespace) {
            if !self.node(existing)?.is_module() {
                return Err(RuntimeError::ClassConflictError {
                    name: name.to_string(),
                    reason: "already defined as a class".to_string(),
                });
            }
            debug!(module = %name, id = existing.0, "reopening module");
            return Ok(existing);
        }
        let id = self.allocate(name, ClassKind::Module, None, namespace, true);
        debug!(module = %name, id = id.0, "defined module");
        Ok(id)
    }

    /// A class that is not bound to any name.
    pub fn create_unbound(
        &mut self,
        name: &str,
        superclass: Option<ClassId>,
    ) -> Result<ClassId, RuntimeError> {
        let superclass = match superclass {
            Some(s) => {
                self.node(s)?;
                s
            }
            None => self.root(),
        };
        Ok(self.allocate(name, ClassKind::Class, Some(superclass), None, false))
    }

    /// Unbound class under a generated `#<Class:uuid>` name.
    pub fn define_anonymous(&mut self, superclass: Option<ClassId>) -> Result<ClassId, RuntimeError> {
        let name = format!("#<Class:{}>", Uuid::new_v4().to_hyphenated());
        self.create_unbound(&name, superclass)
    }

    /// Class standing in for the host type `type_id`. Callers check that none
    /// exists yet.
    pub fn create_shadow(&mut self, name: &str, type_id: TypeId) -> ClassId {
        let root = self.root();
        let id = self.allocate(name, ClassKind::Shadow(type_id), Some(root), None, false);
        debug!(class = %name, id = id.0, "created shadow class");
        id
    }

    /// Append `module` to the mixins of `class`. Returns false when it was
    /// already included.
    pub fn include_module(&mut self, class: ClassId, module: ClassId) -> Result<bool, RuntimeError> {
        let module_name = self.name_of(module);
        self.node(module)?;
        if class == module {
            return Err(RuntimeError::ModuleIncludeError {
                path: module_name,
                reason: "cannot include a module into itself".to_string(),
            });
        }
        if self.ancestors(module).contains(&class) {
            return Err(RuntimeError::ModuleIncludeError {
                path: module_name,
                reason: format!("cyclic include into {}", self.name_of(class)),
            });
        }
        let node = self.node_mut(class)?;
        if node.included_modules.contains(&module) {
            return Ok(false);
        }
        node.included_modules.push(module);
        debug!(class = %node.name, module = %module_name, "included module");
        Ok(true)
    }

    /// Resolve `path` from `namespace` and include it into `class`.
    pub fn include_path(
        &mut self,
        class: ClassId,
        path: &str,
        namespace: Option<ClassId>,
    ) -> Result<ClassId, RuntimeError> {
        let module = self
            .resolve_path(path, namespace)
            .map_err(|_| RuntimeError::ModuleIncludeError {
                path: path.to_string(),
                reason: "uninitialized constant".to_string(),
            })?;
        self.include_module(class, module)?;
        Ok(module)
    }

    /// Method resolution order for instances of `class`: the class, its
    /// mixins most recent first, then the superclass, recursively.
    pub fn ancestors(&self, class: ClassId) -> Vec<ClassId> {
        let mut out = Vec::new();
        let mut current = Some(class);
        while let Some(id) = current {
            let node = match self.get(id) {
                Some(n) => n,
                None => break,
            };
            self.push_with_mixins(id, &mut out);
            current = node.superclass;
        }
        out
    }

    fn push_with_mixins(&self, id: ClassId, out: &mut Vec<ClassId>) {
        if out.contains(&id) {
            return;
        }
        out.push(id);
        if let Some(node) = self.get(id) {
            for module in node.included_modules.iter().rev() {
                self.push_with_mixins(*module, out);
            }
        }
    }

    /// `class` followed by its superclasses, without mixins.
    pub fn superclass_chain(&self, class: ClassId) -> Vec<ClassId> {
        let mut out = Vec::new();
        let mut current = Some(class);
        while let Some(id) = current {
            out.push(id);
            current = self.get(id).and_then(|n| n.superclass);
        }
        out
    }

    /// Superclass chain or mixin membership.
    pub fn is_kind_of(&self, class: ClassId, ancestor: ClassId) -> bool {
        self.ancestors(class).contains(&ancestor)
    }

    /// Nearest shadow class in the superclass chain, for host-backed classes.
    pub fn shadow_ancestor(&self, class: ClassId) -> Option<ClassId> {
        self.superclass_chain(class)
            .into_iter()
            .find(|id| self.get(*id).map(|n| n.is_shadow()).unwrap_or(false))
    }

    /// Add or override an instance method; `new` goes to the constructors.
    pub fn add_method(&mut self, class: ClassId, entry: Arc<MethodEntry>) -> Result<(), RuntimeError> {
        let node = self.node_mut(class)?;
        let name = entry.name().to_string();
        let overridden = if name == CONSTRUCTOR_NAME {
            node.constructors.add(entry)
        } else {
            node.instance_methods.add(entry)
        };
        debug!(class = %node.name, method = %name, overridden, "defined method");
        Ok(())
    }

    /// Add or override a method on the class object itself.
    pub fn add_class_method(
        &mut self,
        class: ClassId,
        entry: Arc<MethodEntry>,
    ) -> Result<(), RuntimeError> {
        let node = self.node_mut(class)?;
        let name = entry.name().to_string();
        let overridden = node.class_methods.add(entry);
        debug!(class = %node.name, method = %name, overridden, "defined class method");
        Ok(())
    }

    /// Hide `name` at this class only. Absent names are a no-op.
    pub fn undef_method(&mut self, class: ClassId, name: &str) -> Result<usize, RuntimeError> {
        let node = self.node_mut(class)?;
        let changed = instance_or_constructor_table(node, name).undef(name);
        debug!(class = %node.name, method = %name, changed, "undefined method");
        Ok(changed)
    }

    /// Delete `name` at this class only. Absent names are a no-op.
    pub fn remove_method(&mut self, class: ClassId, name: &str) -> Result<usize, RuntimeError> {
        let node = self.node_mut(class)?;
        let removed = instance_or_constructor_table(node, name).remove(name);
        debug!(class = %node.name, method = %name, removed, "removed method");
        Ok(removed)
    }

    /// Install built-in instance methods; used while the runtime boots.
    pub fn install_builtins(&mut self, class: ClassId, entries: Vec<Arc<MethodEntry>>) {
        if let Some(node) = self.nodes.get_mut(class.0 as usize) {
            for entry in entries {
                node.instance_methods.add(entry);
            }
        }
    }

    /// Active instance method names visible through `class`, nearest first.
    pub fn instance_method_names(&self, class: ClassId) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        let mut blocked: Vec<String> = Vec::new();
        for id in self.ancestors(class) {
            if let Some(node) = self.get(id) {
                for name in node.instance_methods.method_names() {
                    if !names.contains(&name) && !blocked.contains(&name) {
                        names.push(name);
                    }
                }
                for name in node.instance_methods.undefined_names() {
                    blocked.push(name);
                }
            }
        }
        names
    }

    /// Built-in class of a plain value; `None` for objects, classes and host values.
    pub fn builtin_class_of(&self, value: &Value) -> Option<ClassId> {
        let b = &self.builtins;
        match value {
            Value::Nil => Some(b.nil),
            Value::Boolean(_) => Some(b.boolean),
            Value::Integer(_) => Some(b.integer),
            Value::Float(_) => Some(b.float),
            Value::String(_) => Some(b.string),
            Value::Symbol(_) => Some(b.symbol),
            Value::Array(_) => Some(b.array),
            Value::Function(_) | Value::Partial(_) => Some(b.proc),
            Value::Object(_) | Value::Class(_) | Value::Foreign(_) => None,
        }
    }
}

fn instance_or_constructor_table<'a>(node: &'a mut ClassNode, name: &str) -> &'a mut MethodTable {
    if name == CONSTRUCTOR_NAME {
        &mut node.constructors
    } else {
        &mut node.instance_methods
    }
}
