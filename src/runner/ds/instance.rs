use rustc_hash::{FxHashMap, FxHashSet};

use crate::runner::ds::class::ClassId;
use crate::runner::ds::method_table::MethodTable;
use crate::runner::ds::value::Value;
use crate::runner::interop::host::HostRef;

/// Arena index of an object instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(pub u32);

/// Per-instance method table, allocated on the first singleton definition.
#[derive(Debug, Clone, Default)]
pub struct SingletonTable {
    pub methods: MethodTable,
    /// Names this instance no longer sees at its own class level; lookup for
    /// them continues with the class's mixins and superclass.
    pub detached: FxHashSet<String>,
}

impl SingletonTable {
    pub fn new() -> Self {
        SingletonTable::default()
    }
}

/// Receiver state of a dynamic object.
#[derive(Debug, Clone)]
pub struct ObjectInstance {
    pub id: InstanceId,
    pub class: ClassId,
    ivars: FxHashMap<String, Value>,
    singleton: Option<SingletonTable>,
    /// Backing host value for boxed objects.
    host: Option<HostRef>,
}

fn ivar_key(name: &str) -> &str {
    name.trim_start_matches('@')
}

impl ObjectInstance {
    pub fn new(id: InstanceId, class: ClassId) -> Self {
        ObjectInstance {
            id,
            class,
            ivars: FxHashMap::default(),
            singleton: None,
            host: None,
        }
    }

    pub fn with_host(mut self, host: HostRef) -> Self {
        self.host = Some(host);
        self
    }

    /// Reads `@name`; an unset ivar reads as `None`.
    pub fn ivar(&self, name: &str) -> Option<Value> {
        self.ivars.get(ivar_key(name)).cloned()
    }

    pub fn set_ivar(&mut self, name: &str, value: Value) {
        self.ivars.insert(ivar_key(name).to_string(), value);
    }

    pub fn has_ivar(&self, name: &str) -> bool {
        self.ivars.contains_key(ivar_key(name))
    }

    pub fn ivar_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.ivars.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn singleton(&self) -> Option<&SingletonTable> {
        self.singleton.as_ref()
    }

    /// The singleton table, created if absent.
    pub fn singleton_mut(&mut self) -> &mut SingletonTable {
        self.singleton.get_or_insert_with(SingletonTable::new)
    }

    pub fn existing_singleton_mut(&mut self) -> Option<&mut SingletonTable> {
        self.singleton.as_mut()
    }

    pub fn host(&self) -> Option<&HostRef> {
        self.host.as_ref()
    }
}
