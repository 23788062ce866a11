use std::any::TypeId;
use std::fmt;

use rustc_hash::FxHashMap;

use crate::runner::ds::method_table::MethodTable;

/// Arena index of a class or module.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(pub u32);

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassKind {
    Class,
    /// Never instantiated, no superclass; only reachable through inclusion.
    Module,
    /// Stand-in class for a boxed host type.
    Shadow(TypeId),
}

/// A class or module.
#[derive(Debug, Clone)]
pub struct ClassNode {
    pub id: ClassId,
    pub name: String,
    pub kind: ClassKind,
    pub superclass: Option<ClassId>,
    /// In inclusion order; the resolver walks it backwards.
    pub included_modules: Vec<ClassId>,
    pub instance_methods: MethodTable,
    /// Methods invoked on the class itself.
    pub class_methods: MethodTable,
    /// `new` definitions, run against a fresh instance.
    pub constructors: MethodTable,
    /// Nested classes and modules defined inside this one.
    pub constants: FxHashMap<String, ClassId>,
    /// Lexically enclosing class or module; `None` at top level.
    pub namespace: Option<ClassId>,
}

impl ClassNode {
    pub fn new(
        id: ClassId,
        name: impl Into<String>,
        kind: ClassKind,
        superclass: Option<ClassId>,
        namespace: Option<ClassId>,
    ) -> Self {
        ClassNode {
            id,
            name: name.into(),
            kind,
            superclass,
            included_modules: Vec::new(),
            instance_methods: MethodTable::new(),
            class_methods: MethodTable::new(),
            constructors: MethodTable::new(),
            constants: FxHashMap::default(),
            namespace,
        }
    }

    pub fn is_module(&self) -> bool {
        self.kind == ClassKind::Module
    }

    pub fn is_shadow(&self) -> bool {
        matches!(self.kind, ClassKind::Shadow(_))
    }

    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            ClassKind::Class => "class",
            ClassKind::Module => "module",
            ClassKind::Shadow(_) => "host class",
        }
    }
}
