//! Method resolution.
//!
//! The resolver is a pure function of the class registry and a snapshot of the
//! receiver. It builds the ordered list of levels to search for a receiver
//! and walks it, stopping at the first table with something to say.
//!
//! ```text
//! instance:  singleton -> class -> mixins (newest first) -> superclass -> ...
//! class:     class-level tables up the superclass chain -> instance chain of `Class`
//! value:     instance chain of its built-in class
//! ```

use std::sync::Arc;

use tracing::trace;

use crate::runner::ds::class::ClassId;
use crate::runner::ds::error::RuntimeError;
use crate::runner::ds::method::{Arity, MethodEntry};
use crate::runner::ds::method_table::TableLookup;
use crate::runner::ds::registry::ClassRegistry;

/// The level a method was found at. A running method remembers it so that
/// `super` can resume the search just past it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodOwner {
    /// The receiver's own singleton table.
    Singleton,
    /// Instance table of a class or module.
    Instance(ClassId),
    /// Class-level table of a class.
    Meta(ClassId),
    /// Constructor table of a class; `super` continues with the
    /// superclass constructors.
    Constructor(ClassId),
    /// A bare function value called without a receiver.
    Unbound,
}

/// What the resolver needs to know about a receiver.
#[derive(Debug, Clone)]
pub enum ReceiverShape {
    Instance {
        class: ClassId,
        /// The singleton table's answer for the name being resolved.
        singleton: TableLookup,
        /// The instance removed the name from its own class level.
        detached: bool,
    },
    Class(ClassId),
    /// A plain value resolved through its built-in class.
    Value(ClassId),
}

#[derive(Debug, Clone)]
pub struct ResolvedMethod {
    pub entry: Arc<MethodEntry>,
    pub owner: MethodOwner,
    /// Fewer arguments than the entry needs; the call binds a prefix.
    pub partial: bool,
}

/// Search levels for `shape`, nearest first.
pub fn levels(registry: &ClassRegistry, shape: &ReceiverShape) -> Vec<MethodOwner> {
    match shape {
        ReceiverShape::Instance {
            class, detached, ..
        } => {
            let mut out = vec![MethodOwner::Singleton];
            out.extend(
                registry
                    .ancestors(*class)
                    .into_iter()
                    .filter(|c| !(*detached && c == class))
                    .map(MethodOwner::Instance),
            );
            out
        }
        ReceiverShape::Class(class) => {
            let mut out: Vec<MethodOwner> = registry
                .superclass_chain(*class)
                .into_iter()
                .map(MethodOwner::Meta)
                .collect();
            out.extend(
                registry
                    .ancestors(registry.builtins().class)
                    .into_iter()
                    .map(MethodOwner::Instance),
            );
            out
        }
        ReceiverShape::Value(class) => registry
            .ancestors(*class)
            .into_iter()
            .map(MethodOwner::Instance)
            .collect(),
    }
}

/// Human readable receiver description for error messages.
pub fn describe_receiver(registry: &ClassRegistry, shape: &ReceiverShape) -> String {
    match shape {
        ReceiverShape::Instance { class, .. } => {
            format!("an instance of {}", registry.name_of(*class))
        }
        ReceiverShape::Class(class) => {
            let kind = registry.get(*class).map(|n| n.kind_name()).unwrap_or("class");
            format!("{} {}", kind, registry.name_of(*class))
        }
        ReceiverShape::Value(class) => format!("a {} value", registry.name_of(*class)),
    }
}

fn lookup_at(
    registry: &ClassRegistry,
    shape: &ReceiverShape,
    level: MethodOwner,
    name: &str,
    argc: usize,
    allow_partial: bool,
) -> TableLookup {
    match level {
        MethodOwner::Singleton => match shape {
            ReceiverShape::Instance { singleton, .. } => singleton.clone(),
            _ => TableLookup::Missing,
        },
        MethodOwner::Instance(c) => registry
            .get(c)
            .map(|n| n.instance_methods.lookup(name, argc, allow_partial))
            .unwrap_or(TableLookup::Missing),
        MethodOwner::Meta(c) => registry
            .get(c)
            .map(|n| n.class_methods.lookup(name, argc, allow_partial))
            .unwrap_or(TableLookup::Missing),
        MethodOwner::Constructor(_) | MethodOwner::Unbound => TableLookup::Missing,
    }
}

/// Resolve `name` for `argc` arguments.
///
/// With `after` set, the search starts at the level following it; this is
/// how `super` continues from the level defining the running method.
pub fn resolve(
    registry: &ClassRegistry,
    shape: &ReceiverShape,
    name: &str,
    argc: usize,
    allow_partial: bool,
    after: Option<MethodOwner>,
) -> Result<ResolvedMethod, RuntimeError> {
    let levels = levels(registry, shape);
    let start = match after {
        None => 0,
        Some(owner) => match levels.iter().position(|l| *l == owner) {
            Some(pos) => pos + 1,
            None => {
                return Err(RuntimeError::no_method(
                    name,
                    argc,
                    format!("super of {}", describe_receiver(registry, shape)),
                ))
            }
        },
    };

    let mut mismatched: Vec<Arity> = Vec::new();
    for level in &levels[start..] {
        match lookup_at(registry, shape, *level, name, argc, allow_partial) {
            TableLookup::Exact(entry) => {
                trace!(method = %name, argc, level = ?level, "resolved method");
                return Ok(ResolvedMethod {
                    entry,
                    owner: *level,
                    partial: false,
                });
            }
            TableLookup::Partial(entry) => {
                trace!(method = %name, argc, level = ?level, "resolved partial application");
                return Ok(ResolvedMethod {
                    entry,
                    owner: *level,
                    partial: true,
                });
            }
            TableLookup::Blocked => {
                trace!(method = %name, level = ?level, "lookup stopped at undefined method");
                return Err(RuntimeError::no_method(
                    name,
                    argc,
                    describe_receiver(registry, shape),
                ));
            }
            TableLookup::Mismatch(arities) => mismatched.extend(arities),
            TableLookup::Missing => {}
        }
    }

    if mismatched.is_empty() {
        Err(RuntimeError::no_method(
            name,
            argc,
            describe_receiver(registry, shape),
        ))
    } else {
        let expected: Vec<String> = mismatched.iter().map(|a| a.to_string()).collect();
        Err(RuntimeError::arity(name, argc, expected.join(" or ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::ds::value::Value;

    fn entry(name: &str, arity: usize, result: i64) -> Arc<MethodEntry> {
        MethodEntry::closure(name, arity, move |_, _| Ok(Value::Integer(result)))
    }

    fn instance(class: ClassId) -> ReceiverShape {
        ReceiverShape::Instance {
            class,
            singleton: TableLookup::Missing,
            detached: false,
        }
    }

    #[test]
    fn test_subclass_overrides_superclass() {
        let mut reg = ClassRegistry::new("Object");
        let base = reg.define_class("Base", None, None).unwrap();
        let sub = reg.define_class("Sub", Some(base), None).unwrap();
        reg.add_method(base, entry("print", 0, 1)).unwrap();
        reg.add_method(sub, entry("print", 0, 2)).unwrap();

        let found = resolve(&reg, &instance(sub), "print", 0, false, None).unwrap();
        assert_eq!(found.owner, MethodOwner::Instance(sub));

        let above = resolve(
            &reg,
            &instance(sub),
            "print",
            0,
            false,
            Some(MethodOwner::Instance(sub)),
        )
        .unwrap();
        assert_eq!(above.owner, MethodOwner::Instance(base));
    }

    #[test]
    fn test_undef_blocks_but_remove_exposes() {
        let mut reg = ClassRegistry::new("Object");
        let base = reg.define_class("Base", None, None).unwrap();
        let sub = reg.define_class("Sub", Some(base), None).unwrap();
        reg.add_method(base, entry("test", 0, 25)).unwrap();
        reg.add_method(sub, entry("test", 0, 50)).unwrap();

        reg.undef_method(sub, "test").unwrap();
        assert!(matches!(
            resolve(&reg, &instance(sub), "test", 0, false, None),
            Err(RuntimeError::NoMethodError { .. })
        ));

        reg.remove_method(sub, "test").unwrap();
        let found = resolve(&reg, &instance(sub), "test", 0, false, None).unwrap();
        assert_eq!(found.owner, MethodOwner::Instance(base));
    }

    #[test]
    fn test_mixins_come_before_superclass() {
        let mut reg = ClassRegistry::new("Object");
        let base = reg.define_class("Base", None, None).unwrap();
        let sub = reg.define_class("Sub", Some(base), None).unwrap();
        let module = reg.define_module("Helper", None).unwrap();
        reg.add_method(base, entry("help", 1, 1)).unwrap();
        reg.add_method(module, entry("help", 1, 2)).unwrap();
        reg.include_module(sub, module).unwrap();

        let found = resolve(&reg, &instance(sub), "help", 1, false, None).unwrap();
        assert_eq!(found.owner, MethodOwner::Instance(module));
    }

    #[test]
    fn test_arity_mismatch_reports_arity_error() {
        let mut reg = ClassRegistry::new("Object");
        let class = reg.define_class("Test", None, None).unwrap();
        reg.add_method(class, entry("test", 2, 0)).unwrap();
        assert!(matches!(
            resolve(&reg, &instance(class), "test", 3, true, None),
            Err(RuntimeError::ArityError { .. })
        ));
        let partial = resolve(&reg, &instance(class), "test", 1, true, None).unwrap();
        assert!(partial.partial);
    }

    #[test]
    fn test_detached_instance_skips_own_class() {
        let mut reg = ClassRegistry::new("Object");
        let base = reg.define_class("Base", None, None).unwrap();
        let sub = reg.define_class("Sub", Some(base), None).unwrap();
        reg.add_method(base, entry("test", 0, 0)).unwrap();
        reg.add_method(sub, entry("test", 0, 25)).unwrap();
        let shape = ReceiverShape::Instance {
            class: sub,
            singleton: TableLookup::Missing,
            detached: true,
        };
        let found = resolve(&reg, &shape, "test", 0, false, None).unwrap();
        assert_eq!(found.owner, MethodOwner::Instance(base));
    }

    #[test]
    fn test_class_receivers_reach_class_builtins() {
        let mut reg = ClassRegistry::new("Object");
        let class_class = reg.builtins().class;
        reg.add_method(class_class, entry("name", 0, 0)).unwrap();
        let base = reg.define_class("Base", None, None).unwrap();
        let sub = reg.define_class("Sub", Some(base), None).unwrap();
        reg.add_class_method(base, entry("create", 0, 0)).unwrap();

        let shape = ReceiverShape::Class(sub);
        let found = resolve(&reg, &shape, "create", 0, false, None).unwrap();
        assert_eq!(found.owner, MethodOwner::Meta(base));
        let found = resolve(&reg, &shape, "name", 0, false, None).unwrap();
        assert_eq!(found.owner, MethodOwner::Instance(class_class));
    }
}
