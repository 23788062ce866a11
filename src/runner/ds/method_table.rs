//! Method tables: name → overload set, with undef tombstones.
//!
//! A table never consults any other table. Inheritance is the resolver's
//! business; the table only answers "what does *this* level say about `name`".

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::runner::ds::method::{Arity, MethodEntry};

/// Visibility of a slot. A missing slot is "absent".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Active,
    /// Hidden by `undef_method`; blocks inherited lookup at this level.
    Undefined,
}

/// One overload of a name, plus whether it has been undefined.
#[derive(Debug, Clone)]
pub struct MethodSlot {
    pub entry: Arc<MethodEntry>,
    pub visibility: Visibility,
}

impl MethodSlot {
    pub fn arity(&self) -> Arity {
        self.entry.arity()
    }

    /// False once `undef` has hidden this overload.
    pub fn is_active(&self) -> bool {
        self.visibility == Visibility::Active
    }
}

/// What one table says about a name for a given argument count.
#[derive(Debug, Clone)]
pub enum TableLookup {
    /// An active entry accepting the argument count.
    Exact(Arc<MethodEntry>),
    /// An active entry that can bind the arguments as a prefix.
    Partial(Arc<MethodEntry>),
    /// The name is undefined here; lookup must stop.
    Blocked,
    /// Active entries exist but none fits the argument count.
    Mismatch(Vec<Arity>),
    Missing,
}

/// Per-class (or per-singleton) map from name to its arity overloads.
#[derive(Debug, Clone, Default)]
pub struct MethodTable {
    slots: FxHashMap<String, Vec<MethodSlot>>,
    /// Names in first-definition order.
    order: Vec<String>,
}

impl MethodTable {
    pub fn new() -> Self {
        MethodTable::default()
    }

    /// Insert or replace the slot for `(name, arity)`, marking it active.
    ///
    /// Returns true when an existing slot was overridden or reactivated.
    pub fn add(&mut self, entry: Arc<MethodEntry>) -> bool {
        let name = entry.name().to_string();
        let arity = entry.arity();
        match self.slots.get_mut(&name) {
            Some(overloads) => {
                if let Some(slot) = overloads.iter_mut().find(|s| s.arity() == arity) {
                    slot.entry = entry;
                    slot.visibility = Visibility::Active;
                    return true;
                }
                overloads.push(MethodSlot {
                    entry,
                    visibility: Visibility::Active,
                });
                false
            }
            None => {
                self.order.push(name.clone());
                self.slots.insert(
                    name,
                    vec![MethodSlot {
                        entry,
                        visibility: Visibility::Active,
                    }],
                );
                false
            }
        }
    }

    /// Mark every overload of `name` undefined. Returns how many slots changed.
    pub fn undef(&mut self, name: &str) -> usize {
        match self.slots.get_mut(name) {
            None => 0,
            Some(overloads) => {
                let mut changed = 0;
                for slot in overloads.iter_mut() {
                    if slot.visibility == Visibility::Active {
                        slot.visibility = Visibility::Undefined;
                        changed += 1;
                    }
                }
                changed
            }
        }
    }

    /// Delete every overload of `name`. Returns how many slots were removed.
    pub fn remove(&mut self, name: &str) -> usize {
        match self.slots.remove(name) {
            None => 0,
            Some(overloads) => {
                self.order.retain(|n| n != name);
                overloads.len()
            }
        }
    }

    /// What this table says about `name` called with `argc` arguments.
    ///
    /// A fixed arity equal to `argc` wins over a variadic overload whatever
    /// the definition order; among variadic overloads the one with the most
    /// required arguments wins. Partial binding is considered only when
    /// nothing accepts `argc` outright.
    pub fn lookup(&self, name: &str, argc: usize, allow_partial: bool) -> TableLookup {
        let overloads = match self.slots.get(name) {
            None => return TableLookup::Missing,
            Some(o) => o,
        };

        let fixed = overloads
            .iter()
            .find(|s| s.is_active() && s.arity() == Arity::Fixed(argc));
        if let Some(slot) = fixed {
            return TableLookup::Exact(slot.entry.clone());
        }

        let variadic = overloads
            .iter()
            .filter(|s| s.is_active() && matches!(s.arity(), Arity::AtLeast(_)))
            .filter(|s| s.arity().accepts(argc))
            .max_by_key(|s| s.arity().required());
        if let Some(slot) = variadic {
            return TableLookup::Exact(slot.entry.clone());
        }

        if allow_partial {
            let partial = overloads
                .iter()
                .filter(|s| s.is_active() && s.arity().accepts_prefix(argc))
                .min_by_key(|s| s.arity().required());
            if let Some(slot) = partial {
                return TableLookup::Partial(slot.entry.clone());
            }
        }

        if overloads.iter().any(|s| !s.is_active()) {
            return TableLookup::Blocked;
        }

        TableLookup::Mismatch(overloads.iter().map(|s| s.arity()).collect())
    }

    /// Every slot for `name`, undefined ones included.
    pub fn get(&self, name: &str) -> Option<&[MethodSlot]> {
        self.slots.get(name).map(|v| v.as_slice())
    }

    /// Whether any overload of `name` is callable from this table.
    pub fn has_active(&self, name: &str) -> bool {
        self.slots
            .get(name)
            .map(|o| o.iter().any(|s| s.is_active()))
            .unwrap_or(false)
    }

    /// True when `name` has slots and all of them are undefined, which stops
    /// lookup from reaching ancestors.
    pub fn is_undefined(&self, name: &str) -> bool {
        self.slots
            .get(name)
            .map(|o| !o.is_empty() && o.iter().all(|s| !s.is_active()))
            .unwrap_or(false)
    }

    /// Names with at least one active overload, in definition order.
    pub fn method_names(&self) -> Vec<String> {
        self.order
            .iter()
            .filter(|n| self.has_active(n))
            .cloned()
            .collect()
    }

    /// Names whose every overload is undefined.
    pub fn undefined_names(&self) -> Vec<String> {
        self.order
            .iter()
            .filter(|n| self.is_undefined(n))
            .cloned()
            .collect()
    }

    /// Number of distinct names, undefined ones included.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
