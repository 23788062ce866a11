//! Identity-keyed registry of boxed host values.
//!
//! Boxing gives a host value a dynamic object: an [`ObjectInstance`] of the
//! shadow class for its Rust type, carrying ivars and singleton methods of its
//! own. The registry guarantees one box per host allocation and one shadow
//! class per host type.
//!
//! [`ObjectInstance`]: crate::runner::ds::instance::ObjectInstance

use std::any::TypeId;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::runner::dispatch::context::CallContext;
use crate::runner::ds::class::ClassId;
use crate::runner::ds::error::RuntimeError;
use crate::runner::ds::instance::InstanceId;
use crate::runner::ds::method::{MethodBody, MethodEntry};
use crate::runner::ds::registry::ClassRegistry;
use crate::runner::ds::value::Value;
use crate::runner::interop::host::{HostConstructor, HostField, HostMemberKind, HostRef, HostTypeInfo};

#[derive(Debug, Clone)]
struct BoxEntry {
    class: ClassId,
    instance: InstanceId,
    /// Keeps the allocation, and with it the identity key, alive.
    _host: HostRef,
}

#[derive(Default)]
pub struct BoxRegistry {
    boxes: FxHashMap<usize, BoxEntry>,
    shadows: FxHashMap<TypeId, ClassId>,
    fields: FxHashMap<ClassId, FxHashMap<String, HostField>>,
    constructors: FxHashMap<ClassId, HostConstructor>,
}

impl BoxRegistry {
    pub fn new() -> Self {
        BoxRegistry::default()
    }

    /// Existing box for a host identity.
    pub fn lookup(&self, identity: usize) -> Option<(ClassId, InstanceId)> {
        self.boxes.get(&identity).map(|e| (e.class, e.instance))
    }

    pub fn shadow_class(&self, type_id: TypeId) -> Option<ClassId> {
        self.shadows.get(&type_id).copied()
    }

    /// Create the shadow class for `info` and reflect its exported members.
    ///
    /// Fails before touching the class registry when the type is not exported.
    pub fn install_shadow(
        &mut self,
        classes: &mut ClassRegistry,
        info: &HostTypeInfo,
    ) -> Result<ClassId, RuntimeError> {
        if let Some(existing) = self.shadows.get(&info.type_id()) {
            return Ok(*existing);
        }
        let name = info
            .class_name()
            .ok_or_else(|| RuntimeError::UnboxableTypeError {
                type_name: info.type_name().to_string(),
            })?;

        let class = classes.create_shadow(&name, info.type_id());
        let mut fields = FxHashMap::default();
        for member in info.members() {
            let exported = match member.exported_name() {
                Some(n) => n,
                None => {
                    debug!(class = %name, member = %member.name(), "member not exported");
                    continue;
                }
            };
            match member.kind() {
                HostMemberKind::Method { arity, call } => {
                    let call = call.clone();
                    let entry = MethodEntry::new(
                        exported,
                        *arity,
                        MethodBody::Closure(Arc::new(
                            move |ctx: &mut CallContext<'_>, args: Vec<Value>| -> Result<Value, RuntimeError> {
                                let host = ctx.host()?;
                                call(&host, args)
                            },
                        )),
                    );
                    classes.add_method(class, entry)?;
                }
                HostMemberKind::Field(field) => {
                    fields.insert(exported, field.clone());
                }
            }
        }
        self.fields.insert(class, fields);
        if let Some(ctor) = info.constructor() {
            self.constructors.insert(class, ctor.clone());
        }
        self.shadows.insert(info.type_id(), class);
        debug!(class = %name, id = class.0, host_type = info.type_name(), "reflected host type");
        Ok(class)
    }

    pub fn register(&mut self, host: HostRef, class: ClassId, instance: InstanceId) {
        let identity = host.identity();
        self.boxes.insert(
            identity,
            BoxEntry {
                class,
                instance,
                _host: host,
            },
        );
        debug!(identity, class = class.0, instance = instance.0, "boxed host value");
    }

    pub fn field(&self, shadow: ClassId, name: &str) -> Option<HostField> {
        self.fields.get(&shadow).and_then(|f| f.get(name)).cloned()
    }

    pub fn constructor(&self, shadow: ClassId) -> Option<HostConstructor> {
        self.constructors.get(&shadow).cloned()
    }

    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }
}
