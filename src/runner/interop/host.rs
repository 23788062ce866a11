//! Host reflection: how a Rust type describes itself to the object runtime.
//!
//! A host type implements [`Reflect`] and returns a [`HostTypeInfo`] listing
//! the methods, fields and constructor the runtime may expose. Each member
//! carries an [`ExportPolicy`] deciding whether, and under which name, it shows
//! up on the shadow class.

use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::runner::ds::error::RuntimeError;
use crate::runner::ds::method::Arity;
use crate::runner::ds::value::Value;

/// Implemented by host types that can be boxed.
pub trait Reflect: Any + Send + Sync + Sized {
    fn reflect() -> HostTypeInfo;
}

/// Member-level export directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportPolicy {
    /// Exported under its own name when public.
    Default,
    /// Exported under the given name, even when hidden.
    Renamed(String),
    NotExported,
}

/// Type-level export directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeExport {
    Default,
    Renamed(String),
    NotExported,
}

pub type HostMethodFn = dyn Fn(&HostRef, Vec<Value>) -> Result<Value, RuntimeError> + Send + Sync;
pub type HostGetterFn = dyn Fn(&HostRef) -> Result<Value, RuntimeError> + Send + Sync;
pub type HostSetterFn = dyn Fn(&HostRef, Value) -> Result<(), RuntimeError> + Send + Sync;
pub type HostConstructorFn = dyn Fn(Vec<Value>) -> Result<HostRef, RuntimeError> + Send + Sync;

/// Accessors for a reflected field.
#[derive(Clone)]
pub struct HostField {
    pub(crate) get: Arc<HostGetterFn>,
    pub(crate) set: Option<Arc<HostSetterFn>>,
}

impl HostField {
    pub fn read(&self, host: &HostRef) -> Result<Value, RuntimeError> {
        (self.get)(host)
    }

    pub fn write(&self, host: &HostRef, value: Value) -> Result<(), RuntimeError> {
        match &self.set {
            Some(set) => set(host, value),
            None => Err(RuntimeError::HostError(format!(
                "field of {} is read-only",
                host.type_name()
            ))),
        }
    }

    pub fn is_writable(&self) -> bool {
        self.set.is_some()
    }
}

#[derive(Clone)]
pub enum HostMemberKind {
    Method { arity: Arity, call: Arc<HostMethodFn> },
    Field(HostField),
}

/// One reflected member.
#[derive(Clone)]
pub struct HostMember {
    name: String,
    /// Non-public members are only exported through an explicit rename.
    hidden: bool,
    policy: ExportPolicy,
    kind: HostMemberKind,
}

impl HostMember {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn export_policy(&self) -> ExportPolicy {
        self.policy.clone()
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn kind(&self) -> &HostMemberKind {
        &self.kind
    }

    /// Name on the shadow class, or `None` when the member stays hidden.
    pub fn exported_name(&self) -> Option<String> {
        match &self.policy {
            ExportPolicy::NotExported => None,
            ExportPolicy::Renamed(name) => Some(name.to_string()),
            ExportPolicy::Default if self.hidden => None,
            ExportPolicy::Default => Some(self.name.to_string()),
        }
    }
}

impl fmt::Debug for HostMember {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            HostMemberKind::Method { .. } => "method",
            HostMemberKind::Field(_) => "field",
        };
        write!(f, "HostMember({} {}, {:?})", kind, self.name, self.policy)
    }
}

/// Host constructor for instantiable shadow classes.
#[derive(Clone)]
pub struct HostConstructor {
    pub arity: Arity,
    pub(crate) build: Arc<HostConstructorFn>,
}

impl HostConstructor {
    pub fn construct(&self, args: Vec<Value>) -> Result<HostRef, RuntimeError> {
        (self.build)(args)
    }
}

/// Reflection data for one host type.
#[derive(Clone)]
pub struct HostTypeInfo {
    type_id: TypeId,
    type_name: &'static str,
    export: TypeExport,
    members: Vec<HostMember>,
    constructor: Option<HostConstructor>,
}

impl HostTypeInfo {
    pub fn of<T: Reflect>() -> HostTypeBuilder<T> {
        HostTypeBuilder {
            info: HostTypeInfo {
                type_id: TypeId::of::<T>(),
                type_name: type_name::<T>(),
                export: TypeExport::Default,
                members: Vec::new(),
                constructor: None,
            },
            _marker: PhantomData,
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn export(&self) -> &TypeExport {
        &self.export
    }

    pub fn members(&self) -> &[HostMember] {
        &self.members
    }

    pub fn constructor(&self) -> Option<&HostConstructor> {
        self.constructor.as_ref()
    }

    /// Class name for the shadow class: the type-level rename, or the last
    /// path segment of the Rust type name without generics.
    pub fn class_name(&self) -> Option<String> {
        match &self.export {
            TypeExport::NotExported => None,
            TypeExport::Renamed(name) => Some(name.to_string()),
            TypeExport::Default => Some(short_type_name(self.type_name).to_string()),
        }
    }
}

impl fmt::Debug for HostTypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostTypeInfo")
            .field("type_name", &self.type_name)
            .field("export", &self.export)
            .field("members", &self.members)
            .field("constructor", &self.constructor.is_some())
            .finish()
    }
}

fn short_type_name(full: &'static str) -> &'static str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// Typed builder; every accessor closure receives `&T`.
pub struct HostTypeBuilder<T> {
    info: HostTypeInfo,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Reflect> HostTypeBuilder<T> {
    /// Export the type under another class name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.info.export = TypeExport::Renamed(name.into());
        self
    }

    /// Mark the whole type as not boxable.
    pub fn not_exported(mut self) -> Self {
        self.info.export = TypeExport::NotExported;
        self
    }

    pub fn add_method<F>(self, name: impl Into<String>, arity: usize, f: F) -> Self
    where
        F: Fn(&T, Vec<Value>) -> Result<Value, RuntimeError> + Send + Sync + 'static,
    {
        self.push_method(name.into(), Arity::Fixed(arity), f)
    }

    pub fn add_variadic_method<F>(self, name: impl Into<String>, required: usize, f: F) -> Self
    where
        F: Fn(&T, Vec<Value>) -> Result<Value, RuntimeError> + Send + Sync + 'static,
    {
        self.push_method(name.into(), Arity::AtLeast(required), f)
    }

    fn push_method<F>(mut self, name: String, arity: Arity, f: F) -> Self
    where
        F: Fn(&T, Vec<Value>) -> Result<Value, RuntimeError> + Send + Sync + 'static,
    {
        let call: Arc<HostMethodFn> = Arc::new(
            move |host: &HostRef, args: Vec<Value>| -> Result<Value, RuntimeError> {
                f(downcast::<T>(host)?, args)
            },
        );
        self.info.members.push(HostMember {
            name,
            hidden: false,
            policy: ExportPolicy::Default,
            kind: HostMemberKind::Method { arity, call },
        });
        self
    }

    pub fn add_field<G, S>(mut self, name: impl Into<String>, get: G, set: S) -> Self
    where
        G: Fn(&T) -> Value + Send + Sync + 'static,
        S: Fn(&T, Value) -> Result<(), RuntimeError> + Send + Sync + 'static,
    {
        let get: Arc<HostGetterFn> =
            Arc::new(move |host: &HostRef| -> Result<Value, RuntimeError> {
                Ok(get(downcast::<T>(host)?))
            });
        let set: Arc<HostSetterFn> =
            Arc::new(move |host: &HostRef, value: Value| -> Result<(), RuntimeError> {
                set(downcast::<T>(host)?, value)
            });
        self.info.members.push(HostMember {
            name: name.into(),
            hidden: false,
            policy: ExportPolicy::Default,
            kind: HostMemberKind::Field(HostField {
                get,
                set: Some(set),
            }),
        });
        self
    }

    pub fn add_readonly_field<G>(mut self, name: impl Into<String>, get: G) -> Self
    where
        G: Fn(&T) -> Value + Send + Sync + 'static,
    {
        let get: Arc<HostGetterFn> =
            Arc::new(move |host: &HostRef| -> Result<Value, RuntimeError> {
                Ok(get(downcast::<T>(host)?))
            });
        self.info.members.push(HostMember {
            name: name.into(),
            hidden: false,
            policy: ExportPolicy::Default,
            kind: HostMemberKind::Field(HostField { get, set: None }),
        });
        self
    }

    /// Mark the most recently added member as non-public.
    pub fn hidden(mut self) -> Self {
        if let Some(member) = self.info.members.last_mut() {
            member.hidden = true;
        }
        self
    }

    /// Export the most recently added member under `name`.
    pub fn export_as(mut self, name: impl Into<String>) -> Self {
        if let Some(member) = self.info.members.last_mut() {
            member.policy = ExportPolicy::Renamed(name.into());
        }
        self
    }

    /// Keep the most recently added member off the shadow class.
    pub fn do_not_export(mut self) -> Self {
        if let Some(member) = self.info.members.last_mut() {
            member.policy = ExportPolicy::NotExported;
        }
        self
    }

    pub fn with_constructor<F>(mut self, arity: usize, f: F) -> Self
    where
        F: Fn(Vec<Value>) -> Result<T, RuntimeError> + Send + Sync + 'static,
    {
        self.info.constructor = Some(HostConstructor {
            arity: Arity::Fixed(arity),
            build: Arc::new(move |args: Vec<Value>| -> Result<HostRef, RuntimeError> {
                Ok(HostRef::new(f(args)?))
            }),
        });
        self
    }

    pub fn build(self) -> HostTypeInfo {
        self.info
    }
}

fn downcast<T: Any>(host: &HostRef) -> Result<&T, RuntimeError> {
    host.downcast_ref::<T>().ok_or_else(|| {
        RuntimeError::HostError(format!(
            "expected {}, found {}",
            type_name::<T>(),
            host.type_name()
        ))
    })
}

/// Shared handle to a host value. Identity is the address of the shared
/// allocation, never value equality.
#[derive(Clone)]
pub struct HostRef {
    value: Arc<dyn Any + Send + Sync>,
    type_id: TypeId,
    type_name: &'static str,
    describe: fn() -> Option<HostTypeInfo>,
}

fn describe_reflected<T: Reflect>() -> Option<HostTypeInfo> {
    Some(T::reflect())
}

fn describe_opaque() -> Option<HostTypeInfo> {
    None
}

impl HostRef {
    pub fn new<T: Reflect>(value: T) -> Self {
        Self::from_arc(Arc::new(value))
    }

    /// Wrap a value the host keeps its own handle to.
    pub fn from_arc<T: Reflect>(value: Arc<T>) -> Self {
        HostRef {
            value,
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
            describe: describe_reflected::<T>,
        }
    }

    /// A host value without reflection data. It can be passed around but
    /// not boxed.
    pub fn opaque<T: Any + Send + Sync>(value: T) -> Self {
        HostRef {
            value: Arc::new(value),
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
            describe: describe_opaque,
        }
    }

    pub fn identity(&self) -> usize {
        Arc::as_ptr(&self.value) as *const () as usize
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn describe(&self) -> Option<HostTypeInfo> {
        (self.describe)()
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }
}

impl fmt::Debug for HostRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HostRef({} @ {:#x})", self.type_name, self.identity())
    }
}
