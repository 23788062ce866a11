//! Sends, member access and callable values.

use std::sync::Arc;

use tracing::trace;

use crate::runner::api::{renamed_entry, Runtime};
use crate::runner::dispatch::context::CallContext;
use crate::runner::dispatch::operator::{self, Fixity};
use crate::runner::dispatch::partial::PartialApplication;
use crate::runner::dispatch::resolver::{self, MethodOwner, ReceiverShape, ResolvedMethod};
use crate::runner::dispatch::CallSite;
use crate::runner::ds::class::ClassId;
use crate::runner::ds::error::RuntimeError;
use crate::runner::ds::instance::InstanceId;
use crate::runner::ds::method::MethodEntry;
use crate::runner::ds::method_table::TableLookup;
use crate::runner::ds::registry::CONSTRUCTOR_NAME;
use crate::runner::ds::value::Value;
use crate::runner::interop::host::{HostField, HostRef};

impl Runtime {
    /// `receiver.name(args)` at a plain call site.
    pub fn send(&self, receiver: &Value, name: &str, args: Vec<Value>) -> Result<Value, RuntimeError> {
        self.send_with(receiver, name, args, CallSite::plain(self.config().implicit_partial))
    }

    /// `receiver.name(args)` at an explicit partial call site.
    pub fn send_partial(&self, receiver: &Value, name: &str, args: Vec<Value>) -> Result<Value, RuntimeError> {
        self.send_with(receiver, name, args, CallSite::partial())
    }

    pub fn send_with(
        &self,
        receiver: &Value,
        name: &str,
        args: Vec<Value>,
        site: CallSite,
    ) -> Result<Value, RuntimeError> {
        let receiver = self.receiver_of(receiver)?;
        let resolved = self.resolve_for(&receiver, name, args.len(), site.allow_partial, None)?;
        self.dispatch(resolved, receiver, args, site.postfix)
    }

    /// `lhs token rhs`.
    pub fn binary_op(&self, lhs: &Value, token: &str, rhs: Value) -> Result<Value, RuntimeError> {
        let name = operator::binary_method(token)?;
        self.send_with(lhs, &name, vec![rhs], CallSite::strict())
    }

    /// `token operand` or `operand token`. Both fixities reach the same
    /// entry; the body tells them apart with [`CallContext::is_postfix`].
    pub fn unary_op(&self, operand: &Value, token: &str, fixity: Fixity) -> Result<Value, RuntimeError> {
        let name = operator::unary_method(token)?;
        let site = CallSite::strict().with_postfix(fixity == Fixity::Postfix);
        self.send_with(operand, &name, Vec::new(), site)
    }

    /// Call a value: partials complete, functions run unbound, classes
    /// instantiate, objects receive `call`.
    pub fn call_value(&self, callee: &Value, args: Vec<Value>) -> Result<Value, RuntimeError> {
        match callee {
            Value::Partial(partial) => partial.complete(self, args),
            Value::Function(entry) => {
                let arity = entry.arity();
                if arity.accepts(args.len()) {
                    self.invoke_entry(entry.clone(), MethodOwner::Unbound, Value::Nil, args, false)
                } else if arity.accepts_prefix(args.len()) && !args.is_empty() {
                    Ok(Value::Partial(Arc::new(PartialApplication::new(
                        entry.clone(),
                        MethodOwner::Unbound,
                        Value::Nil,
                        args,
                    ))))
                } else {
                    Err(RuntimeError::arity(entry.name(), args.len(), arity.to_string()))
                }
            }
            Value::Class(class) => self.instantiate(*class, args),
            Value::Object(_) | Value::Foreign(_) => self.send(callee, "call", args),
            other => Err(RuntimeError::TypeError(format!(
                "{} is not callable",
                other.type_name()
            ))),
        }
    }

    /// `arg |> callee`.
    pub fn pipe(&self, arg: Value, callee: &Value) -> Result<Value, RuntimeError> {
        self.call_value(callee, vec![arg])
    }

    /// `receiver.name` as an expression.
    ///
    /// Objects check reflected host fields, then methods (a method that needs
    /// arguments reads as a partial application), then instance variables.
    /// Classes check class methods, then nested constants.
    pub fn get_member(&self, receiver: &Value, name: &str) -> Result<Value, RuntimeError> {
        let receiver = self.receiver_of(receiver)?;
        match &receiver {
            Value::Object(id) => {
                if let Some((field, host)) = self.host_field(*id, name)? {
                    return field.read(&host);
                }
                match self.resolve_for(&receiver, name, 0, true, None) {
                    Ok(resolved) => self.dispatch(resolved, receiver.clone(), Vec::new(), false),
                    Err(e) if e.is_dispatch_failure() => {
                        let ivar = self.instance(*id)?.read().ivar(name);
                        Ok(ivar.unwrap_or(Value::Nil))
                    }
                    Err(e) => Err(e),
                }
            }
            Value::Class(class) => match self.resolve_for(&receiver, name, 0, true, None) {
                Ok(resolved) => self.dispatch(resolved, receiver.clone(), Vec::new(), false),
                Err(e) if e.is_dispatch_failure() => self.nested_constant(*class, name),
                Err(e) => Err(e),
            },
            _ => self.send_with(&receiver, name, Vec::new(), CallSite::partial()),
        }
    }

    /// `receiver.name = value`.
    ///
    /// On an object a function value becomes a singleton method, host fields
    /// are written through, and anything else lands in an instance variable.
    /// On a class a function value becomes an instance method and a class
    /// value a nested constant.
    pub fn set_member(&self, receiver: &Value, name: &str, value: Value) -> Result<(), RuntimeError> {
        let receiver = self.receiver_of(receiver)?;
        match (&receiver, value) {
            (Value::Object(_), Value::Function(entry)) => {
                self.define_singleton_method(&receiver, renamed_entry(entry, name))
            }
            (Value::Object(id), value) => {
                if let Some((field, host)) = self.host_field(*id, name)? {
                    return field.write(&host, value);
                }
                self.instance(*id)?.write().set_ivar(name, value);
                Ok(())
            }
            (Value::Class(class), Value::Function(entry)) => {
                self.define_method(*class, renamed_entry(entry, name))
            }
            (Value::Class(class), Value::Class(inner)) => {
                self.classes_mut().bind_constant(Some(*class), name, inner)
            }
            (Value::Class(_), other) => Err(RuntimeError::TypeError(format!(
                "cannot assign a {} to class member '{}'",
                other.type_name(),
                name
            ))),
            (other, _) => Err(RuntimeError::TypeError(format!(
                "cannot set member '{}' on {}",
                name,
                other.type_name()
            ))),
        }
    }

    /// Whether `receiver` would find an active method named `name`.
    pub fn responds_to(&self, receiver: &Value, name: &str) -> Result<bool, RuntimeError> {
        let receiver = self.receiver_of(receiver)?;
        let (shape, singleton) = match &receiver {
            Value::Object(id) => {
                let cell = self.instance(*id)?;
                let object = cell.read();
                let (singleton, detached) = match object.singleton() {
                    Some(s) if s.methods.has_active(name) => (Some(true), false),
                    Some(s) if s.methods.is_undefined(name) => (Some(false), false),
                    Some(s) => (None, s.detached.contains(name)),
                    None => (None, false),
                };
                (
                    ReceiverShape::Instance {
                        class: object.class,
                        singleton: TableLookup::Missing,
                        detached,
                    },
                    singleton,
                )
            }
            other => (self.shape_of(other, name, 0, false)?, None),
        };
        if let Some(answer) = singleton {
            return Ok(answer);
        }
        let classes = self.classes();
        for level in resolver::levels(&classes, &shape) {
            let (class, meta) = match level {
                MethodOwner::Instance(c) => (c, false),
                MethodOwner::Meta(c) => (c, true),
                _ => continue,
            };
            if let Some(node) = classes.get(class) {
                let table = if meta {
                    &node.class_methods
                } else {
                    &node.instance_methods
                };
                if table.has_active(name) {
                    return Ok(true);
                }
                if table.is_undefined(name) {
                    return Ok(false);
                }
            }
        }
        Ok(false)
    }

    pub(crate) fn send_super(
        &self,
        receiver: &Value,
        owner: MethodOwner,
        name: &str,
        args: Vec<Value>,
    ) -> Result<Value, RuntimeError> {
        if let MethodOwner::Constructor(class) = owner {
            return self.constructor_super(receiver, class, args);
        }
        trace!(method = %name, owner = ?owner, "super call");
        let resolved = self.resolve_for(receiver, name, args.len(), false, Some(owner))?;
        self.dispatch(resolved, receiver.clone(), args, false)
    }

    /// `super(args)` inside a constructor: the nearest superclass constructor
    /// accepting the arguments runs against the same instance.
    fn constructor_super(&self, receiver: &Value, class: ClassId, args: Vec<Value>) -> Result<Value, RuntimeError> {
        let found = {
            let classes = self.classes();
            let mut found = None;
            for level in classes.superclass_chain(class).into_iter().skip(1) {
                if let TableLookup::Exact(entry) =
                    classes.node(level)?.constructors.lookup(CONSTRUCTOR_NAME, args.len(), false)
                {
                    found = Some((entry, level));
                    break;
                }
            }
            found
        };
        match found {
            Some((entry, level)) => {
                self.invoke_entry(entry, MethodOwner::Constructor(level), receiver.clone(), args, false)
            }
            // The implicit root constructor takes no arguments and does nothing.
            None if args.is_empty() => Ok(Value::Nil),
            None => Err(RuntimeError::no_method(
                CONSTRUCTOR_NAME,
                args.len(),
                format!("superclass of {}", self.class_name(class)),
            )),
        }
    }

    pub(crate) fn invoke_entry(
        &self,
        entry: Arc<MethodEntry>,
        owner: MethodOwner,
        receiver: Value,
        args: Vec<Value>,
        postfix: bool,
    ) -> Result<Value, RuntimeError> {
        let mut ctx = CallContext::new(self, receiver, owner, entry.name(), postfix);
        entry.body().call(&mut ctx, args)
    }

    fn dispatch(
        &self,
        resolved: ResolvedMethod,
        receiver: Value,
        args: Vec<Value>,
        postfix: bool,
    ) -> Result<Value, RuntimeError> {
        if resolved.partial {
            return Ok(Value::Partial(Arc::new(PartialApplication::new(
                resolved.entry,
                resolved.owner,
                receiver,
                args,
            ))));
        }
        self.invoke_entry(resolved.entry, resolved.owner, receiver, args, postfix)
    }

    fn resolve_for(
        &self,
        receiver: &Value,
        name: &str,
        argc: usize,
        allow_partial: bool,
        after: Option<MethodOwner>,
    ) -> Result<ResolvedMethod, RuntimeError> {
        let shape = self.shape_of(receiver, name, argc, allow_partial)?;
        let classes = self.classes();
        resolver::resolve(&classes, &shape, name, argc, allow_partial, after)
    }

    /// Snapshot the receiver for the resolver. The instance lock is released
    /// before the class registry is read.
    fn shape_of(
        &self,
        receiver: &Value,
        name: &str,
        argc: usize,
        allow_partial: bool,
    ) -> Result<ReceiverShape, RuntimeError> {
        match receiver {
            Value::Object(id) => {
                let cell = self.instance(*id)?;
                let object = cell.read();
                let (singleton, detached) = match object.singleton() {
                    Some(s) => (
                        s.methods.lookup(name, argc, allow_partial),
                        s.detached.contains(name),
                    ),
                    None => (TableLookup::Missing, false),
                };
                Ok(ReceiverShape::Instance {
                    class: object.class,
                    singleton,
                    detached,
                })
            }
            Value::Class(class) => Ok(ReceiverShape::Class(*class)),
            other => {
                let class = self.classes().builtin_class_of(other).ok_or_else(|| {
                    RuntimeError::TypeError(format!("{} cannot receive messages", other.type_name()))
                })?;
                Ok(ReceiverShape::Value(class))
            }
        }
    }

    fn host_field(&self, id: InstanceId, name: &str) -> Result<Option<(HostField, HostRef)>, RuntimeError> {
        let (class, host) = {
            let cell = self.instance(id)?;
            let object = cell.read();
            (object.class, object.host().cloned())
        };
        let host = match host {
            Some(host) => host,
            None => return Ok(None),
        };
        let shadow = self.classes().shadow_ancestor(class);
        let field = match shadow {
            Some(shadow) => self.boxes().field(shadow, name),
            None => None,
        };
        Ok(field.map(|f| (f, host)))
    }

    fn nested_constant(&self, class: ClassId, name: &str) -> Result<Value, RuntimeError> {
        let classes = self.classes();
        match classes.node(class)?.constants.get(name) {
            Some(inner) => Ok(Value::Class(*inner)),
            None => Err(RuntimeError::NameError {
                name: format!("{}::{}", classes.name_of(class), name),
            }),
        }
    }
}
