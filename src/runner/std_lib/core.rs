//! Core built-ins registration.

use std::sync::Arc;

use crate::runner::dispatch::context::CallContext;
use crate::runner::ds::error::RuntimeError;
use crate::runner::ds::method::MethodEntry;
use crate::runner::ds::registry::ClassRegistry;
use crate::runner::ds::value::Value;

use super::array;
use super::class;
use super::number;
use super::object;
use super::string;

/// Install every built-in method into a freshly created registry.
pub fn register_core_builtins(registry: &mut ClassRegistry) {
    // Root first: everything else inherits from it.
    object::register(registry);
    class::register(registry);
    number::register(registry);
    string::register(registry);
    array::register(registry);
    register_nil(registry);
    register_symbol(registry);
    register_proc(registry);
}

fn register_nil(registry: &mut ClassRegistry) {
    let nil = registry.builtins().nil;
    registry.install_builtins(
        nil,
        vec![
            MethodEntry::native("nil?", 0, nil_is_nil),
            MethodEntry::native("to_s", 0, nil_to_s),
        ],
    );
}

fn register_symbol(registry: &mut ClassRegistry) {
    let symbol = registry.builtins().symbol;
    registry.install_builtins(symbol, vec![MethodEntry::native("to_s", 0, symbol_to_s)]);
}

fn register_proc(registry: &mut ClassRegistry) {
    let proc_class = registry.builtins().proc;
    let entries: Vec<Arc<MethodEntry>> = vec![
        MethodEntry::native_variadic("call", 0, proc_call),
        MethodEntry::native("arity", 0, proc_arity),
    ];
    registry.install_builtins(proc_class, entries);
}

fn nil_is_nil(_ctx: &mut CallContext<'_>, _args: Vec<Value>) -> Result<Value, RuntimeError> {
    Ok(Value::Boolean(true))
}

fn nil_to_s(_ctx: &mut CallContext<'_>, _args: Vec<Value>) -> Result<Value, RuntimeError> {
    Ok(Value::str(""))
}

fn symbol_to_s(ctx: &mut CallContext<'_>, _args: Vec<Value>) -> Result<Value, RuntimeError> {
    match ctx.receiver() {
        Value::Symbol(name) => Ok(Value::str(name)),
        other => Ok(Value::str(&other.to_string())),
    }
}

/// `f.call(args)` on a function or partial application.
fn proc_call(ctx: &mut CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    let callee = ctx.receiver().clone();
    ctx.runtime().call_value(&callee, args)
}

/// Arguments still needed; a partial application reports what it lacks.
fn proc_arity(ctx: &mut CallContext<'_>, _args: Vec<Value>) -> Result<Value, RuntimeError> {
    match ctx.receiver() {
        Value::Function(entry) => Ok(Value::Integer(entry.arity().required() as i64)),
        Value::Partial(partial) => Ok(Value::Integer(partial.remaining() as i64)),
        other => Err(RuntimeError::TypeError(format!(
            "{} is not a proc",
            other.type_name()
        ))),
    }
}
