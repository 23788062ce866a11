//! Array receivers.

use crate::runner::dispatch::context::CallContext;
use crate::runner::ds::error::RuntimeError;
use crate::runner::ds::method::MethodEntry;
use crate::runner::ds::registry::ClassRegistry;
use crate::runner::ds::value::{NovaArray, Value};

pub fn register(registry: &mut ClassRegistry) {
    let array = registry.builtins().array;
    registry.install_builtins(
        array,
        vec![
            MethodEntry::native("<<", 1, array_push),
            MethodEntry::native("[]", 1, array_index),
            MethodEntry::native("==", 1, array_eq),
            MethodEntry::native("length", 0, array_length),
            MethodEntry::native("first", 0, array_first),
            MethodEntry::native("last", 0, array_last),
        ],
    );
}

fn this_array(ctx: &CallContext<'_>) -> Result<NovaArray, RuntimeError> {
    match ctx.receiver() {
        Value::Array(a) => Ok(a.clone()),
        other => Err(RuntimeError::TypeError(format!(
            "'{}' needs an array receiver, got {}",
            ctx.method_name(),
            other.type_name()
        ))),
    }
}

fn array_push(ctx: &mut CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    let array = this_array(ctx)?;
    array.push(args[0].clone());
    Ok(ctx.receiver().clone())
}

/// Negative indices count from the end; out of range reads as `nil`.
fn array_index(ctx: &mut CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    let array = this_array(ctx)?;
    let index = ctx.integer_arg(&args, 0)?;
    Ok(array.get(index).unwrap_or(Value::Nil))
}

fn array_eq(ctx: &mut CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    Ok(Value::Boolean(*ctx.receiver() == args[0]))
}

fn array_length(ctx: &mut CallContext<'_>, _args: Vec<Value>) -> Result<Value, RuntimeError> {
    Ok(Value::Integer(this_array(ctx)?.len() as i64))
}

fn array_first(ctx: &mut CallContext<'_>, _args: Vec<Value>) -> Result<Value, RuntimeError> {
    Ok(this_array(ctx)?.get(0).unwrap_or(Value::Nil))
}

fn array_last(ctx: &mut CallContext<'_>, _args: Vec<Value>) -> Result<Value, RuntimeError> {
    Ok(this_array(ctx)?.get(-1).unwrap_or(Value::Nil))
}
