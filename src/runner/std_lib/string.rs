//! String receivers.

use crate::runner::dispatch::context::CallContext;
use crate::runner::ds::error::RuntimeError;
use crate::runner::ds::method::MethodEntry;
use crate::runner::ds::registry::ClassRegistry;
use crate::runner::ds::value::{NovaString, Value};

pub fn register(registry: &mut ClassRegistry) {
    let string = registry.builtins().string;
    registry.install_builtins(
        string,
        vec![
            MethodEntry::native("+", 1, string_concat),
            MethodEntry::native("<<", 1, string_append),
            MethodEntry::native("==", 1, string_eq),
            MethodEntry::native("length", 0, string_length),
            MethodEntry::native("to_s", 0, string_to_s),
        ],
    );
}

fn this_string(ctx: &CallContext<'_>) -> Result<NovaString, RuntimeError> {
    match ctx.receiver() {
        Value::String(s) => Ok(s.clone()),
        other => Err(RuntimeError::TypeError(format!(
            "'{}' needs a string receiver, got {}",
            ctx.method_name(),
            other.type_name()
        ))),
    }
}

fn string_arg(ctx: &CallContext<'_>, value: &Value) -> Result<String, RuntimeError> {
    match value {
        Value::String(s) => Ok(s.to_string()),
        other => Err(RuntimeError::TypeError(format!(
            "no implicit conversion of {} into string for '{}'",
            other.type_name(),
            ctx.method_name()
        ))),
    }
}

/// `a + b` builds a new string.
fn string_concat(ctx: &mut CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    let lhs = this_string(ctx)?;
    let rhs = string_arg(ctx, &args[0])?;
    Ok(Value::str(&format!("{}{}", lhs, rhs)))
}

/// `a << b` appends in place and returns the receiver.
fn string_append(ctx: &mut CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    let target = this_string(ctx)?;
    let suffix = match &args[0] {
        Value::String(s) => s.to_string(),
        other => other.to_string(),
    };
    target.push_str(&suffix);
    Ok(ctx.receiver().clone())
}

fn string_eq(ctx: &mut CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    Ok(Value::Boolean(*ctx.receiver() == args[0]))
}

fn string_length(ctx: &mut CallContext<'_>, _args: Vec<Value>) -> Result<Value, RuntimeError> {
    Ok(Value::Integer(this_string(ctx)?.len() as i64))
}

fn string_to_s(ctx: &mut CallContext<'_>, _args: Vec<Value>) -> Result<Value, RuntimeError> {
    Ok(ctx.receiver().clone())
}
