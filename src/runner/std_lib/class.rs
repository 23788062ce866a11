//! Reflective methods of the built-in `Class` class.
//!
//! Class receivers reach these after their own class-level tables, so a
//! class method of the same name takes precedence.

use crate::runner::api::renamed_entry;
use crate::runner::dispatch::context::CallContext;
use crate::runner::ds::class::ClassId;
use crate::runner::ds::error::RuntimeError;
use crate::runner::ds::method::MethodEntry;
use crate::runner::ds::registry::ClassRegistry;
use crate::runner::ds::value::Value;

use super::object::name_arg;

pub fn register(registry: &mut ClassRegistry) {
    let class = registry.builtins().class;
    registry.install_builtins(
        class,
        vec![
            MethodEntry::native_variadic("new", 0, class_new),
            MethodEntry::native("name", 0, class_name),
            MethodEntry::native("to_s", 0, class_name),
            MethodEntry::native("superclass", 0, class_superclass),
            MethodEntry::native("ancestors", 0, class_ancestors),
            MethodEntry::native("instance_methods", 0, class_instance_methods),
            MethodEntry::native_variadic("include", 1, class_include),
            MethodEntry::native_variadic("undef_method", 1, class_undef_method),
            MethodEntry::native_variadic("remove_method", 1, class_remove_method),
            MethodEntry::native("define_method", 2, class_define_method),
            MethodEntry::native("method_defined?", 1, class_method_defined),
        ],
    );
}

fn receiver_class(ctx: &CallContext<'_>) -> Result<ClassId, RuntimeError> {
    match ctx.receiver() {
        Value::Class(class) => Ok(*class),
        other => Err(RuntimeError::TypeError(format!(
            "'{}' needs a class receiver, got {}",
            ctx.method_name(),
            other.type_name()
        ))),
    }
}

fn class_new(ctx: &mut CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    let class = receiver_class(ctx)?;
    ctx.runtime().instantiate(class, args)
}

fn class_name(ctx: &mut CallContext<'_>, _args: Vec<Value>) -> Result<Value, RuntimeError> {
    let class = receiver_class(ctx)?;
    Ok(Value::str(&ctx.runtime().class_name(class)))
}

fn class_superclass(ctx: &mut CallContext<'_>, _args: Vec<Value>) -> Result<Value, RuntimeError> {
    let class = receiver_class(ctx)?;
    Ok(ctx
        .runtime()
        .superclass_of(class)
        .map(Value::Class)
        .unwrap_or(Value::Nil))
}

fn class_ancestors(ctx: &mut CallContext<'_>, _args: Vec<Value>) -> Result<Value, RuntimeError> {
    let class = receiver_class(ctx)?;
    let ancestors = ctx.runtime().ancestors(class);
    Ok(Value::array(ancestors.into_iter().map(Value::Class).collect()))
}

fn class_instance_methods(ctx: &mut CallContext<'_>, _args: Vec<Value>) -> Result<Value, RuntimeError> {
    let class = receiver_class(ctx)?;
    let names = ctx.runtime().instance_method_names(class);
    Ok(Value::array(names.iter().map(|n| Value::symbol(n)).collect()))
}

/// `include A, B::C`: module values or constant paths, included in order.
fn class_include(ctx: &mut CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    let class = receiver_class(ctx)?;
    for arg in &args {
        match arg {
            Value::Class(module) => ctx.runtime().include_module(class, *module)?,
            other => match other.as_name() {
                Some(path) => {
                    ctx.runtime().include_path(class, &path)?;
                }
                None => {
                    return Err(RuntimeError::TypeError(format!(
                        "wrong argument type {} (expected module)",
                        other.type_name()
                    )))
                }
            },
        }
    }
    Ok(ctx.receiver().clone())
}

fn class_undef_method(ctx: &mut CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    let class = receiver_class(ctx)?;
    for arg in &args {
        let name = name_arg(ctx, arg)?;
        ctx.runtime().undef_method(class, &name)?;
    }
    Ok(Value::Nil)
}

fn class_remove_method(ctx: &mut CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    let class = receiver_class(ctx)?;
    for arg in &args {
        let name = name_arg(ctx, arg)?;
        ctx.runtime().remove_method(class, &name)?;
    }
    Ok(Value::Nil)
}

fn class_define_method(ctx: &mut CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    let class = receiver_class(ctx)?;
    let name = name_arg(ctx, &args[0])?;
    match &args[1] {
        Value::Function(entry) => {
            ctx.runtime()
                .define_method(class, renamed_entry(entry.clone(), &name))?;
            Ok(Value::symbol(&name))
        }
        other => Err(RuntimeError::TypeError(format!(
            "define_method expects a function, got {}",
            other.type_name()
        ))),
    }
}

fn class_method_defined(ctx: &mut CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    let class = receiver_class(ctx)?;
    let name = name_arg(ctx, &args[0])?;
    Ok(Value::Boolean(ctx.runtime().method_defined(class, &name)))
}
