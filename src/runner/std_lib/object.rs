//! Methods of the root class, shared by every object.

use crate::runner::api::Runtime;
use crate::runner::dispatch::context::CallContext;
use crate::runner::ds::error::RuntimeError;
use crate::runner::ds::method::MethodEntry;
use crate::runner::ds::registry::ClassRegistry;
use crate::runner::ds::value::Value;

pub fn register(registry: &mut ClassRegistry) {
    let root = registry.root();
    registry.install_builtins(
        root,
        vec![
            MethodEntry::native("class", 0, object_class),
            MethodEntry::native("is_a?", 1, object_is_a),
            MethodEntry::native("respond_to?", 1, object_respond_to),
            MethodEntry::native_variadic("undef_method", 1, object_undef_method),
            MethodEntry::native_variadic("remove_method", 1, object_remove_method),
            MethodEntry::native("define_singleton_method", 2, object_define_singleton_method),
            MethodEntry::native("singleton_methods", 0, object_singleton_methods),
            MethodEntry::native("instance_variables", 0, object_instance_variables),
            MethodEntry::native("instance_variable_get", 1, object_instance_variable_get),
            MethodEntry::native("instance_variable_set", 2, object_instance_variable_set),
            MethodEntry::native("==", 1, object_equals),
            MethodEntry::native("!=", 1, object_not_equals),
            MethodEntry::native("!", 0, object_not),
            MethodEntry::native("nil?", 0, object_is_nil),
            MethodEntry::native("to_s", 0, object_to_s),
        ],
    );
}

/// Method name argument: a symbol or a string.
pub(crate) fn name_arg(ctx: &CallContext<'_>, value: &Value) -> Result<String, RuntimeError> {
    value.as_name().ok_or_else(|| {
        RuntimeError::TypeError(format!(
            "'{}' expects a method name, got {}",
            ctx.method_name(),
            value.type_name()
        ))
    })
}

/// Printable form of any value; objects show their class.
pub(crate) fn display(runtime: &Runtime, value: &Value) -> Result<String, RuntimeError> {
    match value {
        Value::Object(_) => {
            let class = runtime.class_of(value)?;
            Ok(format!("#<{}>", runtime.class_name(class)))
        }
        Value::Class(class) => Ok(runtime.class_name(*class)),
        other => Ok(other.to_string()),
    }
}

fn object_class(ctx: &mut CallContext<'_>, _args: Vec<Value>) -> Result<Value, RuntimeError> {
    let class = ctx.runtime().class_of(ctx.receiver())?;
    Ok(Value::Class(class))
}

fn object_is_a(ctx: &mut CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    match &args[0] {
        Value::Class(class) => Ok(Value::Boolean(ctx.runtime().is_a(ctx.receiver(), *class)?)),
        other => Err(RuntimeError::TypeError(format!(
            "class or module required, got {}",
            other.type_name()
        ))),
    }
}

fn object_respond_to(ctx: &mut CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    let name = name_arg(ctx, &args[0])?;
    Ok(Value::Boolean(ctx.runtime().responds_to(ctx.receiver(), &name)?))
}

fn object_undef_method(ctx: &mut CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    for arg in &args {
        let name = name_arg(ctx, arg)?;
        ctx.runtime().undef_instance_method(ctx.receiver(), &name)?;
    }
    Ok(Value::Nil)
}

fn object_remove_method(ctx: &mut CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    for arg in &args {
        let name = name_arg(ctx, arg)?;
        ctx.runtime().remove_instance_method(ctx.receiver(), &name)?;
    }
    Ok(Value::Nil)
}

fn object_define_singleton_method(
    ctx: &mut CallContext<'_>,
    args: Vec<Value>,
) -> Result<Value, RuntimeError> {
    let name = name_arg(ctx, &args[0])?;
    match &args[1] {
        Value::Function(_) => {
            ctx.runtime()
                .set_member(ctx.receiver(), &name, args[1].clone())?;
            Ok(Value::symbol(&name))
        }
        other => Err(RuntimeError::TypeError(format!(
            "define_singleton_method expects a function, got {}",
            other.type_name()
        ))),
    }
}

fn object_singleton_methods(ctx: &mut CallContext<'_>, _args: Vec<Value>) -> Result<Value, RuntimeError> {
    let names = match ctx.receiver() {
        Value::Object(_) | Value::Foreign(_) => ctx.runtime().singleton_method_names(ctx.receiver())?,
        _ => Vec::new(),
    };
    Ok(Value::array(names.iter().map(|n| Value::symbol(n)).collect()))
}

fn object_instance_variables(ctx: &mut CallContext<'_>, _args: Vec<Value>) -> Result<Value, RuntimeError> {
    let names = ctx.runtime().instance_variables(ctx.receiver())?;
    Ok(Value::array(
        names.iter().map(|n| Value::symbol(&format!("@{}", n))).collect(),
    ))
}

fn object_instance_variable_get(ctx: &mut CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    let name = name_arg(ctx, &args[0])?;
    ctx.ivar(&name)
}

fn object_instance_variable_set(ctx: &mut CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    let name = name_arg(ctx, &args[0])?;
    ctx.set_ivar(&name, args[1].clone())?;
    Ok(args[1].clone())
}

/// Identity for objects, content for plain values.
fn object_equals(ctx: &mut CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    Ok(Value::Boolean(*ctx.receiver() == args[0]))
}

fn object_not_equals(ctx: &mut CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    let equal = ctx.send_self("==", args)?;
    Ok(Value::Boolean(!equal.is_truthy()))
}

fn object_not(ctx: &mut CallContext<'_>, _args: Vec<Value>) -> Result<Value, RuntimeError> {
    Ok(Value::Boolean(!ctx.receiver().is_truthy()))
}

fn object_is_nil(_ctx: &mut CallContext<'_>, _args: Vec<Value>) -> Result<Value, RuntimeError> {
    Ok(Value::Boolean(false))
}

fn object_to_s(ctx: &mut CallContext<'_>, _args: Vec<Value>) -> Result<Value, RuntimeError> {
    Ok(Value::str(&display(ctx.runtime(), ctx.receiver())?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_protocol() {
        let rt = Runtime::new();
        let class = rt.define_class("Point", None).unwrap();
        let point = rt.instantiate(class, vec![]).unwrap();

        assert_eq!(rt.send(&point, "class", vec![]).unwrap(), Value::Class(class));
        assert_eq!(rt.send(&point, "to_s", vec![]).unwrap(), Value::str("#<Point>"));
        assert_eq!(
            rt.send(&point, "==", vec![point.clone()]).unwrap(),
            Value::Boolean(true)
        );
        assert_eq!(
            rt.send(&point, "!=", vec![Value::Integer(1)]).unwrap(),
            Value::Boolean(true)
        );
        assert_eq!(
            rt.send(&point, "respond_to?", vec![Value::symbol("to_s")]).unwrap(),
            Value::Boolean(true)
        );
        assert_eq!(
            rt.send(&point, "respond_to?", vec![Value::symbol("area")]).unwrap(),
            Value::Boolean(false)
        );
    }

    #[test]
    fn test_instance_variable_access() {
        let rt = Runtime::new();
        let class = rt.define_class("Bag", None).unwrap();
        let bag = rt.instantiate(class, vec![]).unwrap();

        rt.send(
            &bag,
            "instance_variable_set",
            vec![Value::symbol("@z"), Value::Integer(10)],
        )
        .unwrap();
        assert_eq!(
            rt.send(&bag, "instance_variable_get", vec![Value::str("z")]).unwrap(),
            Value::Integer(10)
        );
        assert_eq!(
            rt.send(&bag, "instance_variables", vec![]).unwrap(),
            Value::array(vec![Value::symbol("@z")])
        );
    }
}
