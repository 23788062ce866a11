//! Integer and Float arithmetic.
//!
//! Integer arithmetic that overflows `i64` continues in floating point.
//! Integer division and modulo round toward negative infinity.

use crate::runner::dispatch::context::CallContext;
use crate::runner::ds::error::RuntimeError;
use crate::runner::ds::method::MethodEntry;
use crate::runner::ds::registry::ClassRegistry;
use crate::runner::ds::value::Value;

pub fn register(registry: &mut ClassRegistry) {
    let (integer, float) = {
        let b = registry.builtins();
        (b.integer, b.float)
    };
    for class in [integer, float] {
        registry.install_builtins(
            class,
            vec![
                MethodEntry::native("+", 1, number_add),
                MethodEntry::native("-", 1, number_sub),
                MethodEntry::native("*", 1, number_mul),
                MethodEntry::native("/", 1, number_div),
                MethodEntry::native("%", 1, number_rem),
                MethodEntry::native("==", 1, number_eq),
                MethodEntry::native("<", 1, number_lt),
                MethodEntry::native(">", 1, number_gt),
                MethodEntry::native("<=", 1, number_le),
                MethodEntry::native(">=", 1, number_ge),
                MethodEntry::native("-", 0, number_neg),
                MethodEntry::native("+", 0, number_pos),
                MethodEntry::native("to_f", 0, number_to_f),
                MethodEntry::native("to_i", 0, number_to_i),
            ],
        );
    }
}

/// Operands after numeric promotion.
enum Operands {
    Ints(i64, i64),
    Floats(f64, f64),
}

fn operands(ctx: &CallContext<'_>, rhs: &Value) -> Result<Operands, RuntimeError> {
    match (ctx.receiver(), rhs) {
        (Value::Integer(a), Value::Integer(b)) => Ok(Operands::Ints(*a, *b)),
        (Value::Integer(a), Value::Float(b)) => Ok(Operands::Floats(*a as f64, *b)),
        (Value::Float(a), Value::Integer(b)) => Ok(Operands::Floats(*a, *b as f64)),
        (Value::Float(a), Value::Float(b)) => Ok(Operands::Floats(*a, *b)),
        (lhs, rhs) => Err(RuntimeError::TypeError(format!(
            "{} can't be coerced into {} for '{}'",
            rhs.type_name(),
            lhs.type_name(),
            ctx.method_name()
        ))),
    }
}

fn arithmetic(
    ctx: &CallContext<'_>,
    rhs: &Value,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> Result<Value, RuntimeError> {
    match operands(ctx, rhs)? {
        Operands::Ints(a, b) => Ok(match int_op(a, b) {
            Some(n) => Value::Integer(n),
            None => Value::Float(float_op(a as f64, b as f64)),
        }),
        Operands::Floats(a, b) => Ok(Value::Float(float_op(a, b))),
    }
}

fn comparison(
    ctx: &CallContext<'_>,
    rhs: &Value,
    int_cmp: fn(&i64, &i64) -> bool,
    float_cmp: fn(&f64, &f64) -> bool,
) -> Result<Value, RuntimeError> {
    match operands(ctx, rhs)? {
        Operands::Ints(a, b) => Ok(Value::Boolean(int_cmp(&a, &b))),
        Operands::Floats(a, b) => Ok(Value::Boolean(float_cmp(&a, &b))),
    }
}

fn floor_div(a: i64, b: i64) -> Option<i64> {
    let q = a.checked_div(b)?;
    if a % b != 0 && ((a < 0) != (b < 0)) {
        q.checked_sub(1)
    } else {
        Some(q)
    }
}

fn floor_rem(a: i64, b: i64) -> Option<i64> {
    let r = a.checked_rem(b)?;
    if r != 0 && ((r < 0) != (b < 0)) {
        Some(r + b)
    } else {
        Some(r)
    }
}

fn float_floor_rem(a: f64, b: f64) -> f64 {
    a - b * (a / b).floor()
}

fn number_add(ctx: &mut CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    arithmetic(ctx, &args[0], i64::checked_add, |a, b| a + b)
}

fn number_sub(ctx: &mut CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    arithmetic(ctx, &args[0], i64::checked_sub, |a, b| a - b)
}

fn number_mul(ctx: &mut CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    arithmetic(ctx, &args[0], i64::checked_mul, |a, b| a * b)
}

fn number_div(ctx: &mut CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    if let (Value::Integer(_), Value::Integer(0)) = (ctx.receiver(), &args[0]) {
        return Err(RuntimeError::ZeroDivisionError);
    }
    arithmetic(ctx, &args[0], floor_div, |a, b| a / b)
}

fn number_rem(ctx: &mut CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    if let (Value::Integer(_), Value::Integer(0)) = (ctx.receiver(), &args[0]) {
        return Err(RuntimeError::ZeroDivisionError);
    }
    arithmetic(ctx, &args[0], floor_rem, float_floor_rem)
}

/// Non-numeric operands compare unequal instead of failing.
fn number_eq(ctx: &mut CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    match operands(ctx, &args[0]) {
        Ok(Operands::Ints(a, b)) => Ok(Value::Boolean(a == b)),
        Ok(Operands::Floats(a, b)) => Ok(Value::Boolean(a == b)),
        Err(_) => Ok(Value::Boolean(false)),
    }
}

fn number_lt(ctx: &mut CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    comparison(ctx, &args[0], i64::lt, f64::lt)
}

fn number_gt(ctx: &mut CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    comparison(ctx, &args[0], i64::gt, f64::gt)
}

fn number_le(ctx: &mut CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    comparison(ctx, &args[0], i64::le, f64::le)
}

fn number_ge(ctx: &mut CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    comparison(ctx, &args[0], i64::ge, f64::ge)
}

fn number_neg(ctx: &mut CallContext<'_>, _args: Vec<Value>) -> Result<Value, RuntimeError> {
    match ctx.receiver() {
        Value::Integer(i) => Ok(i
            .checked_neg()
            .map(Value::Integer)
            .unwrap_or(Value::Float(-(*i as f64)))),
        Value::Float(f) => Ok(Value::Float(-f)),
        other => Err(RuntimeError::TypeError(format!(
            "undefined negation for {}",
            other.type_name()
        ))),
    }
}

fn number_pos(ctx: &mut CallContext<'_>, _args: Vec<Value>) -> Result<Value, RuntimeError> {
    Ok(ctx.receiver().clone())
}

fn number_to_f(ctx: &mut CallContext<'_>, _args: Vec<Value>) -> Result<Value, RuntimeError> {
    match ctx.receiver() {
        Value::Integer(i) => Ok(Value::Float(*i as f64)),
        other => Ok(other.clone()),
    }
}

fn number_to_i(ctx: &mut CallContext<'_>, _args: Vec<Value>) -> Result<Value, RuntimeError> {
    match ctx.receiver() {
        Value::Float(f) => Ok(Value::Integer(f.trunc() as i64)),
        other => Ok(other.clone()),
    }
}
