//! Operator tokens to method names.
//!
//! Operators are ordinary methods named by their token. Binary operators send
//! one argument, unary operators none, so `-` the binary method and `-` the
//! unary method are two arity overloads of one name. Prefix and postfix uses
//! of a unary operator reach the same entry; the body tells them apart with
//! [`CallContext::is_postfix`](crate::runner::dispatch::context::CallContext::is_postfix).
//! Any run of operator characters is a valid custom operator (`<==>`, `=!=`).

use rustc_hash::FxHashSet;

use crate::runner::ds::error::RuntimeError;

lazy_static! {
    static ref OPERATOR_CHARS: FxHashSet<char> = "+-*/%<>=!&|^~?@:.[]".chars().collect();
}

/// Fixity of a unary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fixity {
    Prefix,
    Postfix,
}

fn check_token(token: &str) -> Result<(), RuntimeError> {
    if token.is_empty() || !token.chars().all(|c| OPERATOR_CHARS.contains(&c)) {
        return Err(RuntimeError::TypeError(format!(
            "'{}' is not an operator token",
            token
        )));
    }
    Ok(())
}

/// Method name sent for a binary operator token.
pub fn binary_method(token: &str) -> Result<String, RuntimeError> {
    check_token(token)?;
    Ok(token.to_string())
}

/// Method name sent for a unary operator token, whatever its fixity.
pub fn unary_method(token: &str) -> Result<String, RuntimeError> {
    check_token(token)?;
    Ok(token.to_string())
}
