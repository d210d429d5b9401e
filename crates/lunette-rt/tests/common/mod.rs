#![allow(dead_code)]
//! Shared fixtures for the operator tests.

use lunette_core::error::LuaError;
use lunette_core::object::LuaFunction;
use lunette_core::runtime::Runtime;
use lunette_core::value::Value;
use lunette_core::varargs::{Rets, Varargs};

/// A named two-argument function value.
pub fn fn2(
    name: &'static str,
    f: impl Fn(&mut Runtime, Value, Value) -> Result<Value, LuaError> + 'static,
) -> Value {
    Value::function(LuaFunction::new(name, move |rt, args: Varargs| {
        let a = args.arg(1);
        let b = args.arg(2);
        f(rt, a, b).map(Rets::from)
    }))
}

/// Metamethod that always returns its left operand.
pub fn return_lhs() -> Value {
    fn2("return_lhs", |_, a, _| Ok(a))
}

/// Metamethod that always returns its right operand.
pub fn return_rhs() -> Value {
    fn2("return_rhs", |_, _, b| Ok(b))
}

/// Metamethod that always returns nil.
pub fn return_nil() -> Value {
    fn2("return_nil", |_, _, _| Ok(Value::Nil))
}

/// Metamethod that always returns 1.
pub fn return_one() -> Value {
    fn2("return_one", |_, _, _| Ok(Value::ONE))
}

/// Assert an error message begins with `prefix` and mentions `needle`.
pub fn assert_error_mentions(err: &LuaError, prefix: &str, needle: &str) {
    let msg = err.to_string();
    assert!(
        msg.starts_with(prefix),
        "error {:?} does not start with {:?}",
        msg,
        prefix
    );
    assert!(
        msg.contains(needle),
        "error {:?} does not mention {:?}",
        msg,
        needle
    );
}
