//! The runtime error channel.
//!
//! Every fallible operation in the core returns `Result<_, LuaError>`. The
//! `Display` output of each variant is the user-visible Lua error message and
//! matches reference Lua 5.2 wording; the variants exist so callers can match
//! on the error kind without parsing strings.

use crate::value::Value;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum LuaError {
    /// An operator applied to a single non-numeric operand.
    #[error("attempt to perform arithmetic {op} on {lhs}")]
    Arithmetic { op: &'static str, lhs: &'static str },

    /// An operator applied to two operands, neither of which supplied a
    /// metamethod.
    #[error("attempt to perform arithmetic {op} on {lhs} and {rhs}")]
    Arithmetic2 {
        op: &'static str,
        lhs: &'static str,
        rhs: &'static str,
    },

    /// Ordered comparison between values of two different types.
    #[error("attempt to compare {lhs} with {rhs}")]
    Comparison {
        lhs: &'static str,
        rhs: &'static str,
    },

    /// Ordered comparison between two values of the same non-comparable type.
    #[error("attempt to compare two {type_name} values")]
    ComparisonSame { type_name: &'static str },

    /// `..` applied to a single non-concatable value.
    #[error("attempt to concatenate {type_name}")]
    Concat { type_name: &'static str },

    /// `..` where neither operand is concatable or carries `__concat`.
    #[error("attempt to concatenate {lhs} and {rhs}")]
    Concat2 {
        lhs: &'static str,
        rhs: &'static str,
    },

    /// Indexed access on a value that is not a table and has no `__index`.
    #[error("attempt to index ? (a {type_name} value) with key '{key}'")]
    Index { type_name: &'static str, key: String },

    #[error("attempt to call a {type_name} value")]
    Call { type_name: &'static str },

    #[error("attempt to get length of a {type_name} value")]
    Length { type_name: &'static str },

    /// Positional type mismatch at a function boundary (the `check_*` family
    /// on varargs).
    #[error("bad argument #{index} ({expected} expected, got {got})")]
    Argument {
        index: usize,
        expected: &'static str,
        got: &'static str,
    },

    /// Positional argument rejected for a reason other than its type.
    #[error("bad argument #{index} ({message})")]
    ArgumentMessage { index: usize, message: String },

    /// Type mismatch detected by a value-level `check_*` conversion.
    #[error("{expected} expected, got {got}")]
    Type {
        expected: &'static str,
        got: &'static str,
    },

    /// A value reported it does not support an operation.
    #[error("'{op}' not implemented for {type_name}")]
    Unimplemented {
        type_name: &'static str,
        op: &'static str,
    },

    #[error("cannot change a protected metatable")]
    ProtectedMetatable,

    /// `__index` chain exceeded the hop limit.
    #[error("loop in gettable")]
    LoopInGettable,

    /// `__newindex` chain exceeded the hop limit.
    #[error("loop in settable")]
    LoopInSettable,

    /// A plain runtime error message.
    #[error("{0}")]
    Message(String),

    /// `error(v)` with an arbitrary value; the value is carried as-is.
    #[error("{0}")]
    Value(Value),
}

impl LuaError {
    /// Shorthand for a plain message error.
    pub fn msg(m: impl Into<String>) -> LuaError {
        LuaError::Message(m.into())
    }

    /// The error as a Lua value, as seen by a protected call: the carried
    /// value for `LuaError::Value`, the message as a string otherwise.
    pub fn to_value(&self) -> Value {
        match self {
            LuaError::Value(v) => v.clone(),
            other => Value::str(other.to_string()),
        }
    }

    /// Rewrap a value-level `Type` mismatch as a positional argument error.
    pub fn at_arg(self, index: usize) -> LuaError {
        match self {
            LuaError::Type { expected, got } => LuaError::Argument {
                index,
                expected,
                got,
            },
            other => other,
        }
    }
}
