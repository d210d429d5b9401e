//! The operator surface.
//!
//! One function per Lua operator, total over the value universe: each either
//! computes directly, delegates to a metamethod, or signals the reference
//! error for its operand types. All metamethod-capable operations take the
//! runtime context; `and`/`or`/`not` are pure.

use crate::arith::{self, ArithEval, ArithOp};
use crate::compare::{self, CompareEval};
use crate::metamethod::{self as mm, metatag};
use crate::tailcall;
use lunette_core::buffer::Buffer;
use lunette_core::error::LuaError;
use lunette_core::runtime::Runtime;
use lunette_core::string::LuaStr;
use lunette_core::value::Value;
use lunette_core::varargs::{Rets, Varargs};

/// Hop limit for `__index`/`__newindex` chains.
const MAXTAGLOOP: usize = 100;

// ---- arithmetic ----

pub fn add(rt: &mut Runtime, a: &Value, b: &Value) -> Result<Value, LuaError> {
    arith_dispatch(rt, ArithOp::Add, a, b)
}

pub fn sub(rt: &mut Runtime, a: &Value, b: &Value) -> Result<Value, LuaError> {
    arith_dispatch(rt, ArithOp::Sub, a, b)
}

pub fn mul(rt: &mut Runtime, a: &Value, b: &Value) -> Result<Value, LuaError> {
    arith_dispatch(rt, ArithOp::Mul, a, b)
}

pub fn div(rt: &mut Runtime, a: &Value, b: &Value) -> Result<Value, LuaError> {
    arith_dispatch(rt, ArithOp::Div, a, b)
}

pub fn modulo(rt: &mut Runtime, a: &Value, b: &Value) -> Result<Value, LuaError> {
    arith_dispatch(rt, ArithOp::Mod, a, b)
}

pub fn pow(rt: &mut Runtime, a: &Value, b: &Value) -> Result<Value, LuaError> {
    arith_dispatch(rt, ArithOp::Pow, a, b)
}

fn arith_dispatch(rt: &mut Runtime, op: ArithOp, a: &Value, b: &Value) -> Result<Value, LuaError> {
    match arith::arith_op(op, a, b) {
        ArithEval::Ok(v) => Ok(v),
        ArithEval::NeedMetamethod => {
            let mut h = metatag(rt, a, op.metatag());
            if h.is_nil() {
                h = metatag(rt, b, op.metatag());
            }
            if h.is_nil() {
                return Err(LuaError::Arithmetic2 {
                    op: op.name(),
                    lhs: a.type_name(),
                    rhs: b.type_name(),
                });
            }
            call(rt, &h, Varargs::pair(a.clone(), b.clone()))
        }
    }
}

/// Unary minus.
pub fn neg(rt: &mut Runtime, a: &Value) -> Result<Value, LuaError> {
    match arith::neg(a) {
        ArithEval::Ok(v) => Ok(v),
        ArithEval::NeedMetamethod => {
            let h = metatag(rt, a, mm::UNM);
            if h.is_nil() {
                return Err(LuaError::Arithmetic {
                    op: "unm",
                    lhs: a.type_name(),
                });
            }
            call(rt, &h, Varargs::from(a.clone()))
        }
    }
}

// ---- equality ----

/// Equality with metamethods, as a boolean.
///
/// Raw-equal values are equal without dispatch; `__eq` runs only for two
/// tables or two userdata that share the identical `__eq` handler.
pub fn eq_b(rt: &mut Runtime, a: &Value, b: &Value) -> Result<bool, LuaError> {
    if a.raweq(b) {
        return Ok(true);
    }
    let comparable = matches!(
        (a, b),
        (Value::Table(_), Value::Table(_)) | (Value::Userdata(_), Value::Userdata(_))
    );
    if !comparable {
        return Ok(false);
    }
    let ha = metatag(rt, a, mm::EQ);
    if ha.is_nil() || !ha.raweq(&metatag(rt, b, mm::EQ)) {
        return Ok(false);
    }
    let r = call(rt, &ha, Varargs::pair(a.clone(), b.clone()))?;
    Ok(r.to_boolean())
}

pub fn eq(rt: &mut Runtime, a: &Value, b: &Value) -> Result<Value, LuaError> {
    eq_b(rt, a, b).map(Value::Bool)
}

pub fn neq(rt: &mut Runtime, a: &Value, b: &Value) -> Result<Value, LuaError> {
    eq_b(rt, a, b).map(|r| Value::Bool(!r))
}

// ---- ordered comparison ----

pub fn lt_b(rt: &mut Runtime, a: &Value, b: &Value) -> Result<bool, LuaError> {
    match compare::raw_lt(a, b) {
        CompareEval::Ok(r) => Ok(r),
        CompareEval::NeedMetamethod => compare_dispatch(rt, mm::LT, a, b),
    }
}

pub fn le_b(rt: &mut Runtime, a: &Value, b: &Value) -> Result<bool, LuaError> {
    match compare::raw_le(a, b) {
        CompareEval::Ok(r) => Ok(r),
        CompareEval::NeedMetamethod => compare_dispatch(rt, mm::LE, a, b),
    }
}

pub fn lt(rt: &mut Runtime, a: &Value, b: &Value) -> Result<Value, LuaError> {
    lt_b(rt, a, b).map(Value::Bool)
}

pub fn le(rt: &mut Runtime, a: &Value, b: &Value) -> Result<Value, LuaError> {
    le_b(rt, a, b).map(Value::Bool)
}

/// `a > b` is `b < a`, with dispatch starting from `b`.
pub fn gt(rt: &mut Runtime, a: &Value, b: &Value) -> Result<Value, LuaError> {
    lt(rt, b, a)
}

pub fn gt_b(rt: &mut Runtime, a: &Value, b: &Value) -> Result<bool, LuaError> {
    lt_b(rt, b, a)
}

/// `a >= b` is `b <= a`, with dispatch starting from `b`.
pub fn ge(rt: &mut Runtime, a: &Value, b: &Value) -> Result<Value, LuaError> {
    le(rt, b, a)
}

pub fn ge_b(rt: &mut Runtime, a: &Value, b: &Value) -> Result<bool, LuaError> {
    le_b(rt, b, a)
}

fn compare_dispatch(rt: &mut Runtime, tag: &str, a: &Value, b: &Value) -> Result<bool, LuaError> {
    let mut h = metatag(rt, a, tag);
    if h.is_nil() {
        h = metatag(rt, b, tag);
    }
    if !h.is_nil() {
        let r = call(rt, &h, Varargs::pair(a.clone(), b.clone()))?;
        return Ok(r.to_boolean());
    }
    // a <= b falls back to not (b < a).
    if tag == mm::LE {
        let mut h = metatag(rt, a, mm::LT);
        if h.is_nil() {
            h = metatag(rt, b, mm::LT);
        }
        if !h.is_nil() {
            let r = call(rt, &h, Varargs::pair(b.clone(), a.clone()))?;
            return Ok(!r.to_boolean());
        }
    }
    if a.type_name() == b.type_name() {
        Err(LuaError::ComparisonSame {
            type_name: a.type_name(),
        })
    } else {
        Err(LuaError::Comparison {
            lhs: a.type_name(),
            rhs: b.type_name(),
        })
    }
}

// ---- length ----

/// The `#` operator: byte length for strings, `__len` when present, the
/// table border otherwise.
pub fn len(rt: &mut Runtime, v: &Value) -> Result<Value, LuaError> {
    if let Value::Str(s) = v {
        return Ok(Value::int(s.len() as i32));
    }
    let h = metatag(rt, v, mm::LEN);
    if !h.is_nil() {
        return call(rt, &h, Varargs::from(v.clone()));
    }
    if let Value::Table(t) = v {
        return Ok(Value::int(t.borrow().length()));
    }
    Err(LuaError::Length {
        type_name: v.type_name(),
    })
}

/// Raw length, no metamethods: tables and strings only.
pub fn rawlen(v: &Value) -> Result<i32, LuaError> {
    match v {
        Value::Str(s) => Ok(s.len() as i32),
        Value::Table(t) => Ok(t.borrow().length()),
        other => Err(LuaError::Type {
            expected: "table or string",
            got: other.type_name(),
        }),
    }
}

// ---- concatenation ----

pub fn concat(rt: &mut Runtime, a: &Value, b: &Value) -> Result<Value, LuaError> {
    if let (Some(sa), Some(sb)) = (a.to_lua_string(), b.to_lua_string()) {
        let mut bytes = Vec::with_capacity(sa.len() + sb.len());
        bytes.extend_from_slice(sa.as_bytes());
        bytes.extend_from_slice(sb.as_bytes());
        return Ok(Value::Str(LuaStr::new(bytes)));
    }
    let mut h = metatag(rt, a, mm::CONCAT);
    if h.is_nil() {
        h = metatag(rt, b, mm::CONCAT);
    }
    if h.is_nil() {
        return Err(LuaError::Concat2 {
            lhs: a.type_name(),
            rhs: b.type_name(),
        });
    }
    call(rt, &h, Varargs::pair(a.clone(), b.clone()))
}

/// `lhs .. buffer`, the right-associative accumulation step of a concat
/// chain. While everything stays string-or-number the bytes are prepended in
/// place; as soon as either side needs `__concat`, the buffer carries the
/// dispatched result as a deferred value.
pub fn concat_buffer(rt: &mut Runtime, lhs: &Value, mut buf: Buffer) -> Result<Buffer, LuaError> {
    if buf.needs_dispatch() {
        let rhs = buf.deferred().cloned().expect("dispatch implies a value");
        let combined = concat(rt, lhs, &rhs)?;
        return Ok(Buffer::of_value(combined));
    }
    if buf.prepend_value(lhs) {
        return Ok(buf);
    }
    // Left operand is not string-or-number: collapse the buffer to a string
    // and dispatch on the pair.
    let rhs = buf.value();
    let combined = concat(rt, lhs, &rhs)?;
    Ok(Buffer::of_value(combined))
}

// ---- logical operators ----

/// Short-circuit `and`: returns one of its operands, never a coerced bool.
pub fn and(a: &Value, b: &Value) -> Value {
    if a.to_boolean() {
        b.clone()
    } else {
        a.clone()
    }
}

/// Short-circuit `or`: returns one of its operands, never a coerced bool.
pub fn or(a: &Value, b: &Value) -> Value {
    if a.to_boolean() {
        a.clone()
    } else {
        b.clone()
    }
}

/// `not` always returns a boolean.
pub fn not(a: &Value) -> Value {
    Value::Bool(!a.to_boolean())
}

// ---- indexed access ----

/// `t[key]` with `__index` chain walking.
pub fn get(rt: &mut Runtime, t: &Value, key: &Value) -> Result<Value, LuaError> {
    let mut t = t.clone();
    for _ in 0..MAXTAGLOOP {
        let tm;
        if let Value::Table(tt) = &t {
            let res = tt.borrow().rawget(key);
            if !res.is_nil() {
                return Ok(res);
            }
            tm = metatag(rt, &t, mm::INDEX);
            if tm.is_nil() {
                return Ok(Value::Nil);
            }
        } else {
            tm = metatag(rt, &t, mm::INDEX);
            if tm.is_nil() {
                return Err(LuaError::Index {
                    type_name: t.type_name(),
                    key: key.to_display(),
                });
            }
        }
        if tm.is_function() {
            return call(rt, &tm, Varargs::pair(t, key.clone()));
        }
        t = tm;
    }
    Err(LuaError::LoopInGettable)
}

/// `t[key] = value` with `__newindex` chain walking.
pub fn set(rt: &mut Runtime, t: &Value, key: &Value, value: Value) -> Result<(), LuaError> {
    let mut t = t.clone();
    for _ in 0..MAXTAGLOOP {
        if let Value::Table(tt) = &t {
            let occupied = !tt.borrow().rawget(key).is_nil();
            let tm = if occupied {
                Value::Nil
            } else {
                metatag(rt, &t, mm::NEWINDEX)
            };
            if tm.is_nil() {
                return tt.borrow_mut().rawset(key, value);
            }
            if tm.is_function() {
                call(rt, &tm, Varargs::of(vec![t, key.clone(), value]))?;
                return Ok(());
            }
            t = tm;
        } else {
            let tm = metatag(rt, &t, mm::NEWINDEX);
            if tm.is_nil() {
                return Err(LuaError::Index {
                    type_name: t.type_name(),
                    key: key.to_display(),
                });
            }
            if tm.is_function() {
                call(rt, &tm, Varargs::of(vec![t, key.clone(), value]))?;
                return Ok(());
            }
            t = tm;
        }
    }
    Err(LuaError::LoopInSettable)
}

// ---- call dispatch ----

/// Invoke `f`, resolving `__call` and tail calls, keeping every return value.
pub fn invoke(rt: &mut Runtime, f: &Value, args: Varargs) -> Result<Varargs, LuaError> {
    let first = invoke_once(rt, f, args)?;
    tailcall::trampoline(rt, first)
}

/// Invoke `f` and keep only the first return value.
pub fn call(rt: &mut Runtime, f: &Value, args: Varargs) -> Result<Value, LuaError> {
    invoke(rt, f, args).map(|v| v.arg1())
}

/// One invocation step: run a function body, or resolve `__call` into a
/// deferred call on the handler. Used by the trampoline.
pub(crate) fn invoke_once(rt: &mut Runtime, f: &Value, args: Varargs) -> Result<Rets, LuaError> {
    match f {
        Value::Function(fun) => fun.on_invoke(rt, args),
        other => {
            let h = metatag(rt, other, mm::CALL);
            if !h.is_nil() && h.is_function() {
                // The handler receives the original value before the args.
                Ok(Rets::tail_call(h, Varargs::prepend(other.clone(), &args)))
            } else {
                Err(LuaError::Call {
                    type_name: other.type_name(),
                })
            }
        }
    }
}

/// Call `self[name](self, args...)`.
pub fn invoke_method(
    rt: &mut Runtime,
    target: &Value,
    name: &str,
    args: Varargs,
) -> Result<Varargs, LuaError> {
    let f = get(rt, target, &Value::str(name))?;
    invoke(rt, &f, Varargs::prepend(target.clone(), &args))
}

// ---- tostring ----

/// `tostring`: `__tostring` when present, the display label otherwise.
pub fn tostring(rt: &mut Runtime, v: &Value) -> Result<Value, LuaError> {
    let h = metatag(rt, v, mm::TOSTRING);
    if !h.is_nil() {
        return call(rt, &h, Varargs::from(v.clone()));
    }
    match v.to_lua_string() {
        Some(s) => Ok(Value::Str(s)),
        None => Ok(Value::str(v.to_display())),
    }
}
