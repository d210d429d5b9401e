//! The base library.
//!
//! The functions every Lua program assumes: type inspection, raw table
//! access, metatable control, iteration, protected calls. Each one is a
//! `LuaFunction` registered into the runtime's globals table and goes
//! through the same operator surface and argument checkers as host code.

use lunette_core::error::LuaError;
use lunette_core::object::LuaFunction;
use lunette_core::runtime::Runtime;
use lunette_core::value::Value;
use lunette_core::varargs::{Rets, Varargs};
use lunette_rt::{metamethod, ops};

/// Register the base functions into the globals table.
pub fn register(rt: &mut Runtime) {
    let g = rt.globals.clone();

    // The iterator functions double as the backing for pairs/ipairs.
    let next_fn = Value::function(LuaFunction::new("next", base_next));
    let inext_fn = Value::function(LuaFunction::new("inext", base_inext));

    set_global(&g, "next", next_fn.clone());
    set_global(&g, "_G", g.clone());

    register_fn(&g, "assert", base_assert);
    register_fn(&g, "error", base_error);
    register_fn(&g, "getmetatable", base_getmetatable);
    register_fn(&g, "setmetatable", base_setmetatable);
    register_fn(&g, "print", base_print);
    register_fn(&g, "rawequal", base_rawequal);
    register_fn(&g, "rawget", base_rawget);
    register_fn(&g, "rawlen", base_rawlen);
    register_fn(&g, "rawset", base_rawset);
    register_fn(&g, "select", base_select);
    register_fn(&g, "tonumber", base_tonumber);
    register_fn(&g, "tostring", base_tostring);
    register_fn(&g, "type", base_type);
    register_fn(&g, "pcall", base_pcall);

    {
        let next_fn = next_fn.clone();
        register_fn(&g, "pairs", move |rt, args| {
            let t = args.check_value(1)?;
            let h = metamethod::metatag(rt, &t, "__pairs");
            if !h.is_nil() {
                return ops::invoke(rt, &h, Varargs::from(t)).map(Rets::Values);
            }
            Ok(Rets::Values(Varargs::of(vec![
                next_fn.clone(),
                t,
                Value::Nil,
            ])))
        });
    }
    register_fn(&g, "ipairs", move |_, args| {
        let t = args.check_value(1)?;
        Ok(Rets::Values(Varargs::of(vec![
            inext_fn.clone(),
            t,
            Value::ZERO,
        ])))
    });
}

pub(crate) fn set_global(globals: &Value, name: &str, v: Value) {
    if let Value::Table(t) = globals {
        t.borrow_mut().rawset_str(name, v);
    }
}

pub(crate) fn register_fn(
    globals: &Value,
    name: &'static str,
    f: impl Fn(&mut Runtime, Varargs) -> Result<Rets, LuaError> + 'static,
) {
    set_global(globals, name, Value::function(LuaFunction::new(name, f)));
}

fn base_assert(_rt: &mut Runtime, args: Varargs) -> Result<Rets, LuaError> {
    if args.arg1().to_boolean() {
        return Ok(Rets::Values(args));
    }
    match args.arg(2) {
        Value::Nil => Err(LuaError::msg("assertion failed!")),
        msg => Err(LuaError::Value(msg)),
    }
}

fn base_error(_rt: &mut Runtime, args: Varargs) -> Result<Rets, LuaError> {
    Err(LuaError::Value(args.arg1()))
}

fn base_getmetatable(rt: &mut Runtime, args: Varargs) -> Result<Rets, LuaError> {
    let v = args.check_value(1)?;
    Ok(Rets::from(metamethod::getmetatable(rt, &v)))
}

fn base_setmetatable(rt: &mut Runtime, args: Varargs) -> Result<Rets, LuaError> {
    let t = args.check_table(1)?;
    let mt = args.arg(2);
    metamethod::setmetatable(rt, &Value::Table(t), &mt)
        .map(Rets::from)
        .map_err(|e| e.at_arg(2))
}

fn base_next(_rt: &mut Runtime, args: Varargs) -> Result<Rets, LuaError> {
    let t = args.check_table(1)?;
    let key = args.arg(2);
    let pair = t.borrow().next(&key)?;
    Ok(match pair {
        Some((k, v)) => Rets::Values(Varargs::pair(k, v)),
        None => Rets::from(Value::Nil),
    })
}

fn base_inext(_rt: &mut Runtime, args: Varargs) -> Result<Rets, LuaError> {
    let t = args.check_table(1)?;
    let i = args.check_int(2)?;
    let pair = t.borrow().inext(i);
    Ok(match pair {
        Some((k, v)) => Rets::Values(Varargs::pair(Value::int(k), v)),
        None => Rets::from(Value::Nil),
    })
}

fn base_print(rt: &mut Runtime, args: Varargs) -> Result<Rets, LuaError> {
    let mut line = String::new();
    for i in 1..=args.narg() {
        if i > 1 {
            line.push('\t');
        }
        let s = ops::tostring(rt, &args.arg(i))?;
        line.push_str(&s.to_display());
    }
    println!("{}", line);
    Ok(Rets::none())
}

fn base_rawequal(_rt: &mut Runtime, args: Varargs) -> Result<Rets, LuaError> {
    let a = args.check_value(1)?;
    let b = args.check_value(2)?;
    Ok(Rets::from(Value::Bool(a.raweq(&b))))
}

fn base_rawget(_rt: &mut Runtime, args: Varargs) -> Result<Rets, LuaError> {
    let t = args.check_table(1)?;
    let k = args.check_value(2)?;
    let v = t.borrow().rawget(&k);
    Ok(Rets::from(v))
}

fn base_rawlen(_rt: &mut Runtime, args: Varargs) -> Result<Rets, LuaError> {
    let v = args.check_value(1)?;
    let n = ops::rawlen(&v).map_err(|e| e.at_arg(1))?;
    Ok(Rets::from(Value::int(n)))
}

fn base_rawset(_rt: &mut Runtime, args: Varargs) -> Result<Rets, LuaError> {
    let t = args.check_table(1)?;
    let k = args.check_value(2)?;
    let v = args.check_value(3)?;
    t.borrow_mut().rawset(&k, v)?;
    Ok(Rets::from(Value::Table(t)))
}

fn base_select(_rt: &mut Runtime, args: Varargs) -> Result<Rets, LuaError> {
    let total = args.narg().saturating_sub(1) as i32;
    if let Value::Str(s) = args.arg1() {
        if s.as_bytes() == b"#" {
            return Ok(Rets::from(Value::int(total)));
        }
    }
    let n = args.check_int(1)?;
    let start = if n < 0 { total + n + 1 } else { n };
    args.arg_check(start >= 1, 1, "index out of range")?;
    Ok(Rets::Values(args.sub_args(start + 1)?))
}

fn base_tonumber(_rt: &mut Runtime, args: Varargs) -> Result<Rets, LuaError> {
    let v = args.check_value(1)?;
    let base = args.optional_int(2, 10)?;
    if base == 10 {
        return Ok(Rets::from(v.to_number().unwrap_or(Value::Nil)));
    }
    args.arg_check((2..=36).contains(&base), 2, "base out of range")?;
    let s = args.check_str(1)?;
    let text = String::from_utf8_lossy(s.as_bytes());
    let parsed = i64::from_str_radix(text.trim(), base as u32).ok();
    Ok(Rets::from(parsed.map(Value::long).unwrap_or(Value::Nil)))
}

fn base_tostring(rt: &mut Runtime, args: Varargs) -> Result<Rets, LuaError> {
    let v = args.check_value(1)?;
    ops::tostring(rt, &v).map(Rets::from)
}

fn base_type(_rt: &mut Runtime, args: Varargs) -> Result<Rets, LuaError> {
    let v = args.check_value(1)?;
    Ok(Rets::from(Value::str(v.type_name())))
}

/// `pcall(f, ...)`: every error is recoverable; the result is
/// `(false, message-value)` on failure, `(true, results...)` on success.
fn base_pcall(rt: &mut Runtime, args: Varargs) -> Result<Rets, LuaError> {
    let f = args.check_value(1)?;
    let call_args = args.sub_args(2)?;
    Ok(Rets::Values(match ops::invoke(rt, &f, call_args) {
        Ok(vals) => Varargs::prepend(Value::TRUE, &vals),
        Err(e) => Varargs::pair(Value::FALSE, e.to_value()),
    }))
}
