//! Metatable lookup.
//!
//! Tables and userdata carry per-instance metatables; every other type
//! shares one slot on the `Runtime`. `metatag` is the raw lookup used by
//! operator dispatch; `getmetatable`/`setmetatable` are the user-facing pair
//! that honor `__metatable` protection.

use lunette_core::error::LuaError;
use lunette_core::runtime::Runtime;
use lunette_core::table::{self, Table};
use lunette_core::value::Value;

pub const INDEX: &str = "__index";
pub const NEWINDEX: &str = "__newindex";
pub const CALL: &str = "__call";
pub const MODE: &str = "__mode";
pub const METATABLE: &str = "__metatable";
pub const ADD: &str = "__add";
pub const SUB: &str = "__sub";
pub const MUL: &str = "__mul";
pub const DIV: &str = "__div";
pub const MOD: &str = "__mod";
pub const POW: &str = "__pow";
pub const UNM: &str = "__unm";
pub const LEN: &str = "__len";
pub const EQ: &str = "__eq";
pub const LT: &str = "__lt";
pub const LE: &str = "__le";
pub const TOSTRING: &str = "__tostring";
pub const CONCAT: &str = "__concat";

/// The metatable governing `v`: the instance slot for tables and userdata,
/// the context-wide slot for everything else.
pub fn get_metatable(rt: &Runtime, v: &Value) -> Option<Value> {
    match v {
        Value::Table(t) => t.borrow().get_metatable(),
        Value::Userdata(u) => u.get_metatable(),
        Value::Nil => rt.nil_metatable.clone(),
        Value::Bool(_) => rt.boolean_metatable.clone(),
        Value::Int(_) | Value::Num(_) => rt.number_metatable.clone(),
        Value::Str(_) => rt.string_metatable.clone(),
        Value::Function(_) => rt.function_metatable.clone(),
        Value::Thread(_) => rt.thread_metatable.clone(),
    }
}

/// Raw metatag lookup: the value under `tag` in `v`'s metatable, or nil.
/// A metatable is a table or nothing; anything else carries no tags.
pub fn metatag(rt: &Runtime, v: &Value, tag: &str) -> Value {
    match get_metatable(rt, v) {
        Some(Value::Table(mt)) => mt.borrow().rawget_str(tag),
        _ => Value::Nil,
    }
}

/// `getmetatable`: the metatable, veiled by a non-nil `__metatable` field.
pub fn getmetatable(rt: &Runtime, v: &Value) -> Value {
    match get_metatable(rt, v) {
        None => Value::Nil,
        Some(mt) => {
            let veil = raw_field(&mt, METATABLE);
            if veil.is_nil() {
                mt
            } else {
                veil
            }
        }
    }
}

/// `setmetatable`: install `mt` (a table, or nil to clear) on `v`. Refused
/// when the current metatable is protected. Scalar types write the
/// context-wide slot for their type.
pub fn setmetatable(rt: &mut Runtime, v: &Value, mt: &Value) -> Result<Value, LuaError> {
    if !mt.is_nil() && !mt.is_table() {
        return Err(LuaError::Type {
            expected: "nil or table",
            got: mt.type_name(),
        });
    }
    if let Some(cur) = get_metatable(rt, v) {
        if !raw_field(&cur, METATABLE).is_nil() {
            return Err(LuaError::ProtectedMetatable);
        }
    }
    let new_mt = if mt.is_nil() { None } else { Some(mt.clone()) };
    match v {
        Value::Table(t) => {
            // Weak flags come from the metatable's __mode, read before the
            // target is mutably borrowed: a table may be its own metatable.
            let (wk, wv) = match &new_mt {
                Some(m) => table::mode_flags(&raw_field(m, MODE)),
                None => (false, false),
            };
            t.borrow_mut().set_metatable_with_mode(new_mt, wk, wv);
        }
        Value::Userdata(u) => u.set_metatable(new_mt),
        Value::Nil => rt.nil_metatable = new_mt,
        Value::Bool(_) => rt.boolean_metatable = new_mt,
        Value::Int(_) | Value::Num(_) => rt.number_metatable = new_mt,
        Value::Str(_) => rt.string_metatable = new_mt,
        Value::Function(_) => rt.function_metatable = new_mt,
        Value::Thread(_) => rt.thread_metatable = new_mt,
    }
    Ok(v.clone())
}

/// Raw field read on a metatable value; nil when it is not a table.
fn raw_field(mt: &Value, key: &str) -> Value {
    match mt {
        Value::Table(t) => t.borrow().rawget_str(key),
        _ => Value::Nil,
    }
}

/// Build a metatable value from tag/value pairs, for hosts and tests.
pub fn metatable_of(pairs: Vec<(&str, Value)>) -> Value {
    let mut t = Table::new();
    for (k, v) in pairs {
        t.rawset_str(k, v);
    }
    Value::table(t)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instance_metatables_for_tables() {
        let mut rt = Runtime::new();
        let t = Value::new_table();
        let mt = metatable_of(vec![(ADD, Value::int(1))]);
        setmetatable(&mut rt, &t, &mt).unwrap();
        assert_eq!(metatag(&rt, &t, ADD), Value::int(1));
        assert_eq!(metatag(&rt, &t, SUB), Value::Nil);
        setmetatable(&mut rt, &t, &Value::Nil).unwrap();
        assert_eq!(metatag(&rt, &t, ADD), Value::Nil);
    }

    #[test]
    fn type_metatables_cover_all_values_of_the_type() {
        let mut rt = Runtime::new();
        let mt = metatable_of(vec![(LEN, Value::int(9))]);
        setmetatable(&mut rt, &Value::int(0), &mt).unwrap();
        assert_eq!(metatag(&rt, &Value::int(5), LEN), Value::int(9));
        assert_eq!(metatag(&rt, &Value::number(0.5), LEN), Value::int(9));
        rt.reset_type_metatables();
        assert_eq!(metatag(&rt, &Value::int(5), LEN), Value::Nil);
    }

    #[test]
    fn protected_metatables_veil_and_refuse_replacement() {
        let mut rt = Runtime::new();
        let t = Value::new_table();
        let mt = metatable_of(vec![(METATABLE, Value::str("hidden"))]);
        setmetatable(&mut rt, &t, &mt).unwrap();
        assert_eq!(getmetatable(&rt, &t), Value::str("hidden"));
        let err = setmetatable(&mut rt, &t, &Value::new_table()).unwrap_err();
        assert_eq!(err.to_string(), "cannot change a protected metatable");
        let err = setmetatable(&mut rt, &t, &Value::Nil).unwrap_err();
        assert_eq!(err.to_string(), "cannot change a protected metatable");
    }

    #[test]
    fn a_table_may_be_its_own_metatable() {
        let mut rt = Runtime::new();
        let t = Value::new_table();
        if let Value::Table(tt) = &t {
            tt.borrow_mut().rawset_str(INDEX, Value::int(7));
        }
        setmetatable(&mut rt, &t, &t).unwrap();
        assert_eq!(metatag(&rt, &t, INDEX), Value::int(7));
    }

    #[test]
    fn non_table_metatable_rejected() {
        let mut rt = Runtime::new();
        let t = Value::new_table();
        let err = setmetatable(&mut rt, &t, &Value::int(3)).unwrap_err();
        assert_eq!(err.to_string(), "nil or table expected, got number");
    }
}
