//! The table library: list manipulation over the core table operations.

use crate::base::{register_fn, set_global};
use lunette_core::error::LuaError;
use lunette_core::runtime::Runtime;
use lunette_core::table::Table;
use lunette_core::value::Value;
use lunette_core::varargs::{Rets, Varargs};
use lunette_rt::table_ops;

/// Register the `table` module into the globals table.
pub fn register(rt: &mut Runtime) {
    let module = Value::new_table();
    register_fn(&module, "insert", table_insert);
    register_fn(&module, "remove", table_remove);
    register_fn(&module, "concat", table_concat);
    register_fn(&module, "unpack", table_unpack);
    register_fn(&module, "pack", table_pack);
    register_fn(&module, "sort", table_sort);
    set_global(&rt.globals, "table", module);
}

fn table_insert(_rt: &mut Runtime, args: Varargs) -> Result<Rets, LuaError> {
    let t = args.check_table(1)?;
    let n = t.borrow().length();
    match args.narg() {
        2 => {
            let v = args.arg(2);
            t.borrow_mut().rawset_int(n + 1, v);
        }
        3 => {
            let pos = args.check_int(2)?;
            args.arg_check(pos >= 1 && pos <= n + 1, 2, "position out of bounds")?;
            let v = args.arg(3);
            t.borrow_mut().insert(pos, v);
        }
        _ => return Err(LuaError::msg("wrong number of arguments to 'insert'")),
    }
    Ok(Rets::none())
}

fn table_remove(_rt: &mut Runtime, args: Varargs) -> Result<Rets, LuaError> {
    let t = args.check_table(1)?;
    let n = t.borrow().length();
    let pos = args.optional_int(2, n)?;
    // pos == n is always allowed, which covers removing from an empty table.
    if pos != n {
        args.arg_check(pos >= 1 && pos <= n + 1, 2, "position out of bounds")?;
    }
    let removed = t.borrow_mut().remove(pos);
    Ok(Rets::from(removed))
}

fn table_concat(_rt: &mut Runtime, args: Varargs) -> Result<Rets, LuaError> {
    let t = args.check_table(1)?;
    let sep = args.optional_str(2, "")?;
    let i = args.optional_int(3, 1)?;
    let j = match args.is_none_or_nil(4) {
        true => t.borrow().length(),
        false => args.check_int(4)?,
    };
    let joined = t.borrow().concat(sep.as_bytes(), i, j)?;
    Ok(Rets::from(Value::Str(joined)))
}

fn table_unpack(_rt: &mut Runtime, args: Varargs) -> Result<Rets, LuaError> {
    let t = args.check_table(1)?;
    let i = args.optional_int(2, 1)?;
    let j = match args.is_none_or_nil(3) {
        true => t.borrow().length(),
        false => args.check_int(3)?,
    };
    let values = t.borrow().unpack(i, j);
    Ok(Rets::Values(values))
}

fn table_pack(_rt: &mut Runtime, args: Varargs) -> Result<Rets, LuaError> {
    let mut t = Table::with_capacity(args.narg(), 1);
    for i in 1..=args.narg() {
        t.rawset_int(i as i32, args.arg(i));
    }
    t.rawset_str("n", Value::int(args.narg() as i32));
    Ok(Rets::from(Value::table(t)))
}

fn table_sort(rt: &mut Runtime, args: Varargs) -> Result<Rets, LuaError> {
    let t = args.check_table(1)?;
    let comparator = match args.is_none_or_nil(2) {
        true => None,
        false => Some(args.arg(2)),
    };
    table_ops::sort(rt, &t, comparator.as_ref())?;
    Ok(Rets::none())
}
