//! Table library behavior.

use lunette_core::object::LuaFunction;
use lunette_core::runtime::Runtime;
use lunette_core::value::Value;
use lunette_core::varargs::{Rets, Varargs};
use lunette_rt::ops;

fn fresh() -> Runtime {
    let mut rt = Runtime::new();
    lunette_stdlib::register_all(&mut rt);
    rt
}

fn table_fn(rt: &mut Runtime, name: &str) -> Value {
    let g = rt.globals.clone();
    let module = ops::get(rt, &g, &Value::str("table")).unwrap();
    ops::get(rt, &module, &Value::str(name)).unwrap()
}

fn call(rt: &mut Runtime, name: &str, args: Vec<Value>) -> Result<Varargs, lunette_core::LuaError> {
    let f = table_fn(rt, name);
    ops::invoke(rt, &f, Varargs::of(args))
}

fn list(rt: &mut Runtime, vals: &[&str]) -> Value {
    let t = Value::new_table();
    for (i, v) in vals.iter().enumerate() {
        ops::set(rt, &t, &Value::int(i as i32 + 1), Value::str(*v)).unwrap();
    }
    t
}

fn snapshot(rt: &mut Runtime, t: &Value) -> Vec<String> {
    let n = ops::len(rt, t).unwrap().to_int();
    (1..=n)
        .map(|i| ops::get(rt, t, &Value::int(i)).unwrap().to_display())
        .collect()
}

#[test]
fn insert_appends_or_shifts() {
    let mut rt = fresh();
    let t = list(&mut rt, &["a", "c"]);
    call(&mut rt, "insert", vec![t.clone(), Value::str("d")]).unwrap();
    assert_eq!(snapshot(&mut rt, &t), vec!["a", "c", "d"]);
    call(
        &mut rt,
        "insert",
        vec![t.clone(), Value::int(2), Value::str("b")],
    )
    .unwrap();
    assert_eq!(snapshot(&mut rt, &t), vec!["a", "b", "c", "d"]);

    let err = call(
        &mut rt,
        "insert",
        vec![t.clone(), Value::int(99), Value::str("x")],
    )
    .unwrap_err();
    assert_eq!(err.to_string(), "bad argument #2 (position out of bounds)");
}

#[test]
fn remove_returns_the_removed_element() {
    let mut rt = fresh();
    let t = list(&mut rt, &["a", "b", "c"]);
    let out = call(&mut rt, "remove", vec![t.clone(), Value::int(2)]).unwrap();
    assert_eq!(out.arg1(), Value::str("b"));
    assert_eq!(snapshot(&mut rt, &t), vec!["a", "c"]);

    // Default position is the end.
    let out = call(&mut rt, "remove", vec![t.clone()]).unwrap();
    assert_eq!(out.arg1(), Value::str("c"));

    let empty = Value::new_table();
    let out = call(&mut rt, "remove", vec![empty.clone()]).unwrap();
    assert_eq!(out.arg1(), Value::Nil);
    // An explicit position equal to the length is accepted even when the
    // table is empty: remove(t, 0) on {} returns nil rather than erroring.
    let out = call(&mut rt, "remove", vec![empty, Value::int(0)]).unwrap();
    assert_eq!(out.arg1(), Value::Nil);

    let t = list(&mut rt, &["a"]);
    let err = call(&mut rt, "remove", vec![t, Value::int(3)]).unwrap_err();
    assert_eq!(err.to_string(), "bad argument #2 (position out of bounds)");
}

#[test]
fn concat_joins_ranges() {
    let mut rt = fresh();
    let t = list(&mut rt, &["a", "b", "c"]);
    let out = call(&mut rt, "concat", vec![t.clone()]).unwrap();
    assert_eq!(out.arg1(), Value::str("abc"));
    let out = call(&mut rt, "concat", vec![t.clone(), Value::str(",")]).unwrap();
    assert_eq!(out.arg1(), Value::str("a,b,c"));
    let out = call(
        &mut rt,
        "concat",
        vec![t.clone(), Value::str("-"), Value::int(2), Value::int(3)],
    )
    .unwrap();
    assert_eq!(out.arg1(), Value::str("b-c"));

    let bad = Value::new_table();
    ops::set(&mut rt, &bad, &Value::int(1), Value::TRUE).unwrap();
    let err = call(&mut rt, "concat", vec![bad]).unwrap_err();
    assert_eq!(
        err.to_string(),
        "invalid value (at index 1) in table for 'concat'"
    );
}

#[test]
fn unpack_and_pack_are_inverses_enough() {
    let mut rt = fresh();
    let t = list(&mut rt, &["a", "b", "c"]);
    let out = call(&mut rt, "unpack", vec![t.clone()]).unwrap();
    assert_eq!(out.narg(), 3);
    assert_eq!(out.arg(2), Value::str("b"));
    let out = call(
        &mut rt,
        "unpack",
        vec![t.clone(), Value::int(2), Value::int(3)],
    )
    .unwrap();
    assert_eq!(out.narg(), 2);
    assert_eq!(out.arg1(), Value::str("b"));

    let packed = call(
        &mut rt,
        "pack",
        vec![Value::str("x"), Value::str("y")],
    )
    .unwrap()
    .arg1();
    assert_eq!(
        ops::get(&mut rt, &packed, &Value::str("n")).unwrap(),
        Value::int(2)
    );
    assert_eq!(
        ops::get(&mut rt, &packed, &Value::int(1)).unwrap(),
        Value::str("x")
    );
}

#[test]
fn sort_default_and_custom_orders() {
    let mut rt = fresh();
    let t = list(&mut rt, &["pear", "apple", "mango"]);
    call(&mut rt, "sort", vec![t.clone()]).unwrap();
    assert_eq!(snapshot(&mut rt, &t), vec!["apple", "mango", "pear"]);

    let desc = Value::function(LuaFunction::new("desc", |rt, args: Varargs| {
        let a = args.check_value(1)?;
        let b = args.check_value(2)?;
        ops::gt(rt, &a, &b).map(Rets::from)
    }));
    call(&mut rt, "sort", vec![t.clone(), desc]).unwrap();
    assert_eq!(snapshot(&mut rt, &t), vec!["pear", "mango", "apple"]);
}

#[test]
fn sort_surfaces_comparator_errors() {
    let mut rt = fresh();
    let t = list(&mut rt, &["b", "a"]);
    let broken = Value::function(LuaFunction::new("broken", |_, _| {
        Err(lunette_core::LuaError::Value(Value::str("cmp failed")))
    }));
    let err = call(&mut rt, "sort", vec![t, broken]).unwrap_err();
    assert_eq!(err.to_string(), "cmp failed");
}
