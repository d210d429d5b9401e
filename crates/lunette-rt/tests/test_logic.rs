//! Truthiness-driven operators (`and`/`or`/`not`), length, and tostring.

mod common;

use common::*;
use lunette_core::runtime::Runtime;
use lunette_core::value::Value;
use lunette_rt::metamethod::{self, metatable_of};
use lunette_rt::ops;

fn sample_values() -> Vec<Value> {
    vec![
        Value::Nil,
        Value::FALSE,
        Value::TRUE,
        Value::ZERO,
        Value::number(0.5),
        Value::str(""),
        Value::str("x"),
        Value::new_table(),
    ]
}

#[test]
fn truthiness_is_false_only_for_nil_and_false() {
    for v in sample_values() {
        let expected = !matches!(v, Value::Nil | Value::Bool(false));
        assert_eq!(v.to_boolean(), expected, "truthiness of {:?}", v);
    }
}

#[test]
fn and_or_return_an_operand_not_a_boolean() {
    for a in sample_values() {
        for b in sample_values() {
            let and = ops::and(&a, &b);
            let or = ops::or(&a, &b);
            if a.to_boolean() {
                assert!(and.raweq(&b));
                assert!(or.raweq(&a));
            } else {
                assert!(and.raweq(&a));
                assert!(or.raweq(&b));
            }
        }
    }
    // 0 is truthy, so `0 and "x"` is "x", `0 or "x"` is 0.
    assert_eq!(ops::and(&Value::ZERO, &Value::str("x")), Value::str("x"));
    assert_eq!(ops::or(&Value::ZERO, &Value::str("x")), Value::ZERO);
}

#[test]
fn not_always_returns_a_boolean() {
    assert_eq!(ops::not(&Value::Nil), Value::TRUE);
    assert_eq!(ops::not(&Value::FALSE), Value::TRUE);
    assert_eq!(ops::not(&Value::ZERO), Value::FALSE);
    assert_eq!(ops::not(&Value::str("")), Value::FALSE);
}

#[test]
fn len_of_strings_counts_bytes() {
    let mut rt = Runtime::new();
    assert_eq!(ops::len(&mut rt, &Value::str("hello")).unwrap(), Value::int(5));
    assert_eq!(ops::len(&mut rt, &Value::str("")).unwrap(), Value::int(0));
    assert_eq!(
        ops::len(&mut rt, &Value::bytes(vec![0u8, 1, 2])).unwrap(),
        Value::int(3)
    );
}

#[test]
fn len_of_dense_tables_counts_elements() {
    let mut rt = Runtime::new();
    let t = Value::new_table();
    for i in 1..=6 {
        ops::set(&mut rt, &t, &Value::int(i), Value::int(i * 10)).unwrap();
    }
    assert_eq!(ops::len(&mut rt, &t).unwrap(), Value::int(6));
    assert_eq!(ops::rawlen(&t).unwrap(), 6);
}

#[test]
fn len_metamethod_overrides_the_border() {
    let mut rt = Runtime::new();
    let t = Value::new_table();
    ops::set(&mut rt, &t, &Value::int(1), Value::str("a")).unwrap();
    let mt = metatable_of(vec![(
        metamethod::LEN,
        fn2("fixed", |_, _, _| Ok(Value::int(42))),
    )]);
    metamethod::setmetatable(&mut rt, &t, &mt).unwrap();
    assert_eq!(ops::len(&mut rt, &t).unwrap(), Value::int(42));
    // rawlen ignores the metamethod.
    assert_eq!(ops::rawlen(&t).unwrap(), 1);
}

#[test]
fn len_errors_for_unmeasurable_values() {
    let mut rt = Runtime::new();
    let err = ops::len(&mut rt, &Value::TRUE).unwrap_err();
    assert_eq!(err.to_string(), "attempt to get length of a boolean value");
    let err = ops::rawlen(&Value::int(3)).unwrap_err();
    assert_eq!(err.to_string(), "table or string expected, got number");
}

#[test]
fn tostring_uses_the_metamethod_when_present() {
    let mut rt = Runtime::new();
    let t = Value::new_table();
    assert!(ops::tostring(&mut rt, &t)
        .unwrap()
        .to_display()
        .starts_with("table: 0x"));

    let mt = metatable_of(vec![(
        metamethod::TOSTRING,
        fn2("pretty", |_, _, _| Ok(Value::str("<pretty>"))),
    )]);
    metamethod::setmetatable(&mut rt, &t, &mt).unwrap();
    assert_eq!(ops::tostring(&mut rt, &t).unwrap(), Value::str("<pretty>"));
}

#[test]
fn tostring_formats_numbers_like_lua() {
    let mut rt = Runtime::new();
    assert_eq!(ops::tostring(&mut rt, &Value::int(123)).unwrap(), Value::str("123"));
    assert_eq!(
        ops::tostring(&mut rt, &Value::number(1.5)).unwrap(),
        Value::str("1.5")
    );
    assert_eq!(
        ops::tostring(&mut rt, &Value::Num(f64::NAN)).unwrap(),
        Value::str("nan")
    );
    assert_eq!(
        ops::tostring(&mut rt, &Value::Num(f64::NEG_INFINITY)).unwrap(),
        Value::str("-inf")
    );
    assert_eq!(ops::tostring(&mut rt, &Value::Nil).unwrap(), Value::str("nil"));
}
