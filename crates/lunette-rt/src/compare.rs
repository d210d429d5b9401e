//! The raw ordered-comparison kernel.
//!
//! Only number/number and string/string pairs compare directly; everything
//! else — including number against numeric string — is handed to metamethod
//! dispatch by the operator surface.

use lunette_core::value::Value;

pub enum CompareEval {
    Ok(bool),
    NeedMetamethod,
}

pub fn raw_lt(a: &Value, b: &Value) -> CompareEval {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => CompareEval::Ok(x < y),
        (Value::Int(x), Value::Num(y)) => CompareEval::Ok((*x as f64) < *y),
        (Value::Num(x), Value::Int(y)) => CompareEval::Ok(*x < (*y as f64)),
        (Value::Num(x), Value::Num(y)) => CompareEval::Ok(x < y),
        (Value::Str(x), Value::Str(y)) => CompareEval::Ok(x < y),
        _ => CompareEval::NeedMetamethod,
    }
}

pub fn raw_le(a: &Value, b: &Value) -> CompareEval {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => CompareEval::Ok(x <= y),
        (Value::Int(x), Value::Num(y)) => CompareEval::Ok((*x as f64) <= *y),
        (Value::Num(x), Value::Int(y)) => CompareEval::Ok(*x <= (*y as f64)),
        (Value::Num(x), Value::Num(y)) => CompareEval::Ok(x <= y),
        (Value::Str(x), Value::Str(y)) => CompareEval::Ok(x <= y),
        _ => CompareEval::NeedMetamethod,
    }
}
