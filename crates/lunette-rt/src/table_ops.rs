//! Table operations that need call dispatch.
//!
//! Raw list manipulation lives on `Table`; sorting is here because the
//! comparator (explicit or the default `<`) may invoke metamethods.

use crate::ops;
use lunette_core::error::LuaError;
use lunette_core::runtime::Runtime;
use lunette_core::table::Table;
use lunette_core::value::Value;
use lunette_core::varargs::Varargs;
use std::cell::RefCell;
use std::rc::Rc;

/// Sort `t[1..#t]` in place. `comparator`, when given, must behave as
/// "less than". A comparator that is not a strict weak order produces an
/// arbitrary permutation, never a panic; a comparator that errors aborts the
/// sort with that error.
pub fn sort(
    rt: &mut Runtime,
    table: &Rc<RefCell<Table>>,
    comparator: Option<&Value>,
) -> Result<(), LuaError> {
    let n = table.borrow().length();
    if n < 2 {
        return Ok(());
    }
    // Work on an extracted copy so comparator callbacks never observe a
    // mutably borrowed table.
    let mut vals: Vec<Value> = (1..=n).map(|i| table.borrow().rawget_int(i)).collect();
    heapsort(rt, &mut vals, comparator)?;
    let mut t = table.borrow_mut();
    for (i, v) in vals.into_iter().enumerate() {
        t.rawset_int(i as i32 + 1, v);
    }
    Ok(())
}

fn less(
    rt: &mut Runtime,
    comparator: Option<&Value>,
    a: &Value,
    b: &Value,
) -> Result<bool, LuaError> {
    match comparator {
        Some(f) => Ok(ops::call(rt, f, Varargs::pair(a.clone(), b.clone()))?.to_boolean()),
        None => ops::lt_b(rt, a, b),
    }
}

fn heapsort(
    rt: &mut Runtime,
    vals: &mut [Value],
    comparator: Option<&Value>,
) -> Result<(), LuaError> {
    let n = vals.len();
    for start in (0..n / 2).rev() {
        sift_down(rt, vals, start, n, comparator)?;
    }
    for end in (1..n).rev() {
        vals.swap(0, end);
        sift_down(rt, vals, 0, end, comparator)?;
    }
    Ok(())
}

fn sift_down(
    rt: &mut Runtime,
    vals: &mut [Value],
    mut root: usize,
    end: usize,
    comparator: Option<&Value>,
) -> Result<(), LuaError> {
    loop {
        let mut child = 2 * root + 1;
        if child >= end {
            return Ok(());
        }
        if child + 1 < end && less(rt, comparator, &vals[child], &vals[child + 1])? {
            child += 1;
        }
        if less(rt, comparator, &vals[root], &vals[child])? {
            vals.swap(root, child);
            root = child;
        } else {
            return Ok(());
        }
    }
}
