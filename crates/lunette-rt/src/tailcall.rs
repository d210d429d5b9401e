//! The tail-call trampoline.
//!
//! A function in tail position returns `Rets::TailCall { func, args }`
//! instead of invoking the callee, so its own frame unwinds first. The
//! trampoline then re-invokes until real values arrive: a chain of a million
//! tail calls costs one host stack frame, and each pending `func`/`args`
//! pair is released as soon as it has been resolved.

use crate::ops;
use lunette_core::error::LuaError;
use lunette_core::runtime::Runtime;
use lunette_core::varargs::{Rets, Varargs};

/// Resolve a pending invocation result down to plain values.
pub fn trampoline(rt: &mut Runtime, mut pending: Rets) -> Result<Varargs, LuaError> {
    loop {
        match pending {
            Rets::Values(vals) => return Ok(vals),
            Rets::TailCall { func, args } => {
                pending = ops::invoke_once(rt, &func, args)?;
            }
        }
    }
}
