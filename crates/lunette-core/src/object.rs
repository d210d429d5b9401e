//! Function, thread and userdata payloads.

use crate::error::LuaError;
use crate::runtime::Runtime;
use crate::value::Value;
use crate::varargs::{Rets, Varargs};
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;

/// A function callable from Lua.
///
/// Both library functions and host-embedded callbacks use this shape: a named
/// closure invoked with the runtime context and the argument list. The return
/// value may be a pending tail call, which the caller's trampoline resolves.
pub struct LuaFunction {
    name: String,
    func: Box<dyn Fn(&mut Runtime, Varargs) -> Result<Rets, LuaError>>,
}

impl LuaFunction {
    pub fn new(
        name: impl Into<String>,
        func: impl Fn(&mut Runtime, Varargs) -> Result<Rets, LuaError> + 'static,
    ) -> LuaFunction {
        LuaFunction {
            name: name.into(),
            func: Box::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Invoke the function body once. The result may be a tail call; use the
    /// operator surface's `invoke` to have it resolved.
    pub fn on_invoke(&self, rt: &mut Runtime, args: Varargs) -> Result<Rets, LuaError> {
        (self.func)(rt, args)
    }
}

impl fmt::Debug for LuaFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "function: {}", self.name)
    }
}

/// Status of a coroutine value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ThreadStatus {
    Suspended,
    Running,
    Normal,
    Dead,
}

impl ThreadStatus {
    pub fn name(self) -> &'static str {
        match self {
            ThreadStatus::Suspended => "suspended",
            ThreadStatus::Running => "running",
            ThreadStatus::Normal => "normal",
            ThreadStatus::Dead => "dead",
        }
    }
}

/// A coroutine as a first-class value.
///
/// Scheduling and yielding live in the hosting layer; the core only needs
/// threads to exist in the value universe with identity and a status slot.
#[derive(Debug)]
pub struct LuaThread {
    status: Cell<ThreadStatus>,
}

impl LuaThread {
    pub fn new() -> LuaThread {
        LuaThread {
            status: Cell::new(ThreadStatus::Suspended),
        }
    }

    pub fn status(&self) -> ThreadStatus {
        self.status.get()
    }

    pub fn set_status(&self, s: ThreadStatus) {
        self.status.set(s);
    }
}

impl Default for LuaThread {
    fn default() -> Self {
        Self::new()
    }
}

/// A host object wrapped as a Lua value, with a per-instance metatable.
pub struct Userdata {
    data: RefCell<Box<dyn Any>>,
    metatable: RefCell<Option<Value>>,
}

impl Userdata {
    pub fn new(data: impl Any) -> Userdata {
        Userdata {
            data: RefCell::new(Box::new(data)),
            metatable: RefCell::new(None),
        }
    }

    pub fn with_metatable(data: impl Any, metatable: Value) -> Userdata {
        Userdata {
            data: RefCell::new(Box::new(data)),
            metatable: RefCell::new(Some(metatable)),
        }
    }

    pub fn get_metatable(&self) -> Option<Value> {
        self.metatable.borrow().clone()
    }

    pub fn set_metatable(&self, mt: Option<Value>) {
        *self.metatable.borrow_mut() = mt;
    }

    /// Borrow the payload downcast to `T`, or `None` on a type mismatch.
    pub fn with_data<T: Any, R>(&self, f: impl FnOnce(&T) -> R) -> Option<R> {
        let data = self.data.borrow();
        data.downcast_ref::<T>().map(f)
    }

    pub fn with_data_mut<T: Any, R>(&self, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        let mut data = self.data.borrow_mut();
        data.downcast_mut::<T>().map(f)
    }

    pub fn is<T: Any>(&self) -> bool {
        self.data.borrow().is::<T>()
    }
}

impl fmt::Debug for Userdata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "userdata: {:p}", self)
    }
}
