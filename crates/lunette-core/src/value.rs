//! The tagged value universe.
//!
//! One `Value` enum covers the nine Lua types. Scalars are held by value;
//! tables, functions, threads and userdata are shared by reference with
//! interior mutability, so cloning a `Value` clones a handle, never the
//! aggregate.

use crate::error::LuaError;
use crate::object::{LuaFunction, LuaThread, Userdata};
use crate::string::{self, LuaStr};
use crate::table::Table;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

/// Type enumeration constant for lua values that have no type.
pub const TNONE: i32 = -1;
/// Type enumeration constant for lua nil.
pub const TNIL: i32 = 0;
/// Type enumeration constant for lua booleans.
pub const TBOOLEAN: i32 = 1;
/// Type enumeration constant for light userdata, C-Lua compatibility only.
pub const TLIGHTUSERDATA: i32 = 2;
/// Type enumeration constant for lua numbers.
pub const TNUMBER: i32 = 3;
/// Type enumeration constant for lua strings.
pub const TSTRING: i32 = 4;
/// Type enumeration constant for lua tables.
pub const TTABLE: i32 = 5;
/// Type enumeration constant for lua functions.
pub const TFUNCTION: i32 = 6;
/// Type enumeration constant for lua userdata.
pub const TUSERDATA: i32 = 7;
/// Type enumeration constant for lua threads.
pub const TTHREAD: i32 = 8;
/// Type enumeration constant for unknown values, C-Lua compatibility only.
pub const TVALUE: i32 = 9;

/// A Lua value.
#[derive(Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    /// A number that fits 32-bit two's-complement.
    Int(i32),
    /// Any other number.
    Num(f64),
    Str(Rc<LuaStr>),
    Table(Rc<RefCell<Table>>),
    Function(Rc<LuaFunction>),
    Thread(Rc<LuaThread>),
    Userdata(Rc<Userdata>),
}

impl Value {
    // ---- Constructors ----

    pub const TRUE: Value = Value::Bool(true);
    pub const FALSE: Value = Value::Bool(false);
    pub const ZERO: Value = Value::Int(0);
    pub const ONE: Value = Value::Int(1);

    #[inline]
    pub fn int(i: i32) -> Value {
        Value::Int(i)
    }

    /// Number constructor: collapses to `Int` exactly when the double holds
    /// an int-representable value.
    #[inline]
    pub fn number(d: f64) -> Value {
        if d == (d as i32) as f64 {
            Value::Int(d as i32)
        } else {
            Value::Num(d)
        }
    }

    /// 64-bit constructor: `Int` when the value fits, double otherwise.
    #[inline]
    pub fn long(l: i64) -> Value {
        if l == (l as i32) as i64 {
            Value::Int(l as i32)
        } else {
            Value::Num(l as f64)
        }
    }

    pub fn str(s: impl Into<String>) -> Value {
        Value::Str(LuaStr::new(s.into().into_bytes()))
    }

    pub fn bytes(b: impl Into<Vec<u8>>) -> Value {
        Value::Str(LuaStr::new(b.into()))
    }

    pub fn table(t: Table) -> Value {
        Value::Table(Rc::new(RefCell::new(t)))
    }

    pub fn new_table() -> Value {
        Value::table(Table::new())
    }

    pub fn function(f: LuaFunction) -> Value {
        Value::Function(Rc::new(f))
    }

    pub fn userdata(u: Userdata) -> Value {
        Value::Userdata(Rc::new(u))
    }

    // ---- Type queries ----

    /// The integer type tag.
    pub fn type_(&self) -> i32 {
        match self {
            Value::Nil => TNIL,
            Value::Bool(_) => TBOOLEAN,
            Value::Int(_) | Value::Num(_) => TNUMBER,
            Value::Str(_) => TSTRING,
            Value::Table(_) => TTABLE,
            Value::Function(_) => TFUNCTION,
            Value::Thread(_) => TTHREAD,
            Value::Userdata(_) => TUSERDATA,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "boolean",
            Value::Int(_) | Value::Num(_) => "number",
            Value::Str(_) => "string",
            Value::Table(_) => "table",
            Value::Function(_) => "function",
            Value::Thread(_) => "thread",
            Value::Userdata(_) => "userdata",
        }
    }

    #[inline]
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    #[inline]
    pub fn is_boolean(&self) -> bool {
        matches!(self, Value::Bool(_))
    }

    /// True for the `Int` representation only; no string conversion.
    #[inline]
    pub fn is_int(&self) -> bool {
        matches!(self, Value::Int(_))
    }

    /// True for numbers and for strings convertible to numbers.
    pub fn is_number(&self) -> bool {
        match self {
            Value::Int(_) | Value::Num(_) => true,
            Value::Str(s) => s.to_number().is_some(),
            _ => false,
        }
    }

    /// True for strings and numbers (all numbers convert to strings).
    pub fn is_string(&self) -> bool {
        matches!(self, Value::Str(_) | Value::Int(_) | Value::Num(_))
    }

    #[inline]
    pub fn is_table(&self) -> bool {
        matches!(self, Value::Table(_))
    }

    #[inline]
    pub fn is_function(&self) -> bool {
        matches!(self, Value::Function(_))
    }

    #[inline]
    pub fn is_thread(&self) -> bool {
        matches!(self, Value::Thread(_))
    }

    #[inline]
    pub fn is_userdata(&self) -> bool {
        matches!(self, Value::Userdata(_))
    }

    /// True if the value may be used as a table key.
    pub fn is_valid_key(&self) -> bool {
        match self {
            Value::Nil => false,
            Value::Num(d) => !d.is_nan(),
            _ => true,
        }
    }

    // ---- Lossy conversions (never error) ----

    /// Lua truthiness: false only for nil and `false`.
    #[inline]
    pub fn to_boolean(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    /// Numeric value as i32, truncating; 0 for non-numeric values.
    pub fn to_int(&self) -> i32 {
        match self {
            Value::Int(i) => *i,
            Value::Num(d) => (*d as i64) as i32,
            Value::Str(s) => s.to_number().map_or(0, |n| n.to_int()),
            _ => 0,
        }
    }

    /// Numeric value as i64, truncating; 0 for non-numeric values.
    pub fn to_long(&self) -> i64 {
        match self {
            Value::Int(i) => *i as i64,
            Value::Num(d) => *d as i64,
            Value::Str(s) => s.to_number().map_or(0, |n| n.to_long()),
            _ => 0,
        }
    }

    /// Numeric value as f64; 0 for non-numeric values.
    pub fn to_double(&self) -> f64 {
        match self {
            Value::Int(i) => *i as f64,
            Value::Num(d) => *d,
            Value::Str(s) => s.to_number().map_or(0.0, |n| n.to_double()),
            _ => 0.0,
        }
    }

    /// Human-readable form: the string content for strings, Lua number
    /// formatting for numbers, and a type-prefixed address label for
    /// reference values.
    pub fn to_display(&self) -> String {
        format!("{}", self)
    }

    // ---- Conditional conversions ----

    /// `Some(number)` if this is a number or a string convertible to one.
    pub fn to_number(&self) -> Option<Value> {
        match self {
            Value::Int(_) | Value::Num(_) => Some(self.clone()),
            Value::Str(s) => s.to_number(),
            _ => None,
        }
    }

    /// `Some(str)` if this is a string or a number (numbers format as
    /// strings).
    pub fn to_lua_string(&self) -> Option<Rc<LuaStr>> {
        match self {
            Value::Str(s) => Some(Rc::clone(s)),
            Value::Int(i) => Some(LuaStr::new(i.to_string().into_bytes())),
            Value::Num(d) => Some(LuaStr::new(string::format_double(*d).into_bytes())),
            _ => None,
        }
    }

    // ---- Raw equality (no metamethods) ----

    /// Equality without metamethod processing: numbers compare
    /// mathematically across representations, strings by byte content,
    /// reference types by identity. String never equals number.
    pub fn raweq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Num(a), Value::Num(b)) => a == b,
            (Value::Int(a), Value::Num(b)) => (*a as f64) == *b,
            (Value::Num(a), Value::Int(b)) => *a == (*b as f64),
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Table(a), Value::Table(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Thread(a), Value::Thread(b)) => Rc::ptr_eq(a, b),
            (Value::Userdata(a), Value::Userdata(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Address identity for reference types, `None` for scalars.
    pub fn obj_addr(&self) -> Option<usize> {
        match self {
            Value::Table(t) => Some(Rc::as_ptr(t) as usize),
            Value::Function(f) => Some(Rc::as_ptr(f) as usize),
            Value::Thread(t) => Some(Rc::as_ptr(t) as usize),
            Value::Userdata(u) => Some(Rc::as_ptr(u) as usize),
            _ => None,
        }
    }

    /// Downgrade a reference value to a weak handle, `None` for scalars and
    /// strings (which behave as values in weak tables).
    pub fn downgrade(&self) -> Option<WeakRef> {
        match self {
            Value::Table(t) => Some(WeakRef::Table(Rc::downgrade(t))),
            Value::Function(f) => Some(WeakRef::Function(Rc::downgrade(f))),
            Value::Thread(t) => Some(WeakRef::Thread(Rc::downgrade(t))),
            Value::Userdata(u) => Some(WeakRef::Userdata(Rc::downgrade(u))),
            _ => None,
        }
    }

    // ---- Fallible conversions (the check family) ----

    fn type_error<T>(&self, expected: &'static str) -> Result<T, LuaError> {
        Err(LuaError::Type {
            expected,
            got: self.type_name(),
        })
    }

    pub fn check_boolean(&self) -> Result<bool, LuaError> {
        match self {
            Value::Bool(b) => Ok(*b),
            _ => self.type_error("boolean"),
        }
    }

    /// Number or numeric string, truncated to i32.
    pub fn check_int(&self) -> Result<i32, LuaError> {
        self.check_number().map(|n| n.to_int())
    }

    /// Number or numeric string, truncated to i64.
    pub fn check_long(&self) -> Result<i64, LuaError> {
        self.check_number().map(|n| n.to_long())
    }

    pub fn check_double(&self) -> Result<f64, LuaError> {
        self.check_number().map(|n| n.to_double())
    }

    pub fn check_number(&self) -> Result<Value, LuaError> {
        self.to_number()
            .ok_or(LuaError::Type {
                expected: "number",
                got: self.type_name(),
            })
    }

    pub fn check_str(&self) -> Result<Rc<LuaStr>, LuaError> {
        self.to_lua_string().ok_or(LuaError::Type {
            expected: "string",
            got: self.type_name(),
        })
    }

    pub fn check_table(&self) -> Result<Rc<RefCell<Table>>, LuaError> {
        match self {
            Value::Table(t) => Ok(Rc::clone(t)),
            _ => self.type_error("table"),
        }
    }

    pub fn check_function(&self) -> Result<Rc<LuaFunction>, LuaError> {
        match self {
            Value::Function(f) => Ok(Rc::clone(f)),
            _ => self.type_error("function"),
        }
    }

    pub fn check_thread(&self) -> Result<Rc<LuaThread>, LuaError> {
        match self {
            Value::Thread(t) => Ok(Rc::clone(t)),
            _ => self.type_error("thread"),
        }
    }

    pub fn check_userdata(&self) -> Result<Rc<Userdata>, LuaError> {
        match self {
            Value::Userdata(u) => Ok(Rc::clone(u)),
            _ => self.type_error("userdata"),
        }
    }

    pub fn check_not_nil(&self) -> Result<Value, LuaError> {
        match self {
            Value::Nil => self.type_error("value"),
            v => Ok(v.clone()),
        }
    }

    // ---- Defaulted conversions (the optional family) ----

    pub fn optional_boolean(&self, defval: bool) -> Result<bool, LuaError> {
        match self {
            Value::Nil => Ok(defval),
            v => v.check_boolean(),
        }
    }

    pub fn optional_int(&self, defval: i32) -> Result<i32, LuaError> {
        match self {
            Value::Nil => Ok(defval),
            v => v.check_int(),
        }
    }

    pub fn optional_long(&self, defval: i64) -> Result<i64, LuaError> {
        match self {
            Value::Nil => Ok(defval),
            v => v.check_long(),
        }
    }

    pub fn optional_double(&self, defval: f64) -> Result<f64, LuaError> {
        match self {
            Value::Nil => Ok(defval),
            v => v.check_double(),
        }
    }

    pub fn optional_str(&self, defval: &str) -> Result<Rc<LuaStr>, LuaError> {
        match self {
            Value::Nil => Ok(LuaStr::from_str(defval)),
            v => v.check_str(),
        }
    }

    pub fn optional_value(&self, defval: &Value) -> Value {
        match self {
            Value::Nil => defval.clone(),
            v => v.clone(),
        }
    }
}

/// Equality follows `raweq`: convenient for tests and table internals, and
/// exactly the comparison Lua performs before metamethods are consulted.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.raweq(other)
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Nil
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => f.write_str("nil"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Num(d) => f.write_str(&string::format_double(*d)),
            Value::Str(s) => write!(f, "{}", s),
            Value::Table(t) => write!(f, "table: {:#x}", Rc::as_ptr(t) as usize),
            Value::Function(fun) => write!(f, "function: {}", fun.name()),
            Value::Thread(t) => write!(f, "thread: {:#x}", Rc::as_ptr(t) as usize),
            Value::Userdata(u) => write!(f, "userdata: {:#x}", Rc::as_ptr(u) as usize),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => write!(f, "{:?}", s),
            other => fmt::Display::fmt(other, f),
        }
    }
}

/// A weak handle to a reference-typed value, used by weak-mode tables.
#[derive(Clone, Debug)]
pub enum WeakRef {
    Table(Weak<RefCell<Table>>),
    Function(Weak<LuaFunction>),
    Thread(Weak<LuaThread>),
    Userdata(Weak<Userdata>),
}

impl WeakRef {
    /// The value, if the referent is still alive.
    pub fn upgrade(&self) -> Option<Value> {
        match self {
            WeakRef::Table(w) => w.upgrade().map(Value::Table),
            WeakRef::Function(w) => w.upgrade().map(Value::Function),
            WeakRef::Thread(w) => w.upgrade().map(Value::Thread),
            WeakRef::Userdata(w) => w.upgrade().map(Value::Userdata),
        }
    }

    pub fn is_dead(&self) -> bool {
        match self {
            WeakRef::Table(w) => w.strong_count() == 0,
            WeakRef::Function(w) => w.strong_count() == 0,
            WeakRef::Thread(w) => w.strong_count() == 0,
            WeakRef::Userdata(w) => w.strong_count() == 0,
        }
    }
}
