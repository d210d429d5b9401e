//! lunette core types: the Lua 5.2 value universe and its storage.

pub mod buffer;
pub mod error;
pub mod object;
pub mod runtime;
pub mod string;
pub mod table;
pub mod value;
pub mod varargs;

pub use error::LuaError;
pub use runtime::{Runtime, TypeKind};
pub use value::Value;
pub use varargs::{Rets, Varargs};
