//! lunette runtime: operator semantics and metamethod dispatch over the
//! core value model.

pub mod arith;
pub mod compare;
pub mod metamethod;
pub mod ops;
pub mod table_ops;
pub mod tailcall;
