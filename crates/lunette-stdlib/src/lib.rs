//! lunette standard libraries: the base and table modules.

pub mod base;
pub mod table_lib;

use lunette_core::runtime::Runtime;

/// Register every library into the runtime's globals.
pub fn register_all(rt: &mut Runtime) {
    base::register(rt);
    table_lib::register(rt);
}
