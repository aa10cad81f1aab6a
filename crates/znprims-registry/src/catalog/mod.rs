//! Built-in command tables.
//!
//! Covers the transport-level commands a coordinator needs; further
//! definitions can be added with [`CommandRegistry::register`](crate::CommandRegistry::register).

mod af;
mod app_cnf;
mod sys;
mod util;
mod zdo;

use crate::definition::CommandDefinition;

pub use af::AF;
pub use app_cnf::APP_CNF;
pub use sys::SYS;
pub use util::UTIL;
pub use zdo::ZDO;

/// Every built-in table, in subsystem order.
pub fn tables() -> [&'static [CommandDefinition]; 5] {
    [SYS, AF, ZDO, UTIL, APP_CNF]
}
