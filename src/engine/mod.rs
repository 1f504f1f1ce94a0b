//! Work-time computation and the attendance session state machine.

pub mod error;
pub mod mysql_store;
pub mod overtime;
pub mod retroactive;
pub mod session;
pub mod store;
pub mod sweeper;
pub mod time_window;

#[cfg(test)]
pub mod testing;
