#![forbid(unsafe_code)]

pub mod handler;
mod listener;

pub use handler::{execute_command, handle_connection};
pub use listener::serve;
