#![forbid(unsafe_code)]

mod command;
mod connection;
mod frame;
mod parse;
mod script;

pub use command::{Command, SetCondition, SetOptions};
pub use connection::Connection;
pub use frame::Frame;
pub use parse::Parse;
pub use script::Script;
