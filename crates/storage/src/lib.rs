#![forbid(unsafe_code)]

mod db;
mod entry;

pub use db::Db;
pub use entry::Value;
