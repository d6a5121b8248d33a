//! Background work owned by the server process.

pub mod watcher;
