// Database module
// SQLite-backed document store for plans, settings, and the conversation mirror

pub mod sqlite;

pub use sqlite::*;
