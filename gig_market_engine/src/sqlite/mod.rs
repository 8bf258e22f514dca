//! SQLite backend for the gig marketplace engine.
mod sqlite_impl;

pub mod db;

pub use sqlite_impl::SqliteDatabase;
