//! SQLite backend for the storefront.
mod sqlite_impl;

pub mod db;
pub use sqlite_impl::SqliteDatabase;
