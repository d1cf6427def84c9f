//! Database module: entity declarations and persistent storage.
//!
//! Layout:
//! - `schema.rs`: entity declarations and the SQL DDL derived from them (SQLite-first)
//! - `models.rs`: Rust structs mirroring DB rows
//! - `sqlite.rs`: pool construction, schema synchronization and user records

pub mod models;
pub mod schema;
pub mod sqlite;

pub use models::{DbUser, NewUser};
pub use schema::{EntitySpec, FieldSpec, FieldType, USER_ENTITY};
pub use sqlite::{SqlitePool, UserStorage, connect_lazy};
