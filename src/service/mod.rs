pub mod startup;

pub use startup::{SYNC_FAILED_REASON, SchemaStatus, StartupOptions, prepare_storage};
