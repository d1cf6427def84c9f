pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod service;

pub use error::AuthError;
pub use router::{AuthState, auth_router, build_app};
