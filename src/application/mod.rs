// Application layer - use cases and orchestration

pub mod auth;
pub mod error;
pub mod service;

pub use auth::*;
pub use error::*;
pub use service::*;
