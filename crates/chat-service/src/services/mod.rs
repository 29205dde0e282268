//! Business logic between the HTTP handlers and the repositories.

pub mod user_directory;
pub mod user_service;
pub mod validation;

pub use user_directory::UserDirectory;
