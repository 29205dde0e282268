//! Secret types for protecting sensitive values from accidental logging.
//!
//! Re-exports [`secrecy`] so that every crate in the workspace reaches for the
//! same wrapper. `SecretString` redacts itself in `Debug`, so a config struct that
//! derives or hand-writes `Debug` never prints connection strings that carry
//! credentials (`postgres://user:pass@..`, `redis://:pass@..`).
//!
//! # Example
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//!
//! let redis_url = SecretString::from("redis://:hunter2@localhost:6379");
//! assert!(!format!("{redis_url:?}").contains("hunter2"));
//! assert!(redis_url.expose_secret().starts_with("redis://"));
//! ```
//!
//! Use `SecretString` for:
//! - Database and cache connection URLs
//! - User passwords on their way to the hasher
//! - Bearer tokens held outside of a request

pub use secrecy::{ExposeSecret, SecretBox, SecretString};
