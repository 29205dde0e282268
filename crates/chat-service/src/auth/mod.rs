//! Authentication primitives for the chat service.
//!
//! - `jwt` - HS256 chat tokens carrying the `nickname` claim
//! - `password` - bcrypt hashing and verification

pub mod jwt;
pub mod password;

pub use jwt::TokenKeys;
