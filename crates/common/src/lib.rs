//! Common utilities and types shared across console-chat components.

#![warn(clippy::pedantic)]

/// Module for secret types that prevent accidental logging
pub mod secret;

/// Module for chat token claims and pre-parse limits
pub mod jwt;
