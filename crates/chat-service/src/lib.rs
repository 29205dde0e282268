//! Console Chat Service Library
//!
//! A real-time group chat: clients register, sign in for a chat token, then
//! open a WebSocket whose first frame is that token. Every text frame a
//! client sends afterwards is broadcast to every other connected client.
//!
//! # Architecture
//!
//! ```text
//! WebSocket ──► handshake (token → nickname) ──► ChatHub::add
//!                                                   │
//!            reader task ──mpsc──► relay ──► ChatHub::broadcast ──► other peers
//!
//! HTTP register / sign-in ──► UserDirectory ──► cache (Redis) ─┐
//!                                             └► store (Postgres)
//! ```
//!
//! # Modules
//!
//! - [`hub`] - connection registry and broadcast
//! - [`chat`] - handshake, message pump, chat line formats
//! - [`services`] - user directory, registration and sign-in, validation
//! - [`repositories`] - credential store and cache backends
//! - [`auth`] - chat tokens and password hashing
//! - [`routes`] / [`handlers`] - HTTP surface
//! - [`config`] - service configuration from environment
//! - [`errors`] - error type and HTTP mapping
//! - [`observability`] - metrics

pub mod auth;
pub mod chat;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod hub;
pub mod models;
pub mod observability;
pub mod repositories;
pub mod routes;
pub mod services;
