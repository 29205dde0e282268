//! Observability for the chat service.
//!
//! Tracing targets: `chat.hub`, `chat.handshake`, `chat.pump`, `chat.directory`.

pub mod metrics;
