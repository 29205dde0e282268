//! HTTP handlers.

pub mod chat;
pub mod health;
pub mod metrics;
pub mod users;

pub use chat::chat_upgrade;
pub use health::health_check;
pub use metrics::metrics_handler;
pub use users::{register_user, sign_in_user};
