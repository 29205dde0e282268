//! # Chat Test Utilities
//!
//! Shared test utilities for the Console Chat service.
//!
//! ## Modules
//!
//! - `server_harness` - in-process chat server on a random port
//! - `ws_client` - WebSocket chat client with receive timeouts
//! - `token_builders` - hand-crafted invalid chat tokens
//! - `mock_store` - counting credential store and cache with failure switches
//! - `peers` - recording and failing `PeerSink`s for hub tests
//!
//! ## Usage
//!
//! ```rust,ignore
//! use chat_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() -> anyhow::Result<()> {
//!     let server = TestChatServer::spawn().await?;
//!     let token = server.issue_token("user01")?;
//!
//!     let mut client = TestChatClient::connect_with_token(&server.ws_url(), &token).await?;
//!     server.wait_for_member("user01").await?;
//!
//!     client.send_text("Ping").await?;
//!     Ok(())
//! }
//! ```

pub mod mock_store;
pub mod peers;
pub mod server_harness;
pub mod token_builders;
pub mod ws_client;

pub use mock_store::{MockCredentialCache, MockCredentialStore};
pub use peers::{FailingPeer, Inbox, RecordingPeer, StalledPeer};
pub use server_harness::{test_config, TestChatServer, TEST_TOKEN_SECRET};
pub use ws_client::TestChatClient;
