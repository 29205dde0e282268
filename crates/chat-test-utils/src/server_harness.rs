//! Test server harness for E2E testing
//!
//! Provides `TestChatServer` for spawning real chat server instances in tests.

use chat_service::auth::TokenKeys;
use chat_service::config::Config;
use chat_service::hub::ChatHub;
use chat_service::observability::metrics::detached_handle;
use chat_service::repositories::{InMemoryCredentialCache, InMemoryCredentialStore};
use chat_service::routes::{self, AppState};
use chat_service::services::UserDirectory;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;

/// Signing secret used by every test server.
pub const TEST_TOKEN_SECRET: &[u8] = b"chat-test-utils-secret-chat-test-utils-secret-chat-test-utils-se";

/// Test harness for spawning the chat server in E2E tests.
///
/// Uses the in-memory credential backend unless a directory is supplied.
///
/// # Example
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_health() -> anyhow::Result<()> {
///     let server = TestChatServer::spawn().await?;
///     let response = reqwest::get(format!("{}/health", server.url())).await?;
///     assert_eq!(response.status(), 200);
///     Ok(())
/// }
/// ```
pub struct TestChatServer {
    addr: SocketAddr,
    state: Arc<AppState>,
    _handle: JoinHandle<()>,
}

impl TestChatServer {
    /// Spawn a server with in-memory storage.
    pub async fn spawn() -> Result<Self, anyhow::Error> {
        let config = test_config()?;
        let directory = UserDirectory::new(
            Arc::new(InMemoryCredentialStore::new()),
            Arc::new(InMemoryCredentialCache::new(config.cache_ttl)),
        );
        Self::spawn_with_directory(config, directory).await
    }

    /// Spawn a server with a caller-supplied configuration and directory.
    pub async fn spawn_with_directory(
        config: Config,
        directory: UserDirectory,
    ) -> Result<Self, anyhow::Error> {
        let state = Arc::new(AppState {
            hub: Arc::new(ChatHub::new(config.peer_write_timeout)),
            directory,
            tokens: Arc::new(TokenKeys::from_secret(TEST_TOKEN_SECRET, config.token_ttl)),
            connections: TaskTracker::new(),
            config,
        });

        let app = routes::build_routes(Arc::clone(&state), detached_handle());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            state,
            _handle: handle,
        })
    }

    /// Base HTTP URL.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// WebSocket chat URL.
    pub fn ws_url(&self) -> String {
        format!("ws://{}/console-chat/chat", self.addr)
    }

    pub fn hub(&self) -> Arc<ChatHub> {
        Arc::clone(&self.state.hub)
    }

    pub fn directory(&self) -> &UserDirectory {
        &self.state.directory
    }

    /// Issue a valid chat token for `nickname`.
    pub fn issue_token(&self, nickname: &str) -> Result<String, anyhow::Error> {
        self.state
            .tokens
            .issue(nickname)
            .map_err(|e| anyhow::anyhow!("Failed to issue token: {}", e))
    }

    /// Wait until `nickname` is registered in the hub.
    pub async fn wait_for_member(&self, nickname: &str) -> Result<(), anyhow::Error> {
        self.wait_until(|hub| {
            let nickname = nickname.to_string();
            async move { hub.contains(&nickname).await }
        })
        .await
        .map_err(|_| anyhow::anyhow!("{} never joined the hub", nickname))
    }

    /// Wait until `nickname` is no longer registered in the hub.
    pub async fn wait_for_departure(&self, nickname: &str) -> Result<(), anyhow::Error> {
        self.wait_until(|hub| {
            let nickname = nickname.to_string();
            async move { !hub.contains(&nickname).await }
        })
        .await
        .map_err(|_| anyhow::anyhow!("{} never left the hub", nickname))
    }

    /// Stop every chat session the way process shutdown does and wait for
    /// them to finish.
    pub async fn shutdown_sessions(&self) -> Result<(), anyhow::Error> {
        self.state.hub.shutdown_token().cancel();
        self.state.connections.close();
        tokio::time::timeout(Duration::from_secs(5), self.state.connections.wait())
            .await
            .map_err(|_| {
                anyhow::anyhow!(
                    "{} chat sessions still open after shutdown",
                    self.state.connections.len()
                )
            })
    }

    async fn wait_until<F, Fut>(&self, mut check: F) -> Result<(), tokio::time::error::Elapsed>
    where
        F: FnMut(Arc<ChatHub>) -> Fut,
        Fut: std::future::Future<Output = bool>,
    {
        tokio::time::timeout(Duration::from_secs(5), async {
            while !check(self.hub()).await {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
    }
}

impl Drop for TestChatServer {
    fn drop(&mut self) {
        self._handle.abort();
    }
}

/// Configuration for tests: in-memory storage, short timeouts, cheapest
/// accepted bcrypt cost.
pub fn test_config() -> Result<Config, anyhow::Error> {
    let vars = HashMap::from([
        ("BIND_ADDRESS".to_string(), "127.0.0.1:0".to_string()),
        ("CHAT_HANDSHAKE_TIMEOUT_SECONDS".to_string(), "2".to_string()),
        ("CHAT_PEER_WRITE_TIMEOUT_MS".to_string(), "1000".to_string()),
        ("BCRYPT_COST".to_string(), "10".to_string()),
    ]);

    Config::from_vars(&vars).map_err(|e| anyhow::anyhow!("Failed to create config: {}", e))
}
