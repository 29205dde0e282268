//! `PeerSink` doubles for driving `ChatHub` without sockets.

use async_trait::async_trait;
use chat_service::errors::ChatError;
use chat_service::hub::PeerSink;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Frames written to a [`RecordingPeer`].
#[derive(Clone, Default)]
pub struct Inbox {
    frames: Arc<Mutex<Vec<String>>>,
}

impl Inbox {
    pub fn frames(&self) -> Vec<String> {
        self.frames.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.frames.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Sink that records every frame.
pub struct RecordingPeer {
    inbox: Inbox,
}

impl RecordingPeer {
    /// Returns the boxed sink and a handle to what it receives.
    pub fn new() -> (Box<dyn PeerSink>, Inbox) {
        let inbox = Inbox::default();
        let peer = Self {
            inbox: inbox.clone(),
        };
        (Box::new(peer), inbox)
    }
}

#[async_trait]
impl PeerSink for RecordingPeer {
    async fn send_text(&mut self, text: String) -> Result<(), ChatError> {
        self.inbox.frames.lock().unwrap().push(text);
        Ok(())
    }
}

/// Sink whose every write fails.
pub struct FailingPeer;

impl FailingPeer {
    pub fn boxed() -> Box<dyn PeerSink> {
        Box::new(Self)
    }
}

#[async_trait]
impl PeerSink for FailingPeer {
    async fn send_text(&mut self, _text: String) -> Result<(), ChatError> {
        Err(ChatError::Transport("broken pipe".to_string()))
    }
}

/// Sink whose writes take `delay` before succeeding.
pub struct StalledPeer {
    delay: Duration,
}

impl StalledPeer {
    pub fn boxed(delay: Duration) -> Box<dyn PeerSink> {
        Box::new(Self { delay })
    }
}

#[async_trait]
impl PeerSink for StalledPeer {
    async fn send_text(&mut self, _text: String) -> Result<(), ChatError> {
        tokio::time::sleep(self.delay).await;
        Ok(())
    }
}
