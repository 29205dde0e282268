//! Session handshake: the first frame on a new connection must be a chat token.

use crate::auth::TokenKeys;
use crate::errors::ChatError;
use axum::extract::ws::Message;
use futures::{Stream, StreamExt};
use std::time::Duration;
use tracing::{debug, instrument};

/// Read exactly one frame from `stream`, verify it as a chat token and return
/// the identity it carries.
///
/// Text frames are taken as the token. Binary frames are accepted only when
/// they are valid UTF-8. Anything else, a read error, end of stream, or no
/// frame within `timeout` fails with `AuthFailure`.
#[instrument(skip_all)]
pub async fn read_identity<S>(
    stream: &mut S,
    keys: &TokenKeys,
    timeout: Duration,
) -> Result<String, ChatError>
where
    S: Stream<Item = Result<Message, axum::Error>> + Unpin,
{
    let frame = match tokio::time::timeout(timeout, stream.next()).await {
        Ok(Some(Ok(frame))) => frame,
        Ok(Some(Err(e))) => {
            debug!(target: "chat.handshake", error = %e, "Read failed before token");
            return Err(ChatError::AuthFailure("read failed".to_string()));
        }
        Ok(None) => {
            return Err(ChatError::AuthFailure(
                "stream ended before token".to_string(),
            ))
        }
        Err(_) => {
            return Err(ChatError::AuthFailure(format!(
                "no token within {}s",
                timeout.as_secs()
            )))
        }
    };

    let token = match frame {
        Message::Text(text) => text,
        Message::Binary(bytes) => String::from_utf8(bytes)
            .map_err(|_| ChatError::AuthFailure("token frame is not UTF-8".to_string()))?,
        Message::Ping(_) | Message::Pong(_) | Message::Close(_) => {
            return Err(ChatError::AuthFailure(
                "first frame is not a token".to_string(),
            ))
        }
    };

    keys.verify(token.trim())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use futures::stream;

    fn keys() -> TokenKeys {
        TokenKeys::from_secret(b"handshake-test-secret", Duration::from_secs(60))
    }

    #[tokio::test]
    async fn test_text_token_is_accepted() {
        let keys = keys();
        let token = keys.issue("user01").unwrap();
        let mut frames = stream::iter(vec![Ok(Message::Text(token))]);

        let identity = read_identity(&mut frames, &keys, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(identity, "user01");
    }

    #[tokio::test]
    async fn test_binary_utf8_token_is_accepted() {
        let keys = keys();
        let token = keys.issue("user02").unwrap();
        let mut frames = stream::iter(vec![Ok(Message::Binary(token.into_bytes()))]);

        let identity = read_identity(&mut frames, &keys, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(identity, "user02");
    }

    #[tokio::test]
    async fn test_invalid_token_is_rejected() {
        let mut frames = stream::iter(vec![Ok(Message::Text("not-a-token".to_string()))]);

        let result = read_identity(&mut frames, &keys(), Duration::from_secs(1)).await;
        assert!(matches!(result, Err(ChatError::AuthFailure(_))));
    }

    #[tokio::test]
    async fn test_non_utf8_binary_is_rejected() {
        let mut frames = stream::iter(vec![Ok(Message::Binary(vec![0xff, 0xfe]))]);

        let result = read_identity(&mut frames, &keys(), Duration::from_secs(1)).await;
        assert!(matches!(result, Err(ChatError::AuthFailure(_))));
    }

    #[tokio::test]
    async fn test_close_frame_is_rejected() {
        let mut frames = stream::iter(vec![Ok(Message::Close(None))]);

        let result = read_identity(&mut frames, &keys(), Duration::from_secs(1)).await;
        assert!(matches!(result, Err(ChatError::AuthFailure(_))));
    }

    #[tokio::test]
    async fn test_end_of_stream_is_rejected() {
        let mut frames = stream::iter(Vec::<Result<Message, axum::Error>>::new());

        let result = read_identity(&mut frames, &keys(), Duration::from_secs(1)).await;
        assert!(matches!(result, Err(ChatError::AuthFailure(_))));
    }

    #[tokio::test]
    async fn test_read_error_is_rejected() {
        let err = axum::Error::new(std::io::Error::other("reset"));
        let mut frames = stream::iter(vec![Err(err)]);

        let result = read_identity(&mut frames, &keys(), Duration::from_secs(1)).await;
        assert!(matches!(result, Err(ChatError::AuthFailure(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_silent_client_times_out() {
        let mut frames = stream::pending::<Result<Message, axum::Error>>();

        let result = read_identity(&mut frames, &keys(), Duration::from_secs(10)).await;
        assert!(matches!(result, Err(ChatError::AuthFailure(_))));
    }
}
