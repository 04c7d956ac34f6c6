//! Framed MessagePack client for the assistant server socket.

use anyhow::Context;
use bytes::Bytes;
use fpl_core::ipc::{AssistantRequest, AssistantResponse};
use futures::{SinkExt, StreamExt};
use std::path::Path;
use std::time::Duration;
use tokio::net::UnixStream;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::Retry;
use tokio_util::codec::{Framed, LengthDelimitedCodec};

const CONNECT_RETRIES: usize = 4;
const CONNECT_BASE_DELAY_MS: u64 = 50;

pub struct IpcClient {
    framed: Framed<UnixStream, LengthDelimitedCodec>,
}

impl IpcClient {
    /// Connect, retrying with exponential backoff while the server starts up.
    pub async fn connect(socket_path: &Path) -> anyhow::Result<Self> {
        let retry_strategy = ExponentialBackoff::from_millis(CONNECT_BASE_DELAY_MS)
            .max_delay(Duration::from_secs(2))
            .map(jitter)
            .take(CONNECT_RETRIES);

        let stream = Retry::spawn(retry_strategy, || UnixStream::connect(socket_path))
            .await
            .with_context(|| {
                format!(
                    "cannot reach the assistant at {} (is fpl-server running?)",
                    socket_path.display()
                )
            })?;

        tracing::debug!(socket = %socket_path.display(), "Connected to assistant");
        let codec = LengthDelimitedCodec::builder().little_endian().new_codec();
        Ok(Self {
            framed: Framed::new(stream, codec),
        })
    }

    /// Send one request and return the response's `data`, or the server error.
    pub async fn request(
        &mut self,
        request: &AssistantRequest,
    ) -> anyhow::Result<serde_json::Value> {
        let payload = rmp_serde::to_vec_named(request)?;
        self.framed.send(Bytes::from(payload)).await?;

        let frame = self
            .framed
            .next()
            .await
            .context("server closed the connection")??;
        let response: AssistantResponse = rmp_serde::from_slice(&frame)?;

        if !response.is_ok() {
            anyhow::bail!(response.error.unwrap_or_else(|| "unknown server error".to_string()));
        }
        Ok(response.data.unwrap_or(serde_json::Value::Null))
    }
}
