#![forbid(unsafe_code)]

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use anyhow::Context;
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::protocol::Message;
use tracing::debug;
use url::Url;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub type RoomWs = tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// One live connection delivering raw textual payloads until closed.
///
/// The boundary the engine depends on: a pull of the next text frame plus a
/// best-effort close. Implemented over WebSocket for production and over
/// channels in tests.
#[async_trait::async_trait]
pub trait EventStream: Send {
	/// Next text payload; `Ok(None)` means the peer ended the stream.
	async fn next_text(&mut self) -> anyhow::Result<Option<String>>;

	/// Best-effort close. Close errors are ignored by contract.
	async fn close(&mut self);
}

/// Connector the engine calls to open a stream for a room URL.
pub type StreamConnector = Arc<dyn Fn(Url) -> BoxFuture<'static, anyhow::Result<Box<dyn EventStream>>> + Send + Sync>;

/// WebSocket-backed [`EventStream`].
pub struct WsEventStream {
	ws: RoomWs,
}

#[async_trait::async_trait]
impl EventStream for WsEventStream {
	async fn next_text(&mut self) -> anyhow::Result<Option<String>> {
		loop {
			let Some(msg) = self.ws.next().await else {
				return Ok(None);
			};

			match msg.context("ws read")? {
				Message::Text(t) => return Ok(Some(t.to_string())),
				Message::Ping(p) => {
					let _ = self.ws.send(Message::Pong(p)).await;
				}
				Message::Close(frame) => {
					debug!(?frame, "event stream close frame");
					return Ok(None);
				}
				_ => {}
			}
		}
	}

	async fn close(&mut self) {
		let _ = self.ws.close(None).await;
	}
}

async fn connect_ws(url: Url) -> anyhow::Result<Box<dyn EventStream>> {
	let (ws, _resp) = tokio_tungstenite::connect_async(url.as_str())
		.await
		.context("connect_async to event stream")?;
	Ok(Box::new(WsEventStream { ws }) as Box<dyn EventStream>)
}

/// Default connector dialing the room service over WebSocket.
pub fn ws_connector() -> StreamConnector {
	Arc::new(|url: Url| Box::pin(connect_ws(url)) as BoxFuture<'static, anyhow::Result<Box<dyn EventStream>>>)
}
