#![forbid(unsafe_code)]

use std::time::Duration;

use askroom_domain::RoomId;
use askroom_util::endpoint;
use url::Url;

pub mod api;
pub mod cache;
pub mod projector;
pub mod reducer;
pub mod stream;
pub mod sync;

pub use api::{ApiClient, ApiError, SnapshotError, SnapshotSource};
pub use cache::RoomCache;
pub use projector::project;
pub use reducer::{Outcome, reduce};
pub use stream::{EventStream, StreamConnector, ws_connector};
pub use sync::{RoomSync, RoomView, SyncCommand, SyncPhase};

/// Errors for engine setup and control.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
	/// A configured endpoint failed validation.
	#[error("invalid endpoint: {0}")]
	Endpoint(String),

	/// The engine task is no longer running.
	#[error("sync engine is not running")]
	EngineStopped,
}

/// Client session configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
	/// REST base endpoint, `http(s)://host:port`.
	pub api_base_url: String,

	/// Event stream base endpoint, `ws(s)://host:port`.
	pub ws_base_url: String,

	/// Timeout for opening the event stream.
	pub connect_timeout: Duration,

	/// Whether to reconnect after connection loss or snapshot failure.
	pub reconnect: bool,

	/// Reconnect backoff bounds.
	pub reconnect_min_delay: Duration,
	pub reconnect_max_delay: Duration,

	/// Client instance id, for diagnostics only.
	pub client_instance_id: String,
}

impl Default for ClientConfig {
	fn default() -> Self {
		// Local dev default; production embedders override the endpoints.
		Self {
			api_base_url: "http://localhost:8080".to_string(),
			ws_base_url: "ws://localhost:8080".to_string(),
			connect_timeout: Duration::from_secs(15),
			reconnect: true,
			reconnect_min_delay: Duration::from_millis(500),
			reconnect_max_delay: Duration::from_secs(30),
			client_instance_id: "dev-instance".to_string(),
		}
	}
}

impl ClientConfig {
	/// Validate both endpoints up front.
	pub fn validate(&self) -> Result<(), SyncError> {
		endpoint::validate_http_endpoint(&self.api_base_url).map_err(SyncError::Endpoint)?;
		endpoint::validate_ws_endpoint(&self.ws_base_url).map_err(SyncError::Endpoint)?;
		Ok(())
	}

	/// Subscription URL for a room's event stream.
	pub(crate) fn subscribe_url(&self, room: &RoomId) -> Result<Url, SyncError> {
		let base = self.ws_base_url.trim_end_matches('/');
		Url::parse(&format!("{base}/subscribe/{}", urlencoding::encode(room.as_str())))
			.map_err(|e| SyncError::Endpoint(e.to_string()))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn default_config_is_sane() {
		let cfg = ClientConfig::default();
		assert!(cfg.validate().is_ok());
		assert!(cfg.reconnect);
		assert!(cfg.reconnect_min_delay < cfg.reconnect_max_delay);
	}

	#[test]
	fn subscribe_url_targets_the_room() {
		let cfg = ClientConfig::default();
		let room = RoomId::new("ab12").unwrap();
		let url = cfg.subscribe_url(&room).unwrap();
		assert_eq!(url.as_str(), "ws://localhost:8080/subscribe/ab12");
	}

	#[test]
	fn validate_rejects_scheme_mixups() {
		let cfg = ClientConfig {
			api_base_url: "ws://localhost:8080".to_string(),
			..ClientConfig::default()
		};
		assert!(matches!(cfg.validate(), Err(SyncError::Endpoint(_))));
	}
}
