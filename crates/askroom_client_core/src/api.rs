#![forbid(unsafe_code)]

use anyhow::Context;
use askroom_domain::{Message, MessageId, RoomId};
use askroom_protocol::rest::{
	CreateMessageBody, CreateRoomBody, CreatedIdDto, ReactionCountDto, RoomDto, RoomMessageDto, RoomSummary,
};
use reqwest::StatusCode;
use thiserror::Error;
use url::Url;

const ROOMS_PATH: &str = "/api/rooms";

/// Errors for the one-shot snapshot request.
///
/// A failed snapshot is a distinguishable state, never an empty room: the
/// engine publishes it as a failure phase and creates no partial cache.
#[derive(Debug, Error)]
pub enum SnapshotError {
	#[error("snapshot request failed: {0}")]
	Transport(#[from] reqwest::Error),

	#[error("snapshot request returned {status}: {body}")]
	Status { status: StatusCode, body: String },

	#[error("snapshot parse failed: {0}")]
	Parse(#[source] serde_json::Error),

	#[error("snapshot record rejected: {0}")]
	InvalidRecord(#[from] askroom_domain::ParseIdError),

	#[error("invalid snapshot url: {0}")]
	Url(#[from] url::ParseError),
}

/// Errors for the stateless collaborator calls (rooms, messages, reactions).
#[derive(Debug, Error)]
pub enum ApiError {
	#[error("request failed: {0}")]
	Transport(#[from] reqwest::Error),

	#[error("request returned {status}: {body}")]
	Status { status: StatusCode, body: String },

	#[error("response parse failed: {0}")]
	Parse(#[source] serde_json::Error),

	#[error("response rejected: {0}")]
	Invalid(#[from] askroom_domain::ParseIdError),

	#[error("invalid request url: {0}")]
	Url(#[from] url::ParseError),
}

/// Source of the authoritative initial room state.
///
/// Implemented by [`ApiClient`]; tests substitute in-memory fakes.
#[async_trait::async_trait]
pub trait SnapshotSource: Send + Sync {
	async fn load(&self, room: &RoomId) -> Result<Vec<Message>, SnapshotError>;
}

/// HTTP client for the room service REST surface.
#[derive(Debug, Clone)]
pub struct ApiClient {
	http: reqwest::Client,
	base_url: Url,
}

impl ApiClient {
	pub fn new(base_url: Url) -> anyhow::Result<Self> {
		let http = reqwest::Client::builder()
			.user_agent(concat!("askroom/", env!("CARGO_PKG_VERSION")))
			.build()
			.context("build reqwest client")?;

		Ok(Self { http, base_url })
	}

	/// Build a client from an `http(s)://host:port` base string.
	pub fn from_base(base: &str) -> anyhow::Result<Self> {
		askroom_util::endpoint::validate_http_endpoint(base).map_err(|e| anyhow::anyhow!(e))?;
		let url = Url::parse(base).context("parse api base url")?;
		Self::new(url)
	}

	fn url(&self, path_and_query: &str) -> Result<Url, url::ParseError> {
		self.base_url.join(path_and_query)
	}

	fn room_path(room: &RoomId) -> String {
		format!("{ROOMS_PATH}/{}", urlencoding::encode(room.as_str()))
	}

	fn message_path(room: &RoomId, message: &MessageId) -> String {
		format!(
			"{}/messages/{}",
			Self::room_path(room),
			urlencoding::encode(message.as_str())
		)
	}

	async fn success_body(resp: reqwest::Response) -> Result<String, ApiError> {
		let status = resp.status();
		let body = resp.text().await?;
		if !status.is_success() {
			return Err(ApiError::Status { status, body });
		}
		Ok(body)
	}

	/// Fetch the authoritative message list for a room.
	///
	/// Server-shaped records are mapped to canonical [`Message`]s by field
	/// rename only; server order is preserved.
	pub async fn room_messages(&self, room: &RoomId) -> Result<Vec<Message>, SnapshotError> {
		let url = self.url(&format!("{}/messages", Self::room_path(room)))?;

		let resp = self.http.get(url).send().await?;
		let status = resp.status();
		let body = resp.text().await?;

		if !status.is_success() {
			return Err(SnapshotError::Status { status, body });
		}

		let records: Vec<RoomMessageDto> = serde_json::from_str(&body).map_err(SnapshotError::Parse)?;
		records
			.into_iter()
			.map(|dto| dto.into_message().map_err(SnapshotError::from))
			.collect()
	}

	pub async fn create_room(&self, theme: &str) -> Result<RoomId, ApiError> {
		let url = self.url(ROOMS_PATH)?;
		let resp = self.http.post(url).json(&CreateRoomBody { theme }).send().await?;
		let body = Self::success_body(resp).await?;

		let created: CreatedIdDto = serde_json::from_str(&body).map_err(ApiError::Parse)?;
		Ok(RoomId::new(created.id)?)
	}

	pub async fn list_rooms(&self) -> Result<Vec<RoomSummary>, ApiError> {
		let url = self.url(ROOMS_PATH)?;
		let resp = self.http.get(url).send().await?;
		let body = Self::success_body(resp).await?;

		let rooms: Vec<RoomDto> = serde_json::from_str(&body).map_err(ApiError::Parse)?;
		rooms.into_iter().map(|dto| dto.into_summary().map_err(ApiError::from)).collect()
	}

	pub async fn get_room(&self, room: &RoomId) -> Result<RoomSummary, ApiError> {
		let url = self.url(&Self::room_path(room))?;
		let resp = self.http.get(url).send().await?;
		let body = Self::success_body(resp).await?;

		let dto: RoomDto = serde_json::from_str(&body).map_err(ApiError::Parse)?;
		Ok(dto.into_summary()?)
	}

	pub async fn create_message(&self, room: &RoomId, text: &str) -> Result<MessageId, ApiError> {
		let url = self.url(&format!("{}/messages", Self::room_path(room)))?;
		let resp = self.http.post(url).json(&CreateMessageBody { message: text }).send().await?;
		let body = Self::success_body(resp).await?;

		let created: CreatedIdDto = serde_json::from_str(&body).map_err(ApiError::Parse)?;
		Ok(MessageId::new(created.id)?)
	}

	/// Add one reaction; returns the resulting absolute count.
	pub async fn react_to_message(&self, room: &RoomId, message: &MessageId) -> Result<u64, ApiError> {
		let url = self.url(&format!("{}/react", Self::message_path(room, message)))?;
		let resp = self.http.patch(url).send().await?;
		let body = Self::success_body(resp).await?;

		let count: ReactionCountDto = serde_json::from_str(&body).map_err(ApiError::Parse)?;
		Ok(count.count)
	}

	/// Remove one reaction; returns the resulting absolute count.
	pub async fn remove_reaction(&self, room: &RoomId, message: &MessageId) -> Result<u64, ApiError> {
		let url = self.url(&format!("{}/react", Self::message_path(room, message)))?;
		let resp = self.http.delete(url).send().await?;
		let body = Self::success_body(resp).await?;

		let count: ReactionCountDto = serde_json::from_str(&body).map_err(ApiError::Parse)?;
		Ok(count.count)
	}

	pub async fn mark_answered(&self, room: &RoomId, message: &MessageId) -> Result<(), ApiError> {
		let url = self.url(&format!("{}/answer", Self::message_path(room, message)))?;
		let resp = self.http.patch(url).send().await?;
		let _ = Self::success_body(resp).await?;
		Ok(())
	}
}

#[async_trait::async_trait]
impl SnapshotSource for ApiClient {
	async fn load(&self, room: &RoomId) -> Result<Vec<Message>, SnapshotError> {
		self.room_messages(room).await
	}
}
