#![forbid(unsafe_code)]

use askroom_domain::{Message, MessageId, ParseIdError, RoomId};
use serde::{Deserialize, Serialize};

/// Server-shaped message record (`GET /api/rooms/{id}/messages`).
///
/// Mapping to the canonical [`Message`] is field renames only: `message` →
/// `text`, `reaction_count` → `reaction_count`; `room_id` is dropped because
/// the cache is already scoped to one room.
#[derive(Debug, Clone, Deserialize)]
pub struct RoomMessageDto {
	pub id: String,
	#[serde(default)]
	pub room_id: String,
	pub message: String,
	pub reaction_count: u64,
	pub answered: bool,
}

impl RoomMessageDto {
	pub fn into_message(self) -> Result<Message, ParseIdError> {
		Ok(Message {
			id: MessageId::new(self.id)?,
			text: self.message,
			reaction_count: self.reaction_count,
			answered: self.answered,
		})
	}
}

/// Server-shaped room record (`GET /api/rooms`).
#[derive(Debug, Clone, Deserialize)]
pub struct RoomDto {
	pub id: String,
	pub theme: String,
}

impl RoomDto {
	pub fn into_summary(self) -> Result<RoomSummary, ParseIdError> {
		Ok(RoomSummary {
			id: RoomId::new(self.id)?,
			theme: self.theme,
		})
	}
}

/// Canonical room listing entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomSummary {
	pub id: RoomId,
	pub theme: String,
}

/// `{"id": "..."}` response to the create-room/create-message calls.
#[derive(Debug, Deserialize)]
pub struct CreatedIdDto {
	pub id: String,
}

/// `{"count": n}` response to the reaction calls.
#[derive(Debug, Deserialize)]
pub struct ReactionCountDto {
	pub count: u64,
}

/// `{"theme": "..."}` create-room request body.
#[derive(Debug, Serialize)]
pub struct CreateRoomBody<'a> {
	pub theme: &'a str,
}

/// `{"message": "..."}` create-message request body.
#[derive(Debug, Serialize)]
pub struct CreateMessageBody<'a> {
	pub message: &'a str,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn snapshot_record_maps_by_rename_only() {
		let dto: RoomMessageDto = serde_json::from_str(
			r#"{"id":"m1","room_id":"r1","message":"hi","reaction_count":3,"answered":true}"#,
		)
		.unwrap();

		let msg = dto.into_message().unwrap();
		assert_eq!(msg.id.as_str(), "m1");
		assert_eq!(msg.text, "hi");
		assert_eq!(msg.reaction_count, 3);
		assert!(msg.answered);
	}

	#[test]
	fn snapshot_record_rejects_empty_id() {
		let dto: RoomMessageDto =
			serde_json::from_str(r#"{"id":"","room_id":"r1","message":"hi","reaction_count":0,"answered":false}"#).unwrap();
		assert!(dto.into_message().is_err());
	}

	#[test]
	fn room_record_maps_to_summary() {
		let dto: RoomDto = serde_json::from_str(r#"{"id":"r1","theme":"rust"}"#).unwrap();
		let summary = dto.into_summary().unwrap();
		assert_eq!(summary.id.as_str(), "r1");
		assert_eq!(summary.theme, "rust");
	}
}
