#![forbid(unsafe_code)]

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors for parsing identifiers from strings.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseIdError {
	#[error("empty value")]
	Empty,
}

/// Opaque room identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
	/// Create a non-empty `RoomId`.
	pub fn new(id: impl Into<String>) -> Result<Self, ParseIdError> {
		let id = id.into();
		if id.trim().is_empty() {
			return Err(ParseIdError::Empty);
		}
		Ok(Self(id))
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}

	pub fn into_string(self) -> String {
		self.0
	}
}

impl fmt::Display for RoomId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl FromStr for RoomId {
	type Err = ParseIdError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		RoomId::new(s.to_string())
	}
}

/// Opaque message identifier, unique within a room.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
	/// Create a non-empty `MessageId`.
	pub fn new(id: impl Into<String>) -> Result<Self, ParseIdError> {
		let id = id.into();
		if id.trim().is_empty() {
			return Err(ParseIdError::Empty);
		}
		Ok(Self(id))
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}

	pub fn into_string(self) -> String {
		self.0
	}
}

impl fmt::Display for MessageId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl FromStr for MessageId {
	type Err = ParseIdError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		MessageId::new(s.to_string())
	}
}

/// Canonical audience message record.
///
/// `text` is immutable after creation; `reaction_count` carries the latest
/// absolute count reported by the server; `answered` only moves false→true.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
	pub id: MessageId,
	pub text: String,
	pub reaction_count: u64,
	pub answered: bool,
}

impl Message {
	/// A freshly created message: zero reactions, not answered.
	pub fn new(id: MessageId, text: impl Into<String>) -> Self {
		Self {
			id,
			text: text.into(),
			reaction_count: 0,
			answered: false,
		}
	}
}

/// Incremental room events delivered over the live stream.
///
/// Closed set: anything outside these four kinds is rejected at the wire
/// boundary and never reaches the reducer. Reaction events carry the absolute
/// resulting count, not a delta.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomEvent {
	MessageCreated { id: MessageId, text: String },
	MessageAnswered { id: MessageId },
	MessageReactionIncreased { id: MessageId, count: u64 },
	MessageReactionDecreased { id: MessageId, count: u64 },
}

impl RoomEvent {
	/// Stable wire tag for this event.
	pub const fn kind(&self) -> &'static str {
		match self {
			RoomEvent::MessageCreated { .. } => "message_created",
			RoomEvent::MessageAnswered { .. } => "message_answered",
			RoomEvent::MessageReactionIncreased { .. } => "message_reaction_increased",
			RoomEvent::MessageReactionDecreased { .. } => "message_reaction_decreased",
		}
	}

	/// The message this event targets.
	pub fn message_id(&self) -> &MessageId {
		match self {
			RoomEvent::MessageCreated { id, .. }
			| RoomEvent::MessageAnswered { id }
			| RoomEvent::MessageReactionIncreased { id, .. }
			| RoomEvent::MessageReactionDecreased { id, .. } => id,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn room_id_parse_and_display() {
		let id = "0bd42e22".parse::<RoomId>().unwrap();
		assert_eq!(id.as_str(), "0bd42e22");
		assert_eq!(id.to_string(), "0bd42e22");
	}

	#[test]
	fn rejects_empty_ids() {
		assert!(RoomId::new("").is_err());
		assert!(MessageId::new("   ").is_err());
		assert!("".parse::<MessageId>().is_err());
	}

	#[test]
	fn new_message_starts_unreacted_and_unanswered() {
		let m = Message::new(MessageId::new("m1").unwrap(), "hi");
		assert_eq!(m.reaction_count, 0);
		assert!(!m.answered);
	}

	#[test]
	fn event_kinds_are_stable() {
		let id = MessageId::new("m1").unwrap();
		assert_eq!(RoomEvent::MessageCreated { id: id.clone(), text: "x".into() }.kind(), "message_created");
		assert_eq!(RoomEvent::MessageAnswered { id: id.clone() }.kind(), "message_answered");
		assert_eq!(
			RoomEvent::MessageReactionIncreased { id: id.clone(), count: 1 }.kind(),
			"message_reaction_increased"
		);
		assert_eq!(
			RoomEvent::MessageReactionDecreased { id, count: 0 }.kind(),
			"message_reaction_decreased"
		);
	}
}
