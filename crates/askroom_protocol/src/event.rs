#![forbid(unsafe_code)]

use askroom_domain::{MessageId, RoomEvent};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::kind;

/// Errors for decoding raw stream payloads.
///
/// Every variant is recoverable by contract: the payload is dropped with a
/// diagnostic and processing continues. A decode failure never reaches the
/// reducer and never aborts the connection.
#[derive(Debug, Error)]
pub enum DecodeError {
	/// The payload is not valid JSON or not a `{kind, value}` envelope.
	#[error("malformed event envelope: {0}")]
	Envelope(#[source] serde_json::Error),

	/// The `kind` tag is outside the four-variant taxonomy.
	#[error("unrecognized event kind: {0}")]
	UnknownKind(String),

	/// The `value` payload does not match the shape required for `kind`.
	#[error("malformed {kind} value: {source}")]
	Value {
		kind: &'static str,
		#[source]
		source: serde_json::Error,
	},

	/// The `value` payload parsed but violates a field constraint.
	#[error("invalid {kind} value: {detail}")]
	Invalid { kind: &'static str, detail: String },
}

/// Raw `{kind, value}` envelope as produced by the server.
#[derive(Debug, Serialize, Deserialize)]
struct EventEnvelope {
	kind: String,
	value: serde_json::Value,
}

/// `message_created` payload. The wire field is `message`; canonically `text`.
#[derive(Debug, Serialize, Deserialize)]
struct CreatedValue {
	id: String,
	message: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct AnsweredValue {
	id: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct ReactionValue {
	id: String,
	count: u64,
}

fn message_id(kind: &'static str, raw: String) -> Result<MessageId, DecodeError> {
	MessageId::new(raw).map_err(|e| DecodeError::Invalid {
		kind,
		detail: format!("id: {e}"),
	})
}

fn value<T: serde::de::DeserializeOwned>(kind: &'static str, v: serde_json::Value) -> Result<T, DecodeError> {
	serde_json::from_value(v).map_err(|source| DecodeError::Value { kind, source })
}

/// Decode a raw textual payload into a typed [`RoomEvent`].
///
/// Unknown kinds are rejected rather than skipped silently so the caller can
/// log what the producer started sending (the taxonomy may grow server-side
/// independently of this consumer).
pub fn decode_event(raw: &str) -> Result<RoomEvent, DecodeError> {
	let envelope: EventEnvelope = serde_json::from_str(raw).map_err(DecodeError::Envelope)?;

	match envelope.kind.as_str() {
		kind::MESSAGE_CREATED => {
			let v: CreatedValue = value(kind::MESSAGE_CREATED, envelope.value)?;
			Ok(RoomEvent::MessageCreated {
				id: message_id(kind::MESSAGE_CREATED, v.id)?,
				text: v.message,
			})
		}
		kind::MESSAGE_ANSWERED => {
			let v: AnsweredValue = value(kind::MESSAGE_ANSWERED, envelope.value)?;
			Ok(RoomEvent::MessageAnswered {
				id: message_id(kind::MESSAGE_ANSWERED, v.id)?,
			})
		}
		kind::MESSAGE_REACTION_INCREASED => {
			let v: ReactionValue = value(kind::MESSAGE_REACTION_INCREASED, envelope.value)?;
			Ok(RoomEvent::MessageReactionIncreased {
				id: message_id(kind::MESSAGE_REACTION_INCREASED, v.id)?,
				count: v.count,
			})
		}
		kind::MESSAGE_REACTION_DECREASED => {
			let v: ReactionValue = value(kind::MESSAGE_REACTION_DECREASED, envelope.value)?;
			Ok(RoomEvent::MessageReactionDecreased {
				id: message_id(kind::MESSAGE_REACTION_DECREASED, v.id)?,
				count: v.count,
			})
		}
		other => Err(DecodeError::UnknownKind(other.to_string())),
	}
}

/// Encode a [`RoomEvent`] into the producer wire shape.
///
/// Used by tooling and tests; the client itself only consumes.
pub fn encode_event(event: &RoomEvent) -> String {
	let value = match event {
		RoomEvent::MessageCreated { id, text } => serde_json::to_value(CreatedValue {
			id: id.as_str().to_string(),
			message: text.clone(),
		}),
		RoomEvent::MessageAnswered { id } => serde_json::to_value(AnsweredValue {
			id: id.as_str().to_string(),
		}),
		RoomEvent::MessageReactionIncreased { id, count } | RoomEvent::MessageReactionDecreased { id, count } => {
			serde_json::to_value(ReactionValue {
				id: id.as_str().to_string(),
				count: *count,
			})
		}
	};

	let envelope = EventEnvelope {
		kind: event.kind().to_string(),
		value: value.expect("event payloads serialize"),
	};

	serde_json::to_string(&envelope).expect("event envelopes serialize")
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn decodes_message_created() {
		let ev = decode_event(r#"{"kind":"message_created","value":{"id":"m1","message":"hi"}}"#).unwrap();
		assert_eq!(
			ev,
			RoomEvent::MessageCreated {
				id: MessageId::new("m1").unwrap(),
				text: "hi".to_string(),
			}
		);
	}

	#[test]
	fn decodes_message_answered() {
		let ev = decode_event(r#"{"kind":"message_answered","value":{"id":"m1"}}"#).unwrap();
		assert_eq!(ev, RoomEvent::MessageAnswered { id: MessageId::new("m1").unwrap() });
	}

	#[test]
	fn decodes_reaction_events_with_absolute_counts() {
		let up = decode_event(r#"{"kind":"message_reaction_increased","value":{"id":"m1","count":4}}"#).unwrap();
		assert_eq!(
			up,
			RoomEvent::MessageReactionIncreased {
				id: MessageId::new("m1").unwrap(),
				count: 4,
			}
		);

		let down = decode_event(r#"{"kind":"message_reaction_decreased","value":{"id":"m1","count":3}}"#).unwrap();
		assert_eq!(
			down,
			RoomEvent::MessageReactionDecreased {
				id: MessageId::new("m1").unwrap(),
				count: 3,
			}
		);
	}

	#[test]
	fn rejects_unknown_kind() {
		let err = decode_event(r#"{"kind":"unknown_tag","value":{}}"#).unwrap_err();
		match err {
			DecodeError::UnknownKind(k) => assert_eq!(k, "unknown_tag"),
			other => panic!("unexpected error: {other:?}"),
		}
	}

	#[test]
	fn rejects_malformed_json_and_non_envelopes() {
		assert!(matches!(decode_event("not json"), Err(DecodeError::Envelope(_))));
		assert!(matches!(decode_event(r#"{"no_kind":true}"#), Err(DecodeError::Envelope(_))));
		assert!(matches!(decode_event("[1,2,3]"), Err(DecodeError::Envelope(_))));
	}

	#[test]
	fn rejects_value_shape_mismatch_for_known_kind() {
		let err = decode_event(r#"{"kind":"message_reaction_increased","value":{"id":"m1"}}"#).unwrap_err();
		assert!(matches!(err, DecodeError::Value { kind: "message_reaction_increased", .. }));
	}

	#[test]
	fn rejects_negative_counts() {
		let err = decode_event(r#"{"kind":"message_reaction_increased","value":{"id":"m1","count":-1}}"#).unwrap_err();
		assert!(matches!(err, DecodeError::Value { .. }));
	}

	#[test]
	fn rejects_empty_ids() {
		let err = decode_event(r#"{"kind":"message_answered","value":{"id":""}}"#).unwrap_err();
		assert!(matches!(err, DecodeError::Invalid { kind: "message_answered", .. }));
	}

	#[test]
	fn tolerates_extra_value_fields() {
		let ev = decode_event(r#"{"kind":"message_answered","value":{"id":"m1","answered_by":"host"}}"#).unwrap();
		assert_eq!(ev, RoomEvent::MessageAnswered { id: MessageId::new("m1").unwrap() });
	}

	#[test]
	fn encoded_events_decode_to_the_same_variant() {
		let ev = RoomEvent::MessageCreated {
			id: MessageId::new("m1").unwrap(),
			text: "how does the sync engine work?".to_string(),
		};
		assert_eq!(decode_event(&encode_event(&ev)).unwrap(), ev);
	}
}
