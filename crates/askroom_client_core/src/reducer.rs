#![forbid(unsafe_code)]

use askroom_domain::RoomEvent;

use crate::cache::RoomCache;

/// Result of applying one event to the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
	/// The cache changed (or a creation landed).
	Applied,

	/// The event referenced an id not present in the cache. Not an error:
	/// this is the stated recovery for events racing ahead of the snapshot.
	NoOp,
}

/// Apply one decoded event to the cache.
///
/// Total over every cache state including empty, and idempotent for
/// `message_created` (duplicate ids are discarded, not merged) and
/// `message_answered` (answered only moves false→true).
///
/// Reaction events set the absolute count the server reported. The stream
/// carries no sequence numbers, so replaying an older reaction event after a
/// newer one can regress the displayed count; that limitation comes with the
/// wire contract and is deliberately not patched with client-side ordering.
pub fn reduce(cache: &mut RoomCache, event: RoomEvent) -> Outcome {
	let applied = match event {
		RoomEvent::MessageCreated { id, text } => cache.upsert_created(id, text),
		RoomEvent::MessageAnswered { id } => cache.apply_if_present(&id, |m| m.answered = true),
		RoomEvent::MessageReactionIncreased { id, count } | RoomEvent::MessageReactionDecreased { id, count } => {
			cache.apply_if_present(&id, |m| m.reaction_count = count)
		}
	};

	if applied { Outcome::Applied } else { Outcome::NoOp }
}
