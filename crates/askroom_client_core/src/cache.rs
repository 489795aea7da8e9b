#![forbid(unsafe_code)]

use std::collections::HashMap;

use askroom_domain::{Message, MessageId};

/// In-memory message collection for one room.
///
/// Owned exclusively by the synchronization engine for the active room and
/// mutated from a single task, so no interior locking. Records keep insertion
/// order; the projector relies on that order as the tie-break.
#[derive(Debug, Default)]
pub struct RoomCache {
	records: Vec<Message>,
	index_by_id: HashMap<MessageId, usize>,
}

impl RoomCache {
	pub fn new() -> Self {
		Self::default()
	}

	/// Build a cache from the snapshot records, in snapshot order.
	///
	/// Duplicate ids in the snapshot keep the first record.
	pub fn from_snapshot(records: impl IntoIterator<Item = Message>) -> Self {
		let mut cache = Self::new();
		for Message {
			id,
			text,
			reaction_count,
			answered,
		} in records
		{
			if cache.upsert_created(id.clone(), text) {
				// Snapshot records carry server state, not creation defaults.
				cache.apply_if_present(&id, |m| {
					m.reaction_count = reaction_count;
					m.answered = answered;
				});
			}
		}
		cache
	}

	pub fn len(&self) -> usize {
		self.records.len()
	}

	pub fn is_empty(&self) -> bool {
		self.records.is_empty()
	}

	pub fn get(&self, id: &MessageId) -> Option<&Message> {
		self.index_by_id.get(id).map(|&i| &self.records[i])
	}

	/// Insert a freshly created message if absent.
	///
	/// Idempotent: a duplicate id neither creates a second entry nor resets
	/// the existing record's mutable fields. Returns true when inserted.
	pub fn upsert_created(&mut self, id: MessageId, text: String) -> bool {
		if self.index_by_id.contains_key(&id) {
			return false;
		}

		self.index_by_id.insert(id.clone(), self.records.len());
		self.records.push(Message::new(id, text));
		true
	}

	/// Mutate the record for `id` if present; unknown ids are no-ops.
	///
	/// Returns true when a record was mutated.
	pub fn apply_if_present(&mut self, id: &MessageId, mutation: impl FnOnce(&mut Message)) -> bool {
		let Some(&i) = self.index_by_id.get(id) else {
			return false;
		};

		mutation(&mut self.records[i]);
		true
	}

	/// All records in insertion order.
	pub fn values(&self) -> impl Iterator<Item = &Message> {
		self.records.iter()
	}
}
