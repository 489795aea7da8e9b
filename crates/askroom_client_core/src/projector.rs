#![forbid(unsafe_code)]

use askroom_domain::Message;

use crate::cache::RoomCache;

/// Derive the display order from the cache: reaction count descending.
///
/// The sort is stable, so records with equal counts keep the cache's
/// insertion order across repeated projections; non-moving entries never
/// reshuffle between recomputes.
pub fn project(cache: &RoomCache) -> Vec<Message> {
	let mut messages: Vec<Message> = cache.values().cloned().collect();
	messages.sort_by_key(|m| std::cmp::Reverse(m.reaction_count));
	messages
}

#[cfg(test)]
mod tests {
	use askroom_domain::MessageId;

	use super::*;

	fn id(s: &str) -> MessageId {
		MessageId::new(s).expect("valid MessageId")
	}

	fn cache_with(counts: &[(&str, u64)]) -> RoomCache {
		let mut cache = RoomCache::new();
		for (name, count) in counts {
			cache.upsert_created(id(name), format!("text {name}"));
			cache.apply_if_present(&id(name), |m| m.reaction_count = *count);
		}
		cache
	}

	#[test]
	fn orders_by_reaction_count_descending() {
		let cache = cache_with(&[("m1", 1), ("m2", 5), ("m3", 3)]);
		let projected = project(&cache);
		let ids: Vec<&str> = projected.iter().map(|m| m.id.as_str()).collect::<Vec<_>>();
		assert_eq!(ids, vec!["m2", "m3", "m1"]);
	}

	#[test]
	fn ties_keep_insertion_order_across_repeated_projections() {
		let cache = cache_with(&[("m1", 2), ("m2", 2), ("m3", 2), ("m4", 7)]);

		let first: Vec<String> = project(&cache).iter().map(|m| m.id.to_string()).collect();
		let second: Vec<String> = project(&cache).iter().map(|m| m.id.to_string()).collect();

		assert_eq!(first, vec!["m4", "m1", "m2", "m3"]);
		assert_eq!(first, second);
	}

	#[test]
	fn empty_cache_projects_to_empty() {
		assert!(project(&RoomCache::new()).is_empty());
	}
}
