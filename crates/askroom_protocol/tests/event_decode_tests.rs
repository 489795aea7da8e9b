use askroom_domain::RoomEvent;
use askroom_protocol::{decode_event, encode_event};
use proptest::prelude::*;

fn id_strategy() -> impl Strategy<Value = String> {
	proptest::string::string_regex("[0-9a-f]{8}").unwrap_or_else(|e| panic!("regex failed: {e}"))
}

fn event_strategy() -> impl Strategy<Value = RoomEvent> {
	let id = || id_strategy().prop_map(|s| askroom_domain::MessageId::new(s).expect("non-empty id"));

	prop_oneof![
		(id(), ".*").prop_map(|(id, text)| RoomEvent::MessageCreated { id, text }),
		id().prop_map(|id| RoomEvent::MessageAnswered { id }),
		(id(), any::<u64>()).prop_map(|(id, count)| RoomEvent::MessageReactionIncreased { id, count }),
		(id(), any::<u64>()).prop_map(|(id, count)| RoomEvent::MessageReactionDecreased { id, count }),
	]
}

proptest! {
	#![proptest_config(ProptestConfig { cases: 128, .. ProptestConfig::default() })]

	/// The decoder must treat every input as potentially hostile: arbitrary
	/// text either decodes or returns an error, it never panics.
	#[test]
	fn decode_never_panics_on_arbitrary_input(raw in ".*") {
		let _ = decode_event(&raw);
	}

	/// Arbitrary JSON documents are likewise rejected or decoded, not fatal.
	#[test]
	fn decode_never_panics_on_arbitrary_json(kind in ".*", count in any::<i64>()) {
		let raw = format!(r#"{{"kind":{},"value":{{"id":"m1","count":{}}}}}"#, serde_json::to_string(&kind).unwrap(), count);
		let _ = decode_event(&raw);
	}

	/// Producer-shaped envelopes always decode to the same variant.
	#[test]
	fn producer_envelopes_decode(ev in event_strategy()) {
		let decoded = decode_event(&encode_event(&ev)).expect("producer envelope decodes");
		prop_assert_eq!(decoded, ev);
	}
}
