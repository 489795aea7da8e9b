#![forbid(unsafe_code)]

pub mod event;
pub mod rest;

pub use event::{DecodeError, decode_event, encode_event};
pub use rest::{CreatedIdDto, ReactionCountDto, RoomDto, RoomMessageDto, RoomSummary};

/// Wire tags for the four-variant event taxonomy.
pub mod kind {
	pub const MESSAGE_CREATED: &str = "message_created";
	pub const MESSAGE_ANSWERED: &str = "message_answered";
	pub const MESSAGE_REACTION_INCREASED: &str = "message_reaction_increased";
	pub const MESSAGE_REACTION_DECREASED: &str = "message_reaction_decreased";
}
