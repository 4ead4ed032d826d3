//! Remote-control protocol: message types and JSON codec.

pub mod codec;
pub mod messages;

pub use codec::{
    decode_hello, decode_identified, decode_inbound, encode_command, encode_identify, DecodeError,
};
pub use messages::{
    CommandMessage, HelloMessage, IdentifiedMessage, IdentifyMessage, InboundMessage, OpCode,
    RequestStatus, EVENT_SUBSCRIPTIONS, TRIGGER_HOTKEY_REQUEST,
};
