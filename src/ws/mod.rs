//! WebSocket channel and wire protocol

pub mod channel;
pub mod protocol;

pub use channel::{ChannelState, InboundFrame, NetworkChannel, OutboundSink, SendOutcome};
pub use protocol::{OutboundMsg, WorldSnapshot};
