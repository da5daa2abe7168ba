pub(crate) mod ack;
pub(crate) mod message;
pub(crate) mod pair;

pub use ack::{Ack, AckError};
pub use message::{EntryMessage, MessageWithEntry};
pub use pair::MsgAckPair;
