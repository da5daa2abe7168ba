//! Sequencing of acknowledged messages.
//!
//! Leaders acknowledge messages, the network delivers messages and acks in arbitrary order and
//! the [block::maker::BlockMaker] turns them into gap free, hash chain verified sequences per VM,
//! ready for block assembly.

pub mod block;
pub mod cli;
pub mod config;
pub mod logging;
pub mod utilities;

pub use block::classifier::{ChainCategory, ChainClassifier, ReservedChains};
pub use block::lane::{Lane, LaneStatus};
pub use block::leader::Leader;
pub use block::maker::BlockMaker;
pub use block::processed::ProcessedEntries;
pub use block::router::route;
pub use block::types::{Ack, AckError, EntryMessage, MessageWithEntry, MsgAckPair};
pub use block::SequencerError;
pub use utilities::hash::ChainId;
