//! # Block maker
//!
//! Leaders acknowledge messages. An acknowledgment fixes the position(height) of a message in the
//! sequence of the leader's VM. Messages and their acks travel over the network independently and
//! can arrive in any order, more than once, or with gaps.
//!
//! Block assembly needs the opposite: every VM sequence delivered exactly once, without gaps and in
//! height order. The block maker converts the former into the latter.
//!
//! ## Lanes
//!
//! Every chain is routed to one VM(lane) with [router::route]. The routing depends only on the
//! chain id and the number of leaders, so all messages of a chain end up in the same lane.
//!
//! Each lane keeps messages which can't be committed yet in a pending queue sorted by height.
//! After every insert the lane commits from the head of the queue as long as heights are
//! contiguous and each ack continues the serial hash chain of the previously committed one.
//!
//! ## Outputs
//!
//! Committed messages are collected per chain category(admin, entry credit, factoid, other entry
//! chains) and taken over by block assembly with [maker::BlockMaker::take_processed].
//!
//! ## Locking
//!
//! Lanes progress independently. The lane map lock is held only for the map access itself.
//! Each lane has its own lock for its pending queue and commit state. Committed messages are
//! appended to the outputs while the lane lock is still held, so that the output order of a lane
//! is its commit order. The lane map lock is never held together with any other lock.

use thiserror::Error;

use crate::block::types::AckError;
use crate::utilities::hash::ChainId;

pub mod classifier;
pub mod lane;
pub mod leader;
pub mod maker;
pub mod processed;
pub mod router;
pub mod types;


pub type Result<T> = std::result::Result<T, SequencerError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SequencerError {
    #[error("Message doesn't match the hash in its ack: chain {chain_id}, height {height}")]
    MessageHashMismatch { chain_id: ChainId, height: u32 },
    #[error("Ack serial hash doesn't link to previous ack: chain {chain_id}, height {height}")]
    VerificationFailed { chain_id: ChainId, height: u32 },
    #[error("Invalid ack for chain {chain_id} at height {height}: {source}")]
    InvalidAck {
        chain_id: ChainId,
        height: u32,
        #[source]
        source: AckError,
    },
    #[error("Different message is already pending at height {height}: chain {chain_id}")]
    PendingHeightCollision { chain_id: ChainId, height: u32 },
    #[error("Pending queue of vm {vm_index} is full: capacity {capacity}")]
    PendingQueueFull { vm_index: usize, capacity: usize },
}
