use std::fmt::Display;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::utilities::hash::{blake2_256_concat, hex_hash, HashType};
use crate::utilities::time::SequencerTime;

/// Structural problems found while verifying an acknowledgment against its predecessor.
///
/// These are different from an ack that is well formed but whose serial hash doesn't match.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AckError {
    #[error("Ack at height {0} has no predecessor, only height 0 can start a chain")]
    MissingPredecessor(u32),
    #[error("Ack belongs to vm {actual}, previous ack to vm {expected}")]
    VmIndexMismatch { expected: u32, actual: u32 },
    #[error("Ack height {actual} doesn't follow previous height {previous}")]
    NotConsecutive { previous: u32, actual: u32 },
    #[error("Vm {0} has no heights left")]
    HeightExhausted(u32),
}

/// Acknowledgment issued by a leader for a message, fixing its position in a VM sequence.
///
/// Acks of one VM form a hash chain:
/// - `serial_hash(0) = message_hash(0)`
/// - `serial_hash(h) = blake2_256(serial_hash(h - 1) || message_hash(h))`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Ack {
    pub vm_index: u32,
    pub db_height: u32,
    pub height: u32,
    pub timestamp: u64,
    #[serde(with = "hex_hash")]
    pub message_hash: HashType,
    #[serde(with = "hex_hash")]
    pub serial_hash: HashType,
}

impl Ack {
    /// First ack of a VM sequence.
    pub fn first(vm_index: u32, db_height: u32, message_hash: HashType) -> Self {
        Self {
            vm_index,
            db_height,
            height: 0,
            timestamp: SequencerTime::now(),
            message_hash,
            serial_hash: message_hash,
        }
    }

    /// Ack for the message following `previous` in the same VM.
    pub fn following(previous: &Ack, message_hash: HashType) -> Result<Self, AckError> {
        let height = previous
            .height
            .checked_add(1)
            .ok_or(AckError::HeightExhausted(previous.vm_index))?;
        Ok(Self {
            vm_index: previous.vm_index,
            db_height: previous.db_height,
            height,
            timestamp: SequencerTime::now(),
            message_hash,
            serial_hash: Self::serial_hash_after(&previous.serial_hash, &message_hash),
        })
    }

    fn serial_hash_after(previous: &HashType, message_hash: &HashType) -> HashType {
        blake2_256_concat(&[previous.as_slice(), message_hash.as_slice()])
    }

    /// Checks that this ack continues the chain ended by `previous`.
    ///
    /// `None` means there is no committed ack yet, then this ack has to be the first one.
    /// Returns `Ok(false)` when the ack is well formed but its serial hash doesn't link.
    pub fn verify_serial_hash(&self, previous: Option<&Ack>) -> Result<bool, AckError> {
        match previous {
            None => {
                if self.height != 0 {
                    return Err(AckError::MissingPredecessor(self.height));
                }
                Ok(self.serial_hash == self.message_hash)
            }
            Some(previous) => {
                if previous.vm_index != self.vm_index {
                    return Err(AckError::VmIndexMismatch {
                        expected: previous.vm_index,
                        actual: self.vm_index,
                    });
                }
                if previous.height.checked_add(1) != Some(self.height) {
                    return Err(AckError::NotConsecutive {
                        previous: previous.height,
                        actual: self.height,
                    });
                }
                let expected = Self::serial_hash_after(&previous.serial_hash, &self.message_hash);
                Ok(self.serial_hash == expected)
            }
        }
    }
}

impl Display for Ack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let vm_index = self.vm_index;
        let db_height = self.db_height;
        let height = self.height;
        write!(
            f,
            "vm: {vm_index}, db height: {db_height}, height: {height}",
        )
    }
}

#[cfg(test)]
mod test {
    use assert_matches::assert_matches;

    use crate::utilities::hash::blake2_256;

    use super::*;

    #[test]
    fn first_ack_verifies_without_predecessor() {
        let ack = Ack::first(0, 1, blake2_256(b"genesis"));

        assert_eq!(ack.height, 0);
        assert_eq!(ack.verify_serial_hash(None), Ok(true));
    }

    #[test]
    fn chain_of_acks_verifies() {
        let first = Ack::first(2, 7, blake2_256(b"a"));
        let second = Ack::following(&first, blake2_256(b"b")).unwrap();
        let third = Ack::following(&second, blake2_256(b"c")).unwrap();

        assert_eq!(second.height, 1);
        assert_eq!(third.height, 2);
        assert_eq!(third.vm_index, 2);
        assert_eq!(third.db_height, 7);
        assert_eq!(second.verify_serial_hash(Some(&first)), Ok(true));
        assert_eq!(third.verify_serial_hash(Some(&second)), Ok(true));
    }

    #[test]
    fn tampered_serial_hash_is_invalid() {
        let first = Ack::first(0, 0, blake2_256(b"a"));
        let mut second = Ack::following(&first, blake2_256(b"b")).unwrap();
        second.serial_hash = [9; 32];

        assert_eq!(second.verify_serial_hash(Some(&first)), Ok(false));
    }

    #[test]
    fn first_ack_with_foreign_serial_hash_is_invalid() {
        let mut first = Ack::first(0, 0, blake2_256(b"a"));
        first.serial_hash = blake2_256(b"b");

        assert_eq!(first.verify_serial_hash(None), Ok(false));
    }

    #[test]
    fn non_zero_height_without_predecessor_is_error() {
        let first = Ack::first(0, 0, blake2_256(b"a"));
        let second = Ack::following(&first, blake2_256(b"b")).unwrap();

        assert_matches!(
            second.verify_serial_hash(None),
            Err(AckError::MissingPredecessor(1))
        );
    }

    #[test]
    fn predecessor_from_other_vm_is_error() {
        let first = Ack::first(0, 0, blake2_256(b"a"));
        let other = Ack::first(1, 0, blake2_256(b"x"));
        let second = Ack::following(&first, blake2_256(b"b")).unwrap();

        assert_matches!(
            second.verify_serial_hash(Some(&other)),
            Err(AckError::VmIndexMismatch {
                expected: 1,
                actual: 0
            })
        );
    }

    #[test]
    fn skipped_height_is_error() {
        let first = Ack::first(0, 0, blake2_256(b"a"));
        let second = Ack::following(&first, blake2_256(b"b")).unwrap();
        let third = Ack::following(&second, blake2_256(b"c")).unwrap();

        assert_matches!(
            third.verify_serial_hash(Some(&first)),
            Err(AckError::NotConsecutive {
                previous: 0,
                actual: 2
            })
        );
    }

    #[test]
    fn no_ack_follows_last_height() {
        let mut last = Ack::first(4, 0, blake2_256(b"a"));
        last.height = u32::MAX;

        assert_matches!(
            Ack::following(&last, blake2_256(b"b")),
            Err(AckError::HeightExhausted(4))
        );
    }
}
