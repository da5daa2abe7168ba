use crate::utilities::hash::ChainId;

/// Maps a chain to the index of the VM which sequences it.
///
/// Sums the bytes of the chain id and takes the remainder modulo `number_of_leaders`. It only
/// spreads chains over VMs, collisions between chains are expected.
pub fn route(chain_id: &ChainId, number_of_leaders: usize) -> usize {
    if number_of_leaders < 2 {
        return 0;
    }

    let sum = chain_id
        .as_bytes()
        .iter()
        .fold(0u64, |acc, b| acc.wrapping_add(u64::from(*b)));

    (sum % number_of_leaders as u64) as usize
}
