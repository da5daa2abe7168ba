pub mod encoding;
pub mod hash;
pub(crate) mod time;

pub use hash::{ChainId, HashType};
