use serde::{Deserialize, Serialize};

use crate::utilities::hash::ChainId;

/// Category of a chain, decides into which output collection committed messages go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum ChainCategory {
    /// Administrative chain, its entries go into the admin block
    Admin,
    /// Entry credit chain, its entries go into the entry credit block
    EntryCredit,
    /// Factoid chain, its entries are transactions
    Factoid,
    /// Any other chain, its entries go into entry blocks
    Generic,
}

pub trait ChainClassifier {
    fn classify(&self, chain_id: &ChainId) -> ChainCategory;
}

impl<F> ChainClassifier for F
where
    F: Fn(&ChainId) -> ChainCategory,
{
    fn classify(&self, chain_id: &ChainId) -> ChainCategory {
        self(chain_id)
    }
}

/// Classifies the well known reserved chains, everything else is [ChainCategory::Generic].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ReservedChains {
    pub admin: ChainId,
    pub entry_credit: ChainId,
    pub factoid: ChainId,
}

impl ReservedChains {
    pub const ADMIN_CHAIN_ID: ChainId = ChainId::from_low_byte(0x0a);
    pub const ENTRY_CREDIT_CHAIN_ID: ChainId = ChainId::from_low_byte(0x0c);
    pub const FACTOID_CHAIN_ID: ChainId = ChainId::from_low_byte(0x0f);
}

impl Default for ReservedChains {
    fn default() -> Self {
        Self {
            admin: Self::ADMIN_CHAIN_ID,
            entry_credit: Self::ENTRY_CREDIT_CHAIN_ID,
            factoid: Self::FACTOID_CHAIN_ID,
        }
    }
}

impl ChainClassifier for ReservedChains {
    fn classify(&self, chain_id: &ChainId) -> ChainCategory {
        if *chain_id == self.admin {
            ChainCategory::Admin
        } else if *chain_id == self.entry_credit {
            ChainCategory::EntryCredit
        } else if *chain_id == self.factoid {
            ChainCategory::Factoid
        } else {
            ChainCategory::Generic
        }
    }
}
