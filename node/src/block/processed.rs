use serde::Serialize;

use crate::block::classifier::ChainCategory;

/// Committed messages waiting to be put into blocks, in commit order per category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessedEntries<M> {
    pub admin_entries: Vec<M>,
    /// Messages of the factoid chain
    pub transactions: Vec<M>,
    /// Messages of all non reserved chains
    pub entry_block_entries: Vec<M>,
    pub entry_credit_entries: Vec<M>,
}

impl<M> ProcessedEntries<M> {
    pub fn new() -> Self {
        Self {
            admin_entries: vec![],
            transactions: vec![],
            entry_block_entries: vec![],
            entry_credit_entries: vec![],
        }
    }

    pub fn push(&mut self, category: ChainCategory, message: M) {
        match category {
            ChainCategory::Admin => self.admin_entries.push(message),
            ChainCategory::EntryCredit => self.entry_credit_entries.push(message),
            ChainCategory::Factoid => self.transactions.push(message),
            ChainCategory::Generic => self.entry_block_entries.push(message),
        }
    }

    pub fn get(&self, category: ChainCategory) -> &[M] {
        match category {
            ChainCategory::Admin => &self.admin_entries,
            ChainCategory::EntryCredit => &self.entry_credit_entries,
            ChainCategory::Factoid => &self.transactions,
            ChainCategory::Generic => &self.entry_block_entries,
        }
    }

    pub fn len(&self) -> usize {
        self.admin_entries.len()
            + self.transactions.len()
            + self.entry_block_entries.len()
            + self.entry_credit_entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<M> Default for ProcessedEntries<M> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn push_goes_to_category_collection() {
        let mut processed = ProcessedEntries::new();
        processed.push(ChainCategory::Admin, 1);
        processed.push(ChainCategory::Factoid, 2);
        processed.push(ChainCategory::Generic, 3);
        processed.push(ChainCategory::EntryCredit, 4);
        processed.push(ChainCategory::Generic, 5);

        assert_eq!(processed.admin_entries, vec![1]);
        assert_eq!(processed.transactions, vec![2]);
        assert_eq!(processed.entry_block_entries, vec![3, 5]);
        assert_eq!(processed.entry_credit_entries, vec![4]);
        assert_eq!(processed.get(ChainCategory::Generic), &[3, 5]);
        assert_eq!(processed.len(), 5);
        assert!(!processed.is_empty());
    }
}
