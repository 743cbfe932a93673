//! Rule storage with stable indexes and random-access retrieval

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use log::debug;

use super::rule_list::StringRuleList;
use super::scanner::{split_storage_index, RuleScanner, RuleStorageScanner};
use crate::rules::{parse_rule, NetworkRule, Rule};

/// Error type for rule storage construction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    #[error("Duplicate filter list id: {0}")]
    DuplicateListId(u32),
    #[error("Filter list {id} is {len} bytes, over the {MAX_LIST_LEN} byte limit of 32-bit line offsets")]
    ListTooLarge { id: u32, len: usize },
}

/// Largest list text whose line offsets fit the low half of a storage index.
pub const MAX_LIST_LEN: usize = u32::MAX as usize;

fn check_list_len(id: u32, len: usize) -> Result<(), StorageError> {
    if len > MAX_LIST_LEN {
        return Err(StorageError::ListTooLarge { id, len });
    }
    Ok(())
}

/// Owns the filter lists and resolves storage indexes back to rules.
///
/// Indexes are `(list_id << 32) | byte_offset_of_line`. Retrieved rules are
/// cached, so each line is parsed at most once per storage. The cache holds
/// at most one entry per rule line and only shrinks through `clear_cache`,
/// which hosts call to release rules that stopped matching.
#[derive(Debug)]
pub struct RuleStorage {
    lists: Vec<StringRuleList>,
    positions: HashMap<u32, usize>,
    cache: RwLock<HashMap<u64, Rule>>,
}

impl RuleStorage {
    pub fn new(lists: Vec<StringRuleList>) -> Result<Self, StorageError> {
        let mut positions = HashMap::with_capacity(lists.len());
        for (pos, list) in lists.iter().enumerate() {
            check_list_len(list.id(), list.text().len())?;
            if positions.insert(list.id(), pos).is_some() {
                return Err(StorageError::DuplicateListId(list.id()));
            }
        }
        Ok(Self {
            lists,
            positions,
            cache: RwLock::new(HashMap::new()),
        })
    }

    pub fn lists(&self) -> &[StringRuleList] {
        &self.lists
    }

    /// Scan every rule of every list in load order.
    pub fn scanner(&self) -> RuleStorageScanner<'_> {
        RuleStorageScanner::new(self.lists.iter().map(RuleScanner::new).collect())
    }

    /// Retrieve a rule by a previously scanned index.
    pub fn retrieve_rule(&self, index: u64) -> Option<Rule> {
        if let Some(rule) = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&index)
        {
            return Some(rule.clone());
        }

        let (list_id, offset) = split_storage_index(index);
        let list = &self.lists[*self.positions.get(&list_id)?];
        let line = list.line_at(offset)?;

        let rule = match parse_rule(line, list_id, list.parse_options()) {
            Ok(rule) => rule?,
            Err(e) => {
                debug!("Index {index:#x} does not hold a valid rule: {e}");
                return None;
            }
        };

        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(index, rule.clone());
        Some(rule)
    }

    /// Retrieve a network rule; `None` for cosmetic rules and bad indexes.
    pub fn retrieve_network_rule(&self, index: u64) -> Option<Arc<NetworkRule>> {
        match self.retrieve_rule(index)? {
            Rule::Network(rule) => Some(rule),
            Rule::Cosmetic(_) => None,
        }
    }

    /// Number of cached rules.
    pub fn cache_len(&self) -> usize {
        self.cache.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Drop every cached rule. Later retrievals parse the line again.
    pub fn clear_cache(&self) {
        self.cache.write().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filterlist::scanner::IndexedRule;

    fn storage(lists: Vec<StringRuleList>) -> RuleStorage {
        RuleStorage::new(lists).expect("unique list ids")
    }

    #[test]
    fn test_scan_and_retrieve() {
        let storage = storage(vec![
            StringRuleList::new(1, "||example.org\n! test\n##banner"),
            StringRuleList::new(1001, "||example.com\n! test\n##advert"),
        ]);

        let rules: Vec<IndexedRule> = storage.scanner().collect();
        let indexes: Vec<u64> = rules.iter().map(|r| r.index).collect();
        assert_eq!(indexes, vec![0x1_0000_0000, 0x1_0000_0015, 0x3e9_0000_0000, 0x3e9_0000_0015]);

        let rule = storage.retrieve_rule(0x1_0000_0000).expect("rule");
        assert_eq!(rule.text(), "||example.org");
        assert_eq!(rule.filter_list_id(), 1);

        let rule = storage.retrieve_rule(0x1_0000_0015).expect("rule");
        assert_eq!(rule.text(), "##banner");

        let rule = storage.retrieve_network_rule(0x3e9_0000_0000).expect("rule");
        assert_eq!(rule.text(), "||example.com");
        assert_eq!(rule.filter_list_id(), 1001);

        assert!(storage.retrieve_network_rule(0x3e9_0000_0015).is_none());
    }

    #[test]
    fn test_retrieve_invalid_index() {
        let storage = storage(vec![StringRuleList::new(1, "||example.org\n! test")]);
        assert!(storage.retrieve_rule(0x2_0000_0000).is_none());
        assert!(storage.retrieve_rule(0x1_0000_0003).is_none());
        assert!(storage.retrieve_rule(0x1_0000_000e).is_none());
    }

    #[test]
    fn test_retrieve_is_cached_and_stable() {
        let storage = storage(vec![StringRuleList::new(1, "||example.org^")]);
        let first = storage.retrieve_network_rule(0x1_0000_0000).expect("rule");
        assert_eq!(storage.cache_len(), 1);
        let second = storage.retrieve_network_rule(0x1_0000_0000).expect("rule");
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_duplicate_list_id() {
        let result = RuleStorage::new(vec![StringRuleList::new(7, "a"), StringRuleList::new(7, "b")]);
        assert!(matches!(result, Err(StorageError::DuplicateListId(7))));
    }

    #[test]
    fn test_list_size_limit() {
        assert!(check_list_len(3, MAX_LIST_LEN).is_ok());
        let err = check_list_len(3, MAX_LIST_LEN + 1).expect_err("too large");
        assert_eq!(err, StorageError::ListTooLarge { id: 3, len: MAX_LIST_LEN + 1 });
        assert!(err.to_string().contains("Filter list 3"));
    }

    #[test]
    fn test_clear_cache() {
        let storage = storage(vec![StringRuleList::new(1, "||example.org^\n||example.com^")]);
        let first = storage.retrieve_network_rule(0x1_0000_0000).expect("rule");
        storage.retrieve_network_rule(0x1_0000_000f).expect("rule");
        assert_eq!(storage.cache_len(), 2);

        storage.clear_cache();
        assert_eq!(storage.cache_len(), 0);
        let again = storage.retrieve_network_rule(0x1_0000_0000).expect("rule");
        assert!(!Arc::ptr_eq(&first, &again));
        assert_eq!(again.text(), "||example.org^");
    }
}
