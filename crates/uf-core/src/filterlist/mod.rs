//! Filter lists, rule storage and scanning

mod rule_list;
mod scanner;
mod storage;

pub use rule_list::StringRuleList;
pub use scanner::{split_storage_index, storage_index, IndexedRule, RuleScanner, RuleStorageScanner};
pub use storage::{RuleStorage, StorageError};
