//! Sequential rule scanning

use log::warn;

use super::rule_list::StringRuleList;
use crate::rules::{parse_rule, Rule};

/// A rule together with its storage index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedRule {
    pub rule: Rule,
    pub index: u64,
}

/// Compose a storage index from a list id and a line offset.
#[inline]
pub fn storage_index(list_id: u32, offset: usize) -> u64 {
    (u64::from(list_id) << 32) | (offset as u64 & 0xffff_ffff)
}

/// Split a storage index into list id and line offset.
#[inline]
pub fn split_storage_index(index: u64) -> (u32, usize) {
    ((index >> 32) as u32, (index & 0xffff_ffff) as usize)
}

/// Scans one list, yielding every rule in order. Unparsable lines are
/// logged and skipped.
pub struct RuleScanner<'a> {
    list: &'a StringRuleList,
    lines: Box<dyn Iterator<Item = (usize, &'a str)> + 'a>,
}

impl<'a> RuleScanner<'a> {
    pub fn new(list: &'a StringRuleList) -> Self {
        Self {
            list,
            lines: Box::new(list.lines()),
        }
    }
}

impl Iterator for RuleScanner<'_> {
    type Item = IndexedRule;

    fn next(&mut self) -> Option<Self::Item> {
        for (offset, line) in self.lines.by_ref() {
            match parse_rule(line, self.list.id(), self.list.parse_options()) {
                Ok(Some(rule)) => {
                    return Some(IndexedRule {
                        rule,
                        index: storage_index(self.list.id(), offset),
                    })
                }
                Ok(None) => {}
                Err(e) => warn!("List {}: skipping '{}': {}", self.list.id(), line.trim(), e),
            }
        }
        None
    }
}

/// Scans several lists one after another.
pub struct RuleStorageScanner<'a> {
    scanners: Vec<RuleScanner<'a>>,
    current: usize,
}

impl<'a> RuleStorageScanner<'a> {
    pub fn new(scanners: Vec<RuleScanner<'a>>) -> Self {
        Self { scanners, current: 0 }
    }
}

impl Iterator for RuleStorageScanner<'_> {
    type Item = IndexedRule;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(scanner) = self.scanners.get_mut(self.current) {
            if let Some(rule) = scanner.next() {
                return Some(rule);
            }
            self.current += 1;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_index_roundtrip() {
        assert_eq!(storage_index(1, 0), 0x1_0000_0000);
        assert_eq!(storage_index(1001, 0), 0x3e9_0000_0000);
        assert_eq!(split_storage_index(0x1_0000_0015), (1, 21));
    }

    #[test]
    fn test_rule_scanner_skips_invalid_lines() {
        let list = StringRuleList::new(1, "||example.org^\n||bad^$unknown\n\n! comment\n@@||example.org/ok^");
        let rules: Vec<IndexedRule> = RuleScanner::new(&list).collect();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].rule.text(), "||example.org^");
        assert_eq!(rules[0].index, storage_index(1, 0));
        assert_eq!(rules[1].rule.text(), "@@||example.org/ok^");
        assert_eq!(rules[1].index, storage_index(1, 41));
    }

    #[test]
    fn test_storage_scanner_chains_lists() {
        let first = StringRuleList::new(1, "||a.org^");
        let second = StringRuleList::new(2, "||b.org^\n||c.org^");
        let scanner = RuleStorageScanner::new(vec![RuleScanner::new(&first), RuleScanner::new(&second)]);
        let texts: Vec<String> = scanner.map(|r| r.rule.text().to_string()).collect();
        assert_eq!(texts, vec!["||a.org^", "||b.org^", "||c.org^"]);
    }
}
