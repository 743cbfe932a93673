//! Network rule index
//!
//! Rules are indexed by storage index only; matched candidates are resolved
//! through [`RuleStorage`] and confirmed with the full rule check.
//!
//! Three structures are built in one scan:
//!
//! - host table: `||host^` rules keyed by host hash, probed with every
//!   suffix of the request hostname
//! - token table: each remaining rule keyed by its rarest complete token,
//!   probed with every URL token
//! - fallback: regex and token-less rules, checked for every request

use std::collections::HashMap;
use std::sync::Arc;

use log::info;

use crate::filterlist::{IndexedRule, RuleStorage};
use crate::hash::{hash_domain, hash_token};
use crate::psl::walk_host_suffixes;
use crate::request::Request;
use crate::rules::{NetworkRule, Rule};
use crate::url::tokenize_url;

/// Index over the network rules of a [`RuleStorage`].
#[derive(Debug)]
pub struct NetworkEngine {
    storage: Arc<RuleStorage>,
    host_table: HashMap<u64, Vec<u64>>,
    token_table: HashMap<u32, Vec<u64>>,
    fallback: Vec<u64>,
    rules_count: usize,
}

impl NetworkEngine {
    pub fn new(storage: Arc<RuleStorage>) -> Self {
        let mut host_table: HashMap<u64, Vec<u64>> = HashMap::new();
        let mut token_table: HashMap<u32, Vec<u64>> = HashMap::new();
        let mut fallback = Vec::new();
        let mut rules_count = 0usize;

        let mut tokenized: Vec<(u64, Vec<u32>)> = Vec::new();
        let mut token_freq: HashMap<u32, usize> = HashMap::new();

        for IndexedRule { rule, index } in storage.scanner() {
            let Rule::Network(rule) = rule else {
                continue;
            };
            rules_count += 1;

            if let Some(host) = rule.pattern().host() {
                host_table.entry(hash_domain(&host).to_u64()).or_default().push(index);
                continue;
            }

            let tokens: Vec<u32> = rule.pattern().tokens().iter().map(|t| hash_token(t)).collect();
            if tokens.is_empty() {
                fallback.push(index);
                continue;
            }
            for &token in &tokens {
                *token_freq.entry(token).or_default() += 1;
            }
            tokenized.push((index, tokens));
        }

        // Pick the rarest token so posting lists stay short
        for (index, tokens) in tokenized {
            let best = tokens
                .iter()
                .copied()
                .min_by_key(|t| token_freq.get(t).copied().unwrap_or(0));
            if let Some(token) = best {
                token_table.entry(token).or_default().push(index);
            }
        }

        info!(
            "Network engine: {} rules ({} host, {} token buckets, {} fallback)",
            rules_count,
            host_table.values().map(Vec::len).sum::<usize>(),
            token_table.len(),
            fallback.len()
        );

        Self {
            storage,
            host_table,
            token_table,
            fallback,
            rules_count,
        }
    }

    pub fn storage(&self) -> &Arc<RuleStorage> {
        &self.storage
    }

    /// Number of indexed network rules.
    pub fn rules_count(&self) -> usize {
        self.rules_count
    }

    /// All network rules matching the request, in storage order.
    pub fn match_all(&self, request: &Request) -> Vec<Arc<NetworkRule>> {
        let mut candidates = Vec::new();

        for suffix in walk_host_suffixes(&request.hostname) {
            if let Some(indexes) = self.host_table.get(&hash_domain(suffix).to_u64()) {
                candidates.extend_from_slice(indexes);
            }
        }

        for token in tokenize_url(&request.url) {
            if let Some(indexes) = self.token_table.get(&token) {
                candidates.extend_from_slice(indexes);
            }
        }

        candidates.extend_from_slice(&self.fallback);
        candidates.sort_unstable();
        candidates.dedup();

        candidates
            .into_iter()
            .filter_map(|index| self.storage.retrieve_network_rule(index))
            .filter(|rule| rule.matches(request))
            .collect()
    }
}
