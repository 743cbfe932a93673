//! Request matching engine
//!
//! [`Engine`] wraps the network rule index, drops rules disabled by
//! `$badfilter` and classifies the rest into a [`MatchingResult`].

mod matching_result;
mod network_engine;

use std::sync::Arc;

use log::{debug, info};

pub use matching_result::MatchingResult;
pub use network_engine::NetworkEngine;

use crate::config::EngineConfig;
use crate::filterlist::RuleStorage;
use crate::request::{Request, RequestType};
use crate::rules::{BadfilterOutcome, NetworkRule};

/// Matches requests against the rules of a [`RuleStorage`].
#[derive(Debug)]
pub struct Engine {
    network: NetworkEngine,
    config: EngineConfig,
}

impl Engine {
    pub fn new(storage: RuleStorage) -> Self {
        Self::with_config(storage, EngineConfig::default())
    }

    pub fn with_config(storage: RuleStorage, config: EngineConfig) -> Self {
        let network = NetworkEngine::new(Arc::new(storage));
        info!(
            "{} {} loaded {} network rules",
            config.engine,
            config.version,
            network.rules_count()
        );
        Self { network, config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn storage(&self) -> &RuleStorage {
        self.network.storage()
    }

    pub fn rules_count(&self) -> usize {
        self.network.rules_count()
    }

    /// Every network rule that applies to the request after `$badfilter`.
    ///
    /// `$badfilter` rules themselves are never returned.
    pub fn match_all(&self, request: &Request) -> Vec<Arc<NetworkRule>> {
        apply_badfilters(self.network.match_all(request), request)
    }

    /// Match the request and the page that issued it.
    pub fn match_request(&self, request: &Request) -> MatchingResult {
        let rules = self.match_all(request);
        let source_rules = if request.source_url.is_empty() {
            Vec::new()
        } else {
            self.match_all(&Request::new(&request.source_url, "", RequestType::DOCUMENT))
        };

        if self.config.verbose {
            debug!(
                "{}: {} rules, {} source rules",
                request.url,
                rules.len(),
                source_rules.len()
            );
        }

        MatchingResult::new(rules, source_rules)
    }
}

fn apply_badfilters(rules: Vec<Arc<NetworkRule>>, request: &Request) -> Vec<Arc<NetworkRule>> {
    let (badfilters, rules): (Vec<_>, Vec<_>) = rules.into_iter().partition(|r| r.is_badfilter());
    if badfilters.is_empty() {
        return rules;
    }

    rules
        .into_iter()
        .filter(|rule| {
            let keep = survives_badfilters(rule, &badfilters, request);
            if !keep {
                debug!("Rule '{}' disabled by $badfilter", rule.text());
            }
            keep
        })
        .collect()
}

/// Badfilters narrow the rule one after another; it survives only if what
/// remains still applies to the request.
fn survives_badfilters(rule: &NetworkRule, badfilters: &[Arc<NetworkRule>], request: &Request) -> bool {
    let mut narrowed: Option<NetworkRule> = None;
    for badfilter in badfilters {
        let current = narrowed.as_ref().unwrap_or(rule);
        match badfilter.apply_badfilter(current) {
            BadfilterOutcome::NotApplicable => {}
            BadfilterOutcome::Cancelled => return false,
            BadfilterOutcome::Narrowed(rule) => narrowed = Some(rule),
        }
    }
    narrowed.map_or(true, |rule| rule.matches(request))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filterlist::StringRuleList;

    fn engine(rules: &[&str]) -> Engine {
        let storage = RuleStorage::new(vec![StringRuleList::new(1, rules.join("\n"))]).expect("storage");
        Engine::new(storage)
    }

    fn texts(rules: &[Arc<NetworkRule>]) -> Vec<&str> {
        rules.iter().map(|r| r.text()).collect()
    }

    #[test]
    fn test_match_all() {
        let engine = engine(&["||example.org^$third-party", "||example.org/path", "||other.org^"]);
        let request = Request::new("https://example.org/path/a.js", "https://example.org", RequestType::SCRIPT);
        assert_eq!(texts(&engine.match_all(&request)), vec!["||example.org/path"]);
    }

    #[test]
    fn test_third_party_no_match() {
        let engine = engine(&["||example.org^$third-party"]);
        let request = Request::new("https://example.org/", "", RequestType::DOCUMENT);
        let result = engine.match_request(&request);
        assert!(result.get_basic_result().is_none());
    }

    #[test]
    fn test_third_party_on_shared_suffix() {
        let engine = engine(&["||evil.github.io^$third-party", "||tracker.com.sg^$~third-party"]);

        let request = Request::new("https://evil.github.io/x.js", "https://victim.github.io/", RequestType::SCRIPT);
        assert_eq!(texts(&engine.match_all(&request)), vec!["||evil.github.io^$third-party"]);

        let request = Request::new("https://tracker.com.sg/p.gif", "https://shop.com.sg/", RequestType::IMAGE);
        assert!(engine.match_all(&request).is_empty());

        let request = Request::new("https://tracker.com.sg/p.gif", "https://www.tracker.com.sg/", RequestType::IMAGE);
        assert_eq!(texts(&engine.match_all(&request)), vec!["||tracker.com.sg^$~third-party"]);
    }

    #[test]
    fn test_badfilter() {
        let engine = engine(&["||example.org^", "||example.org^$badfilter"]);
        let request = Request::new("https://example.org/", "", RequestType::OTHER);
        assert!(engine.match_all(&request).is_empty());
        assert!(engine.match_request(&request).get_basic_result().is_none());
    }

    #[test]
    fn test_badfilter_narrows_domains() {
        let engine = engine(&[
            "||example.org^$domain=test.com|test2.com",
            "||example.org^$domain=test.com,badfilter",
        ]);

        let request = Request::new("https://example.org/", "https://test.com/", RequestType::OTHER);
        assert!(engine.match_all(&request).is_empty());

        let request = Request::new("https://example.org/", "https://test2.com/", RequestType::OTHER);
        assert_eq!(texts(&engine.match_all(&request)), vec!["||example.org^$domain=test.com|test2.com"]);
    }

    #[test]
    fn test_badfilter_sequence() {
        let engine = engine(&[
            "||example.org^$domain=test.com|test2.com|test3.com",
            "||example.org^$domain=test.com,badfilter",
            "||example.org^$domain=test2.com,badfilter",
        ]);

        for source in ["https://test.com/", "https://test2.com/"] {
            let request = Request::new("https://example.org/", source, RequestType::OTHER);
            assert!(engine.match_all(&request).is_empty(), "{source}");
        }

        let request = Request::new("https://example.org/", "https://test3.com/", RequestType::OTHER);
        assert_eq!(engine.match_all(&request).len(), 1);
    }

    #[test]
    fn test_badfilter_returns_original_rule() {
        let engine = engine(&["||example.org^$domain=a.com|b.com", "||example.org^$domain=a.com,badfilter"]);
        let request = Request::new("https://example.org/", "https://b.com/", RequestType::OTHER);
        let rules = engine.match_all(&request);
        assert_eq!(rules[0].permitted_domains(), ["a.com".to_string(), "b.com".to_string()]);
    }

    #[test]
    fn test_advanced_modifiers() {
        let engine = engine(&[
            "||example.org^$csp=frame-src 'none'",
            "||example.org^$replace=/text-to-be-replaced/new-text/i",
            "||example.org^$cookie",
        ]);
        let request = Request::new("https://example.org/", "", RequestType::DOCUMENT);
        let result = engine.match_request(&request);
        assert!(result.basic_rule().is_none());
        assert_eq!(result.get_csp_rules().len(), 1);
        assert_eq!(result.get_replace_rules().len(), 1);
        assert_eq!(result.get_cookie_rules().len(), 1);
    }

    #[test]
    fn test_source_document_rule() {
        let engine = engine(&["||tracker.com^", "@@||page.org^$document"]);
        let request = Request::new("https://tracker.com/t.js", "https://page.org/", RequestType::SCRIPT);
        let result = engine.match_request(&request);
        assert_eq!(result.basic_rule().map(|r| r.text()), Some("||tracker.com^"));
        assert_eq!(result.get_basic_result().map(|r| r.text()), Some("@@||page.org^$document"));
    }

    #[test]
    fn test_config() {
        let storage = RuleStorage::new(Vec::new()).expect("storage");
        let config = EngineConfig::from_json_str(r#"{"engine": "test", "version": "1.0", "verbose": true}"#)
            .expect("config");
        let engine = Engine::with_config(storage, config);
        assert_eq!(engine.config().engine, "test");
        assert_eq!(engine.config().version, "1.0");
        assert_eq!(engine.rules_count(), 0);
    }
}
