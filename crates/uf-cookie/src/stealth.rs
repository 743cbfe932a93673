//! Stealth-mode cookie rules
//!
//! Stealth mode shortens the life of every cookie instead of relying on
//! filter lists. It is expressed as synthetic `$cookie` rules so the regular
//! cookie filter applies it.

use std::sync::Arc;

use log::warn;
use serde::{Deserialize, Serialize};
use uf_core::{NetworkRule, Request, RequestType};

/// Stealth cookie settings. Times are in minutes; 0 removes cookies outright.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StealthConfig {
    pub self_destruct_first_party_cookies: bool,
    pub self_destruct_first_party_cookies_time: u32,
    pub self_destruct_third_party_cookies: bool,
    pub self_destruct_third_party_cookies_time: u32,
}

#[derive(Debug, Clone)]
pub struct StealthService {
    config: StealthConfig,
}

impl StealthService {
    pub fn new(config: StealthConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &StealthConfig {
        &self.config
    }

    /// Synthetic `$cookie` rules for the request.
    pub fn get_cookie_rules(&self, request: &Request) -> Vec<Arc<NetworkRule>> {
        let mut rules = Vec::new();

        if self.config.self_destruct_first_party_cookies {
            rules.extend(generate_remove_rule(self.config.self_destruct_first_party_cookies_time));
        }

        if self.config.self_destruct_third_party_cookies
            && request.third_party
            && request.request_type != RequestType::DOCUMENT
        {
            rules.extend(generate_remove_rule(self.config.self_destruct_third_party_cookies_time));
        }

        rules
    }
}

fn generate_remove_rule(max_age_minutes: u32) -> Option<Arc<NetworkRule>> {
    let text = if max_age_minutes > 0 {
        format!("$cookie=/.+/;maxAge={}", u64::from(max_age_minutes) * 60)
    } else {
        "$cookie=/.+/".to_string()
    };
    match NetworkRule::parse(&text, 0) {
        Ok(rule) => Some(Arc::new(rule.into_stealth())),
        Err(e) => {
            warn!("Failed to build stealth rule '{text}': {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(first_party: bool, first_time: u32, third_party: bool, third_time: u32) -> StealthConfig {
        StealthConfig {
            self_destruct_first_party_cookies: first_party,
            self_destruct_first_party_cookies_time: first_time,
            self_destruct_third_party_cookies: third_party,
            self_destruct_third_party_cookies_time: third_time,
        }
    }

    fn third_party_request() -> Request {
        Request::new("https://tracker.com/pixel.gif", "https://example.org/", RequestType::IMAGE)
    }

    #[test]
    fn test_disabled() {
        let service = StealthService::new(StealthConfig::default());
        assert!(service.get_cookie_rules(&third_party_request()).is_empty());
    }

    #[test]
    fn test_first_party_rule() {
        let service = StealthService::new(config(true, 5, false, 0));
        let rules = service.get_cookie_rules(&third_party_request());
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].text(), "$cookie=/.+/;maxAge=300");
        assert!(rules[0].is_stealth_rule());

        let modifier = rules[0].cookie_modifier().expect("cookie modifier");
        assert!(modifier.matches_name("anything"));
        assert_eq!(modifier.max_age(), Some(300));
        assert!(modifier.is_modifying());
    }

    #[test]
    fn test_third_party_rule() {
        let service = StealthService::new(config(false, 0, true, 0));
        let rules = service.get_cookie_rules(&third_party_request());
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].text(), "$cookie=/.+/");
        assert!(!rules[0].cookie_modifier().expect("cookie modifier").is_modifying());

        let first_party = Request::new("https://example.org/a.js", "https://example.org/", RequestType::SCRIPT);
        assert!(service.get_cookie_rules(&first_party).is_empty());

        let document = Request::new("https://tracker.com/", "https://example.org/", RequestType::DOCUMENT);
        assert!(service.get_cookie_rules(&document).is_empty());
    }

    #[test]
    fn test_config_json() {
        let config: StealthConfig = serde_json::from_str(
            r#"{"selfDestructFirstPartyCookies": true, "selfDestructFirstPartyCookiesTime": 10}"#,
        )
        .expect("config");
        assert_eq!(config, self::config(true, 10, false, 0));
    }
}
