//! Classification of the rules matched for one request

use std::sync::Arc;

use crate::rules::{AdvancedModifier, NetworkRule, NetworkRuleOption};

/// The rules that apply to a request, split by purpose.
#[derive(Debug, Clone, Default)]
pub struct MatchingResult {
    basic_rule: Option<Arc<NetworkRule>>,
    document_rule: Option<Arc<NetworkRule>>,
    stealth_rule: Option<Arc<NetworkRule>>,
    cookie_rules: Vec<Arc<NetworkRule>>,
    csp_rules: Vec<Arc<NetworkRule>>,
    replace_rules: Vec<Arc<NetworkRule>>,
    removeparam_rules: Vec<Arc<NetworkRule>>,
}

impl MatchingResult {
    /// Classify `rules` matched for the request and `source_rules` matched
    /// for the page that issued it.
    pub fn new(rules: Vec<Arc<NetworkRule>>, source_rules: Vec<Arc<NetworkRule>>) -> Self {
        let document_rule = source_rules
            .iter()
            .filter(|r| r.is_whitelist() && r.is_option_enabled(NetworkRuleOption::URLBLOCK))
            .min_by(|a, b| a.priority_cmp(b))
            .cloned();
        let generic_block_disabled = source_rules
            .iter()
            .any(|r| r.is_whitelist() && r.is_option_enabled(NetworkRuleOption::GENERICBLOCK));

        let mut basic = Vec::new();
        let mut redirect_allows = Vec::new();
        let mut stealth = Vec::new();
        let mut cookie_rules = Vec::new();
        let mut csp_rules = Vec::new();
        let mut replace_rules = Vec::new();
        let mut removeparam_rules = Vec::new();

        for rule in rules {
            if rule.is_badfilter() {
                continue;
            }
            match rule.advanced_modifier() {
                Some(AdvancedModifier::Cookie(_)) => cookie_rules.push(rule),
                Some(AdvancedModifier::Csp(_)) => csp_rules.push(rule),
                Some(AdvancedModifier::Replace(_)) => replace_rules.push(rule),
                Some(AdvancedModifier::RemoveParam(_)) => removeparam_rules.push(rule),
                Some(AdvancedModifier::Redirect(_)) if rule.is_whitelist() => redirect_allows.push(rule),
                Some(AdvancedModifier::Redirect(_)) | None => {
                    if rule.is_whitelist() && rule.is_option_enabled(NetworkRuleOption::STEALTH) {
                        stealth.push(rule);
                    } else if rule.is_cosmetic_only_whitelist() {
                        continue;
                    } else if generic_block_disabled && !rule.is_whitelist() && rule.is_generic() {
                        continue;
                    } else {
                        basic.push(rule);
                    }
                }
            }
        }

        // `@@$redirect` rules only take the redirect away
        if !redirect_allows.is_empty() {
            basic.retain(|rule| {
                !matches!(rule.advanced_modifier(), Some(AdvancedModifier::Redirect(_)))
                    || !is_cancelled(rule, &redirect_allows)
            });
        }

        Self {
            basic_rule: basic.into_iter().min_by(|a, b| a.priority_cmp(b)),
            document_rule,
            stealth_rule: stealth.into_iter().min_by(|a, b| a.priority_cmp(b)),
            cookie_rules: filter_advanced(cookie_rules),
            csp_rules: filter_advanced(csp_rules),
            replace_rules: filter_advanced(replace_rules),
            removeparam_rules: filter_advanced(removeparam_rules),
        }
    }

    /// The winning rule among the rules that can block or unblock the request.
    pub fn basic_rule(&self) -> Option<&Arc<NetworkRule>> {
        self.basic_rule.as_ref()
    }

    /// The allow-list rule that disables filtering on the source page.
    pub fn document_rule(&self) -> Option<&Arc<NetworkRule>> {
        self.document_rule.as_ref()
    }

    pub fn stealth_rule(&self) -> Option<&Arc<NetworkRule>> {
        self.stealth_rule.as_ref()
    }

    /// The rule deciding whether the request is blocked.
    ///
    /// A page-level allow-list rule takes precedence over anything matched
    /// for the request itself.
    pub fn get_basic_result(&self) -> Option<&Arc<NetworkRule>> {
        self.document_rule.as_ref().or(self.basic_rule.as_ref())
    }

    pub fn get_cookie_rules(&self) -> &[Arc<NetworkRule>] {
        self.unless_disabled(&self.cookie_rules)
    }

    pub fn get_csp_rules(&self) -> &[Arc<NetworkRule>] {
        self.unless_disabled(&self.csp_rules)
    }

    pub fn get_replace_rules(&self) -> &[Arc<NetworkRule>] {
        self.unless_disabled(&self.replace_rules)
    }

    pub fn get_removeparam_rules(&self) -> &[Arc<NetworkRule>] {
        self.unless_disabled(&self.removeparam_rules)
    }

    fn filtering_disabled(&self) -> bool {
        if self.document_rule.is_some() {
            return true;
        }
        self.basic_rule
            .as_ref()
            .is_some_and(|r| r.is_whitelist() && r.is_option_enabled(NetworkRuleOption::URLBLOCK))
    }

    fn unless_disabled<'a>(&self, rules: &'a [Arc<NetworkRule>]) -> &'a [Arc<NetworkRule>] {
        if self.filtering_disabled() {
            &[]
        } else {
            rules
        }
    }
}

fn modifier_value(rule: &NetworkRule) -> &str {
    rule.advanced_modifier().map(AdvancedModifier::value).unwrap_or_default()
}

/// A blocking rule is cancelled by a value-less allow-list rule of the same
/// kind or by one carrying the same value.
fn is_cancelled(rule: &NetworkRule, allows: &[Arc<NetworkRule>]) -> bool {
    allows.iter().any(|allow| {
        let value = modifier_value(allow);
        value.is_empty() || value == modifier_value(rule)
    })
}

/// Drop cancelled blocking rules; allow-list rules are kept after them.
fn filter_advanced(rules: Vec<Arc<NetworkRule>>) -> Vec<Arc<NetworkRule>> {
    let (allows, blocks): (Vec<_>, Vec<_>) = rules.into_iter().partition(|r| r.is_whitelist());
    let mut result: Vec<Arc<NetworkRule>> = blocks.into_iter().filter(|r| !is_cancelled(r, &allows)).collect();
    result.extend(allows);
    result
}
