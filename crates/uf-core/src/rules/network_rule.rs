//! Network rule model, parser and matcher

use std::cmp::Ordering;

use super::modifiers::{AdvancedModifier, CookieModifier, ReplaceModifier};
use super::options::{lookup_option, NetworkRuleOption, OptionKind};
use super::pattern::Pattern;
use super::{split_by_delimiter_with_escape, RuleParseError, ESCAPE_CHARACTER};
use crate::psl::is_domain_or_subdomain_of_any;
use crate::request::{Request, RequestType};

pub const MASK_WHITELIST: &str = "@@";
pub const OPTIONS_DELIMITER: char = '$';
pub const NOT_MARK: char = '~';

/// A parsed network (URL) rule. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkRule {
    text: String,
    filter_list_id: u32,
    whitelist: bool,
    pattern: Pattern,

    enabled_options: NetworkRuleOption,
    disabled_options: NetworkRuleOption,

    permitted_domains: Vec<String>,
    restricted_domains: Vec<String>,

    permitted_request_types: RequestType,
    restricted_request_types: RequestType,

    advanced: Option<AdvancedModifier>,
    stealth_rule: bool,
}

/// Effect of a `$badfilter` rule on another rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BadfilterOutcome {
    /// The badfilter targets a different rule.
    NotApplicable,
    /// The rule is disabled completely.
    Cancelled,
    /// The badfilter removed some of the rule's permitted domains.
    Narrowed(NetworkRule),
}

// =============================================================================
// Parsing
// =============================================================================

impl NetworkRule {
    pub fn parse(text: &str, filter_list_id: u32) -> Result<Self, RuleParseError> {
        let text = text.trim();
        let (whitelist, body) = match text.strip_prefix(MASK_WHITELIST) {
            Some(rest) => (true, rest),
            None => (false, text),
        };

        if body.is_empty() {
            return Err(RuleParseError::Empty);
        }

        let (pattern_text, options_text) = split_pattern_and_options(body);

        let mut rule = Self {
            text: text.to_string(),
            filter_list_id,
            whitelist,
            // Recompiled below once $match-case is known
            pattern: Pattern::compile("", false)?,
            enabled_options: NetworkRuleOption::empty(),
            disabled_options: NetworkRuleOption::empty(),
            permitted_domains: Vec::new(),
            restricted_domains: Vec::new(),
            permitted_request_types: RequestType::empty(),
            restricted_request_types: RequestType::empty(),
            advanced: None,
            stealth_rule: false,
        };

        if let Some(options_text) = options_text {
            for option in split_by_delimiter_with_escape(options_text, ',', ESCAPE_CHARACTER, false) {
                rule.load_option(&option)?;
            }
        }

        rule.validate(pattern_text)?;
        rule.pattern = Pattern::compile(pattern_text, rule.is_option_enabled(NetworkRuleOption::MATCH_CASE))?;
        Ok(rule)
    }

    /// Mark a synthesized rule as coming from stealth mode.
    pub fn into_stealth(mut self) -> Self {
        self.stealth_rule = true;
        self
    }

    fn load_option(&mut self, option: &str) -> Result<(), RuleParseError> {
        let option = option.trim();
        let (name, value) = match option.split_once('=') {
            Some((name, value)) => (name.trim(), Some(value.trim())),
            None => (option, None),
        };
        let (negated, name) = match name.strip_prefix(NOT_MARK) {
            Some(rest) => (true, rest),
            None => (false, name),
        };
        let name = name.to_ascii_lowercase();

        let kind = lookup_option(&name).ok_or_else(|| RuleParseError::UnknownOption(name.clone()))?;

        match kind {
            OptionKind::Noop => {}
            OptionKind::Flag(flag) => {
                if negated && !NetworkRuleOption::NEGATABLE.contains(flag) {
                    return Err(RuleParseError::NotNegatable(name));
                }
                self.set_option(flag, !negated, &name)?;
            }
            OptionKind::FirstParty => self.set_option(NetworkRuleOption::THIRD_PARTY, negated, &name)?,
            OptionKind::Document => {
                self.set_request_type(RequestType::DOCUMENT, !negated, &name)?;
                if self.whitelist && !negated {
                    self.enabled_options |= NetworkRuleOption::DOCUMENT_WHITELIST;
                }
            }
            OptionKind::RequestType(request_type) => self.set_request_type(request_type, !negated, &name)?,
            OptionKind::Domain => {
                if negated {
                    return Err(RuleParseError::NotNegatable(name));
                }
                self.load_domains(value.unwrap_or_default())?;
            }
            OptionKind::Advanced(flag) => {
                if negated {
                    return Err(RuleParseError::NotNegatable(name));
                }
                if self.advanced.is_some() {
                    return Err(RuleParseError::MultipleModifiers);
                }
                self.enabled_options |= flag;
                self.advanced = Some(self.parse_advanced(flag, &name, value.unwrap_or_default())?);
            }
        }

        Ok(())
    }

    fn set_option(&mut self, flag: NetworkRuleOption, enabled: bool, name: &str) -> Result<(), RuleParseError> {
        let (set, other) = if enabled {
            (&mut self.enabled_options, self.disabled_options)
        } else {
            (&mut self.disabled_options, self.enabled_options)
        };
        if other.intersects(flag) {
            return Err(RuleParseError::ConflictingOption(name.to_string()));
        }
        *set |= flag;
        Ok(())
    }

    fn set_request_type(&mut self, request_type: RequestType, permitted: bool, name: &str) -> Result<(), RuleParseError> {
        let (set, other) = if permitted {
            (&mut self.permitted_request_types, self.restricted_request_types)
        } else {
            (&mut self.restricted_request_types, self.permitted_request_types)
        };
        if other.intersects(request_type) {
            return Err(RuleParseError::ConflictingOption(name.to_string()));
        }
        *set |= request_type;
        Ok(())
    }

    fn load_domains(&mut self, value: &str) -> Result<(), RuleParseError> {
        if value.is_empty() {
            return Err(RuleParseError::EmptyDomain);
        }
        for domain in value.split('|') {
            let domain = domain.trim();
            let (restricted, domain) = match domain.strip_prefix(NOT_MARK) {
                Some(rest) => (true, rest.trim()),
                None => (false, domain),
            };
            if domain.is_empty() {
                return Err(RuleParseError::EmptyDomain);
            }
            let domain = domain.to_ascii_lowercase();
            let (list, other) = if restricted {
                (&mut self.restricted_domains, &self.permitted_domains)
            } else {
                (&mut self.permitted_domains, &self.restricted_domains)
            };
            if other.contains(&domain) {
                return Err(RuleParseError::DomainConflict(domain));
            }
            if !list.contains(&domain) {
                list.push(domain);
            }
        }
        Ok(())
    }

    fn parse_advanced(&self, flag: NetworkRuleOption, name: &str, value: &str) -> Result<AdvancedModifier, RuleParseError> {
        let require_value = |value: &str| {
            if value.is_empty() && !self.whitelist {
                Err(RuleParseError::InvalidModifier {
                    option: name.to_string(),
                    reason: "value is required on blocking rules".to_string(),
                })
            } else {
                Ok(value.to_string())
            }
        };

        let modifier = match flag {
            NetworkRuleOption::COOKIE => AdvancedModifier::Cookie(CookieModifier::parse(value)?),
            NetworkRuleOption::CSP => AdvancedModifier::Csp(require_value(value)?),
            NetworkRuleOption::REMOVEPARAM => AdvancedModifier::RemoveParam(require_value(value)?),
            NetworkRuleOption::REDIRECT => AdvancedModifier::Redirect(require_value(value)?),
            _ => {
                if value.is_empty() && self.whitelist {
                    // @@...$replace disables every replace rule
                    AdvancedModifier::Replace(ReplaceModifier::disabling())
                } else {
                    AdvancedModifier::Replace(ReplaceModifier::parse(value)?)
                }
            }
        };
        Ok(modifier)
    }

    fn validate(&self, pattern_text: &str) -> Result<(), RuleParseError> {
        if !self.whitelist {
            let whitelist_only = self.enabled_options & NetworkRuleOption::WHITELIST_ONLY;
            if !whitelist_only.is_empty() {
                return Err(RuleParseError::WhitelistOnly(format!("{whitelist_only:?}")));
            }
        } else {
            let blacklist_only = self.enabled_options & NetworkRuleOption::BLACKLIST_ONLY;
            if !blacklist_only.is_empty() {
                return Err(RuleParseError::BlacklistOnly(format!("{blacklist_only:?}")));
            }
        }

        let matches_everything = matches!(pattern_text, "" | "*" | "|*" | "||*" | "*|");
        if pattern_text.is_empty()
            && self.enabled_options.is_empty()
            && self.disabled_options.is_empty()
            && self.permitted_domains.is_empty()
            && self.restricted_domains.is_empty()
            && self.permitted_request_types.is_empty()
            && self.restricted_request_types.is_empty()
        {
            return Err(RuleParseError::Empty);
        }
        if matches_everything && self.permitted_domains.is_empty() && self.advanced.is_none() {
            return Err(RuleParseError::TooWide);
        }
        Ok(())
    }
}

/// Split at the last unescaped `$`, ignoring a `$` that ends a regex (`$/`).
/// A trailing unescaped `$` is a delimiter with no options after it.
fn split_pattern_and_options(body: &str) -> (&str, Option<&str>) {
    let bytes = body.as_bytes();
    if bytes.len() < 2 {
        return (body, None);
    }
    let last = bytes.len() - 1;
    if bytes[last] == OPTIONS_DELIMITER as u8 && bytes[last - 1] != ESCAPE_CHARACTER as u8 {
        return (&body[..last], None);
    }
    for i in (0..bytes.len() - 1).rev() {
        if bytes[i] != OPTIONS_DELIMITER as u8 {
            continue;
        }
        if i > 0 && bytes[i - 1] == ESCAPE_CHARACTER as u8 {
            continue;
        }
        if bytes[i + 1] == b'/' {
            continue;
        }
        return (&body[..i], Some(&body[i + 1..]));
    }
    (body, None)
}

// =============================================================================
// Accessors
// =============================================================================

impl NetworkRule {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn filter_list_id(&self) -> u32 {
        self.filter_list_id
    }

    pub fn is_whitelist(&self) -> bool {
        self.whitelist
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub fn is_option_enabled(&self, option: NetworkRuleOption) -> bool {
        self.enabled_options.contains(option)
    }

    pub fn is_option_disabled(&self, option: NetworkRuleOption) -> bool {
        self.disabled_options.contains(option)
    }

    pub fn enabled_options(&self) -> NetworkRuleOption {
        self.enabled_options
    }

    pub fn disabled_options(&self) -> NetworkRuleOption {
        self.disabled_options
    }

    pub fn permitted_domains(&self) -> &[String] {
        &self.permitted_domains
    }

    pub fn restricted_domains(&self) -> &[String] {
        &self.restricted_domains
    }

    pub fn permitted_request_types(&self) -> RequestType {
        self.permitted_request_types
    }

    pub fn restricted_request_types(&self) -> RequestType {
        self.restricted_request_types
    }

    pub fn advanced_modifier(&self) -> Option<&AdvancedModifier> {
        self.advanced.as_ref()
    }

    pub fn cookie_modifier(&self) -> Option<&CookieModifier> {
        self.advanced.as_ref().and_then(AdvancedModifier::as_cookie)
    }

    pub fn is_stealth_rule(&self) -> bool {
        self.stealth_rule
    }

    pub fn is_important(&self) -> bool {
        self.is_option_enabled(NetworkRuleOption::IMPORTANT)
    }

    pub fn is_badfilter(&self) -> bool {
        self.is_option_enabled(NetworkRuleOption::BADFILTER)
    }

    /// An allow-list rule whose options only affect page-level features.
    pub fn is_cosmetic_only_whitelist(&self) -> bool {
        self.whitelist
            && self.enabled_options.intersects(NetworkRuleOption::COSMETIC_ONLY)
            && !self.enabled_options.contains(NetworkRuleOption::URLBLOCK)
    }

    /// A rule limited to specific pages.
    pub fn is_generic(&self) -> bool {
        self.permitted_domains.is_empty()
    }
}

// =============================================================================
// Matching
// =============================================================================

impl NetworkRule {
    /// Check every constraint of the rule against a request.
    pub fn matches(&self, request: &Request) -> bool {
        self.match_third_party(request.third_party)
            && self.match_request_type(request.request_type)
            && self.match_domain(&request.source_hostname)
            && self.pattern.matches(request)
    }

    /// `$third-party` requires a third-party request; `$~third-party` a first-party one.
    pub fn match_third_party(&self, third_party: bool) -> bool {
        if self.is_option_enabled(NetworkRuleOption::THIRD_PARTY) && !third_party {
            return false;
        }
        if self.is_option_disabled(NetworkRuleOption::THIRD_PARTY) && third_party {
            return false;
        }
        true
    }

    pub fn match_request_type(&self, request_type: RequestType) -> bool {
        if !self.permitted_request_types.is_empty() && !self.permitted_request_types.intersects(request_type) {
            return false;
        }
        !self.restricted_request_types.intersects(request_type)
    }

    /// Check `$domain` against the hostname of the page issuing the request.
    pub fn match_domain(&self, hostname: &str) -> bool {
        if !self.permitted_domains.is_empty()
            && (hostname.is_empty() || !is_domain_or_subdomain_of_any(hostname, &self.permitted_domains))
        {
            return false;
        }
        if !self.restricted_domains.is_empty() && is_domain_or_subdomain_of_any(hostname, &self.restricted_domains) {
            return false;
        }
        true
    }
}

// =============================================================================
// Badfilter
// =============================================================================

impl NetworkRule {
    /// Apply this `$badfilter` rule to another rule.
    pub fn apply_badfilter(&self, rule: &NetworkRule) -> BadfilterOutcome {
        if !self.is_badfilter() || rule.is_badfilter() || !self.targets(rule) {
            return BadfilterOutcome::NotApplicable;
        }

        if self.permitted_domains.is_empty() {
            return if rule.permitted_domains.is_empty() {
                BadfilterOutcome::Cancelled
            } else {
                BadfilterOutcome::NotApplicable
            };
        }

        if !rule.permitted_domains.iter().any(|d| self.permitted_domains.contains(d)) {
            return BadfilterOutcome::NotApplicable;
        }

        let remaining: Vec<String> = rule
            .permitted_domains
            .iter()
            .filter(|d| !self.permitted_domains.contains(d))
            .cloned()
            .collect();
        if remaining.is_empty() {
            return BadfilterOutcome::Cancelled;
        }

        let mut narrowed = rule.clone();
        narrowed.permitted_domains = remaining;
        BadfilterOutcome::Narrowed(narrowed)
    }

    /// Same criteria apart from `$badfilter` and permitted domains.
    fn targets(&self, rule: &NetworkRule) -> bool {
        self.whitelist == rule.whitelist
            && self.pattern == rule.pattern
            && (self.enabled_options - NetworkRuleOption::BADFILTER) == rule.enabled_options
            && self.disabled_options == rule.disabled_options
            && self.permitted_request_types == rule.permitted_request_types
            && self.restricted_request_types == rule.restricted_request_types
            && self.restricted_domains == rule.restricted_domains
            && self.advanced == rule.advanced
    }
}

// =============================================================================
// Priority
// =============================================================================

impl NetworkRule {
    /// Order rules from most to least preferred for the basic result.
    ///
    /// Allow-list beats blocking, then `$important`, then the longer pattern,
    /// then the lower filter list id, then the rule text.
    pub fn priority_cmp(&self, other: &NetworkRule) -> Ordering {
        other
            .whitelist
            .cmp(&self.whitelist)
            .then_with(|| other.is_important().cmp(&self.is_important()))
            .then_with(|| other.pattern.text().len().cmp(&self.pattern.text().len()))
            .then_with(|| self.filter_list_id.cmp(&other.filter_list_id))
            .then_with(|| self.text.cmp(&other.text))
    }
}
