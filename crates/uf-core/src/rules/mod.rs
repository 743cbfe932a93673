//! Filter rule model and parser
//!
//! One line of filter-list text becomes a [`Rule`]: either a [`NetworkRule`]
//! matched against requests, or an opaque [`CosmeticRule`]. Comment lines
//! and lines filtered out by [`ParseOptions`] produce no rule at all.

mod modifiers;
mod network_rule;
mod options;
mod pattern;

use std::sync::Arc;

pub use modifiers::{AdvancedModifier, CookieModifier, CookieNameMatcher, ReplaceModifier};
pub use network_rule::{BadfilterOutcome, NetworkRule, MASK_WHITELIST};
pub use options::NetworkRuleOption;
pub use pattern::Pattern;

pub const ESCAPE_CHARACTER: char = '\\';

/// Cosmetic rule markers, exceptions first so the longest marker wins.
const COSMETIC_MARKERS: &[&str] = &["#@$#", "#@%#", "#@?#", "#@#", "#$#", "#%#", "#?#", "##"];

/// Error type for rule parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleParseError {
    #[error("Empty rule")]
    Empty,
    #[error("Rule matches every request")]
    TooWide,
    #[error("Unknown option: {0}")]
    UnknownOption(String),
    #[error("Option cannot be negated: {0}")]
    NotNegatable(String),
    #[error("Allow-list only option on a blocking rule: {0}")]
    WhitelistOnly(String),
    #[error("Blocking only option on an allow-list rule: {0}")]
    BlacklistOnly(String),
    #[error("Option both enabled and disabled: {0}")]
    ConflictingOption(String),
    #[error("Empty domain in $domain")]
    EmptyDomain,
    #[error("Domain both permitted and restricted: {0}")]
    DomainConflict(String),
    #[error("Invalid regex: {0}")]
    InvalidRegex(String),
    #[error("Invalid ${option} value: {reason}")]
    InvalidModifier { option: String, reason: String },
    #[error("More than one value-bearing modifier")]
    MultipleModifiers,
}

/// Which lines a filter list wants dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ParseOptions {
    pub ignore_cosmetic: bool,
    pub ignore_js: bool,
    pub ignore_exceptions: bool,
}

/// Kind of a cosmetic rule, from its marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CosmeticKind {
    ElementHiding,
    Css,
    Js,
    ExtendedCss,
}

/// A cosmetic rule, kept as text. Page rendering is done elsewhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CosmeticRule {
    text: String,
    filter_list_id: u32,
    kind: CosmeticKind,
    whitelist: bool,
}

impl CosmeticRule {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn filter_list_id(&self) -> u32 {
        self.filter_list_id
    }

    pub fn kind(&self) -> CosmeticKind {
        self.kind
    }

    pub fn is_whitelist(&self) -> bool {
        self.whitelist
    }
}

/// A parsed filter rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rule {
    Network(Arc<NetworkRule>),
    Cosmetic(Arc<CosmeticRule>),
}

impl Rule {
    pub fn text(&self) -> &str {
        match self {
            Rule::Network(rule) => rule.text(),
            Rule::Cosmetic(rule) => rule.text(),
        }
    }

    pub fn filter_list_id(&self) -> u32 {
        match self {
            Rule::Network(rule) => rule.filter_list_id(),
            Rule::Cosmetic(rule) => rule.filter_list_id(),
        }
    }

    pub fn as_network(&self) -> Option<&Arc<NetworkRule>> {
        match self {
            Rule::Network(rule) => Some(rule),
            Rule::Cosmetic(_) => None,
        }
    }
}

/// Parse one line of filter-list text.
///
/// Returns `Ok(None)` for blank lines, comments and rules dropped by `options`.
pub fn parse_rule(text: &str, filter_list_id: u32, options: &ParseOptions) -> Result<Option<Rule>, RuleParseError> {
    let line = text.trim();
    if line.is_empty() || line.starts_with('!') || line.starts_with('[') {
        return Ok(None);
    }

    if let Some(marker) = find_cosmetic_marker(line) {
        if options.ignore_cosmetic {
            return Ok(None);
        }
        let kind = match marker.trim_start_matches("#@").trim_start_matches('#') {
            "$#" => CosmeticKind::Css,
            "%#" => CosmeticKind::Js,
            "?#" => CosmeticKind::ExtendedCss,
            _ => CosmeticKind::ElementHiding,
        };
        if kind == CosmeticKind::Js && options.ignore_js {
            return Ok(None);
        }
        return Ok(Some(Rule::Cosmetic(Arc::new(CosmeticRule {
            text: line.to_string(),
            filter_list_id,
            kind,
            whitelist: marker.starts_with("#@"),
        }))));
    }

    // Hosts-file style comment
    if line.starts_with('#') {
        return Ok(None);
    }

    if options.ignore_exceptions && line.starts_with(MASK_WHITELIST) {
        return Ok(None);
    }

    let rule = NetworkRule::parse(line, filter_list_id)?;
    Ok(Some(Rule::Network(Arc::new(rule))))
}

fn find_cosmetic_marker(line: &str) -> Option<&'static str> {
    let pos = line.find('#')?;
    let rest = &line[pos..];
    COSMETIC_MARKERS.iter().copied().find(|marker| rest.starts_with(marker))
}

/// Split `s` on `delimiter`, treating `escape` + `delimiter` as a literal delimiter.
///
/// A delimiter at index 0 is dropped. Empty parts are kept only when
/// `preserve_all_tokens` is set.
pub fn split_by_delimiter_with_escape(
    s: &str,
    delimiter: char,
    escape: char,
    preserve_all_tokens: bool,
) -> Vec<String> {
    let mut parts = Vec::new();
    if s.is_empty() {
        return parts;
    }

    let mut current = String::new();
    let mut prev = None;
    for (i, c) in s.chars().enumerate() {
        if c == delimiter {
            if i == 0 {
                // Leading delimiter
            } else if prev == Some(escape) {
                current.pop();
                current.push(c);
            } else if preserve_all_tokens || !current.is_empty() {
                parts.push(std::mem::take(&mut current));
            }
        } else {
            current.push(c);
        }
        prev = Some(c);
    }

    if preserve_all_tokens || !current.is_empty() {
        parts.push(current);
    }

    parts
}
