//! Value-bearing rule modifiers ($cookie, $csp, $replace, $removeparam, $redirect)

use std::borrow::Cow;

use log::debug;
use regex::{Regex, RegexBuilder};

use super::{split_by_delimiter_with_escape, RuleParseError, ESCAPE_CHARACTER};

// =============================================================================
// Advanced Modifier
// =============================================================================

/// The single value-bearing modifier a rule may carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdvancedModifier {
    Cookie(CookieModifier),
    Csp(String),
    Replace(ReplaceModifier),
    RemoveParam(String),
    Redirect(String),
}

impl AdvancedModifier {
    /// Raw option value as written in the rule.
    pub fn value(&self) -> &str {
        match self {
            Self::Cookie(m) => &m.raw,
            Self::Replace(m) => &m.raw,
            Self::Csp(v) | Self::RemoveParam(v) | Self::Redirect(v) => v,
        }
    }

    pub fn as_cookie(&self) -> Option<&CookieModifier> {
        match self {
            Self::Cookie(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_replace(&self) -> Option<&ReplaceModifier> {
        match self {
            Self::Replace(m) => Some(m),
            _ => None,
        }
    }
}

// =============================================================================
// $cookie
// =============================================================================

const MAX_AGE_KEY: &str = "maxage";
const SAME_SITE_KEY: &str = "samesite";

/// Cookie name matcher of a `$cookie` rule.
#[derive(Debug, Clone)]
pub enum CookieNameMatcher {
    /// Bare `$cookie`: every cookie
    Any,
    Exact(String),
    Regex(Regex),
}

impl PartialEq for CookieNameMatcher {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Any, Self::Any) => true,
            (Self::Exact(a), Self::Exact(b)) => a == b,
            (Self::Regex(a), Self::Regex(b)) => a.as_str() == b.as_str(),
            _ => false,
        }
    }
}

impl Eq for CookieNameMatcher {}

/// Parsed `$cookie=name;maxAge=N;sameSite=S` value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieModifier {
    raw: String,
    name: CookieNameMatcher,
    same_site: Option<String>,
    max_age: Option<i64>,
}

impl CookieModifier {
    pub fn parse(value: &str) -> Result<Self, RuleParseError> {
        let parts = split_by_delimiter_with_escape(value, ';', ESCAPE_CHARACTER, false);
        let mut parts = parts.into_iter();

        let name = match parts.next() {
            None => CookieNameMatcher::Any,
            Some(name) if name.len() > 2 && name.starts_with('/') && name.ends_with('/') => {
                let re = RegexBuilder::new(&name[1..name.len() - 1])
                    .build()
                    .map_err(|e| RuleParseError::InvalidRegex(e.to_string()))?;
                CookieNameMatcher::Regex(re)
            }
            Some(name) => CookieNameMatcher::Exact(name),
        };

        let mut same_site = None;
        let mut max_age = None;

        for part in parts {
            let (key, val) = match part.split_once('=') {
                Some((k, v)) => (k.trim(), v.trim()),
                None => (part.trim(), ""),
            };
            match key.to_ascii_lowercase().as_str() {
                MAX_AGE_KEY => {
                    let parsed = val.parse::<i64>().map_err(|_| RuleParseError::InvalidModifier {
                        option: "cookie".to_string(),
                        reason: format!("invalid maxAge '{val}'"),
                    })?;
                    max_age = Some(parsed);
                }
                SAME_SITE_KEY => {
                    let lower = val.to_ascii_lowercase();
                    if !matches!(lower.as_str(), "lax" | "strict" | "none") {
                        return Err(RuleParseError::InvalidModifier {
                            option: "cookie".to_string(),
                            reason: format!("invalid sameSite '{val}'"),
                        });
                    }
                    same_site = Some(lower);
                }
                _ => debug!("Ignoring unknown $cookie parameter '{key}'"),
            }
        }

        Ok(Self {
            raw: value.to_string(),
            name,
            same_site,
            max_age,
        })
    }

    pub fn name_matcher(&self) -> &CookieNameMatcher {
        &self.name
    }

    pub fn matches_name(&self, name: &str) -> bool {
        match &self.name {
            CookieNameMatcher::Any => true,
            CookieNameMatcher::Exact(exact) => exact == name,
            CookieNameMatcher::Regex(re) => re.is_match(name),
        }
    }

    /// Lowercased SameSite value (`lax`, `strict` or `none`).
    pub fn same_site(&self) -> Option<&str> {
        self.same_site.as_deref()
    }

    pub fn max_age(&self) -> Option<i64> {
        self.max_age
    }

    /// A modifying rule changes the cookie instead of removing it.
    pub fn is_modifying(&self) -> bool {
        self.same_site.is_some() || self.max_age.is_some_and(|age| age > 0)
    }
}

// =============================================================================
// $replace
// =============================================================================

/// Parsed `$replace=/regex/replacement/flags` value.
#[derive(Debug, Clone)]
pub struct ReplaceModifier {
    raw: String,
    /// None for an allow-list `$replace` without a value
    regex: Option<Regex>,
    replacement: String,
    global: bool,
}

impl PartialEq for ReplaceModifier {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for ReplaceModifier {}

impl ReplaceModifier {
    pub fn parse(value: &str) -> Result<Self, RuleParseError> {
        let invalid = |reason: &str| RuleParseError::InvalidModifier {
            option: "replace".to_string(),
            reason: reason.to_string(),
        };

        if !value.starts_with('/') {
            return Err(invalid("value must start with '/'"));
        }
        let parts = split_by_delimiter_with_escape(value, '/', ESCAPE_CHARACTER, true);
        let [pattern, replacement, flags] = parts.as_slice() else {
            return Err(invalid("expected /regex/replacement/flags"));
        };
        if pattern.is_empty() {
            return Err(invalid("empty regex"));
        }

        let mut case_insensitive = false;
        let mut global = false;
        for flag in flags.chars() {
            match flag {
                'i' => case_insensitive = true,
                'g' => global = true,
                _ => return Err(invalid("unknown flag")),
            }
        }

        let regex = RegexBuilder::new(pattern)
            .case_insensitive(case_insensitive)
            .build()
            .map_err(|e| RuleParseError::InvalidRegex(e.to_string()))?;

        Ok(Self {
            raw: value.to_string(),
            regex: Some(regex),
            replacement: replacement.clone(),
            global,
        })
    }

    /// Value-less modifier of `@@...$replace`, which disables replacing.
    pub fn disabling() -> Self {
        Self {
            raw: String::new(),
            regex: None,
            replacement: String::new(),
            global: false,
        }
    }

    /// Apply the replacement to a response body.
    pub fn apply<'a>(&self, content: &'a str) -> Cow<'a, str> {
        let Some(regex) = &self.regex else {
            return Cow::Borrowed(content);
        };
        let replacement = regex::NoExpand(&self.replacement);
        if self.global {
            regex.replace_all(content, replacement)
        } else {
            regex.replace(content, replacement)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cookie_modifier_bare() {
        let modifier = CookieModifier::parse("").expect("valid modifier");
        assert_eq!(modifier.name_matcher(), &CookieNameMatcher::Any);
        assert!(modifier.matches_name("anything"));
        assert!(!modifier.is_modifying());
    }

    #[test]
    fn test_cookie_modifier_full() {
        let modifier = CookieModifier::parse("some_cookie;maxAge=15;sameSite=Lax").expect("valid modifier");
        assert!(modifier.matches_name("some_cookie"));
        assert!(!modifier.matches_name("other"));
        assert_eq!(modifier.max_age(), Some(15));
        assert_eq!(modifier.same_site(), Some("lax"));
        assert!(modifier.is_modifying());
    }

    #[test]
    fn test_cookie_modifier_regex() {
        let modifier = CookieModifier::parse("/^_ga/").expect("valid modifier");
        assert!(modifier.matches_name("_ga_123"));
        assert!(!modifier.matches_name("x_ga"));
    }

    #[test]
    fn test_cookie_modifier_zero_max_age_removes() {
        let modifier = CookieModifier::parse("name;maxAge=0").expect("valid modifier");
        assert!(!modifier.is_modifying());
    }

    #[test]
    fn test_cookie_modifier_errors() {
        assert!(CookieModifier::parse("name;maxAge=abc").is_err());
        assert!(CookieModifier::parse("name;sameSite=sometimes").is_err());
        assert!(CookieModifier::parse("name;unknown=1").is_ok());
    }

    #[test]
    fn test_replace_modifier() {
        let modifier = ReplaceModifier::parse("/text-to-be-replaced/new-text/i").expect("valid modifier");
        assert_eq!(modifier.apply("A TEXT-TO-BE-REPLACED b text-to-be-replaced"), "A new-text b text-to-be-replaced");

        let modifier = ReplaceModifier::parse("/a/b/g").expect("valid modifier");
        assert_eq!(modifier.apply("aaa"), "bbb");
    }

    #[test]
    fn test_replace_modifier_escaped_slash() {
        let modifier = ReplaceModifier::parse(r"/a\/b/c/").expect("valid modifier");
        assert_eq!(modifier.apply("xa/by"), "xcy");
    }

    #[test]
    fn test_disabling_replace_is_noop() {
        let modifier = ReplaceModifier::disabling();
        assert_eq!(modifier.apply("unchanged"), "unchanged");
    }

    #[test]
    fn test_replace_modifier_errors() {
        assert!(ReplaceModifier::parse("text").is_err());
        assert!(ReplaceModifier::parse("/a/b").is_err());
        assert!(ReplaceModifier::parse("/a/b/x").is_err());
        assert!(ReplaceModifier::parse("//b/").is_err());
    }

    #[test]
    fn test_advanced_value() {
        let modifier = AdvancedModifier::Csp("frame-src 'none'".to_string());
        assert_eq!(modifier.value(), "frame-src 'none'");
        assert!(modifier.as_cookie().is_none());
    }
}
