//! URL pattern compilation
//!
//! Adblock patterns come in three shapes:
//!
//! - plain text, matched as a substring of the URL
//! - text with `||`, `|`, `^` or `*`, translated into a regular expression
//! - `/regex/`, used as written
//!
//! Matching is case-insensitive unless the rule carries `$match-case`.

use regex::{Regex, RegexBuilder};

use super::RuleParseError;
use crate::request::Request;
use crate::url::{is_alnum, MIN_TOKEN_LEN};

const DOMAIN_ANCHOR_REGEX: &str = r"^[a-z][a-z0-9+.\-]*://(?:[^/?#]*\.)?";
const SEPARATOR_REGEX: &str = r"(?:[^a-zA-Z0-9_\-.%]|$)";

#[derive(Debug, Clone)]
enum Matcher {
    Any,
    Substring(String),
    Regex(Regex),
}

/// A compiled URL pattern.
#[derive(Debug, Clone)]
pub struct Pattern {
    text: String,
    matcher: Matcher,
    match_case: bool,
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text && self.match_case == other.match_case
    }
}

impl Eq for Pattern {}

impl Pattern {
    pub fn compile(text: &str, match_case: bool) -> Result<Self, RuleParseError> {
        let matcher = if is_any_pattern(text) {
            Matcher::Any
        } else if let Some(re) = regex_body(text) {
            Matcher::Regex(build_regex(re, match_case)?)
        } else if !text.contains(['*', '^', '|']) {
            Matcher::Substring(if match_case {
                text.to_string()
            } else {
                text.to_ascii_lowercase()
            })
        } else {
            Matcher::Regex(build_regex(&to_regex(text), match_case)?)
        };

        Ok(Self {
            text: text.to_string(),
            matcher,
            match_case,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// True when the pattern matches every URL.
    pub fn is_any(&self) -> bool {
        matches!(self.matcher, Matcher::Any)
    }

    pub fn is_regex(&self) -> bool {
        regex_body(&self.text).is_some()
    }

    pub fn matches(&self, request: &Request) -> bool {
        match &self.matcher {
            Matcher::Any => true,
            Matcher::Substring(needle) => {
                if self.match_case {
                    request.url.contains(needle.as_str())
                } else {
                    request.url_lowercase.contains(needle.as_str())
                }
            }
            Matcher::Regex(re) => re.is_match(&request.url),
        }
    }

    /// Hostname of a `||host^` style pattern, when the host part is complete.
    pub fn host(&self) -> Option<String> {
        let rest = self.text.strip_prefix("||")?;
        let end = rest
            .find(['^', '/', ':', '|', '?'])
            .filter(|&end| end > 0)?;
        let host = &rest[..end];
        if host
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'.' || b == b'-')
            && !host.starts_with('.')
            && !host.ends_with('.')
        {
            Some(host.to_ascii_lowercase())
        } else {
            None
        }
    }

    /// Lowercased alphanumeric runs that always appear as complete URL tokens
    /// in a matching URL. Empty for regex and match-all patterns.
    pub fn tokens(&self) -> Vec<String> {
        if self.is_any() || self.is_regex() {
            return Vec::new();
        }

        let (left_anchored, body) = if let Some(rest) = self.text.strip_prefix("||") {
            (true, rest)
        } else if let Some(rest) = self.text.strip_prefix('|') {
            (true, rest)
        } else {
            (false, self.text.as_str())
        };
        let (right_anchored, body) = match body.strip_suffix('|') {
            Some(rest) => (true, rest),
            None => (false, body),
        };

        let bytes = body.as_bytes();
        let mut tokens = Vec::new();
        let mut start = None;

        for i in 0..=bytes.len() {
            let in_token = i < bytes.len() && is_alnum(bytes[i]);
            if in_token {
                if start.is_none() {
                    start = Some(i);
                }
                continue;
            }
            let Some(ts) = start.take() else {
                continue;
            };
            if i - ts < MIN_TOKEN_LEN {
                continue;
            }
            let open_left = if ts == 0 { !left_anchored } else { bytes[ts - 1] == b'*' };
            let open_right = if i == bytes.len() {
                !right_anchored
            } else {
                bytes[i] == b'*'
            };
            if !open_left && !open_right {
                tokens.push(body[ts..i].to_ascii_lowercase());
            }
        }

        tokens
    }
}

fn is_any_pattern(text: &str) -> bool {
    matches!(text, "" | "*" | "|*" | "||*" | "*|")
}

fn regex_body(text: &str) -> Option<&str> {
    if text.len() > 2 && text.starts_with('/') && text.ends_with('/') {
        Some(&text[1..text.len() - 1])
    } else {
        None
    }
}

fn build_regex(source: &str, match_case: bool) -> Result<Regex, RuleParseError> {
    RegexBuilder::new(source)
        .case_insensitive(!match_case)
        .build()
        .map_err(|e| RuleParseError::InvalidRegex(e.to_string()))
}

/// Translate an Adblock pattern with special characters into a regex.
fn to_regex(text: &str) -> String {
    let mut out = String::with_capacity(text.len() * 2);
    let mut body = text;

    if let Some(rest) = body.strip_prefix("||") {
        out.push_str(DOMAIN_ANCHOR_REGEX);
        body = rest;
    } else if let Some(rest) = body.strip_prefix('|') {
        out.push('^');
        body = rest;
    }

    let (body, end_anchor) = match body.strip_suffix('|') {
        Some(rest) => (rest, true),
        None => (body, false),
    };

    let mut literal = String::new();
    for c in body.chars() {
        match c {
            '*' | '^' => {
                out.push_str(&regex::escape(&literal));
                literal.clear();
                out.push_str(if c == '*' { ".*" } else { SEPARATOR_REGEX });
            }
            _ => literal.push(c),
        }
    }
    out.push_str(&regex::escape(&literal));

    if end_anchor {
        out.push('$');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::RequestType;

    fn req(url: &str) -> Request {
        Request::new(url, "", RequestType::OTHER)
    }

    fn compile(text: &str) -> Pattern {
        Pattern::compile(text, false).expect("pattern compiles")
    }

    #[test]
    fn test_substring_case_insensitive() {
        let pattern = compile("/Ads/");
        assert!(pattern.is_regex());
        let pattern = compile("/banner.");
        assert!(pattern.matches(&req("https://example.org/BANNER.png")));
        assert!(!pattern.matches(&req("https://example.org/logo.png")));
    }

    #[test]
    fn test_match_case() {
        let pattern = Pattern::compile("/Banner.", true).expect("pattern compiles");
        assert!(pattern.matches(&req("https://example.org/Banner.png")));
        assert!(!pattern.matches(&req("https://example.org/banner.png")));
    }

    #[test]
    fn test_domain_anchor() {
        let pattern = compile("||example.org^");
        assert!(pattern.matches(&req("https://example.org")));
        assert!(pattern.matches(&req("https://sub.example.org/path")));
        assert!(pattern.matches(&req("wss://example.org:8080/")));
        assert!(!pattern.matches(&req("https://notexample.org/")));
        assert!(!pattern.matches(&req("https://example.organic/")));
        assert!(!pattern.matches(&req("https://other.com/?u=example.org.x")));
    }

    #[test]
    fn test_start_and_end_anchor() {
        let pattern = compile("|https://ads.");
        assert!(pattern.matches(&req("https://ads.example.org/")));
        assert!(!pattern.matches(&req("http://x.org/https://ads.")));

        let pattern = compile(".gif|");
        assert!(pattern.matches(&req("https://example.org/a.gif")));
        assert!(!pattern.matches(&req("https://example.org/a.gif?x=1")));
    }

    #[test]
    fn test_wildcard_and_separator() {
        let pattern = compile("/ads/*/banner^");
        assert!(pattern.matches(&req("https://example.org/ads/x/y/banner?id=1")));
        assert!(pattern.matches(&req("https://example.org/ads/x/banner")));
        assert!(!pattern.matches(&req("https://example.org/ads/x/banners")));
    }

    #[test]
    fn test_regex_pattern() {
        let pattern = compile(r"/^https:\/\/[a-z]+\.example\.org\/ad/");
        assert!(pattern.matches(&req("https://cdn.example.org/ad.js")));
        assert!(!pattern.matches(&req("http://cdn.example.org/ad.js")));
    }

    #[test]
    fn test_invalid_regex() {
        assert!(matches!(
            Pattern::compile("/(unclosed/", false),
            Err(RuleParseError::InvalidRegex(_))
        ));
    }

    #[test]
    fn test_any_pattern() {
        assert!(compile("").is_any());
        assert!(compile("*").is_any());
        assert!(compile("||*").is_any());
        assert!(compile("").matches(&req("https://example.org")));
    }

    #[test]
    fn test_host() {
        assert_eq!(compile("||Example.org^").host().as_deref(), Some("example.org"));
        assert_eq!(compile("||example.org/ads").host().as_deref(), Some("example.org"));
        assert_eq!(compile("||example.org").host(), None);
        assert_eq!(compile("||ex*ample.org^").host(), None);
        assert_eq!(compile("|example.org^").host(), None);
    }

    #[test]
    fn test_tokens() {
        assert_eq!(compile("||example.org^").tokens(), vec!["example", "org"]);
        assert_eq!(compile("/banner/ads.").tokens(), vec!["banner", "ads"]);
        // Edges of an unanchored pattern may be part of a longer URL token
        assert_eq!(compile("banner/ads").tokens(), Vec::<String>::new());
        assert_eq!(compile("/ads*banner/").tokens(), Vec::<String>::new());
        assert_eq!(compile("|https://tracker.").tokens(), vec!["https", "tracker"]);
        assert!(compile("/ads[0-9]/").tokens().is_empty());
    }
}
