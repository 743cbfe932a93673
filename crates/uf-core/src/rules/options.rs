//! Network rule option bits and the option keyword table

use crate::request::RequestType;

bitflags::bitflags! {
    /// Options a network rule can enable or disable.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct NetworkRuleOption: u32 {
        /// $third-party (disabled form is $first-party)
        const THIRD_PARTY = 1 << 0;
        /// $match-case
        const MATCH_CASE = 1 << 1;
        /// $important
        const IMPORTANT = 1 << 2;

        // Allow-list only
        const ELEMHIDE = 1 << 3;
        const GENERICHIDE = 1 << 4;
        const GENERICBLOCK = 1 << 5;
        const JSINJECT = 1 << 6;
        const URLBLOCK = 1 << 7;
        const CONTENT = 1 << 8;
        const EXTENSION = 1 << 9;
        const STEALTH = 1 << 10;

        const POPUP = 1 << 11;
        // Blocking only
        const EMPTY = 1 << 12;
        const MP4 = 1 << 13;

        const BADFILTER = 1 << 14;
        const NETWORK = 1 << 15;

        // Value-bearing modifiers
        const CSP = 1 << 16;
        const REPLACE = 1 << 17;
        const COOKIE = 1 << 18;
        const REDIRECT = 1 << 19;
        const REMOVEPARAM = 1 << 20;

        /// Options implied by $document on an allow-list rule
        const DOCUMENT_WHITELIST = Self::ELEMHIDE.bits()
            | Self::JSINJECT.bits()
            | Self::URLBLOCK.bits()
            | Self::CONTENT.bits()
            | Self::EXTENSION.bits();
        const WHITELIST_ONLY = Self::DOCUMENT_WHITELIST.bits()
            | Self::GENERICHIDE.bits()
            | Self::GENERICBLOCK.bits()
            | Self::STEALTH.bits();
        const BLACKLIST_ONLY = Self::EMPTY.bits() | Self::MP4.bits();
        /// Allow-list options that never unblock a request by themselves
        const COSMETIC_ONLY = Self::ELEMHIDE.bits()
            | Self::GENERICHIDE.bits()
            | Self::GENERICBLOCK.bits()
            | Self::JSINJECT.bits()
            | Self::CONTENT.bits()
            | Self::EXTENSION.bits();
        const ADVANCED = Self::CSP.bits()
            | Self::REPLACE.bits()
            | Self::COOKIE.bits()
            | Self::REDIRECT.bits()
            | Self::REMOVEPARAM.bits();
        const NEGATABLE = Self::THIRD_PARTY.bits() | Self::MATCH_CASE.bits();
    }
}

/// What an option keyword refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    /// Plain flag
    Flag(NetworkRuleOption),
    /// $first-party: the inverse of $third-party
    FirstParty,
    /// $document
    Document,
    RequestType(RequestType),
    /// $domain=
    Domain,
    /// Value-bearing modifier
    Advanced(NetworkRuleOption),
    /// $_ and friends
    Noop,
}

/// Resolve an option keyword (already lowercased, without `~` and value).
pub fn lookup_option(name: &str) -> Option<OptionKind> {
    let kind = match name {
        "third-party" | "3p" => OptionKind::Flag(NetworkRuleOption::THIRD_PARTY),
        "first-party" | "1p" => OptionKind::FirstParty,
        "match-case" => OptionKind::Flag(NetworkRuleOption::MATCH_CASE),
        "important" => OptionKind::Flag(NetworkRuleOption::IMPORTANT),
        "domain" => OptionKind::Domain,
        "badfilter" => OptionKind::Flag(NetworkRuleOption::BADFILTER),
        "popup" => OptionKind::Flag(NetworkRuleOption::POPUP),
        "empty" => OptionKind::Flag(NetworkRuleOption::EMPTY),
        "mp4" => OptionKind::Flag(NetworkRuleOption::MP4),
        "network" => OptionKind::Flag(NetworkRuleOption::NETWORK),
        "elemhide" | "ehide" => OptionKind::Flag(NetworkRuleOption::ELEMHIDE),
        "generichide" | "ghide" => OptionKind::Flag(NetworkRuleOption::GENERICHIDE),
        "genericblock" => OptionKind::Flag(NetworkRuleOption::GENERICBLOCK),
        "jsinject" => OptionKind::Flag(NetworkRuleOption::JSINJECT),
        "urlblock" => OptionKind::Flag(NetworkRuleOption::URLBLOCK),
        "content" => OptionKind::Flag(NetworkRuleOption::CONTENT),
        "extension" => OptionKind::Flag(NetworkRuleOption::EXTENSION),
        "stealth" => OptionKind::Flag(NetworkRuleOption::STEALTH),
        "document" | "doc" => OptionKind::Document,
        "script" => OptionKind::RequestType(RequestType::SCRIPT),
        "stylesheet" | "css" => OptionKind::RequestType(RequestType::STYLESHEET),
        "subdocument" | "frame" => OptionKind::RequestType(RequestType::SUBDOCUMENT),
        "object" => OptionKind::RequestType(RequestType::OBJECT),
        "image" => OptionKind::RequestType(RequestType::IMAGE),
        "xmlhttprequest" | "xhr" => OptionKind::RequestType(RequestType::XMLHTTPREQUEST),
        "media" => OptionKind::RequestType(RequestType::MEDIA),
        "font" => OptionKind::RequestType(RequestType::FONT),
        "websocket" => OptionKind::RequestType(RequestType::WEBSOCKET),
        "webrtc" => OptionKind::RequestType(RequestType::WEBRTC),
        "ping" => OptionKind::RequestType(RequestType::PING),
        "other" => OptionKind::RequestType(RequestType::OTHER),
        "cookie" => OptionKind::Advanced(NetworkRuleOption::COOKIE),
        "csp" => OptionKind::Advanced(NetworkRuleOption::CSP),
        "replace" => OptionKind::Advanced(NetworkRuleOption::REPLACE),
        "removeparam" => OptionKind::Advanced(NetworkRuleOption::REMOVEPARAM),
        "redirect" | "redirect-rule" => OptionKind::Advanced(NetworkRuleOption::REDIRECT),
        _ if !name.is_empty() && name.bytes().all(|b| b == b'_') => OptionKind::Noop,
        _ => return None,
    };
    Some(kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_aliases() {
        assert_eq!(lookup_option("3p"), lookup_option("third-party"));
        assert_eq!(lookup_option("css"), Some(OptionKind::RequestType(RequestType::STYLESHEET)));
        assert_eq!(lookup_option("redirect-rule"), Some(OptionKind::Advanced(NetworkRuleOption::REDIRECT)));
        assert_eq!(lookup_option("___"), Some(OptionKind::Noop));
        assert_eq!(lookup_option("unknown"), None);
        assert_eq!(lookup_option(""), None);
    }

    #[test]
    fn test_option_groups_disjoint() {
        assert!(!NetworkRuleOption::WHITELIST_ONLY.intersects(NetworkRuleOption::BLACKLIST_ONLY));
        assert!(!NetworkRuleOption::COSMETIC_ONLY.contains(NetworkRuleOption::URLBLOCK));
        assert!(NetworkRuleOption::WHITELIST_ONLY.contains(NetworkRuleOption::DOCUMENT_WHITELIST));
    }
}
