//! Per-cookie provenance and processing state

use std::collections::HashMap;

use uf_core::hash_cookie_key;

use crate::browser_cookie::BrowserCookie;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct JournalEntry {
    is_processed: bool,
    is_third_party: bool,
}

/// Remembers, per cookie name and domain, whether the cookie was set by a
/// third-party response and whether rules were already applied to it.
#[derive(Debug, Default)]
pub struct CookieJournal {
    entries: HashMap<u64, JournalEntry>,
}

impl CookieJournal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Domain cookies (`.example.org`) share the entry of their host.
    fn key(name: &str, domain: &str) -> u64 {
        hash_cookie_key(name, domain.trim_start_matches('.'))
    }

    fn cookie_key(cookie: &BrowserCookie) -> u64 {
        Self::key(&cookie.name, cookie.host())
    }

    pub fn set_processed(&mut self, cookie: &BrowserCookie) {
        self.entries.entry(Self::cookie_key(cookie)).or_default().is_processed = true;
    }

    pub fn is_processed(&self, cookie: &BrowserCookie) -> bool {
        self.entries.get(&Self::cookie_key(cookie)).is_some_and(|e| e.is_processed)
    }

    pub fn remove(&mut self, cookie: &BrowserCookie) {
        self.entries.remove(&Self::cookie_key(cookie));
    }

    /// `false` for cookies never seen in a response.
    pub fn is_third_party(&self, cookie: &BrowserCookie) -> bool {
        self.is_third_party_cookie(&cookie.name, cookie.host())
    }

    pub fn is_third_party_cookie(&self, name: &str, domain: &str) -> bool {
        self.entries.get(&Self::key(name, domain)).is_some_and(|e| e.is_third_party)
    }

    pub fn set_third_party(&mut self, name: &str, domain: &str, is_third_party: bool) {
        self.entries
            .entry(Self::key(name, domain))
            .or_default()
            .is_third_party = is_third_party;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
