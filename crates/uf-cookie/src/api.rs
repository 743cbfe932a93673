//! Collaborators the cookie filter talks to
//!
//! The host supplies the browser cookie API, a way to find `$cookie` rules
//! outside of a request, and a sink for filtering events. All calls happen
//! on one event loop, so implementations take `&self` and keep their state
//! in cells.

use std::sync::Arc;

use log::{info, warn};
use serde::{Deserialize, Serialize};
use uf_core::{Engine, NetworkRule, Request, RequestType};

use crate::browser_cookie::BrowserCookie;
use crate::error::CookieApiError;

/// Browser cookie storage.
#[allow(async_fn_in_trait)]
pub trait CookieApi {
    async fn remove_cookie(&self, name: &str, url: &str) -> Result<(), CookieApiError>;

    async fn modify_cookie(&self, cookie: &BrowserCookie, url: &str) -> Result<(), CookieApiError>;

    /// Every cookie stored for `domain`.
    async fn get_cookies(&self, domain: &str) -> Result<Vec<BrowserCookie>, CookieApiError>;

    /// Whether the host granted access to cookies.
    async fn has_permission(&self) -> bool;
}

impl<T: CookieApi + ?Sized> CookieApi for &T {
    async fn remove_cookie(&self, name: &str, url: &str) -> Result<(), CookieApiError> {
        (**self).remove_cookie(name, url).await
    }

    async fn modify_cookie(&self, cookie: &BrowserCookie, url: &str) -> Result<(), CookieApiError> {
        (**self).modify_cookie(cookie, url).await
    }

    async fn get_cookies(&self, domain: &str) -> Result<Vec<BrowserCookie>, CookieApiError> {
        (**self).get_cookies(domain).await
    }

    async fn has_permission(&self) -> bool {
        (**self).has_permission().await
    }
}

/// Why the browser reported a cookie change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnChangedCause {
    Explicit,
    Overwrite,
    Expired,
    ExpiredOverwrite,
    Evicted,
}

/// A cookie change notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookieChangeInfo {
    pub removed: bool,
    pub cookie: BrowserCookie,
    pub cause: OnChangedCause,
}

/// Finds `$cookie` rules for a cookie outside of any request.
pub trait RulesFinder {
    fn get_rules_for_cookie(&self, url: &str, third_party: bool) -> Vec<Arc<NetworkRule>>;
}

impl<T: RulesFinder + ?Sized> RulesFinder for &T {
    fn get_rules_for_cookie(&self, url: &str, third_party: bool) -> Vec<Arc<NetworkRule>> {
        (**self).get_rules_for_cookie(url, third_party)
    }
}

impl RulesFinder for Engine {
    fn get_rules_for_cookie(&self, url: &str, third_party: bool) -> Vec<Arc<NetworkRule>> {
        let mut request = Request::new(url, "", RequestType::DOCUMENT);
        request.third_party = third_party;
        self.match_request(&request).get_cookie_rules().to_vec()
    }
}

/// Sink for applied cookie rules and failed cookie updates. Must not fail.
pub trait FilteringLog {
    fn add_cookie_event(&self, tab_id: i32, cookie_name: &str, rules: &[Arc<NetworkRule>]);

    /// The cookie API rejected a removal or modification requested by `rules`.
    fn add_cookie_error(&self, tab_id: i32, cookie_name: &str, rules: &[Arc<NetworkRule>], error: &CookieApiError);
}

impl<T: FilteringLog + ?Sized> FilteringLog for &T {
    fn add_cookie_event(&self, tab_id: i32, cookie_name: &str, rules: &[Arc<NetworkRule>]) {
        (**self).add_cookie_event(tab_id, cookie_name, rules)
    }

    fn add_cookie_error(&self, tab_id: i32, cookie_name: &str, rules: &[Arc<NetworkRule>], error: &CookieApiError) {
        (**self).add_cookie_error(tab_id, cookie_name, rules, error)
    }
}

/// Writes cookie events to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogFilteringLog;

impl FilteringLog for LogFilteringLog {
    fn add_cookie_event(&self, tab_id: i32, cookie_name: &str, rules: &[Arc<NetworkRule>]) {
        let texts: Vec<&str> = rules.iter().map(|r| r.text()).collect();
        info!("tab {tab_id}: cookie '{cookie_name}' filtered by {texts:?}");
    }

    fn add_cookie_error(&self, tab_id: i32, cookie_name: &str, rules: &[Arc<NetworkRule>], error: &CookieApiError) {
        let texts: Vec<&str> = rules.iter().map(|r| r.text()).collect();
        warn!("tab {tab_id}: cookie '{cookie_name}' not updated for {texts:?}: {error}");
    }
}
