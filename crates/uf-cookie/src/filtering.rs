//! Cookie filtering
//!
//! `$cookie` rules reach cookies through three paths:
//!
//! - response headers record which cookies were set by third-party responses
//! - [`CookieFiltering::modify_cookies`] sweeps the cookies of a request's
//!   domain once the request is done
//! - [`CookieFiltering::on_cookie_changed`] handles cookies written by the
//!   page or the browser outside of any request
//!
//! The [`CookieJournal`] keeps the three paths from acting twice on the same
//! cookie.

use std::cell::{Ref, RefCell};
use std::sync::Arc;

use log::{debug, error, warn};
use uf_core::psl::is_domain_or_subdomain;
use uf_core::{NetworkRule, NetworkRuleOption, Request};

use crate::api::{CookieApi, CookieChangeInfo, FilteringLog, RulesFinder};
use crate::browser_cookie::BrowserCookie;
use crate::error::FilteringError;
use crate::header::{parse_cookie, parse_set_cookie, serialize_cookie_header, update_max_age, HttpHeader};
use crate::journal::CookieJournal;

const COOKIE_HEADER: &str = "Cookie";
const SET_COOKIE_HEADER: &str = "Set-Cookie";

/// Tab id used for cookies changed outside of any request.
const NO_TAB: i32 = -1;

/// Applies `$cookie` rules to browser cookies.
pub struct CookieFiltering<A, F, L> {
    api: A,
    rules_finder: F,
    filtering_log: L,
    journal: RefCell<CookieJournal>,
}

impl<A, F, L> CookieFiltering<A, F, L>
where
    A: CookieApi,
    F: RulesFinder,
    L: FilteringLog,
{
    pub fn new(api: A, rules_finder: F, filtering_log: L) -> Self {
        Self {
            api,
            rules_finder,
            filtering_log,
            journal: RefCell::new(CookieJournal::new()),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn journal(&self) -> Ref<'_, CookieJournal> {
        self.journal.borrow()
    }

    /// Record the provenance of every cookie set by a response.
    ///
    /// No rule is applied here.
    pub fn process_response_headers(&self, request: &Request, headers: &[HttpHeader]) {
        let mut journal = self.journal.borrow_mut();
        for header in headers.iter().filter(|h| h.is(SET_COOKIE_HEADER)) {
            let Some(cookie) = parse_set_cookie(&header.value) else {
                debug!("Skipping unparsable Set-Cookie '{}'", header.value);
                continue;
            };
            let domain = cookie
                .domain
                .as_deref()
                .filter(|d| !d.is_empty())
                .unwrap_or(&request.hostname);
            journal.set_third_party(&cookie.name, domain, request.third_party);
        }
    }

    /// Drop blocked cookies from the outgoing `Cookie` header.
    ///
    /// Returns whether the headers were changed.
    pub fn process_request_headers(
        &self,
        request: &Request,
        headers: &mut Vec<HttpHeader>,
        rules: &[Arc<NetworkRule>],
    ) -> bool {
        if rules.is_empty() {
            return false;
        }
        let Some(pos) = headers.iter().position(|h| h.is(COOKIE_HEADER)) else {
            return false;
        };

        let mut cookies = parse_cookie(&headers[pos].value);
        let count = cookies.len();
        {
            let journal = self.journal.borrow();
            cookies.retain(|cookie| {
                let third_party = journal.is_third_party_cookie(&cookie.name, &request.hostname);
                match find_not_modifying_rule(&cookie.name, rules, third_party) {
                    Some(rule) if !rule.is_whitelist() => {
                        debug!("Cookie '{}' stripped from {} by '{}'", cookie.name, request.url, rule.text());
                        self.filtering_log
                            .add_cookie_event(request.tab_id, &cookie.name, std::slice::from_ref(rule));
                        false
                    }
                    _ => true,
                }
            });
        }

        if cookies.len() == count {
            return false;
        }
        if cookies.is_empty() {
            headers.remove(pos);
        } else {
            headers[pos].value = serialize_cookie_header(&cookies);
        }
        true
    }

    /// Apply `rules` to every cookie of the request's domain.
    pub async fn modify_cookies(&self, request: &Request, rules: &[Arc<NetworkRule>]) -> Result<(), FilteringError> {
        self.check_permission().await?;
        if rules.is_empty() {
            return Ok(());
        }

        let cookies = self.api.get_cookies(&request.domain).await?;
        for mut cookie in cookies {
            let third_party = self.journal.borrow().is_third_party(&cookie);
            let url = cookie_url(&cookie, request);
            self.apply_rules(&mut cookie, rules, third_party, &url, request.tab_id)
                .await;
            self.journal.borrow_mut().set_processed(&cookie);
        }
        Ok(())
    }

    /// Handle a browser cookie change.
    pub async fn on_cookie_changed(&self, info: &CookieChangeInfo) -> Result<(), FilteringError> {
        let mut cookie = info.cookie.clone();

        if info.removed {
            self.journal.borrow_mut().remove(&cookie);
            return Ok(());
        }

        // Our own removal or modification coming back
        if self.journal.borrow().is_processed(&cookie) {
            self.journal.borrow_mut().remove(&cookie);
            return Ok(());
        }

        self.check_permission().await?;

        let third_party = self.journal.borrow().is_third_party(&cookie);
        let url = cookie.url();
        let rules = self.rules_finder.get_rules_for_cookie(&url, third_party);
        if !rules.is_empty() {
            self.apply_rules(&mut cookie, &rules, third_party, &url, NO_TAB).await;
        }
        self.journal.borrow_mut().set_processed(&cookie);
        Ok(())
    }

    /// Pure blocking `$cookie` rules: no `sameSite`/`maxAge`, no `$third-party`.
    pub fn get_blocking_rules(&self, rules: &[Arc<NetworkRule>]) -> Vec<Arc<NetworkRule>> {
        rules
            .iter()
            .filter(|rule| {
                rule.cookie_modifier().is_some_and(|m| !m.is_modifying())
                    && !rule.is_whitelist()
                    && !rule.is_option_enabled(NetworkRuleOption::THIRD_PARTY)
            })
            .cloned()
            .collect()
    }

    async fn check_permission(&self) -> Result<(), FilteringError> {
        if self.api.has_permission().await {
            Ok(())
        } else {
            error!("Cookie permission not granted, $cookie rules are not applied");
            Err(FilteringError::PermissionNotGranted)
        }
    }

    /// Remove the cookie if a plain rule blocks it, otherwise apply the
    /// modifying rules. Cookie API failures go to the filtering log and are
    /// not retried.
    async fn apply_rules(
        &self,
        cookie: &mut BrowserCookie,
        rules: &[Arc<NetworkRule>],
        third_party: bool,
        url: &str,
        tab_id: i32,
    ) {
        if let Some(rule) = find_not_modifying_rule(&cookie.name, rules, third_party) {
            if !rule.is_whitelist() {
                if let Err(e) = self.api.remove_cookie(&cookie.name, url).await {
                    warn!("Failed to remove cookie '{}' at {}: {}", cookie.name, url, e);
                    self.filtering_log
                        .add_cookie_error(tab_id, &cookie.name, std::slice::from_ref(rule), &e);
                    return;
                }
                debug!("Removed cookie '{}' at {} by '{}'", cookie.name, url, rule.text());
            }
            self.filtering_log
                .add_cookie_event(tab_id, &cookie.name, std::slice::from_ref(rule));
            return;
        }

        let modifying = find_modifying_rules(&cookie.name, rules, third_party);
        if modifying.is_empty() {
            return;
        }

        let applied = apply_modifying_rules(cookie, &modifying);
        if applied.is_empty() {
            return;
        }

        if let Err(e) = self.api.modify_cookie(cookie, url).await {
            warn!("Failed to modify cookie '{}' at {}: {}", cookie.name, url, e);
            self.filtering_log.add_cookie_error(tab_id, &cookie.name, &applied, &e);
            return;
        }
        debug!("Modified cookie '{}' at {} by {} rule(s)", cookie.name, url, applied.len());
        self.filtering_log.add_cookie_event(tab_id, &cookie.name, &applied);
    }
}

/// URL addressing `cookie` in the cookie API. The request URL is used when
/// it can see the cookie; a cookie of a sibling host needs its own URL.
fn cookie_url(cookie: &BrowserCookie, request: &Request) -> String {
    let host = cookie.host();
    if host.is_empty() || is_domain_or_subdomain(&request.hostname, host) {
        request.url.clone()
    } else {
        cookie.url()
    }
}

// =============================================================================
// Rule selection
// =============================================================================

fn matches_cookie(rule: &NetworkRule, name: &str) -> bool {
    rule.cookie_modifier().is_some_and(|m| m.matches_name(name))
}

fn is_modifying(rule: &NetworkRule) -> bool {
    rule.cookie_modifier().is_some_and(|m| m.is_modifying())
}

/// A plain `$cookie` rule for the cookie; allow-list rules come first.
fn find_not_modifying_rule<'a>(
    name: &str,
    rules: &'a [Arc<NetworkRule>],
    third_party: bool,
) -> Option<&'a Arc<NetworkRule>> {
    rules
        .iter()
        .filter(|rule| matches_cookie(rule, name) && !is_modifying(rule) && rule.match_third_party(third_party))
        .min_by_key(|rule| !rule.is_whitelist())
}

/// Modifying rules for the cookie, or none at all when any plain rule
/// targets the same name.
fn find_modifying_rules(name: &str, rules: &[Arc<NetworkRule>], third_party: bool) -> Vec<Arc<NetworkRule>> {
    let mut result = Vec::new();
    for rule in rules.iter().filter(|rule| matches_cookie(rule, name)) {
        if !is_modifying(rule) {
            return Vec::new();
        }
        if rule.match_third_party(third_party) {
            result.push(rule.clone());
        }
    }
    result
}

/// Apply `sameSite` and `maxAge`; returns the rules that changed something.
fn apply_modifying_rules(cookie: &mut BrowserCookie, rules: &[Arc<NetworkRule>]) -> Vec<Arc<NetworkRule>> {
    let mut applied = Vec::new();
    for rule in rules {
        let Some(modifier) = rule.cookie_modifier() else {
            continue;
        };
        let mut modified = false;

        if let Some(same_site) = modifier.same_site() {
            let current = cookie.same_site.as_deref().unwrap_or_default();
            if !current.eq_ignore_ascii_case(same_site) {
                cookie.same_site = Some(same_site.to_string());
                modified = true;
            }
        }

        if let Some(max_age) = modifier.max_age().filter(|age| *age > 0) {
            if update_max_age(cookie, max_age) {
                modified = true;
            }
        }

        if modified {
            applied.push(rule.clone());
        }
    }
    applied
}
