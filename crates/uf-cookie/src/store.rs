//! Caching decorator over the browser cookie API

use std::cell::RefCell;
use std::collections::HashMap;

use log::debug;
use uf_core::psl::is_domain_or_subdomain;
use uf_core::url::hostname;

use crate::api::{CookieApi, CookieChangeInfo};
use crate::browser_cookie::BrowserCookie;
use crate::error::CookieApiError;

/// Keeps the cookies of every domain asked for, so repeated lookups for the
/// same site do not go back to the browser.
///
/// The cache is filled lazily per domain and kept in sync with changes made
/// through the store and with change notifications passed to [`Self::on_changed`].
#[derive(Debug)]
pub struct CookieStore<A> {
    api: A,
    cache: RefCell<HashMap<String, Vec<BrowserCookie>>>,
}

impl<A: CookieApi> CookieStore<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            cache: RefCell::new(HashMap::new()),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Push a changed cookie to the browser at its own URL.
    pub async fn update_cookie(&self, cookie: &BrowserCookie) -> Result<(), CookieApiError> {
        self.modify_cookie(cookie, &cookie.url()).await
    }

    /// Remove a cookie from the browser at its own URL.
    pub async fn delete_cookie(&self, cookie: &BrowserCookie) -> Result<(), CookieApiError> {
        self.api.remove_cookie(&cookie.name, &cookie.url()).await?;
        self.forget(&cookie.name, cookie.host());
        Ok(())
    }

    /// Mirror a browser change notification into the cache.
    pub fn on_changed(&self, info: &CookieChangeInfo) {
        debug!(
            "Cookie '{}' on '{}' changed ({:?}, removed: {})",
            info.cookie.name,
            info.cookie.host(),
            info.cause,
            info.removed
        );
        if info.removed {
            self.forget(&info.cookie.name, info.cookie.host());
        } else {
            self.remember(&info.cookie);
        }
    }

    fn remember(&self, cookie: &BrowserCookie) {
        let host = cookie.host();
        for (domain, cookies) in self.cache.borrow_mut().iter_mut() {
            if !is_domain_or_subdomain(host, domain) {
                continue;
            }
            match cookies.iter_mut().find(|c| c.name == cookie.name && c.host() == host) {
                Some(existing) => *existing = cookie.clone(),
                None => cookies.push(cookie.clone()),
            }
        }
    }

    fn forget(&self, name: &str, host: &str) {
        for cookies in self.cache.borrow_mut().values_mut() {
            cookies.retain(|c| c.name != name || c.host() != host);
        }
    }
}

impl<A: CookieApi> CookieApi for CookieStore<A> {
    async fn remove_cookie(&self, name: &str, url: &str) -> Result<(), CookieApiError> {
        self.api.remove_cookie(name, url).await?;
        self.forget(name, &hostname(url));
        Ok(())
    }

    async fn modify_cookie(&self, cookie: &BrowserCookie, url: &str) -> Result<(), CookieApiError> {
        self.api.modify_cookie(cookie, url).await?;
        self.remember(cookie);
        Ok(())
    }

    async fn get_cookies(&self, domain: &str) -> Result<Vec<BrowserCookie>, CookieApiError> {
        if let Some(cookies) = self.cache.borrow().get(domain) {
            return Ok(cookies.clone());
        }
        let cookies = self.api.get_cookies(domain).await?;
        self.cache.borrow_mut().insert(domain.to_string(), cookies.clone());
        Ok(cookies)
    }

    async fn has_permission(&self) -> bool {
        self.api.has_permission().await
    }
}
