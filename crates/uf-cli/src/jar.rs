//! JSON file standing in for the browser cookie store

use std::cell::RefCell;
use std::fs;

use uf_core::psl::is_domain_or_subdomain;
use uf_core::url::hostname;
use uf_cookie::{BrowserCookie, CookieApi, CookieApiError};

/// Cookies kept in memory and written back as a JSON array.
#[derive(Debug, Default)]
pub struct JsonCookieJar {
    cookies: RefCell<Vec<BrowserCookie>>,
    actions: RefCell<Vec<String>>,
}

impl JsonCookieJar {
    pub fn new(cookies: Vec<BrowserCookie>) -> Self {
        Self {
            cookies: RefCell::new(cookies),
            actions: RefCell::new(Vec::new()),
        }
    }

    /// Load a jar; a missing file is an empty jar.
    pub fn load(path: &str) -> Result<Self, String> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(format!("Failed to read jar '{}': {}", path, e)),
        };
        let cookies: Vec<BrowserCookie> =
            serde_json::from_str(&text).map_err(|e| format!("Failed to parse jar '{}': {}", path, e))?;
        Ok(Self::new(cookies))
    }

    pub fn save(&self, path: &str) -> Result<(), String> {
        let json = serde_json::to_string_pretty(&*self.cookies.borrow())
            .map_err(|e| format!("Failed to encode jar: {}", e))?;
        fs::write(path, json).map_err(|e| format!("Failed to write jar '{}': {}", path, e))
    }

    /// Store a cookie the way a browser does on `Set-Cookie`, replacing
    /// the cookie with the same name and host.
    pub fn set(&self, cookie: BrowserCookie) {
        let mut cookies = self.cookies.borrow_mut();
        cookies.retain(|c| !(c.name == cookie.name && c.host() == cookie.host()));
        cookies.push(cookie);
    }

    pub fn cookies(&self) -> Vec<BrowserCookie> {
        self.cookies.borrow().clone()
    }

    /// What the filter did to the jar, in order.
    pub fn actions(&self) -> Vec<String> {
        self.actions.borrow().clone()
    }
}

impl CookieApi for JsonCookieJar {
    async fn remove_cookie(&self, name: &str, url: &str) -> Result<(), CookieApiError> {
        let host = hostname(url);
        if host.is_empty() {
            return Err(CookieApiError(format!("No host in '{}'", url)));
        }

        let mut cookies = self.cookies.borrow_mut();
        let count = cookies.len();
        cookies.retain(|c| !(c.name == name && is_domain_or_subdomain(&host, c.host())));
        if cookies.len() < count {
            self.actions.borrow_mut().push(format!("removed {} ({})", name, host));
        }
        Ok(())
    }

    async fn modify_cookie(&self, cookie: &BrowserCookie, url: &str) -> Result<(), CookieApiError> {
        let mut cookies = self.cookies.borrow_mut();
        let Some(stored) = cookies
            .iter_mut()
            .find(|c| c.name == cookie.name && c.host() == cookie.host())
        else {
            return Err(CookieApiError(format!("No cookie '{}' for {}", cookie.name, url)));
        };
        *stored = cookie.clone();
        self.actions.borrow_mut().push(format!("modified {} ({})", cookie.name, url));
        Ok(())
    }

    async fn get_cookies(&self, domain: &str) -> Result<Vec<BrowserCookie>, CookieApiError> {
        Ok(self
            .cookies
            .borrow()
            .iter()
            .filter(|c| is_domain_or_subdomain(c.host(), domain))
            .cloned()
            .collect())
    }

    async fn has_permission(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jar() -> JsonCookieJar {
        JsonCookieJar::new(vec![
            BrowserCookie::new("a", "1").with_domain(".example.org"),
            BrowserCookie::new("b", "2").with_domain("www.example.org"),
            BrowserCookie::new("a", "3").with_domain("other.com"),
        ])
    }

    #[tokio::test]
    async fn test_get_cookies() {
        let jar = jar();
        let cookies = jar.get_cookies("example.org").await.expect("cookies");
        assert_eq!(cookies.len(), 2);
        assert!(jar.get_cookies("unknown.net").await.expect("cookies").is_empty());
    }

    #[tokio::test]
    async fn test_remove_and_modify() {
        let jar = jar();
        jar.remove_cookie("a", "https://www.example.org/").await.expect("remove");
        assert_eq!(jar.cookies().len(), 2);
        assert!(jar.cookies().iter().any(|c| c.host() == "other.com"));

        let mut cookie = BrowserCookie::new("b", "2").with_domain("www.example.org");
        cookie.max_age = Some(60);
        jar.modify_cookie(&cookie, "http://www.example.org").await.expect("modify");
        assert!(jar.cookies().iter().any(|c| c.name == "b" && c.max_age == Some(60)));

        let missing = BrowserCookie::new("zzz", "").with_domain("www.example.org");
        assert!(jar.modify_cookie(&missing, "http://www.example.org").await.is_err());

        assert_eq!(
            jar.actions(),
            vec![
                "removed a (www.example.org)".to_string(),
                "modified b (http://www.example.org)".to_string(),
            ]
        );
    }

    #[test]
    fn test_set_replaces() {
        let jar = jar();
        jar.set(BrowserCookie::new("a", "9").with_domain("example.org"));
        let cookies = jar.cookies();
        assert_eq!(cookies.len(), 3);
        assert!(cookies.iter().any(|c| c.name == "a" && c.value == "9"));
    }
}
