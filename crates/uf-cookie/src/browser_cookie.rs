//! Cookie as stored by the browser

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A cookie with the attributes the browser keeps for it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowserCookie {
    pub name: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<DateTime<Utc>>,
    /// Seconds, relative to when the cookie was read.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_age: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub same_site: Option<String>,
    #[serde(default)]
    pub secure: bool,
    #[serde(default)]
    pub http_only: bool,
}

impl BrowserCookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            ..Self::default()
        }
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Domain without the leading `.` of a domain cookie.
    pub fn host(&self) -> &str {
        self.domain.as_deref().map(|d| d.trim_start_matches('.')).unwrap_or_default()
    }

    /// URL the cookie is visible to, used to address it in the cookie API.
    pub fn url(&self) -> String {
        let scheme = if self.secure { "https" } else { "http" };
        let path = match self.path.as_deref() {
            None | Some("") => "",
            Some(path) if path.starts_with('/') => path,
            Some(path) => return format!("{scheme}://{}/{path}", self.host()),
        };
        format!("{scheme}://{}{path}", self.host())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url() {
        let mut cookie = BrowserCookie::new("a", "1").with_domain(".example.org");
        assert_eq!(cookie.url(), "http://example.org");

        cookie.secure = true;
        cookie.path = Some("/account".to_string());
        assert_eq!(cookie.url(), "https://example.org/account");

        cookie.path = Some("docs".to_string());
        assert_eq!(cookie.url(), "https://example.org/docs");
    }

    #[test]
    fn test_deserialize_jar_entry() {
        let cookie: BrowserCookie = serde_json::from_str(
            r#"{"name": "c_user", "value": "42", "domain": "example.org", "maxAge": 100, "sameSite": "none"}"#,
        )
        .expect("cookie");
        assert_eq!(cookie.name, "c_user");
        assert_eq!(cookie.max_age, Some(100));
        assert_eq!(cookie.same_site.as_deref(), Some("none"));
        assert!(!cookie.secure);
    }
}
