//! `Cookie` and `Set-Cookie` header codec

use chrono::{DateTime, Duration, NaiveDateTime, Utc};

use crate::browser_cookie::BrowserCookie;
use crate::error::CookieError;

/// IMF-fixdate, as emitted in `Expires`.
const IMF_FIXDATE: &str = "%a, %d %b %Y %H:%M:%S GMT";
/// Netscape-style date still sent by some servers.
const NETSCAPE_DATE: &str = "%a, %d-%b-%Y %H:%M:%S GMT";

/// Legal header field-content: HTAB, visible ASCII and Latin-1 octets.
fn is_field_content(s: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| c == '\t' || ('\x20'..='\x7e').contains(&c) || ('\u{80}'..='\u{ff}').contains(&c))
}

/// One HTTP header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpHeader {
    pub name: String,
    pub value: String,
}

impl HttpHeader {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

// =============================================================================
// Cookie header
// =============================================================================

/// One `name=value` pair of a `Cookie` request header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
}

impl Cookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Parse a `Cookie` header value. Entries without `=` are skipped.
pub fn parse_cookie(header: &str) -> Vec<Cookie> {
    header
        .split(';')
        .filter_map(|pair| {
            let (name, value) = pair.split_once('=')?;
            Some(Cookie::new(name.trim(), value.trim()))
        })
        .collect()
}

/// Build a `Cookie` header value.
pub fn serialize_cookie_header(cookies: &[Cookie]) -> String {
    cookies
        .iter()
        .map(|c| format!("{}={}", c.name, c.value))
        .collect::<Vec<_>>()
        .join("; ")
}

// =============================================================================
// Set-Cookie header
// =============================================================================

/// A parsed `Set-Cookie` header.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SetCookie {
    pub name: String,
    pub value: String,
    pub domain: Option<String>,
    pub path: Option<String>,
    pub expires: Option<DateTime<Utc>>,
    pub max_age: Option<i64>,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: Option<String>,
    pub priority: Option<String>,
}

impl SetCookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            ..Self::default()
        }
    }
}

impl From<SetCookie> for BrowserCookie {
    fn from(cookie: SetCookie) -> Self {
        BrowserCookie {
            name: cookie.name,
            value: cookie.value,
            domain: cookie.domain,
            path: cookie.path,
            expires: cookie.expires,
            max_age: cookie.max_age,
            same_site: cookie.same_site,
            secure: cookie.secure,
            http_only: cookie.http_only,
        }
    }
}

impl From<BrowserCookie> for SetCookie {
    fn from(cookie: BrowserCookie) -> Self {
        SetCookie {
            name: cookie.name,
            value: cookie.value,
            domain: cookie.domain,
            path: cookie.path,
            expires: cookie.expires,
            max_age: cookie.max_age,
            secure: cookie.secure,
            http_only: cookie.http_only,
            same_site: cookie.same_site,
            priority: None,
        }
    }
}

/// Parse a `Set-Cookie` header value.
///
/// Returns `None` only for an empty header; `=v` is a cookie with an empty
/// name. Unknown attributes and unparsable attribute values are ignored.
pub fn parse_set_cookie(header: &str) -> Option<SetCookie> {
    if header.is_empty() {
        return None;
    }
    let mut parts = header.split(';').filter(|s| !s.is_empty());
    let first = parts.next().unwrap_or_default();
    let (name, value) = match first.split_once('=') {
        Some((name, value)) => (name.trim(), value.trim()),
        None => (first.trim(), ""),
    };

    let mut cookie = SetCookie::new(name, value);
    for part in parts {
        let (key, value) = match part.split_once('=') {
            Some((key, value)) => (key.trim(), value.trim()),
            None => (part.trim(), ""),
        };
        match key.to_ascii_lowercase().as_str() {
            "expires" => cookie.expires = parse_http_date(value),
            "max-age" => cookie.max_age = value.parse().ok(),
            "domain" => cookie.domain = Some(value.to_string()),
            "path" => cookie.path = Some(value.to_string()),
            "secure" => cookie.secure = true,
            "httponly" => cookie.http_only = true,
            "samesite" => cookie.same_site = Some(value.to_string()),
            "priority" => cookie.priority = Some(value.to_string()),
            _ => {}
        }
    }
    Some(cookie)
}

fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(date) = DateTime::parse_from_rfc2822(value) {
        return Some(date.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, NETSCAPE_DATE)
        .ok()
        .map(|date| date.and_utc())
}

/// Serialize a cookie into a `Set-Cookie` header value.
pub fn serialize(cookie: &SetCookie) -> Result<String, CookieError> {
    if !is_field_content(&cookie.name) {
        return Err(CookieError::InvalidName(cookie.name.clone()));
    }
    if !cookie.value.is_empty() && !is_field_content(&cookie.value) {
        return Err(CookieError::InvalidValue(cookie.value.clone()));
    }
    if let Some(domain) = cookie.domain.as_deref().filter(|d| !d.is_empty()) {
        if !is_field_content(domain) {
            return Err(CookieError::InvalidDomain(domain.to_string()));
        }
    }
    if let Some(path) = cookie.path.as_deref().filter(|p| !p.is_empty()) {
        if !is_field_content(path) {
            return Err(CookieError::InvalidPath(path.to_string()));
        }
    }

    let mut header = format!("{}={}", cookie.name, cookie.value);

    if let Some(max_age) = cookie.max_age {
        header.push_str(&format!("; Max-Age={max_age}"));
    }
    if let Some(domain) = cookie.domain.as_deref().filter(|d| !d.is_empty()) {
        header.push_str(&format!("; Domain={domain}"));
    }
    if let Some(path) = cookie.path.as_deref().filter(|p| !p.is_empty()) {
        header.push_str(&format!("; Path={path}"));
    }
    if let Some(expires) = cookie.expires {
        header.push_str(&format!("; Expires={}", expires.format(IMF_FIXDATE)));
    }
    if cookie.http_only {
        header.push_str("; HttpOnly");
    }
    if cookie.secure {
        header.push_str("; Secure");
    }
    if let Some(same_site) = cookie.same_site.as_deref().filter(|s| !s.is_empty()) {
        let normalized = match same_site.to_ascii_lowercase().as_str() {
            "lax" => "Lax",
            "strict" => "Strict",
            "none" => "None",
            _ => return Err(CookieError::InvalidSameSite(same_site.to_string())),
        };
        header.push_str(&format!("; SameSite={normalized}"));
    }
    if let Some(priority) = cookie.priority.as_deref().filter(|p| !p.is_empty()) {
        header.push_str(&format!("; Priority={priority}"));
    }

    Ok(header)
}

// =============================================================================
// Expiry
// =============================================================================

fn expiry_after(now: DateTime<Utc>, seconds: i64) -> Option<DateTime<Utc>> {
    Duration::try_seconds(seconds).and_then(|d| now.checked_add_signed(d))
}

/// Shorten the cookie's life to `max_age` seconds from now.
///
/// Returns whether the cookie was changed.
pub fn update_max_age(cookie: &mut BrowserCookie, max_age: i64) -> bool {
    update_max_age_at(cookie, max_age, Utc::now())
}

/// [`update_max_age`] with an explicit current time.
///
/// The cookie is changed only when it has no expiry yet or the new expiry is
/// strictly earlier than the current one. A cookie that carries `expires`
/// gets a new `expires`; `max_age` is set when the cookie has one or has no
/// expiry at all.
pub fn update_max_age_at(cookie: &mut BrowserCookie, max_age: i64, now: DateTime<Utc>) -> bool {
    let current = match (cookie.max_age, cookie.expires) {
        (Some(age), _) => expiry_after(now, age),
        (None, Some(expires)) => Some(expires),
        (None, None) => None,
    };
    let Some(new_expiry) = expiry_after(now, max_age) else {
        return false;
    };
    if current.is_some_and(|current| new_expiry >= current) {
        return false;
    }

    if cookie.expires.is_some() {
        cookie.expires = Some(new_expiry);
    }
    if cookie.max_age.is_some() || cookie.expires.is_none() {
        cookie.max_age = Some(max_age);
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_cookie() {
        let cookies = parse_cookie("_octo=GH1.1.635223982.1507661197; logged_in=yes; broken; empty=");
        assert_eq!(
            cookies,
            vec![
                Cookie::new("_octo", "GH1.1.635223982.1507661197"),
                Cookie::new("logged_in", "yes"),
                Cookie::new("empty", ""),
            ]
        );
        assert!(parse_cookie("").is_empty());
        assert!(parse_cookie("novalue").is_empty());
    }

    #[test]
    fn test_serialize_cookie_header() {
        let cookies = vec![Cookie::new("a", "1"), Cookie::new("b", "2")];
        assert_eq!(serialize_cookie_header(&cookies), "a=1; b=2");
    }

    #[test]
    fn test_parse_set_cookie() {
        assert!(parse_set_cookie("").is_none());
        let cookie = parse_set_cookie("=value").expect("cookie");
        assert_eq!(cookie.name, "");
        assert_eq!(cookie.value, "value");

        let cookie = parse_set_cookie("value").expect("cookie");
        assert_eq!(cookie.name, "value");

        let cookie = parse_set_cookie(
            "id=a3fWa=b; Expires=Wed, 21 Oct 2015 07:28:00 GMT; Max-Age=2592000; Domain=example.org; \
             Path=/docs; Secure; HttpOnly; SameSite=Strict; Priority=High",
        )
        .expect("cookie");
        assert_eq!(cookie.name, "id");
        assert_eq!(cookie.value, "a3fWa=b");
        assert_eq!(cookie.expires, Some(Utc.with_ymd_and_hms(2015, 10, 21, 7, 28, 0).unwrap()));
        assert_eq!(cookie.max_age, Some(2592000));
        assert_eq!(cookie.domain.as_deref(), Some("example.org"));
        assert_eq!(cookie.path.as_deref(), Some("/docs"));
        assert!(cookie.secure);
        assert!(cookie.http_only);
        assert_eq!(cookie.same_site.as_deref(), Some("Strict"));
        assert_eq!(cookie.priority.as_deref(), Some("High"));
    }

    #[test]
    fn test_parse_set_cookie_netscape_date() {
        let cookie = parse_set_cookie("a=1; expires=Wed, 21-Oct-2015 07:28:00 GMT").expect("cookie");
        assert_eq!(cookie.expires, Some(Utc.with_ymd_and_hms(2015, 10, 21, 7, 28, 0).unwrap()));

        let cookie = parse_set_cookie("a=1; expires=garbage; max-age=soon").expect("cookie");
        assert!(cookie.expires.is_none());
        assert!(cookie.max_age.is_none());
    }

    #[test]
    fn test_serialize() {
        let mut cookie = SetCookie::new("id", "a3fWa");
        cookie.max_age = Some(100);
        cookie.domain = Some("example.org".to_string());
        cookie.path = Some("/".to_string());
        cookie.expires = Some(Utc.with_ymd_and_hms(2015, 10, 21, 7, 28, 0).unwrap());
        cookie.http_only = true;
        cookie.secure = true;
        cookie.same_site = Some("lax".to_string());
        cookie.priority = Some("High".to_string());

        assert_eq!(
            serialize(&cookie).expect("serialize"),
            "id=a3fWa; Max-Age=100; Domain=example.org; Path=/; Expires=Wed, 21 Oct 2015 07:28:00 GMT; \
             HttpOnly; Secure; SameSite=Lax; Priority=High"
        );
    }

    #[test]
    fn test_serialize_validation() {
        assert_eq!(
            serialize(&SetCookie::new("bad\nname", "1")),
            Err(CookieError::InvalidName("bad\nname".to_string()))
        );
        assert!(matches!(serialize(&SetCookie::new("a", "\u{1}")), Err(CookieError::InvalidValue(_))));

        let mut cookie = SetCookie::new("a", "1");
        cookie.domain = Some("exa\u{7f}mple.org".to_string());
        assert!(matches!(serialize(&cookie), Err(CookieError::InvalidDomain(_))));

        let mut cookie = SetCookie::new("a", "1");
        cookie.path = Some("/\r".to_string());
        assert!(matches!(serialize(&cookie), Err(CookieError::InvalidPath(_))));

        let mut cookie = SetCookie::new("a", "1");
        cookie.same_site = Some("sometimes".to_string());
        assert!(matches!(serialize(&cookie), Err(CookieError::InvalidSameSite(_))));

        let mut cookie = SetCookie::new("a", "");
        cookie.same_site = Some("NONE".to_string());
        assert_eq!(serialize(&cookie).expect("serialize"), "a=; SameSite=None");
    }

    #[test]
    fn test_update_max_age_only_shortens() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        let mut cookie = BrowserCookie::new("a", "1");
        cookie.max_age = Some(100);
        assert!(update_max_age_at(&mut cookie, 15, now));
        assert_eq!(cookie.max_age, Some(15));
        assert!(!update_max_age_at(&mut cookie, 15, now));
        assert!(!update_max_age_at(&mut cookie, 50, now));
        assert_eq!(cookie.max_age, Some(15));
    }

    #[test]
    fn test_update_max_age_without_expiry() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut cookie = BrowserCookie::new("a", "1");
        assert!(update_max_age_at(&mut cookie, 60, now));
        assert_eq!(cookie.max_age, Some(60));
        assert!(cookie.expires.is_none());
    }

    #[test]
    fn test_update_max_age_with_expires() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut cookie = BrowserCookie::new("a", "1");
        cookie.expires = Some(now + Duration::hours(1));

        assert!(update_max_age_at(&mut cookie, 60, now));
        assert_eq!(cookie.expires, Some(now + Duration::seconds(60)));
        assert!(cookie.max_age.is_none());

        assert!(!update_max_age_at(&mut cookie, 60, now));
        assert!(!update_max_age_at(&mut cookie, 3600, now));
    }
}
