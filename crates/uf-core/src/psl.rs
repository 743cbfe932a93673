//! Registrable domain (eTLD+1) helpers
//!
//! Lookups use the public suffix list compiled into the `psl` crate. A newer
//! list can be installed at runtime with [`init_psl`]; it then takes
//! precedence over the built-in one.
//!
//! # Examples
//!
//! ```
//! use uf_core::psl::get_etld1;
//!
//! assert_eq!(get_etld1("sub.example.com"), "example.com");
//! assert_eq!(get_etld1("sub.example.co.uk"), "example.co.uk");
//! assert_eq!(get_etld1("user.github.io"), "user.github.io");
//! ```

use std::sync::RwLock;

use publicsuffix::{List, Psl};

/// Error type for loading a public suffix list.
#[derive(Debug, thiserror::Error)]
pub enum PslError {
    #[error("Failed to read public suffix list: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid public suffix list: {0}")]
    Parse(String),
}

static LOADED_LIST: RwLock<Option<List>> = RwLock::new(None);

/// Install a public suffix list in `public_suffix_list.dat` format.
pub fn init_psl(text: &str) -> Result<(), PslError> {
    let list = text.parse::<List>().map_err(|e| PslError::Parse(e.to_string()))?;
    if let Ok(mut slot) = LOADED_LIST.write() {
        *slot = Some(list);
    }
    Ok(())
}

/// [`init_psl`] from a file.
pub fn load_psl_file(path: impl AsRef<std::path::Path>) -> Result<(), PslError> {
    let text = std::fs::read_to_string(path)?;
    init_psl(&text)
}

pub fn is_psl_loaded() -> bool {
    LOADED_LIST.read().map(|list| list.is_some()).unwrap_or(false)
}

/// Get the registrable domain for a hostname.
///
/// IP literals, public suffixes themselves and single-label hosts are
/// returned unchanged.
pub fn get_etld1(host: &str) -> String {
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    if host.is_empty() || is_ip_literal(&host) {
        return host;
    }

    lookup_loaded(&host)
        .or_else(|| ::psl::domain_str(&host).map(str::to_string))
        .unwrap_or(host)
}

fn lookup_loaded(host: &str) -> Option<String> {
    let guard = LOADED_LIST.read().ok()?;
    let domain = guard.as_ref()?.domain(host.as_bytes())?;
    std::str::from_utf8(domain.as_bytes()).ok().map(str::to_string)
}

fn is_ip_literal(host: &str) -> bool {
    host.starts_with('[') || (host.bytes().all(|b| b.is_ascii_digit() || b == b'.') && host.contains('.'))
}

/// Check if two hosts belong to different registrable domains.
///
/// An empty site host means there is no page context, which is never third-party.
pub fn is_third_party(site_host: &str, req_host: &str) -> bool {
    if site_host.is_empty() {
        return false;
    }
    get_etld1(site_host) != get_etld1(req_host)
}

/// Get the parent domain (strip leftmost label).
pub fn get_parent_domain(host: &str) -> Option<&str> {
    match host.find('.') {
        Some(idx) if idx < host.len() - 1 => Some(&host[idx + 1..]),
        _ => None,
    }
}

/// Iterator over a host and each of its parent domains.
pub struct HostSuffixIter<'a> {
    current: Option<&'a str>,
}

impl<'a> Iterator for HostSuffixIter<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        let result = self.current?;
        self.current = get_parent_domain(result);
        Some(result)
    }
}

/// Walk host suffixes from most specific to least specific.
///
/// `a.b.example.com` yields `a.b.example.com`, `b.example.com`, `example.com`, `com`.
pub fn walk_host_suffixes(host: &str) -> HostSuffixIter<'_> {
    HostSuffixIter {
        current: if host.is_empty() { None } else { Some(host) },
    }
}

/// Check whether `host` equals `domain` or is one of its subdomains.
pub fn is_domain_or_subdomain(host: &str, domain: &str) -> bool {
    if host.len() < domain.len() {
        return false;
    }
    if host.len() == domain.len() {
        return host.eq_ignore_ascii_case(domain);
    }
    let split = host.len() - domain.len();
    host.as_bytes()[split - 1] == b'.' && host[split..].eq_ignore_ascii_case(domain)
}

/// Check whether `host` matches any domain in the list.
pub fn is_domain_or_subdomain_of_any<S: AsRef<str>>(host: &str, domains: &[S]) -> bool {
    domains.iter().any(|d| is_domain_or_subdomain(host, d.as_ref()))
}
