//! Cookie filtering driven by `$cookie` rules
//!
//! # Modules
//!
//! - `header`: `Cookie`/`Set-Cookie` codec and expiry reconciliation
//! - `browser_cookie`: Cookie model as kept by the browser
//! - `journal`: Per-cookie provenance and processing state
//! - `api`: Host collaborators (cookie API, rules finder, filtering log)
//! - `store`: Caching cookie API decorator
//! - `filtering`: Rule application to cookies
//! - `stealth`: Synthetic stealth-mode cookie rules

pub mod api;
pub mod browser_cookie;
pub mod error;
pub mod filtering;
pub mod header;
pub mod journal;
pub mod stealth;
pub mod store;

// Re-export commonly used types
pub use api::{CookieApi, CookieChangeInfo, FilteringLog, LogFilteringLog, OnChangedCause, RulesFinder};
pub use browser_cookie::BrowserCookie;
pub use error::{CookieApiError, CookieError, FilteringError};
pub use filtering::CookieFiltering;
pub use header::{parse_cookie, parse_set_cookie, serialize, update_max_age, Cookie, HttpHeader, SetCookie};
pub use journal::CookieJournal;
pub use stealth::{StealthConfig, StealthService};
pub use store::CookieStore;
