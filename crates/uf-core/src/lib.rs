//! Filter-list rule engine
//!
//! This crate parses Adblock-style filter lists and matches web requests
//! against them.
//!
//! # Architecture
//!
//! Filter lists are kept as text inside a [`RuleStorage`]; every rule is
//! addressed by a stable 64-bit storage index and parsed again on demand.
//! The [`Engine`] indexes network rules by host anchor and rarest token,
//! confirms candidates against the full rule, applies `$badfilter` and
//! classifies what is left into a [`MatchingResult`].
//!
//! # Modules
//!
//! - `hash`: Murmur3 hashes for hosts, tokens and cookie keys
//! - `psl`: Registrable domain helpers
//! - `url`: Allocation-light URL helpers and tokenizer
//! - `request`: Request model and request types
//! - `rules`: Rule model and parser
//! - `filterlist`: Filter lists, scanning and indexed storage
//! - `engine`: Network rule index and matching result
//! - `config`: Engine configuration

pub mod config;
pub mod engine;
pub mod filterlist;
pub mod hash;
pub mod psl;
pub mod request;
pub mod rules;
pub mod url;

// Re-export commonly used types
pub use config::{ConfigError, EngineConfig};
pub use engine::{Engine, MatchingResult, NetworkEngine};
pub use filterlist::{RuleStorage, StorageError, StringRuleList};
pub use hash::{hash_cookie_key, hash_domain, hash_token, Hash64};
pub use crate::psl::{get_etld1, init_psl, is_third_party, PslError};
pub use request::{Request, RequestType};
pub use rules::{
    parse_rule, AdvancedModifier, CookieModifier, NetworkRule, NetworkRuleOption, ParseOptions, Rule,
    RuleParseError,
};
