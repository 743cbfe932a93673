//! Request model
//!
//! A [`Request`] carries everything the matcher needs about one network
//! request: the URL, the page it was issued from, its resource type and the
//! derived hostnames and registrable domains.

use crate::psl::get_etld1;
use crate::url::hostname;

// =============================================================================
// Request Types
// =============================================================================

bitflags::bitflags! {
    /// Resource type bit mask.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct RequestType: u32 {
        /// Main frame
        const DOCUMENT = 1 << 0;
        /// iframe/frame
        const SUBDOCUMENT = 1 << 1;
        const SCRIPT = 1 << 2;
        const STYLESHEET = 1 << 3;
        const OBJECT = 1 << 4;
        const IMAGE = 1 << 5;
        const XMLHTTPREQUEST = 1 << 6;
        const MEDIA = 1 << 7;
        const FONT = 1 << 8;
        const WEBSOCKET = 1 << 9;
        const WEBRTC = 1 << 10;
        const PING = 1 << 11;
        const OTHER = 1 << 12;
    }
}

impl RequestType {
    /// Parse from a browser request type string.
    ///
    /// Unknown names map to `OTHER`.
    pub fn from_browser_type(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "main_frame" | "document" => Self::DOCUMENT,
            "sub_frame" | "subdocument" => Self::SUBDOCUMENT,
            "script" => Self::SCRIPT,
            "stylesheet" => Self::STYLESHEET,
            "object" | "object_subrequest" => Self::OBJECT,
            "image" | "imageset" => Self::IMAGE,
            "xmlhttprequest" | "xhr" | "fetch" => Self::XMLHTTPREQUEST,
            "media" => Self::MEDIA,
            "font" => Self::FONT,
            "websocket" => Self::WEBSOCKET,
            "webrtc" => Self::WEBRTC,
            "ping" | "beacon" => Self::PING,
            _ => Self::OTHER,
        }
    }
}

// =============================================================================
// Request
// =============================================================================

/// One request to be matched against the rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub url: String,
    /// Lowercased URL, used for case-insensitive patterns.
    pub url_lowercase: String,
    pub hostname: String,
    /// Registrable domain of `hostname`.
    pub domain: String,

    pub source_url: String,
    pub source_hostname: String,
    pub source_domain: String,

    pub request_type: RequestType,
    pub third_party: bool,

    /// Browser tab the request belongs to, -1 when unknown.
    pub tab_id: i32,
    pub request_id: String,
}

impl Request {
    /// Create a request. `source_url` may be empty when there is no page context.
    pub fn new(url: &str, source_url: &str, request_type: RequestType) -> Self {
        let host = hostname(url);
        let domain = get_etld1(&host);

        let mut source_hostname = hostname(source_url);
        if source_hostname.is_empty() && request_type == RequestType::DOCUMENT {
            // A top-level document is its own page
            source_hostname = host.clone();
        }
        let source_domain = get_etld1(&source_hostname);

        let third_party = !source_url.is_empty() && !source_domain.is_empty() && source_domain != domain;

        Self {
            url: url.to_string(),
            url_lowercase: url.to_ascii_lowercase(),
            hostname: host,
            domain,
            source_url: source_url.to_string(),
            source_hostname,
            source_domain,
            request_type,
            third_party,
            tab_id: -1,
            request_id: String::new(),
        }
    }

    pub fn with_tab_id(mut self, tab_id: i32) -> Self {
        self.tab_id = tab_id;
        self
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = request_id.into();
        self
    }
}
