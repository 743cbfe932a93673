//! `cookies`: run cookie filtering against a jar file

use std::fs;
use std::sync::Arc;

use uf_core::{Engine, NetworkRule, Request, RequestType};
use uf_cookie::{
    parse_set_cookie, BrowserCookie, CookieFiltering, HttpHeader, LogFilteringLog, StealthConfig, StealthService,
};

use crate::jar::JsonCookieJar;

pub struct CookiesOptions {
    pub url: String,
    pub source: String,
    pub request_type: String,
    pub jar: String,
    pub set_cookies: Vec<String>,
    pub stealth: Option<String>,
}

fn load_stealth(path: &str) -> Result<StealthConfig, String> {
    let text = fs::read_to_string(path).map_err(|e| format!("Failed to read '{}': {}", path, e))?;
    serde_json::from_str(&text).map_err(|e| format!("Failed to parse stealth config '{}': {}", path, e))
}

/// `$cookie` rules for the request, plus stealth rules unless a `$stealth`
/// exception covers it.
fn collect_rules(engine: &Engine, request: &Request, stealth: Option<&StealthService>) -> Vec<Arc<NetworkRule>> {
    let result = engine.match_request(request);
    let mut rules = result.get_cookie_rules().to_vec();
    if let Some(service) = stealth {
        if result.stealth_rule().is_none() {
            rules.extend(service.get_cookie_rules(request));
        }
    }
    rules
}

/// Store the response cookies in the jar, then filter every cookie of the
/// request's domain.
async fn filter_jar(
    engine: &Engine,
    jar: &JsonCookieJar,
    request: &Request,
    set_cookies: &[String],
    stealth: Option<&StealthService>,
) -> Result<(), String> {
    let headers: Vec<HttpHeader> = set_cookies.iter().map(|v| HttpHeader::new("Set-Cookie", v.as_str())).collect();
    for value in set_cookies {
        let Some(cookie) = parse_set_cookie(value) else {
            return Err(format!("Invalid Set-Cookie header: '{}'", value));
        };
        let mut cookie = BrowserCookie::from(cookie);
        if cookie.domain.as_deref().map_or(true, str::is_empty) {
            cookie.domain = Some(request.hostname.clone());
        }
        jar.set(cookie);
    }

    let rules = collect_rules(engine, request, stealth);
    let filtering = CookieFiltering::new(jar, engine, LogFilteringLog);
    filtering.process_response_headers(request, &headers);
    filtering
        .modify_cookies(request, &rules)
        .await
        .map_err(|e| format!("Cookie filtering failed: {}", e))
}

pub fn cmd_cookies(engine: &Engine, opts: &CookiesOptions) -> Result<(), String> {
    let request = Request::new(&opts.url, &opts.source, RequestType::from_browser_type(&opts.request_type));
    let stealth = opts
        .stealth
        .as_deref()
        .map(load_stealth)
        .transpose()?
        .map(StealthService::new);
    let jar = JsonCookieJar::load(&opts.jar)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("Failed to start runtime: {}", e))?;
    runtime.block_on(filter_jar(engine, &jar, &request, &opts.set_cookies, stealth.as_ref()))?;

    let actions = jar.actions();
    if actions.is_empty() {
        println!("No cookies changed");
    }
    for action in &actions {
        println!("{}", action);
    }

    jar.save(&opts.jar)?;
    println!("{} cookies in {}", jar.cookies().len(), opts.jar);
    Ok(())
}
