//! `check`: match one request

use std::sync::Arc;

use serde::Serialize;

use uf_core::{Engine, MatchingResult, NetworkRule, Request, RequestType};

#[derive(Serialize)]
struct CheckReport {
    url: String,
    source_url: String,
    third_party: bool,
    decision: &'static str,
    rule: Option<String>,
    document_rule: Option<String>,
    stealth_rule: Option<String>,
    cookie_rules: Vec<String>,
    csp_rules: Vec<String>,
    replace_rules: Vec<String>,
    removeparam_rules: Vec<String>,
}

fn texts(rules: &[Arc<NetworkRule>]) -> Vec<String> {
    rules.iter().map(|r| r.text().to_string()).collect()
}

fn build_report(request: &Request, result: &MatchingResult) -> CheckReport {
    let basic = result.get_basic_result();
    let decision = match basic {
        Some(rule) if rule.is_whitelist() => "allow",
        Some(_) => "block",
        None => "pass",
    };

    CheckReport {
        url: request.url.clone(),
        source_url: request.source_url.clone(),
        third_party: request.third_party,
        decision,
        rule: basic.map(|r| r.text().to_string()),
        document_rule: result.document_rule().map(|r| r.text().to_string()),
        stealth_rule: result.stealth_rule().map(|r| r.text().to_string()),
        cookie_rules: texts(result.get_cookie_rules()),
        csp_rules: texts(result.get_csp_rules()),
        replace_rules: texts(result.get_replace_rules()),
        removeparam_rules: texts(result.get_removeparam_rules()),
    }
}

pub fn cmd_check(engine: &Engine, url: &str, source: &str, request_type: &str, json: bool) -> Result<(), String> {
    let request = Request::new(url, source, RequestType::from_browser_type(request_type));
    let result = engine.match_request(&request);
    let report = build_report(&request, &result);

    if json {
        let out = serde_json::to_string_pretty(&report).map_err(|e| format!("Failed to encode report: {}", e))?;
        println!("{}", out);
        return Ok(());
    }

    println!("Request:     {}", report.url);
    if !report.source_url.is_empty() {
        println!("Source:      {} (third-party: {})", report.source_url, report.third_party);
    }
    println!("Decision:    {}", report.decision);
    if let Some(rule) = &report.rule {
        println!("  Rule:      {}", rule);
    }
    if let Some(rule) = &report.document_rule {
        println!("  Document:  {}", rule);
    }
    if let Some(rule) = &report.stealth_rule {
        println!("  Stealth:   {}", rule);
    }

    for (label, rules) in [
        ("Cookie", &report.cookie_rules),
        ("CSP", &report.csp_rules),
        ("Replace", &report.replace_rules),
        ("Removeparam", &report.removeparam_rules),
    ] {
        if rules.is_empty() {
            continue;
        }
        println!("{} rules:", label);
        for rule in rules {
            println!("  {}", rule);
        }
    }

    Ok(())
}
