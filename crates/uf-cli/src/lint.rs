//! `lint`: report rules that fail to parse

use std::fs;

use uf_core::{parse_rule, RuleParseError, StringRuleList};

/// A line that failed to parse, 1-based.
#[derive(Debug, PartialEq, Eq)]
struct LintError {
    line: usize,
    text: String,
    error: RuleParseError,
}

fn lint_list(list: &StringRuleList) -> (usize, Vec<LintError>) {
    let mut rules = 0usize;
    let mut errors = Vec::new();
    for (line_no, (_, line)) in list.lines().enumerate() {
        match parse_rule(line, list.id(), list.parse_options()) {
            Ok(Some(_)) => rules += 1,
            Ok(None) => {}
            Err(error) => errors.push(LintError {
                line: line_no + 1,
                text: line.trim().to_string(),
                error,
            }),
        }
    }
    (rules, errors)
}

pub fn cmd_lint(paths: &[String]) -> Result<(), String> {
    let mut total_errors = 0usize;

    for (i, path) in paths.iter().enumerate() {
        let text = fs::read_to_string(path).map_err(|e| format!("Failed to read '{}': {}", path, e))?;
        let list = StringRuleList::new(i as u32 + 1, text);
        let (rules, errors) = lint_list(&list);

        for e in &errors {
            println!("{}:{}: {} ({})", path, e.line, e.error, e.text);
        }
        println!("{}: {} rules, {} errors", path, rules, errors.len());
        total_errors += errors.len();
    }

    if total_errors > 0 {
        return Err(format!("{} invalid rules", total_errors));
    }
    Ok(())
}
