//! urlfilter CLI
//!
//! Offline tools for matching requests, linting filter lists and running
//! cookie filtering against a JSON cookie jar.

mod check;
mod cookies;
mod jar;
mod lint;

use std::fs;

use clap::{Parser, Subcommand};

use uf_core::{Engine, EngineConfig, RuleStorage, StringRuleList};
use uf_cookie::{parse_set_cookie, serialize};

#[derive(Parser)]
#[command(name = "uf-cli")]
#[command(about = "urlfilter rule engine tools")]
struct Cli {
    /// Engine configuration (JSON)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Public suffix list replacing the built-in one (public_suffix_list.dat)
    #[arg(long, global = true)]
    psl: Option<String>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Match a request against filter lists
    Check {
        /// Filter list files
        #[arg(short, long = "list", required = true)]
        lists: Vec<String>,

        /// Request URL
        #[arg(short, long)]
        url: String,

        /// URL of the page issuing the request
        #[arg(short, long, default_value = "")]
        source: String,

        /// Request type (script, image, main_frame, ...)
        #[arg(short = 't', long = "type", default_value = "other")]
        request_type: String,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Report rules that fail to parse
    Lint {
        /// Filter list files
        #[arg(short, long = "list", required = true)]
        lists: Vec<String>,
    },

    /// Apply $cookie rules to a JSON cookie jar
    Cookies {
        /// Filter list files
        #[arg(short, long = "list", required = true)]
        lists: Vec<String>,

        /// Request URL
        #[arg(short, long)]
        url: String,

        /// URL of the page issuing the request
        #[arg(short, long, default_value = "")]
        source: String,

        /// Request type
        #[arg(short = 't', long = "type", default_value = "other")]
        request_type: String,

        /// Cookie jar (JSON array of cookies), rewritten in place
        #[arg(long)]
        jar: String,

        /// Set-Cookie headers of the response
        #[arg(long = "set-cookie")]
        set_cookies: Vec<String>,

        /// Stealth configuration (JSON)
        #[arg(long)]
        stealth: Option<String>,
    },

    /// Parse a Set-Cookie header and serialize it back
    SetCookie {
        /// Header value
        header: String,
    },
}

fn main() {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };
    init_logging(cli.verbose || config.verbose);

    if let Some(path) = cli.psl.as_deref() {
        if let Err(e) = uf_core::psl::load_psl_file(path) {
            eprintln!("Error: Failed to load public suffix list '{}': {}", path, e);
            std::process::exit(1);
        }
    }

    let result = match cli.command {
        Commands::Check {
            lists,
            url,
            source,
            request_type,
            json,
        } => load_engine(&lists, config).and_then(|engine| check::cmd_check(&engine, &url, &source, &request_type, json)),
        Commands::Lint { lists } => lint::cmd_lint(&lists),
        Commands::Cookies {
            lists,
            url,
            source,
            request_type,
            jar,
            set_cookies,
            stealth,
        } => load_engine(&lists, config).and_then(|engine| {
            cookies::cmd_cookies(
                &engine,
                &cookies::CookiesOptions {
                    url,
                    source,
                    request_type,
                    jar,
                    set_cookies,
                    stealth,
                },
            )
        }),
        Commands::SetCookie { header } => cmd_set_cookie(&header),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn load_config(path: Option<&str>) -> Result<EngineConfig, String> {
    match path {
        Some(path) => EngineConfig::load(path).map_err(|e| format!("Failed to load config '{}': {}", path, e)),
        None => Ok(EngineConfig::default()),
    }
}

/// Read filter lists; list ids follow the command-line order, starting at 1.
fn read_lists(paths: &[String]) -> Result<Vec<StringRuleList>, String> {
    paths
        .iter()
        .enumerate()
        .map(|(i, path)| {
            let text = fs::read_to_string(path).map_err(|e| format!("Failed to read '{}': {}", path, e))?;
            Ok(StringRuleList::new(i as u32 + 1, text))
        })
        .collect()
}

fn load_engine(paths: &[String], config: EngineConfig) -> Result<Engine, String> {
    let storage = RuleStorage::new(read_lists(paths)?).map_err(|e| e.to_string())?;
    Ok(Engine::with_config(storage, config))
}

fn cmd_set_cookie(header: &str) -> Result<(), String> {
    let cookie = parse_set_cookie(header).ok_or_else(|| format!("Invalid Set-Cookie header: '{}'", header))?;

    println!("Name:      {}", cookie.name);
    println!("Value:     {}", cookie.value);
    if let Some(domain) = &cookie.domain {
        println!("Domain:    {}", domain);
    }
    if let Some(path) = &cookie.path {
        println!("Path:      {}", path);
    }
    if let Some(expires) = cookie.expires {
        println!("Expires:   {}", expires.to_rfc3339());
    }
    if let Some(max_age) = cookie.max_age {
        println!("Max-Age:   {}", max_age);
    }
    if let Some(same_site) = &cookie.same_site {
        println!("SameSite:  {}", same_site);
    }
    println!("Secure:    {}", cookie.secure);
    println!("HttpOnly:  {}", cookie.http_only);

    let serialized = serialize(&cookie).map_err(|e| format!("Failed to serialize: {}", e))?;
    println!();
    println!("{}", serialized);

    Ok(())
}
