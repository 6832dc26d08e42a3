use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};

use photocat::config::Config;
use photocat::query::{check_query_with_depth, Query};
use photocat::{logging, Database, SearchService};

enum Command {
    Check { query: PathBuf },
    Search { catalog: String, query: PathBuf },
    Shared { id: String },
    Album { id: String, recursive: bool },
    Catalog { id: String },
}

struct Args {
    config_path: Option<PathBuf>,
    user: Option<String>,
    command: Command,
}

fn parse_args() -> Args {
    let args: Vec<String> = std::env::args().collect();
    let mut config_path = None;
    let mut user = None;
    let mut recursive = false;
    let mut positional = Vec::new();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("photocat {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                } else {
                    eprintln!("Error: --config requires a path argument");
                    std::process::exit(1);
                }
            }
            "--user" | "-u" => {
                if i + 1 < args.len() {
                    user = Some(args[i + 1].clone());
                    i += 1;
                } else {
                    eprintln!("Error: --user requires an email argument");
                    std::process::exit(1);
                }
            }
            "--recursive" | "-r" => recursive = true,
            arg if arg.starts_with('-') => {
                eprintln!("Unknown argument: {}", arg);
                print_help();
                std::process::exit(1);
            }
            arg => positional.push(arg.to_string()),
        }
        i += 1;
    }

    let command = match positional.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
        ["check", query] => Command::Check {
            query: PathBuf::from(query),
        },
        ["search", catalog, query] => Command::Search {
            catalog: catalog.to_string(),
            query: PathBuf::from(query),
        },
        ["shared", id] => Command::Shared { id: id.to_string() },
        ["album", id] => Command::Album {
            id: id.to_string(),
            recursive,
        },
        ["catalog", id] => Command::Catalog { id: id.to_string() },
        _ => {
            print_help();
            std::process::exit(1);
        }
    };

    Args {
        config_path,
        user,
        command,
    }
}

fn print_help() {
    println!(
        r#"photocat - search a media catalog

USAGE:
    photocat [OPTIONS] <COMMAND>

COMMANDS:
    check <query.json>              Validate a query
    search <catalog> <query.json>   Search a catalog
    shared <search-id>              Run a shared saved search
    album <album-id> [--recursive]  List an album, optionally with sub-albums
    catalog <catalog-id>            List a whole catalog

OPTIONS:
    --config, -c PATH   Path to config file
    --user, -u EMAIL    Caller to authorize as (default: search.default_user)
    --recursive, -r     Include sub-albums when listing an album
    --version, -V       Show version
    --help, -h          Show this help message

ENVIRONMENT:
    PHOTOCAT_CONFIG     Path to config file (overrides default location)
    PHOTOCAT_LOG        Log level (trace, debug, info, warn, error)

Config file location: $XDG_CONFIG_HOME/photocat/config.toml"#
    );
}

fn read_query(path: &Path) -> Result<Query> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read query {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid query JSON in {}", path.display()))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> Result<()> {
    let args = parse_args();

    // Initialize logging (uses journald on Linux, file fallback otherwise)
    let _ = logging::init(Some(Config::config_dir().join("logs")));

    let config = match &args.config_path {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    if let Command::Check { query } = &args.command {
        let query = read_query(query)?;
        check_query_with_depth(&query, false, config.search.max_depth)?;
        println!("ok");
        return Ok(());
    }

    let db = Database::open(config.db_path())?;
    db.initialize()?;
    let service = SearchService::new(&db).with_max_depth(config.search.max_depth);

    let caller = || -> Result<String> {
        match args.user.clone().or_else(|| config.search.default_user.clone()) {
            Some(user) => Ok(user),
            None => bail!("No caller given: pass --user or set search.default_user"),
        }
    };

    match &args.command {
        Command::Check { .. } => Ok(()),
        Command::Search { catalog, query } => {
            let query = read_query(query)?;
            print_json(&service.search(&caller()?, catalog, &query)?)
        }
        Command::Shared { id } => print_json(&service.shared_search(id)?),
        Command::Album { id, recursive } => print_json(&service.list_album(&caller()?, id, *recursive)?),
        Command::Catalog { id } => print_json(&service.list_catalog(&caller()?, id)?),
    }
}
