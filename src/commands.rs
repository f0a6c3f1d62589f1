//! `:` command-line parsing for the terminal front-end.

use crate::theme::Theme;
use quackview_engine::{ConnectionProfile, FileFormat, RemoteKind};
use std::path::PathBuf;

/// A parsed `:` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `load [csv|excel|json|parquet] <path>`
    Load {
        path: PathBuf,
        format: Option<FileFormat>,
    },
    /// `theme [name]`; no name cycles to the next theme
    Theme(Option<Theme>),
    PageSize(usize),
    Refresh,
    Rename { old: String, new: String },
    Drop(String),
    /// `use <database[.schema]>`
    Use(String),
    Connect(String),
    Disconnect(String),
    Profile(ProfileCommand),
    /// `recent [n]`: list recent files, or reload the n-th (1-based)
    Recent(Option<usize>),
    Export(PathBuf),
    Clear,
    Help,
    Quit,
}

/// `profile add|rm|list`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileCommand {
    Add(ConnectionProfile),
    Remove(String),
    List,
}

pub const USAGE: &str = "load [csv|excel|json|parquet] <path> | theme [name] | pagesize <n> | refresh | \
rename <old> <new> | drop <table> | use <db> | connect <profile> | disconnect <profile> | \
profile add|rm|list | recent [n] | export <path> | clear | help | quit";

const PROFILE_USAGE: &str = "Usage: profile add <name> <mysql|postgres|sqlite> [host=.. port=.. \
database=.. user=.. password=.. sslca=.. sslcert=.. sslkey=..] | profile rm <name> | profile list";

impl Command {
    /// Parse a command line (without the leading `:`).
    pub fn parse(input: &str) -> Result<Self, String> {
        let input = input.trim();
        let (name, rest) = match input.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (input, ""),
        };

        match name.to_ascii_lowercase().as_str() {
            "" => Err(format!("Usage: {}", USAGE)),
            "q" | "quit" | "exit" => Ok(Command::Quit),
            "help" | "?" => Ok(Command::Help),
            "refresh" | "r" => Ok(Command::Refresh),
            "clear" => Ok(Command::Clear),
            "load" | "open" => parse_load(rest),
            "theme" => {
                if rest.is_empty() {
                    Ok(Command::Theme(None))
                } else {
                    rest.parse().map(|t| Command::Theme(Some(t)))
                }
            }
            "pagesize" | "page-size" => match rest.parse::<usize>() {
                Ok(n) if n > 0 => Ok(Command::PageSize(n)),
                _ => Err("Usage: pagesize <n> (n >= 1)".to_string()),
            },
            "rename" => {
                let args: Vec<&str> = rest.split_whitespace().collect();
                match args.as_slice() {
                    [old, new] => Ok(Command::Rename {
                        old: old.to_string(),
                        new: new.to_string(),
                    }),
                    _ => Err("Usage: rename <old> <new>".to_string()),
                }
            }
            "drop" => single_arg(rest, "drop <table>").map(Command::Drop),
            "use" => single_arg(rest, "use <database[.schema]>").map(Command::Use),
            "connect" | "attach" => single_arg(rest, "connect <profile>").map(Command::Connect),
            "disconnect" | "detach" => {
                single_arg(rest, "disconnect <profile>").map(Command::Disconnect)
            }
            "profile" | "profiles" => parse_profile(rest),
            "recent" => {
                if rest.is_empty() {
                    return Ok(Command::Recent(None));
                }
                match rest.parse::<usize>() {
                    Ok(n) if n > 0 => Ok(Command::Recent(Some(n))),
                    _ => Err("Usage: recent [n] (n >= 1)".to_string()),
                }
            }
            "export" => {
                if rest.is_empty() {
                    Err("Usage: export <path.csv|path.json|path.parquet>".to_string())
                } else {
                    Ok(Command::Export(PathBuf::from(rest)))
                }
            }
            other => Err(format!("Unknown command: {}", other)),
        }
    }
}

fn parse_load(rest: &str) -> Result<Command, String> {
    const LOAD_USAGE: &str = "Usage: load [csv|excel|json|parquet] <path>";
    if rest.is_empty() {
        return Err(LOAD_USAGE.to_string());
    }
    if let Some((first, path)) = rest.split_once(char::is_whitespace) {
        if let Ok(format) = first.parse::<FileFormat>() {
            let path = path.trim();
            if path.is_empty() {
                return Err(LOAD_USAGE.to_string());
            }
            return Ok(Command::Load {
                path: PathBuf::from(path),
                format: Some(format),
            });
        }
    }
    // Paths may contain spaces.
    Ok(Command::Load {
        path: PathBuf::from(rest),
        format: None,
    })
}

fn parse_profile(rest: &str) -> Result<Command, String> {
    let mut args = rest.split_whitespace();
    let action = args.next().unwrap_or("list").to_ascii_lowercase();
    match action.as_str() {
        "list" | "ls" => match args.next() {
            None => Ok(Command::Profile(ProfileCommand::List)),
            Some(_) => Err(PROFILE_USAGE.to_string()),
        },
        "rm" | "remove" | "delete" => match (args.next(), args.next()) {
            (Some(name), None) => Ok(Command::Profile(ProfileCommand::Remove(name.to_string()))),
            _ => Err(PROFILE_USAGE.to_string()),
        },
        "add" => {
            let (Some(name), Some(kind)) = (args.next(), args.next()) else {
                return Err(PROFILE_USAGE.to_string());
            };
            let kind: RemoteKind = kind.parse()?;
            let mut profile = ConnectionProfile::new(name, kind);
            for pair in args {
                let Some((key, value)) = pair.split_once('=') else {
                    return Err(format!("Expected key=value, got '{}'", pair));
                };
                match key.to_ascii_lowercase().as_str() {
                    "host" => profile.host = value.to_string(),
                    "port" => {
                        profile.port = value
                            .parse()
                            .map_err(|_| format!("Invalid port '{}'", value))?
                    }
                    "database" | "db" | "path" => profile.database = value.to_string(),
                    "user" | "username" => profile.username = value.to_string(),
                    "password" => profile.password = value.to_string(),
                    "sslca" | "ssl_ca" => profile.ssl_ca = value.to_string(),
                    "sslcert" | "ssl_cert" => profile.ssl_cert = value.to_string(),
                    "sslkey" | "ssl_key" => profile.ssl_key = value.to_string(),
                    other => return Err(format!("Unknown profile field '{}'", other)),
                }
            }
            Ok(Command::Profile(ProfileCommand::Add(profile)))
        }
        _ => Err(PROFILE_USAGE.to_string()),
    }
}

fn single_arg(rest: &str, usage: &str) -> Result<String, String> {
    let mut args = rest.split_whitespace();
    match (args.next(), args.next()) {
        (Some(arg), None) => Ok(arg.to_string()),
        _ => Err(format!("Usage: {}", usage)),
    }
}
