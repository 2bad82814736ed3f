mod serve;
mod tokens;

use anyhow::{Context, Result};
use console::style;
use std::path::PathBuf;

use crate::core::config::AppConfig;
use crate::core::terminal::{self, GuideSection, print_error};

fn print_help() {
    terminal::print_banner();

    GuideSection::new("Core")
        .command("serve", "Run the Telegram bot and the import API (default)")
        .print();

    GuideSection::new("API Tokens")
        .command("gen-api-token [--name <label>]", "Issue a token, shown once")
        .command("token list", "List issued tokens")
        .command("token revoke <id>", "Deactivate a token")
        .print();

    GuideSection::new("Options")
        .command("--config <path>", "TOML config file (or PUNCHCLOCK_CONFIG)")
        .command("--db <path>", "SQLite database file (or DATABASE_PATH)")
        .command("--api-host <host>", "API bind host (or API_HOST)")
        .command("--api-port <port>", "API bind port (or API_PORT)")
        .blank()
        .text("TELEGRAM_BOT_TOKEN and AUTHORIZED_USERS are read from the environment.")
        .print();

    println!(
        "\n {} {} <command> [options]\n",
        style("Usage:").bold(),
        style("punchclock").green()
    );
}

/// Flags shared by every command that touches the database.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct ServerFlags {
    pub config: Option<PathBuf>,
    pub db: Option<PathBuf>,
    pub api_host: Option<String>,
    pub api_port: Option<u16>,
    pub name: Option<String>,
}

pub(crate) fn parse_server_flags(args: &[String], start: usize) -> Result<ServerFlags> {
    let mut flags = ServerFlags::default();
    let mut i = start;
    while i < args.len() {
        let value = args.get(i + 1);
        match (args[i].as_str(), value) {
            ("--config", Some(v)) => flags.config = Some(PathBuf::from(v)),
            ("--db", Some(v)) => flags.db = Some(PathBuf::from(v)),
            ("--api-host", Some(v)) => flags.api_host = Some(v.clone()),
            ("--api-port", Some(v)) => {
                flags.api_port = Some(
                    v.parse()
                        .with_context(|| format!("--api-port is not a valid port: {v}"))?,
                )
            }
            ("--name" | "-n", Some(v)) => flags.name = Some(v.clone()),
            _ => {
                i += 1;
                continue;
            }
        }
        i += 2;
    }
    Ok(flags)
}

/// Resolves the layered config and applies CLI overrides on top.
pub(crate) fn load_config(flags: &ServerFlags) -> Result<AppConfig> {
    let mut config = AppConfig::load(flags.config.as_deref())?;
    if let Some(db) = &flags.db {
        config.database_path = db.clone();
    }
    if let Some(host) = &flags.api_host {
        config.api_host = host.clone();
    }
    if let Some(port) = flags.api_port {
        config.api_port = port;
    }
    Ok(config)
}

pub async fn run_main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let cmd = args.get(1).map(String::as_str).unwrap_or("");

    match cmd {
        "" => serve::run_serve(&parse_server_flags(&args, 1)?).await,
        flag if flag.starts_with("--") && flag != "--help" => {
            serve::run_serve(&parse_server_flags(&args, 1)?).await
        }
        "serve" | "start" => serve::run_serve(&parse_server_flags(&args, 2)?).await,
        "gen-api-token" => tokens::run_generate(&parse_server_flags(&args, 2)?).await,
        "token" => tokens::run_token_command(&args).await,
        "help" | "--help" | "-h" => {
            print_help();
            Ok(())
        }
        other => {
            print_error(&format!("Unknown command: {}", other));
            print_help();
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_all_server_flags() {
        let argv = args(&[
            "punchclock",
            "serve",
            "--db",
            "/tmp/p.db",
            "--api-host",
            "127.0.0.1",
            "--api-port",
            "8080",
            "--config",
            "p.toml",
        ]);
        let flags = parse_server_flags(&argv, 2).unwrap();
        assert_eq!(flags.db, Some(PathBuf::from("/tmp/p.db")));
        assert_eq!(flags.api_host.as_deref(), Some("127.0.0.1"));
        assert_eq!(flags.api_port, Some(8080));
        assert_eq!(flags.config, Some(PathBuf::from("p.toml")));
        assert_eq!(flags.name, None);
    }

    #[test]
    fn dangling_flag_and_unknown_args_are_ignored() {
        let argv = args(&["punchclock", "gen-api-token", "extra", "--name", "ci", "--db"]);
        let flags = parse_server_flags(&argv, 2).unwrap();
        assert_eq!(flags.name.as_deref(), Some("ci"));
        assert_eq!(flags.db, None);
    }

    #[test]
    fn invalid_port_is_an_error() {
        let argv = args(&["punchclock", "serve", "--api-port", "http"]);
        assert!(parse_server_flags(&argv, 2).is_err());
    }
}
