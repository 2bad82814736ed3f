use anyhow::{Context, Result};
use console::style;

use super::{ServerFlags, load_config, parse_server_flags};
use crate::core::auth::TokenAuthenticator;
use crate::core::store::EntryStore;
use crate::core::terminal::{print_error, print_info, print_status, print_success, print_warn};

const DEFAULT_TOKEN_NAME: &str = "default";

async fn open_store(flags: &ServerFlags) -> Result<EntryStore> {
    let config = load_config(flags)?;
    EntryStore::open(&config.database_path).await
}

pub async fn run_generate(flags: &ServerFlags) -> Result<()> {
    let store = open_store(flags).await?;
    let name = flags.name.as_deref().unwrap_or(DEFAULT_TOKEN_NAME);

    let (secret, token) = TokenAuthenticator::new(store)
        .issue(name)
        .await
        .context("Failed to store API token")?;

    print_success(&format!("API token '{}' generated (id {}).", token.name, token.id));
    println!("\n  {} {}\n", style("Token:").bold(), style(&secret).green().bold());
    print_warn("Save this token now. It will not be shown again.");
    println!(
        "  {} Use it with: Authorization: Bearer <token>\n",
        style("→").cyan()
    );
    Ok(())
}

pub async fn run_token_command(args: &[String]) -> Result<()> {
    let sub_cmd = args.get(2).map(String::as_str).unwrap_or("");

    match sub_cmd {
        "list" | "ls" => {
            let store = open_store(&parse_server_flags(args, 3)?).await?;
            let tokens = store.list_api_tokens().await?;
            if tokens.is_empty() {
                print_info("No API tokens issued yet. Run 'punchclock gen-api-token'.");
                return Ok(());
            }
            for token in tokens {
                let state = if token.is_active {
                    style("active").green()
                } else {
                    style("revoked").red()
                };
                let last_used = token
                    .last_used_at
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_else(|| "never".to_string());
                print_status(
                    &format!("#{} {}", token.id, token.name),
                    &format!(
                        "{} | created {} | last used {}",
                        state,
                        token.created_at.to_rfc3339(),
                        last_used
                    ),
                );
            }
        }
        "revoke" | "rm" => {
            let Some(raw_id) = args.get(3) else {
                println!("{}", style("Usage: punchclock token revoke <id>").bold());
                return Ok(());
            };
            let id: i64 = raw_id
                .parse()
                .with_context(|| format!("Token id must be a number: {raw_id}"))?;

            let store = open_store(&parse_server_flags(args, 4)?).await?;
            if store.deactivate_api_token(id).await? {
                print_success(&format!("API token #{} revoked.", id));
            } else {
                print_error(&format!("No active API token with id {}.", id));
            }
        }
        _ => {
            print_error("Unknown or missing token command. Expected: list, revoke");
        }
    }
    Ok(())
}
