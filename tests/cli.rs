use std::path::Path;
use std::process::{Command, Output};

type TestResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

fn punchclock(args: &[&str]) -> TestResult<Output> {
    punchclock_with_env(args, &[])
}

fn punchclock_with_env(args: &[&str], vars: &[(&str, &str)]) -> TestResult<Output> {
    let output = Command::new(env!("CARGO_BIN_EXE_punchclock"))
        .args(args)
        .env_remove("PUNCHCLOCK_CONFIG")
        .env_remove("DATABASE_PATH")
        .env_remove("TELEGRAM_BOT_TOKEN")
        .env_remove("AUTHORIZED_USERS")
        .env_remove("API_PORT")
        .env_remove("LOG_LEVEL")
        .envs(vars.iter().copied())
        .output()?;
    Ok(output)
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn db_arg(dir: &Path) -> String {
    dir.join("data").join("punchclock.db").display().to_string()
}

#[test]
fn help_lists_commands() -> TestResult<()> {
    let output = punchclock(&["help"])?;
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("gen-api-token"));
    assert!(text.contains("token revoke <id>"));
    Ok(())
}

#[test]
fn token_lifecycle_through_the_cli() -> TestResult<()> {
    let dir = tempfile::tempdir()?;
    let db = db_arg(dir.path());

    let output = punchclock(&["gen-api-token", "--name", "ci", "--db", &db])?;
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("API token 'ci' generated (id 1)."));
    let secret = text
        .lines()
        .find(|line| line.contains("Token:"))
        .and_then(|line| line.split_whitespace().last())
        .ok_or("secret line missing")?;
    assert_eq!(secret.len(), 44);

    let listed = stdout(&punchclock(&["token", "list", "--db", &db])?);
    assert!(listed.contains("#1 ci"));
    assert!(listed.contains("active"));
    assert!(!listed.contains(secret));

    let revoked = punchclock(&["token", "revoke", "1", "--db", &db])?;
    assert!(revoked.status.success());
    assert!(stdout(&revoked).contains("API token #1 revoked."));

    let listed = stdout(&punchclock(&["token", "list", "--db", &db])?);
    assert!(listed.contains("revoked"));
    Ok(())
}

#[test]
fn serve_without_bot_token_fails() -> TestResult<()> {
    let dir = tempfile::tempdir()?;
    let db = db_arg(dir.path());

    let output = punchclock(&["serve", "--db", &db])?;
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("TELEGRAM_BOT_TOKEN"));
    Ok(())
}

#[test]
fn invalid_authorized_users_are_reported_in_logs() -> TestResult<()> {
    let dir = tempfile::tempdir()?;
    let db = db_arg(dir.path());

    let output = punchclock_with_env(&["serve", "--db", &db], &[("AUTHORIZED_USERS", "abc,12")])?;
    assert!(!output.status.success());
    let logs = stdout(&output);
    assert!(logs.contains("Skipping invalid user id \"abc\""));
    Ok(())
}
