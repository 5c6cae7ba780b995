//! Add an account to the credential file without going through the HTTP API.
//!
//! Stop the server first: the credential file lock is per process, so a
//! registration made through the API while this tool runs can be lost.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use flavors_server::config::ServerConfig;
use flavors_store::CredentialStore;

/// Environment variable read when `--password` is omitted.
const PASSWORD_ENV: &str = "FLAVORS_NEW_PASSWORD";

/// `add-user` command arguments.
#[derive(Debug, Parser)]
#[command(name = "add-user", about = "Register a Festival Flavors account", version)]
struct CliArgs {
    /// Login name of the new account.
    #[arg(long, value_name = "name")]
    username: String,
    /// Display name. Defaults to the username.
    #[arg(long, value_name = "name", default_value = "")]
    name: String,
    /// Password. Falls back to `FLAVORS_NEW_PASSWORD`, then a prompt on stdin.
    #[arg(long, value_name = "password")]
    password: Option<String>,
    /// Credential file. Falls back to the server's `USERS_FILE` setting.
    #[arg(long = "users-file", value_name = "path")]
    users_file: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    let users_file = args
        .users_file
        .unwrap_or_else(|| ServerConfig::from_env().users_file);
    let password = match args.password.or_else(|| std::env::var(PASSWORD_ENV).ok()) {
        Some(p) => p,
        None => prompt("Enter password: ")?,
    };
    let username = args.username.trim();

    let store = CredentialStore::open(users_file.clone());
    let added = store
        .register(username, &args.name, &password)
        .with_context(|| format!("updating {}", users_file.display()))?;

    if added {
        println!("User '{}' added to {}.", username, users_file.display());
    } else {
        println!("User '{}' already exists in {}.", username, users_file.display());
    }
    Ok(())
}

fn prompt(label: &str) -> anyhow::Result<String> {
    let mut stdout = io::stdout();
    stdout.write_all(label.as_bytes())?;
    stdout.flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
