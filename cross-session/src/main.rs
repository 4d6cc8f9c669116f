//! cross-session - Manage session credentials for cross-post
//!
//! Substack has no posting API; cross-post replays a browser session cookie
//! that is stored here beforehand.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use libcrosspost::config::Config;
use libcrosspost::logging;
use libcrosspost::{FileSessionStore, SessionStore};
use std::io::Read;
use tracing::debug;

#[derive(Parser)]
#[command(name = "cross-session")]
#[command(version)]
#[command(about = "Manage session credentials used by cross-post", long_about = None)]
#[command(after_help = "\
KEYS:
    Keys are '{platform}.{credential}'. A bare platform name means its
    session cookie, so 'substack' and 'substack.session' are the same key.

EXAMPLES:
    pbpaste | cross-session set substack --stdin
    cross-session get substack
    cross-session clear substack")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Store a credential
    Set {
        /// Credential key (e.g. substack)
        key: String,

        /// Credential value (prefer --stdin to keep it out of shell history)
        value: Option<String>,

        /// Read the value from stdin (for automation/agents)
        #[arg(long, conflicts_with = "value")]
        stdin: bool,
    },

    /// Check whether a credential is stored
    Get {
        /// Credential key (e.g. substack)
        key: String,

        /// Print the stored value instead of only its presence
        #[arg(long)]
        show: bool,
    },

    /// Remove a stored credential
    Clear {
        /// Credential key (e.g. substack)
        key: String,
    },
}

fn main() {
    let cli = Cli::parse();

    logging::init_default(cli.verbose);

    if let Err(e) = run_command(cli.command) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run_command(command: Commands) -> Result<()> {
    let config = Config::load_or_default().context("Failed to load configuration")?;
    let store = FileSessionStore::new(config.session.expand_path());
    debug!("Using session file {}", store.path().display());

    match command {
        Commands::Set { key, value, stdin } => set_credential(&store, &key, value, stdin),
        Commands::Get { key, show } => get_credential(&store, &key, show),
        Commands::Clear { key } => clear_credential(&store, &key),
    }
}

/// Expand a bare platform name to its session key
fn normalize_key(key: &str) -> Result<String> {
    let key = key.trim().to_lowercase();
    if key.is_empty() {
        bail!("Credential key cannot be empty");
    }
    if key.contains('.') {
        Ok(key)
    } else {
        Ok(format!("{}.session", key))
    }
}

fn set_credential(
    store: &dyn SessionStore,
    key: &str,
    value: Option<String>,
    stdin: bool,
) -> Result<()> {
    let key = normalize_key(key)?;

    let value = if stdin {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read credential from stdin")?;
        buffer.trim().to_string()
    } else {
        match value {
            Some(value) => value.trim().to_string(),
            None => bail!("No value given. Pass it as an argument or use --stdin"),
        }
    };

    if value.is_empty() {
        bail!("Credential value cannot be empty");
    }

    store.set(&key, &value)?;
    println!("✓ Stored {}", key);
    Ok(())
}

fn get_credential(store: &dyn SessionStore, key: &str, show: bool) -> Result<()> {
    let key = normalize_key(key)?;

    match store.get(&key)? {
        Some(value) if show => println!("{}", value),
        Some(_) => println!("{}: stored", key),
        None => bail!("No credential stored for {}", key),
    }
    Ok(())
}

fn clear_credential(store: &dyn SessionStore, key: &str) -> Result<()> {
    let key = normalize_key(key)?;
    store.remove(&key)?;
    println!("✓ Cleared {}", key);
    Ok(())
}
