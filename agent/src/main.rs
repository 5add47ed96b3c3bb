//! Confirmation-gated shell assistant.
//!
//! A human converses with a language model that can propose shell
//! commands; every proposed command is shown for explicit approval before
//! it runs. The tracked working directory follows approved `cd` commands
//! across turns.

use std::path::{Path, PathBuf};
use std::time::Duration;

use agent::io::config::{AgentConfig, load_config, write_config};
use agent::io::confirm::StdinGate;
use agent::io::llm::ChatClient;
use agent::io::process::ShellRunner;
use agent::io::session::SessionState;
use agent::repl::{Repl, run_loop};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "agent", version, about = "Confirmation-gated shell assistant")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "agent.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Write a default configuration file if missing.
    Init {
        /// Overwrite an existing file.
        #[arg(short, long)]
        force: bool,
    },
}

fn main() {
    agent::logging::init();
    if let Err(err) = run() {
        eprintln!("{:#}", err);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Some(Command::Init { force }) => cmd_init(&cli.config, force),
        None => cmd_chat(&cli.config),
    }
}

fn cmd_init(path: &Path, force: bool) -> Result<()> {
    if !force && path.exists() {
        println!("{} already exists (use --force to overwrite)", path.display());
        return Ok(());
    }
    write_config(path, &AgentConfig::default())?;
    println!("wrote {}", path.display());
    Ok(())
}

fn cmd_chat(path: &Path) -> Result<()> {
    let config = load_config(path)?;
    let backend = ChatClient::new(&config)?;
    let runner = ShellRunner {
        timeout: (config.command_timeout_secs > 0)
            .then_some(Duration::from_secs(config.command_timeout_secs)),
        output_limit_bytes: config.output_limit_bytes,
    };
    let start_dir = std::env::current_dir().context("determine starting directory")?;
    let session = SessionState::new(start_dir)?;

    let repl = Repl::new(
        backend,
        StdinGate,
        runner,
        session,
        &config.system_prompt,
        config.max_tool_rounds,
    );
    println!("Type 'quit' to exit.");
    run_loop(repl)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_defaults_to_chat() {
        let cli = Cli::parse_from(["agent"]);
        assert!(cli.command.is_none());
        assert_eq!(cli.config, PathBuf::from("agent.toml"));
    }

    #[test]
    fn parse_init_force() {
        let cli = Cli::parse_from(["agent", "init", "--force"]);
        assert!(matches!(cli.command, Some(Command::Init { force: true })));
    }

    #[test]
    fn parse_custom_config_path() {
        let cli = Cli::parse_from(["agent", "--config", "/tmp/other.toml"]);
        assert_eq!(cli.config, PathBuf::from("/tmp/other.toml"));
    }

    #[test]
    fn init_writes_a_loadable_config() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("agent.toml");
        cmd_init(&path, false).expect("init");
        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg, AgentConfig::default());
    }
}
