//! Notekeeper CLI
//!
//! Serves the verbatim note store over stdio, or inspects it locally.

use clap::{Parser, Subcommand};
use notekeeper::{NotesConfig, Server};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Notekeeper - append-only verbatim notes for agents
#[derive(Parser, Debug)]
#[command(name = "notekeeper")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the notes file (overrides NOTEKEEPER_FILE)
    #[arg(long, global = true)]
    notes_file: Option<PathBuf>,

    /// Verbose logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve JSON-RPC on stdin/stdout (default)
    Serve,
    /// Print stored notes, optionally only one kind
    List {
        #[arg(long)]
        kind: Option<String>,
    },
    /// Print one note by id
    Get { id: String },
    /// Print notes whose text contains NEEDLE
    Find { needle: String },
    /// Print the resolved notes file path
    Path,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = NotesConfig::from_env(cli.notes_file)?.with_verbose(cli.verbose);

    // stdout carries the protocol, so logs go to stderr
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.log_level()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let server = Server::from_config(&config);
    let tools = server.tools();

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            info!("Notes file: {:?}", config.notes_file);
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            server.run(stdin, tokio::io::stdout()).await?;
        }
        Command::List { kind } => {
            let out = match kind {
                Some(kind) => tools.list_notes_by_kind(&kind).await?,
                None => tools.list_notes().await?,
            };
            println!("{}", out);
        }
        Command::Get { id } => println!("{}", tools.get_note(&id).await?),
        Command::Find { needle } => println!("{}", tools.find_notes(&needle).await?),
        Command::Path => println!("{}", config.notes_file.display()),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_command_is_serve() {
        let cli = Cli::parse_from(["notekeeper"]);
        assert!(cli.command.is_none());
        assert!(!cli.verbose);
    }

    #[test]
    fn test_global_notes_file_after_subcommand() {
        let cli = Cli::parse_from(["notekeeper", "list", "--kind", "teach.note", "--notes-file", "x.jsonl"]);
        assert_eq!(cli.notes_file, Some(PathBuf::from("x.jsonl")));
        match cli.command {
            Some(Command::List { kind }) => assert_eq!(kind.as_deref(), Some("teach.note")),
            other => panic!("Expected List, got {:?}", other),
        }
    }
}
