use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

#[derive(Debug, Parser)]
#[command(
    name = "ragbert",
    about = "A minimal retrieval-augmented generation CLI for your documents"
)]
pub struct Cli {
    /// Override the index directory (default: XDG data directory)
    #[arg(long, global = true)]
    pub index_dir: Option<PathBuf>,

    /// Override the documents directory (default: ./data)
    #[arg(long, global = true)]
    pub docs_dir: Option<PathBuf>,

    /// Increase log verbosity (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output below warnings
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Ask a single question and print the answer
    Ask(AskArgs),
    /// Start an interactive question-answering session
    Chat,
    /// Clear the collection and re-index the documents directory
    Reindex,
    /// Show collection status and configuration
    Status(StatusArgs),
    /// Generate shell completions
    #[command(hide = true)]
    Completions(CompletionsArgs),
}

// -- Ask --

#[derive(Debug, Parser)]
pub struct AskArgs {
    /// The question to answer
    pub question: String,
}

// -- Status --

#[derive(Debug, Parser)]
pub struct StatusArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

// -- Completions --

#[derive(Debug, Parser)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

impl CompletionsArgs {
    /// Generate shell completions and print to stdout.
    pub fn generate(&self) {
        let mut cmd = Cli::command();
        clap_complete::generate(
            self.shell,
            &mut cmd,
            "ragbert",
            &mut std::io::stdout(),
        );
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn parse_ask() {
        let cli = Cli::parse_from(["ragbert", "ask", "what is this?"]);
        match cli.command {
            Command::Ask(args) => {
                assert_eq!(args.question, "what is this?");
            }
            _ => panic!("expected ask command"),
        }
    }

    #[test]
    fn parse_global_flags() {
        let cli = Cli::parse_from([
            "ragbert",
            "status",
            "--json",
            "--index-dir",
            "/tmp/idx",
            "-vv",
        ]);

        assert_eq!(cli.index_dir.as_deref(), Some(std::path::Path::new("/tmp/idx")));
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Command::Status(args) => assert!(args.json),
            _ => panic!("expected status command"),
        }
    }
}
