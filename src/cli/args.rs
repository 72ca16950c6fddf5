use std::path::PathBuf;

use clap::Parser;

use crate::Commands;

/// Main CLI application arguments and command structure
#[derive(Parser, Debug)]
#[clap(
    version,
    about = "Note-taking with suggested tags"
)]
pub struct Cli {
    /// Path to the configuration file
    #[clap(short = 'c', long, value_parser)]
    pub config: Option<PathBuf>,

    /// Directory holding the notes file
    #[clap(long, value_parser)]
    pub data_dir: Option<PathBuf>,

    /// Verbose output mode
    #[clap(short, long)]
    pub verbose: bool,

    /// Subcommands for the tagnotes application
    #[clap(subcommand)]
    pub command: Commands,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_create_with_suggest() {
        let cli = Cli::try_parse_from([
            "tagnotes", "--data-dir", "/tmp/n", "create", "-T", "Groceries", "-c",
            "buy milk", "-s",
        ])
        .unwrap();

        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/n")));
        match cli.command {
            Commands::Create {
                title,
                content,
                suggest,
                ..
            } => {
                assert_eq!(title, "Groceries");
                assert_eq!(content.as_deref(), Some("buy milk"));
                assert!(suggest);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn list_limit_defaults_to_unlimited() {
        let cli = Cli::try_parse_from(["tagnotes", "list"]).unwrap();
        assert!(matches!(cli.command, Commands::List { limit: 0, .. }));
    }
}
