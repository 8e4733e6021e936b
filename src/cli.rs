//! Command-line interface for the Elm language server.

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "elm-ls")]
#[command(about = "Elm workspace symbols and go-to-definition", long_about = None)]
pub struct Cli {
    /// Increase logging verbosity (-v: debug, -vv+: trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the Language Server Protocol (LSP) server
    #[command(alias = "lsp")]
    Serve,
    /// Print the symbols declared in one file
    Symbols { file: PathBuf },
    /// Run a workspace-symbol query (`name` or `Module:name`) against a directory
    Query {
        /// Workspace root
        #[arg(long, default_value = ".")]
        root: PathBuf,
        query: String,
    },
}
